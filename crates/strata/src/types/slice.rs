//! Slice objects and index normalization.
//!
//! [`Slice::indices`] follows CPython's `PySlice_AdjustIndices`: missing
//! bounds default by step direction, negative bounds wrap once, and bounds
//! past either end clamp. The result is a [`SliceIndices`] whose `count` is
//! the exact number of positions the slice addresses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::exception::{ExcType, RunResult};

/// A `slice(start, stop, step)` value with optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    #[must_use]
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// `[start:stop]`
    #[must_use]
    pub fn range(start: i64, stop: i64) -> Self {
        Self::new(Some(start), Some(stop), None)
    }

    /// `[::step]`
    #[must_use]
    pub fn stepped(step: i64) -> Self {
        Self::new(None, None, Some(step))
    }

    /// Resolves the slice against a sequence of length `len`.
    ///
    /// Fails with `ValueError: slice step cannot be zero` for a zero step.
    pub fn indices(&self, len: usize) -> RunResult<SliceIndices> {
        let step = match self.step {
            None => 1,
            Some(0) => return Err(ExcType::value_error_slice_step_zero()),
            // -i64::MIN does not exist; CPython clamps the same way.
            Some(step) => step.max(-i64::MAX),
        };
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let (default_start, default_stop) = if step < 0 { (i64::MAX, i64::MIN) } else { (0, i64::MAX) };
        let start = adjust_bound(self.start.unwrap_or(default_start), len, step);
        let stop = adjust_bound(self.stop.unwrap_or(default_stop), len, step);

        let count = if step < 0 {
            if stop < start { (start - stop - 1) / (-step) + 1 } else { 0 }
        } else if start < stop {
            (stop - start - 1) / step + 1
        } else {
            0
        };

        Ok(SliceIndices {
            start,
            stop,
            step,
            count: usize::try_from(count).unwrap_or(0),
        })
    }
}

fn adjust_bound(bound: i64, len: i64, step: i64) -> i64 {
    if bound < 0 {
        let wrapped = bound.saturating_add(len);
        if wrapped < 0 {
            if step < 0 { -1 } else { 0 }
        } else {
            wrapped
        }
    } else if bound >= len {
        if step < 0 { len - 1 } else { len }
    } else {
        bound
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn field(value: Option<i64>) -> String {
            value.map_or_else(|| "None".to_owned(), |v| v.to_string())
        }
        write!(
            f,
            "slice({}, {}, {})",
            field(self.start),
            field(self.stop),
            field(self.step)
        )
    }
}

/// A slice resolved against a concrete length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceIndices {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
    /// Number of addressed positions.
    pub count: usize,
}

impl SliceIndices {
    /// Yields the addressed positions in slice order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = usize> + ExactSizeIterator + use<> {
        let Self { start, step, count, .. } = *self;
        (0..count).map(move |i| {
            #[expect(clippy::cast_possible_wrap, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = (start + (i as i64) * step) as usize;
            index
        })
    }

    /// Lowest addressed position, with the step made positive.
    ///
    /// Returns `(first, step)`; only meaningful when `count > 0`.
    #[must_use]
    pub fn ascending(&self) -> (usize, usize) {
        #[expect(clippy::cast_possible_wrap, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pair = if self.step < 0 {
            let first = self.start + (self.count as i64 - 1) * self.step;
            (first as usize, self.step.unsigned_abs() as usize)
        } else {
            (self.start as usize, self.step as usize)
        };
        pair
    }

    /// True for a contiguous forward slice, which permits resizing assignment.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.step == 1
    }
}

/// Normalizes a possibly-negative index against `len`.
///
/// Returns `None` when the index is out of range after one wraparound.
#[must_use]
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len_i = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index.checked_add(len_i)? } else { index };
    if (0..len_i).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

/// Clamps an insertion index the way `list.insert` does.
#[must_use]
pub fn clamp_insert_index(index: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 { index.saturating_add(len_i).max(0) } else { index.min(len_i) };
    usize::try_from(resolved).unwrap_or(0)
}

/// Resolves optional `start`/`end` search bounds to a byte or element range.
#[must_use]
pub fn adjust_range(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let clamp = |v: i64| -> usize {
        let v = if v < 0 { v.saturating_add(len_i).max(0) } else { v.min(len_i) };
        usize::try_from(v).unwrap_or(0)
    };
    (start.map_or(0, clamp), end.map_or(len, clamp))
}
