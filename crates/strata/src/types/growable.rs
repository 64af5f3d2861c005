//! Growable contiguous backing store shared by `list` and `bytearray`.
//!
//! `GrowableArray` owns its buffer and controls capacity itself instead of
//! leaving it to `Vec`'s amortized doubling:
//!
//! - the first growth from an empty buffer allocates [`INITIAL_CAPACITY`] slots,
//! - later growth jumps to `max(3 * len, 10)`, doubled until it covers the need,
//! - capacity only shrinks through [`GrowableArray::trim_excess`].
//!
//! No method takes a lock; the owning container supplies it.

use std::{fmt, mem};

use crate::{
    exception::{ExcType, RunResult},
    types::slice::SliceIndices,
};

/// Capacity allocated by the first growth of an empty buffer.
pub const INITIAL_CAPACITY: usize = 4;

/// Lower bound for every growth after the first.
const MIN_GROWTH: usize = 10;

/// Computes the capacity to grow to so that `need` elements fit.
///
/// `len` and `capacity` describe the buffer before growth.
#[must_use]
pub fn grown_capacity(len: usize, capacity: usize, need: usize) -> usize {
    if capacity == 0 && need <= INITIAL_CAPACITY {
        return INITIAL_CAPACITY;
    }
    let mut target = len.saturating_mul(3).max(MIN_GROWTH);
    while target < need {
        target = target.saturating_mul(2);
    }
    target
}

/// Capacity for the result of concatenating sequences of length `a` and `b`.
///
/// Uses the append-growth rule so the result is cheaply extensible.
#[must_use]
pub fn concat_capacity(a: usize, b: usize) -> usize {
    grown_capacity(a.max(b), usize::from(a.max(b) > 0), a.saturating_add(b))
}

/// Length of `count` copies of `unit` elements, if it can be allocated.
fn repeat_len<T>(unit: usize, count: usize) -> RunResult<usize> {
    let max_len = isize::MAX.unsigned_abs() / mem::size_of::<T>().max(1);
    unit.checked_mul(count)
        .filter(|len| *len <= max_len)
        .ok_or_else(ExcType::overflow_repeat_count)
}

/// Contiguous buffer plus logical length, with an explicit growth policy.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GrowableArray<T> {
    items: Vec<T>,
    reallocations: usize,
}

impl<T> GrowableArray<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            reallocations: 0,
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            reallocations: 0,
        }
    }

    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items,
            reallocations: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Number of times the buffer has been reallocated by growth or trimming.
    #[must_use]
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Grows the buffer so that `need` elements fit. Never shrinks.
    pub fn ensure_capacity(&mut self, need: usize) {
        if self.items.capacity() >= need {
            return;
        }
        let target = grown_capacity(self.items.len(), self.items.capacity(), need);
        self.items.reserve_exact(target - self.items.len());
        self.reallocations += 1;
    }

    pub fn append(&mut self, value: T) {
        self.ensure_capacity(self.items.len() + 1);
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Removes the element at `index`, shifting the tail left.
    pub fn pop_at(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Inserts at `index`, which must be `<= len`.
    pub fn insert(&mut self, index: usize, value: T) {
        self.ensure_capacity(self.items.len() + 1);
        self.items.insert(index.min(self.items.len()), value);
    }

    /// Removes the element at `index` without returning it.
    pub fn remove_at(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    /// Replaces the element at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, value: T) -> Option<T> {
        self.items.get_mut(index).map(|slot| mem::replace(slot, value))
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) {
        let values = values.into_iter();
        self.ensure_capacity(self.items.len() + values.size_hint().0);
        for value in values {
            self.append(value);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn reverse(&mut self) {
        self.items.reverse();
    }

    /// Shrinks capacity to the logical length.
    pub fn trim_excess(&mut self) {
        if self.items.capacity() > self.items.len() {
            self.items.shrink_to_fit();
            self.reallocations += 1;
        }
    }

    /// Moves the contents out, leaving an empty buffer with no capacity.
    pub fn take(&mut self) -> Self {
        Self {
            items: mem::take(&mut self.items),
            reallocations: self.reallocations,
        }
    }

    /// Installs `other`'s contents, returning the previous ones.
    pub fn replace(&mut self, other: Self) -> Self {
        mem::replace(self, other)
    }

    /// Deletes the positions addressed by `indices` in one compaction pass.
    ///
    /// Unit steps drain a contiguous range. Other steps walk a fill cursor
    /// behind a read cursor, skipping every `step`-th position starting at the
    /// lowest addressed one; negative steps are normalized to that positive form.
    pub fn delete_slice(&mut self, indices: &SliceIndices) {
        if indices.count == 0 {
            return;
        }
        let (first, step) = indices.ascending();
        if step == 1 {
            self.items.drain(first..first + indices.count);
            return;
        }

        let len = self.items.len();
        let mut fill = first;
        let mut next_skip = first;
        let mut skipped = 0;
        for read in first..len {
            if skipped < indices.count && read == next_skip {
                skipped += 1;
                next_skip += step;
                continue;
            }
            self.items.swap(fill, read);
            fill += 1;
        }
        self.items.truncate(fill);
    }

    /// Extracts the positions addressed by `indices` into a fresh buffer.
    #[must_use]
    pub fn copy_slice(&self, indices: &SliceIndices) -> Self
    where
        T: Clone,
    {
        if indices.count == 0 {
            return Self::new();
        }
        let mut out = Vec::with_capacity(indices.count);
        if indices.is_contiguous() {
            let (first, _) = indices.ascending();
            out.extend_from_slice(&self.items[first..first + indices.count]);
        } else {
            out.extend(indices.iter().map(|i| self.items[i].clone()));
        }
        Self::from_vec(out)
    }

    /// Assigns `values` to the positions addressed by `indices`.
    ///
    /// A unit-step slice may change length: equal lengths overwrite in place,
    /// otherwise the tail shifts once. Extended slices require exactly
    /// `indices.count` values.
    pub fn assign_slice(&mut self, indices: &SliceIndices, values: Vec<T>) -> RunResult<()> {
        if indices.is_contiguous() {
            #[expect(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "start >= 0 for step 1")]
            let start = indices.start as usize;
            let end = start + indices.count;
            if values.len() == indices.count {
                for (slot, value) in self.items[start..end].iter_mut().zip(values) {
                    *slot = value;
                }
            } else {
                self.ensure_capacity(self.items.len() - indices.count + values.len());
                self.items.splice(start..end, values);
            }
            return Ok(());
        }
        if values.len() != indices.count {
            return Err(ExcType::value_error_extended_slice_size(values.len(), indices.count));
        }
        for (index, value) in indices.iter().zip(values) {
            self.items[index] = value;
        }
        Ok(())
    }

    /// Repeats the contents in place so the buffer holds `count` copies.
    ///
    /// Copies in doubling blocks: one copy call per power of two. A count of
    /// zero or less clears.
    pub fn repeat_in_place(&mut self, count: i64) -> RunResult<()>
    where
        T: Clone,
    {
        if count <= 0 {
            self.items.clear();
            return Ok(());
        }
        let count = usize::try_from(count).map_err(|_| ExcType::overflow_repeat_count())?;
        let unit = self.items.len();
        let target = repeat_len::<T>(unit, count)?;
        if unit == 0 || count == 1 {
            return Ok(());
        }
        self.ensure_capacity(target);
        while self.items.len() < target {
            let chunk = self.items.len().min(target - self.items.len());
            self.items.extend_from_within(..chunk);
        }
        Ok(())
    }

    /// Returns a fresh buffer holding `count` copies of the contents.
    pub fn repeated(&self, count: i64) -> RunResult<Self>
    where
        T: Clone,
    {
        let unit = self.items.len();
        let copies = usize::try_from(count.max(0)).map_err(|_| ExcType::overflow_repeat_count())?;
        let target = repeat_len::<T>(unit, copies)?;
        let mut out = Self::with_capacity(grown_capacity(unit, unit, target));
        if target == 0 {
            return Ok(out);
        }
        out.items.extend_from_slice(&self.items);
        out.repeat_in_place(count)?;
        Ok(out)
    }

    /// Concatenates two slices into a fresh buffer sized by [`concat_capacity`].
    #[must_use]
    pub fn concat(left: &[T], right: &[T]) -> Self
    where
        T: Clone,
    {
        let mut items = Vec::with_capacity(concat_capacity(left.len(), right.len()));
        items.extend_from_slice(left);
        items.extend_from_slice(right);
        Self::from_vec(items)
    }
}

impl<T> Default for GrowableArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for GrowableArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<T> From<Vec<T>> for GrowableArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for GrowableArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<'a, T> IntoIterator for &'a GrowableArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::slice::Slice;

    fn array(n: usize) -> GrowableArray<usize> {
        (0..n).collect::<Vec<_>>().into()
    }

    #[test]
    fn growth_policy() {
        assert_eq!(grown_capacity(0, 0, 1), 4);
        assert_eq!(grown_capacity(0, 0, 7), 10);
        assert_eq!(grown_capacity(4, 4, 5), 12);
        assert_eq!(grown_capacity(4, 4, 30), 48);
        assert_eq!(concat_capacity(3, 4), 12);
    }

    #[test]
    fn first_append_allocates_four() {
        let mut a = GrowableArray::new();
        a.append(1);
        assert!(a.capacity() >= 4);
        assert_eq!(a.reallocations(), 1);
        for i in 0..3 {
            a.append(i);
        }
        assert_eq!(a.reallocations(), 1, "four appends fit the initial block");
    }

    #[test]
    fn delete_unit_and_stepped() {
        let mut a = array(10);
        a.delete_slice(&Slice::range(2, 5).indices(10).unwrap());
        assert_eq!(a.as_slice(), &[0, 1, 5, 6, 7, 8, 9]);

        let mut b = array(10);
        b.delete_slice(&Slice::new(Some(1), None, Some(3)).indices(10).unwrap());
        assert_eq!(b.as_slice(), &[0, 2, 3, 5, 6, 8, 9]);

        let mut c = array(10);
        c.delete_slice(&Slice::new(Some(8), Some(1), Some(-3)).indices(10).unwrap());
        assert_eq!(c.as_slice(), &[0, 1, 3, 4, 6, 7, 9]);
    }

    #[test]
    fn delete_full_reverse_empties() {
        let mut a = array(7);
        a.delete_slice(&Slice::stepped(-1).indices(7).unwrap());
        assert!(a.is_empty());
    }

    #[test]
    fn assign_contiguous_resizes() {
        let mut a = array(5);
        a.assign_slice(&Slice::range(1, 4).indices(5).unwrap(), vec![100]).unwrap();
        assert_eq!(a.as_slice(), &[0, 100, 4]);
        a.assign_slice(&Slice::range(1, 1).indices(3).unwrap(), vec![7, 8]).unwrap();
        assert_eq!(a.as_slice(), &[0, 7, 8, 100, 4]);
    }

    #[test]
    fn assign_extended_requires_exact_length() {
        let mut a = array(6);
        let idx = Slice::stepped(2).indices(6).unwrap();
        let err = a.assign_slice(&idx, vec![1, 2]).unwrap_err();
        assert_eq!(
            err.message(),
            Some("attempt to assign sequence of size 2 to extended slice of size 3")
        );
        a.assign_slice(&idx, vec![10, 20, 30]).unwrap();
        assert_eq!(a.as_slice(), &[10, 1, 20, 3, 30, 5]);
    }

    #[test]
    fn repeat_doubles() {
        let mut a = array(3);
        a.repeat_in_place(5).unwrap();
        assert_eq!(a.len(), 15);
        assert_eq!(&a.as_slice()[12..], &[0, 1, 2]);
        a.repeat_in_place(0).unwrap();
        assert!(a.is_empty());
        assert!(array(3).repeat_in_place(i64::MAX).is_err());
    }

    #[test]
    fn trim_excess_shrinks() {
        let mut a = array(3);
        a.ensure_capacity(100);
        a.trim_excess();
        assert_eq!(a.capacity(), 3);
    }
}
