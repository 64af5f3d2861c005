//! Python `bytes` and the byte-span algorithms shared with `bytearray`.
//!
//! Every algorithm in the first half of this module is a pure function over
//! a read-only `&[u8]` and returns a fresh allocation. [`Bytes`] calls them on
//! its frozen storage; [`crate::types::ByteArray`] calls them on the span it
//! reads under its lock. Neither type hands out a mutable view to them.
//!
//! # Implemented methods (both variants)
//! - Search: `find`, `rfind`, `index`, `rindex`, `count`, `startswith`, `endswith`, `__contains__`
//! - Transform: `replace`, `strip`, `lstrip`, `rstrip`, `removeprefix`, `removesuffix`,
//!   `center`, `ljust`, `rjust`, `zfill`, `expandtabs`, `translate`
//! - Case: `lower`, `upper`, `swapcase`, `title`, `capitalize`
//! - Predicates: `isalpha`, `isdigit`, `isalnum`, `isspace`, `islower`, `isupper`, `istitle`
//! - Split/join: `split`, `rsplit`, `splitlines`, `partition`, `rpartition`, `join`
//! - Codecs: `hex`, `fromhex`, `maketrans`, `decode`

use std::{
    fmt::{self, Write},
    sync::{Arc, OnceLock},
};

use crate::{
    args::{ArgValues, optional_index},
    dispatch::{BinaryOp, Builtin, BuiltinFn, Operation},
    exception::{ExcType, RunError, RunResult, SimpleException},
    runtime::Runtime,
    types::{
        List, Type,
        slice::{adjust_range, normalize_index},
    },
    value::Value,
};

// =============================================================================
// Byte classification
// =============================================================================

/// Python ASCII whitespace: also vertical tab (0x0b), which `is_ascii_whitespace` omits.
#[inline]
#[must_use]
pub fn is_py_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

// =============================================================================
// Search
// =============================================================================

/// Lowest index of `needle` in `data[start..end]`, as an absolute position.
///
/// A one-byte needle is a direct byte scan; longer needles use a naive window scan.
#[must_use]
pub fn find(data: &[u8], needle: &[u8], start: usize, end: usize) -> Option<usize> {
    if start > end || end > data.len() {
        return None;
    }
    let hay = &data[start..end];
    let found = match needle {
        [] => Some(0),
        [byte] => hay.iter().position(|b| b == byte),
        _ => hay.windows(needle.len()).position(|w| w == needle),
    };
    found.map(|i| start + i)
}

/// Highest index of `needle` in `data[start..end]`, as an absolute position.
#[must_use]
pub fn rfind(data: &[u8], needle: &[u8], start: usize, end: usize) -> Option<usize> {
    if start > end || end > data.len() {
        return None;
    }
    let hay = &data[start..end];
    let found = match needle {
        [] => Some(hay.len()),
        [byte] => hay.iter().rposition(|b| b == byte),
        _ => hay.windows(needle.len()).rposition(|w| w == needle),
    };
    found.map(|i| start + i)
}

/// Non-overlapping occurrences of `needle` in `data[start..end]`.
///
/// The empty needle matches between every byte, `len + 1` times.
#[must_use]
pub fn count(data: &[u8], needle: &[u8], start: usize, end: usize) -> usize {
    if start > end || end > data.len() {
        return 0;
    }
    let hay = &data[start..end];
    if needle.is_empty() {
        return hay.len() + 1;
    }
    let mut total = 0;
    let mut pos = 0;
    while pos + needle.len() <= hay.len() {
        if &hay[pos..pos + needle.len()] == needle {
            total += 1;
            pos += needle.len();
        } else {
            pos += 1;
        }
    }
    total
}

/// Whether `data[start..end]` begins with `prefix`.
#[must_use]
pub fn starts_with(data: &[u8], prefix: &[u8], start: usize, end: usize) -> bool {
    start <= end && end <= data.len() && data[start..end].starts_with(prefix)
}

/// Whether `data[start..end]` ends with `suffix`.
#[must_use]
pub fn ends_with(data: &[u8], suffix: &[u8], start: usize, end: usize) -> bool {
    start <= end && end <= data.len() && data[start..end].ends_with(suffix)
}

// =============================================================================
// Transforms
// =============================================================================

/// Replaces up to `max` occurrences of `old` (all when `max < 0`).
#[must_use]
pub fn replace(data: &[u8], old: &[u8], new: &[u8], max: i64) -> Vec<u8> {
    let limit = usize::try_from(max).unwrap_or(usize::MAX);
    let mut out = Vec::with_capacity(data.len());
    let mut done = 0;
    if old.is_empty() {
        for &b in data {
            if done < limit {
                out.extend_from_slice(new);
                done += 1;
            }
            out.push(b);
        }
        if done < limit {
            out.extend_from_slice(new);
        }
        return out;
    }
    let mut start = 0;
    while done < limit {
        let Some(pos) = find(data, old, start, data.len()) else {
            break;
        };
        out.extend_from_slice(&data[start..pos]);
        out.extend_from_slice(new);
        start = pos + old.len();
        done += 1;
    }
    out.extend_from_slice(&data[start..]);
    out
}

fn strip_set(chars: Option<&[u8]>) -> impl Fn(&u8) -> bool + '_ {
    move |b| match chars {
        Some(set) => set.contains(b),
        None => is_py_whitespace(*b),
    }
}

/// Strips bytes in `chars` (ASCII whitespace by default) from both ends.
#[must_use]
pub fn strip<'a>(data: &'a [u8], chars: Option<&[u8]>) -> &'a [u8] {
    rstrip(lstrip(data, chars), chars)
}

#[must_use]
pub fn lstrip<'a>(data: &'a [u8], chars: Option<&[u8]>) -> &'a [u8] {
    let stripped = strip_set(chars);
    let start = data.iter().position(|b| !stripped(b)).unwrap_or(data.len());
    &data[start..]
}

#[must_use]
pub fn rstrip<'a>(data: &'a [u8], chars: Option<&[u8]>) -> &'a [u8] {
    let stripped = strip_set(chars);
    let end = data.iter().rposition(|b| !stripped(b)).map_or(0, |pos| pos + 1);
    &data[..end]
}

/// Width argument as a length; negative widths count as zero.
fn width_of(width: i64) -> usize {
    usize::try_from(width).unwrap_or(0)
}

fn padded(data: &[u8], left: usize, right: usize, fill: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(left + data.len() + right);
    out.resize(left, fill);
    out.extend_from_slice(data);
    out.resize(left + data.len() + right, fill);
    out
}

/// Centers `data` in `width` bytes.
///
/// With an odd amount of padding the extra byte goes left only when `width` is odd.
#[must_use]
pub fn center(data: &[u8], width: i64, fill: u8) -> Vec<u8> {
    let width = width_of(width);
    if width <= data.len() {
        return data.to_vec();
    }
    let pad = width - data.len();
    let left = pad / 2 + usize::from((pad & width & 1) != 0);
    padded(data, left, pad - left, fill)
}

#[must_use]
pub fn ljust(data: &[u8], width: i64, fill: u8) -> Vec<u8> {
    let pad = width_of(width).saturating_sub(data.len());
    padded(data, 0, pad, fill)
}

#[must_use]
pub fn rjust(data: &[u8], width: i64, fill: u8) -> Vec<u8> {
    let pad = width_of(width).saturating_sub(data.len());
    padded(data, pad, 0, fill)
}

/// Left-fills with `0`, keeping a leading sign in front.
#[must_use]
pub fn zfill(data: &[u8], width: i64) -> Vec<u8> {
    let width = width_of(width);
    if width <= data.len() {
        return data.to_vec();
    }
    let pad = width - data.len();
    let mut out = Vec::with_capacity(width);
    match data.split_first() {
        Some((&sign @ (b'+' | b'-'), rest)) => {
            out.push(sign);
            out.resize(pad + 1, b'0');
            out.extend_from_slice(rest);
        }
        _ => {
            out.resize(pad, b'0');
            out.extend_from_slice(data);
        }
    }
    out
}

/// Replaces tabs with spaces up to the next multiple of `tabsize`.
#[must_use]
pub fn expandtabs(data: &[u8], tabsize: i64) -> Vec<u8> {
    let tabsize = width_of(tabsize);
    let mut out = Vec::with_capacity(data.len());
    let mut column = 0;
    for &b in data {
        match b {
            b'\t' => {
                if tabsize > 0 {
                    let spaces = tabsize - column % tabsize;
                    out.resize(out.len() + spaces, b' ');
                    column += spaces;
                }
            }
            b'\n' | b'\r' => {
                out.push(b);
                column = 0;
            }
            _ => {
                out.push(b);
                column += 1;
            }
        }
    }
    out
}

/// Maps every byte through `table` after dropping bytes listed in `delete`.
///
/// `table` must hold exactly 256 entries; `None` keeps bytes unchanged.
pub fn translate(data: &[u8], table: Option<&[u8]>, delete: &[u8]) -> RunResult<Vec<u8>> {
    if table.is_some_and(|t| t.len() != 256) {
        return Err(ExcType::value_error_translate_table());
    }
    let mut deleted = [false; 256];
    for &b in delete {
        deleted[usize::from(b)] = true;
    }
    Ok(data
        .iter()
        .filter(|&&b| !deleted[usize::from(b)])
        .map(|&b| table.map_or(b, |t| t[usize::from(b)]))
        .collect())
}

/// Builds a 256-entry table mapping each byte of `from` to the byte at the same position in `to`.
pub fn maketrans(from: &[u8], to: &[u8]) -> RunResult<Vec<u8>> {
    if from.len() != to.len() {
        return Err(ExcType::value_error("maketrans arguments must have same length"));
    }
    let mut table: Vec<u8> = (0..=u8::MAX).collect();
    for (&src, &dst) in from.iter().zip(to) {
        table[usize::from(src)] = dst;
    }
    Ok(table)
}

#[must_use]
pub fn lower(data: &[u8]) -> Vec<u8> {
    data.to_ascii_lowercase()
}

#[must_use]
pub fn upper(data: &[u8]) -> Vec<u8> {
    data.to_ascii_uppercase()
}

#[must_use]
pub fn swapcase(data: &[u8]) -> Vec<u8> {
    data.iter()
        .map(|&b| {
            if b.is_ascii_uppercase() {
                b.to_ascii_lowercase()
            } else {
                b.to_ascii_uppercase()
            }
        })
        .collect()
}

/// Uppercases the first letter of each run of letters and lowercases the rest.
#[must_use]
pub fn title(data: &[u8]) -> Vec<u8> {
    let mut previous_cased = false;
    data.iter()
        .map(|&b| {
            let mapped = if previous_cased {
                b.to_ascii_lowercase()
            } else {
                b.to_ascii_uppercase()
            };
            previous_cased = b.is_ascii_alphabetic();
            mapped
        })
        .collect()
}

#[must_use]
pub fn capitalize(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_ascii_lowercase();
    if let Some(first) = out.first_mut() {
        first.make_ascii_uppercase();
    }
    out
}

// =============================================================================
// Predicates
// =============================================================================

#[must_use]
pub fn is_alpha(data: &[u8]) -> bool {
    !data.is_empty() && data.iter().all(u8::is_ascii_alphabetic)
}

#[must_use]
pub fn is_digit(data: &[u8]) -> bool {
    !data.is_empty() && data.iter().all(u8::is_ascii_digit)
}

#[must_use]
pub fn is_alnum(data: &[u8]) -> bool {
    !data.is_empty() && data.iter().all(u8::is_ascii_alphanumeric)
}

#[must_use]
pub fn is_space(data: &[u8]) -> bool {
    !data.is_empty() && data.iter().all(|&b| is_py_whitespace(b))
}

/// At least one cased byte, and no uppercase ones.
#[must_use]
pub fn is_lower(data: &[u8]) -> bool {
    data.iter().any(u8::is_ascii_lowercase) && !data.iter().any(u8::is_ascii_uppercase)
}

/// At least one cased byte, and no lowercase ones.
#[must_use]
pub fn is_upper(data: &[u8]) -> bool {
    data.iter().any(u8::is_ascii_uppercase) && !data.iter().any(u8::is_ascii_lowercase)
}

/// Uppercase only after uncased bytes, lowercase only after cased ones.
#[must_use]
pub fn is_title(data: &[u8]) -> bool {
    let mut previous_cased = false;
    let mut any_cased = false;
    for &b in data {
        if b.is_ascii_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            any_cased = true;
        } else if b.is_ascii_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            any_cased = true;
        } else {
            previous_cased = false;
        }
    }
    any_cased
}

// =============================================================================
// Split and partition
// =============================================================================

/// `split(sep, maxsplit)`; `None` splits on whitespace runs and drops empty parts.
pub fn split<'a>(data: &'a [u8], sep: Option<&[u8]>, maxsplit: i64) -> RunResult<Vec<&'a [u8]>> {
    let limit = usize::try_from(maxsplit).unwrap_or(usize::MAX);
    let Some(sep) = sep else {
        return Ok(split_whitespace(data, limit));
    };
    if sep.is_empty() {
        return Err(ExcType::value_error_empty_separator());
    }
    let mut parts = Vec::new();
    let mut start = 0;
    while parts.len() < limit {
        let Some(pos) = find(data, sep, start, data.len()) else {
            break;
        };
        parts.push(&data[start..pos]);
        start = pos + sep.len();
    }
    parts.push(&data[start..]);
    Ok(parts)
}

/// `rsplit(sep, maxsplit)`: splits from the right, parts returned in order.
pub fn rsplit<'a>(data: &'a [u8], sep: Option<&[u8]>, maxsplit: i64) -> RunResult<Vec<&'a [u8]>> {
    let limit = usize::try_from(maxsplit).unwrap_or(usize::MAX);
    let Some(sep) = sep else {
        return Ok(rsplit_whitespace(data, limit));
    };
    if sep.is_empty() {
        return Err(ExcType::value_error_empty_separator());
    }
    let mut parts = Vec::new();
    let mut end = data.len();
    while parts.len() < limit {
        let Some(pos) = rfind(data, sep, 0, end) else {
            break;
        };
        parts.push(&data[pos + sep.len()..end]);
        end = pos;
    }
    parts.push(&data[..end]);
    parts.reverse();
    Ok(parts)
}

fn split_whitespace(data: &[u8], limit: usize) -> Vec<&[u8]> {
    let mut parts = Vec::new();
    let mut rest = lstrip(data, None);
    while !rest.is_empty() {
        if parts.len() == limit {
            parts.push(rest);
            break;
        }
        let end = rest.iter().position(|&b| is_py_whitespace(b)).unwrap_or(rest.len());
        parts.push(&rest[..end]);
        rest = lstrip(&rest[end..], None);
    }
    parts
}

fn rsplit_whitespace(data: &[u8], limit: usize) -> Vec<&[u8]> {
    let mut parts = Vec::new();
    let mut rest = rstrip(data, None);
    while !rest.is_empty() {
        if parts.len() == limit {
            parts.push(rest);
            break;
        }
        let start = rest.iter().rposition(|&b| is_py_whitespace(b)).map_or(0, |p| p + 1);
        parts.push(&rest[start..]);
        rest = rstrip(&rest[..start], None);
    }
    parts.reverse();
    parts
}

/// Splits at `\n`, `\r` and `\r\n`.
#[must_use]
pub fn splitlines(data: &[u8], keepends: bool) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    while start < data.len() {
        let mut end = start;
        while end < data.len() && !matches!(data[end], b'\n' | b'\r') {
            end += 1;
        }
        let content_end = end;
        if end < data.len() {
            end += if data[end] == b'\r' && data.get(end + 1) == Some(&b'\n') { 2 } else { 1 };
        }
        lines.push(if keepends { &data[start..end] } else { &data[start..content_end] });
        start = end;
    }
    lines
}

/// Splits around the first `sep`; `(data, b"", b"")` when absent.
pub fn partition<'a>(data: &'a [u8], sep: &'a [u8]) -> RunResult<[&'a [u8]; 3]> {
    if sep.is_empty() {
        return Err(ExcType::value_error_empty_separator());
    }
    Ok(match find(data, sep, 0, data.len()) {
        Some(pos) => [&data[..pos], sep, &data[pos + sep.len()..]],
        None => [data, &[], &[]],
    })
}

/// Splits around the last `sep`; `(b"", b"", data)` when absent.
pub fn rpartition<'a>(data: &'a [u8], sep: &'a [u8]) -> RunResult<[&'a [u8]; 3]> {
    if sep.is_empty() {
        return Err(ExcType::value_error_empty_separator());
    }
    Ok(match rfind(data, sep, 0, data.len()) {
        Some(pos) => [&data[..pos], sep, &data[pos + sep.len()..]],
        None => [&[], &[], data],
    })
}

// =============================================================================
// Hex, repr and codecs
// =============================================================================

/// Lowercase hex digits, with `sep` between bytes when given.
#[must_use]
pub fn hex(data: &[u8], sep: Option<&str>) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for (i, b) in data.iter().enumerate() {
        if i > 0
            && let Some(sep) = sep
        {
            out.push_str(sep);
        }
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Parses pairs of hex digits; whitespace is allowed between pairs only.
pub fn fromhex(text: &str) -> RunResult<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() / 2);
    let mut chars = text.chars().enumerate().peekable();
    loop {
        while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            chars.next();
        }
        let Some((hi_pos, hi)) = chars.next() else {
            break;
        };
        let hi = hi.to_digit(16).ok_or_else(|| non_hex_at(hi_pos))?;
        let Some((lo_pos, lo)) = chars.next() else {
            return Err(ExcType::value_error(
                "fromhex() arg must contain an even number of hexadecimal digits",
            ));
        };
        let lo = lo.to_digit(16).ok_or_else(|| non_hex_at(lo_pos))?;
        #[expect(clippy::cast_possible_truncation, reason = "two hex digits fit in a byte")]
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}

fn non_hex_at(position: usize) -> RunError {
    ExcType::value_error(format!(
        "non-hexadecimal number found in fromhex() arg at position {position}"
    ))
}

/// Writes the `b'...'` literal form of `data`.
///
/// Single quotes unless the data contains `'` but no `"`.
pub fn bytes_repr_fmt(data: &[u8], f: &mut impl Write) -> fmt::Result {
    let quote = if data.contains(&b'\'') && !data.contains(&b'"') { '"' } else { '\'' };
    f.write_char('b')?;
    f.write_char(quote)?;
    for &byte in data {
        match byte {
            b'\\' => f.write_str("\\\\")?,
            b'\t' => f.write_str("\\t")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\'' if quote == '\'' => f.write_str("\\'")?,
            b'"' if quote == '"' => f.write_str("\\\"")?,
            0x20..=0x7e => f.write_char(char::from(byte))?,
            _ => write!(f, "\\x{byte:02x}")?,
        }
    }
    f.write_char(quote)
}

#[must_use]
pub fn bytes_repr(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + 3);
    let _ = bytes_repr_fmt(data, &mut out);
    out
}

/// The codecs this runtime knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Utf8,
    Ascii,
    Latin1,
}

impl Codec {
    fn lookup(name: &str) -> RunResult<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "cp819" | "latin" | "l1" => Ok(Self::Latin1),
            _ => Err(ExcType::lookup_error_unknown_encoding(name)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin-1",
        }
    }
}

/// `bytes.decode(encoding)` for UTF-8, ASCII and Latin-1.
pub fn decode(data: &[u8], encoding: &str) -> RunResult<String> {
    let codec = Codec::lookup(encoding)?;
    match codec {
        Codec::Utf8 => std::str::from_utf8(data).map(str::to_owned).map_err(|err| {
            let position = err.valid_up_to();
            let reason = if err.error_len().is_some() {
                "invalid start byte"
            } else {
                "unexpected end of data"
            };
            decode_error(codec, data[position], position, reason)
        }),
        Codec::Ascii => match data.iter().position(|b| !b.is_ascii()) {
            Some(position) => Err(decode_error(codec, data[position], position, "ordinal not in range(128)")),
            None => Ok(data.iter().map(|&b| char::from(b)).collect()),
        },
        Codec::Latin1 => Ok(data.iter().map(|&b| char::from(b)).collect()),
    }
}

fn decode_error(codec: Codec, byte: u8, position: usize, reason: &str) -> RunError {
    SimpleException::new_msg(
        ExcType::UnicodeDecodeError,
        format!(
            "'{}' codec can't decode byte {byte:#04x} in position {position}: {reason}",
            codec.name()
        ),
    )
    .into()
}

/// `str.encode(encoding)` for UTF-8, ASCII and Latin-1.
pub fn encode(text: &str, encoding: &str) -> RunResult<Vec<u8>> {
    let codec = Codec::lookup(encoding)?;
    let limit = match codec {
        Codec::Utf8 => return Ok(text.as_bytes().to_vec()),
        Codec::Ascii => 0x80,
        Codec::Latin1 => 0x100,
    };
    text.chars()
        .enumerate()
        .map(|(position, c)| {
            u8::try_from(u32::from(c)).ok().filter(|_| u32::from(c) < limit).ok_or_else(|| {
                RunError::from(SimpleException::new_msg(
                    ExcType::UnicodeEncodeError,
                    format!(
                        "'{}' codec can't encode character '{}' in position {position}: ordinal not in range({limit})",
                        codec.name(),
                        c.escape_unicode()
                    ),
                ))
            })
        })
        .collect()
}

// =============================================================================
// Bytes
// =============================================================================

/// Python `bytes`: an immutable, freely shared byte string.
///
/// The empty string and every single-byte string are process-wide singletons.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes(Arc<[u8]>);

fn empty_bytes() -> &'static Bytes {
    static EMPTY: OnceLock<Bytes> = OnceLock::new();
    EMPTY.get_or_init(|| Bytes(Arc::from(&[][..])))
}

fn single_byte(byte: u8) -> &'static Bytes {
    static SINGLES: OnceLock<[Bytes; 256]> = OnceLock::new();
    let singles = SINGLES.get_or_init(|| {
        std::array::from_fn(|i| {
            let byte = u8::try_from(i).unwrap_or_default();
            Bytes(Arc::from(&[byte][..]))
        })
    });
    &singles[usize::from(byte)]
}

impl Bytes {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        match *data.as_slice() {
            [] => empty_bytes().clone(),
            [byte] => single_byte(byte).clone(),
            _ => Self(Arc::from(data)),
        }
    }

    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        match *data {
            [] => empty_bytes().clone(),
            [byte] => single_byte(byte).clone(),
            _ => Self(Arc::from(data)),
        }
    }

    /// `bytes(source)`: an int count of zero bytes, a bytes-like object, or an iterable of ints.
    pub fn from_iterable(rt: &Runtime, source: &Value) -> RunResult<Self> {
        Ok(Self::new(bytes_from_source(rt, source)?))
    }

    /// `bytes(text, encoding)`
    pub fn from_encoded_text(text: &str, encoding: &str) -> RunResult<Self> {
        Ok(Self::new(encode(text, encoding)?))
    }

    /// `bytes.fromhex(text)`
    pub fn fromhex(text: &str) -> RunResult<Self> {
        Ok(Self::new(fromhex(text)?))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `b[index]`
    pub fn get(&self, index: i64) -> RunResult<u8> {
        normalize_index(index, self.len())
            .map(|i| self.0[i])
            .ok_or_else(ExcType::bytes_index_error)
    }

    /// `self + other`, always a fresh allocation.
    #[must_use]
    pub fn concat(&self, other: &[u8]) -> Self {
        let mut out = Vec::with_capacity(self.len() + other.len());
        out.extend_from_slice(&self.0);
        out.extend_from_slice(other);
        Self::new(out)
    }

    /// `self * count`
    pub fn repeat(&self, count: i64) -> RunResult<Self> {
        let copies = usize::try_from(count.max(0)).map_err(|_| ExcType::overflow_repeat_count())?;
        let total = self.len().checked_mul(copies).ok_or_else(ExcType::overflow_repeat_count)?;
        if total > isize::MAX.unsigned_abs() {
            return Err(ExcType::overflow_repeat_count());
        }
        Ok(Self::new(self.0.repeat(copies)))
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bytes_repr_fmt(&self.0, f)
    }
}

impl From<&[u8]> for Bytes {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// Converts an integer value to a byte, as `bytearray.append` and `bytes([..])` do.
pub(crate) fn byte_value(value: &Value) -> RunResult<u8> {
    let n = value.as_index()?;
    u8::try_from(n).map_err(|_| ExcType::value_error_byte_range())
}

/// Contents of a `bytes` or `bytearray` value, copied out.
pub(crate) fn bytes_like(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(b) => Some(b.as_slice().to_vec()),
        Value::ByteArray(b) => Some(b.to_vec()),
        _ => None,
    }
}

fn expect_bytes_like(value: &Value) -> RunResult<Vec<u8>> {
    bytes_like(value).ok_or_else(|| {
        ExcType::type_error(format!("a bytes-like object is required, not '{}'", value.py_type()))
    })
}

/// Source bytes for `bytes(x)`/`bytearray(x)` and for `bytearray +=`.
pub(crate) fn bytes_from_source(rt: &Runtime, source: &Value) -> RunResult<Vec<u8>> {
    if let Some(data) = bytes_like(source) {
        return Ok(data);
    }
    match source {
        Value::Int(n) => {
            let n = usize::try_from(*n).map_err(|_| ExcType::value_error("negative count"))?;
            Ok(vec![0; n])
        }
        Value::Str(_) => Err(ExcType::type_error("string argument without an encoding")),
        other => rt.iterate(other)?.map(|item| byte_value(&item?)).collect(),
    }
}

// =============================================================================
// Dispatch glue shared by bytes and bytearray
// =============================================================================

/// The capabilities the shared method glue needs from a byte container.
pub(crate) trait ByteSequence: Sized + 'static {
    const TYPE: Type;

    fn borrow_value(value: &Value) -> Option<&Self>;

    /// Runs `f` over a consistent view of the contents.
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;

    /// Wraps a result in the receiver's own type.
    fn wrap(data: Vec<u8>) -> Value;

    fn index_error() -> RunError;
}

impl ByteSequence for Bytes {
    const TYPE: Type = Type::Bytes;

    fn borrow_value(value: &Value) -> Option<&Self> {
        match value {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.0)
    }

    fn wrap(data: Vec<u8>) -> Value {
        Value::Bytes(Self::new(data))
    }

    fn index_error() -> RunError {
        ExcType::bytes_index_error()
    }
}

fn receiver<S: ByteSequence>(args: &[Value]) -> RunResult<(&S, ArgValues<'_>)> {
    let (value, rest) = ArgValues::split(args)?;
    S::borrow_value(value)
        .map(|seq| (seq, rest))
        .ok_or_else(|| RunError::internal(format!("{} slot called on {}", S::TYPE, value.py_type())))
}

/// Built-in slot table for `bytes`.
pub(crate) fn slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::Binary(BinaryOp::Add) => add::<Bytes>,
        Operation::Binary(BinaryOp::Mul) | Operation::ReflectedBinary(BinaryOp::Mul) => mul,
        Operation::InvokeMember(name) if &**name == "__mul__" => mul,
        other => return shared_slot::<Bytes>(other).map(Builtin::Fn),
    };
    Some(Builtin::Fn(func))
}

/// Slots and methods identical for both byte containers.
pub(crate) fn shared_slot<S: ByteSequence>(op: &Operation) -> Option<BuiltinFn> {
    Some(match op {
        Operation::GetItem => getitem::<S>,
        Operation::Len => len::<S>,
        Operation::Contains => contains::<S>,
        Operation::Repr => repr::<S>,
        Operation::InvokeMember(name) => return shared_method::<S>(name),
        _ => return None,
    })
}

fn shared_method<S: ByteSequence>(name: &str) -> Option<BuiltinFn> {
    Some(match name {
        "count" => count_method::<S>,
        "find" => find_method::<S>,
        "rfind" => rfind_method::<S>,
        "index" => index_method::<S>,
        "rindex" => rindex_method::<S>,
        "startswith" => startswith::<S>,
        "endswith" => endswith::<S>,
        "replace" => replace_method::<S>,
        "strip" => strip_method::<S>,
        "lstrip" => lstrip_method::<S>,
        "rstrip" => rstrip_method::<S>,
        "removeprefix" => removeprefix::<S>,
        "removesuffix" => removesuffix::<S>,
        "center" => center_method::<S>,
        "ljust" => ljust_method::<S>,
        "rjust" => rjust_method::<S>,
        "zfill" => zfill_method::<S>,
        "expandtabs" => expandtabs_method::<S>,
        "translate" => translate_method::<S>,
        "lower" => lower_method::<S>,
        "upper" => upper_method::<S>,
        "swapcase" => swapcase_method::<S>,
        "title" => title_method::<S>,
        "capitalize" => capitalize_method::<S>,
        "isalpha" => isalpha::<S>,
        "isdigit" => isdigit::<S>,
        "isalnum" => isalnum::<S>,
        "isspace" => isspace::<S>,
        "islower" => islower::<S>,
        "isupper" => isupper::<S>,
        "istitle" => istitle::<S>,
        "split" => split_method::<S>,
        "rsplit" => rsplit_method::<S>,
        "splitlines" => splitlines_method::<S>,
        "partition" => partition_method::<S>,
        "rpartition" => rpartition_method::<S>,
        "join" => join::<S>,
        "hex" => hex_method::<S>,
        "fromhex" => fromhex_method::<S>,
        "maketrans" => maketrans_method,
        "decode" => decode_method::<S>,
        "__getitem__" => getitem::<S>,
        "__len__" => len::<S>,
        "__contains__" => contains::<S>,
        "__repr__" => repr::<S>,
        "__add__" => add::<S>,
        _ => return None,
    })
}

fn getitem<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    match args.get_one_arg("__getitem__")? {
        Value::Slice(slice) => {
            let data = seq.with_bytes(|b| slice.indices(b.len()).map(|ix| ix.iter().map(|i| b[i]).collect()))?;
            Ok(S::wrap(data))
        }
        key @ (Value::Int(_) | Value::Bool(_)) => {
            let index = key.as_index()?;
            seq.with_bytes(|b| normalize_index(index, b.len()).map(|i| b[i]))
                .map(|byte| Value::Int(i64::from(byte)))
                .ok_or_else(S::index_error)
        }
        other => Err(ExcType::type_error_indices(S::TYPE, other.py_type())),
    }
}

fn len<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    args.check_zero_args("__len__")?;
    Ok(Value::from_usize(seq.with_bytes(<[u8]>::len)))
}

/// `x in b`: an int tests for a byte, a bytes-like tests for a subsequence.
fn contains<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let needle = args.get_one_arg("__contains__")?;
    let needle = match bytes_like(needle) {
        Some(data) => data,
        None if needle.as_int().is_some() => vec![byte_value(needle)?],
        None => return Err(ExcType::type_error(format!(
            "a bytes-like object is required, not '{}'",
            needle.py_type()
        ))),
    };
    Ok(Value::Bool(seq.with_bytes(|b| find(b, &needle, 0, b.len()).is_some())))
}

fn repr<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, _) = receiver::<S>(args)?;
    let literal = seq.with_bytes(bytes_repr);
    Ok(Value::str(&match S::TYPE {
        Type::Bytearray => format!("bytearray({literal})"),
        _ => literal,
    }))
}

fn add<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let Some(other) = bytes_like(args.get_one_arg("__add__")?) else {
        return Ok(Value::NotImplemented);
    };
    let joined = seq.with_bytes(|b| {
        let mut out = Vec::with_capacity(b.len() + other.len());
        out.extend_from_slice(b);
        out.extend_from_slice(&other);
        out
    });
    Ok(S::wrap(joined))
}

fn mul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<Bytes>(args)?;
    match args.get_one_arg("__mul__")?.as_int() {
        Some(count) => seq.repeat(count).map(Value::Bytes),
        None => Ok(Value::NotImplemented),
    }
}

/// Parses `(sub[, start[, end]])` into the needle and a clamped range.
fn sub_args<S: ByteSequence>(seq: &S, args: ArgValues<'_>, name: &str) -> RunResult<(Vec<u8>, usize, usize)> {
    let (sub, start, end) = args.get_one_to_three_args(name)?;
    let needle = match bytes_like(sub) {
        Some(data) => data,
        None => vec![byte_value(sub)?],
    };
    let (start, end) = (optional_index(start)?, optional_index(end)?);
    let (start, end) = seq.with_bytes(|b| search_range(start, end, b.len()));
    Ok((needle, start, end))
}

/// Clamps a search window like `adjust_range`, except that a start past the
/// end yields an empty inverted window, so not even `b""` matches there.
fn search_range(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
    let (lo, hi) = adjust_range(start, end, len);
    match start {
        Some(s) if usize::try_from(s).is_ok_and(|s| s > len) => (len + 1, hi),
        _ => (lo, hi),
    }
}

fn position_value(found: Option<usize>) -> Value {
    found.map_or(Value::Int(-1), Value::from_usize)
}

fn count_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (needle, start, end) = sub_args(seq, args, "count")?;
    Ok(Value::from_usize(seq.with_bytes(|b| count(b, &needle, start, end))))
}

fn find_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (needle, start, end) = sub_args(seq, args, "find")?;
    Ok(position_value(seq.with_bytes(|b| find(b, &needle, start, end))))
}

fn rfind_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (needle, start, end) = sub_args(seq, args, "rfind")?;
    Ok(position_value(seq.with_bytes(|b| rfind(b, &needle, start, end))))
}

fn index_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (needle, start, end) = sub_args(seq, args, "index")?;
    seq.with_bytes(|b| find(b, &needle, start, end))
        .map(Value::from_usize)
        .ok_or_else(ExcType::value_error_subsequence_not_found)
}

fn rindex_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (needle, start, end) = sub_args(seq, args, "rindex")?;
    seq.with_bytes(|b| rfind(b, &needle, start, end))
        .map(Value::from_usize)
        .ok_or_else(ExcType::value_error_subsequence_not_found)
}

/// Shared body of `startswith`/`endswith`: one affix or a tuple of affixes.
fn affix_test<S: ByteSequence>(
    args: &[Value],
    name: &str,
    test: fn(&[u8], &[u8], usize, usize) -> bool,
) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (affix, start, end) = args.get_one_to_three_args(name)?;
    let candidates = match affix {
        Value::Tuple(items) => items.iter().map(expect_bytes_like).collect::<RunResult<Vec<_>>>()?,
        single => vec![bytes_like(single).ok_or_else(|| {
            ExcType::type_error(format!(
                "{name} first arg must be bytes or a tuple of bytes, not {}",
                single.py_type()
            ))
        })?],
    };
    let (start, end) = (optional_index(start)?, optional_index(end)?);
    let matched = seq.with_bytes(|b| {
        let (start, end) = search_range(start, end, b.len());
        candidates.iter().any(|c| test(b, c, start, end))
    });
    Ok(Value::Bool(matched))
}

fn startswith<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    affix_test::<S>(args, "startswith", starts_with)
}

fn endswith<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    affix_test::<S>(args, "endswith", ends_with)
}

fn replace_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (old, new, max) = match args.as_slice() {
        [old, new] => (old, new, -1),
        [old, new, max] => (old, new, max.as_index()?),
        other => return Err(ExcType::type_error_arg_count("replace", 2, other.len())),
    };
    let (old, new) = (expect_bytes_like(old)?, expect_bytes_like(new)?);
    Ok(S::wrap(seq.with_bytes(|b| replace(b, &old, &new, max))))
}

fn strip_args(args: ArgValues<'_>, name: &str) -> RunResult<Option<Vec<u8>>> {
    match args.get_zero_one_arg(name)? {
        None | Some(Value::None) => Ok(None),
        Some(chars) => expect_bytes_like(chars).map(Some),
    }
}

fn strip_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let chars = strip_args(args, "strip")?;
    Ok(S::wrap(seq.with_bytes(|b| strip(b, chars.as_deref()).to_vec())))
}

fn lstrip_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let chars = strip_args(args, "lstrip")?;
    Ok(S::wrap(seq.with_bytes(|b| lstrip(b, chars.as_deref()).to_vec())))
}

fn rstrip_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let chars = strip_args(args, "rstrip")?;
    Ok(S::wrap(seq.with_bytes(|b| rstrip(b, chars.as_deref()).to_vec())))
}

fn removeprefix<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let prefix = expect_bytes_like(args.get_one_arg("removeprefix")?)?;
    Ok(S::wrap(seq.with_bytes(|b| b.strip_prefix(prefix.as_slice()).unwrap_or(b).to_vec())))
}

fn removesuffix<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let suffix = expect_bytes_like(args.get_one_arg("removesuffix")?)?;
    Ok(S::wrap(seq.with_bytes(|b| b.strip_suffix(suffix.as_slice()).unwrap_or(b).to_vec())))
}

/// Parses `(width[, fillbyte])`; the fill must be exactly one byte.
fn justify_args(args: ArgValues<'_>, name: &str) -> RunResult<(i64, u8)> {
    let (width, fill) = args.get_one_two_args(name)?;
    let fill = match fill {
        None => b' ',
        Some(value) => match bytes_like(value).as_deref() {
            Some(&[byte]) => byte,
            _ => return Err(ExcType::type_error_fill_byte(name)),
        },
    };
    Ok((width.as_index()?, fill))
}

fn center_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (width, fill) = justify_args(args, "center")?;
    Ok(S::wrap(seq.with_bytes(|b| center(b, width, fill))))
}

fn ljust_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (width, fill) = justify_args(args, "ljust")?;
    Ok(S::wrap(seq.with_bytes(|b| ljust(b, width, fill))))
}

fn rjust_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (width, fill) = justify_args(args, "rjust")?;
    Ok(S::wrap(seq.with_bytes(|b| rjust(b, width, fill))))
}

fn zfill_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let width = args.get_one_arg("zfill")?.as_index()?;
    Ok(S::wrap(seq.with_bytes(|b| zfill(b, width))))
}

fn expandtabs_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let tabsize = match args.get_zero_one_arg("expandtabs")? {
        Some(size) => size.as_index()?,
        None => 8,
    };
    Ok(S::wrap(seq.with_bytes(|b| expandtabs(b, tabsize))))
}

fn translate_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (table, delete) = args.get_one_two_args("translate")?;
    let table = match table {
        Value::None => None,
        other => Some(expect_bytes_like(other)?),
    };
    let delete = delete.map(expect_bytes_like).transpose()?.unwrap_or_default();
    seq.with_bytes(|b| translate(b, table.as_deref(), &delete)).map(S::wrap)
}

/// Shared body of the no-argument transforms.
fn transform<S: ByteSequence>(args: &[Value], name: &str, f: fn(&[u8]) -> Vec<u8>) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    args.check_zero_args(name)?;
    Ok(S::wrap(seq.with_bytes(f)))
}

fn lower_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    transform::<S>(args, "lower", lower)
}

fn upper_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    transform::<S>(args, "upper", upper)
}

fn swapcase_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    transform::<S>(args, "swapcase", swapcase)
}

fn title_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    transform::<S>(args, "title", title)
}

fn capitalize_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    transform::<S>(args, "capitalize", capitalize)
}

/// Shared body of the `is*` predicates.
fn predicate<S: ByteSequence>(args: &[Value], name: &str, f: fn(&[u8]) -> bool) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    args.check_zero_args(name)?;
    Ok(Value::Bool(seq.with_bytes(f)))
}

fn isalpha<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    predicate::<S>(args, "isalpha", is_alpha)
}

fn isdigit<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    predicate::<S>(args, "isdigit", is_digit)
}

fn isalnum<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    predicate::<S>(args, "isalnum", is_alnum)
}

fn isspace<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    predicate::<S>(args, "isspace", is_space)
}

fn islower<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    predicate::<S>(args, "islower", is_lower)
}

fn isupper<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    predicate::<S>(args, "isupper", is_upper)
}

fn istitle<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    predicate::<S>(args, "istitle", is_title)
}

fn parts_list<S: ByteSequence>(parts: Vec<&[u8]>) -> Value {
    Value::List(List::from_vec(parts.into_iter().map(|p| S::wrap(p.to_vec())).collect()))
}

/// Parses `(sep=None, maxsplit=-1)`.
fn split_args(args: ArgValues<'_>, name: &str) -> RunResult<(Option<Vec<u8>>, i64)> {
    let (sep, maxsplit) = args.get_zero_one_two_args(name)?;
    let sep = match sep {
        None | Some(Value::None) => None,
        Some(sep) => Some(expect_bytes_like(sep)?),
    };
    let maxsplit = optional_index(maxsplit)?.unwrap_or(-1);
    Ok((sep, maxsplit))
}

fn split_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (sep, maxsplit) = split_args(args, "split")?;
    seq.with_bytes(|b| split(b, sep.as_deref(), maxsplit).map(parts_list::<S>))
}

fn rsplit_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (sep, maxsplit) = split_args(args, "rsplit")?;
    seq.with_bytes(|b| rsplit(b, sep.as_deref(), maxsplit).map(parts_list::<S>))
}

fn splitlines_method<S: ByteSequence>(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let keepends = match args.get_zero_one_arg("splitlines")? {
        Some(flag) => rt.truthy(flag)?,
        None => false,
    };
    Ok(seq.with_bytes(|b| parts_list::<S>(splitlines(b, keepends))))
}

fn parts_tuple<S: ByteSequence>(parts: [&[u8]; 3]) -> Value {
    Value::tuple(parts.map(|p| S::wrap(p.to_vec())).to_vec())
}

fn partition_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let sep = expect_bytes_like(args.get_one_arg("partition")?)?;
    seq.with_bytes(|b| partition(b, &sep).map(parts_tuple::<S>))
}

fn rpartition_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let sep = expect_bytes_like(args.get_one_arg("rpartition")?)?;
    seq.with_bytes(|b| rpartition(b, &sep).map(parts_tuple::<S>))
}

/// `sep.join(iterable)`; the iterable is drained with no lock held.
fn join<S: ByteSequence>(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let separator = seq.with_bytes(<[u8]>::to_vec);
    let mut out = Vec::new();
    for (index, item) in rt.iterate(args.get_one_arg("join")?)?.enumerate() {
        let item = item?;
        let Some(data) = bytes_like(&item) else {
            return Err(ExcType::type_error(format!(
                "sequence item {index}: expected a bytes-like object, {} found",
                rt.type_name(&item)
            )));
        };
        if index > 0 {
            out.extend_from_slice(&separator);
        }
        out.extend_from_slice(&data);
    }
    Ok(S::wrap(out))
}

fn hex_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let sep = match args.get_zero_one_arg("hex")? {
        None => None,
        Some(Value::Str(s)) => Some(s.to_string()),
        Some(other) => match bytes_like(other) {
            Some(data) => Some(decode(&data, "ascii")?),
            None => return Err(ExcType::type_error("sep must be str or bytes.")),
        },
    };
    Ok(Value::str(&seq.with_bytes(|b| hex(b, sep.as_deref()))))
}

fn fromhex_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (_, args) = receiver::<S>(args)?;
    match args.get_one_arg("fromhex")? {
        Value::Str(text) => fromhex(text).map(S::wrap),
        other => Err(ExcType::type_error(format!(
            "fromhex() argument must be str, not {}",
            other.py_type()
        ))),
    }
}

fn maketrans_method(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (_, args) = ArgValues::split(args)?;
    let (from, to) = args.get_two_args("maketrans")?;
    let table = maketrans(&expect_bytes_like(from)?, &expect_bytes_like(to)?)?;
    Ok(Value::Bytes(Bytes::new(table)))
}

fn decode_method<S: ByteSequence>(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (seq, args) = receiver::<S>(args)?;
    let (encoding, _errors) = args.get_zero_one_two_args("decode")?;
    let encoding = match encoding {
        None => "utf-8",
        Some(Value::Str(name)) => &**name,
        Some(other) => {
            return Err(ExcType::type_error(format!(
                "decode() argument 'encoding' must be str, not {}",
                other.py_type()
            )));
        }
    };
    let text = seq.with_bytes(|b| decode(b, encoding))?;
    Ok(Value::str(&text))
}
