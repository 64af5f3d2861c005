//! CPython-compatible hash functions for the scalar values strata stores.
//!
//! Hashing is deterministic and equivalent to CPython running with
//! `PYTHONHASHSEED=0`: text and bytes use SipHash-1-3 with a zeroed key,
//! numbers hash modulo the Mersenne prime `2^61 - 1`, and tuples mix their
//! element hashes with the xxHash-derived lanes CPython uses.
//!
//! ## Cross-type hash invariant
//!
//! `a == b` implies `hash(a) == hash(b)`. Because `1 == 1.0 == True` and
//! `b"ab" == bytearray(b"ab")`, every numeric helper funnels integral floats
//! through [`hash_int`], and bytes-like values share [`hash_bytes`].
//!
//! All helpers return the bit pattern of the signed Python hash as `u64`,
//! which is the representation the probe tables store.

/// Mersenne prime used by CPython for numeric hashing: `2^61 - 1`.
const MODULUS: u64 = (1 << 61) - 1;

/// `hash(float('inf'))` in CPython.
const HASH_INF: i64 = 314_159;

/// Reinterprets a signed Python hash as the stored `u64` form.
#[inline]
fn to_lane(signed: i64) -> u64 {
    u64::from_ne_bytes(signed.to_ne_bytes())
}

/// CPython reserves `-1` as an error sentinel and remaps it to `-2`.
#[inline]
fn fix_sentinel(signed: i64) -> i64 {
    if signed == -1 { -2 } else { signed }
}

/// Hashes raw bytes the way CPython hashes `bytes` under seed 0.
///
/// Empty input hashes to `0`.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        return 0;
    }
    let signed = i64::from_ne_bytes(siphash13_seed0(bytes).to_ne_bytes());
    to_lane(fix_sentinel(signed))
}

/// Hashes string content. Equal to [`hash_bytes`] over the UTF-8 encoding,
/// which matches CPython for ASCII text.
#[must_use]
pub fn hash_str(value: &str) -> u64 {
    hash_bytes(value.as_bytes())
}

/// Hashes an integer using CPython's sign-preserving modular reduction.
#[must_use]
pub fn hash_int(value: i64) -> u64 {
    to_lane(hash_int_signed(value))
}

fn hash_int_signed(value: i64) -> i64 {
    if value == 0 {
        return 0;
    }
    // i64::MIN has no positive counterpart, so reduce the magnitude as u64.
    let remainder = (value.unsigned_abs() % MODULUS) as i64;
    let signed = if value < 0 { -remainder } else { remainder };
    fix_sentinel(signed)
}

/// Hashes a float so that integral values agree with [`hash_int`].
///
/// `inf` hashes to `314159`, `-inf` to `-314159`, and NaN to `0`.
#[must_use]
pub fn hash_float(value: f64) -> u64 {
    to_lane(hash_float_signed(value))
}

fn hash_float_signed(value: f64) -> i64 {
    if value.is_infinite() {
        return if value > 0.0 { HASH_INF } else { -HASH_INF };
    }
    if value.is_nan() {
        return 0;
    }
    let truncated = value.trunc();
    if value == truncated && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
        let integral = truncated as i64;
        return hash_int_signed(integral);
    }

    let (mut mantissa, mut exponent) = frexp(value);
    let sign: i64 = if mantissa < 0.0 {
        mantissa = -mantissa;
        -1
    } else {
        1
    };

    // Fold the mantissa in 28-bit chunks, reducing modulo 2^61 - 1 as we go.
    let mut acc: u64 = 0;
    while mantissa > 0.0 {
        acc = ((acc << 28) & MODULUS) | (acc >> 33);
        mantissa *= 268_435_456.0;
        exponent -= 28;
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "0 <= mantissa < 2^28")]
        let chunk = mantissa as u64;
        mantissa -= chunk as f64;
        acc += chunk;
        if acc >= MODULUS {
            acc -= MODULUS;
        }
    }

    let shift = exponent.rem_euclid(61).unsigned_abs();
    acc = ((acc << shift) & MODULUS) | (acc >> (61 - shift));
    #[expect(clippy::cast_possible_wrap, reason = "acc < 2^61")]
    let signed = sign * acc as i64;
    fix_sentinel(signed)
}

/// Returns `(frac, exp)` with `value == frac * 2^exp` and `0.5 <= |frac| < 1`.
fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }
    let bits = value.to_bits();
    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap, reason = "11-bit field")]
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // Subnormal: scale into the normal range first.
        let (frac, exp) = frexp(value * 18_446_744_073_709_551_616.0);
        return (frac, exp - 64);
    }
    let frac = f64::from_bits((bits & 0x800F_FFFF_FFFF_FFFF) | 0x3FE0_0000_0000_0000);
    (frac, biased - 1022)
}

/// Incremental tuple hash following CPython's `tuplehash`.
///
/// Feed element hashes with [`TupleHasher::push`], then call [`TupleHasher::finish`].
#[derive(Debug, Clone, Copy)]
pub struct TupleHasher {
    acc: u64,
    len: u64,
}

impl TupleHasher {
    const XXPRIME_1: u64 = 11_400_714_785_074_694_791;
    const XXPRIME_2: u64 = 14_029_467_366_897_019_727;
    const XXPRIME_5: u64 = 2_870_177_450_012_600_261;

    #[must_use]
    pub fn new() -> Self {
        Self {
            acc: Self::XXPRIME_5,
            len: 0,
        }
    }

    pub fn push(&mut self, lane: u64) {
        self.acc = self.acc.wrapping_add(lane.wrapping_mul(Self::XXPRIME_2));
        self.acc = self.acc.rotate_left(31);
        self.acc = self.acc.wrapping_mul(Self::XXPRIME_1);
        self.len += 1;
    }

    #[must_use]
    pub fn finish(self) -> u64 {
        let acc = self.acc.wrapping_add(self.len ^ (Self::XXPRIME_5 ^ 3_527_539));
        if acc == u64::MAX { 1_546_275_796 } else { acc }
    }
}

impl Default for TupleHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Order-independent hash of a frozenset given its element hashes.
///
/// Follows CPython's `frozenset_hash`: each element hash is bit-shuffled
/// before being xor-ed in so that small integer sets do not collide.
#[must_use]
pub fn hash_frozenset(element_hashes: impl ExactSizeIterator<Item = u64>) -> u64 {
    fn shuffle_bits(h: u64) -> u64 {
        ((h ^ 89_869_747) ^ (h << 16)).wrapping_mul(3_644_798_167)
    }

    let len = element_hashes.len() as u64;
    let mut hash = element_hashes.fold(0_u64, |acc, h| acc ^ shuffle_bits(h));
    hash ^= len.wrapping_add(1).wrapping_mul(1_927_868_237);
    hash ^= (hash >> 11) ^ (hash >> 25);
    hash = hash.wrapping_mul(69_069).wrapping_add(907_133_923);
    if hash == u64::MAX { 590_923_713 } else { hash }
}

/// SipHash-1-3 with a zero key, as CPython uses under `PYTHONHASHSEED=0`.
fn siphash13_seed0(bytes: &[u8]) -> u64 {
    let mut state = [
        0x736f_6d65_7073_6575_u64,
        0x646f_7261_6e64_6f6d,
        0x6c79_6765_6e65_7261,
        0x7465_6462_7974_6573,
    ];

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut block = [0_u8; 8];
        block.copy_from_slice(chunk);
        compress(&mut state, u64::from_le_bytes(block));
    }

    let mut tail = (bytes.len() as u64) << 56;
    for (index, byte) in chunks.remainder().iter().enumerate() {
        tail |= u64::from(*byte) << (index * 8);
    }
    compress(&mut state, tail);

    state[2] ^= 0xff;
    for _ in 0..3 {
        sip_round(&mut state);
    }
    state[0] ^ state[1] ^ state[2] ^ state[3]
}

#[inline]
fn compress(state: &mut [u64; 4], message: u64) {
    state[3] ^= message;
    sip_round(state);
    state[0] ^= message;
}

#[inline]
fn sip_round(v: &mut [u64; 4]) {
    v[0] = v[0].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(13) ^ v[0];
    v[0] = v[0].rotate_left(32);

    v[2] = v[2].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(16) ^ v[2];

    v[0] = v[0].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(21) ^ v[0];

    v[2] = v[2].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(17) ^ v[2];
    v[2] = v[2].rotate_left(32);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn numeric_cross_type() {
        assert_eq!(hash_int(1), hash_float(1.0));
        assert_eq!(hash_int(-7), hash_float(-7.0));
        assert_eq!(hash_int(0), hash_float(-0.0));
        assert_eq!(hash_int(-1), to_lane(-2));
        assert_eq!(hash_float(f64::INFINITY), 314_159);
    }

    #[test]
    fn int_wraps_at_modulus() {
        assert_eq!(hash_int(MODULUS as i64), 0);
        assert_eq!(hash_int(MODULUS as i64 + 5), 5);
    }

    #[test]
    fn float_fraction_matches_cpython() {
        // hash(0.5) == 1152921504606846976 in CPython
        assert_eq!(hash_float(0.5), 1_152_921_504_606_846_976);
    }

    #[test]
    fn bytes_and_str_agree() {
        assert_eq!(hash_bytes(b""), 0);
        assert_eq!(hash_bytes(b"abc"), hash_str("abc"));
    }

    #[test]
    fn empty_tuple_matches_cpython() {
        // hash(()) == 5740354900026072187 in CPython 3.8+
        assert_eq!(TupleHasher::new().finish(), 5_740_354_900_026_072_187);
    }

    #[test]
    fn frozenset_matches_cpython() {
        // hash(frozenset([1, 2, 3])) == -272375401224217160 in CPython
        let hash = hash_frozenset([1, 2, 3].into_iter().map(hash_int));
        assert_eq!(hash, to_lane(-272_375_401_224_217_160));
    }
}
