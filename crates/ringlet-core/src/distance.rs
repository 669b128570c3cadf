//! Ring closeness between identifiers.

/// Bound the absolute difference is reduced by so it fits a signed 32-bit value.
pub const DISTANCE_MODULUS: u64 = (1 << 31) - 1;

/// Absolute difference of `a` and `b` read as unsigned big-endian integers,
/// reduced modulo [`DISTANCE_MODULUS`].
///
/// Only meaningful as an ordering for "which id is closer"; shorter inputs
/// are treated as left-padded with zeros.
pub fn distance(a: impl AsRef<[u8]>, b: impl AsRef<[u8]>) -> u32 {
    let (a, b) = (a.as_ref(), b.as_ref());
    let len = a.len().max(b.len());
    let a = left_pad(a, len);
    let b = left_pad(b, len);
    // equal widths compare lexicographically exactly as integers
    let (high, low) = if a >= b { (a, b) } else { (b, a) };

    let mut diff = vec![0_u8; len];
    let mut borrow = 0_i16;
    for i in (0..len).rev() {
        let mut d = i16::from(high[i]) - i16::from(low[i]) - borrow;
        borrow = 0;
        if d < 0 {
            d += 256;
            borrow = 1;
        }
        diff[i] = d as u8;
    }

    diff.iter()
        .fold(0_u64, |acc, byte| (acc * 256 + u64::from(*byte)) % DISTANCE_MODULUS) as u32
}

fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0_u8; len - bytes.len()];
    out.extend_from_slice(bytes);
    out
}
