//! Decimal rendering of unsigned integers for log records.

/// Renders `num` as decimal ASCII digits without leading zeros.
///
/// Digits are produced least-significant first into a fixed buffer and copied out in reverse,
/// `u64::MAX` has 20 digits so the buffer never overflows.
pub fn itoa(mut num: u64) -> Vec<u8> {
    if num == 0 {
        return b"0".to_vec();
    }

    let mut digits = [0u8; 20];
    let mut len = 0;
    while num > 0 {
        digits[len] = b'0' + (num % 10) as u8;
        num /= 10;
        len += 1;
    }
    digits[..len].iter().rev().copied().collect()
}
