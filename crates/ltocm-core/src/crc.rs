//! CRC-A codec (ISO/IEC 14443-3 Type A).
//!
//! Reflected CRC-16, polynomial 0x8408, initial value 0x6363. The two
//! result bytes go on the wire low byte first.

/// Initial register value for CRC-A.
pub const CRC_A_INIT: u16 = 0x6363;

/// Compute the CRC-A of `data`, returning `(lo, hi)` in wire order.
pub fn crc_a(data: &[u8]) -> (u8, u8) {
    let crc = data.iter().fold(CRC_A_INIT, |crc, &byte| {
        let mut b = byte ^ (crc & 0x00FF) as u8;
        b ^= b << 4;
        let b = b as u16;
        (crc >> 8) ^ (b << 8) ^ (b << 3) ^ (b >> 4)
    });
    ((crc & 0x00FF) as u8, (crc >> 8) as u8)
}

/// Write the CRC-A of `frame[..n]` into `frame[n]` and `frame[n + 1]`.
///
/// # Panics
///
/// Panics if `frame` is shorter than `n + 2`. Command templates in this
/// crate are fixed-size arrays sized for their CRC.
pub fn append_crc(frame: &mut [u8], n: usize) {
    let (lo, hi) = crc_a(&frame[..n]);
    frame[n] = lo;
    frame[n + 1] = hi;
}

/// Check that the last two bytes of `frame` are the CRC-A of the rest.
///
/// Frames shorter than two bytes never verify.
pub fn verify_crc(frame: &[u8]) -> bool {
    match frame.len().checked_sub(2) {
        Some(n) => crc_a(&frame[..n]) == (frame[n], frame[n + 1]),
        None => false,
    }
}
