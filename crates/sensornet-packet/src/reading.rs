//! Sensor readings as carried in `MeasureResponse` payloads.
//!
//! Sensors send their reading as upper-case hex digits. The master decodes
//! leniently: case is ignored and any non-hex character counts as digit 0.

/// Decode an ASCII hex reading. Overflow wraps.
pub fn decode_reading(digits: &[u8]) -> u32 {
    digits.iter().fold(0u32, |acc, &c| {
        let nibble = (c as char).to_digit(16).unwrap_or(0);
        acc.wrapping_mul(16).wrapping_add(nibble)
    })
}

/// Encode a 16-bit reading as four upper-case hex digits, most significant first.
pub fn encode_reading(value: u16) -> [u8; 4] {
    let mut digits = [b'0'; 4];
    digits.copy_from_slice(hex::encode_upper(value.to_be_bytes()).as_bytes());
    digits
}
