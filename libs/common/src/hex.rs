//! Hex encoding utility for raw register payloads

use std::fmt::Write;

/// Encode bytes to lowercase hex string
/// Example: [0x12, 0x34, 0xAB] -> "1234ab"
pub fn encode_lower(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 2);
    for byte in data {
        // Writing to String buffer is infallible
        let _ = write!(&mut result, "{:02x}", byte);
    }
    result
}

/// Flatten 16-bit registers into big-endian bytes (wire order)
pub fn registers_to_be_bytes(registers: &[u16]) -> Vec<u8> {
    registers.iter().flat_map(|r| r.to_be_bytes()).collect()
}
