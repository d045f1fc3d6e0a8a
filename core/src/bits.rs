use crate::error::{LinkError, Result};

/// Bits of a byte slice, most significant bit first.
pub fn bits_from_bytes(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for k in (0..8).rev() {
            bits.push((byte >> k) & 1 == 1);
        }
    }
    bits
}

/// Bytes of a bitstring whose length is a whole number of octets.
pub fn bytes_from_bits(bits: &[bool]) -> Result<Vec<u8>> {
    if bits.len() % 8 != 0 {
        return Err(LinkError::InvalidBitCount(bits.len(), 8));
    }
    Ok(bits.chunks(8).map(pack_octet).collect())
}

/// Bytes of a bitstring, zero-padding a trailing partial octet.
pub fn bytes_from_bits_padded(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8).map(pack_octet).collect()
}

fn pack_octet(chunk: &[bool]) -> u8 {
    let mut byte = 0u8;
    for (k, &bit) in chunk.iter().enumerate() {
        if bit {
            byte |= 1 << (7 - k);
        }
    }
    byte
}

/// Minimal-width big-endian bits of an unsigned integer; zero is a
/// single zero bit.
pub fn int_to_bits(value: u64) -> Vec<bool> {
    let width = (64 - value.leading_zeros()).max(1) as usize;
    (0..width).rev().map(|k| (value >> k) & 1 == 1).collect()
}

pub fn int_from_bits(bits: &[bool]) -> u64 {
    bits.iter().fold(0u64, |acc, &b| (acc << 1) | u64::from(b))
}

pub fn float64_to_bits(value: f64) -> Vec<bool> {
    bits_from_bytes(&value.to_be_bytes())
}

pub fn float32_to_bits(value: f32) -> Vec<bool> {
    bits_from_bytes(&value.to_be_bytes())
}

/// Decode an IEEE-754 payload; the bit length picks the precision and
/// 32-bit values widen to f64.
pub fn float_from_bits(bits: &[bool]) -> Result<f64> {
    match bits.len() {
        32 => {
            let bytes = bytes_from_bits(bits)?;
            Ok(f64::from(f32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])))
        }
        64 => {
            let bytes = bytes_from_bits(bits)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes);
            Ok(f64::from_be_bytes(raw))
        }
        n => Err(LinkError::UnsupportedBitLength(n)),
    }
}

pub fn text_to_bits(text: &str) -> Vec<bool> {
    bits_from_bytes(text.as_bytes())
}

pub fn text_from_bits(bits: &[bool]) -> Result<String> {
    Ok(String::from_utf8(bytes_from_bits(bits)?)?)
}

pub fn bool_to_bits(value: bool) -> Vec<bool> {
    vec![value]
}

pub fn bool_from_bits(bits: &[bool]) -> Result<bool> {
    if bits.len() != 1 {
        return Err(LinkError::InvalidBitCount(bits.len(), 1));
    }
    Ok(bits[0])
}

/// Parse bitstream text; characters other than `0`/`1` are ignored, and
/// input with no bit characters at all is an error.
pub fn bits_from_text(text: &str) -> Result<Vec<bool>> {
    let bits: Vec<bool> = text
        .chars()
        .filter_map(|c| match c {
            '0' => Some(false),
            '1' => Some(true),
            _ => None,
        })
        .collect();
    if bits.is_empty() {
        return Err(LinkError::EmptyBitstream);
    }
    Ok(bits)
}

/// Render a bitstring as `0`/`1` text.
pub fn bits_to_text(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}
