//! Message <-> bit string conversion.
//!
//! Every character contributes its code point as 8 big-endian bits. Code
//! points above 255 keep only their low 8 bits, so such characters do not
//! survive a round trip through `decode`.

use crate::core::errors::EncodingError;

/// Bits per encoded character.
pub const BITS_PER_CHAR: usize = 8;

/// Encodes `message` into `8 * chars().count()` bits.
pub fn encode(message: &str) -> Vec<bool> {
    let mut bits = Vec::with_capacity(message.chars().count() * BITS_PER_CHAR);
    for ch in message.chars() {
        // Truncation to the low byte is the documented limitation.
        let byte = (u32::from(ch) & 0xFF) as u8;
        for shift in (0..BITS_PER_CHAR).rev() {
            bits.push((byte >> shift) & 1 == 1);
        }
    }
    bits
}

/// Decodes 8-bit groups back into characters (Latin-1).
pub fn decode(bits: &[bool]) -> Result<String, EncodingError> {
    if bits.len() % BITS_PER_CHAR != 0 {
        return Err(EncodingError::NotByteAligned(bits.len()));
    }

    Ok(bits
        .chunks_exact(BITS_PER_CHAR)
        .map(|group| {
            let byte = group
                .iter()
                .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit));
            char::from(byte)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::bits_to_string;

    #[test]
    fn encodes_single_char() {
        assert_eq!(bits_to_string(&encode("A")), "01000001");
    }

    #[test]
    fn empty_message_is_empty() {
        assert!(encode("").is_empty());
        assert_eq!(decode(&[]).unwrap(), "");
    }

    #[test]
    fn wide_code_points_wrap_to_low_byte() {
        // U+0141 -> 0x41
        assert_eq!(encode("\u{141}"), encode("A"));
        assert_eq!(encode("\u{141}").len(), 8);
    }

    #[test]
    fn decode_rejects_partial_byte() {
        assert_eq!(
            decode(&[true, false, true]),
            Err(EncodingError::NotByteAligned(3))
        );
    }

    #[test]
    fn latin1_round_trip() {
        let msg = "Hi, Bob! \u{e9}\u{ff}";
        assert_eq!(decode(&encode(msg)).unwrap(), msg);
    }
}
