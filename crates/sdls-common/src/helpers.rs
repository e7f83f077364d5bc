//! Helpers for handling key material.

use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Decode a hex string, tolerating an optional `0x` prefix and embedded
/// whitespace (keys are often pasted in grouped form).
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    Ok(hex::decode(digits)?)
}

/// Decode hex key material and check it has exactly `expected` bytes.
///
/// The returned buffer is wiped on drop.
pub fn decode_key(s: &str, expected: usize) -> Result<Zeroizing<Vec<u8>>> {
    let key = Zeroizing::new(decode_hex(s)?);
    if key.len() != expected {
        return Err(Error::InvalidKeyLength {
            expected,
            actual: key.len(),
        });
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_plain() {
        assert_eq!(decode_hex("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
    }

    #[test]
    fn test_decode_hex_prefix_and_whitespace() {
        assert_eq!(decode_hex("0xDE AD\nbe ef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_decode_hex_rejects_odd_length() {
        assert!(matches!(decode_hex("abc"), Err(Error::Hex(_))));
    }

    #[test]
    fn test_decode_key_length() {
        let key = decode_key(&"11".repeat(32), 32).unwrap();
        assert_eq!(key.len(), 32);

        match decode_key(&"11".repeat(16), 32) {
            Err(Error::InvalidKeyLength { expected, actual }) => {
                assert_eq!(expected, 32);
                assert_eq!(actual, 16);
            }
            other => panic!("unexpected result: {:?}", other.map(|k| k.len())),
        }
    }
}
