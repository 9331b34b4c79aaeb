pub mod keyword_hash;

use rand::RngCore;
use zeroize::Zeroize;

pub use keyword_hash::KeywordHasher;

pub const KEY_SIZE: usize = 32;

/// Fresh random key for keyword hashing.
pub fn generate_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Decode a hex-encoded key as persisted in `app_meta`.
pub fn decode_key(encoded: &str) -> Result<[u8; KEY_SIZE], KeyError> {
    let mut bytes = hex::decode(encoded.trim()).map_err(|_| KeyError::InvalidHex)?;
    if bytes.len() != KEY_SIZE {
        let len = bytes.len();
        bytes.zeroize();
        return Err(KeyError::InvalidKeyLength(len));
    }
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&bytes);
    bytes.zeroize();
    Ok(key)
}

#[derive(Debug)]
pub enum KeyError {
    InvalidHex,
    InvalidKeyLength(usize),
}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyError::InvalidHex => write!(f, "stored keyword hash key is not valid hex"),
            KeyError::InvalidKeyLength(len) => {
                write!(
                    f,
                    "invalid keyword hash key length: {} (expected {})",
                    len, KEY_SIZE
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_key(), generate_key());
    }

    #[test]
    fn test_decode_roundtrip() {
        let key = generate_key();
        let decoded = decode_key(&hex::encode(key)).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(decode_key("zz"), Err(KeyError::InvalidHex)));
        assert!(matches!(
            decode_key("abcd"),
            Err(KeyError::InvalidKeyLength(2))
        ));
    }
}
