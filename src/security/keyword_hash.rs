use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use super::KEY_SIZE;

type HmacSha256 = Hmac<Sha256>;

/// Keyed one-way mapping from plaintext keywords to the tokens the store
/// persists. Equal keywords under the same key always hash equally, so lookups
/// work without the store ever holding the plaintext.
pub struct KeywordHasher {
    key: [u8; KEY_SIZE],
}

impl KeywordHasher {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    pub fn hash(&self, keyword: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC key length should be valid");
        mac.update(keyword.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl Drop for KeywordHasher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for KeywordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeywordHasher { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        let hasher = KeywordHasher::new([7u8; KEY_SIZE]);
        assert_eq!(hasher.hash("猫"), hasher.hash("猫"));
        assert_eq!(hasher.hash("猫").len(), 64);
    }

    #[test]
    fn test_hash_depends_on_key() {
        let a = KeywordHasher::new([1u8; KEY_SIZE]);
        let b = KeywordHasher::new([2u8; KEY_SIZE]);
        assert_ne!(a.hash("search"), b.hash("search"));
    }

    #[test]
    fn test_hash_hides_plaintext() {
        let hasher = KeywordHasher::new([3u8; KEY_SIZE]);
        let hashed = hasher.hash("telegram");
        assert!(!hashed.contains("telegram"));
        assert_ne!(hasher.hash("telegram"), hasher.hash("Telegram"));
    }
}
