use zeroize::Zeroize;

use super::{Store, StoreError};
use crate::security::{self, KeywordHasher};

const KEYWORD_HASH_KEY: &str = "keyword_hash_key";
const KEYWORD_HASH_MODE: &str = "keyword_hash_mode";

const MODE_HMAC: &str = "hmac";
const MODE_PLAIN: &str = "plain";

impl Store {
    pub fn get_meta(&self, key: &str) -> Result<Option<String>, sqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM app_meta WHERE key = ?")?;
        stmt.bind((1, key))?;
        if let Ok(sqlite::State::Row) = stmt.next() {
            Ok(Some(stmt.read::<String, _>(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), sqlite::Error> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO app_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )?;
        stmt.bind((1, key))?;
        stmt.bind((2, value))?;
        stmt.next()?;
        Ok(())
    }

    pub fn delete_meta(&self, key: &str) -> Result<(), sqlite::Error> {
        let mut stmt = self.conn.prepare("DELETE FROM app_meta WHERE key = ?")?;
        stmt.bind((1, key))?;
        stmt.next()?;
        Ok(())
    }

    /// Read the keyword hashing secret, generating and persisting one on first use.
    pub(super) fn load_or_create_hasher(&self) -> Result<KeywordHasher, StoreError> {
        if let Some(mut encoded) = self.get_meta(KEYWORD_HASH_KEY)? {
            let decoded = security::decode_key(&encoded);
            encoded.zeroize();
            return Ok(KeywordHasher::new(decoded?));
        }

        let key = security::generate_key();
        let mut encoded = hex::encode(key);
        let saved = self.set_meta(KEYWORD_HASH_KEY, &encoded);
        encoded.zeroize();
        saved?;
        log::info!("Generated a new keyword hash key");
        Ok(KeywordHasher::new(key))
    }

    /// Refuse to serve an index whose keywords were stored in the other form:
    /// every lookup would silently miss. The mode is recorded on first open.
    pub(super) fn check_hash_mode(&self, hash_keywords: bool) -> Result<(), StoreError> {
        let requested = if hash_keywords { MODE_HMAC } else { MODE_PLAIN };
        let stored = match self.get_meta(KEYWORD_HASH_MODE)? {
            Some(stored) => stored,
            // Databases from before the mode was recorded: a hash key means hmac.
            None if self.get_meta(KEYWORD_HASH_KEY)?.is_some() => MODE_HMAC.to_string(),
            None if self.stats()?.postings > 0 => MODE_PLAIN.to_string(),
            None => {
                self.set_meta(KEYWORD_HASH_MODE, requested)?;
                return Ok(());
            }
        };
        if stored != requested {
            return Err(StoreError::HashModeMismatch {
                stored,
                requested: requested.to_string(),
            });
        }
        self.set_meta(KEYWORD_HASH_MODE, requested)?;
        Ok(())
    }

    /// Drop every posting along with the keyword hash key and mode. Postings
    /// hashed under the old key would be unreachable afterwards, so all go
    /// together. Consumes
    /// the store since its hasher is stale once the key is gone.
    pub fn reset(self) -> Result<(), StoreError> {
        self.conn.execute("BEGIN")?;
        let result = self
            .clear_index()
            .and_then(|_| self.delete_meta(KEYWORD_HASH_KEY))
            .and_then(|_| self.delete_meta(KEYWORD_HASH_MODE));
        match result {
            Ok(()) => {
                self.conn.execute("COMMIT")?;
                log::info!("Index reset");
                Ok(())
            }
            Err(e) => {
                self.conn.execute("ROLLBACK").ok();
                Err(e.into())
            }
        }
    }
}
