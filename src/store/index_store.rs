use std::collections::VecDeque;

use async_trait::async_trait;

use super::posting::{Posting, PostingCursor, PostingStore};
use super::{Store, StoreError};

/// Row counts for the `stats` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IndexStats {
    pub postings: i64,
    pub keywords: i64,
    pub messages: i64,
}

impl Store {
    /// Insert (or refresh) the postings of one message inside a single transaction.
    pub fn insert_postings(
        &self,
        chat_id: i64,
        message_id: i64,
        timestamp: i64,
        keywords: &[String],
    ) -> Result<(), sqlite::Error> {
        self.conn.execute("BEGIN")?;
        let result = self.insert_postings_inner(chat_id, message_id, timestamp, keywords);
        match result {
            Ok(()) => self.conn.execute("COMMIT"),
            Err(e) => {
                if let Err(rollback) = self.conn.execute("ROLLBACK") {
                    log::warn!("Rollback after failed insert also failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    fn insert_postings_inner(
        &self,
        chat_id: i64,
        message_id: i64,
        timestamp: i64,
        keywords: &[String],
    ) -> Result<(), sqlite::Error> {
        for keyword in keywords {
            let stored = self.stored_keyword(keyword);
            let mut stmt = self.conn.prepare(
                "INSERT OR REPLACE INTO postings (chat_id, keyword, message_id, timestamp)
                 VALUES (?, ?, ?, ?)",
            )?;
            stmt.bind((1, chat_id))?;
            stmt.bind((2, stored.as_str()))?;
            stmt.bind((3, message_id))?;
            stmt.bind((4, timestamp))?;
            stmt.next()?;
        }
        Ok(())
    }

    pub fn delete_postings(&self, chat_id: i64, message_id: i64) -> Result<usize, sqlite::Error> {
        let mut count = self
            .conn
            .prepare("SELECT COUNT(*) FROM postings WHERE chat_id = ? AND message_id = ?")?;
        count.bind((1, chat_id))?;
        count.bind((2, message_id))?;
        count.next()?;
        let existing = count.read::<i64, _>(0)?;
        if existing == 0 {
            return Ok(0);
        }

        let mut stmt = self
            .conn
            .prepare("DELETE FROM postings WHERE chat_id = ? AND message_id = ?")?;
        stmt.bind((1, chat_id))?;
        stmt.bind((2, message_id))?;
        stmt.next()?;
        Ok(existing as usize)
    }

    /// One page of a keyword's list, strictly older than `after` when given.
    fn read_page(
        &self,
        chat_id: i64,
        stored_keyword: &str,
        after: Option<(i64, i64)>,
        limit: usize,
    ) -> Result<Vec<Posting>, sqlite::Error> {
        let mut stmt = match after {
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT message_id, timestamp FROM postings
                     WHERE chat_id = ? AND keyword = ?
                     ORDER BY timestamp DESC, message_id DESC
                     LIMIT ?",
                )?;
                stmt.bind((1, chat_id))?;
                stmt.bind((2, stored_keyword))?;
                stmt.bind((3, limit as i64))?;
                stmt
            }
            Some((timestamp, message_id)) => {
                let mut stmt = self.conn.prepare(
                    "SELECT message_id, timestamp FROM postings
                     WHERE chat_id = ? AND keyword = ?
                       AND (timestamp < ? OR (timestamp = ? AND message_id < ?))
                     ORDER BY timestamp DESC, message_id DESC
                     LIMIT ?",
                )?;
                stmt.bind((1, chat_id))?;
                stmt.bind((2, stored_keyword))?;
                stmt.bind((3, timestamp))?;
                stmt.bind((4, timestamp))?;
                stmt.bind((5, message_id))?;
                stmt.bind((6, limit as i64))?;
                stmt
            }
        };

        let mut results = Vec::with_capacity(limit);
        while let sqlite::State::Row = stmt.next()? {
            results.push(Posting {
                chat_id,
                message_id: stmt.read::<i64, _>(0)?,
                timestamp: stmt.read::<i64, _>(1)?,
            });
        }
        Ok(results)
    }

    pub fn stats(&self) -> Result<IndexStats, sqlite::Error> {
        Ok(IndexStats {
            postings: self.count("SELECT COUNT(*) FROM postings")?,
            keywords: self.count("SELECT COUNT(DISTINCT keyword) FROM postings")?,
            messages: self.count(
                "SELECT COUNT(*) FROM (SELECT DISTINCT chat_id, message_id FROM postings)",
            )?,
        })
    }

    fn count(&self, sql: &str) -> Result<i64, sqlite::Error> {
        let mut stmt = self.conn.prepare(sql)?;
        stmt.next()?;
        stmt.read::<i64, _>(0)
    }

    pub fn clear_index(&self) -> Result<(), sqlite::Error> {
        self.conn.execute("DELETE FROM postings;")?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl PostingStore for Store {
    async fn append_message(
        &self,
        chat_id: i64,
        message_id: i64,
        timestamp: i64,
        keywords: &[String],
    ) -> Result<(), StoreError> {
        self.insert_postings(chat_id, message_id, timestamp, keywords)?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<usize, StoreError> {
        Ok(self.delete_postings(chat_id, message_id)?)
    }

    fn open_cursor<'s>(
        &'s self,
        chat_id: i64,
        keyword: &str,
    ) -> Result<Box<dyn PostingCursor + 's>, StoreError> {
        Ok(Box::new(StoreCursor {
            store: self,
            chat_id,
            stored_keyword: self.stored_keyword(keyword),
            buffered: VecDeque::new(),
            resume_after: None,
            drained: false,
        }))
    }
}

/// Keyset-paginated cursor: holds at most one page in memory and resumes
/// strictly after the last posting it handed out.
struct StoreCursor<'s> {
    store: &'s Store,
    chat_id: i64,
    stored_keyword: String,
    buffered: VecDeque<Posting>,
    resume_after: Option<(i64, i64)>,
    drained: bool,
}

#[async_trait(?Send)]
impl<'s> PostingCursor for StoreCursor<'s> {
    async fn next_posting(&mut self) -> Result<Option<Posting>, StoreError> {
        if self.buffered.is_empty() && !self.drained {
            let page_size = self.store.page_size;
            let page = self.store.read_page(
                self.chat_id,
                &self.stored_keyword,
                self.resume_after,
                page_size,
            )?;
            if page.len() < page_size {
                self.drained = true;
            }
            if let Some(last) = page.last() {
                self.resume_after = Some((last.timestamp, last.message_id));
            }
            self.buffered.extend(page);
        }
        Ok(self.buffered.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreOptions;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    async fn drain(store: &Store, chat_id: i64, keyword: &str) -> Vec<i64> {
        let mut cursor = store.open_cursor(chat_id, keyword).unwrap();
        let mut ids = Vec::new();
        while let Some(posting) = cursor.next_posting().await.unwrap() {
            ids.push(posting.message_id);
        }
        ids
    }

    #[test]
    fn test_insert_and_count() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_postings(1, 10, 1000, &kw(&["hello", "world"]))
            .unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.postings, 2);
        assert_eq!(stats.keywords, 2);
        assert_eq!(stats.messages, 1);
    }

    #[test]
    fn test_reinsert_replaces_instead_of_duplicating() {
        let store = Store::open_in_memory().unwrap();
        store.insert_postings(1, 10, 1000, &kw(&["hello"])).unwrap();
        store.insert_postings(1, 10, 2000, &kw(&["hello"])).unwrap();
        assert_eq!(store.stats().unwrap().postings, 1);
    }

    #[test]
    fn test_delete_postings() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_postings(1, 10, 1000, &kw(&["a1", "b2", "c3"]))
            .unwrap();
        store.insert_postings(1, 11, 1001, &kw(&["a1"])).unwrap();
        store.insert_postings(2, 10, 1002, &kw(&["a1"])).unwrap();

        assert_eq!(store.delete_postings(1, 10).unwrap(), 3);
        assert_eq!(store.delete_postings(1, 10).unwrap(), 0);
        assert_eq!(store.stats().unwrap().postings, 2);
    }

    #[test]
    fn test_keywords_not_stored_in_plaintext() {
        let store = Store::open_in_memory().unwrap();
        store.insert_postings(1, 10, 1000, &kw(&["secret"])).unwrap();
        let mut stmt = store.conn().prepare("SELECT keyword FROM postings").unwrap();
        stmt.next().unwrap();
        let stored = stmt.read::<String, _>(0).unwrap();
        assert_ne!(stored, "secret");
    }

    #[test]
    fn test_clear_index() {
        let store = Store::open_in_memory().unwrap();
        store.insert_postings(1, 10, 1000, &kw(&["hello"])).unwrap();
        store.clear_index().unwrap();
        assert_eq!(store.stats().unwrap().postings, 0);
    }

    #[tokio::test]
    async fn test_cursor_most_recent_first_across_pages() {
        let store = Store::open_in_memory_with(&StoreOptions {
            page_size: 2,
            ..StoreOptions::default()
        })
        .unwrap();
        // Appended out of timestamp order, as happens after edits.
        store.insert_postings(1, 3, 3000, &kw(&["cat"])).unwrap();
        store.insert_postings(1, 1, 1000, &kw(&["cat"])).unwrap();
        store.insert_postings(1, 5, 5000, &kw(&["cat"])).unwrap();
        store.insert_postings(1, 4, 3000, &kw(&["cat"])).unwrap();
        store.insert_postings(1, 2, 2000, &kw(&["cat", "dog"])).unwrap();
        store.insert_postings(9, 7, 9000, &kw(&["cat"])).unwrap();

        assert_eq!(drain(&store, 1, "cat").await, vec![5, 4, 3, 2, 1]);
        assert_eq!(drain(&store, 1, "dog").await, vec![2]);
        assert_eq!(drain(&store, 1, "fish").await, Vec::<i64>::new());
    }

    #[tokio::test]
    async fn test_cursor_exhaustion_is_repeatable() {
        let store = Store::open_in_memory().unwrap();
        store.insert_postings(1, 1, 1000, &kw(&["cat"])).unwrap();

        let mut cursor = store.open_cursor(1, "cat").unwrap();
        assert_eq!(cursor.next_posting().await.unwrap().map(|p| p.message_id), Some(1));
        assert!(cursor.next_posting().await.unwrap().is_none());
        assert!(cursor.next_posting().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trait_append_and_delete() {
        let store = Store::open_in_memory().unwrap();
        store
            .append_message(1, 1, 1000, &kw(&["cat", "dog"]))
            .await
            .unwrap();
        assert_eq!(store.delete_message(1, 1).await.unwrap(), 2);
        assert!(drain(&store, 1, "cat").await.is_empty());
    }
}
