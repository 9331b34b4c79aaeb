//! In-process posting store with the same ordering contract as [`super::Store`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::posting::{recency_order, Posting, PostingCursor, PostingStore};
use super::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: Mutex<HashMap<(i64, String), Vec<Posting>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posting_count(&self) -> usize {
        self.lists
            .lock()
            .map(|lists| lists.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Message ids under one keyword, most recent first.
    pub fn message_ids(&self, chat_id: i64, keyword: &str) -> Vec<i64> {
        self.lists
            .lock()
            .ok()
            .and_then(|lists| {
                lists
                    .get(&(chat_id, keyword.to_string()))
                    .map(|list| list.iter().map(|p| p.message_id).collect())
            })
            .unwrap_or_default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(i64, String), Vec<Posting>>>, StoreError> {
        self.lists
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait(?Send)]
impl PostingStore for MemoryStore {
    async fn append_message(
        &self,
        chat_id: i64,
        message_id: i64,
        timestamp: i64,
        keywords: &[String],
    ) -> Result<(), StoreError> {
        let mut lists = self.lock()?;
        let posting = Posting {
            chat_id,
            message_id,
            timestamp,
        };
        for keyword in keywords {
            let list = lists.entry((chat_id, keyword.clone())).or_default();
            list.retain(|p| p.message_id != message_id);
            let at = list
                .binary_search_by(|existing| recency_order(existing, &posting))
                .unwrap_or_else(|at| at);
            list.insert(at, posting);
        }
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<usize, StoreError> {
        let mut lists = self.lock()?;
        let mut removed = 0;
        for ((list_chat, _), list) in lists.iter_mut() {
            if *list_chat != chat_id {
                continue;
            }
            let before = list.len();
            list.retain(|p| p.message_id != message_id);
            removed += before - list.len();
        }
        lists.retain(|_, list| !list.is_empty());
        Ok(removed)
    }

    fn open_cursor<'s>(
        &'s self,
        chat_id: i64,
        keyword: &str,
    ) -> Result<Box<dyn PostingCursor + 's>, StoreError> {
        let snapshot: VecDeque<Posting> = self
            .lock()?
            .get(&(chat_id, keyword.to_string()))
            .map(|list| list.iter().copied().collect())
            .unwrap_or_default();
        Ok(Box::new(MemoryCursor { remaining: snapshot }))
    }
}

/// Cursor over a snapshot taken when it was opened.
struct MemoryCursor {
    remaining: VecDeque<Posting>,
}

#[async_trait(?Send)]
impl PostingCursor for MemoryCursor {
    async fn next_posting(&mut self) -> Result<Option<Posting>, StoreError> {
        Ok(self.remaining.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn test_lists_kept_in_recency_order() {
        let store = MemoryStore::new();
        store.append_message(1, 2, 200, &kw(&["a"])).await.unwrap();
        store.append_message(1, 1, 100, &kw(&["a"])).await.unwrap();
        store.append_message(1, 4, 300, &kw(&["a"])).await.unwrap();
        store.append_message(1, 3, 300, &kw(&["a"])).await.unwrap();
        assert_eq!(store.message_ids(1, "a"), vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_reappend_moves_posting() {
        let store = MemoryStore::new();
        store.append_message(1, 1, 100, &kw(&["a"])).await.unwrap();
        store.append_message(1, 2, 200, &kw(&["a"])).await.unwrap();
        store.append_message(1, 1, 300, &kw(&["a"])).await.unwrap();
        assert_eq!(store.message_ids(1, "a"), vec![1, 2]);
        assert_eq!(store.posting_count(), 2);
    }

    #[tokio::test]
    async fn test_delete_message_scoped_to_chat() {
        let store = MemoryStore::new();
        store.append_message(1, 1, 100, &kw(&["a", "b"])).await.unwrap();
        store.append_message(2, 1, 100, &kw(&["a"])).await.unwrap();

        assert_eq!(store.delete_message(1, 1).await.unwrap(), 2);
        assert!(store.message_ids(1, "a").is_empty());
        assert_eq!(store.message_ids(2, "a"), vec![1]);
    }

    #[tokio::test]
    async fn test_cursor_drains_then_stays_exhausted() {
        let store = MemoryStore::new();
        store.append_message(1, 1, 100, &kw(&["a"])).await.unwrap();
        store.append_message(1, 2, 200, &kw(&["a"])).await.unwrap();

        let mut cursor = store.open_cursor(1, "a").unwrap();
        assert_eq!(cursor.next_posting().await.unwrap().unwrap().message_id, 2);
        assert_eq!(cursor.next_posting().await.unwrap().unwrap().message_id, 1);
        assert!(cursor.next_posting().await.unwrap().is_none());
        assert!(cursor.next_posting().await.unwrap().is_none());

        let mut missing = store.open_cursor(1, "zzz").unwrap();
        assert!(missing.next_posting().await.unwrap().is_none());
    }
}
