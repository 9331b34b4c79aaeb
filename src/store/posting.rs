use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::StoreError;

/// One (keyword, message) pair as seen by the merge. The keyword itself is
/// implied by the cursor the posting came out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Posting {
    pub chat_id: i64,
    pub message_id: i64,
    /// Milliseconds since the Unix epoch. Identical across every posting of a message.
    pub timestamp: i64,
}

/// Per-(chat, keyword) posting lists.
///
/// Implementations are driven from a single-threaded event loop, so the
/// returned futures are not required to be `Send`.
#[async_trait(?Send)]
pub trait PostingStore {
    /// Append one posting per keyword for a single message.
    async fn append_message(
        &self,
        chat_id: i64,
        message_id: i64,
        timestamp: i64,
        keywords: &[String],
    ) -> Result<(), StoreError>;

    /// Remove every posting of `(chat_id, message_id)` under any keyword.
    /// Returns how many postings were removed.
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<usize, StoreError>;

    /// Open a most-recent-first cursor over one keyword's list. Opening is
    /// lazy: no I/O happens until the first `next()`.
    fn open_cursor<'s>(
        &'s self,
        chat_id: i64,
        keyword: &str,
    ) -> Result<Box<dyn PostingCursor + 's>, StoreError>;
}

/// Resumable descending-by-recency iteration over one posting list.
#[async_trait(?Send)]
pub trait PostingCursor {
    /// Next posting, or `Ok(None)` once exhausted. Calling again after
    /// exhaustion keeps returning `Ok(None)`.
    async fn next_posting(&mut self) -> Result<Option<Posting>, StoreError>;
}

/// Ordering shared by every store: newer first, larger message id first on ties.
pub fn recency_order(a: &Posting, b: &Posting) -> std::cmp::Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.message_id.cmp(&a.message_id))
}
