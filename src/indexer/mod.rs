pub mod tokenizer;

use crate::store::{PostingStore, StoreError};
use tokenizer::Tokenizer;

/// A message as far as indexing cares.
#[derive(Debug, Clone, Copy)]
pub struct IndexableMessage<'a> {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: &'a str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Keeps a chat's posting lists in step with its messages.
///
/// Every public method is best-effort: failures are logged and swallowed so
/// that indexing can never abort the surrounding relay pipeline.
pub struct Indexer<'s, S: PostingStore + ?Sized> {
    store: &'s S,
    tokenizer: Tokenizer,
    command_prefix: char,
}

impl<'s, S: PostingStore + ?Sized> Indexer<'s, S> {
    pub fn new(store: &'s S, command_prefix: char) -> Self {
        Self {
            store,
            tokenizer: Tokenizer::new(),
            command_prefix,
        }
    }

    /// Index a newly received message.
    pub async fn record_message(&self, message: &IndexableMessage<'_>) {
        match self.index(message).await {
            Ok(0) => {}
            Ok(count) => log::debug!(
                "Indexed {} keywords for message {} in chat {}",
                count,
                message.message_id,
                message.chat_id
            ),
            Err(e) => log::warn!(
                "Failed to index message {} in chat {}: {}",
                message.message_id,
                message.chat_id,
                e
            ),
        }
    }

    /// Re-index an edited message. Postings of the previous text are removed
    /// first, even when the new text is not indexable.
    pub async fn record_edited_message(&self, message: &IndexableMessage<'_>) {
        if let Err(e) = self
            .store
            .delete_message(message.chat_id, message.message_id)
            .await
        {
            log::warn!(
                "Failed to drop stale postings of message {} in chat {}: {}",
                message.message_id,
                message.chat_id,
                e
            );
        }
        self.record_message(message).await;
    }

    /// Purge every posting of a message, e.g. once it is known to be gone upstream.
    pub async fn forget_message(&self, chat_id: i64, message_id: i64) {
        match self.store.delete_message(chat_id, message_id).await {
            Ok(removed) => log::info!(
                "Removed {} postings of message {} in chat {}",
                removed,
                message_id,
                chat_id
            ),
            Err(e) => log::warn!(
                "Failed to remove postings of message {} in chat {}: {}",
                message_id,
                chat_id,
                e
            ),
        }
    }

    /// Returns the number of keywords written.
    async fn index(&self, message: &IndexableMessage<'_>) -> Result<usize, StoreError> {
        let text = message.text;
        if text.trim().is_empty() || text.starts_with(self.command_prefix) {
            return Ok(0);
        }

        let keywords = self.tokenizer.keywords(text);
        if keywords.is_empty() {
            return Ok(0);
        }

        self.store
            .append_message(
                message.chat_id,
                message.message_id,
                message.timestamp,
                &keywords,
            )
            .await?;
        Ok(keywords.len())
    }
}
