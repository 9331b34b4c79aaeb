use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{MessagingClient, MessagingError, OutgoingText};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        chat_id: i64,
        message_id: i64,
        message: OutgoingText,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        message: OutgoingText,
    },
    Forward {
        to_chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
        new_message_id: i64,
    },
    Delete {
        chat_id: i64,
        message_id: i64,
    },
}

/// Messaging client that records every call and hands out increasing ids.
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    next_id: Mutex<i64>,
    /// (chat, message) pairs that forwarding reports as missing.
    missing: Mutex<HashSet<(i64, i64)>>,
    forward_error: Mutex<Option<MessagingError>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(1000),
            missing: Mutex::new(HashSet::new()),
            forward_error: Mutex::new(None),
        }
    }

    pub fn mark_missing(&self, chat_id: i64, message_id: i64) {
        self.missing.lock().unwrap().insert((chat_id, message_id));
    }

    pub fn fail_forwards_with(&self, error: MessagingError) {
        *self.forward_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Texts of every sent or edited message, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { message, .. } | Call::Edit { message, .. } => Some(message.text),
                _ => None,
            })
            .collect()
    }

    /// Source message ids of every forward, in call order.
    pub fn forwarded(&self) -> Vec<i64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Forward { message_id, .. } => Some(message_id),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<(i64, i64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete {
                    chat_id,
                    message_id,
                } => Some((chat_id, message_id)),
                _ => None,
            })
            .collect()
    }

    fn allocate_id(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        *next
    }
}

#[async_trait(?Send)]
impl MessagingClient for RecordingClient {
    async fn send_text(&self, chat_id: i64, message: &OutgoingText) -> Result<i64, MessagingError> {
        let message_id = self.allocate_id();
        self.calls.lock().unwrap().push(Call::Send {
            chat_id,
            message_id,
            message: message.clone(),
        });
        Ok(message_id)
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        message: &OutgoingText,
    ) -> Result<(), MessagingError> {
        self.calls.lock().unwrap().push(Call::Edit {
            chat_id,
            message_id,
            message: message.clone(),
        });
        Ok(())
    }

    async fn forward_message(
        &self,
        to_chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<i64, MessagingError> {
        if self
            .missing
            .lock()
            .unwrap()
            .contains(&(from_chat_id, message_id))
        {
            return Err(MessagingError::NotFound);
        }
        if let Some(e) = self.forward_error.lock().unwrap().clone() {
            return Err(e);
        }
        let new_message_id = self.allocate_id();
        self.calls.lock().unwrap().push(Call::Forward {
            to_chat_id,
            from_chat_id,
            message_id,
            new_message_id,
        });
        Ok(new_message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), MessagingError> {
        self.calls.lock().unwrap().push(Call::Delete {
            chat_id,
            message_id,
        });
        Ok(())
    }
}
