pub mod command;
pub mod handler;
pub mod link;
pub mod render;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use handler::{BotSettings, SearchBot};
pub use render::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub message_id: i64,
    /// Absent for media and service messages. Media captions are not
    /// searchable and never carry commands.
    #[serde(default)]
    pub text: Option<String>,
    /// Unix seconds, as delivered by the Bot API.
    pub date: i64,
}

impl InboundMessage {
    /// Text of the message, empty for media and service messages.
    pub fn body(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.date.saturating_mul(1000)
    }
}

/// An inline button press.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Chat the pressed button lives in.
    pub chat_id: i64,
    /// Message carrying the pressed button.
    pub message_id: i64,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    Message(InboundMessage),
    EditedMessage(InboundMessage),
    CallbackQuery(CallbackQuery),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub action: ButtonAction,
}

impl InlineButton {
    pub fn callback(text: &str, data: String) -> Self {
        Self {
            text: text.to_string(),
            action: ButtonAction::Callback(data),
        }
    }

    pub fn url(text: &str, url: String) -> Self {
        Self {
            text: text.to_string(),
            action: ButtonAction::Url(url),
        }
    }
}

/// A text message to send, or the new content of one being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingText {
    pub text: String,
    pub reply_to: Option<i64>,
    /// Rows of inline buttons.
    pub keyboard: Vec<Vec<InlineButton>>,
}

impl OutgoingText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn with_row(mut self, row: Vec<InlineButton>) -> Self {
        if !row.is_empty() {
            self.keyboard.push(row);
        }
        self
    }
}

/// Outbound side of the bot protocol. Implemented by the host's protocol
/// client; ids are Bot API chat and message ids.
#[async_trait(?Send)]
pub trait MessagingClient {
    /// Returns the id of the sent message.
    async fn send_text(&self, chat_id: i64, message: &OutgoingText) -> Result<i64, MessagingError>;

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        message: &OutgoingText,
    ) -> Result<(), MessagingError>;

    /// Forward `message_id` from `from_chat_id` into `to_chat_id`. Returns the
    /// id of the copy, or [`MessagingError::NotFound`] if the source is gone.
    async fn forward_message(
        &self,
        to_chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<i64, MessagingError>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), MessagingError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    /// The referenced message no longer exists upstream.
    NotFound,
    /// The API refused the request.
    Rejected(String),
    Transport(String),
}

impl std::fmt::Display for MessagingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessagingError::NotFound => write!(f, "message not found"),
            MessagingError::Rejected(e) => write!(f, "request rejected: {}", e),
            MessagingError::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl std::error::Error for MessagingError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: Option<&str>) -> InboundMessage {
        InboundMessage {
            chat_id: -1001,
            chat_kind: ChatKind::Supergroup,
            message_id: 5,
            text: text.map(str::to_string),
            date: 1_700_000_000,
        }
    }

    #[test]
    fn test_body_is_text_only() {
        assert_eq!(message(Some("hi")).body(), "hi");
        assert_eq!(message(None).body(), "");
    }

    #[test]
    fn test_caption_is_not_a_body() {
        let json = r#"{"type":"message","chat_id":-5,"chat_kind":"group","message_id":1,"caption":"/search 1 x","date":10}"#;
        match serde_json::from_str::<Update>(json).unwrap() {
            Update::Message(m) => assert_eq!(m.body(), ""),
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_ms() {
        assert_eq!(message(None).timestamp_ms(), 1_700_000_000_000);
    }

    #[test]
    fn test_update_deserialize() {
        let json = r#"{"type":"callback_query","chat_id":7,"message_id":9,"data":"search:1:x:0"}"#;
        match serde_json::from_str::<Update>(json).unwrap() {
            Update::CallbackQuery(q) => {
                assert_eq!(q.chat_id, 7);
                assert_eq!(q.data, "search:1:x:0");
            }
            other => panic!("unexpected update: {:?}", other),
        }

        let json = r#"{"type":"message","chat_id":-5,"chat_kind":"group","message_id":1,"text":"hi","date":10}"#;
        match serde_json::from_str::<Update>(json).unwrap() {
            Update::Message(m) => {
                assert_eq!(m.chat_kind, ChatKind::Group);
                assert_eq!(m.body(), "hi");
            }
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn test_with_row_skips_empty_rows() {
        let msg = OutgoingText::plain("x").with_row(vec![]);
        assert!(msg.keyboard.is_empty());
    }
}
