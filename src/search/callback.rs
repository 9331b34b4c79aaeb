//! Pagination state carried in inline-button callback data.
//!
//! A token is `search:<chat id>:<keywords>:<skip>`. The whole query state
//! lives in the token, so a button pressed long after the results message was
//! sent (or after a restart) replays the search from scratch.

pub const CALLBACK_PREFIX: &str = "search";
pub const DELIMITER: char = ':';
/// Telegram rejects callback data longer than this many bytes.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;
/// Headroom kept for the skip count when checking a fresh query's length.
const RESERVED_SKIP_DIGITS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCallback {
    pub chat_id: i64,
    pub keywords: String,
    pub skip: u32,
}

impl SearchCallback {
    /// State for a freshly issued query. Rejects keyword strings that could
    /// not round-trip through a token.
    pub fn for_query(chat_id: i64, keywords: &str) -> Result<Self, CallbackError> {
        validate_keywords(keywords)?;
        let callback = SearchCallback {
            chat_id,
            keywords: keywords.to_string(),
            skip: 0,
        };
        let worst_case = callback.encode().len() - 1 + RESERVED_SKIP_DIGITS;
        if worst_case > MAX_CALLBACK_DATA_LEN {
            return Err(CallbackError::TooLong(worst_case));
        }
        Ok(callback)
    }

    pub fn encode(&self) -> String {
        format!(
            "{prefix}{d}{chat}{d}{keywords}{d}{skip}",
            prefix = CALLBACK_PREFIX,
            d = DELIMITER,
            chat = self.chat_id,
            keywords = self.keywords,
            skip = self.skip
        )
    }

    pub fn decode(data: &str) -> Result<Self, CallbackError> {
        let (prefix, rest) = data.split_once(DELIMITER).ok_or(CallbackError::Malformed)?;
        if prefix != CALLBACK_PREFIX {
            return Err(CallbackError::UnknownPrefix(prefix.to_string()));
        }
        let (chat, rest) = rest.split_once(DELIMITER).ok_or(CallbackError::Malformed)?;
        let (keywords, skip) = rest.rsplit_once(DELIMITER).ok_or(CallbackError::Malformed)?;

        let chat_id = chat
            .parse::<i64>()
            .map_err(|_| CallbackError::InvalidChatId(chat.to_string()))?;
        let skip = skip
            .parse::<u32>()
            .map_err(|_| CallbackError::InvalidSkip(skip.to_string()))?;
        validate_keywords(keywords)?;

        Ok(SearchCallback {
            chat_id,
            keywords: keywords.to_string(),
            skip,
        })
    }

    /// The next older result.
    pub fn earlier(&self) -> Self {
        SearchCallback {
            skip: self.skip.saturating_add(1),
            ..self.clone()
        }
    }

    /// The next newer result, if this is not already the newest.
    pub fn later(&self) -> Option<Self> {
        let skip = self.skip.checked_sub(1)?;
        Some(SearchCallback {
            skip,
            ..self.clone()
        })
    }
}

fn validate_keywords(keywords: &str) -> Result<(), CallbackError> {
    if keywords.trim().is_empty() {
        return Err(CallbackError::EmptyKeywords);
    }
    if keywords.contains(DELIMITER) {
        return Err(CallbackError::ReservedDelimiter);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    Malformed,
    UnknownPrefix(String),
    InvalidChatId(String),
    InvalidSkip(String),
    EmptyKeywords,
    ReservedDelimiter,
    TooLong(usize),
}

impl std::fmt::Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackError::Malformed => write!(f, "malformed callback data"),
            CallbackError::UnknownPrefix(p) => write!(f, "unknown callback prefix: {}", p),
            CallbackError::InvalidChatId(c) => write!(f, "invalid chat id: {}", c),
            CallbackError::InvalidSkip(s) => write!(f, "invalid skip count: {}", s),
            CallbackError::EmptyKeywords => write!(f, "empty keyword string"),
            CallbackError::ReservedDelimiter => {
                write!(f, "keywords must not contain '{}'", DELIMITER)
            }
            CallbackError::TooLong(len) => write!(
                f,
                "callback data would be {} bytes (limit {})",
                len, MAX_CALLBACK_DATA_LEN
            ),
        }
    }
}

impl std::error::Error for CallbackError {}
