//! The `/search <chat id> <keyword>...` command.

use super::{ChatKind, InboundMessage};
use crate::indexer::tokenizer::Tokenizer;
use crate::search::{CallbackError, SearchCallback};

pub const COMMAND_NAME: &str = "search";

/// What to do about one `/search` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    /// Issued inside a group: tell the user the id to search from a private chat.
    GroupHint { chat_id: i64 },
    Usage,
    /// The target is the private chat with the bot itself.
    SelfChat,
    /// Nothing but stopwords left to search for.
    NoKeywords,
    InvalidKeywords(CallbackError),
    Search(SearchCallback),
}

impl CommandPlan {
    /// Text sent back for every plan that does not run a search.
    pub fn reply_text(&self, prefix: char) -> Option<String> {
        let text = match self {
            CommandPlan::GroupHint { chat_id } => format!(
                "请在私聊中使用 {}{} {} 加关键词搜索当前会话",
                prefix, COMMAND_NAME, chat_id
            ),
            CommandPlan::Usage => format!(
                "请使用 {p}{c} <chatId> 加关键词搜索某个会话，其中 chatId 可在对应会话中输入 {p}{c} 获取",
                p = prefix,
                c = COMMAND_NAME
            ),
            CommandPlan::SelfChat => "暂不支持搜索与机器人之间的会话。".to_string(),
            CommandPlan::NoKeywords => "关键词过于常见，请换用更具体的关键词。".to_string(),
            CommandPlan::InvalidKeywords(CallbackError::TooLong(_)) => {
                "关键词过长，请缩短后重试。".to_string()
            }
            CommandPlan::InvalidKeywords(_) => "关键词中不能包含英文冒号 \":\"。".to_string(),
            CommandPlan::Search(_) => return None,
        };
        Some(text)
    }
}

/// Arguments of a `/search` command addressed to this bot, or `None` if
/// `text` is some other message.
pub fn parse_command<'t>(
    text: &'t str,
    prefix: char,
    bot_username: Option<&str>,
) -> Option<Vec<&'t str>> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix(prefix)?;
    let (name, target) = match head.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (head, None),
    };
    if name != COMMAND_NAME {
        return None;
    }
    if let (Some(target), Some(username)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(username.trim_start_matches('@')) {
            return None;
        }
    }
    Some(parts.collect())
}

pub fn plan(message: &InboundMessage, args: &[&str]) -> CommandPlan {
    if message.chat_kind != ChatKind::Private {
        return CommandPlan::GroupHint {
            chat_id: message.chat_id,
        };
    }

    let (target, keywords) = match args.split_first() {
        Some((target, keywords)) if !keywords.is_empty() => (*target, keywords),
        _ => return CommandPlan::Usage,
    };
    let chat_id = match target.parse::<i64>() {
        Ok(chat_id) => chat_id,
        Err(_) => return CommandPlan::Usage,
    };
    if chat_id == message.chat_id {
        return CommandPlan::SelfChat;
    }

    let keywords = keywords.join(" ");
    if Tokenizer::new().query_keywords(&keywords).is_empty() {
        return CommandPlan::NoKeywords;
    }
    match SearchCallback::for_query(chat_id, &keywords) {
        Ok(query) => CommandPlan::Search(query),
        Err(e) => CommandPlan::InvalidKeywords(e),
    }
}
