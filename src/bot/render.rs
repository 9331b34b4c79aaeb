use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use super::link::build_link;
use super::{InlineButton, MessagingClient, MessagingError, OutgoingText};
use crate::indexer::Indexer;
use crate::search::callback::MAX_CALLBACK_DATA_LEN;
use crate::search::SearchCallback;
use crate::store::{Posting, PostingStore};

const EARLIER_LABEL: &str = "前一条";
const LATER_LABEL: &str = "后一条";
const LINK_LABEL: &str = "🔗";
const MISSING_NOTICE: &str = "[该条消息不存在或已被删除，对应的索引将被清理]";
const FORWARD_FAILED_NOTICE: &str = "[消息转发失败，请稍后重试]";
const PRIVACY_NOTICE_HASHED: &str = "⚠️ Bot 仅存储消息 id、会话 id、关键词 hash 和时间戳信息，不保留消息内容、群组和发送者信息，消息转发功能由 Telegram 提供";
const PRIVACY_NOTICE_PLAIN: &str = "⚠️ Bot 仅存储消息 id、会话 id、关键词和时间戳信息，不保留消息内容、群组和发送者信息，消息转发功能由 Telegram 提供";

/// What triggered a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A fresh `/search` command; results are sent as a reply to it.
    Command { message_id: i64 },
    /// A pagination button; results replace the message carrying it.
    Pagination { message_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Chat the request came from and results go to.
    pub chat_id: i64,
    pub origin: Origin,
}

/// Presents query results and owns the per-chat forwarded preview pointer.
///
/// The pointer map lives only as long as the process; losing it merely
/// leaves one stale preview behind.
pub struct Renderer {
    previews: HashMap<i64, i64>,
    utc_offset: FixedOffset,
    keywords_hashed: bool,
}

impl Renderer {
    pub fn new(utc_offset: FixedOffset, keywords_hashed: bool) -> Self {
        Self {
            previews: HashMap::new(),
            utc_offset,
            keywords_hashed,
        }
    }

    /// Message id of the live preview in `chat_id`, if any.
    pub fn preview_for(&self, chat_id: i64) -> Option<i64> {
        self.previews.get(&chat_id).copied()
    }

    pub async fn render<C, S>(
        &mut self,
        client: &C,
        indexer: &Indexer<'_, S>,
        ctx: RequestContext,
        query: &SearchCallback,
        hit: Option<&Posting>,
    ) -> Result<(), MessagingError>
    where
        C: MessagingClient + ?Sized,
        S: PostingStore + ?Sized,
    {
        let previous = self.previews.remove(&ctx.chat_id);
        if let (Origin::Pagination { .. }, Some(preview_id)) = (ctx.origin, previous) {
            if let Err(e) = client.delete_message(ctx.chat_id, preview_id).await {
                log::warn!(
                    "Failed to delete preview {} in chat {}: {}",
                    preview_id,
                    ctx.chat_id,
                    e
                );
            }
        }

        let hit = match hit {
            Some(hit) => hit,
            None => return publish(client, ctx, not_found(query)).await,
        };

        publish(client, ctx, self.result(ctx, query, hit)).await?;

        match client
            .forward_message(ctx.chat_id, query.chat_id, hit.message_id)
            .await
        {
            Ok(preview_id) => {
                self.previews.insert(ctx.chat_id, preview_id);
            }
            Err(MessagingError::NotFound) => {
                log::info!(
                    "Message {} in chat {} is gone upstream, dropping it from the index",
                    hit.message_id,
                    query.chat_id
                );
                indexer.forget_message(query.chat_id, hit.message_id).await;
                let notice_id = client
                    .send_text(ctx.chat_id, &OutgoingText::plain(MISSING_NOTICE))
                    .await?;
                self.previews.insert(ctx.chat_id, notice_id);
            }
            Err(e) => {
                log::warn!(
                    "Failed to forward message {} from chat {}: {}",
                    hit.message_id,
                    query.chat_id,
                    e
                );
                let notice_id = client
                    .send_text(ctx.chat_id, &OutgoingText::plain(FORWARD_FAILED_NOTICE))
                    .await?;
                self.previews.insert(ctx.chat_id, notice_id);
            }
        }
        Ok(())
    }

    fn result(&self, ctx: RequestContext, query: &SearchCallback, hit: &Posting) -> OutgoingText {
        let mut text = format!(
            "{} 的第 {} 条搜索结果：\n🕙 {}",
            query.keywords,
            u64::from(query.skip) + 1,
            self.format_time(hit.timestamp)
        );
        if let Origin::Command { .. } = ctx.origin {
            text.push_str("\n\n");
            text.push_str(if self.keywords_hashed {
                PRIVACY_NOTICE_HASHED
            } else {
                PRIVACY_NOTICE_PLAIN
            });
        }

        let mut row = Vec::with_capacity(3);
        // Past the skip headroom reserved at query time the token can outgrow
        // the callback limit; the oldest reachable page then has no "earlier".
        let earlier = query.earlier().encode();
        if earlier.len() <= MAX_CALLBACK_DATA_LEN {
            row.push(InlineButton::callback(EARLIER_LABEL, earlier));
        }
        if let Some(later) = query.later() {
            row.push(InlineButton::callback(LATER_LABEL, later.encode()));
        }
        row.push(InlineButton::url(
            LINK_LABEL,
            build_link(query.chat_id, hit.message_id),
        ));

        OutgoingText::plain(text).with_row(row)
    }

    fn format_time(&self, timestamp_ms: i64) -> String {
        match DateTime::from_timestamp_millis(timestamp_ms) {
            Some(utc) => utc
                .with_timezone(&self.utc_offset)
                .format("%Y/%-m/%-d %H:%M:%S")
                .to_string(),
            None => timestamp_ms.to_string(),
        }
    }
}

fn not_found(query: &SearchCallback) -> OutgoingText {
    match query.later() {
        Some(later) => OutgoingText::plain(format!("没有找到其它有关 {} 的消息", query.keywords))
            .with_row(vec![InlineButton::callback(LATER_LABEL, later.encode())]),
        None => OutgoingText::plain(format!("没有找到有关 {} 的消息", query.keywords)),
    }
}

/// Reply to the command, or overwrite the paginated results message.
async fn publish<C: MessagingClient + ?Sized>(
    client: &C,
    ctx: RequestContext,
    message: OutgoingText,
) -> Result<(), MessagingError> {
    match ctx.origin {
        Origin::Command { message_id } => {
            client
                .send_text(ctx.chat_id, &message.reply_to(message_id))
                .await?;
        }
        Origin::Pagination { message_id } => {
            client.edit_text(ctx.chat_id, message_id, &message).await?;
        }
    }
    Ok(())
}
