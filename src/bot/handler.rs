use chrono::{FixedOffset, Offset, Utc};

use super::command::{self, CommandPlan};
use super::render::{Origin, Renderer, RequestContext};
use super::{CallbackQuery, InboundMessage, MessagingClient, OutgoingText, Update};
use crate::config::Config;
use crate::indexer::{IndexableMessage, Indexer};
use crate::search::{self, CallbackError, SearchCallback, DEFAULT_HIT_RATIO};
use crate::store::PostingStore;

const SEARCH_FAILED: &str = "搜索失败，请稍后重试。";

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub command_prefix: char,
    pub bot_username: Option<String>,
    pub hit_ratio: f64,
    pub utc_offset: FixedOffset,
    /// Whether the store hashes keywords; only changes the privacy notice.
    pub keywords_hashed: bool,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            command_prefix: '/',
            bot_username: None,
            hit_ratio: DEFAULT_HIT_RATIO,
            utc_offset: Utc.fix(),
            keywords_hashed: true,
        }
    }
}

impl BotSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            command_prefix: config.command_prefix,
            bot_username: config.bot_username.clone(),
            hit_ratio: config.hit_ratio,
            utc_offset: config.utc_offset(),
            keywords_hashed: config.hash_keywords,
        }
    }
}

/// Dispatches inbound updates: indexes chat traffic, answers `/search`, and
/// serves pagination buttons.
pub struct SearchBot<S: PostingStore, C: MessagingClient> {
    store: S,
    client: C,
    renderer: Renderer,
    settings: BotSettings,
}

impl<S: PostingStore, C: MessagingClient> SearchBot<S, C> {
    pub fn new(store: S, client: C, settings: BotSettings) -> Self {
        Self {
            store,
            client,
            renderer: Renderer::new(settings.utc_offset, settings.keywords_hashed),
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Handle one update to completion. Failures are logged and, where a
    /// user is waiting on an answer, reported to them; none escape.
    pub async fn handle(&mut self, update: Update) {
        match update {
            Update::Message(message) => self.on_message(&message).await,
            Update::EditedMessage(message) => {
                self.indexer()
                    .record_edited_message(&indexable(&message))
                    .await
            }
            Update::CallbackQuery(query) => self.on_callback(&query).await,
        }
    }

    fn indexer(&self) -> Indexer<'_, S> {
        Indexer::new(&self.store, self.settings.command_prefix)
    }

    async fn on_message(&mut self, message: &InboundMessage) {
        self.indexer().record_message(&indexable(message)).await;

        let args = match command::parse_command(
            message.body(),
            self.settings.command_prefix,
            self.settings.bot_username.as_deref(),
        ) {
            Some(args) => args,
            None => return,
        };

        let ctx = RequestContext {
            chat_id: message.chat_id,
            origin: Origin::Command {
                message_id: message.message_id,
            },
        };
        match command::plan(message, &args) {
            CommandPlan::Search(query) => self.run_query(ctx, &query).await,
            other => {
                log::debug!("Rejected search command in chat {}: {:?}", message.chat_id, other);
                if let Some(text) = other.reply_text(self.settings.command_prefix) {
                    self.reply(ctx, OutgoingText::plain(text)).await;
                }
            }
        }
    }

    async fn on_callback(&mut self, callback: &CallbackQuery) {
        let ctx = RequestContext {
            chat_id: callback.chat_id,
            origin: Origin::Pagination {
                message_id: callback.message_id,
            },
        };
        match SearchCallback::decode(&callback.data) {
            Ok(query) => self.run_query(ctx, &query).await,
            Err(CallbackError::UnknownPrefix(prefix)) => {
                log::debug!("Ignoring callback with prefix {}", prefix);
            }
            Err(e) => {
                log::warn!(
                    "Rejected pagination token {:?} in chat {}: {}",
                    callback.data,
                    callback.chat_id,
                    e
                );
                self.reply(ctx, OutgoingText::plain(SEARCH_FAILED)).await;
            }
        }
    }

    async fn run_query(&mut self, ctx: RequestContext, query: &SearchCallback) {
        let hit = match search::search(
            &self.store,
            query.chat_id,
            &query.keywords,
            query.skip,
            self.settings.hit_ratio,
        )
        .await
        {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!(
                    "Search in chat {} for {:?} failed: {}",
                    query.chat_id,
                    query.keywords,
                    e
                );
                self.reply(ctx, OutgoingText::plain(SEARCH_FAILED)).await;
                return;
            }
        };

        let indexer = Indexer::new(&self.store, self.settings.command_prefix);
        if let Err(e) = self
            .renderer
            .render(&self.client, &indexer, ctx, query, hit.as_ref())
            .await
        {
            log::warn!(
                "Failed to deliver results to chat {}: {}",
                ctx.chat_id,
                e
            );
        }
    }

    /// Reply to a command, or overwrite the message carrying a pressed button.
    async fn reply(&self, ctx: RequestContext, message: OutgoingText) {
        let result = match ctx.origin {
            Origin::Command { message_id } => self
                .client
                .send_text(ctx.chat_id, &message.reply_to(message_id))
                .await
                .map(|_| ()),
            Origin::Pagination { message_id } => {
                self.client.edit_text(ctx.chat_id, message_id, &message).await
            }
        };
        if let Err(e) = result {
            log::warn!("Failed to reply in chat {}: {}", ctx.chat_id, e);
        }
    }
}

fn indexable(message: &InboundMessage) -> IndexableMessage<'_> {
    IndexableMessage {
        chat_id: message.chat_id,
        message_id: message.message_id,
        text: message.body(),
        timestamp: message.timestamp_ms(),
    }
}
