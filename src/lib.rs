pub mod bot;
pub mod config;
pub mod error;
pub mod indexer;
pub mod logging;
pub mod search;
pub mod security;
pub mod store;

pub use bot::{BotSettings, MessagingClient, SearchBot, Update};
pub use config::Config;
pub use error::AppError;
pub use store::{MemoryStore, Store};
