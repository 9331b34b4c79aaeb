pub mod callback;
pub mod engine;

pub use callback::{CallbackError, SearchCallback};
pub use engine::{find_match, search, DEFAULT_HIT_RATIO};
