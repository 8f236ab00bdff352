pub mod dedup;
mod local_state;

pub use dedup::{RequestDeduplicator, RequestHandle, DEFAULT_TTL};
pub use local_state::LocalState;
