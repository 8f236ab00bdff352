pub mod api;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod mutation;
pub mod notify;
pub mod render;
pub mod store;
pub mod tools;

pub use api::{ApiClient, ApiError};
pub use app::App;
pub use cache::RequestDeduplicator;
pub use config::Config;
pub use error::{PromptBayError, Result};
pub use store::{Outcome, PromptStore};
