//! Hand-rolled Telegram Bot API client.
//!
//! Long-polling for inbound updates, direct HTTP calls for outbound. Only
//! the methods and fields the bot needs are covered. Every call returns an
//! explicit [`TelegramError`]; callers decide per call site whether a
//! failure is surfaced, logged, or ignored.

pub mod api;
pub mod poller;
pub mod types;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered `ok: false` with a description.
    #[error("api: {0}")]
    Api(String),
}
