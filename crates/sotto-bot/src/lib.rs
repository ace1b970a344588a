//! The whisper core: trigger detection, private submission, the inline
//! addressing path, authorization-gated reveal, and exactly-once audit
//! reporting.
//!
//! Every inbound update is handled as an independent task; the only shared
//! mutable state is the store and no lock is held across an await.

pub mod admin;
pub mod dispatch;
pub mod inline;
pub mod membership;
pub mod private;
pub mod reaper;
pub mod report;
pub mod reveal;
pub mod trigger;
pub mod ui;

use std::sync::Arc;

use sotto_db::Database;
use sotto_telegram::api::TelegramApi;
use sotto_types::config::BotConfig;

use crate::reaper::Reaper;

/// Shared handles for all update handlers. Cheap to clone; one clone per
/// spawned update task.
#[derive(Clone)]
pub struct Bot {
    pub api: Arc<TelegramApi>,
    pub db: Arc<Database>,
    pub config: Arc<BotConfig>,
    pub reaper: Reaper,
}
