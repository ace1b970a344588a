//! Update routing. Each inbound update is one independent unit of work;
//! the server spawns one task per call into [`handle_update`].

use sotto_telegram::types::Update;

use crate::{inline, private, reveal, trigger, Bot};

pub async fn handle_update(bot: Bot, update: Update) {
    if let Some(msg) = &update.message {
        if msg.chat.is_group() {
            trigger::handle_group_message(&bot, msg).await;
        } else if msg.chat.is_private() {
            private::handle_private_message(&bot, msg).await;
        }
        // channel posts and other chat kinds are ignored
    } else if let Some(cb) = &update.callback_query {
        reveal::handle_callback(&bot, cb).await;
    } else if let Some(query) = &update.inline_query {
        inline::handle_inline_query(&bot, query).await;
    }
}
