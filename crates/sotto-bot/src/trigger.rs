//! Trigger detection in group chats.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};

use sotto_telegram::api::SendOptions;
use sotto_telegram::types::Message;
use sotto_types::display::{group_title, mention_html};
use sotto_types::{GUIDE_DELETE_AFTER_SECS, WHISPER_WINDOW_SECS, is_trigger_word};

use crate::{Bot, membership, ui};

/// Handle a group-scope message: refresh the identity cache, and when the
/// text is a trigger word, classify and act on it.
pub async fn handle_group_message(bot: &Bot, msg: &Message) {
    let now = Utc::now();

    if let Err(e) = bot
        .db
        .upsert_chat(msg.chat.id, msg.chat.title.as_deref(), &msg.chat.kind, now)
    {
        warn!(error = %e, "chat cache upsert failed");
    }
    let Some(from) = &msg.from else { return };
    if let Err(e) = bot
        .db
        .upsert_user(from.id, from.username.as_deref(), &from.first_name, now)
    {
        warn!(error = %e, "user cache upsert failed");
    }

    let text = msg.text.as_deref().or(msg.caption.as_deref()).unwrap_or("");
    if !is_trigger_word(text) || from.is_bot {
        return;
    }

    // Trigger word with no reply target: guidance only. The guidance is
    // auto-removed; the malformed trigger message itself stays.
    let Some(reply) = &msg.reply_to_message else {
        match bot
            .api
            .send_message(msg.chat.id, ui::REPLY_REQUIRED, SendOptions::default())
            .await
        {
            Ok(notice_id) => bot.reaper.schedule(
                msg.chat.id,
                notice_id,
                Duration::from_secs(GUIDE_DELETE_AFTER_SECS),
            ),
            Err(e) => debug!(error = %e, "guidance notice failed"),
        }
        return;
    };

    // Reply target absent or bot-like: not a whisperable receiver.
    let Some(target) = &reply.from else { return };
    if target.is_bot {
        return;
    }

    if let Err(e) = bot
        .db
        .upsert_user(target.id, target.username.as_deref(), &target.first_name, now)
    {
        warn!(error = %e, "receiver cache upsert failed");
    }

    // Last trigger wins: one whisper intent in flight per sender.
    let expires_at = now + TimeDelta::seconds(WHISPER_WINDOW_SECS);
    if let Err(e) = bot
        .db
        .upsert_pending(from.id, msg.chat.id, target.id, now, expires_at)
    {
        warn!(error = %e, "pending upsert failed");
        return;
    }

    let member = membership::is_member(bot, from.id).await;

    let (prompt, keyboard) = if member {
        (
            ui::group_guide(WHISPER_WINDOW_SECS / 60),
            ui::go_private_keyboard(&bot.config),
        )
    } else {
        (
            ui::GROUP_JOIN_PROMPT.to_string(),
            ui::group_join_keyboard(&bot.config),
        )
    };

    match bot
        .api
        .send_message(
            msg.chat.id,
            &prompt,
            SendOptions {
                reply_to_message_id: Some(reply.message_id),
                reply_markup: Some(keyboard),
                ..Default::default()
            },
        )
        .await
    {
        Ok(guide_id) => {
            if let Err(e) = bot.db.set_pending_guide(from.id, guide_id) {
                warn!(error = %e, "guide handle store failed");
            }
            bot.reaper.schedule(
                msg.chat.id,
                guide_id,
                Duration::from_secs(GUIDE_DELETE_AFTER_SECS),
            );
        }
        Err(e) => debug!(error = %e, "submission prompt failed"),
    }

    // The pending decision is made; remove the trigger message either way.
    bot.api.safe_delete(msg.chat.id, msg.message_id).await;

    if member {
        // Best-effort: fails silently when the sender never started the bot.
        let title = group_title(msg.chat.title.as_deref());
        let dm = format!(
            "Whisper to {} in “{}”.\nSend your text here within the next {} minutes.",
            mention_html(target.id, &target.first_name),
            title,
            WHISPER_WINDOW_SECS / 60,
        );
        if let Err(e) = bot.api.send_message(from.id, &dm, SendOptions::html()).await {
            debug!(error = %e, "sender DM skipped");
        }
    }
}
