//! Reveal gates: authorize and serve disclosure of whisper text, and drive
//! the exactly-once audit report on the inline path.

use chrono::Utc;
use tracing::{debug, warn};

use sotto_telegram::api::SendOptions;
use sotto_telegram::types::CallbackQuery;
use sotto_types::callback::CallbackPayload;
use sotto_types::display::snippet;
use sotto_types::ALERT_SNIPPET;

use crate::report::{self, WhisperReport};
use crate::{membership, ui, Bot};

pub async fn handle_callback(bot: &Bot, cb: &CallbackQuery) {
    let now = Utc::now();

    if let Err(e) = bot.db.upsert_user(
        cb.from.id,
        cb.from.username.as_deref(),
        &cb.from.first_name,
        now,
    ) {
        warn!(error = %e, "user cache upsert failed");
    }

    let payload = cb.data.as_deref().and_then(CallbackPayload::parse);
    match payload {
        None => alert(bot, &cb.id, ui::REVEAL_INVALID).await,
        Some(CallbackPayload::CheckSub) => check_subscription(bot, cb).await,
        Some(CallbackPayload::Reveal {
            group_id,
            sender_id,
            receiver_id,
        }) => reveal_reply_path(bot, cb, group_id, sender_id, receiver_id).await,
        Some(CallbackPayload::InlineReveal { token }) => {
            reveal_inline_path(bot, cb, &token).await
        }
    }
}

/// Reply-path reveal. Eligible viewers: receiver, sender, administrator.
/// Disclosure is idempotent; the first reveal flips the record to `read`.
async fn reveal_reply_path(
    bot: &Bot,
    cb: &CallbackQuery,
    group_id: i64,
    sender_id: i64,
    receiver_id: i64,
) {
    let viewer = &cb.from;
    let eligible =
        viewer.id == receiver_id || viewer.id == sender_id || viewer.id == bot.config.admin_id;
    if !eligible {
        // Generic refusal: no distinction between "wrong person" and
        // "not found", and never any whisper text.
        alert(bot, &cb.id, ui::NOT_FOR_YOU).await;
        return;
    }

    let whisper = match bot.db.get_whisper(group_id, sender_id, receiver_id) {
        Ok(Some(whisper)) => whisper,
        Ok(None) => {
            alert(bot, &cb.id, ui::REVEAL_INVALID).await;
            return;
        }
        Err(e) => {
            warn!(error = %e, "whisper lookup failed");
            alert(bot, &cb.id, ui::REVEAL_INVALID).await;
            return;
        }
    };

    disclose(bot, &cb.id, viewer.id, &whisper.body).await;

    if let Err(e) = bot.db.mark_whisper_read(whisper.id) {
        warn!(error = %e, "whisper status update failed");
    }
}

/// Inline-path reveal. Eligible viewers: sender, anyone whose username
/// matches the addressed receiver, administrator. On the first reveal whose
/// receiver resolution succeeds, exactly one caller wins the `reported`
/// compare-and-set and runs the audit fan-out.
async fn reveal_inline_path(bot: &Bot, cb: &CallbackQuery, token: &str) {
    let now = Utc::now();

    let record = match bot.db.get_inline_whisper(token) {
        Ok(Some(record)) => record,
        Ok(None) => {
            alert(bot, &cb.id, ui::REVEAL_INVALID).await;
            return;
        }
        Err(e) => {
            warn!(error = %e, "inline whisper lookup failed");
            alert(bot, &cb.id, ui::REVEAL_INVALID).await;
            return;
        }
    };

    if record.is_expired(now) {
        alert(bot, &cb.id, ui::REVEAL_INVALID).await;
        return;
    }

    let viewer = &cb.from;
    let username_matches = viewer
        .username
        .as_deref()
        .is_some_and(|u| u.eq_ignore_ascii_case(&record.receiver_username));
    let eligible = viewer.id == record.sender_id
        || username_matches
        || viewer.id == bot.config.admin_id;
    if !eligible {
        alert(bot, &cb.id, ui::NOT_FOR_YOU).await;
        return;
    }

    disclose(bot, &cb.id, viewer.id, &record.body).await;

    if record.reported {
        return;
    }

    // Opportunistic receiver resolution: the clicking viewer's own id when
    // they matched by username, otherwise a best-effort lookup. When it
    // fails, the report is deferred to a future eligible click.
    let resolved = if username_matches {
        Some((viewer.id, viewer.first_name.clone()))
    } else {
        resolve_by_username(bot, &record.receiver_username).await
    };
    let Some((receiver_id, receiver_name)) = resolved else {
        return;
    };

    if let Err(e) =
        bot.db
            .insert_whisper_dedup(0, record.sender_id, receiver_id, &record.body, now)
    {
        warn!(error = %e, "inline whisper record insert failed");
    }

    match bot.db.claim_inline_report(token) {
        Ok(true) => {
            let sender_name = bot
                .db
                .display_name(record.sender_id)
                .ok()
                .flatten()
                .unwrap_or_else(|| "user".to_string());
            report::fan_out(
                bot,
                &WhisperReport {
                    group_id: 0,
                    group_title: None,
                    sender_id: record.sender_id,
                    sender_name,
                    receiver_id,
                    receiver_name,
                    body: record.body.clone(),
                },
            )
            .await;
        }
        Ok(false) => {} // another reveal won the race
        Err(e) => warn!(error = %e, "report claim failed"),
    }
}

async fn resolve_by_username(bot: &Bot, username: &str) -> Option<(i64, String)> {
    match bot.api.get_chat(&format!("@{username}")).await {
        Ok(chat) => {
            let name = chat
                .first_name
                .clone()
                .unwrap_or_else(|| username.to_string());
            if let Err(e) =
                bot.db
                    .upsert_user(chat.id, chat.username.as_deref(), &name, Utc::now())
            {
                warn!(error = %e, "resolved user cache upsert failed");
            }
            Some((chat.id, name))
        }
        Err(e) => {
            debug!(username, error = %e, "receiver resolution failed, deferring");
            None
        }
    }
}

/// Show the whisper text to an eligible viewer: in the alert when short,
/// otherwise a truncated alert plus the full text by direct message.
async fn disclose(bot: &Bot, callback_id: &str, viewer_id: i64, body: &str) {
    let fits = body.chars().count() <= ALERT_SNIPPET;
    let shown = snippet(body, ALERT_SNIPPET);

    if let Err(e) = bot
        .api
        .answer_callback_query(callback_id, Some(&shown), true)
        .await
    {
        debug!(error = %e, "reveal alert failed");
    }

    if !fits {
        let full = format!("🤫 Whisper:\n\n{body}");
        if let Err(e) = bot
            .api
            .send_message(viewer_id, &full, SendOptions::default())
            .await
        {
            debug!(viewer_id, error = %e, "full-text DM skipped");
        }
    }
}

async fn check_subscription(bot: &Bot, cb: &CallbackQuery) {
    if membership::is_member(bot, cb.from.id).await {
        if let Err(e) = bot
            .api
            .answer_callback_query(&cb.id, Some(ui::MEMBERSHIP_CONFIRMED), false)
            .await
        {
            debug!(error = %e, "checksub ack failed");
        }
        crate::private::send_with_keyboard(
            bot,
            cb.from.id,
            ui::INTRO,
            ui::post_join_keyboard(&bot.config),
        )
        .await;
    } else {
        alert(bot, &cb.id, ui::MEMBERSHIP_MISSING).await;
    }
}

async fn alert(bot: &Bot, callback_id: &str, text: &str) {
    if let Err(e) = bot
        .api
        .answer_callback_query(callback_id, Some(text), true)
        .await
    {
        debug!(error = %e, "callback alert failed");
    }
}
