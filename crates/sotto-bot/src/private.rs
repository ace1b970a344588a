//! Private-channel handler: /start and deep links, help, media rejection,
//! the administrator's control surface, and whisper text submission.

use chrono::Utc;
use tracing::{debug, warn};

use sotto_db::models::PendingRow;
use sotto_telegram::api::SendOptions;
use sotto_telegram::types::{InlineKeyboardMarkup, Message, User};
use sotto_types::callback::CallbackPayload;
use sotto_types::display::mention_html;
use sotto_types::{DEEP_CHECKSUB, DEEP_GO};

use crate::report::{self, WhisperReport};
use crate::{Bot, admin, membership, ui};

pub async fn handle_private_message(bot: &Bot, msg: &Message) {
    let Some(from) = &msg.from else { return };
    let now = Utc::now();

    if let Err(e) = bot
        .db
        .upsert_user(from.id, from.username.as_deref(), &from.first_name, now)
    {
        warn!(error = %e, "user cache upsert failed");
    }

    let text = msg.text.as_deref().unwrap_or("").trim().to_string();

    if let Some(arg) = text.strip_prefix("/start") {
        handle_start(bot, from, arg.trim()).await;
        return;
    }

    // The administrator's private channel doubles as the control surface.
    if from.id == bot.config.admin_id && admin::handle(bot, msg, &text).await {
        return;
    }

    // Whispers are text-only.
    if msg.has_media() || text.is_empty() {
        reply(bot, from.id, ui::TEXT_ONLY).await;
        return;
    }

    if text.eq_ignore_ascii_case("help") {
        reply(bot, from.id, ui::HELP).await;
        return;
    }

    // Membership is re-checked on every submission. On failure the pending
    // row, if any, survives untouched for a retry after joining.
    if !membership::is_member(bot, from.id).await {
        send_with_keyboard(
            bot,
            from.id,
            &ui::join_prompt(&bot.config),
            ui::join_keyboard(&bot.config),
        )
        .await;
        return;
    }

    // Consume (read + delete) the pending row. Of any concurrent
    // submissions from the same sender, at most one gets here with a row.
    let pending = match bot.db.consume_pending(from.id) {
        Ok(Some(pending)) => pending,
        Ok(None) => {
            reply(bot, from.id, ui::NO_ACTIVE_WHISPER).await;
            return;
        }
        Err(e) => {
            warn!(error = %e, "pending consume failed");
            reply(bot, from.id, ui::SEND_FAILED).await;
            return;
        }
    };

    if pending.is_expired(now) {
        reply(bot, from.id, ui::WINDOW_EXPIRED).await;
        return;
    }

    deliver(bot, from, &pending, &text).await;
}

/// Post the reveal control in the group, record the whisper, confirm to the
/// sender, and report. The reply path has no replay vector, so the report
/// fires exactly once per successful submission.
async fn deliver(bot: &Bot, from: &User, pending: &PendingRow, body: &str) {
    let now = Utc::now();

    let sender_name = bot
        .db
        .display_name(from.id)
        .ok()
        .flatten()
        .unwrap_or_else(|| from.first_name.clone());
    let receiver_name = bot
        .db
        .display_name(pending.receiver_id)
        .ok()
        .flatten()
        .unwrap_or_else(|| "recipient".to_string());
    let title = bot.db.chat_title(pending.group_id).ok().flatten();

    let control = CallbackPayload::Reveal {
        group_id: pending.group_id,
        sender_id: from.id,
        receiver_id: pending.receiver_id,
    };
    let keyboard = InlineKeyboardMarkup::rows(vec![
        sotto_telegram::types::InlineKeyboardButton::callback("Show message ✉️", control.encode()),
    ]);
    let notice = format!(
        "{} has a whisper from {}.",
        mention_html(pending.receiver_id, &receiver_name),
        mention_html(from.id, &sender_name),
    );

    let notice_id = match bot
        .api
        .send_message(
            pending.group_id,
            &notice,
            SendOptions {
                reply_markup: Some(keyboard),
                ..SendOptions::html()
            },
        )
        .await
    {
        Ok(id) => id,
        Err(e) => {
            // The pending row is already consumed; the sender retriggers.
            warn!(error = %e, group_id = pending.group_id, "reveal notice failed");
            reply(bot, from.id, ui::SEND_FAILED).await;
            return;
        }
    };

    if let Err(e) = bot.db.insert_whisper(
        pending.group_id,
        from.id,
        pending.receiver_id,
        body,
        Some(notice_id),
        now,
    ) {
        warn!(error = %e, "whisper record insert failed");
    }

    if let Some(guide_id) = pending.guide_message_id {
        bot.api.safe_delete(pending.group_id, guide_id).await;
    }

    reply(bot, from.id, ui::WHISPER_SENT).await;

    report::fan_out(
        bot,
        &WhisperReport {
            group_id: pending.group_id,
            group_title: title,
            sender_id: from.id,
            sender_name,
            receiver_id: pending.receiver_id,
            receiver_name,
            body: body.to_string(),
        },
    )
    .await;
}

async fn handle_start(bot: &Bot, from: &User, arg: &str) {
    match arg {
        DEEP_GO => {
            send_with_keyboard(
                bot,
                from.id,
                ui::READY_FOR_TEXT,
                ui::post_join_keyboard(&bot.config),
            )
            .await;
        }
        DEEP_CHECKSUB => {
            if membership::is_member(bot, from.id).await {
                let text = format!("{}\n{}", ui::MEMBERSHIP_CONFIRMED, ui::READY_FOR_TEXT);
                send_with_keyboard(bot, from.id, &text, ui::post_join_keyboard(&bot.config)).await;
            } else {
                send_with_keyboard(
                    bot,
                    from.id,
                    &ui::join_prompt(&bot.config),
                    ui::join_keyboard(&bot.config),
                )
                .await;
            }
        }
        _ => {
            if membership::is_member(bot, from.id).await {
                send_with_keyboard(bot, from.id, ui::INTRO, ui::post_join_keyboard(&bot.config))
                    .await;
            } else {
                send_with_keyboard(
                    bot,
                    from.id,
                    &ui::join_prompt(&bot.config),
                    ui::join_keyboard(&bot.config),
                )
                .await;
            }
        }
    }
}

pub(crate) async fn reply(bot: &Bot, chat_id: i64, text: &str) {
    if let Err(e) = bot
        .api
        .send_message(chat_id, text, SendOptions::default())
        .await
    {
        debug!(chat_id, error = %e, "reply failed");
    }
}

pub(crate) async fn send_with_keyboard(
    bot: &Bot,
    chat_id: i64,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) {
    if let Err(e) = bot
        .api
        .send_message(
            chat_id,
            text,
            SendOptions {
                reply_markup: Some(keyboard),
                ..Default::default()
            },
        )
        .await
    {
        debug!(chat_id, error = %e, "keyboard reply failed");
    }
}
