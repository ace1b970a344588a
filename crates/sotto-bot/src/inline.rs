//! Inline whisper creation: `@bot <text> @username` from any chat.
//!
//! The receiver is addressed by username only — their numeric id is unknown
//! until someone matching clicks the reveal control, and may never be.

use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};

use sotto_telegram::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InlineQuery, InlineQueryResultArticle,
};
use sotto_types::callback::CallbackPayload;
use sotto_types::display::mention_html;
use sotto_types::{WHISPER_WINDOW_SECS, inline, token};

use crate::{Bot, membership, ui};

pub async fn handle_inline_query(bot: &Bot, query: &InlineQuery) {
    let now = Utc::now();
    let from = &query.from;

    if let Err(e) = bot
        .db
        .upsert_user(from.id, from.username.as_deref(), &from.first_name, now)
    {
        warn!(error = %e, "user cache upsert failed");
    }

    if !membership::is_member(bot, from.id).await {
        let join = InlineQueryResultArticle::new(
            "join-first",
            ui::INLINE_JOIN_TITLE,
            ui::join_prompt(&bot.config),
        );
        answer(bot, &query.id, &[join]).await;
        return;
    }

    let Some(parsed) = inline::parse_query(&query.query) else {
        let help = InlineQueryResultArticle::new(
            "help",
            ui::INLINE_HELP_TITLE,
            ui::INLINE_HELP_TEXT,
        );
        answer(bot, &query.id, &[help]).await;
        return;
    };

    let token = token::mint();
    let expires_at = now + TimeDelta::seconds(WHISPER_WINDOW_SECS);
    if let Err(e) = bot.db.insert_inline_whisper(
        &token,
        from.id,
        &parsed.receiver_username,
        &parsed.text,
        now,
        expires_at,
    ) {
        warn!(error = %e, "inline whisper store failed");
        return;
    }

    // The visible body never contains the whisper text.
    let mut article = InlineQueryResultArticle::new(
        &token,
        format!("Send a whisper to @{}", parsed.receiver_username),
        format!(
            "🤫 {} sent a whisper to @{}.",
            mention_html(from.id, &from.first_name),
            parsed.receiver_username,
        ),
    );
    article.description = Some("The text stays hidden until revealed.".to_string());
    article.input_message_content.parse_mode = Some("HTML".to_string());
    article.reply_markup = Some(InlineKeyboardMarkup::rows(vec![
        InlineKeyboardButton::callback(
            "Show message ✉️",
            CallbackPayload::InlineReveal { token }.encode(),
        ),
    ]));

    answer(bot, &query.id, &[article]).await;
}

async fn answer(bot: &Bot, query_id: &str, results: &[InlineQueryResultArticle]) {
    if let Err(e) = bot.api.answer_inline_query(query_id, results).await {
        debug!(error = %e, "inline answer failed");
    }
}
