//! User-facing texts and keyboards.
//!
//! Everything a user ever reads lives here; handlers only pick which one to
//! send. None of these ever embed whisper text except the reveal responses
//! built at the call site.

use sotto_telegram::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use sotto_types::config::BotConfig;
use sotto_types::{DEEP_CHECKSUB, DEEP_GO};

pub const INTRO: &str = "Welcome to sotto!\n\
    To whisper, reply to someone's message in a group with \"whisper\", \
    \"hush\" or \"secret\", then send the text here in private.";

pub const HELP: &str = "Quick guide:\n\
    1) In the group, reply to the target person's message.\n\
    2) Send one of the words: whisper / hush / secret.\n\
    3) Send the whisper text here within 3 minutes.\n\n\
    Only the sender and the receiver can see the text.";

pub const TEXT_ONLY: &str =
    "Only text is accepted. Please send your message as plain text.";

pub const NO_ACTIVE_WHISPER: &str = "You have no active whisper.\n\
    First reply to the target person's message in the group and send \"whisper\".";

pub const WINDOW_EXPIRED: &str =
    "The whisper window has expired. Trigger again in the group.";

pub const WHISPER_SENT: &str = "Whisper sent ✅";

pub const SEND_FAILED: &str = "Could not deliver the whisper. Please try again.";

pub const READY_FOR_TEXT: &str =
    "Ready when you are — send the whisper text now.";

pub const MEMBERSHIP_CONFIRMED: &str = "Membership confirmed ✅";

pub const MEMBERSHIP_MISSING: &str =
    "You haven't joined all the channels yet. Join and try again.";

pub const REPLY_REQUIRED: &str = "To whisper, reply to the target person's \
    message and send \"whisper\", \"hush\" or \"secret\".";

pub const NOT_FOR_YOU: &str = "This message is not for you.";

pub const REVEAL_INVALID: &str = "This whisper has expired or is no longer valid.";

pub const INLINE_HELP_TITLE: &str = "How to whisper inline";

pub const INLINE_HELP_TEXT: &str =
    "Write the whisper text followed by the receiver: <text> @username";

pub const INLINE_JOIN_TITLE: &str = "Join the channels first";

pub const GROUP_JOIN_PROMPT: &str = "Join the channel(s) first, then press \
    \"I joined, let's go ✅\" to write your whisper in private.";

/// Join prompt body, listing the mandatory channels.
pub fn join_prompt(config: &BotConfig) -> String {
    let channels = config
        .channels
        .iter()
        .map(|ch| format!("@{ch}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Hi! 👋\n\nTo use the bot, first join the required channel(s):\n👉 {channels}\n\nThen press \"I joined ✅\"."
    )
}

/// Guidance posted in the group under the target's message.
pub fn group_guide(window_minutes: i64) -> String {
    format!(
        "Send your whisper text to me in private.\nTime limit: {window_minutes} minutes."
    )
}

/// Keyboard for the join prompt in private chat: channel links, a
/// membership re-check button, and the standing links.
pub fn join_keyboard(config: &BotConfig) -> InlineKeyboardMarkup {
    let mut buttons = vec![InlineKeyboardButton::callback(
        "I joined ✅",
        sotto_types::callback::CallbackPayload::CheckSub.encode(),
    )];
    for ch in &config.channels {
        buttons.push(InlineKeyboardButton::link(
            format!("Join @{ch}"),
            BotConfig::channel_url(ch),
        ));
    }
    append_standing_links(config, &mut buttons);
    InlineKeyboardMarkup::rows(buttons)
}

/// Keyboard shown once membership is confirmed.
pub fn post_join_keyboard(config: &BotConfig) -> InlineKeyboardMarkup {
    let mut buttons = Vec::new();
    append_standing_links(config, &mut buttons);
    InlineKeyboardMarkup::rows(buttons)
}

/// Group keyboard for a member: deep link straight into the private chat.
pub fn go_private_keyboard(config: &BotConfig) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::rows(vec![InlineKeyboardButton::link(
        "✉️ Write the whisper in private",
        config.deep_link(DEEP_GO),
    )])
}

/// Group keyboard for a non-member: channel links plus a deep link that
/// re-checks membership on arrival.
pub fn group_join_keyboard(config: &BotConfig) -> InlineKeyboardMarkup {
    let mut buttons: Vec<InlineKeyboardButton> = config
        .channels
        .iter()
        .map(|ch| InlineKeyboardButton::link(format!("Join @{ch}"), BotConfig::channel_url(ch)))
        .collect();
    buttons.push(InlineKeyboardButton::link(
        "I joined, let's go ✅",
        config.deep_link(DEEP_CHECKSUB),
    ));
    InlineKeyboardMarkup::rows(buttons)
}

fn append_standing_links(config: &BotConfig, buttons: &mut Vec<InlineKeyboardButton>) {
    buttons.push(InlineKeyboardButton::link(
        "Add me to a group ➕",
        format!("https://t.me/{}?startgroup=true", config.bot_username),
    ));
    if let Some(support) = &config.support_url {
        buttons.push(InlineKeyboardButton::link("Contact support 👨‍💻", support));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BotConfig {
        BotConfig {
            admin_id: 1,
            channels: vec!["newsroom".into(), "backstage".into()],
            support_url: Some("https://t.me/sotto_support".into()),
            bot_username: "sotto_bot".into(),
        }
    }

    #[test]
    fn join_prompt_lists_channels() {
        let text = join_prompt(&config());
        assert!(text.contains("@newsroom, @backstage"));
    }

    #[test]
    fn join_keyboard_has_check_channels_and_links() {
        let kb = join_keyboard(&config());
        // checksub + 2 channels + add-to-group + support
        assert_eq!(kb.inline_keyboard.len(), 5);
        assert_eq!(
            kb.inline_keyboard[0][0].callback_data.as_deref(),
            Some("checksub")
        );
    }

    #[test]
    fn group_join_keyboard_ends_with_recheck_deep_link() {
        let kb = group_join_keyboard(&config());
        let last = kb.inline_keyboard.last().unwrap().first().unwrap();
        assert_eq!(
            last.url.as_deref(),
            Some("https://t.me/sotto_bot?start=checksub2")
        );
    }
}
