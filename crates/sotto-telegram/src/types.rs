//! Serde types for the Telegram Bot API.
//!
//! Only the fields needed by the bot are deserialized; unknown fields are
//! ignored. Media attachments are kept as raw values — the bot only ever
//! asks whether they are present.

use serde::{Deserialize, Serialize};

/// Generic Telegram API response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub description: Option<String>,
    pub result: Option<T>,
}

/// A Telegram Update object from `getUpdates`.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
    pub inline_query: Option<InlineQuery>,
}

/// A Telegram Message.
#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub reply_to_message: Option<Box<Message>>,

    // Attachment kinds, present-or-absent only.
    pub photo: Option<serde_json::Value>,
    pub video: Option<serde_json::Value>,
    pub audio: Option<serde_json::Value>,
    pub voice: Option<serde_json::Value>,
    pub video_note: Option<serde_json::Value>,
    pub sticker: Option<serde_json::Value>,
    pub animation: Option<serde_json::Value>,
    pub document: Option<serde_json::Value>,
}

impl Message {
    /// True when the message carries any non-text attachment.
    pub fn has_media(&self) -> bool {
        self.photo.is_some()
            || self.video.is_some()
            || self.audio.is_some()
            || self.voice.is_some()
            || self.video_note.is_some()
            || self.sticker.is_some()
            || self.animation.is_some()
            || self.document.is_some()
    }
}

/// A Telegram User.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

/// A Telegram Chat. For private chats `first_name` is the user's name.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }

    pub fn is_group(&self) -> bool {
        self.kind == "group" || self.kind == "supergroup"
    }
}

/// A callback query from an inline keyboard button press. For buttons under
/// inline-mode messages `message` is absent and `inline_message_id` is set.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub inline_message_id: Option<String>,
    pub data: Option<String>,
}

/// An inline query (typing `@bot <query>` in any chat).
#[derive(Debug, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    pub query: String,
}

/// A chat member as returned by `getChatMember` / `getChatAdministrators`.
#[derive(Debug, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: User,
}

impl ChatMember {
    /// Statuses that count as "subscribed" for the mandatory channel gate.
    pub fn is_subscribed(&self) -> bool {
        matches!(self.status.as_str(), "member" | "administrator" | "creator")
    }
}

/// Sent message result (we only need message_id).
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

/// Inline keyboard markup for message buttons.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row.
    pub fn rows(buttons: Vec<InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// A single inline keyboard button: either a callback or a plain link.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

/// The message content an inline result expands to when picked.
#[derive(Debug, Clone, Serialize)]
pub struct InputTextMessageContent {
    pub message_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

/// An `article`-type inline query result.
#[derive(Debug, Clone, Serialize)]
pub struct InlineQueryResultArticle {
    #[serde(rename = "type")]
    pub result_type: String,
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_message_content: InputTextMessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl InlineQueryResultArticle {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            result_type: "article".to_string(),
            id: id.into(),
            title: title.into(),
            description: None,
            input_message_content: InputTextMessageContent {
                message_text: text.into(),
                parse_mode: None,
            },
            reply_markup: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_update_with_reply_message() {
        let json = r#"{
            "update_id": 123,
            "message": {
                "message_id": 456,
                "from": {"id": 789, "first_name": "Alice", "is_bot": false, "username": "alice"},
                "chat": {"id": -100123, "type": "supergroup", "title": "Chess Club"},
                "date": 1700000000,
                "text": "whisper",
                "reply_to_message": {
                    "message_id": 400,
                    "from": {"id": 790, "first_name": "Bob", "is_bot": false},
                    "chat": {"id": -100123, "type": "supergroup"},
                    "date": 1699999999,
                    "text": "hi all"
                }
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let msg = update.message.unwrap();
        assert!(msg.chat.is_group());
        assert_eq!(msg.text.as_deref(), Some("whisper"));
        let reply = msg.reply_to_message.unwrap();
        assert_eq!(reply.from.unwrap().id, 790);
    }

    #[test]
    fn deserialize_update_with_inline_query() {
        let json = r#"{
            "update_id": 124,
            "inline_query": {
                "id": "iq-1",
                "from": {"id": 789, "first_name": "Alice", "is_bot": false},
                "query": "hello @carol_92",
                "offset": ""
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let iq = update.inline_query.unwrap();
        assert_eq!(iq.query, "hello @carol_92");
    }

    #[test]
    fn deserialize_callback_from_inline_message() {
        let json = r#"{
            "update_id": 125,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 789, "first_name": "Carol", "is_bot": false, "username": "Carol_92"},
                "inline_message_id": "AAAqqq",
                "data": "iws:sometoken"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let cb = update.callback_query.unwrap();
        assert!(cb.message.is_none());
        assert_eq!(cb.inline_message_id.as_deref(), Some("AAAqqq"));
    }

    #[test]
    fn media_detection() {
        let json = r#"{
            "message_id": 1,
            "chat": {"id": 5, "type": "private"},
            "photo": [{"file_id": "abc"}]
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.has_media());
        assert!(msg.chat.is_private());

        let json = r#"{"message_id": 2, "chat": {"id": 5, "type": "private"}, "text": "hi"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(!msg.has_media());
    }

    #[test]
    fn chat_member_subscription_statuses() {
        for (status, expect) in [
            ("member", true),
            ("administrator", true),
            ("creator", true),
            ("left", false),
            ("kicked", false),
            ("restricted", false),
        ] {
            let json = format!(
                r#"{{"status": "{status}", "user": {{"id": 1, "first_name": "A"}}}}"#
            );
            let member: ChatMember = serde_json::from_str(&json).unwrap();
            assert_eq!(member.is_subscribed(), expect, "status {status}");
        }
    }

    #[test]
    fn serialize_mixed_keyboard() {
        let kb = InlineKeyboardMarkup::rows(vec![
            InlineKeyboardButton::link("Join channel", "https://t.me/newsroom"),
            InlineKeyboardButton::callback("I joined", "checksub"),
        ]);
        let json = serde_json::to_string(&kb).unwrap();
        assert!(json.contains("\"url\":\"https://t.me/newsroom\""));
        assert!(json.contains("\"callback_data\":\"checksub\""));
        // a url button must not carry callback_data and vice versa
        assert!(!json.contains("\"callback_data\":null"));
    }

    #[test]
    fn serialize_inline_article() {
        let article = InlineQueryResultArticle::new("tok", "Send whisper", "visible body");
        let json = serde_json::to_string(&article).unwrap();
        assert!(json.contains("\"type\":\"article\""));
        assert!(json.contains("\"message_text\":\"visible body\""));
    }
}
