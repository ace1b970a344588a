//! Raw HTTP calls to the Telegram Bot API.
//!
//! Wraps reqwest for the outbound surface the bot consumes: sending and
//! deleting messages, answering callback and inline queries, forwarding,
//! and membership/metadata lookups. All methods return typed responses.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::TelegramError;
use crate::types::{
    ApiResponse, Chat, ChatMember, InlineKeyboardMarkup, InlineQueryResultArticle, SentMessage,
    Update, User,
};

const DELETE_ATTEMPTS: u32 = 3;
const DELETE_BACKOFF: Duration = Duration::from_millis(600);

/// Options for `sendMessage` beyond chat and text.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub parse_mode: Option<&'static str>,
    pub reply_to_message_id: Option<i64>,
    pub reply_markup: Option<InlineKeyboardMarkup>,
    pub disable_web_page_preview: bool,
}

impl SendOptions {
    pub fn html() -> Self {
        Self {
            parse_mode: Some("HTML"),
            ..Default::default()
        }
    }
}

/// Low-level Telegram Bot API client.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a new API client for the given bot token.
    pub fn new(bot_token: &str) -> Self {
        Self::with_base_url(bot_token, "https://api.telegram.org")
    }

    /// Create a new API client with a custom base URL (for testing).
    pub fn with_base_url(bot_token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/bot{}", base_url.trim_end_matches('/'), bot_token),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TelegramError> {
        debug!("calling {method}");

        let resp = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(&body)
            .send()
            .await?;

        let api_resp: ApiResponse<T> = resp.json().await?;
        if !api_resp.ok {
            let desc = api_resp.description.unwrap_or_default();
            warn!("{method} failed: {desc}");
            return Err(TelegramError::Api(desc));
        }

        api_resp
            .result
            .ok_or_else(|| TelegramError::Api(format!("{method}: empty result")))
    }

    /// The bot's own identity (used for deep links).
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", json!({})).await
    }

    /// Long-poll for new updates.
    ///
    /// `offset` should be set to `last_update_id + 1` to acknowledge
    /// previously received updates.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut body = json!({
            "timeout": timeout,
            "allowed_updates": ["message", "callback_query", "inline_query"],
        });
        if let Some(off) = offset {
            body["offset"] = json!(off);
        }

        self.call("getUpdates", body).await
    }

    /// Send a text message. Returns the sent message's id.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        opts: SendOptions,
    ) -> Result<i64, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = opts.parse_mode {
            body["parse_mode"] = json!(mode);
        }
        if let Some(reply_to) = opts.reply_to_message_id {
            body["reply_to_message_id"] = json!(reply_to);
        }
        if let Some(markup) = opts.reply_markup {
            body["reply_markup"] = serde_json::to_value(markup)
                .map_err(|e| TelegramError::Api(format!("serialize markup: {e}")))?;
        }
        if opts.disable_web_page_preview {
            body["disable_web_page_preview"] = json!(true);
        }

        let sent: SentMessage = self.call("sendMessage", body).await?;
        Ok(sent.message_id)
    }

    /// Delete a message. Deleting an already-gone message is an API error.
    pub async fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "deleteMessage",
                json!({"chat_id": chat_id, "message_id": message_id}),
            )
            .await?;
        Ok(())
    }

    /// Best-effort delete with bounded retries; silent on permanent failure.
    pub async fn safe_delete(&self, chat_id: i64, message_id: i64) -> bool {
        self.safe_delete_with(chat_id, message_id, DELETE_ATTEMPTS, DELETE_BACKOFF)
            .await
    }

    pub async fn safe_delete_with(
        &self,
        chat_id: i64,
        message_id: i64,
        attempts: u32,
        backoff: Duration,
    ) -> bool {
        for attempt in 0..attempts {
            match self.delete_message(chat_id, message_id).await {
                Ok(()) => return true,
                Err(e) => {
                    debug!("delete attempt {} failed: {e}", attempt + 1);
                    if attempt + 1 < attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        false
    }

    /// Acknowledge a callback query: a short toast, or a modal alert.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), TelegramError> {
        let mut body = json!({
            "callback_query_id": callback_query_id,
            "show_alert": show_alert,
        });
        if let Some(t) = text {
            body["text"] = json!(t);
        }

        let _: serde_json::Value = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }

    /// Answer an inline query with article results. Results are personal and
    /// uncached so each query mints fresh state.
    pub async fn answer_inline_query(
        &self,
        inline_query_id: &str,
        results: &[InlineQueryResultArticle],
    ) -> Result<(), TelegramError> {
        let body = json!({
            "inline_query_id": inline_query_id,
            "results": results,
            "cache_time": 0,
            "is_personal": true,
        });

        let _: serde_json::Value = self.call("answerInlineQuery", body).await?;
        Ok(())
    }

    /// Forward a message verbatim. Returns the new message's id.
    pub async fn forward_message(
        &self,
        chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<i64, TelegramError> {
        let sent: SentMessage = self
            .call(
                "forwardMessage",
                json!({
                    "chat_id": chat_id,
                    "from_chat_id": from_chat_id,
                    "message_id": message_id,
                }),
            )
            .await?;
        Ok(sent.message_id)
    }

    /// Membership lookup. `chat` may be a numeric id string or `@username`.
    pub async fn get_chat_member(
        &self,
        chat: &str,
        user_id: i64,
    ) -> Result<ChatMember, TelegramError> {
        self.call(
            "getChatMember",
            json!({"chat_id": chat, "user_id": user_id}),
        )
        .await
    }

    /// Chat metadata lookup. `chat` may be a numeric id string or `@username`.
    pub async fn get_chat(&self, chat: &str) -> Result<Chat, TelegramError> {
        self.call("getChat", json!({"chat_id": chat})).await
    }

    pub async fn get_chat_administrators(
        &self,
        chat_id: i64,
    ) -> Result<Vec<ChatMember>, TelegramError> {
        self.call("getChatAdministrators", json!({"chat_id": chat_id}))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InlineKeyboardButton;
    use wiremock::matchers::{body_partial_json, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api_for(server: &MockServer) -> TelegramApi {
        TelegramApi::with_base_url("test-token", &server.uri())
    }

    #[tokio::test]
    async fn send_message_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/bot.*/sendMessage"))
            .and(body_partial_json(json!({"chat_id": 5, "text": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "result": {"message_id": 42}
            })))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let id = api.send_message(5, "hi", SendOptions::default()).await.unwrap();
        assert_eq!(id, 42);
    }

    #[tokio::test]
    async fn send_message_serializes_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/bot.*/sendMessage"))
            .and(body_partial_json(json!({
                "parse_mode": "HTML",
                "reply_to_message_id": 7,
                "disable_web_page_preview": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "result": {"message_id": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let opts = SendOptions {
            reply_to_message_id: Some(7),
            reply_markup: Some(InlineKeyboardMarkup::rows(vec![
                InlineKeyboardButton::callback("Open", "show:1:2:3"),
            ])),
            disable_web_page_preview: true,
            ..SendOptions::html()
        };
        api.send_message(5, "hi", opts).await.unwrap();
    }

    #[tokio::test]
    async fn api_error_is_surfaced_with_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/bot.*/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false, "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let err = api
            .send_message(5, "hi", SendOptions::default())
            .await
            .unwrap_err();
        match err {
            TelegramError::Api(desc) => assert!(desc.contains("blocked")),
            other => panic!("expected Api error, got {other}"),
        }
    }

    #[tokio::test]
    async fn safe_delete_retries_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/bot.*/deleteMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false, "description": "message to delete not found"
            })))
            .expect(3)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let deleted = api
            .safe_delete_with(5, 99, 3, Duration::from_millis(1))
            .await;
        assert!(!deleted);
    }

    #[tokio::test]
    async fn safe_delete_stops_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/bot.*/deleteMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "result": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        assert!(api.safe_delete_with(5, 99, 3, Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn get_chat_member_parses_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/bot.*/getChatMember"))
            .and(body_partial_json(json!({"chat_id": "@newsroom", "user_id": 7})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"status": "member", "user": {"id": 7, "first_name": "A"}}
            })))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let member = api.get_chat_member("@newsroom", 7).await.unwrap();
        assert!(member.is_subscribed());
    }

    #[tokio::test]
    async fn answer_inline_query_sends_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/bot.*/answerInlineQuery"))
            .and(body_partial_json(json!({"inline_query_id": "iq-1", "is_personal": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "result": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let results = vec![InlineQueryResultArticle::new("tok", "Send whisper", "body")];
        api.answer_inline_query("iq-1", &results).await.unwrap();
    }
}
