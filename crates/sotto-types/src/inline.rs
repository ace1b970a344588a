//! Parsing for the inline-addressing path.
//!
//! An inline query reads `<free text> @<username>` — the whisper text
//! followed by the intended receiver's username. The receiver's numeric id
//! is not known at this point and may never be resolved.

/// A successfully parsed inline query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineWhisperQuery {
    pub text: String,
    /// Receiver username, lowercased (Telegram usernames are case-insensitive).
    pub receiver_username: String,
}

/// Split an inline query into whisper text and trailing `@username`.
///
/// Returns `None` when there is no trailing username or no text before it.
pub fn parse_query(query: &str) -> Option<InlineWhisperQuery> {
    let trimmed = query.trim();
    let at = trimmed.rfind('@')?;
    let (text, username) = trimmed.split_at(at);
    let username = &username[1..];

    // Telegram usernames: 5-32 chars of [A-Za-z0-9_]
    if username.len() < 5
        || username.len() > 32
        || !username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return None;
    }

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(InlineWhisperQuery {
        text: text.to_string(),
        receiver_username: username.to_lowercase(),
    })
}
