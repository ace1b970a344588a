//! Runtime configuration shared across the bot crates.

/// Bot-wide configuration, assembled from the environment at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// The administrator: always an audit recipient, never a stored watcher.
    pub admin_id: i64,
    /// Mandatory channel usernames (no `@`), all lowercase, deduplicated.
    pub channels: Vec<String>,
    /// Optional support contact shown on the join prompt.
    pub support_url: Option<String>,
    /// The bot's own username, resolved via `getMe` at startup. Used to
    /// build deep links into the private chat.
    pub bot_username: String,
}

/// Normalize a comma-separated channel list: strip `@` and whitespace,
/// lowercase, drop empties and duplicates while preserving order.
pub fn normalize_channels(raw: &str) -> Vec<String> {
    let mut channels = Vec::new();
    for part in raw.split(',') {
        let ch = part.trim().trim_start_matches('@').to_lowercase();
        if !ch.is_empty() && !channels.contains(&ch) {
            channels.push(ch);
        }
    }
    channels
}

impl BotConfig {
    /// Deep link into the bot's private chat carrying a start parameter.
    pub fn deep_link(&self, key: &str) -> String {
        format!("https://t.me/{}?start={key}", self.bot_username)
    }

    /// Public join URL for a mandatory channel.
    pub fn channel_url(channel: &str) -> String {
        format!("https://t.me/{channel}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_normalized_and_deduplicated() {
        assert_eq!(
            normalize_channels("@NewsRoom, newsroom , @other_one,,"),
            vec!["newsroom".to_string(), "other_one".to_string()]
        );
        assert!(normalize_channels("").is_empty());
        assert!(normalize_channels(" , ").is_empty());
    }

    #[test]
    fn deep_links_carry_the_start_parameter() {
        let config = BotConfig {
            admin_id: 1,
            channels: vec![],
            support_url: None,
            bot_username: "sotto_bot".into(),
        };
        assert_eq!(
            config.deep_link(crate::DEEP_GO),
            "https://t.me/sotto_bot?start=go"
        );
    }
}
