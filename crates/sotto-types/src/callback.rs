//! Typed callback-button payloads.
//!
//! Telegram delivers button presses as opaque strings (max 64 bytes). Each
//! control kind gets its own variant here; anything that does not parse is
//! rejected as malformed rather than handled ad hoc.

/// Payload carried by an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    /// Open a reply-path whisper, identified by its registry key.
    Reveal {
        group_id: i64,
        sender_id: i64,
        receiver_id: i64,
    },
    /// Open an inline-path whisper, identified by its unguessable token.
    InlineReveal { token: String },
    /// Re-check mandatory channel membership ("I joined" button).
    CheckSub,
}

impl CallbackPayload {
    /// Encode into the wire string placed in `callback_data`.
    pub fn encode(&self) -> String {
        match self {
            Self::Reveal {
                group_id,
                sender_id,
                receiver_id,
            } => format!("show:{group_id}:{sender_id}:{receiver_id}"),
            Self::InlineReveal { token } => format!("iws:{token}"),
            Self::CheckSub => "checksub".to_string(),
        }
    }

    /// Parse a wire string. Returns `None` for anything malformed.
    pub fn parse(data: &str) -> Option<Self> {
        if data == "checksub" {
            return Some(Self::CheckSub);
        }

        if let Some(token) = data.strip_prefix("iws:") {
            if token.is_empty() || token.len() > 60 {
                return None;
            }
            // Tokens are base64url; reject anything outside that alphabet.
            if !token
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            {
                return None;
            }
            return Some(Self::InlineReveal {
                token: token.to_string(),
            });
        }

        if let Some(rest) = data.strip_prefix("show:") {
            let mut parts = rest.splitn(3, ':');
            let group_id = parts.next()?.parse().ok()?;
            let sender_id = parts.next()?.parse().ok()?;
            let receiver_id = parts.next()?.parse().ok()?;
            return Some(Self::Reveal {
                group_id,
                sender_id,
                receiver_id,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_round_trips() {
        let payload = CallbackPayload::Reveal {
            group_id: -100123,
            sender_id: 42,
            receiver_id: 77,
        };
        let encoded = payload.encode();
        assert_eq!(encoded, "show:-100123:42:77");
        assert_eq!(CallbackPayload::parse(&encoded), Some(payload));
    }

    #[test]
    fn inline_reveal_round_trips() {
        let payload = CallbackPayload::InlineReveal {
            token: "A1b2-C3d4_E5f6".into(),
        };
        assert_eq!(CallbackPayload::parse(&payload.encode()), Some(payload));
    }

    #[test]
    fn checksub_round_trips() {
        assert_eq!(
            CallbackPayload::parse("checksub"),
            Some(CallbackPayload::CheckSub)
        );
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for data in [
            "",
            "show:",
            "show:1:2",
            "show:a:b:c",
            "show:1:2:3:4:5x", // trailing junk in receiver field
            "iws:",
            "iws:has spaces",
            "iws:semi;colon",
            "reveal:1:2:3",
            "checksub2",
        ] {
            assert_eq!(CallbackPayload::parse(data), None, "accepted {data:?}");
        }
    }

    #[test]
    fn reveal_parse_rejects_extra_segments() {
        // splitn(3) folds extras into the last field, which then fails to parse
        assert_eq!(CallbackPayload::parse("show:1:2:3:4"), None);
    }
}
