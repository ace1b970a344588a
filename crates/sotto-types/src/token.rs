//! Inline whisper tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Mint a cryptographically unguessable token for an inline whisper.
///
/// 32 random bytes, base64url without padding — 43 characters, which fits
/// inside Telegram's 64-byte callback_data limit together with its prefix.
pub fn mint() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_43_chars_of_base64url() {
        let token = mint();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(mint(), mint());
    }
}
