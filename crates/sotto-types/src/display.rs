//! Display helpers for user-facing HTML messages.
//!
//! Names and titles come from the identity cache and are never trusted for
//! anything beyond rendering; angle brackets are stripped so cached values
//! cannot break out of the surrounding HTML.

/// Strip HTML-significant characters from a display name.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| *c != '<' && *c != '>').collect();
    if cleaned.trim().is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

/// An HTML mention link for a user without a username.
pub fn mention_html(user_id: i64, name: &str) -> String {
    format!("<a href=\"tg://user?id={user_id}\">{}</a>", sanitize(name))
}

/// Group title for display, with a fallback for unknown chats.
pub fn group_title(title: Option<&str>) -> String {
    match title {
        Some(t) if !t.trim().is_empty() => sanitize(t),
        _ => "group".to_string(),
    }
}

/// Truncate text to at most `max` characters, appending an ellipsis when cut.
/// Operates on character boundaries so multi-byte text never splits mid-char.
pub fn snippet(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_angle_brackets() {
        assert_eq!(sanitize("<b>Mallory</b>"), "bMallory/b");
        assert_eq!(sanitize("Alice"), "Alice");
    }

    #[test]
    fn sanitize_falls_back_on_empty() {
        assert_eq!(sanitize(""), "user");
        assert_eq!(sanitize("<>"), "user");
    }

    #[test]
    fn mention_links_by_id() {
        assert_eq!(
            mention_html(42, "Alice"),
            "<a href=\"tg://user?id=42\">Alice</a>"
        );
    }

    #[test]
    fn group_title_fallback() {
        assert_eq!(group_title(None), "group");
        assert_eq!(group_title(Some("")), "group");
        assert_eq!(group_title(Some("Chess Club")), "Chess Club");
    }

    #[test]
    fn snippet_truncates_on_char_boundaries() {
        assert_eq!(snippet("short", 10), "short");
        assert_eq!(snippet("abcdef", 3), "abc…");
        // multi-byte: must not panic or split a char
        assert_eq!(snippet("héllo wörld", 4), "héll…");
    }
}
