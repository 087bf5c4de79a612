//! Conversation naming rules

use serde::{Deserialize, Serialize};

/// Product constants for conversation names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Name the backend gives conversations nobody has named yet
    pub default_name: String,
    /// Characters of the first message kept in a derived name
    pub title_max_chars: usize,
    /// Appended when the first message was cut
    pub ellipsis: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            default_name: "New Chat".to_string(),
            title_max_chars: 30,
            ellipsis: "...".to_string(),
        }
    }
}

impl NamingConfig {
    pub fn is_default(&self, name: &str) -> bool {
        name == self.default_name
    }

    /// Derive a conversation name from the first message sent to it
    pub fn derive_title(&self, text: &str) -> String {
        truncate_chars(text.trim(), self.title_max_chars, &self.ellipsis)
    }
}

/// Truncate a string to `max` characters, appending `marker` if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize, marker: &str) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}{}", truncated, marker)
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        let naming = NamingConfig::default();
        assert_eq!(naming.derive_title("Hello"), "Hello");
        assert_eq!(naming.derive_title("  Hello \n"), "Hello");
    }

    #[test]
    fn test_exactly_max_chars_not_marked() {
        let naming = NamingConfig::default();
        let text = "a".repeat(30);
        assert_eq!(naming.derive_title(&text), text);
    }

    #[test]
    fn test_long_text_truncated() {
        let naming = NamingConfig::default();
        let text = "What are the requirements for a company?!";
        let text = format!("{}{}", text, "x".repeat(45 - text.chars().count()));
        assert_eq!(text.chars().count(), 45);
        assert_eq!(
            naming.derive_title(&text),
            "What are the requirements for ..."
        );
    }

    #[test]
    fn test_truncation_is_char_based() {
        assert_eq!(truncate_chars("привет мир", 6, "…"), "привет…");
        assert_eq!(truncate_chars("日本語", 3, "..."), "日本語");
    }

    #[test]
    fn test_custom_config() {
        let naming = NamingConfig {
            default_name: "Untitled".into(),
            title_max_chars: 5,
            ellipsis: "~".into(),
        };
        assert!(naming.is_default("Untitled"));
        assert!(!naming.is_default("New Chat"));
        assert_eq!(naming.derive_title("abcdefgh"), "abcde~");
    }
}
