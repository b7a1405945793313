//! Session domain entities

use crate::core::id::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum title length (in bytes) derived from a first prompt.
pub const MAX_DERIVED_TITLE_BYTES: usize = 60;

/// A conversation thread (Entity)
///
/// Only metadata lives here; the messages of a session are held in a
/// [`MessageLog`](crate::message::log::MessageLog) keyed by the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a session whose title is derived from the first prompt.
    ///
    /// The title is the first line of the prompt, cut at a character
    /// boundary so it never exceeds [`MAX_DERIVED_TITLE_BYTES`].
    pub fn from_first_prompt(id: SessionId, prompt: &str) -> Self {
        Self::new(id, derive_title(prompt))
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn derive_title(prompt: &str) -> String {
    let line = prompt.trim().lines().next().unwrap_or_default().trim();
    if line.len() <= MAX_DERIVED_TITLE_BYTES {
        return line.to_string();
    }
    let mut end = MAX_DERIVED_TITLE_BYTES;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", line[..end].trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_uses_first_line() {
        let session = Session::from_first_prompt(
            SessionId::new("s1"),
            "  How do lifetimes work?\nMore detail here",
        );
        assert_eq!(session.title, "How do lifetimes work?");
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn test_title_is_truncated_on_char_boundary() {
        let prompt = "あ".repeat(30); // 90 bytes
        let session = Session::from_first_prompt(SessionId::new("s1"), &prompt);
        assert!(session.title.ends_with('…'));
        assert_eq!(session.title.trim_end_matches('…'), "あ".repeat(20));
    }

    #[test]
    fn test_touch_moves_updated_at_forward() {
        let mut session = Session::new(SessionId::new("s1"), "t");
        let before = session.updated_at;
        session.touch();
        assert!(session.updated_at >= before);
    }
}
