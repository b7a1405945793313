//! JSON fixture for the offline backend
//!
//! ```json
//! {
//!   "models": {
//!     "openai": [{ "name": "gpt-4o" }],
//!     "custom-agent": [{ "agent_id": "a-1", "name": "Helper" }]
//!   },
//!   "conversations": {
//!     "s-1": { "title": "Hello", "messages": [ ... ] },
//!     "s-2": { "conversation": { "messages": [ ... ] } }
//!   }
//! }
//! ```
//!
//! Conversation records come in two shapes, flat or wrapped in a
//! `conversation` object; both are keyed by session id. Messages may omit
//! `session_id`, which is then taken from the key.

use chatpanel_application::ConversationSnapshot;
use chatpanel_domain::{Message, MessageType, ModelCatalog, Session, SessionId};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Title given to fixture conversations with no title and no human message.
const UNTITLED: &str = "Untitled conversation";

/// Errors while reading a fixture
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parsed fixture contents.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub catalog: ModelCatalog,
    pub conversations: Vec<ConversationSnapshot>,
}

#[derive(Deserialize)]
struct RawFixture {
    #[serde(default)]
    models: ModelCatalog,
    #[serde(default)]
    conversations: BTreeMap<String, RawConversation>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawConversation {
    Wrapped { conversation: RawConversationBody },
    Flat(RawConversationBody),
}

#[derive(Deserialize, Default)]
struct RawConversationBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    messages: Vec<serde_json::Value>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, FixtureError> {
        let raw: RawFixture = serde_json::from_str(text)?;
        let conversations = raw
            .conversations
            .into_iter()
            .map(|(id, record)| {
                let body = match record {
                    RawConversation::Wrapped { conversation } => conversation,
                    RawConversation::Flat(body) => body,
                };
                snapshot(SessionId::new(id), body)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            catalog: raw.models,
            conversations,
        })
    }
}

fn snapshot(
    session_id: SessionId,
    body: RawConversationBody,
) -> Result<ConversationSnapshot, serde_json::Error> {
    let messages = body
        .messages
        .into_iter()
        .map(|mut value| {
            if let Some(object) = value.as_object_mut() {
                object
                    .entry("session_id")
                    .or_insert_with(|| session_id.as_str().into());
            }
            serde_json::from_value::<Message>(value)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let title = body.title.unwrap_or_else(|| {
        messages
            .iter()
            .find(|m| m.message_type == MessageType::Human)
            .map(|m| Session::from_first_prompt(session_id.clone(), &m.content).title)
            .unwrap_or_else(|| UNTITLED.to_string())
    });
    let mut session = Session::new(session_id, title);
    if let Some(created_at) = body
        .created_at
        .or_else(|| messages.iter().map(|m| m.created_at).min())
    {
        session.created_at = created_at;
    }
    if let Some(updated_at) = messages.iter().map(|m| m.created_at).max() {
        session.updated_at = updated_at;
    }
    Ok(ConversationSnapshot { session, messages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpanel_domain::{CUSTOM_AGENT_PROVIDER, MessageId};

    const FIXTURE: &str = r#"{
        "models": {
            "openai": [{ "name": "gpt-4o" }],
            "custom-agent": [{ "agent_id": "a-1", "name": "Helper" }]
        },
        "conversations": {
            "flat": {
                "title": "Flat one",
                "messages": [
                    { "id": "a1", "type": "ai", "author": "gpt-4o", "content": "Hi there",
                      "previous_message_id": "h1", "created_at": "2026-01-01T10:00:05Z" },
                    { "id": "h1", "type": "human", "author": "Ada", "content": "Hello",
                      "created_at": "2026-01-01T10:00:00Z" }
                ]
            },
            "wrapped": {
                "conversation": {
                    "messages": [
                        { "id": "h9", "session_id": "wrapped", "type": "human",
                          "author": "Ada", "content": "Summarize this\nand more",
                          "created_at": "2026-02-01T09:00:00Z" }
                    ]
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_catalog() {
        let fixture = Fixture::parse(FIXTURE).unwrap();
        assert_eq!(fixture.catalog.len(), 2);
        let agent = fixture.catalog.find_agent("a-1").unwrap();
        assert_eq!(agent.provider, CUSTOM_AGENT_PROVIDER);
    }

    #[test]
    fn test_parse_both_conversation_shapes() {
        let fixture = Fixture::parse(FIXTURE).unwrap();
        assert_eq!(fixture.conversations.len(), 2);

        let flat = &fixture.conversations[0];
        assert_eq!(flat.session.id, SessionId::new("flat"));
        assert_eq!(flat.session.title, "Flat one");
        assert_eq!(flat.messages.len(), 2);
        assert!(flat.messages.iter().all(|m| m.session_id == flat.session.id));
        let ai = flat.messages.iter().find(|m| m.id == MessageId::new("a1")).unwrap();
        assert_eq!(ai.previous_message_id(), Some(&MessageId::new("h1")));

        let wrapped = &fixture.conversations[1];
        assert_eq!(wrapped.session.title, "Summarize this");
        assert_eq!(wrapped.messages[0].content, "Summarize this\nand more");
    }

    #[test]
    fn test_empty_fixture() {
        let fixture = Fixture::parse("{}").unwrap();
        assert!(fixture.catalog.is_empty());
        assert!(fixture.conversations.is_empty());
    }

    #[test]
    fn test_invalid_fixture() {
        assert!(matches!(
            Fixture::parse(r#"{ "conversations": { "x": { "messages": [{ "id": 1 }] } } }"#),
            Err(FixtureError::Parse(_))
        ));
    }
}
