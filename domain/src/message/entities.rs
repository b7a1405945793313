//! Message domain entities

use crate::core::id::{MessageId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author display name used for AI messages without attribution.
pub const DEFAULT_AI_AUTHOR: &str = "AI";

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Human,
    Ai,
}

/// Lifecycle status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Content is still streaming in.
    Running,
    #[default]
    Success,
    Error,
}

impl MessageStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, MessageStatus::Running)
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageStatus::Running => "running",
            MessageStatus::Success => "success",
            MessageStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Which provider/model/agent/workflow produced (or was asked for) a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

/// Lineage pointers between messages of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    /// The message this one follows. For AI messages: the prompting human message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_message_id: Option<MessageId>,
    /// The failed (or unwanted) AI message this one retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<MessageId>,
    /// The human message this one is an edited revision of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_of: Option<MessageId>,
    /// Messages produced as alternatives (retries, revisions) of this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_ids: Vec<MessageId>,
}

/// A single turn within a session (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: MessageStatus,
    pub author: String,
    #[serde(flatten)]
    pub attribution: Attribution,
    #[serde(flatten)]
    pub lineage: Lineage,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A human message as submitted by the user. Its status is final.
    pub fn human(
        id: MessageId,
        session_id: SessionId,
        content: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id,
            session_id,
            message_type: MessageType::Human,
            content: content.into(),
            status: MessageStatus::Success,
            author: author.into(),
            attribution: Attribution::default(),
            lineage: Lineage::default(),
            created_at: Utc::now(),
        }
    }

    /// An empty AI message that content will stream into.
    pub fn ai_placeholder(
        id: MessageId,
        session_id: SessionId,
        previous_message_id: Option<MessageId>,
    ) -> Self {
        Self {
            id,
            session_id,
            message_type: MessageType::Ai,
            content: String::new(),
            status: MessageStatus::Running,
            author: DEFAULT_AI_AUTHOR.to_string(),
            attribution: Attribution::default(),
            lineage: Lineage {
                previous_message_id,
                ..Lineage::default()
            },
            created_at: Utc::now(),
        }
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_previous(mut self, previous: Option<MessageId>) -> Self {
        self.lineage.previous_message_id = previous;
        self
    }

    pub fn is_human(&self) -> bool {
        self.message_type == MessageType::Human
    }

    pub fn is_ai(&self) -> bool {
        self.message_type == MessageType::Ai
    }

    pub fn is_running(&self) -> bool {
        self.status == MessageStatus::Running
    }

    pub fn previous_message_id(&self) -> Option<&MessageId> {
        self.lineage.previous_message_id.as_ref()
    }

    /// Append a streamed fragment.
    pub fn append(&mut self, fragment: &str) {
        self.content.push_str(fragment);
    }

    pub fn mark_success(&mut self) {
        self.status = MessageStatus::Success;
    }

    pub fn mark_error(&mut self) {
        self.status = MessageStatus::Error;
    }

    /// Record `alternative` as an alternative of this message (no duplicates).
    pub fn add_alternative(&mut self, alternative: MessageId) {
        if !self.lineage.alternative_ids.contains(&alternative) {
            self.lineage.alternative_ids.push(alternative);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_message_is_final() {
        let msg = Message::human(
            MessageId::new("h1"),
            SessionId::new("s1"),
            "hello",
            "User",
        );
        assert!(msg.is_human());
        assert_eq!(msg.status, MessageStatus::Success);
        assert!(msg.status.is_finished());
    }

    #[test]
    fn ai_placeholder_starts_running_and_empty() {
        let msg = Message::ai_placeholder(
            MessageId::new("a1"),
            SessionId::new("s1"),
            Some(MessageId::new("h1")),
        );
        assert!(msg.is_ai());
        assert!(msg.is_running());
        assert!(msg.content.is_empty());
        assert_eq!(msg.previous_message_id().unwrap().as_str(), "h1");
        assert_eq!(msg.author, DEFAULT_AI_AUTHOR);
    }

    #[test]
    fn add_alternative_ignores_duplicates() {
        let mut msg = Message::ai_placeholder(MessageId::new("a1"), SessionId::new("s1"), None);
        msg.add_alternative(MessageId::new("a2"));
        msg.add_alternative(MessageId::new("a2"));
        assert_eq!(msg.lineage.alternative_ids, vec![MessageId::new("a2")]);
    }

    #[test]
    fn wire_format_flattens_lineage_and_attribution() {
        let json = serde_json::json!({
            "id": "a1",
            "session_id": "s1",
            "type": "ai",
            "content": "hi",
            "status": "error",
            "author": "Echo",
            "provider": "custom-agent",
            "agent_id": "echo",
            "previous_message_id": "h1",
            "retry_of": "a0",
            "alternative_ids": ["a2"],
            "created_at": "2024-05-01T10:00:00Z"
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert_eq!(msg.status, MessageStatus::Error);
        assert_eq!(msg.attribution.agent_id.as_deref(), Some("echo"));
        assert_eq!(msg.lineage.retry_of, Some(MessageId::new("a0")));
        assert_eq!(msg.lineage.alternative_ids.len(), 1);
        assert_eq!(msg.lineage.revision_of, None);
    }
}
