//! Streaming events for a chat exchange.
//!
//! A backend streams an AI reply as a sequence of [`StreamUpdate`]s addressed
//! to one message id:
//!
//! ```text
//! Begin (empty) → Item(c1) → Item(c2) → … → Item(cN) → End
//! ```
//!
//! The channel carrying them uses [`ChatStreamEvent`], which adds the two
//! exchange-level terminals `Done` and `Error`.

use crate::core::id::{MessageId, SessionId};
use serde::{Deserialize, Serialize};

/// Kind of a streaming update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// The message was created with empty content.
    Begin,
    /// A content fragment to append.
    Item,
    /// The stream for this message is closed.
    End,
}

/// Addressing data attached to every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMetadata {
    pub message_id: MessageId,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_message_id: Option<MessageId>,
}

/// A single streaming update for a message under construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUpdate {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    #[serde(default)]
    pub content: String,
    pub metadata: UpdateMetadata,
}

impl StreamUpdate {
    pub fn begin(metadata: UpdateMetadata) -> Self {
        Self {
            kind: UpdateKind::Begin,
            content: String::new(),
            metadata,
        }
    }

    pub fn item(metadata: UpdateMetadata, content: impl Into<String>) -> Self {
        Self {
            kind: UpdateKind::Item,
            content: content.into(),
            metadata,
        }
    }

    pub fn end(metadata: UpdateMetadata) -> Self {
        Self {
            kind: UpdateKind::End,
            content: String::new(),
            metadata,
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.metadata.message_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.metadata.session_id
    }
}

/// An event on the stream channel of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// A message-level update (begin/item/end).
    Update(StreamUpdate),
    /// The exchange is complete; no further updates follow.
    Done { session_id: SessionId },
    /// The exchange failed mid-stream.
    Error {
        session_id: SessionId,
        message: String,
    },
}

impl ChatStreamEvent {
    /// Session this event is addressed to.
    pub fn session_id(&self) -> &SessionId {
        match self {
            ChatStreamEvent::Update(update) => update.session_id(),
            ChatStreamEvent::Done { session_id } | ChatStreamEvent::Error { session_id, .. } => {
                session_id
            }
        }
    }

    /// Returns the appended fragment if this is an `Item` update.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            ChatStreamEvent::Update(StreamUpdate {
                kind: UpdateKind::Item,
                content,
                ..
            }) => Some(content),
            _ => None,
        }
    }

    /// Returns true if this event ends the exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChatStreamEvent::Done { .. } | ChatStreamEvent::Error { .. }
        )
    }
}
