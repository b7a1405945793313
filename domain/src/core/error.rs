//! Domain error types

use crate::core::id::{MessageId, SessionId};
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Message content cannot be empty")]
    EmptyMessage,

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("AI message {ai} must follow a human message, but {previous} is not one")]
    PreviousNotHuman { ai: MessageId, previous: MessageId },

    #[error("Message {message} belongs to session {actual}, not {expected}")]
    SessionMismatch {
        message: MessageId,
        expected: SessionId,
        actual: SessionId,
    },

    #[error("Session {0} is already active")]
    AlreadyActive(SessionId),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),
}

impl DomainError {
    /// Check if this error is a lineage violation (broken message pointers)
    pub fn is_lineage_violation(&self) -> bool {
        matches!(
            self,
            DomainError::MessageNotFound(_) | DomainError::PreviousNotHuman { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_display() {
        assert_eq!(
            DomainError::EmptyMessage.to_string(),
            "Message content cannot be empty"
        );
    }

    #[test]
    fn test_lineage_violation_check() {
        let previous = DomainError::PreviousNotHuman {
            ai: MessageId::new("ai-1"),
            previous: MessageId::new("ai-0"),
        };
        assert!(previous.is_lineage_violation());
        assert!(DomainError::MessageNotFound(MessageId::new("x")).is_lineage_violation());
        assert!(!DomainError::EmptyMessage.is_lineage_violation());
        assert!(!DomainError::AlreadyActive(SessionId::new("s")).is_lineage_violation());
    }
}
