//! Per-session message collection.
//!
//! [`MessageLog`] gives keyed access by [`MessageId`] while keeping the
//! insertion order, which is the display order of the conversation.

use super::entities::Message;
use crate::core::error::DomainError;
use crate::core::id::{MessageId, SessionId};
use std::collections::HashMap;

/// Messages of one session, keyed by id, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    index: HashMap<MessageId, usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from an unordered batch, ordering by creation time.
    ///
    /// Messages with equal timestamps keep their relative input order.
    pub fn from_unordered(messages: impl IntoIterator<Item = Message>) -> Self {
        let mut messages: Vec<Message> = messages.into_iter().collect();
        messages.sort_by_key(|m| m.created_at);
        let mut log = Self::new();
        for message in messages {
            log.upsert(message);
        }
        log
    }

    /// Insert a message, or replace the one with the same id in place.
    pub fn upsert(&mut self, message: Message) {
        match self.index.get(&message.id) {
            Some(&pos) => self.messages[pos] = message,
            None => {
                self.index.insert(message.id.clone(), self.messages.len());
                self.messages.push(message);
            }
        }
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.index.get(id).map(|&pos| &self.messages[pos])
    }

    pub fn get_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.index.get(id).map(|&pos| &mut self.messages[pos])
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Give the message `from` the id `to`, keeping its position.
    ///
    /// Lineage pointers of the other messages follow the new id. Returns
    /// `false` (and changes nothing) when `from` is missing or `to` is
    /// already taken.
    pub fn rekey(&mut self, from: &MessageId, to: MessageId) -> bool {
        if self.index.contains_key(&to) {
            return false;
        }
        let Some(pos) = self.index.remove(from) else {
            return false;
        };
        self.messages[pos].id = to.clone();
        self.index.insert(to.clone(), pos);

        let follow = |slot: &mut Option<MessageId>| {
            if slot.as_ref() == Some(from) {
                *slot = Some(to.clone());
            }
        };
        for message in &mut self.messages {
            let lineage = &mut message.lineage;
            follow(&mut lineage.previous_message_id);
            follow(&mut lineage.retry_of);
            follow(&mut lineage.revision_of);
            for alternative in &mut lineage.alternative_ids {
                if alternative == from {
                    *alternative = to.clone();
                }
            }
        }
        true
    }

    /// AI messages currently receiving content.
    pub fn running(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_running())
    }

    /// Check that every AI message follows a human message of the same session.
    ///
    /// AI messages without a previous pointer (e.g. a greeting) are accepted;
    /// pointers to messages outside this log are not.
    pub fn validate_lineage(&self, session_id: &SessionId) -> Result<(), DomainError> {
        for message in &self.messages {
            if &message.session_id != session_id {
                return Err(DomainError::SessionMismatch {
                    message: message.id.clone(),
                    expected: session_id.clone(),
                    actual: message.session_id.clone(),
                });
            }
            if !message.is_ai() {
                continue;
            }
            let Some(previous_id) = message.previous_message_id() else {
                continue;
            };
            let previous = self
                .get(previous_id)
                .ok_or_else(|| DomainError::MessageNotFound(previous_id.clone()))?;
            if !previous.is_human() {
                return Err(DomainError::PreviousNotHuman {
                    ai: message.id.clone(),
                    previous: previous_id.clone(),
                });
            }
        }
        Ok(())
    }
}
