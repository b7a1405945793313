//! Coarse state machine of the chat view.
//!
//! ```text
//! ┌─────┐  first successful send   ┌────────────────────┐
//! │ New │ ───────────────────────▶ │ Active{session_id} │
//! └─────┘      (activate)          └────────────────────┘
//! ```
//!
//! A view mounted on a route with a session id starts in `Active`.
//! `New → Active` happens at most once per mount; activating an already
//! active view is an error.

use crate::core::error::DomainError;
use crate::core::id::SessionId;

/// Whether the view shows a fresh prompt or an existing conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewState {
    /// No session yet: greeting + prompt input, no message log.
    #[default]
    New,
    /// A session is open: message log (live region) + prompt input.
    Active { session_id: SessionId },
}

/// A recorded `New → Active` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTransition {
    pub from: ViewState,
    pub to: ViewState,
}

impl ViewState {
    /// Initial state for a mount: `Active` if the route names a session.
    pub fn for_session(session_id: Option<SessionId>) -> Self {
        match session_id {
            Some(session_id) => ViewState::Active { session_id },
            None => ViewState::New,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ViewState::Active { .. })
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            ViewState::Active { session_id } => Some(session_id),
            ViewState::New => None,
        }
    }

    /// Move from `New` to `Active`.
    pub fn activate(&mut self, session_id: SessionId) -> Result<ViewTransition, DomainError> {
        if let ViewState::Active { session_id: current } = self {
            return Err(DomainError::AlreadyActive(current.clone()));
        }
        let to = ViewState::Active { session_id };
        let from = std::mem::replace(self, to.clone());
        Ok(ViewTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_session() {
        assert_eq!(ViewState::for_session(None), ViewState::New);
        let state = ViewState::for_session(Some(SessionId::new("s1")));
        assert!(state.is_active());
        assert_eq!(state.session_id().unwrap().as_str(), "s1");
    }

    #[test]
    fn test_activate_once() {
        let mut state = ViewState::New;
        let transition = state.activate(SessionId::new("s1")).unwrap();
        assert_eq!(transition.from, ViewState::New);
        assert_eq!(
            transition.to,
            ViewState::Active {
                session_id: SessionId::new("s1")
            }
        );
        assert!(state.is_active());

        let err = state.activate(SessionId::new("s2")).unwrap_err();
        assert_eq!(err, DomainError::AlreadyActive(SessionId::new("s1")));
        assert_eq!(state.session_id().unwrap().as_str(), "s1");
    }
}
