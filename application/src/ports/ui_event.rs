//! View events emitted by ChatView for presentation layer rendering
//!
//! These events form the output port from the application layer to the
//! presentation layer. The REPL receives them over an unbounded channel and
//! renders them; the view itself never prints.

use chatpanel_domain::{
    ChatRoute, Message, MessageId, ModelSelection, SessionId, ViewState, ViewTransition,
};

/// Events emitted by ChatView for the presentation layer to render
#[derive(Debug, Clone)]
pub enum ViewEvent {
    // === Mount ===
    /// The view finished mounting on a route
    Mounted {
        state: ViewState,
        selection: Option<ModelSelection>,
    },
    /// The agent catalog was loaded
    CatalogLoaded { entries: usize },
    /// The agent catalog could not be loaded; the selector stays empty
    CatalogUnavailable { error: String },
    /// A session's history was loaded
    HistoryLoaded {
        session_id: SessionId,
        messages: usize,
    },
    /// A session's history could not be loaded; the view shows a new session
    HistoryLoadFailed { session_id: SessionId, error: String },

    // === Input ===
    /// The selected model changed
    SelectionChanged(ModelSelection),
    /// The prompt input was cleared by a submit
    InputCleared,

    // === Exchange ===
    /// A human message was added to the log
    MessageAdded(Message),
    /// The view moved from `New` to `Active`
    SessionActivated {
        transition: ViewTransition,
        route: ChatRoute,
    },
    /// An AI message started streaming
    StreamStarted {
        session_id: SessionId,
        message_id: MessageId,
    },
    /// A fragment was appended to an AI message
    StreamFragment {
        session_id: SessionId,
        message_id: MessageId,
        fragment: String,
    },
    /// An AI message finished streaming
    StreamFinished {
        session_id: SessionId,
        message_id: MessageId,
    },
    /// The exchange completed
    ExchangeDone { session_id: SessionId },
    /// The exchange failed after it started
    ExchangeFailed {
        session_id: SessionId,
        message_id: Option<MessageId>,
        error: String,
    },
    /// The send was refused before any reply started
    SendFailed { error: String },
    /// Stop was requested for a streaming reply
    GenerationStopped { session_id: SessionId },
}

impl ViewEvent {
    /// Session the event concerns, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            ViewEvent::HistoryLoaded { session_id, .. }
            | ViewEvent::HistoryLoadFailed { session_id, .. }
            | ViewEvent::StreamStarted { session_id, .. }
            | ViewEvent::StreamFragment { session_id, .. }
            | ViewEvent::StreamFinished { session_id, .. }
            | ViewEvent::ExchangeDone { session_id }
            | ViewEvent::ExchangeFailed { session_id, .. }
            | ViewEvent::GenerationStopped { session_id } => Some(session_id),
            ViewEvent::MessageAdded(message) => Some(&message.session_id),
            ViewEvent::Mounted { state, .. } => state.session_id(),
            ViewEvent::SessionActivated { route, .. } => route.session_id.as_ref(),
            _ => None,
        }
    }
}
