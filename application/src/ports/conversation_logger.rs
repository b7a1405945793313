//! Port for structured chat transcript logging.
//!
//! Defines the [`ConversationLogger`] trait for recording chat events
//! (sends, stream begin/end, failures, retries) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing carries
//! diagnostics, while this port captures the transcript of each exchange in a
//! machine-readable form (JSONL in the infrastructure adapter).

use serde_json::Value;

/// Event type names written by the chat store.
pub mod event_types {
    pub const MESSAGE_SENT: &str = "message_sent";
    pub const SEND_REJECTED: &str = "send_rejected";
    pub const STREAM_BEGIN: &str = "stream_begin";
    pub const STREAM_END: &str = "stream_end";
    pub const EXCHANGE_DONE: &str = "exchange_done";
    pub const EXCHANGE_ERROR: &str = "exchange_error";
    pub const GENERATION_STOPPED: &str = "generation_stopped";
}

/// A structured chat event for logging.
pub struct ConversationEvent {
    /// Event type identifier (one of [`event_types`]).
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging chat events to a structured log.
///
/// `log` is synchronous and non-fallible so that a broken log never disturbs
/// a running exchange; implementations swallow their own write errors.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
