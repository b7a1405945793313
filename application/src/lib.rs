//! Application layer for chatpanel
//!
//! This crate contains the chat store, the chat view controller, port
//! definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod store;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ChatViewConfig, DEFAULT_GREETING};
pub use ports::{
    chat_api::{
        ChatApi, ChatApiError, ConversationSnapshot, DEFAULT_STREAM_CAPACITY, SendMessagePayload,
        StreamHandle,
    },
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    credentials::{CredentialError, CredentialProvider, NoCredentials, resolve_credentials},
    navigator::{Navigator, NoNavigation, RecordingNavigator},
    selection_store::{InMemorySelectionStore, NoSelectionStore, SelectionStore},
    ui_event::ViewEvent,
};
pub use store::{
    ApplyOutcome, ChatStore, DEFAULT_USER_NAME, SendReceipt, SendRequest, StoreError,
};
pub use use_cases::chat_view::{ChatView, Submitted, ViewError, ViewSnapshot};
