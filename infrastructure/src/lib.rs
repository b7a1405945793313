//! Infrastructure layer for chatpanel
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod chat;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use chat::{Fixture, FixtureError, LocalChatApi, LocalReplySettings, builtin_catalog};
pub use config::{
    ConfigLoader, ConfigValidationError, FileBackendConfig, FileChatConfig, FileConfig,
    FileLoggingConfig, FileStorageConfig,
};
pub use credentials::EnvCredentialProvider;
pub use logging::JsonlConversationLogger;
pub use storage::FileSelectionStore;
