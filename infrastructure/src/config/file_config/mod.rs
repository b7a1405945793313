//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to application types on use.

mod backend;
mod chat;
mod logging;
mod storage;

pub use backend::{DEFAULT_REPLY_TEMPLATE, FileBackendConfig};
pub use chat::FileChatConfig;
pub use logging::FileLoggingConfig;
pub use storage::FileStorageConfig;

use chatpanel_application::ChatViewConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("backend.chunk_size cannot be 0")]
    InvalidChunkSize,

    #[error("chat.catalog_kind: unknown value '{0}' (expected model, agent or workflow)")]
    InvalidCatalogKind(String),

    #[error("chat.user_name cannot be empty")]
    EmptyUserName,

    #[error("backend.reply_template must contain {{prompt}}")]
    TemplateWithoutPrompt,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Offline backend settings
    pub backend: FileBackendConfig,
    /// Chat panel settings
    pub chat: FileChatConfig,
    /// Local storage paths
    pub storage: FileStorageConfig,
    /// Transcript logging
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.backend.chunk_size == 0 {
            issues.push(ConfigValidationError::InvalidChunkSize);
        }
        if !self.backend.reply_template.contains("{prompt}") {
            issues.push(ConfigValidationError::TemplateWithoutPrompt);
        }
        if let Err(e) = self.chat.catalog_filter() {
            issues.push(e);
        }
        if self.chat.user_name.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyUserName);
        }

        issues
    }

    /// Chat view settings for the application layer.
    pub fn view_config(&self) -> Result<ChatViewConfig, ConfigValidationError> {
        Ok(ChatViewConfig::default()
            .with_greeting(self.chat.greeting.clone())
            .with_catalog_filter(self.chat.catalog_filter()?))
    }
}
