//! Configuration file loading for chatpanel
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CHATPANEL_`-prefixed environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./chatpanel.toml` or `./.chatpanel.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/chatpanel/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, DEFAULT_REPLY_TEMPLATE, FileBackendConfig, FileChatConfig, FileConfig,
    FileLoggingConfig, FileStorageConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
