//! Offline backend configuration from TOML (`[backend]` section)

use serde::{Deserialize, Serialize};

/// Default reply template of the offline backend.
pub const DEFAULT_REPLY_TEMPLATE: &str = "{model} received: {prompt}";

/// Raw offline backend configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    /// JSON fixture with the catalog and stored conversations
    pub fixture: Option<String>,
    /// Delay between streamed fragments, in milliseconds
    pub chunk_delay_ms: u64,
    /// Characters per streamed fragment
    pub chunk_size: usize,
    /// Reply text; `{prompt}` and `{model}` are substituted
    pub reply_template: String,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            fixture: None,
            chunk_delay_ms: 40,
            chunk_size: 12,
            reply_template: DEFAULT_REPLY_TEMPLATE.to_string(),
        }
    }
}
