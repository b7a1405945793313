//! Chat panel configuration from TOML (`[chat]` section)

use super::ConfigValidationError;
use chatpanel_application::{DEFAULT_GREETING, DEFAULT_USER_NAME};
use chatpanel_domain::{CatalogFilter, EntryKind};
use serde::{Deserialize, Serialize};

/// Raw chat configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatConfig {
    /// Greeting shown while no session is open
    pub greeting: String,
    /// Author name recorded on your messages
    pub user_name: String,
    /// Only offer catalog entries of this kind ("model", "agent", "workflow")
    pub catalog_kind: Option<String>,
    /// Only offer catalog entries of this provider
    pub catalog_provider: Option<String>,
}

impl Default for FileChatConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            user_name: DEFAULT_USER_NAME.to_string(),
            catalog_kind: None,
            catalog_provider: None,
        }
    }
}

impl FileChatConfig {
    /// Build the catalog filter from `catalog_kind` and `catalog_provider`.
    pub fn catalog_filter(&self) -> Result<CatalogFilter, ConfigValidationError> {
        let kind = match &self.catalog_kind {
            Some(kind) => Some(
                kind.parse::<EntryKind>()
                    .map_err(|_| ConfigValidationError::InvalidCatalogKind(kind.clone()))?,
            ),
            None => None,
        };
        Ok(CatalogFilter {
            kind,
            provider: self.catalog_provider.clone(),
        })
    }
}
