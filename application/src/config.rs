//! Application-level configuration.
//!
//! Controls what the chat view shows and which catalog entries it offers.
//! Built by the binary from the file configuration.

use chatpanel_domain::CatalogFilter;

/// Greeting shown above the prompt of a new session.
pub const DEFAULT_GREETING: &str = "How can I help you today?";

/// Chat view behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatViewConfig {
    /// Text shown while no session is open.
    pub greeting: String,
    /// Entries of the catalog the model selector offers.
    pub catalog_filter: CatalogFilter,
}

impl Default for ChatViewConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            catalog_filter: CatalogFilter::all(),
        }
    }
}

impl ChatViewConfig {
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_catalog_filter(mut self, filter: CatalogFilter) -> Self {
        self.catalog_filter = filter;
        self
    }
}
