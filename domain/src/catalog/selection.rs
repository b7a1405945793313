//! The user's current model choice.

use super::entities::{CUSTOM_AGENT_PROVIDER, CatalogEntry};
use crate::message::entities::Attribution;
use serde::{Deserialize, Serialize};

/// A selected provider model, agent or workflow (Value Object)
///
/// Persisted as the "last used" selection and attached to every send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub provider: String,
    /// Display name of the selected entry.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

impl ModelSelection {
    pub fn requires_credentials(&self) -> bool {
        self.provider != CUSTOM_AGENT_PROVIDER
    }

    /// Whether this selection refers to `entry`.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.provider == entry.provider
            && self.agent_id == entry.agent_id
            && self.workflow_id == entry.workflow_id
            && self.name == entry.name
    }

    /// Attribution recorded on messages sent with this selection.
    pub fn attribution(&self) -> Attribution {
        Attribution {
            provider: Some(self.provider.clone()),
            model: Some(self.name.clone()),
            agent_id: self.agent_id.clone(),
            workflow_id: self.workflow_id.clone(),
        }
    }
}

impl From<&CatalogEntry> for ModelSelection {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            provider: entry.provider.clone(),
            name: entry.name.clone(),
            agent_id: entry.agent_id.clone(),
            workflow_id: entry.workflow_id.clone(),
        }
    }
}

impl std::fmt::Display for ModelSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_entry_matches_it() {
        let entry = CatalogEntry::agent(CUSTOM_AGENT_PROVIDER, "agent-1", "Helper");
        let selection = ModelSelection::from(&entry);
        assert!(selection.matches(&entry));
        assert!(!selection.requires_credentials());
        assert!(!selection.matches(&CatalogEntry::model("openai", "Helper")));
    }

    #[test]
    fn test_attribution_copies_ids() {
        let entry = CatalogEntry::workflow("acme", "wf-1", "Summarize");
        let attribution = ModelSelection::from(&entry).attribution();
        assert_eq!(attribution.provider.as_deref(), Some("acme"));
        assert_eq!(attribution.model.as_deref(), Some("Summarize"));
        assert_eq!(attribution.workflow_id.as_deref(), Some("wf-1"));
        assert_eq!(attribution.agent_id, None);
    }

    #[test]
    fn test_display() {
        let selection = ModelSelection::from(&CatalogEntry::model("openai", "gpt-4o"));
        assert_eq!(selection.to_string(), "gpt-4o (openai)");
    }
}
