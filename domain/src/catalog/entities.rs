//! Agent/model catalog entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provider whose agents run without user-supplied credentials.
pub const CUSTOM_AGENT_PROVIDER: &str = "custom-agent";

/// What a catalog entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A plain provider model.
    Model,
    /// An agent (has an agent id).
    Agent,
    /// A workflow (has a workflow id).
    Workflow,
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "model" => Ok(EntryKind::Model),
            "agent" => Ok(EntryKind::Agent),
            "workflow" => Ok(EntryKind::Workflow),
            _ => Err(format!("Invalid EntryKind: {}", s)),
        }
    }
}

/// One selectable provider model, agent or workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Filled from the catalog key when omitted on the wire.
    #[serde(default)]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    pub fn model(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            agent_id: None,
            workflow_id: None,
            name: name.into(),
            description: String::new(),
            updated_at: None,
        }
    }

    pub fn agent(
        provider: impl Into<String>,
        agent_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::model(provider, name)
        }
    }

    pub fn workflow(
        provider: impl Into<String>,
        workflow_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: Some(workflow_id.into()),
            ..Self::model(provider, name)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn kind(&self) -> EntryKind {
        if self.agent_id.is_some() {
            EntryKind::Agent
        } else if self.workflow_id.is_some() {
            EntryKind::Workflow
        } else {
            EntryKind::Model
        }
    }

    /// Whether selecting this entry needs credentials for its provider.
    pub fn requires_credentials(&self) -> bool {
        self.provider != CUSTOM_AGENT_PROVIDER
    }
}

/// Criteria applied to a fetched catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    #[serde(default)]
    pub kind: Option<EntryKind>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl CatalogFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn kind(kind: EntryKind) -> Self {
        Self {
            kind: Some(kind),
            provider: None,
        }
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.kind.is_none_or(|k| entry.kind() == k)
            && self.provider.as_ref().is_none_or(|p| &entry.provider == p)
    }
}

/// The available providers and their entries (provider → entries).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<CatalogEntry>>", into = "BTreeMap<String, Vec<CatalogEntry>>")]
pub struct ModelCatalog {
    providers: BTreeMap<String, Vec<CatalogEntry>>,
}

impl From<BTreeMap<String, Vec<CatalogEntry>>> for ModelCatalog {
    fn from(providers: BTreeMap<String, Vec<CatalogEntry>>) -> Self {
        let mut catalog = Self::default();
        for (provider, entries) in providers {
            for mut entry in entries {
                if entry.provider.is_empty() {
                    entry.provider = provider.clone();
                }
                catalog.insert(entry);
            }
        }
        catalog
    }
}

impl From<ModelCatalog> for BTreeMap<String, Vec<CatalogEntry>> {
    fn from(catalog: ModelCatalog) -> Self {
        catalog.providers
    }
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry under its provider. An entry equal in provider, agent,
    /// workflow and name to an existing one replaces it.
    pub fn insert(&mut self, entry: CatalogEntry) {
        let entries = self.providers.entry(entry.provider.clone()).or_default();
        match entries.iter_mut().find(|e| {
            e.agent_id == entry.agent_id
                && e.workflow_id == entry.workflow_id
                && e.name == entry.name
        }) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    /// A copy containing only the entries that match `filter`.
    pub fn filtered(&self, filter: &CatalogFilter) -> Self {
        let mut catalog = Self::new();
        for entry in self.entries().filter(|e| filter.matches(e)) {
            catalog.insert(entry.clone());
        }
        catalog
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn entries_for(&self, provider: &str) -> &[CatalogEntry] {
        self.providers.get(provider).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All entries, grouped by provider in provider-name order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.providers.values().flatten()
    }

    pub fn find_agent(&self, agent_id: &str) -> Option<&CatalogEntry> {
        self.entries()
            .find(|e| e.agent_id.as_deref() == Some(agent_id))
    }

    pub fn find_workflow(&self, workflow_id: &str) -> Option<&CatalogEntry> {
        self.entries()
            .find(|e| e.workflow_id.as_deref() == Some(workflow_id))
    }

    pub fn len(&self) -> usize {
        self.providers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelCatalog {
        let mut catalog = ModelCatalog::new();
        catalog.insert(CatalogEntry::model("openai", "gpt-4o"));
        catalog.insert(CatalogEntry::agent(CUSTOM_AGENT_PROVIDER, "agent-1", "Helper"));
        catalog.insert(CatalogEntry::workflow(CUSTOM_AGENT_PROVIDER, "wf-1", "Summarize"));
        catalog
    }

    #[test]
    fn test_entry_kind() {
        let catalog = sample();
        assert_eq!(catalog.find_agent("agent-1").unwrap().kind(), EntryKind::Agent);
        assert_eq!(catalog.find_workflow("wf-1").unwrap().kind(), EntryKind::Workflow);
        assert_eq!(catalog.entries_for("openai")[0].kind(), EntryKind::Model);
    }

    #[test]
    fn test_custom_agent_bypasses_credentials() {
        let catalog = sample();
        assert!(!catalog.find_agent("agent-1").unwrap().requires_credentials());
        assert!(catalog.entries_for("openai")[0].requires_credentials());
    }

    #[test]
    fn test_insert_replaces_equal_entry() {
        let mut catalog = sample();
        catalog.insert(
            CatalogEntry::agent(CUSTOM_AGENT_PROVIDER, "agent-1", "Helper").with_description("v2"),
        );
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.find_agent("agent-1").unwrap().description, "v2");
    }

    #[test]
    fn test_filter_by_kind_and_provider() {
        let catalog = sample();
        let agents = catalog.filtered(&CatalogFilter::kind(EntryKind::Agent));
        assert_eq!(agents.len(), 1);

        let openai = catalog.filtered(&CatalogFilter {
            kind: None,
            provider: Some("openai".to_string()),
        });
        assert_eq!(openai.providers().collect::<Vec<_>>(), vec!["openai"]);
        assert_eq!(catalog.filtered(&CatalogFilter::all()), catalog);
    }

    #[test]
    fn test_deserialize_fills_provider_from_key() {
        let json = serde_json::json!({
            "custom-agent": [
                { "agent_id": "agent-1", "name": "Helper", "description": "Helps" }
            ],
            "openai": [
                { "name": "gpt-4o", "updated_at": "2024-05-01T10:00:00Z" }
            ]
        });
        let catalog: ModelCatalog = serde_json::from_value(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find_agent("agent-1").unwrap().provider, CUSTOM_AGENT_PROVIDER);
        assert!(catalog.entries_for("openai")[0].updated_at.is_some());
    }

    #[test]
    fn test_entry_kind_from_str() {
        assert_eq!("Agent".parse::<EntryKind>().unwrap(), EntryKind::Agent);
        assert!("bogus".parse::<EntryKind>().is_err());
    }
}
