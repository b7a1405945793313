//! Credentials port
//!
//! Supplies the credentials map attached to a send. Storage of the secrets
//! is up to the implementation.

use chatpanel_domain::ModelSelection;
use std::collections::HashMap;
use thiserror::Error;

/// Errors returned when credentials cannot be produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No credentials configured for provider '{0}'")]
    Missing(String),

    #[error("Credential lookup failed: {0}")]
    Unavailable(String),
}

/// Provider of per-selection credentials.
pub trait CredentialProvider: Send + Sync {
    /// Credentials for `selection`. Only called when the selection requires them.
    fn credentials_for(
        &self,
        selection: &ModelSelection,
    ) -> Result<HashMap<String, String>, CredentialError>;
}

/// Always returns an empty map.
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn credentials_for(
        &self,
        _selection: &ModelSelection,
    ) -> Result<HashMap<String, String>, CredentialError> {
        Ok(HashMap::new())
    }
}

/// Resolve the credentials map for a send.
///
/// Selections that need no credentials (custom agents) get an empty map
/// without consulting the provider.
pub fn resolve_credentials(
    provider: &dyn CredentialProvider,
    selection: &ModelSelection,
) -> Result<HashMap<String, String>, CredentialError> {
    if !selection.requires_credentials() {
        return Ok(HashMap::new());
    }
    provider.credentials_for(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpanel_domain::{CUSTOM_AGENT_PROVIDER, CatalogEntry};

    struct FailingProvider;

    impl CredentialProvider for FailingProvider {
        fn credentials_for(
            &self,
            selection: &ModelSelection,
        ) -> Result<HashMap<String, String>, CredentialError> {
            Err(CredentialError::Missing(selection.provider.clone()))
        }
    }

    #[test]
    fn custom_agents_skip_the_provider() {
        let selection = ModelSelection::from(&CatalogEntry::agent(
            CUSTOM_AGENT_PROVIDER,
            "agent-1",
            "Helper",
        ));
        let creds = resolve_credentials(&FailingProvider, &selection).unwrap();
        assert!(creds.is_empty());
    }

    #[test]
    fn other_providers_are_consulted() {
        let selection = ModelSelection::from(&CatalogEntry::model("openai", "gpt-4o"));
        let err = resolve_credentials(&FailingProvider, &selection).unwrap_err();
        assert_eq!(err, CredentialError::Missing("openai".to_string()));
    }
}
