//! Credentials from environment variables.
//!
//! The key for provider `openai` is read from `CHATPANEL_OPENAI_API_KEY`;
//! characters other than ASCII letters and digits become `_`.

use chatpanel_application::{CredentialError, CredentialProvider};
use chatpanel_domain::ModelSelection;
use std::collections::HashMap;
use tracing::debug;

/// Key of the API key in the credentials map.
pub const API_KEY_FIELD: &str = "apiKey";

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// [`CredentialProvider`] reading `CHATPANEL_<PROVIDER>_API_KEY`.
pub struct EnvCredentialProvider {
    lookup: Lookup,
    required: bool,
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Read variables through `lookup` instead of the process environment.
    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
            required: false,
        }
    }

    /// Fail with [`CredentialError::Missing`] when no key is set.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Environment variable holding the key for `provider`.
    pub fn variable_for(provider: &str) -> String {
        let provider: String = provider
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("CHATPANEL_{}_API_KEY", provider)
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn credentials_for(
        &self,
        selection: &ModelSelection,
    ) -> Result<HashMap<String, String>, CredentialError> {
        let variable = Self::variable_for(&selection.provider);
        match (self.lookup)(&variable).filter(|key| !key.trim().is_empty()) {
            Some(key) => Ok(HashMap::from([(API_KEY_FIELD.to_string(), key)])),
            None if self.required => Err(CredentialError::Missing(selection.provider.clone())),
            None => {
                debug!("{} is not set; sending without credentials", variable);
                Ok(HashMap::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpanel_domain::CatalogEntry;

    fn selection(provider: &str) -> ModelSelection {
        ModelSelection::from(&CatalogEntry::model(provider, "m"))
    }

    #[test]
    fn test_variable_names() {
        assert_eq!(
            EnvCredentialProvider::variable_for("openai"),
            "CHATPANEL_OPENAI_API_KEY"
        );
        assert_eq!(
            EnvCredentialProvider::variable_for("azure-openai"),
            "CHATPANEL_AZURE_OPENAI_API_KEY"
        );
    }

    #[test]
    fn test_key_is_read_through_lookup() {
        let provider = EnvCredentialProvider::with_lookup(|name| {
            (name == "CHATPANEL_OPENAI_API_KEY").then(|| "sk-1".to_string())
        });
        let creds = provider.credentials_for(&selection("openai")).unwrap();
        assert_eq!(creds.get(API_KEY_FIELD).map(String::as_str), Some("sk-1"));
    }

    #[test]
    fn test_missing_key() {
        let lenient = EnvCredentialProvider::with_lookup(|_| None);
        assert!(lenient.credentials_for(&selection("openai")).unwrap().is_empty());

        let strict = EnvCredentialProvider::with_lookup(|_| Some("  ".to_string())).required();
        assert_eq!(
            strict.credentials_for(&selection("openai")).unwrap_err(),
            CredentialError::Missing("openai".to_string())
        );
    }
}
