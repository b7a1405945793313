//! Local storage configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Where the last used model selection is kept
    pub selection_file: Option<String>,
    /// REPL line history
    pub history_file: Option<String>,
}

impl FileStorageConfig {
    /// Selection file path; defaults to `$XDG_DATA_HOME/chatpanel/selection.json`.
    pub fn selection_path(&self) -> Option<PathBuf> {
        match &self.selection_file {
            Some(path) => Some(expand_home(path)),
            None => dirs::data_dir().map(|d| d.join("chatpanel").join("selection.json")),
        }
    }

    /// History file path; defaults to `$XDG_DATA_HOME/chatpanel/history.txt`.
    pub fn history_path(&self) -> Option<PathBuf> {
        match &self.history_file {
            Some(path) => Some(expand_home(path)),
            None => dirs::data_dir().map(|d| d.join("chatpanel").join("history.txt")),
        }
    }
}

/// Expand a leading `~/` to the home directory.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
