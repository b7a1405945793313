//! JSON file holding the last used model selection.

use chatpanel_application::SelectionStore;
use chatpanel_domain::ModelSelection;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// [`SelectionStore`] backed by a small JSON file.
///
/// A missing or unreadable file reads as "no selection"; write failures
/// are logged and otherwise ignored.
pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, selection: &ModelSelection) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(selection)?;
        std::fs::write(&self.path, json)
    }
}

impl SelectionStore for FileSelectionStore {
    fn load_last_selection(&self) -> Option<ModelSelection> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                debug!("No saved selection at {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(selection) => Some(selection),
            Err(e) => {
                warn!("Ignoring corrupt selection file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save_last_selection(&self, selection: &ModelSelection) {
        match self.write(selection) {
            Ok(()) => debug!("Saved selection {} to {}", selection, self.path.display()),
            Err(e) => warn!(
                "Could not save selection to {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
