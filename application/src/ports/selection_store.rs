//! Port for the persisted "last used" model selection.
//!
//! Read when the view mounts without a query pre-selection, written when the
//! user picks a model. Like [`ConversationLogger`](super::conversation_logger::ConversationLogger),
//! the methods are synchronous and non-fallible: a store that cannot read
//! returns `None`, and write failures are logged by the implementation.

use chatpanel_domain::ModelSelection;
use std::sync::Mutex;

/// Key-value persistence of the last selected model.
pub trait SelectionStore: Send + Sync {
    fn load_last_selection(&self) -> Option<ModelSelection>;

    fn save_last_selection(&self, selection: &ModelSelection);
}

/// No-op implementation: nothing is remembered.
pub struct NoSelectionStore;

impl SelectionStore for NoSelectionStore {
    fn load_last_selection(&self) -> Option<ModelSelection> {
        None
    }

    fn save_last_selection(&self, _selection: &ModelSelection) {}
}

/// Process-local implementation, for tests and `--no-config` runs.
#[derive(Default)]
pub struct InMemorySelectionStore {
    selection: Mutex<Option<ModelSelection>>,
}

impl InMemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(selection: ModelSelection) -> Self {
        Self {
            selection: Mutex::new(Some(selection)),
        }
    }
}

impl SelectionStore for InMemorySelectionStore {
    fn load_last_selection(&self) -> Option<ModelSelection> {
        self.selection.lock().ok().and_then(|s| s.clone())
    }

    fn save_last_selection(&self, selection: &ModelSelection) {
        if let Ok(mut slot) = self.selection.lock() {
            *slot = Some(selection.clone());
        }
    }
}
