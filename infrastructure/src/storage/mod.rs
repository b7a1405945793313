//! Local persistence adapters

mod selection_file;

pub use selection_file::FileSelectionStore;
