//! Agent/model catalog domain.
//!
//! - [`entities::ModelCatalog`]: provider → selectable entries
//! - [`entities::CatalogFilter`]: narrowing applied when the catalog is fetched
//! - [`selection::ModelSelection`]: the entry the user picked

pub mod entities;
pub mod selection;
