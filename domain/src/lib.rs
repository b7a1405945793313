//! Domain layer for chatpanel
//!
//! This crate contains the entities and value objects of a chat panel.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Sessions and messages
//!
//! - **Session**: a conversation thread with an id and metadata
//! - **Message**: one human or AI turn with a lifecycle status and lineage
//!   pointers (previous / retry-of / revision-of / alternatives)
//!
//! ## Streaming
//!
//! AI replies arrive as `begin` → `item`* → `end` updates addressed to a
//! message id, followed by an exchange-level `Done` or `Error`.
//!
//! ## View state
//!
//! The chat view is either **New** (no session in the route) or **Active**
//! (a session is open). `New → Active` happens once, on the first send.

pub mod catalog;
pub mod core;
pub mod message;
pub mod session;
pub mod view;

// Re-export commonly used types
pub use catalog::{
    entities::{CUSTOM_AGENT_PROVIDER, CatalogEntry, CatalogFilter, EntryKind, ModelCatalog},
    selection::ModelSelection,
};
pub use core::{
    error::DomainError,
    id::{MessageId, SessionId},
};
pub use message::{
    entities::{Attribution, Lineage, Message, MessageStatus, MessageType},
    log::MessageLog,
};
pub use session::{
    entities::Session,
    stream::{ChatStreamEvent, StreamUpdate, UpdateKind, UpdateMetadata},
};
pub use view::{
    route::ChatRoute,
    state::{ViewState, ViewTransition},
};
