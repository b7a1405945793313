//! Chat session domain.
//!
//! - [`entities::Session`]: a conversation thread and its metadata
//! - [`stream::StreamUpdate`]: begin/item/end updates for a message under construction
//! - [`stream::ChatStreamEvent`]: the typed event carried by an exchange's stream channel

pub mod entities;
pub mod stream;
