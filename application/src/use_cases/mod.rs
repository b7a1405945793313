//! Use cases
//!
//! Application-level operations that orchestrate the chat store.

pub mod chat_view;
