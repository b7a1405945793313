//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod chat_api;
pub mod conversation_logger;
pub mod credentials;
pub mod navigator;
pub mod selection_store;
pub mod ui_event;
