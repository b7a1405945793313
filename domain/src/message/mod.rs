//! Message domain.
//!
//! - [`entities::Message`]: one human or AI turn, with status and lineage
//! - [`log::MessageLog`]: keyed, insertion-ordered messages of one session

pub mod entities;
pub mod log;
