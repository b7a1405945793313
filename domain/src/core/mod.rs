//! Core domain concepts shared across all subdomains.
//!
//! - [`id::SessionId`] / [`id::MessageId`]: opaque identifiers
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod id;
