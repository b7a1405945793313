//! Credential adapters

mod env;

pub use env::EnvCredentialProvider;
