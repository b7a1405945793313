//! Chat state container

pub mod chat_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat_store::{
    ApplyOutcome, ChatStore, DEFAULT_USER_NAME, SendReceipt, SendRequest, StoreError,
};
