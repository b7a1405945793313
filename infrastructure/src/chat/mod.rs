//! Chat backend adapters
//!
//! Provides [`LocalChatApi`], an offline implementation of the
//! [`ChatApi`](chatpanel_application::ChatApi) port seeded from a JSON
//! [`Fixture`].

mod fixture;
mod local_api;

pub use fixture::{Fixture, FixtureError};
pub use local_api::{LOCAL_PROVIDER, LocalChatApi, LocalReplySettings, builtin_catalog};
