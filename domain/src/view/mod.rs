//! Chat view domain: route parameters and the New/Active state machine.

pub mod route;
pub mod state;
