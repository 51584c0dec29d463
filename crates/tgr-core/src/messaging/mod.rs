//! Messenger abstractions: the relay talks to the target chat only through these.

pub mod port;
pub mod throttled;
pub mod types;
