//! Core of the Telegram chat relay.
//!
//! This crate is framework-agnostic. Telegram and HTTP live in adapter crates;
//! the messenger is reached only through [`messaging::port::MessengerPort`].

pub mod autoclick;
pub mod chat_log;
pub mod config;
pub mod domain;
pub mod downloads;
pub mod errors;
pub mod kill_switch;
pub mod logging;
pub mod messaging;
pub mod relay;

pub use errors::{Error, Result};
