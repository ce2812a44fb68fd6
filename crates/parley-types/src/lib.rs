//! Shared domain types for Parley.
//!
//! Sessions, stored messages, chat turns, wire frames, configuration and the
//! error taxonomy shared by every layer of the relay.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod wire;
