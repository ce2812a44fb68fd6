//! Infrastructure layer for Parley.
//!
//! Implementations of the ports defined in `parley-core`: the SQLite
//! conversation store and the remote model gateway, plus the gateway factory
//! and the configuration file loader.

pub mod config;
pub mod llm;
pub mod sqlite;
