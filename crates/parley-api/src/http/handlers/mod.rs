//! HTTP request handlers.

pub mod chat;
pub mod meta;
pub mod session;
pub mod ws;
