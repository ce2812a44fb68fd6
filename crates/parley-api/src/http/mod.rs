//! HTTP and WebSocket layer for Parley.
//!
//! Single-shot chat, session export, config and health under `/api/`, the
//! WebSocket relay at `/ws`, and optional static frontend serving.

pub mod error;
pub mod handlers;
pub mod router;
