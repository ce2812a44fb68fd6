//! Conversation relay: the orchestrator and the connection driver.
//!
//! - `Orchestrator`: one turn end to end (persist, build context, call model)
//! - `ConnectionDriver`: the frame protocol over any `DuplexChannel`

pub mod connection;
pub mod orchestrator;

pub use connection::{ChannelClosed, ConnectionDriver, DuplexChannel};
pub use orchestrator::{Orchestrator, TurnStream, fallback_reply};
