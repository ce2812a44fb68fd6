//! Model gateway abstractions for Parley.
//!
//! - `ModelGateway`: RPITIT trait for concrete gateway implementations
//! - `BoxModelGateway`: Object-safe wrapper for dynamic dispatch
//! - `PlaceholderGateway`: Offline variant used when no model is configured

pub mod box_gateway;
pub mod placeholder;
pub mod provider;

pub use box_gateway::BoxModelGateway;
pub use placeholder::PlaceholderGateway;
pub use provider::{ChunkStream, ModelGateway};
