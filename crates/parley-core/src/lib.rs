//! Conversation relay logic and port definitions for Parley.
//!
//! This crate defines the ports the infrastructure layer implements (the
//! conversation store and the model gateway), the orchestrator that turns an
//! inbound message into a model call, and the transport-agnostic driver that
//! speaks the frame protocol over any duplex channel. It depends only on
//! `parley-types` -- never on `parley-infra` or any database/IO crate.

pub mod gateway;
pub mod relay;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
