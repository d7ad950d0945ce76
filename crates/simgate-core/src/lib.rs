//! Simgate Core - Shared types for SimSig interface gateway supervision
//!
//! This crate provides the domain types shared between the supervisor
//! (simgate) and the gateway payload layer (simgate-protocol's consumers).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod link;
pub mod sim;

// Re-exports for convenience
pub use error::ConfigError;
pub use link::{EndpointView, LinkState};
pub use sim::{GatewayConfig, GatewayEndpoint, SimConfig, SimId};
