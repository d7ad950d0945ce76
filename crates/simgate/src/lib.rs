//! Simgate - Connection supervision for SimSig interface gateways
//!
//! This crate provides the supervision layer between a hosting application
//! and the STOMP brokers embedded in SimSig simulations:
//! - `supervisor` - Actor owning one broker connection per sim
//! - `client` - Capability interface implemented by broker clients
//! - `sink` - Downstream consumer of decoded gateway traffic
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     simgate supervisor                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │ SupervisorHandle│────▶│     Supervisor actor        │    │
//! │  │   (cloneable)   │     │  (endpoint state owner)     │    │
//! │  └─────────────────┘     └──────────────┬──────────────┘    │
//! │                                         │                   │
//! │            client events                │ decoded traffic   │
//! │                ▲                        ▼                   │
//! │  ┌─────────────┴───┐     ┌─────────────────────────────┐    │
//! │  │   StompClient   │     │          GameSink           │    │
//! │  │  (one per sim)  │     │  (UI, time sync, movement)  │    │
//! │  └─────────────────┘     └─────────────────────────────┘    │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The supervisor never speaks STOMP itself: broker clients are built by a
//! [`client::StompClientFactory`] supplied by the host application, which
//! keeps the wire protocol and the transport pluggable.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod client;
pub mod sink;
pub mod supervisor;
