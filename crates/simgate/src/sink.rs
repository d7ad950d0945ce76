//! Downstream consumers of gateway traffic.
//!
//! The supervisor pushes decoded broker traffic and visible state changes
//! into a [`GameSink`]. The sink is the seam between connection supervision
//! and whatever consumes the data: an admin UI, a time-sync service, a
//! recording harness in tests.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

// ============================================================================
// Sink Trait
// ============================================================================

/// Receives gateway traffic and connection-state notifications.
///
/// Notifications carry no sim tag. Sinks that need per-sim attribution can
/// be registered per supervisor, or recover it from the message content;
/// the supervisor's own logs always carry the sim.
#[async_trait]
pub trait GameSink: Send + Sync {
    /// A connection's visible state changed (came up, or lost transport).
    /// UIs should re-render their connection panel.
    async fn admin_ui_changed(&self);

    /// A simulation clock update arrived. `clock` is the raw `clock_msg`
    /// value as published, either a bare number of seconds or a structured
    /// object, forwarded without interpretation.
    async fn sim_time_updated(&self, clock: Value);

    /// A train movement message arrived. `message` is the full decoded
    /// message body including the `train_location` payload.
    async fn train_movement(&self, message: Value);
}

// ============================================================================
// Tracing Sink
// ============================================================================

/// Sink that logs everything it receives and drops it.
///
/// Useful as a default when wiring a supervisor before real consumers
/// exist, and in demos.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl GameSink for TracingSink {
    async fn admin_ui_changed(&self) {
        info!("Connection state changed");
    }

    async fn sim_time_updated(&self, clock: Value) {
        info!(clock = %clock, "Sim time updated");
    }

    async fn train_movement(&self, message: Value) {
        info!(message = %message, "Train movement");
    }
}
