//! Broker-connection supervision.
//!
//! One actor task owns every gateway connection; handles and broker
//! clients reach it through channels:
//!
//! ```text
//!   SupervisorHandle ──commands──▶ ┌────────────┐ ◀──events── StompClient
//!      (cloneable)                 │ Supervisor │             (one per sim)
//!                                  │   actor    │ ──activate/subscribe──▶
//!                                  └────────────┘
//!                                        │
//!                                        ▼ clock updates, train movements,
//!                                    GameSink    state-change notifications
//! ```
//!
//! Commands travel over a bounded channel and are answered on oneshot
//! channels. Client events travel over an unbounded channel because the
//! clients are synchronous callback adapters that must never block.

mod actor;
mod commands;
mod handle;

pub use actor::{Supervisor, MAX_ENDPOINTS};
pub use commands::{SupervisorCommand, SupervisorError};
pub use handle::SupervisorHandle;

use crate::client::StompClientFactory;
use crate::sink::GameSink;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Command channel capacity. Applies backpressure to callers if the actor
/// ever falls behind.
const COMMAND_BUFFER: usize = 100;

/// Spawns the supervisor actor and returns a handle to it.
///
/// The actor runs until [`SupervisorHandle::shutdown`] is called or every
/// handle has been dropped; either way it stops all broker clients on the
/// way out.
///
/// # Arguments
///
/// * `factory` - Builds a broker client per registered endpoint
/// * `sink` - Consumer of decoded traffic and state notifications
pub fn spawn_supervisor(
    factory: Box<dyn StompClientFactory>,
    sink: Arc<dyn GameSink>,
) -> SupervisorHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let actor = Supervisor::new(command_rx, event_rx, event_tx, factory, sink);
    tokio::spawn(actor.run());

    SupervisorHandle::new(command_tx)
}
