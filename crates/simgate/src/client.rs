//! The broker-client capability interface.
//!
//! The supervisor never speaks STOMP and never opens sockets. It drives a
//! [`StompClient`] handed to it by a [`StompClientFactory`], and the client
//! reports back through a [`ClientEventSender`]. Production deployments
//! wrap whatever STOMP library they use behind these two traits; tests use
//! scripted fakes.

use simgate_core::{GatewayEndpoint, SimId};
use simgate_protocol::{ConnectedFrame, ErrorFrame};
use tokio::sync::mpsc;
use tracing::debug;

// ============================================================================
// Client Events
// ============================================================================

/// Events a broker client reports back to the supervisor.
///
/// These are the three hook points of a callback-style STOMP client, plus
/// message delivery for subscribed destinations.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The broker session is established end-to-end.
    Connected(ConnectedFrame),

    /// The broker sent an ERROR frame. Advisory: the session may survive.
    ProtocolError(ErrorFrame),

    /// The underlying socket failed. The session is gone.
    TransportError {
        /// Human-readable failure description from the client.
        reason: String,
    },

    /// A message arrived on a subscribed destination.
    Message {
        /// STOMP destination the message was published on.
        destination: String,
        /// Raw message body.
        body: String,
    },
}

// ============================================================================
// Event Sender
// ============================================================================

/// Per-endpoint event channel handed to a broker client at construction.
///
/// Tags every event with the owning sim and pushes it into the supervisor's
/// event queue. The channel is unbounded because clients are synchronous
/// callback adapters that must never block; once the supervisor is gone,
/// sends are dropped quietly.
#[derive(Debug, Clone)]
pub struct ClientEventSender {
    sim: SimId,
    tx: mpsc::UnboundedSender<(SimId, ClientEvent)>,
}

impl ClientEventSender {
    pub(crate) fn new(sim: SimId, tx: mpsc::UnboundedSender<(SimId, ClientEvent)>) -> Self {
        Self { sim, tx }
    }

    /// Returns the sim this sender reports for.
    pub fn sim(&self) -> &SimId {
        &self.sim
    }

    /// Reports an event to the supervisor.
    pub fn send(&self, event: ClientEvent) {
        if self.tx.send((self.sim.clone(), event)).is_err() {
            debug!(sim = %self.sim, "Supervisor gone, dropping client event");
        }
    }
}

// ============================================================================
// Client Traits
// ============================================================================

/// Handle to one third-party broker client bound to a gateway endpoint.
///
/// All methods are infallible at this seam: failures surface asynchronously
/// as [`ClientEvent`]s, never as return values, mirroring how callback-style
/// STOMP clients behave.
///
/// The supervisor actor owns clients across await points on a spawned
/// task, so implementations must be `Send + Sync`.
pub trait StompClient: Send + Sync {
    /// Starts the client. Connection progress arrives as events.
    ///
    /// Calling this on a client that is already active is the client's
    /// business; the supervisor does not guard against it.
    fn activate(&mut self);

    /// Stops the client and tears down any live session.
    fn deactivate(&mut self);

    /// Subscribes to a destination. Messages arrive as
    /// [`ClientEvent::Message`] carrying the destination string.
    fn subscribe(&mut self, destination: &str);
}

/// Builds broker clients bound to a gateway endpoint.
///
/// The factory is handed the resolved endpoint (host and port are already
/// validated) and the event sender the client must report through. The
/// returned client is constructed but not started.
pub trait StompClientFactory: Send + Sync {
    fn connect(
        &self,
        gateway: &GatewayEndpoint,
        events: ClientEventSender,
    ) -> Box<dyn StompClient>;
}
