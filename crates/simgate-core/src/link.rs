//! Per-endpoint link state machine and read-only snapshots.

use crate::sim::SimId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Link State Machine
// ============================================================================

/// Connection state of one gateway link.
///
/// Driven entirely by supervisor operations and broker-client events:
///
/// ```text
///              activate                connected
///   Idle ───────────────▶ Connecting ───────────▶ Connected
///    ▲                        │                       │
///    │ deactivate             │ transport_error       │ transport_error
///    └──────(any state)       ▼                       ▼
///                          Errored ◀──────────────────┘
///                             │ activate
///                             └─────────▶ Connecting
/// ```
///
/// `connected` as seen by callers is derived from this machine rather than
/// stored as a separate flag, so a deactivated link always reads as
/// disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Not started, or deliberately stopped. The client holds no session.
    #[default]
    Idle,

    /// Activation requested; the client is establishing the session.
    Connecting,

    /// Broker session established end-to-end.
    Connected,

    /// The transport failed. The link stays here until reactivated.
    Errored,
}

impl LinkState {
    /// Transition for an activate request.
    ///
    /// A link that is already connecting or connected stays put; repeated
    /// activation is the client's business, not a state change.
    #[must_use]
    pub fn on_activate(self) -> Self {
        match self {
            Self::Idle | Self::Errored => Self::Connecting,
            other => other,
        }
    }

    /// Transition for a deactivate request. Always lands in `Idle`.
    #[must_use]
    pub fn on_deactivate(self) -> Self {
        Self::Idle
    }

    /// Transition for a connected event.
    ///
    /// Client callbacks fire unconditionally, so any state promotes to
    /// `Connected`, including a straggler event on an idle link.
    #[must_use]
    pub fn on_connected(self) -> Self {
        Self::Connected
    }

    /// Transition for a transport error event.
    ///
    /// A deliberately idle link is not resurrected into an error state by
    /// a straggler failure report.
    #[must_use]
    pub fn on_transport_error(self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            _ => Self::Errored,
        }
    }

    /// Returns true if the broker session is currently established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns the display label for this state.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Errored => write!(f, "Errored"),
        }
    }
}

// ============================================================================
// Endpoint Snapshot
// ============================================================================

/// Read-only view of one supervised endpoint.
///
/// Immutable snapshot built by the supervisor actor; this is how the host
/// application reads `connected` and `enabled` back. Implements Clone for
/// easy distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointView {
    /// Sim code this endpoint belongs to.
    pub sim: SimId,

    /// Gateway host.
    pub host: String,

    /// Gateway port.
    pub port: u16,

    /// Whether the connection is wanted up (caller intent).
    pub enabled: bool,

    /// Whether the broker session is established (derived from `state`).
    pub connected: bool,

    /// Current link state.
    pub state: LinkState,

    /// State label for display.
    pub state_label: String,

    /// When the link last changed state (ISO 8601).
    pub last_transition: String,

    /// Most recent transport failure, if any.
    pub last_error: Option<String>,
}
