//! Command protocol for the supervisor actor.
//!
//! Callers never touch the endpoint table directly. They send a
//! [`SupervisorCommand`] over the command channel and receive the result on
//! a oneshot channel, which keeps all endpoint state on the actor task.

use simgate_core::{ConfigError, EndpointView, SimConfig, SimId};
use thiserror::Error;
use tokio::sync::oneshot;

// ============================================================================
// Commands
// ============================================================================

/// Commands accepted by the supervisor actor.
#[derive(Debug)]
pub enum SupervisorCommand {
    /// Register a broker connection for a sim and auto-activate it if its
    /// gateway is enabled.
    CreateConnection {
        /// Sim configuration carrying the optional gateway block.
        config: SimConfig,
        /// Channel to send the result back to the caller.
        respond_to: oneshot::Sender<Result<(), SupervisorError>>,
    },

    /// Start a registered connection.
    Activate {
        /// Sim whose connection to start.
        sim: SimId,
        /// Channel to send the result back to the caller.
        respond_to: oneshot::Sender<Result<(), SupervisorError>>,
    },

    /// Stop a registered connection. Unknown sims are ignored.
    Deactivate {
        /// Sim whose connection to stop.
        sim: SimId,
        /// Channel to send the result back to the caller.
        respond_to: oneshot::Sender<Result<(), SupervisorError>>,
    },

    /// Stop a connection and drop it from the registry.
    Remove {
        /// Sim whose connection to remove.
        sim: SimId,
        /// Channel to send the result back to the caller.
        respond_to: oneshot::Sender<Result<(), SupervisorError>>,
    },

    /// Fetch a snapshot of one endpoint.
    GetEndpoint {
        /// Sim to look up.
        sim: SimId,
        /// Channel to send the snapshot back to the caller.
        respond_to: oneshot::Sender<Option<EndpointView>>,
    },

    /// Fetch snapshots of all endpoints, sorted by sim id.
    GetAllEndpoints {
        /// Channel to send the snapshots back to the caller.
        respond_to: oneshot::Sender<Vec<EndpointView>>,
    },

    /// Stop every connection and shut the actor down.
    Shutdown {
        /// Channel acknowledging that clients were stopped.
        respond_to: oneshot::Sender<()>,
    },
}

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by supervisor operations.
///
/// All of these are advisory. None of them poison the supervisor: the actor
/// keeps serving commands after reporting any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    /// The sim configuration does not describe a usable gateway.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A connection is already registered for this sim.
    #[error("endpoint already registered for sim {0}")]
    EndpointExists(SimId),

    /// No connection is registered for this sim.
    #[error("no endpoint registered for sim {0}")]
    EndpointNotFound(SimId),

    /// The registry is at capacity.
    #[error("endpoint registry full (max {max})")]
    RegistryFull {
        /// The configured registry limit.
        max: usize,
    },

    /// The supervisor actor is gone.
    #[error("supervisor channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = SupervisorError::EndpointExists(SimId::new("royston"));
        assert_eq!(
            err.to_string(),
            "endpoint already registered for sim royston"
        );

        let err = SupervisorError::EndpointNotFound(SimId::new("exeter"));
        assert_eq!(err.to_string(), "no endpoint registered for sim exeter");

        let err = SupervisorError::RegistryFull { max: 64 };
        assert_eq!(err.to_string(), "endpoint registry full (max 64)");

        let err = SupervisorError::ChannelClosed;
        assert_eq!(err.to_string(), "supervisor channel closed");
    }

    #[test]
    fn test_config_error_passes_through_transparently() {
        let err = SupervisorError::from(ConfigError::GatewayMissing(SimId::new("royston")));
        assert_eq!(
            err.to_string(),
            "no interface gateway configuration for sim royston"
        );
    }

    #[test]
    fn test_errors_are_cloneable_and_comparable() {
        let err = SupervisorError::RegistryFull { max: 64 };
        let clone = err.clone();
        assert_eq!(err, clone);
        assert_ne!(err, SupervisorError::ChannelClosed);
    }

    #[tokio::test]
    async fn test_command_responds_over_oneshot() {
        let (tx, rx) = oneshot::channel();
        let cmd = SupervisorCommand::Activate {
            sim: SimId::new("royston"),
            respond_to: tx,
        };

        // Simulate the actor answering.
        match cmd {
            SupervisorCommand::Activate { sim, respond_to } => {
                let _ = respond_to.send(Err(SupervisorError::EndpointNotFound(sim)));
            }
            _ => panic!("unexpected command variant"),
        }

        let result = rx.await.expect("actor should respond");
        assert_eq!(
            result,
            Err(SupervisorError::EndpointNotFound(SimId::new("royston")))
        );
    }

    #[tokio::test]
    async fn test_dropped_responder_is_detectable() {
        let (tx, rx) = oneshot::channel::<Result<(), SupervisorError>>();
        drop(tx);
        assert!(rx.await.is_err());
    }
}
