//! Cloneable handle for talking to the supervisor actor.

use super::commands::{SupervisorCommand, SupervisorError};
use simgate_core::{EndpointView, SimConfig, SimId};
use tokio::sync::{mpsc, oneshot};

/// Handle for sending commands to the supervisor actor.
///
/// Cheap to clone; every clone talks to the same actor. The actor stops
/// once [`shutdown`] is called or every handle has been dropped.
///
/// [`shutdown`]: SupervisorHandle::shutdown
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorCommand>,
}

impl SupervisorHandle {
    pub(crate) fn new(sender: mpsc::Sender<SupervisorCommand>) -> Self {
        Self { sender }
    }

    /// Registers a broker connection for the sim described by `config`,
    /// activating it at once if the config marks the gateway enabled.
    ///
    /// # Errors
    ///
    /// Configuration, duplicate and capacity failures from the actor, or
    /// [`SupervisorError::ChannelClosed`] if the actor is gone.
    pub async fn create_connection(&self, config: SimConfig) -> Result<(), SupervisorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SupervisorCommand::CreateConnection {
                config,
                respond_to: tx,
            })
            .await
            .map_err(|_| SupervisorError::ChannelClosed)?;
        rx.await.map_err(|_| SupervisorError::ChannelClosed)?
    }

    /// Starts the connection registered for a sim.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::EndpointNotFound`] for unknown sims, or
    /// [`SupervisorError::ChannelClosed`] if the actor is gone.
    pub async fn activate(&self, sim: impl Into<SimId>) -> Result<(), SupervisorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SupervisorCommand::Activate {
                sim: sim.into(),
                respond_to: tx,
            })
            .await
            .map_err(|_| SupervisorError::ChannelClosed)?;
        rx.await.map_err(|_| SupervisorError::ChannelClosed)?
    }

    /// Stops the connection registered for a sim. Unknown sims are not an
    /// error.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::ChannelClosed`] if the actor is gone.
    pub async fn deactivate(&self, sim: impl Into<SimId>) -> Result<(), SupervisorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SupervisorCommand::Deactivate {
                sim: sim.into(),
                respond_to: tx,
            })
            .await
            .map_err(|_| SupervisorError::ChannelClosed)?;
        rx.await.map_err(|_| SupervisorError::ChannelClosed)?
    }

    /// Stops a connection and drops it from the registry.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::EndpointNotFound`] for unknown sims, or
    /// [`SupervisorError::ChannelClosed`] if the actor is gone.
    pub async fn remove(&self, sim: impl Into<SimId>) -> Result<(), SupervisorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SupervisorCommand::Remove {
                sim: sim.into(),
                respond_to: tx,
            })
            .await
            .map_err(|_| SupervisorError::ChannelClosed)?;
        rx.await.map_err(|_| SupervisorError::ChannelClosed)?
    }

    /// Fetches a snapshot of one endpoint. Returns None for unknown sims
    /// and when the actor is gone.
    pub async fn endpoint(&self, sim: impl Into<SimId>) -> Option<EndpointView> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SupervisorCommand::GetEndpoint {
                sim: sim.into(),
                respond_to: tx,
            })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Fetches snapshots of all endpoints, sorted by sim id. Returns an
    /// empty list when the actor is gone.
    pub async fn endpoints(&self) -> Vec<EndpointView> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(SupervisorCommand::GetAllEndpoints { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Stops every connection and shuts the actor down, waiting for the
    /// clients to be stopped. Safe to call when the actor is already gone.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(SupervisorCommand::Shutdown { respond_to: tx })
            .await
            .is_err()
        {
            return;
        }
        let _ = rx.await;
    }

    /// Returns true while the supervisor actor is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
