//! The supervisor actor: owns every broker connection and serializes all
//! state changes through one task.

use super::commands::{SupervisorCommand, SupervisorError};
use crate::client::{ClientEvent, ClientEventSender, StompClient, StompClientFactory};
use crate::sink::GameSink;
use chrono::{DateTime, Utc};
use simgate_core::{EndpointView, GatewayEndpoint, LinkState, SimConfig, SimId};
use simgate_protocol::{decode, ConnectedFrame, ErrorFrame, Topic, TopicPayload};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of endpoints the supervisor will register.
///
/// One sim means one broker connection, and a host application drives a
/// handful of sims at most. The cap catches runaway callers rather than
/// sizing real deployments.
pub const MAX_ENDPOINTS: usize = 64;

// ============================================================================
// Managed Endpoint
// ============================================================================

/// One supervised broker connection and its bookkeeping.
struct ManagedEndpoint {
    /// Resolved dial target. `enabled` is the live intent flag here,
    /// updated by activate/deactivate after the initial config value.
    endpoint: GatewayEndpoint,

    /// The broker client owned by this endpoint.
    client: Box<dyn StompClient>,

    /// Link state machine.
    state: LinkState,

    /// When `state` last changed.
    last_transition: DateTime<Utc>,

    /// Most recent transport failure, cleared on successful connect.
    last_error: Option<String>,
}

impl ManagedEndpoint {
    fn new(endpoint: GatewayEndpoint, client: Box<dyn StompClient>) -> Self {
        Self {
            endpoint,
            client,
            state: LinkState::default(),
            last_transition: Utc::now(),
            last_error: None,
        }
    }

    /// Applies a state transition, stamping the time only on real changes.
    fn transition(&mut self, next: LinkState) {
        if next != self.state {
            self.state = next;
            self.last_transition = Utc::now();
        }
    }

    /// Builds a read-only snapshot for the given sim key.
    fn view(&self, sim: &SimId) -> EndpointView {
        EndpointView {
            sim: sim.clone(),
            host: self.endpoint.host.clone(),
            port: self.endpoint.port,
            enabled: self.endpoint.enabled,
            connected: self.state.is_connected(),
            state: self.state,
            state_label: self.state.label().to_string(),
            last_transition: self.last_transition.to_rfc3339(),
            last_error: self.last_error.clone(),
        }
    }
}

// ============================================================================
// Supervisor Actor
// ============================================================================

/// Actor owning the endpoint registry, keyed by sim id.
///
/// # Ownership
///
/// The supervisor is the sole owner of the endpoint table and of every
/// broker client in it. Callers reach it through a
/// [`SupervisorHandle`], which sends commands over a channel; broker
/// clients report back over the event channel. One task drains both, so
/// no handler ever races another.
///
/// # Thread Safety
///
/// No locks. All mutation happens on the actor task. Snapshots handed
/// out are deep copies.
///
/// [`SupervisorHandle`]: super::SupervisorHandle
pub struct Supervisor {
    /// All registered endpoints, keyed by sim id.
    endpoints: HashMap<SimId, ManagedEndpoint>,

    /// Command channel from handles.
    commands: mpsc::Receiver<SupervisorCommand>,

    /// Event channel from broker clients.
    events: mpsc::UnboundedReceiver<(SimId, ClientEvent)>,

    /// Sender cloned into every client's event sender at creation.
    event_tx: mpsc::UnboundedSender<(SimId, ClientEvent)>,

    /// Builds broker clients for resolved endpoints.
    factory: Box<dyn StompClientFactory>,

    /// Downstream consumer of traffic and state changes.
    sink: Arc<dyn GameSink>,
}

impl Supervisor {
    /// Creates a new supervisor actor.
    ///
    /// # Arguments
    ///
    /// * `commands` - Receiving end of the command channel
    /// * `events` - Receiving end of the client event channel
    /// * `event_tx` - Sender cloned into each created client
    /// * `factory` - Builds a broker client per registered endpoint
    /// * `sink` - Consumer of decoded traffic and state notifications
    pub fn new(
        commands: mpsc::Receiver<SupervisorCommand>,
        events: mpsc::UnboundedReceiver<(SimId, ClientEvent)>,
        event_tx: mpsc::UnboundedSender<(SimId, ClientEvent)>,
        factory: Box<dyn StompClientFactory>,
        sink: Arc<dyn GameSink>,
    ) -> Self {
        Self {
            endpoints: HashMap::new(),
            commands,
            events,
            event_tx,
            factory,
            sink,
        }
    }

    /// Runs the actor until shutdown, or until every handle is dropped.
    pub async fn run(mut self) {
        info!("Supervisor actor starting");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command) {
                                break;
                            }
                        }
                        // Every handle dropped; nobody can reach us anymore.
                        None => break,
                    }
                }
                Some((sim, event)) = self.events.recv() => {
                    self.handle_client_event(&sim, event).await;
                }
            }
        }

        self.stop_all_clients();
        info!("Supervisor actor stopped");
    }

    // ========================================================================
    // Command Handling
    // ========================================================================

    /// Dispatches one command. Returns true when the actor should stop.
    fn handle_command(&mut self, command: SupervisorCommand) -> bool {
        match command {
            SupervisorCommand::CreateConnection { config, respond_to } => {
                let result = self.create_connection(config);
                // Ignore send error - caller may have dropped the receiver.
                let _ = respond_to.send(result);
            }
            SupervisorCommand::Activate { sim, respond_to } => {
                let result = self.activate(&sim);
                let _ = respond_to.send(result);
            }
            SupervisorCommand::Deactivate { sim, respond_to } => {
                let result = self.deactivate(&sim);
                let _ = respond_to.send(result);
            }
            SupervisorCommand::Remove { sim, respond_to } => {
                let result = self.remove(&sim);
                let _ = respond_to.send(result);
            }
            SupervisorCommand::GetEndpoint { sim, respond_to } => {
                let view = self.endpoints.get(&sim).map(|entry| entry.view(&sim));
                let _ = respond_to.send(view);
            }
            SupervisorCommand::GetAllEndpoints { respond_to } => {
                let _ = respond_to.send(self.endpoint_views());
            }
            SupervisorCommand::Shutdown { respond_to } => {
                info!(
                    endpoints = self.endpoints.len(),
                    "Supervisor shutting down"
                );
                self.stop_all_clients();
                let _ = respond_to.send(());
                return true;
            }
        }
        false
    }

    /// Registers a broker connection for a sim.
    ///
    /// Validation failures, duplicates and capacity overruns leave the
    /// registry untouched. On success the client is constructed and
    /// registered, and activated at once if the config marks the gateway
    /// enabled.
    fn create_connection(&mut self, config: SimConfig) -> Result<(), SupervisorError> {
        let sim = config.sim.clone();

        let endpoint = match config.resolve_gateway() {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(sim = %sim, error = %err, "Rejecting gateway connection");
                return Err(err.into());
            }
        };

        if self.endpoints.contains_key(&sim) {
            warn!(sim = %sim, "Connection already registered, rejecting create");
            return Err(SupervisorError::EndpointExists(sim));
        }

        if self.endpoints.len() >= MAX_ENDPOINTS {
            warn!(
                sim = %sim,
                max = MAX_ENDPOINTS,
                "Endpoint registry full, rejecting create"
            );
            return Err(SupervisorError::RegistryFull { max: MAX_ENDPOINTS });
        }

        let events = ClientEventSender::new(sim.clone(), self.event_tx.clone());
        let client = self.factory.connect(&endpoint, events);

        info!(
            sim = %sim,
            host = %endpoint.host,
            port = endpoint.port,
            "Created interface gateway client"
        );

        let mut entry = ManagedEndpoint::new(endpoint, client);

        if entry.endpoint.enabled {
            entry.client.activate();
            entry.transition(entry.state.on_activate());
            info!(sim = %sim, "Interface gateway enabled, activating");
        } else {
            info!(sim = %sim, "Interface gateway disabled, not activating");
        }

        self.endpoints.insert(sim, entry);
        Ok(())
    }

    /// Starts a registered connection.
    ///
    /// The client's activate is invoked unconditionally; coping with
    /// repeated activation of a live session is the client's business.
    fn activate(&mut self, sim: &SimId) -> Result<(), SupervisorError> {
        match self.endpoints.get_mut(sim) {
            Some(entry) => {
                entry.endpoint.enabled = true;
                entry.client.activate();
                entry.transition(entry.state.on_activate());
                info!(
                    sim = %sim,
                    address = %entry.endpoint,
                    "Activated interface gateway connection"
                );
                Ok(())
            }
            None => {
                warn!(sim = %sim, "Activate requested for unknown sim");
                Err(SupervisorError::EndpointNotFound(sim.clone()))
            }
        }
    }

    /// Stops a registered connection.
    ///
    /// Unknown sims are accepted without complaint: callers routinely
    /// deactivate during teardown, after the endpoint may already be gone.
    fn deactivate(&mut self, sim: &SimId) -> Result<(), SupervisorError> {
        match self.endpoints.get_mut(sim) {
            Some(entry) => {
                entry.client.deactivate();
                entry.endpoint.enabled = false;
                entry.transition(entry.state.on_deactivate());
                info!(sim = %sim, "Deactivated interface gateway connection");
            }
            None => {
                debug!(sim = %sim, "Deactivate requested for unknown sim, ignoring");
            }
        }
        Ok(())
    }

    /// Stops a connection and drops it from the registry.
    fn remove(&mut self, sim: &SimId) -> Result<(), SupervisorError> {
        match self.endpoints.remove(sim) {
            Some(mut entry) => {
                entry.client.deactivate();
                info!(
                    sim = %sim,
                    address = %entry.endpoint,
                    "Removed interface gateway connection"
                );
                Ok(())
            }
            None => {
                warn!(sim = %sim, "Remove requested for unknown sim");
                Err(SupervisorError::EndpointNotFound(sim.clone()))
            }
        }
    }

    /// Snapshots every endpoint, sorted by sim id for stable output.
    fn endpoint_views(&self) -> Vec<EndpointView> {
        let mut views: Vec<EndpointView> = self
            .endpoints
            .iter()
            .map(|(sim, entry)| entry.view(sim))
            .collect();
        views.sort_by(|a, b| a.sim.cmp(&b.sim));
        views
    }

    /// Deactivates and drops every client. The map is drained, so calling
    /// this twice is harmless.
    fn stop_all_clients(&mut self) {
        for (sim, mut entry) in self.endpoints.drain() {
            debug!(sim = %sim, "Stopping interface gateway client");
            entry.client.deactivate();
        }
    }

    // ========================================================================
    // Client Event Handling
    // ========================================================================

    /// Dispatches one broker-client event.
    ///
    /// Events race removal: a client torn down by `remove` may still have
    /// events in flight. Each handler guards its own lookup and drops
    /// stragglers without side effects.
    async fn handle_client_event(&mut self, sim: &SimId, event: ClientEvent) {
        match event {
            ClientEvent::Connected(frame) => self.on_connected(sim, frame).await,
            ClientEvent::ProtocolError(frame) => self.on_protocol_error(sim, frame),
            ClientEvent::TransportError { reason } => self.on_transport_error(sim, reason).await,
            ClientEvent::Message { destination, body } => {
                self.on_message(sim, &destination, &body).await;
            }
        }
    }

    /// Handles a successful broker connection.
    ///
    /// Subscribes both gateway topics on every connect: the broker drops
    /// subscriptions with the session, so a reconnect must resubscribe.
    async fn on_connected(&mut self, sim: &SimId, frame: ConnectedFrame) {
        match self.endpoints.get_mut(sim) {
            Some(entry) => {
                entry.transition(entry.state.on_connected());
                entry.last_error = None;

                for topic in Topic::ALL {
                    entry.client.subscribe(topic.destination());
                }

                info!(sim = %sim, frame = %frame, "Interface gateway connected");
            }
            None => {
                debug!(sim = %sim, "Dropping connected event for unregistered sim");
                return;
            }
        }

        self.sink.admin_ui_changed().await;
    }

    /// Handles a broker ERROR frame. Advisory only: the session may well
    /// survive, so nothing changes state here.
    fn on_protocol_error(&self, sim: &SimId, frame: ErrorFrame) {
        if !self.endpoints.contains_key(sim) {
            debug!(sim = %sim, "Dropping broker error for unregistered sim");
            return;
        }
        warn!(sim = %sim, error = %frame, "Broker reported protocol error");
    }

    /// Handles loss of transport.
    ///
    /// No retry happens here: reconnection is a deliberate caller decision
    /// through activate, never an automatic loop.
    async fn on_transport_error(&mut self, sim: &SimId, reason: String) {
        match self.endpoints.get_mut(sim) {
            Some(entry) => {
                warn!(
                    sim = %sim,
                    address = %entry.endpoint,
                    reason = %reason,
                    "Interface gateway transport lost"
                );
                entry.transition(entry.state.on_transport_error());
                entry.last_error = Some(reason);
            }
            None => {
                debug!(sim = %sim, "Dropping transport error for unregistered sim");
                return;
            }
        }

        self.sink.admin_ui_changed().await;
    }

    /// Routes one broker message to the sink.
    ///
    /// Unexpected destinations and undecodable bodies are dropped without
    /// disturbing the connection.
    async fn on_message(&self, sim: &SimId, destination: &str, body: &str) {
        if !self.endpoints.contains_key(sim) {
            debug!(sim = %sim, destination = %destination, "Dropping message for unregistered sim");
            return;
        }

        let topic = match Topic::from_destination(destination) {
            Some(topic) => topic,
            None => {
                debug!(
                    sim = %sim,
                    destination = %destination,
                    "Dropping message on unexpected destination"
                );
                return;
            }
        };

        match decode(topic, body) {
            Ok(TopicPayload::Clock(clock)) => {
                debug!(sim = %sim, "Forwarding sim clock update");
                self.sink.sim_time_updated(clock).await;
            }
            Ok(TopicPayload::Movement(message)) => {
                debug!(sim = %sim, "Forwarding train movement");
                self.sink.train_movement(message).await;
            }
            Ok(TopicPayload::Ignored) => {
                // Delay reports share the movement destination but carry no
                // train_location; they are not ours to forward.
                debug!(sim = %sim, destination = %destination, "Ignoring gateway message");
            }
            Err(err) => {
                warn!(
                    sim = %sim,
                    destination = %destination,
                    error = %err,
                    "Discarding undecodable gateway message"
                );
            }
        }
    }
}
