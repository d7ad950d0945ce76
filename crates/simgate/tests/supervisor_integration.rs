//! Integration tests for the gateway connection supervisor.
//!
//! These tests exercise the supervisor as a complete system through
//! spawn_supervisor() and the SupervisorHandle interface, with scripted
//! broker clients standing in for real STOMP connections.
//!
//! Tests use `.unwrap()` and `.expect()` freely; the panic-free policy
//! applies to production code only.

use async_trait::async_trait;
use serde_json::{json, Value};
use simgate::client::{ClientEvent, ClientEventSender, StompClient, StompClientFactory};
use simgate::sink::GameSink;
use simgate::supervisor::{spawn_supervisor, SupervisorError, SupervisorHandle};
use simgate_core::{EndpointView, GatewayEndpoint, LinkState, SimConfig, SimId};
use simgate_protocol::{ConnectedFrame, ErrorFrame};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

// ============================================================================
// Constants
// ============================================================================

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const SETTLE_PERIOD: Duration = Duration::from_millis(50);

// ============================================================================
// Test Doubles
// ============================================================================

/// Call counters for one scripted client, shared with the test body.
#[derive(Default)]
struct ClientLog {
    activations: usize,
    deactivations: usize,
    subscriptions: Vec<String>,
}

/// What the factory remembers about each client it built.
struct BuiltClient {
    log: Arc<Mutex<ClientLog>>,
    events: ClientEventSender,
    endpoint: GatewayEndpoint,
}

struct ScriptedClient {
    log: Arc<Mutex<ClientLog>>,
}

impl StompClient for ScriptedClient {
    fn activate(&mut self) {
        self.log.lock().unwrap().activations += 1;
    }

    fn deactivate(&mut self) {
        self.log.lock().unwrap().deactivations += 1;
    }

    fn subscribe(&mut self, destination: &str) {
        self.log
            .lock()
            .unwrap()
            .subscriptions
            .push(destination.to_string());
    }
}

/// Factory that keeps the event sender of every client it builds, so tests
/// can fire broker callbacks by hand.
#[derive(Default, Clone)]
struct ScriptedFactory {
    built: Arc<Mutex<HashMap<SimId, BuiltClient>>>,
}

impl StompClientFactory for ScriptedFactory {
    fn connect(
        &self,
        gateway: &GatewayEndpoint,
        events: ClientEventSender,
    ) -> Box<dyn StompClient> {
        let log = Arc::new(Mutex::new(ClientLog::default()));
        self.built.lock().unwrap().insert(
            events.sim().clone(),
            BuiltClient {
                log: log.clone(),
                events,
                endpoint: gateway.clone(),
            },
        );
        Box::new(ScriptedClient { log })
    }
}

/// Sink recording every notification for assertions.
#[derive(Default)]
struct RecordingSink {
    ui_changes: Mutex<usize>,
    clocks: Mutex<Vec<Value>>,
    movements: Mutex<Vec<Value>>,
}

#[async_trait]
impl GameSink for RecordingSink {
    async fn admin_ui_changed(&self) {
        *self.ui_changes.lock().unwrap() += 1;
    }

    async fn sim_time_updated(&self, clock: Value) {
        self.clocks.lock().unwrap().push(clock);
    }

    async fn train_movement(&self, message: Value) {
        self.movements.lock().unwrap().push(message);
    }
}

// ============================================================================
// Test Harness
// ============================================================================

/// Installs a test subscriber once; later calls are no-ops.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Gateway {
    handle: SupervisorHandle,
    factory: ScriptedFactory,
    sink: Arc<RecordingSink>,
}

impl Gateway {
    fn spawn() -> Self {
        init_logging();
        let factory = ScriptedFactory::default();
        let sink = Arc::new(RecordingSink::default());
        let handle = spawn_supervisor(Box::new(factory.clone()), sink.clone());
        Self {
            handle,
            factory,
            sink,
        }
    }

    fn client_log(&self, sim: &str) -> Arc<Mutex<ClientLog>> {
        self.factory
            .built
            .lock()
            .unwrap()
            .get(&SimId::new(sim))
            .map(|built| built.log.clone())
            .expect("a client was built for this sim")
    }

    fn built_endpoint(&self, sim: &str) -> GatewayEndpoint {
        self.factory
            .built
            .lock()
            .unwrap()
            .get(&SimId::new(sim))
            .map(|built| built.endpoint.clone())
            .expect("a client was built for this sim")
    }

    /// Fires a broker-client event for a sim, as the real client would
    /// from inside its callback.
    fn fire(&self, sim: &str, event: ClientEvent) {
        self.factory
            .built
            .lock()
            .unwrap()
            .get(&SimId::new(sim))
            .map(|built| built.events.send(event))
            .expect("a client was built for this sim");
    }

    /// Polls the supervisor until the endpoint for `sim` satisfies the
    /// predicate, failing the test after EVENT_TIMEOUT.
    async fn wait_for<F>(&self, sim: &str, what: &str, predicate: F) -> EndpointView
    where
        F: Fn(&EndpointView) -> bool,
    {
        let deadline = Instant::now() + EVENT_TIMEOUT;
        loop {
            if let Some(view) = self.handle.endpoint(sim).await {
                if predicate(&view) {
                    return view;
                }
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {what} on sim {sim}"
            );
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Polls until `condition` holds, failing the test after EVENT_TIMEOUT.
    async fn wait_until<F>(&self, what: &str, mut condition: F)
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + EVENT_TIMEOUT;
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Gives the actor a moment to drain events that must NOT have a
    /// visible effect.
    async fn settle(&self) {
        sleep(SETTLE_PERIOD).await;
    }
}

fn enabled_config(sim: &str) -> SimConfig {
    SimConfig::new(sim)
        .with_host("10.0.0.5")
        .with_gateway(51515, true)
}

fn disabled_config(sim: &str) -> SimConfig {
    SimConfig::new(sim)
        .with_host("10.0.0.5")
        .with_gateway(51515, false)
}

// ============================================================================
// Creation and Activation Tests
// ============================================================================

#[tokio::test]
async fn test_create_enabled_connection_activates_client() {
    let gw = Gateway::spawn();

    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    // The factory was handed the resolved endpoint.
    let endpoint = gw.built_endpoint("royston");
    assert_eq!(endpoint.address(), "10.0.0.5:51515");

    // The client was started exactly once.
    assert_eq!(gw.client_log("royston").lock().unwrap().activations, 1);

    let view = gw
        .handle
        .endpoint("royston")
        .await
        .expect("endpoint should exist");
    assert!(view.enabled);
    assert!(!view.connected);
    assert_eq!(view.state, LinkState::Connecting);
}

#[tokio::test]
async fn test_create_disabled_connection_stays_idle() {
    let gw = Gateway::spawn();

    gw.handle
        .create_connection(disabled_config("royston"))
        .await
        .expect("create should succeed");

    assert_eq!(gw.client_log("royston").lock().unwrap().activations, 0);

    let view = gw
        .handle
        .endpoint("royston")
        .await
        .expect("endpoint should exist");
    assert!(!view.enabled);
    assert_eq!(view.state, LinkState::Idle);

    // Explicit activation starts it later.
    gw.handle
        .activate("royston")
        .await
        .expect("activate should succeed");
    assert_eq!(gw.client_log("royston").lock().unwrap().activations, 1);
}

#[tokio::test]
async fn test_connect_event_subscribes_both_topics() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::with_version("1.2")),
    );

    let view = gw
        .wait_for("royston", "connected state", |view| view.connected)
        .await;
    assert_eq!(view.state, LinkState::Connected);
    assert_eq!(view.state_label, "connected");

    let log = gw.client_log("royston");
    assert_eq!(
        log.lock().unwrap().subscriptions,
        ["/topic/SimSig", "/topic/TRAIN_MVT_ALL_TOC"]
    );
    assert_eq!(*gw.sink.ui_changes.lock().unwrap(), 1);
}

// ============================================================================
// Message Routing Tests
// ============================================================================

#[tokio::test]
async fn test_clock_updates_reach_the_sink() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::default()),
    );
    gw.wait_for("royston", "connected state", |view| view.connected)
        .await;

    // A bare number of seconds, then a structured clock.
    gw.fire(
        "royston",
        ClientEvent::Message {
            destination: "/topic/SimSig".to_string(),
            body: r#"{"clock_msg": 120.5}"#.to_string(),
        },
    );
    gw.fire(
        "royston",
        ClientEvent::Message {
            destination: "/topic/SimSig".to_string(),
            body: r#"{"clock_msg": {"area_id": "royston", "clock": 43200, "interval": 500}}"#
                .to_string(),
        },
    );

    gw.wait_until("two clock updates", || gw.sink.clocks.lock().unwrap().len() == 2)
        .await;

    let clocks = gw.sink.clocks.lock().unwrap();
    // The raw clock_msg value is forwarded either way, uninterpreted.
    assert_eq!(clocks[0], json!(120.5));
    assert_eq!(clocks[1]["clock"], json!(43200));
}

#[tokio::test]
async fn test_movement_messages_forward_the_full_body() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::default()),
    );
    gw.wait_for("royston", "connected state", |view| view.connected)
        .await;

    gw.fire(
        "royston",
        ClientEvent::Message {
            destination: "/topic/TRAIN_MVT_ALL_TOC".to_string(),
            body: r#"{"train_location": {"headcode": "1A23", "action": "pass", "location": "ROYSTON"}, "area_id": "royston"}"#.to_string(),
        },
    );

    gw.wait_until("one movement", || {
        gw.sink.movements.lock().unwrap().len() == 1
    })
    .await;

    let movements = gw.sink.movements.lock().unwrap();
    // The full message is forwarded, not just the train_location payload.
    assert_eq!(movements[0]["area_id"], json!("royston"));
    assert_eq!(movements[0]["train_location"]["headcode"], json!("1A23"));
}

#[tokio::test]
async fn test_delay_reports_are_not_forwarded() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::default()),
    );
    gw.wait_for("royston", "connected state", |view| view.connected)
        .await;

    // Delay reports share the movement destination but carry no
    // train_location.
    gw.fire(
        "royston",
        ClientEvent::Message {
            destination: "/topic/TRAIN_MVT_ALL_TOC".to_string(),
            body: r#"{"train_delay": {"headcode": "1A23", "delay": 120}}"#.to_string(),
        },
    );
    // A real movement behind it proves the drop was selective.
    gw.fire(
        "royston",
        ClientEvent::Message {
            destination: "/topic/TRAIN_MVT_ALL_TOC".to_string(),
            body: r#"{"train_location": {"headcode": "2C45"}}"#.to_string(),
        },
    );

    gw.wait_until("the movement behind the delay report", || {
        gw.sink.movements.lock().unwrap().len() == 1
    })
    .await;

    let movements = gw.sink.movements.lock().unwrap();
    assert_eq!(movements.len(), 1, "the delay report must not be forwarded");
    assert_eq!(movements[0]["train_location"]["headcode"], json!("2C45"));
}

// ============================================================================
// Failure and Recovery Tests
// ============================================================================

#[tokio::test]
async fn test_transport_loss_and_manual_recovery() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::default()),
    );
    gw.wait_for("royston", "connected state", |view| view.connected)
        .await;

    gw.fire(
        "royston",
        ClientEvent::TransportError {
            reason: "connection reset by peer".to_string(),
        },
    );

    let view = gw
        .wait_for("royston", "errored state", |view| {
            view.state == LinkState::Errored
        })
        .await;
    assert!(!view.connected);
    assert_eq!(view.last_error.as_deref(), Some("connection reset by peer"));
    // Once for connect, once for the loss.
    assert_eq!(*gw.sink.ui_changes.lock().unwrap(), 2);

    // No automatic retry: the client is only started again on demand.
    gw.settle().await;
    assert_eq!(gw.client_log("royston").lock().unwrap().activations, 1);

    gw.handle
        .activate("royston")
        .await
        .expect("reactivate should succeed");
    assert_eq!(gw.client_log("royston").lock().unwrap().activations, 2);

    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::default()),
    );
    let view = gw
        .wait_for("royston", "reconnected state", |view| view.connected)
        .await;
    assert_eq!(view.last_error, None);

    // Both topics are subscribed again on the fresh session.
    assert_eq!(
        gw.client_log("royston").lock().unwrap().subscriptions.len(),
        4
    );
}

#[tokio::test]
async fn test_protocol_errors_leave_the_session_alone() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::default()),
    );
    gw.wait_for("royston", "connected state", |view| view.connected)
        .await;

    gw.fire(
        "royston",
        ClientEvent::ProtocolError(
            ErrorFrame::new("malformed frame received").with_body("DISCONNECT expected"),
        ),
    );
    gw.settle().await;

    // Still connected, nothing notified.
    let view = gw
        .handle
        .endpoint("royston")
        .await
        .expect("endpoint should exist");
    assert!(view.connected);
    assert_eq!(*gw.sink.ui_changes.lock().unwrap(), 1);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_deactivate_stops_the_client() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::default()),
    );
    gw.wait_for("royston", "connected state", |view| view.connected)
        .await;

    gw.handle
        .deactivate("royston")
        .await
        .expect("deactivate should succeed");

    assert_eq!(gw.client_log("royston").lock().unwrap().deactivations, 1);

    let view = gw
        .handle
        .endpoint("royston")
        .await
        .expect("endpoint should exist");
    assert!(!view.enabled);
    assert!(!view.connected);
    assert_eq!(view.state, LinkState::Idle);

    // Caller-driven stops notify nobody; only connects and transport
    // losses do. Still just the one notification from the connect.
    assert_eq!(*gw.sink.ui_changes.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_remove_stops_and_forgets_the_client() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");

    gw.handle
        .remove("royston")
        .await
        .expect("remove should succeed");

    assert_eq!(gw.client_log("royston").lock().unwrap().deactivations, 1);
    assert!(gw.handle.endpoint("royston").await.is_none());

    // Stray events from the removed client change nothing.
    gw.fire(
        "royston",
        ClientEvent::Connected(ConnectedFrame::default()),
    );
    gw.fire(
        "royston",
        ClientEvent::Message {
            destination: "/topic/SimSig".to_string(),
            body: r#"{"clock_msg": 1}"#.to_string(),
        },
    );
    gw.settle().await;

    assert_eq!(*gw.sink.ui_changes.lock().unwrap(), 0);
    assert!(gw.sink.clocks.lock().unwrap().is_empty());

    // The sim can be registered again afterwards.
    gw.handle
        .create_connection(disabled_config("royston"))
        .await
        .expect("re-create should succeed");
}

#[tokio::test]
async fn test_endpoints_snapshot_is_sorted() {
    let gw = Gateway::spawn();
    for sim in ["waterfall", "exeter", "royston"] {
        gw.handle
            .create_connection(disabled_config(sim))
            .await
            .expect("create should succeed");
    }

    let views = gw.handle.endpoints().await;
    let order: Vec<&str> = views.iter().map(|view| view.sim.as_str()).collect();
    assert_eq!(order, ["exeter", "royston", "waterfall"]);
}

// ============================================================================
// Handle Clone and Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_handle_cloning() {
    let gw = Gateway::spawn();
    let handle2 = gw.handle.clone();

    gw.handle
        .create_connection(disabled_config("royston"))
        .await
        .expect("create should succeed");

    // The clone sees the endpoint registered through the original.
    let view = handle2.endpoint("royston").await;
    assert!(view.is_some(), "cloned handle should see the endpoint");

    assert!(gw.handle.is_running());
    assert!(handle2.is_running());
}

#[tokio::test]
async fn test_concurrent_creates() {
    let gw = Gateway::spawn();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let handle = gw.handle.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .create_connection(disabled_config(&format!("concurrent-{i}")))
                .await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let result = task.await.expect("task should complete");
        assert!(result.is_ok(), "create {i} failed: {result:?}");
    }

    assert_eq!(gw.handle.endpoints().await.len(), 10);
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_shutdown_stops_every_client() {
    let gw = Gateway::spawn();
    gw.handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");
    gw.handle
        .create_connection(enabled_config("exeter"))
        .await
        .expect("create should succeed");

    gw.handle.shutdown().await;

    assert_eq!(gw.client_log("royston").lock().unwrap().deactivations, 1);
    assert_eq!(gw.client_log("exeter").lock().unwrap().deactivations, 1);

    // The actor is gone; further commands fail cleanly.
    assert_eq!(
        gw.handle.activate("royston").await,
        Err(SupervisorError::ChannelClosed)
    );
}

#[tokio::test]
async fn test_dropping_every_handle_stops_the_actor() {
    let Gateway {
        handle,
        factory,
        sink: _sink,
    } = Gateway::spawn();

    handle
        .create_connection(enabled_config("royston"))
        .await
        .expect("create should succeed");
    let log = factory
        .built
        .lock()
        .unwrap()
        .get(&SimId::new("royston"))
        .map(|built| built.log.clone())
        .expect("a client was built");

    drop(handle);

    // The actor notices the closed command channel and stops the client.
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while log.lock().unwrap().deactivations == 0 {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for the actor to stop the client"
        );
        sleep(POLL_INTERVAL).await;
    }
    assert_eq!(log.lock().unwrap().deactivations, 1);
}
