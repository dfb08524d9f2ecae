//! Test helpers for bridge integration tests.
//!
//! - [`MockWorker`]: a real WebSocket worker double on an ephemeral port
//! - [`EventProbe`]: collects bus events for assertions
//! - [`HeadlessHost`]: a [`SurfaceHost`] without windows

use bridge_core::config::BridgeConfig;
use bridge_core::error::surface::SurfaceError;
use bridge_core::fanout::{BridgeEvent, EventBus, EventKind};
use bridge_core::notification::{Geometry, Notification, SurfaceHost, WorkArea};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// How long any single expected thing may take before the test fails.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Window in which "nothing else happens" is checked.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

const GATE_PERMITS: usize = 1024;

/// Bridge config for `port` with fast reconnects.
pub fn test_config(port: u16) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.worker.port = port;
    config.worker.connect_timeout_ms = 2_000;
    config.reconnect.initial_delay_ms = 100;
    config.reconnect.max_delay_ms = 400;
    config
}

/// A port that nothing listens on (bound, then released).
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

// ============================================================================
// MockWorker
// ============================================================================

/// One accepted WebSocket connection on the worker side.
pub struct MockConnection {
    incoming: mpsc::UnboundedReceiver<Value>,
    outgoing: mpsc::UnboundedSender<Message>,
}

impl MockConnection {
    /// Next JSON frame the bridge sent.
    pub async fn recv_json(&mut self) -> Value {
        timeout(STEP_TIMEOUT, self.incoming.recv())
            .await
            .expect("Timed out waiting for a frame from the bridge")
            .expect("Connection closed before a frame arrived")
    }

    /// Next frame within `window`, if any.
    pub async fn recv_json_within(&mut self, window: Duration) -> Option<Value> {
        timeout(window, self.incoming.recv()).await.ok().flatten()
    }

    pub fn send_json(&self, value: Value) {
        self.send_text(&value.to_string());
    }

    pub fn send_text(&self, text: &str) {
        self.outgoing
            .send(Message::Text(text.to_string().into()))
            .expect("Connection writer gone");
    }

    /// Close the connection from the worker side.
    pub fn close(&self) {
        let _ = self.outgoing.send(Message::Close(None));
    }
}

/// WebSocket worker double.
///
/// Every accepted connection is handed to the test through
/// [`next_connection`](Self::next_connection). A gated worker accepts TCP but
/// holds the WebSocket handshake until [`open_gate`](Self::open_gate), which
/// keeps the bridge in `CONNECTING` for as long as a test needs.
pub struct MockWorker {
    pub port: u16,
    gate: Arc<Semaphore>,
    connections: mpsc::UnboundedReceiver<MockConnection>,
    task: JoinHandle<()>,
}

impl MockWorker {
    pub async fn start() -> Self {
        Self::start_with_gate(GATE_PERMITS).await
    }

    pub async fn start_gated() -> Self {
        Self::start_with_gate(0).await
    }

    async fn start_with_gate(permits: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock worker");
        let port = listener.local_addr().expect("local addr").port();
        let gate = Arc::new(Semaphore::new(permits));
        let (connections_tx, connections) = mpsc::unbounded_channel();

        let task = tokio::spawn(serve(listener, Arc::clone(&gate), connections_tx));

        Self {
            port,
            gate,
            connections,
            task,
        }
    }

    /// Let held and future handshakes through.
    pub fn open_gate(&self) {
        self.gate.add_permits(GATE_PERMITS);
    }

    pub async fn next_connection(&mut self) -> MockConnection {
        timeout(STEP_TIMEOUT, self.connections.recv())
            .await
            .expect("Timed out waiting for the bridge to connect")
            .expect("Mock worker stopped")
    }

    /// Whether another connection arrives within `window`.
    pub async fn connection_within(&mut self, window: Duration) -> Option<MockConnection> {
        timeout(window, self.connections.recv()).await.ok().flatten()
    }
}

impl Drop for MockWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: TcpListener,
    gate: Arc<Semaphore>,
    connections: mpsc::UnboundedSender<MockConnection>,
) {
    while let Ok((stream, _)) = listener.accept().await {
        match gate.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return,
        }

        let Ok(ws) = accept_async(stream).await else {
            continue;
        };
        let (mut sink, mut source) = ws.split();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(Ok(message)) = source.next().await {
                if let Message::Text(text) = message
                    && let Ok(value) = serde_json::from_str::<Value>(text.as_str())
                    && incoming_tx.send(value).is_err()
                {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if sink.send(message).await.is_err() || closing {
                    break;
                }
            }
        });

        if connections
            .send(MockConnection { incoming, outgoing })
            .is_err()
        {
            return;
        }
    }
}

// ============================================================================
// EventProbe
// ============================================================================

/// Records every event of the given kinds in publish order.
pub struct EventProbe {
    events: mpsc::UnboundedReceiver<BridgeEvent>,
}

impl EventProbe {
    pub fn attach(bus: &EventBus, kinds: &[EventKind]) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        for kind in kinds {
            let tx = tx.clone();
            bus.subscribe(*kind, move |event| {
                let _ = tx.send(event.clone());
            });
        }
        Self { events }
    }

    pub fn attach_all(bus: &EventBus) -> Self {
        Self::attach(bus, &EventKind::ALL)
    }

    pub async fn next(&mut self) -> BridgeEvent {
        timeout(STEP_TIMEOUT, self.events.recv())
            .await
            .expect("Timed out waiting for an event")
            .expect("Probe channel closed")
    }

    /// Skip events until one of `kind` arrives.
    pub async fn next_of(&mut self, kind: EventKind) -> BridgeEvent {
        loop {
            let event = self.next().await;
            if event.kind() == kind {
                return event;
            }
        }
    }

    /// Next event within `window`, if any.
    pub async fn next_within(&mut self, window: Duration) -> Option<BridgeEvent> {
        timeout(window, self.events.recv()).await.ok().flatten()
    }
}

// ============================================================================
// HeadlessHost
// ============================================================================

/// [`SurfaceHost`] that tracks surfaces in memory only.
#[derive(Clone, Default)]
pub struct HeadlessHost {
    surfaces: Arc<Mutex<HashMap<String, Geometry>>>,
}

impl HeadlessHost {
    pub fn live_count(&self) -> usize {
        self.surfaces.lock().unwrap().len()
    }

    fn check(&self, id: &str) -> Result<(), SurfaceError> {
        if self.surfaces.lock().unwrap().contains_key(id) {
            Ok(())
        } else {
            Err(SurfaceError::NotFound {
                id: id.to_string(),
                location: common::ErrorLocation::caller(),
            })
        }
    }
}

impl SurfaceHost for HeadlessHost {
    fn work_area(&self) -> WorkArea {
        WorkArea {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }

    fn create(&mut self, id: &str, bounds: Geometry) -> Result<(), SurfaceError> {
        self.surfaces
            .lock()
            .unwrap()
            .insert(id.to_string(), bounds);
        Ok(())
    }

    fn attach_content(&mut self, id: &str, _notification: &Notification) -> Result<(), SurfaceError> {
        self.check(id)
    }

    fn show(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.check(id)
    }

    fn set_opacity(&mut self, id: &str, _opacity: f64) -> Result<(), SurfaceError> {
        self.check(id)
    }

    fn set_bounds(&mut self, id: &str, bounds: Geometry) -> Result<(), SurfaceError> {
        self.check(id)?;
        self.surfaces
            .lock()
            .unwrap()
            .insert(id.to_string(), bounds);
        Ok(())
    }

    fn close(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.surfaces.lock().unwrap().remove(id);
        Ok(())
    }

    fn is_alive(&self, id: &str) -> bool {
        self.surfaces.lock().unwrap().contains_key(id)
    }
}
