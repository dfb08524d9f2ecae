use crate::channel::MANUAL_DISCONNECT_REASON;
use crate::channel::state::{BridgeStatus, ChannelState};
use crate::config::BridgeConfig;
use crate::error::channel::ChannelError;
use crate::error::command::CommandError;
use crate::fanout::{BridgeEvent, EventBus, InboundEvent, dispatch};
use crate::router::{CommandReceipt, Message, OutboundQueue};

use common::ErrorLocation;

use std::future::pending;
use std::panic::Location;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

const CLOSED_BY_WORKER: &str = "closed by worker";
const STREAM_ENDED: &str = "connection lost";

/// Everything the channel actor reacts to.
///
/// The first four come from [`BridgeHandle`](crate::channel::BridgeHandle);
/// the rest are reported by the actor's own connect and reader tasks and carry
/// the generation they were started under.
pub(crate) enum ChannelInput {
    Connect {
        reply: oneshot::Sender<()>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Send {
        message: Message,
        reply: oneshot::Sender<Result<CommandReceipt, CommandError>>,
    },
    Status {
        reply: oneshot::Sender<BridgeStatus>,
    },

    Opened {
        generation: u64,
        stream: Box<WsStream>,
    },
    ConnectFailed {
        generation: u64,
        error: ChannelError,
    },
    Frame {
        generation: u64,
        text: String,
    },
    TransportError {
        generation: u64,
        message: String,
    },
    Closed {
        generation: u64,
        reason: String,
    },
}

/// Owns the connection and everything that must change together with it.
pub(crate) struct ChannelActor {
    endpoint: Url,
    connect_timeout: Duration,
    backoff: ExponentialBackoff,
    state: ChannelState,
    queue: OutboundQueue,
    reconnect_at: Option<Instant>,
    writer: Option<WsWriter>,
    reader: Option<JoinHandle<()>>,
    generation: u64,
    bus: EventBus,
    /// Weak so that dropping the last handle still shuts the actor down.
    input_tx: mpsc::WeakSender<ChannelInput>,
    input_rx: mpsc::Receiver<ChannelInput>,
}

impl ChannelActor {
    pub(crate) fn new(
        endpoint: Url,
        config: &BridgeConfig,
        bus: EventBus,
        input_tx: mpsc::WeakSender<ChannelInput>,
        input_rx: mpsc::Receiver<ChannelInput>,
    ) -> Self {
        Self {
            endpoint,
            connect_timeout: config.worker.connect_timeout(),
            backoff: config.reconnect.backoff(),
            state: ChannelState::Idle,
            queue: OutboundQueue::new(&config.queue),
            reconnect_at: None,
            writer: None,
            reader: None,
            generation: 0,
            bus,
            input_tx,
            input_rx,
        }
    }

    /// Process inputs until every [`BridgeHandle`](crate::channel::BridgeHandle) is dropped.
    pub(crate) async fn run(mut self) {
        info!("Channel actor started for {}", self.endpoint);

        loop {
            let deadline = self.reconnect_at;
            let reconnect_timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => pending::<()>().await,
                }
            };

            tokio::select! {
                input = self.input_rx.recv() => match input {
                    Some(input) => self.handle(input).await,
                    None => break,
                },
                () = reconnect_timer => self.on_reconnect_timer(),
            }
        }

        self.shutdown().await;
        info!("Channel actor stopped");
    }

    async fn handle(&mut self, input: ChannelInput) {
        match input {
            ChannelInput::Connect { reply } => {
                self.connect();
                let _ = reply.send(());
            }
            ChannelInput::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            ChannelInput::Send { message, reply } => {
                let receipt = self.send(message).await;
                let _ = reply.send(receipt);
            }
            ChannelInput::Status { reply } => {
                let _ = reply.send(self.status());
            }
            ChannelInput::Opened { generation, stream } => {
                self.on_opened(generation, *stream).await;
            }
            ChannelInput::ConnectFailed { generation, error } => {
                if self.is_current(generation) {
                    self.on_connect_failed(error);
                }
            }
            ChannelInput::Frame { generation, text } => {
                if self.is_current(generation) {
                    self.on_frame(&text);
                }
            }
            ChannelInput::TransportError {
                generation,
                message,
            } => {
                if self.is_current(generation) {
                    warn!("Channel transport error: {message}");
                    self.bus.publish(&BridgeEvent::Error { message });
                }
            }
            ChannelInput::Closed { generation, reason } => {
                if self.is_current(generation) && self.state == ChannelState::Connected {
                    self.on_closed(reason);
                }
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation != self.generation {
            trace!(
                "Ignoring report from connection generation {generation} (current {})",
                self.generation
            );
            return false;
        }
        true
    }

    // ============================================
    // CONNECTION LIFECYCLE
    // ============================================

    fn connect(&mut self) {
        if matches!(
            self.state,
            ChannelState::Connecting | ChannelState::Connected
        ) {
            debug!("connect() ignored, channel is {}", self.state);
            return;
        }

        let Some(input_tx) = self.input_tx.upgrade() else {
            return;
        };

        self.reconnect_at = None;
        self.generation += 1;
        self.state = ChannelState::Connecting;
        info!("Connecting to worker at {}", self.endpoint);

        tokio::spawn(open_connection(
            self.endpoint.clone(),
            self.connect_timeout,
            self.generation,
            input_tx,
        ));
    }

    async fn on_opened(&mut self, generation: u64, stream: WsStream) {
        if generation != self.generation || self.state != ChannelState::Connecting {
            debug!("Dropping connection from stale generation {generation}");
            return;
        }

        let Some(input_tx) = self.input_tx.upgrade() else {
            return;
        };

        let (writer, reader) = stream.split();
        self.writer = Some(writer);
        self.reader = Some(tokio::spawn(read_frames(reader, generation, input_tx)));
        self.state = ChannelState::Connected;
        self.reconnect_at = None;
        self.backoff.reset();
        info!("Connected to worker at {}", self.endpoint);

        self.flush_queue().await;
        self.bus.publish(&BridgeEvent::Connected);
    }

    fn on_connect_failed(&mut self, error: ChannelError) {
        warn!("Failed to connect to worker at {}: {error}", self.endpoint);
        self.state = ChannelState::Errored;
        self.bus.publish(&BridgeEvent::Error {
            message: error.to_string(),
        });
        self.schedule_reconnect();
    }

    fn on_closed(&mut self, reason: String) {
        warn!("Worker connection closed: {reason}");
        self.writer = None;
        self.reader = None;
        self.state = ChannelState::Closed;
        self.bus.publish(&BridgeEvent::Disconnected { reason });
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if let Some(at) = self.reconnect_at {
            debug!(
                "Reconnect already scheduled in {:?}",
                at.saturating_duration_since(Instant::now())
            );
            return;
        }

        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or(self.backoff.max_interval);
        self.reconnect_at = Some(Instant::now() + delay);
        self.state = ChannelState::ReconnectScheduled;
        info!("Reconnecting to worker in {delay:?}");
    }

    fn on_reconnect_timer(&mut self) {
        self.reconnect_at = None;
        debug!("Reconnect timer fired");
        self.connect();
    }

    async fn disconnect(&mut self) {
        self.reconnect_at = None;
        self.generation += 1;
        self.close_transport().await;
        self.state = ChannelState::Idle;
        self.backoff.reset();

        info!("Disconnected from worker ({MANUAL_DISCONNECT_REASON})");
        self.bus.publish(&BridgeEvent::Disconnected {
            reason: MANUAL_DISCONNECT_REASON.to_string(),
        });
    }

    async fn shutdown(&mut self) {
        self.reconnect_at = None;
        self.close_transport().await;
        if !self.queue.is_empty() {
            warn!(
                "Channel shutting down with {} undelivered message(s)",
                self.queue.len()
            );
        }
    }

    async fn close_transport(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.send(WsMessage::Close(None)).await {
                debug!("Close frame not delivered: {e}");
            }
            if let Err(e) = writer.close().await {
                debug!("Error closing worker socket: {e}");
            }
        }
    }

    // ============================================
    // OUTBOUND
    // ============================================

    async fn send(&mut self, message: Message) -> Result<CommandReceipt, CommandError> {
        let command_id = message.id().to_string();

        if self.state == ChannelState::Connected {
            return match self.transmit(&message).await {
                Ok(()) => Ok(CommandReceipt::sent(command_id)),
                Err(e) => {
                    warn!("Send of {command_id} failed, re-queued: {e}");
                    self.queue.requeue(message);
                    Ok(CommandReceipt::queued(command_id))
                }
            };
        }

        if let Some(evicted) = self.queue.enqueue(message)? {
            debug!("Evicted {} to make room for {command_id}", evicted.id());
        }
        debug!(
            "Queued {command_id} while {} ({} pending)",
            self.state,
            self.queue.len()
        );

        if self.state.wants_reconnect() {
            self.schedule_reconnect();
        }

        Ok(CommandReceipt::queued(command_id))
    }

    async fn transmit(&mut self, message: &Message) -> Result<(), CommandError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(ChannelError::Closed {
                message: "No open connection to the worker".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        };

        let frame = message.to_frame()?;
        writer
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(ChannelError::from)?;

        trace!("Sent {} ({})", message.id(), message.command());
        Ok(())
    }

    /// Drain a snapshot of the queue in FIFO order. Anything that fails goes
    /// back on the end of the queue.
    async fn flush_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let pending = self.queue.take_all();
        let total = pending.len();
        let mut sent = 0;

        for message in pending {
            match self.transmit(&message).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!("Flush of {} failed, re-queued: {e}", message.id());
                    self.queue.requeue(message);
                }
            }
        }

        info!("Flushed {sent}/{total} queued message(s)");
    }

    // ============================================
    // INBOUND
    // ============================================

    fn on_frame(&self, text: &str) {
        match InboundEvent::parse(text) {
            Ok(inbound) => {
                let event = dispatch(inbound);
                trace!("Dispatching {} event", event.kind());
                self.bus.publish(&event);
            }
            Err(e) => warn!("Dropping malformed worker frame: {e}"),
        }
    }

    fn status(&self) -> BridgeStatus {
        BridgeStatus {
            connected: self.state == ChannelState::Connected,
            queued_messages: self.queue.len(),
            has_reconnect_timer: self.reconnect_at.is_some(),
            state: self.state,
        }
    }
}

#[cfg(test)]
impl ChannelActor {
    /// Take the next input without handling it, for stepping the actor by hand.
    pub(crate) async fn next_input(&mut self) -> Option<ChannelInput> {
        self.input_rx.recv().await
    }

    pub(crate) async fn apply(&mut self, input: ChannelInput) {
        self.handle(input).await;
    }

    pub(crate) fn current_status(&self) -> BridgeStatus {
        self.status()
    }
}

// ============================================
// HELPER TASKS
// ============================================

async fn open_connection(
    endpoint: Url,
    connect_timeout: Duration,
    generation: u64,
    input_tx: mpsc::Sender<ChannelInput>,
) {
    let input = match timeout(connect_timeout, connect_async(endpoint.as_str())).await {
        Ok(Ok((stream, _response))) => ChannelInput::Opened {
            generation,
            stream: Box::new(stream),
        },
        Ok(Err(e)) => ChannelInput::ConnectFailed {
            generation,
            error: ChannelError::Connect {
                message: format!("{endpoint}: {e}"),
                location: ErrorLocation::from(Location::caller()),
            },
        },
        Err(_) => ChannelInput::ConnectFailed {
            generation,
            error: ChannelError::Timeout {
                message: format!("{endpoint} did not open within {connect_timeout:?}"),
                location: ErrorLocation::from(Location::caller()),
            },
        },
    };

    if input_tx.send(input).await.is_err() {
        debug!("Channel actor gone before connect to {endpoint} finished");
    }
}

async fn read_frames(mut reader: WsReader, generation: u64, input_tx: mpsc::Sender<ChannelInput>) {
    let reason = loop {
        let input = match reader.next().await {
            Some(Ok(WsMessage::Text(text))) => ChannelInput::Frame {
                generation,
                text: text.as_str().to_owned(),
            },
            Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => ChannelInput::Frame { generation, text },
                Err(e) => {
                    warn!("Dropping non UTF-8 binary frame: {e}");
                    continue;
                }
            },
            Some(Ok(WsMessage::Close(frame))) => {
                break frame
                    .map(|f| format!("{} ({})", f.reason.as_str(), u16::from(f.code)))
                    .unwrap_or_else(|| CLOSED_BY_WORKER.to_string());
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                let message = e.to_string();
                if input_tx
                    .send(ChannelInput::TransportError {
                        generation,
                        message: message.clone(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                break message;
            }
            None => break STREAM_ENDED.to_string(),
        };

        if input_tx.send(input).await.is_err() {
            return;
        }
    };

    if input_tx
        .send(ChannelInput::Closed { generation, reason })
        .await
        .is_err()
    {
        error!("Channel actor gone while reporting close of generation {generation}");
    }
}
