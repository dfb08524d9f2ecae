use crate::channel::actor::{ChannelActor, ChannelInput};
use crate::channel::state::BridgeStatus;
use crate::config::BridgeConfig;
use crate::error::channel::ChannelError;
use crate::error::command::CommandError;
use crate::fanout::{BridgeEvent, EventBus, EventKind, SubscriptionId};
use crate::router::{CommandReceipt, Message};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

const INPUT_CHANNEL_CAPACITY: usize = 100;
const WORKER_FAILURE_MESSAGE: &str = "command failed";

/// Command surface of the bridge.
///
/// Every method is a message to the channel actor, so calls from any number of
/// tasks are applied in the order the actor receives them.
///
/// # Thread Safety
///
/// This type is `Clone` and can be shared across threads/tasks. All clones
/// drive the same connection. The actor stops once the last clone is dropped.
#[derive(Clone)]
pub struct BridgeHandle {
    input_tx: mpsc::Sender<ChannelInput>,
    bus: EventBus,
}

impl BridgeHandle {
    /// Spawn the channel actor for `config.worker` and return its handle.
    ///
    /// The channel starts `Idle`; nothing is dialled until [`connect`](Self::connect).
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidEndpoint`] if host/port don't form a valid URL.
    pub fn spawn(config: &BridgeConfig, bus: EventBus) -> Result<Self, ChannelError> {
        let endpoint = config.worker.ws_url()?;
        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);

        let actor = ChannelActor::new(endpoint, config, bus.clone(), input_tx.downgrade(), input_rx);
        tokio::spawn(actor.run());
        info!("Bridge channel spawned");

        Ok(Self { input_tx, bus })
    }

    /// Start connecting. No-op while already connecting or connected.
    ///
    /// Returns once the actor has accepted the request, not when the socket opens;
    /// watch for [`BridgeEvent::Connected`].
    pub async fn connect(&self) -> Result<(), ChannelError> {
        let (reply, response) = oneshot::channel();
        self.submit(ChannelInput::Connect { reply }).await?;
        response.await.map_err(|_| actor_gone())
    }

    /// Close the connection, cancel any pending reconnect and stay `Idle`.
    pub async fn disconnect(&self) -> Result<(), ChannelError> {
        let (reply, response) = oneshot::channel();
        self.submit(ChannelInput::Disconnect { reply }).await?;
        response.await.map_err(|_| actor_gone())
    }

    /// Send `{command, data}` to the worker, or queue it if the channel isn't open.
    ///
    /// # Errors
    ///
    /// - [`CommandError::Serialization`] if `data` can't be turned into JSON
    /// - [`CommandError::QueueFull`] if the queue is bounded with the `reject` policy and full
    /// - [`CommandError::Channel`] if the actor is gone
    pub async fn send_command<T>(&self, command: &str, data: &T) -> Result<CommandReceipt, CommandError>
    where
        T: Serialize + ?Sized,
    {
        let message = Message::from_serializable(command, data)?;
        self.send_message(message).await
    }

    /// Send an already-built [`Message`].
    pub async fn send_message(&self, message: Message) -> Result<CommandReceipt, CommandError> {
        let (reply, response) = oneshot::channel();
        self.submit(ChannelInput::Send { message, reply }).await?;
        response.await.map_err(|_| actor_gone())?
    }

    /// Send a command and wait for the worker's `response` frame for it.
    ///
    /// The worker echoes the command name, not the message id, so responses are
    /// matched by command. `timeout` covers queueing time as well.
    ///
    /// # Errors
    ///
    /// - Anything [`send_command`](Self::send_command) returns
    /// - [`CommandError::Timeout`] if no response arrives in time
    /// - [`CommandError::Worker`] if the response carries `success: false`
    pub async fn request<T>(
        &self,
        command: &str,
        data: &T,
        timeout: Duration,
    ) -> Result<Value, CommandError>
    where
        T: Serialize + ?Sized,
    {
        let (response_tx, response_rx) = oneshot::channel::<Value>();
        let slot = Arc::new(Mutex::new(Some(response_tx)));
        let expected = command.to_string();

        let subscription = self.bus.subscribe(EventKind::Response, move |event| {
            if let BridgeEvent::Response { command, data } = event
                && *command == expected
                && let Some(response_tx) = slot.lock().unwrap_or_else(PoisonError::into_inner).take()
            {
                let _ = response_tx.send(data.clone());
            }
        });

        let outcome = self.await_response(command, data, timeout, response_rx).await;
        self.bus.unsubscribe(EventKind::Response, subscription);

        let data = outcome?;
        if data.get("success").and_then(Value::as_bool) == Some(false) {
            let message = data
                .get("message")
                .or_else(|| data.get("error"))
                .and_then(Value::as_str)
                .unwrap_or(WORKER_FAILURE_MESSAGE)
                .to_string();
            return Err(CommandError::Worker {
                command: command.to_string(),
                message,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(data)
    }

    async fn await_response<T>(
        &self,
        command: &str,
        data: &T,
        timeout: Duration,
        response_rx: oneshot::Receiver<Value>,
    ) -> Result<Value, CommandError>
    where
        T: Serialize + ?Sized,
    {
        let receipt = self.send_command(command, data).await?;
        debug!(
            "Awaiting response to {} ({})",
            receipt.command_id,
            if receipt.queued { "queued" } else { "sent" }
        );

        match tokio::time::timeout(timeout, response_rx).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(_)) | Err(_) => Err(CommandError::Timeout {
                message: format!("No response to '{command}' within {timeout:?}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    pub async fn status(&self) -> Result<BridgeStatus, ChannelError> {
        let (reply, response) = oneshot::channel();
        self.submit(ChannelInput::Status { reply }).await?;
        response.await.map_err(|_| actor_gone())
    }

    /// Register `handler` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&BridgeEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(kind, id)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    async fn submit(&self, input: ChannelInput) -> Result<(), ChannelError> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| ChannelError::ActorUnavailable {
                message: "Channel actor has stopped".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

#[track_caller]
fn actor_gone() -> ChannelError {
    ChannelError::ActorUnavailable {
        message: "Channel actor dropped the reply".to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
