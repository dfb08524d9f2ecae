//! Notification actor: owns the [`SurfaceStack`] and the animation clock.
//!
//! # Architecture
//!
//! - Worker `notification` events arrive through an [`EventBus`] subscription
//!   and are turned into [`NotificationCommand`]s
//! - Host surface events and local calls arrive through [`NotificationHandle`]
//! - A single interval ticks every animating surface and only runs while
//!   something is fading

use crate::NOTIFICATION_ACTION_COMMAND;
use crate::channel::BridgeHandle;
use crate::config::LayoutConfig;
use crate::error::surface::SurfaceError;
use crate::fanout::{BridgeEvent, EventBus, EventKind, SubscriptionId};
use crate::notification::host::SurfaceHost;
use crate::notification::model::{Notification, SurfaceEvent, SurfaceSnapshot};
use crate::notification::stack::SurfaceStack;

use common::ErrorLocation;

use std::panic::Location;

use log::{debug, info, warn};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};

const COMMAND_CHANNEL_CAPACITY: usize = 100;

const EVENT_SHOW_CUSTOM: &str = "show_custom";
const EVENT_DISMISS: &str = "dismiss";
const EVENT_DISMISS_ALL: &str = "dismiss_all";

/// Mutations of the notification stack.
#[derive(Debug)]
pub enum NotificationCommand {
    Show(Notification),
    Dismiss(String),
    DismissAll,
    Surface(SurfaceEvent),
    Snapshot {
        reply: oneshot::Sender<Vec<SurfaceSnapshot>>,
    },
}

/// Map a worker `notification` event to the command it implies, if any.
///
/// `show_modal` and unknown sub-events are left to UI subscribers.
pub fn command_from_event(event: &BridgeEvent) -> Option<NotificationCommand> {
    let BridgeEvent::Notification { event, data } = event else {
        return None;
    };

    match event.as_deref() {
        Some(EVENT_SHOW_CUSTOM) => {
            let payload = data.get("notification")?.clone();
            match serde_json::from_value::<Notification>(payload) {
                Ok(notification) => Some(NotificationCommand::Show(notification)),
                Err(e) => {
                    warn!("Dropping malformed show_custom notification: {e}");
                    None
                }
            }
        }
        Some(EVENT_DISMISS) => data
            .get("notification_id")
            .and_then(Value::as_str)
            .map(|id| NotificationCommand::Dismiss(id.to_string())),
        Some(EVENT_DISMISS_ALL) => Some(NotificationCommand::DismissAll),
        other => {
            debug!("Notification event {other:?} not handled by the surface stack");
            None
        }
    }
}

/// Handle to the notification actor.
///
/// # Thread Safety
///
/// This type is `Clone` and can be shared across threads/tasks. The actor stops
/// once the last clone is dropped, releasing its host and bridge handle.
#[derive(Clone)]
pub struct NotificationHandle {
    command_tx: mpsc::Sender<NotificationCommand>,
    bus: EventBus,
    subscription: SubscriptionId,
}

impl NotificationHandle {
    /// Spawn the actor and subscribe it to `notification` events on `bridge`'s bus.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<H>(host: H, layout: LayoutConfig, bridge: BridgeHandle) -> Self
    where
        H: SurfaceHost + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let bus = bridge.bus().clone();

        // Weak: the subscription must not keep the actor alive.
        let events_tx = command_tx.downgrade();
        let subscription = bus.subscribe(EventKind::Notification, move |event| {
            let Some(events_tx) = events_tx.upgrade() else {
                return;
            };
            if let Some(command) = command_from_event(event)
                && let Err(e) = events_tx.try_send(command)
            {
                warn!("Notification actor not accepting commands: {e}");
            }
        });

        let actor = NotificationActor {
            stack: SurfaceStack::new(host, layout),
            bridge,
        };
        tokio::spawn(actor.run(command_rx));
        info!("Notification service spawned");

        Self {
            command_tx,
            bus,
            subscription,
        }
    }

    pub async fn show(&self, notification: Notification) -> Result<(), SurfaceError> {
        self.submit(NotificationCommand::Show(notification)).await
    }

    pub async fn dismiss(&self, id: impl Into<String>) -> Result<(), SurfaceError> {
        self.submit(NotificationCommand::Dismiss(id.into())).await
    }

    pub async fn dismiss_all(&self) -> Result<(), SurfaceError> {
        self.submit(NotificationCommand::DismissAll).await
    }

    /// Report something the host observed on a surface.
    pub async fn surface_event(&self, event: SurfaceEvent) -> Result<(), SurfaceError> {
        self.submit(NotificationCommand::Surface(event)).await
    }

    pub async fn snapshot(&self) -> Result<Vec<SurfaceSnapshot>, SurfaceError> {
        let (reply, response) = oneshot::channel();
        self.submit(NotificationCommand::Snapshot { reply }).await?;
        response.await.map_err(|_| unavailable())
    }

    /// Stop reacting to worker notification events. Surfaces already shown stay
    /// until dismissed.
    pub fn detach(&self) -> bool {
        self.bus.unsubscribe(EventKind::Notification, self.subscription)
    }

    async fn submit(&self, command: NotificationCommand) -> Result<(), SurfaceError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| unavailable())
    }
}

#[track_caller]
fn unavailable() -> SurfaceError {
    SurfaceError::ServiceUnavailable {
        message: "Notification actor has stopped".to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

struct NotificationActor<H: SurfaceHost> {
    stack: SurfaceStack<H>,
    bridge: BridgeHandle,
}

impl<H: SurfaceHost> NotificationActor<H> {
    /// Runs until every [`NotificationHandle`] is gone.
    async fn run(mut self, mut command_rx: mpsc::Receiver<NotificationCommand>) {
        info!("Notification actor started");

        let mut ticker = interval(self.stack.layout().fade_step());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.stack.is_animating() {
                tokio::select! {
                    command = command_rx.recv() => match command {
                        Some(command) => self.handle(command).await,
                        None => break,
                    },
                    _ = ticker.tick() => {
                        self.stack.tick();
                    }
                }
            } else {
                let Some(command) = command_rx.recv().await else {
                    break;
                };
                self.handle(command).await;
                // First step one period from now, not immediately.
                ticker.reset();
            }
        }

        self.stack.close_all();
        info!("Notification actor stopped");
    }

    async fn handle(&mut self, command: NotificationCommand) {
        match command {
            NotificationCommand::Show(notification) => {
                self.stack.show(notification);
            }
            NotificationCommand::Dismiss(id) => {
                self.stack.dismiss(&id);
            }
            NotificationCommand::DismissAll => {
                let count = self.stack.dismiss_all();
                debug!("Dismissing all {count} notification(s)");
            }
            NotificationCommand::Surface(SurfaceEvent::ContentReady { id }) => {
                self.stack.content_ready(&id);
            }
            NotificationCommand::Surface(SurfaceEvent::Closed { id }) => {
                self.stack.surface_closed(&id);
            }
            NotificationCommand::Surface(SurfaceEvent::Action { id, action, data }) => {
                let data = data
                    .or_else(|| self.stack.notification(&id).map(|n| n.data.clone()))
                    .unwrap_or_else(|| json!({}));
                forward_action(&self.bridge, &id, &action, data).await;
                self.stack.dismiss(&id);
            }
            NotificationCommand::Snapshot { reply } => {
                let _ = reply.send(self.stack.snapshot());
            }
        }
    }
}

/// Tell the worker which action the user picked. Local dismissal follows
/// regardless of the outcome.
async fn forward_action(bridge: &BridgeHandle, id: &str, action: &str, data: Value) {
    let payload = json!({
        "notification_id": id,
        "action": action,
        "data": data,
    });

    match bridge
        .send_command(NOTIFICATION_ACTION_COMMAND, &payload)
        .await
    {
        Ok(receipt) if receipt.queued => {
            info!("Action '{action}' on {id} queued ({})", receipt.command_id)
        }
        Ok(receipt) => info!("Action '{action}' on {id} sent ({})", receipt.command_id),
        Err(e) => warn!("Failed to forward action '{action}' on {id}: {e}"),
    }
}
