//! Process-wide wiring: one context constructed at start-up and passed to
//! everything that needs the bridge.

use crate::channel::BridgeHandle;
use crate::config::{BridgeConfig, LayoutConfig};
use crate::error::CoreError;
use crate::fanout::EventBus;
use crate::notification::{NotificationHandle, SurfaceHost};
use crate::worker::{WorkerInfo, WorkerSupervisor};

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;

/// Bus, channel, notification service and worker supervisor for one host.
///
/// # Thread Safety
///
/// This type is `Clone`; all clones share the same components.
#[derive(Clone)]
pub struct BridgeContext {
    config: Arc<BridgeConfig>,
    bus: EventBus,
    bridge: BridgeHandle,
    notifications: NotificationHandle,
    worker: Arc<Mutex<WorkerSupervisor>>,
}

impl BridgeContext {
    /// Build every component. Nothing connects or spawns until [`startup`](Self::startup).
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if `config` is invalid, or
    /// [`CoreError::Channel`] if the worker endpoint is not a valid URL.
    pub fn new<H>(config: BridgeConfig, layout: LayoutConfig, host: H) -> Result<Self, CoreError>
    where
        H: SurfaceHost + 'static,
    {
        config.validate()?;
        layout.validate()?;

        let bus = EventBus::new();
        let bridge = BridgeHandle::spawn(&config, bus.clone())?;
        let notifications = NotificationHandle::spawn(host, layout, bridge.clone());
        let worker = WorkerSupervisor::new(config.worker.clone());

        Ok(Self {
            config: Arc::new(config),
            bus,
            bridge,
            notifications,
            worker: Arc::new(Mutex::new(worker)),
        })
    }

    /// Start the worker if configured to, then open the channel.
    ///
    /// A worker that fails to start is logged, not fatal: the channel keeps
    /// retrying and commands queue until something listens.
    pub async fn startup(&self) -> Result<Option<WorkerInfo>, CoreError> {
        let worker = if self.config.worker.auto_start {
            match self.worker.lock().await.start().await {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!("Worker auto-start failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        self.bridge.connect().await?;
        info!("Bridge started");
        Ok(worker)
    }

    /// Close the channel and stop the worker if we own it.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        if let Err(e) = self.notifications.dismiss_all().await {
            warn!("Could not dismiss notifications on shutdown: {e}");
        }
        self.bridge.disconnect().await?;
        self.worker.lock().await.stop().await?;
        info!("Bridge shut down");
        Ok(())
    }

    /// Restart the worker and reconnect to it.
    pub async fn restart_worker(&self) -> Result<WorkerInfo, CoreError> {
        self.bridge.disconnect().await?;
        let info = self.worker.lock().await.restart().await?;
        self.bridge.connect().await?;
        Ok(info)
    }

    pub async fn worker_info(&self) -> Option<WorkerInfo> {
        self.worker.lock().await.info().cloned()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bridge(&self) -> &BridgeHandle {
        &self.bridge
    }

    pub fn notifications(&self) -> &NotificationHandle {
        &self.notifications
    }
}
