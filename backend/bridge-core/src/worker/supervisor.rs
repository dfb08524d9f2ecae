use crate::config::WorkerConfig;
use crate::error::spawn::SpawnError;
use crate::worker::process::{is_listening, stop_child};
use crate::worker::spawn::{spawn_worker, wait_until_listening};

use log::{info, warn};
use serde::Serialize;
use tokio::process::Child as TokioChild;

/// The worker we are talking to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInfo {
    /// `None` for an adopted worker; we only know the pid of what we spawned.
    pub pid: Option<u32>,
    pub host: String,
    pub port: u16,
    /// `true` if we spawned it and are responsible for stopping it.
    pub owned: bool,
}

/// Start/stop/restart of a single worker on the configured endpoint.
pub struct WorkerSupervisor {
    config: WorkerConfig,
    child: Option<TokioChild>,
    info: Option<WorkerInfo>,
}

impl WorkerSupervisor {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            child: None,
            info: None,
        }
    }

    pub fn info(&self) -> Option<&WorkerInfo> {
        self.info.as_ref()
    }

    pub fn is_owned(&self) -> bool {
        self.info.as_ref().is_some_and(|info| info.owned)
    }

    /// Make sure a worker is listening on the configured endpoint.
    ///
    /// Adopts a worker that is already listening; otherwise spawns the
    /// configured program and waits until it accepts connections. A spawned
    /// worker that never becomes ready is stopped again.
    ///
    /// # Errors
    ///
    /// - [`SpawnError::Validation`] if a spawn is needed and no program is configured
    /// - [`SpawnError::Spawn`] if the program can't be launched
    /// - [`SpawnError::Timeout`] if it doesn't listen within `ready_timeout_ms`
    pub async fn start(&mut self) -> Result<WorkerInfo, SpawnError> {
        if let Some(info) = self.current().await {
            return Ok(info);
        }

        let host = self.config.host.clone();
        let port = self.config.port;

        if is_listening(&host, port).await {
            info!("Adopting worker already listening on {host}:{port}");
            return Ok(self.remember(None, false));
        }

        let child = spawn_worker(&self.config)?;
        let pid = child.id();

        if let Err(e) = wait_until_listening(&host, port, self.config.ready_timeout()).await {
            warn!("Worker (PID: {pid:?}) never became ready, stopping it");
            if let Err(stop_error) = stop_child(child).await {
                warn!("Failed to stop unready worker: {stop_error}");
            }
            return Err(e);
        }

        info!("Worker ready on {host}:{port} (PID: {pid:?})");
        self.child = Some(child);
        Ok(self.remember(pid, true))
    }

    /// Stop the worker if we own it. Adopted workers are left running.
    ///
    /// Returns whether a process was stopped.
    pub async fn stop(&mut self) -> Result<bool, SpawnError> {
        let info = self.info.take();

        let Some(child) = self.child.take() else {
            if let Some(info) = info {
                info!(
                    "Leaving adopted worker on {}:{} running",
                    info.host, info.port
                );
            }
            return Ok(false);
        };

        info!("Stopping worker (PID: {:?})", child.id());
        stop_child(child).await?;
        info!("Worker stopped");
        Ok(true)
    }

    pub async fn restart(&mut self) -> Result<WorkerInfo, SpawnError> {
        self.stop().await?;
        self.start().await
    }

    /// The remembered worker, if it is still there.
    async fn current(&mut self) -> Option<WorkerInfo> {
        let info = self.info.clone()?;

        let alive = match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => is_listening(&info.host, info.port).await,
        };

        if alive {
            return Some(info);
        }

        warn!("Worker on {}:{} has gone away", info.host, info.port);
        self.child = None;
        self.info = None;
        None
    }

    fn remember(&mut self, pid: Option<u32>, owned: bool) -> WorkerInfo {
        let info = WorkerInfo {
            pid,
            host: self.config.host.clone(),
            port: self.config.port,
            owned,
        };
        self.info = Some(info.clone());
        info
    }
}
