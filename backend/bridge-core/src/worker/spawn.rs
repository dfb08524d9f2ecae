use crate::config::WorkerConfig;
use crate::error::spawn::SpawnError;
use crate::worker::process::is_listening;

use common::ErrorLocation;

use std::env::current_exe;
use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;
use std::process::Stdio;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child as TokioChild;
use tokio::process::Command as TokioCommand;
use tokio::spawn as TokioSpawn;
use tokio::time::sleep as TokioSleep;

const READY_MAX_INTERVAL: Duration = Duration::from_secs(2);

pub(crate) fn build_spawn_command(program: &str, args: &[String]) -> TokioCommand {
    let mut cmd = TokioCommand::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Launch the configured worker program.
///
/// Looks the program up on `PATH` first, then next to the current executable
/// (where a bundled worker lives). Output is drained to `trace!`.
///
/// # Errors
///
/// - [`SpawnError::Validation`] if no program is configured
/// - [`SpawnError::Spawn`] if neither location can be executed
pub fn spawn_worker(config: &WorkerConfig) -> Result<TokioChild, SpawnError> {
    let program = config
        .program
        .as_deref()
        .map(str::trim)
        .filter(|program| !program.is_empty())
        .ok_or_else(|| SpawnError::Validation {
            message: "No worker program configured".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    debug!("Attempting to spawn {program} from PATH");

    let mut child = match build_spawn_command(program, &config.args).spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{program} not in PATH, trying next to the executable");
            spawn_local_binary(program, &config.args)?
        }
        Err(err) => {
            return Err(SpawnError::Spawn {
                message: format!("Failed to spawn {program}: {err}"),
                location: ErrorLocation::from(Location::caller()),
                source: Box::new(err),
            });
        }
    };

    info!("Spawned worker {program} (PID: {:?})", child.id());

    if let Some(stdout) = child.stdout.take() {
        drain_output(stdout, "stdout");
    }
    if let Some(stderr) = child.stderr.take() {
        drain_output(stderr, "stderr");
    }

    Ok(child)
}

fn spawn_local_binary(program: &str, args: &[String]) -> Result<TokioChild, SpawnError> {
    let exe = current_exe().map_err(|e| SpawnError::Spawn {
        message: format!("Failed to get current executable path: {e}"),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })?;

    let dir = exe.parent().ok_or_else(|| SpawnError::Spawn {
        message: format!("Executable has no parent directory: {}", exe.display()),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(IoError::new(ErrorKind::NotFound, "no parent dir")),
    })?;

    let local_path = dir.join(program);
    debug!("Attempting to spawn from {}", local_path.display());

    build_spawn_command(&local_path.to_string_lossy(), args)
        .current_dir(dir)
        .spawn()
        .map_err(|e| SpawnError::Spawn {
            message: format!("Failed to spawn {program} from {}: {e}", local_path.display()),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        })
}

fn drain_output<R>(stream: R, name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    TokioSpawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            trace!("Worker {name}: {line}");
        }
    });
}

/// Poll `host:port` with exponential backoff until it accepts connections.
///
/// # Errors
///
/// Returns [`SpawnError::Timeout`] if it is still closed after `ready_timeout`.
pub async fn wait_until_listening(
    host: &str,
    port: u16,
    ready_timeout: Duration,
) -> Result<(), SpawnError> {
    let mut backoff = ExponentialBackoff {
        max_interval: READY_MAX_INTERVAL,
        max_elapsed_time: Some(ready_timeout),
        ..Default::default()
    };

    debug!("Waiting for worker to listen on {host}:{port}");

    loop {
        if is_listening(host, port).await {
            info!("Worker is listening on {host}:{port}");
            return Ok(());
        }

        match backoff.next_backoff() {
            Some(duration) => {
                trace!("Worker not ready, retrying after {duration:?}");
                TokioSleep(duration).await;
            }
            None => {
                return Err(SpawnError::Timeout {
                    message: format!(
                        "Worker on {host}:{port} did not start listening within {ready_timeout:?}"
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
    }
}
