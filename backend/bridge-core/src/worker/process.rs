use crate::error::spawn::SpawnError;

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, trace, warn};
use sysinfo::{Pid, Process, ProcessesToUpdate, Signal, System};
use tokio::net::TcpStream;
use tokio::process::Child as TokioChild;
use tokio::time::{sleep as TokioSleep, timeout};

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const TERMINATE_MAX_ELAPSED: Duration = Duration::from_secs(5);

/// Run `f` against a fresh snapshot of process `pid`, if it exists.
pub(crate) fn with_process<F, R>(pid: u32, f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    sys.process(pid).map(f)
}

pub(crate) fn format_command(process: &Process) -> String {
    process
        .cmd()
        .iter()
        .map(|s| s.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a process with this pid currently exists.
pub fn is_running(pid: u32) -> bool {
    with_process(pid, |_| true).unwrap_or(false)
}

/// Whether something accepts TCP connections on `host:port`.
pub async fn is_listening(host: &str, port: u16) -> bool {
    match timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => {
            trace!("{host}:{port} is accepting connections");
            true
        }
        Ok(Err(e)) => {
            trace!("{host}:{port} not accepting connections: {e}");
            false
        }
        Err(_) => {
            trace!("{host}:{port} probe timed out after {PROBE_TIMEOUT:?}");
            false
        }
    }
}

/// Ask process `pid` to exit: SIGTERM where supported, otherwise a hard kill.
///
/// # Returns
///
/// * `true` - If a signal was delivered
/// * `false` - If the process doesn't exist or refused the signal
pub fn terminate(pid: u32) -> bool {
    with_process(pid, |p| {
        if let Some(sent) = p.kill_with(Signal::Term) {
            debug!(
                "Sent SIGTERM to PID {pid} ({}): success={sent}",
                format_command(p)
            );
            sent
        } else {
            let killed = p.kill();
            debug!("Sent SIGKILL to PID {pid}: success={killed}");
            killed
        }
    })
    .unwrap_or_else(|| {
        debug!("Process {pid} not found");
        false
    })
}

/// Stop a child we spawned: terminate, verify the exit with exponential
/// backoff (5 s cap), then force kill if it is still running.
///
/// The child is reaped either way.
///
/// # Errors
///
/// Returns [`SpawnError::Stop`] if the exit status can't be collected.
pub async fn stop_child(mut child: TokioChild) -> Result<(), SpawnError> {
    let Some(pid) = child.id() else {
        debug!("Worker already exited");
        return Ok(());
    };

    if !terminate(pid) {
        warn!("Could not signal worker PID {pid}, checking whether it already exited");
    }

    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(TERMINATE_MAX_ELAPSED),
        ..Default::default()
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Worker PID {pid} exited with {status}");
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                return Err(SpawnError::Stop {
                    message: format!("Failed to query worker PID {pid}: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        match backoff.next_backoff() {
            Some(duration) => {
                trace!("Worker PID {pid} still running, retrying after {duration:?}");
                TokioSleep(duration).await;
            }
            None => break,
        }
    }

    warn!("Worker PID {pid} ignored SIGTERM for {TERMINATE_MAX_ELAPSED:?}, killing");
    child.kill().await.map_err(|e| SpawnError::Stop {
        message: format!("Failed to kill worker PID {pid}: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}
