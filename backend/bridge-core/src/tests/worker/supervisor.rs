// Unit tests for worker start/stop/restart

use crate::config::WorkerConfig;
use crate::error::spawn::SpawnError;
use crate::worker::WorkerSupervisor;
use crate::worker::spawn::spawn_worker;

use serial_test::serial;
use tokio::net::TcpListener;

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr").port()
}

/// **VALUE**: A worker that is already running is adopted, not duplicated, and
/// is left running on stop.
///
/// **WHY THIS MATTERS**: Developers often run the worker by hand; spawning a
/// second one would fail on the port, and stopping theirs would be rude.
#[tokio::test]
#[serial]
async fn given_listening_worker_when_start_then_adopted_and_not_stopped() {
    // GIVEN: Something listening on the worker port
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let mut supervisor = WorkerSupervisor::new(WorkerConfig {
        port,
        ..Default::default()
    });

    // WHEN
    let info = supervisor.start().await.expect("adopt should succeed");
    let stopped = supervisor.stop().await.expect("stop should succeed");

    // THEN
    assert!(!info.owned);
    assert_eq!(info.pid, None);
    assert_eq!(info.port, port);
    assert!(!stopped, "adopted worker must not be stopped");
    assert!(supervisor.info().is_none());
    drop(listener);
}

/// **VALUE**: Starting with nothing listening and no program configured fails clearly.
#[tokio::test]
#[serial]
async fn given_no_program_when_start_then_validation_error() {
    // GIVEN: Free port, no program
    let mut supervisor = WorkerSupervisor::new(WorkerConfig {
        port: free_port().await,
        ..Default::default()
    });

    // WHEN
    let result = supervisor.start().await;

    // THEN
    assert!(matches!(result, Err(SpawnError::Validation { .. })));
    assert!(supervisor.info().is_none());
}

/// **VALUE**: A program that doesn't exist on PATH or next to the executable is a spawn error.
#[tokio::test]
async fn given_missing_program_when_spawn_worker_then_spawn_error() {
    // GIVEN
    let config = WorkerConfig {
        program: Some("deploybot-worker-that-does-not-exist".to_string()),
        ..Default::default()
    };

    // WHEN
    let result = spawn_worker(&config);

    // THEN
    assert!(matches!(result, Err(SpawnError::Spawn { .. })));
}

/// **VALUE**: A spawned worker that never listens is stopped and reported as a timeout.
///
/// **BUG THIS CATCHES**: Leaking an orphaned worker every time start-up times out.
#[cfg(unix)]
#[tokio::test]
#[serial]
async fn given_worker_never_listens_when_start_then_timeout_and_not_owned() {
    // GIVEN: "sleep" as the worker, which never opens the port
    let mut supervisor = WorkerSupervisor::new(WorkerConfig {
        port: free_port().await,
        program: Some("sleep".to_string()),
        args: vec!["30".to_string()],
        ready_timeout_ms: 300,
        ..Default::default()
    });

    // WHEN
    let result = supervisor.start().await;

    // THEN
    assert!(matches!(result, Err(SpawnError::Timeout { .. })));
    assert!(!supervisor.is_owned());
    assert!(!supervisor.stop().await.expect("nothing to stop"));
}
