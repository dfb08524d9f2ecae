// Unit tests for process module private functions

use crate::worker::process::{format_command, is_listening, is_running, stop_child, with_process};

use serial_test::serial;
use tokio::net::TcpListener;

/// **VALUE**: Tests that `with_process()` finds a live process and runs the closure.
///
/// **BUG THIS CATCHES**: Would catch a refresh that never loads the requested pid,
/// which would make every stop look like the process already exited.
#[test]
fn given_valid_pid_when_with_process_called_then_executes_closure() {
    // GIVEN: Our own PID
    let our_pid = std::process::id();

    // WHEN
    let result = with_process(our_pid, |p| (p.pid().as_u32(), format_command(p)));

    // THEN
    let (pid, command) = result.expect("should find our own process");
    assert_eq!(pid, our_pid);
    assert!(!command.is_empty(), "command line should not be empty");
}

/// **VALUE**: Non-existent PIDs are reported as absent, not as errors.
#[test]
fn given_nonexistent_pid_when_is_running_then_false() {
    assert!(!is_running(u32::MAX));
    assert!(with_process(u32::MAX, |_| true).is_none());
}

/// **VALUE**: The readiness probe distinguishes a listening port from a closed one.
#[tokio::test]
#[serial]
async fn given_listener_when_probed_then_listening_until_dropped() {
    // GIVEN: A bound listener on an ephemeral port
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    // WHEN/THEN: Listening while bound
    assert!(is_listening("127.0.0.1", port).await);

    // WHEN/THEN: Not listening once dropped
    drop(listener);
    assert!(!is_listening("127.0.0.1", port).await);
}

/// **VALUE**: Stopping a child terminates and reaps it.
///
/// **BUG THIS CATCHES**: A stop that only signals without waiting leaves a
/// zombie, and `is_running` would keep reporting it alive.
#[cfg(unix)]
#[tokio::test]
#[serial]
async fn given_running_child_when_stop_child_then_process_gone() {
    // GIVEN: A long-running child
    let child = tokio::process::Command::new("sleep")
        .arg("30")
        .spawn()
        .expect("sleep should be available on unix");
    let pid = child.id().expect("running child has a pid");
    assert!(is_running(pid));

    // WHEN
    let result = stop_child(child).await;

    // THEN
    assert!(result.is_ok(), "stop failed: {result:?}");
    assert!(!is_running(pid), "PID {pid} should be gone");
}
