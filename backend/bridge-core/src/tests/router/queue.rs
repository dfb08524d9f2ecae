// Unit tests for the outbound queue

use crate::config::{OverflowPolicy, QueueConfig};
use crate::error::command::CommandError;
use crate::router::{Message, OutboundQueue};

use serde_json::json;

fn message(command: &str) -> Message {
    Message::new(command, json!({}))
}

fn commands(queue: &OutboundQueue) -> Vec<String> {
    queue.iter().map(|m| m.command().to_string()).collect()
}

/// **VALUE**: Messages come out in the order they went in and the queue is left empty.
#[test]
fn given_queued_messages_when_take_all_then_fifo_and_cleared() {
    // GIVEN: Unbounded queue with three messages
    let mut queue = OutboundQueue::new(&QueueConfig::default());
    for command in ["a", "b", "c"] {
        queue.enqueue(message(command)).expect("unbounded");
    }

    // WHEN: Taking the snapshot
    let taken: Vec<String> = queue
        .take_all()
        .iter()
        .map(|m| m.command().to_string())
        .collect();

    // THEN: FIFO order, nothing retained
    assert_eq!(taken, vec!["a", "b", "c"]);
    assert!(queue.is_empty());
}

/// **VALUE**: A bounded drop-oldest queue keeps the newest messages.
#[test]
fn given_full_drop_oldest_queue_when_enqueue_then_evicts_oldest() {
    // GIVEN: Capacity 2 holding a, b
    let mut queue = OutboundQueue::new(&QueueConfig {
        capacity: Some(2),
        overflow: OverflowPolicy::DropOldest,
    });
    queue.enqueue(message("a")).expect("room");
    queue.enqueue(message("b")).expect("room");

    // WHEN: Adding c
    let evicted = queue.enqueue(message("c")).expect("drop-oldest never fails");

    // THEN: a evicted, b and c kept in order
    assert_eq!(evicted.map(|m| m.command().to_string()), Some("a".to_string()));
    assert_eq!(commands(&queue), vec!["b", "c"]);
}

/// **VALUE**: A bounded reject queue refuses new work and keeps what it has.
#[test]
fn given_full_reject_queue_when_enqueue_then_returns_queue_full() {
    // GIVEN: Capacity 1 holding a
    let mut queue = OutboundQueue::new(&QueueConfig {
        capacity: Some(1),
        overflow: OverflowPolicy::Reject,
    });
    queue.enqueue(message("a")).expect("room");

    // WHEN: Adding b
    let result = queue.enqueue(message("b"));

    // THEN: QueueFull and a is untouched
    assert!(matches!(result, Err(CommandError::QueueFull { .. })));
    assert_eq!(commands(&queue), vec!["a"]);
}

/// **VALUE**: A failed send is never lost, even when the queue is at capacity.
///
/// **BUG THIS CATCHES**: Requeueing through `enqueue` would evict or reject the
/// very message that just failed to go out.
#[test]
fn given_full_queue_when_requeue_then_message_kept_beyond_capacity() {
    // GIVEN: Capacity 1 already full
    let mut queue = OutboundQueue::new(&QueueConfig {
        capacity: Some(1),
        overflow: OverflowPolicy::Reject,
    });
    queue.enqueue(message("new")).expect("room");

    // WHEN: Requeueing a failed message
    queue.requeue(message("failed"));

    // THEN: Both retained
    assert_eq!(queue.len(), 2);
    assert_eq!(commands(&queue), vec!["new", "failed"]);
}
