// Unit tests for the event bus

use crate::fanout::{BridgeEvent, EventBus, EventKind, SubscriptionId};

use std::sync::{Arc, Mutex};

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&BridgeEvent) + Send + Sync>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::clone(&log);
    let make = move |name: &str| -> Box<dyn Fn(&BridgeEvent) + Send + Sync> {
        let log = Arc::clone(&shared);
        let name = name.to_string();
        Box::new(move |_event: &BridgeEvent| log.lock().unwrap().push(name.clone()))
    };
    (log, make)
}

/// **VALUE**: Subscribers run in subscription order and only for their kind.
#[test]
fn given_subscribers_when_publish_then_invoked_in_order_for_matching_kind() {
    // GIVEN: Two connected subscribers and one error subscriber
    let bus = EventBus::new();
    let (log, make) = recorder();
    bus.subscribe(EventKind::Connected, make("first"));
    bus.subscribe(EventKind::Connected, make("second"));
    bus.subscribe(EventKind::Error, make("error"));

    // WHEN: Publishing connected
    let completed = bus.publish(&BridgeEvent::Connected);

    // THEN: Only connected subscribers, in order
    assert_eq!(completed, 2);
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
}

/// **VALUE**: One panicking subscriber doesn't stop the rest.
///
/// **BUG THIS CATCHES**: A UI handler bug would otherwise cut off the
/// notification manager for the same event.
#[test]
fn given_panicking_subscriber_when_publish_then_later_subscribers_still_run() {
    // GIVEN: A panicking subscriber between two good ones
    let bus = EventBus::new();
    let (log, make) = recorder();
    bus.subscribe(EventKind::System, make("before"));
    bus.subscribe(EventKind::System, |_| panic!("subscriber bug"));
    bus.subscribe(EventKind::System, make("after"));

    // WHEN
    let completed = bus.publish(&BridgeEvent::System {
        event: None,
        data: serde_json::Value::Null,
    });

    // THEN: Both good subscribers ran
    assert_eq!(completed, 2);
    assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
}

/// **VALUE**: Unsubscribing during dispatch neither deadlocks nor skips anyone
/// in the current publish.
#[test]
fn given_subscriber_that_unsubscribes_itself_when_publish_then_iteration_unaffected() {
    // GIVEN: A self-removing subscriber followed by a recorder
    let bus = EventBus::new();
    let (log, make) = recorder();
    let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

    let bus_inner = bus.clone();
    let id_inner = Arc::clone(&own_id);
    let id = bus.subscribe(EventKind::Connected, move |_| {
        if let Some(id) = *id_inner.lock().unwrap() {
            bus_inner.unsubscribe(EventKind::Connected, id);
        }
    });
    *own_id.lock().unwrap() = Some(id);
    bus.subscribe(EventKind::Connected, make("recorder"));

    // WHEN: Publishing twice
    bus.publish(&BridgeEvent::Connected);
    bus.publish(&BridgeEvent::Connected);

    // THEN: Recorder saw both, self-remover is gone
    assert_eq!(*log.lock().unwrap(), vec!["recorder", "recorder"]);
    assert_eq!(bus.subscriber_count(EventKind::Connected), 1);
}

/// **VALUE**: Unsubscribe targets one subscription and reports whether it existed.
#[test]
fn given_subscription_when_unsubscribed_twice_then_second_is_noop() {
    // GIVEN
    let bus = EventBus::new();
    let (log, make) = recorder();
    let id = bus.subscribe(EventKind::Response, make("gone"));
    bus.subscribe(EventKind::Response, make("kept"));

    // WHEN
    let first = bus.unsubscribe(EventKind::Response, id);
    let second = bus.unsubscribe(EventKind::Response, id);
    let wrong_kind = bus.unsubscribe(EventKind::Error, id);
    bus.publish(&BridgeEvent::Response {
        command: "status".to_string(),
        data: serde_json::Value::Null,
    });

    // THEN
    assert!(first);
    assert!(!second);
    assert!(!wrong_kind);
    assert_eq!(*log.lock().unwrap(), vec!["kept"]);
}

/// **VALUE**: Publishing with nobody listening is harmless.
#[test]
fn given_no_subscribers_when_publish_then_returns_zero() {
    let bus = EventBus::new();
    assert_eq!(bus.publish(&BridgeEvent::Connected), 0);
}
