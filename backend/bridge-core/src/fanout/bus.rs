use crate::fanout::{BridgeEvent, EventKind};

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{error, trace};

/// Subscriber callback. Runs on whichever task publishes, so keep it short and
/// hand real work off through a channel.
pub type EventHandler = Arc<dyn Fn(&BridgeEvent) + Send + Sync>;

/// Token returned by [`EventBus::subscribe`]; closures can't be compared, so
/// this is what identifies a subscription for [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type HandlerMap = HashMap<EventKind, Vec<(SubscriptionId, EventHandler)>>;

/// Multicast event bus keyed by [`EventKind`].
///
/// Handlers run in subscription order. Publishing iterates over a snapshot of
/// the handler list taken before the first call, so handlers may subscribe or
/// unsubscribe (themselves included) while being dispatched. A panicking
/// handler is logged and skipped; the rest still run.
///
/// Cloning is cheap and every clone shares the same subscriptions.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<HandlerMap>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&BridgeEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        trace!("Subscribed {id:?} to {kind}");
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered for `kind`.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;

        if list.is_empty() {
            handlers.remove(&kind);
        }

        removed
    }

    /// Invoke every subscriber of `event.kind()`.
    ///
    /// Returns the number of handlers that completed without panicking.
    pub fn publish(&self, event: &BridgeEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(SubscriptionId, EventHandler)> =
            self.lock().get(&kind).cloned().unwrap_or_default();

        trace!("Publishing {kind} to {} subscriber(s)", snapshot.len());

        let mut completed = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => completed += 1,
                Err(_) => error!("Subscriber {id:?} for {kind} panicked; continuing with the rest"),
            }
        }
        completed
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HandlerMap> {
        // Handlers never run under this lock, so a poisoned map is still consistent.
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
