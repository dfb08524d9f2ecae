//! Worker events → typed local events.
//!
//! [`InboundEvent::parse`] turns one text frame into an [`InboundEvent`],
//! [`dispatch`] maps it to exactly one [`BridgeEvent`], and the [`EventBus`]
//! multicasts that to every subscriber of its [`EventKind`].

mod bus;
mod event;

pub use bus::{EventBus, EventHandler, SubscriptionId};
pub use event::{BridgeEvent, EventKind, InboundEvent, dispatch};
