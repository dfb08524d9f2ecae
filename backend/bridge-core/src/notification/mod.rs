//! Notification Manager: stacked overlay surfaces driven by worker events.
//!
//! [`SurfaceStack`] is the synchronous state machine (registry, layout,
//! opacity steps) over a [`SurfaceHost`] windowing backend.
//! [`NotificationHandle`] runs it as an actor with a shared animation tick and
//! relays user actions back to the worker as `notification-action` commands.

mod host;
mod model;
mod service;
mod stack;

pub use host::SurfaceHost;
pub use model::{
    ActionButton, Geometry, Notification, SurfaceContent, SurfaceEvent, SurfacePhase,
    SurfaceSnapshot, WorkArea, action_id,
};
pub use service::{NotificationCommand, NotificationHandle, command_from_event};
pub use stack::SurfaceStack;
