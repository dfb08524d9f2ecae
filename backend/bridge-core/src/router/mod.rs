//! Outbound side of the bridge: what a command looks like on the wire and
//! where it waits while the worker is unreachable.
//!
//! Transmission itself happens inside the channel actor so that direct sends
//! and queue flushes are serialised through one task.

mod message;
mod queue;

pub use message::{CommandReceipt, Message};
pub use queue::OutboundQueue;
