use crate::config::{OverflowPolicy, QueueConfig};
use crate::error::command::CommandError;
use crate::router::Message;

use common::ErrorLocation;

use std::collections::VecDeque;
use std::panic::Location;

use log::warn;

/// FIFO of messages that could not be transmitted because the channel was not open.
///
/// Owned by the channel actor; nothing else touches it.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    messages: VecDeque<Message>,
    capacity: Option<usize>,
    overflow: OverflowPolicy,
}

impl OutboundQueue {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity: config.capacity,
            overflow: config.overflow,
        }
    }

    /// Append a message.
    ///
    /// Returns the message evicted to make room, if the queue is bounded and
    /// full under [`OverflowPolicy::DropOldest`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::QueueFull`] if the queue is full under [`OverflowPolicy::Reject`].
    #[track_caller]
    pub fn enqueue(&mut self, message: Message) -> Result<Option<Message>, CommandError> {
        let Some(capacity) = self.capacity else {
            self.messages.push_back(message);
            return Ok(None);
        };

        if self.messages.len() < capacity {
            self.messages.push_back(message);
            return Ok(None);
        }

        match self.overflow {
            OverflowPolicy::DropOldest => {
                let evicted = self.messages.pop_front();
                if let Some(ref evicted) = evicted {
                    warn!(
                        "Outbound queue full ({capacity}), dropping oldest message {} ({})",
                        evicted.id(),
                        evicted.command()
                    );
                }
                self.messages.push_back(message);
                Ok(evicted)
            }
            OverflowPolicy::Reject => Err(CommandError::QueueFull {
                message: format!(
                    "Outbound queue full ({capacity}), rejected '{}'",
                    message.command()
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Put back a message whose transmission failed. Ignores the capacity so a
    /// failed send is never lost.
    pub fn requeue(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Snapshot the queue in FIFO order and leave it empty.
    pub fn take_all(&mut self) -> Vec<Message> {
        self.messages.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}
