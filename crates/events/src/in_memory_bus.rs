//! In-process notification bus.

use std::sync::{Mutex, MutexGuard, mpsc};

use thiserror::Error;
use tracing::{debug, trace};

use crate::bus::{EventBus, Subscription};
use crate::event::Event;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InMemoryBusError {
    #[error("subscriber registry lock poisoned")]
    Poisoned,
}

/// Fan-out bus for notifications of type `M`.
///
/// Each subscriber owns an unbounded channel, so `publish` costs one send per
/// live subscriber and never waits on a reader. A subscriber whose
/// [`Subscription`] was dropped is forgotten on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribers registered as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }

    fn registry(&self) -> Result<MutexGuard<'_, Vec<mpsc::Sender<M>>>, InMemoryBusError> {
        self.subscribers.lock().map_err(|_| InMemoryBusError::Poisoned)
    }
}

impl<M: Event> EventBus<M> for InMemoryEventBus<M> {
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let topic = message.event_type();
        let mut subs = self.registry()?;

        let before = subs.len();
        subs.retain(|tx| tx.send(message.clone()).is_ok());
        let delivered = subs.len();

        if delivered < before {
            debug!(topic, dropped = before - delivered, remaining = delivered, "forgot closed subscribers");
        }
        trace!(topic, delivered, "notification published");
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        match self.registry() {
            Ok(mut subs) => subs.push(tx),
            // The subscription stays valid but will never receive anything.
            Err(err) => debug!(error = %err, "subscribing to a poisoned bus"),
        }
        Subscription::new(rx)
    }
}
