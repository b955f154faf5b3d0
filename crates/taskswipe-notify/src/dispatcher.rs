use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use taskswipe_types::events::DomainEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// Fans domain events out to every subscriber (the notification worker, and
/// anything else that wants to react to writes).
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every subscriber receives every event
    broadcast_tx: broadcast::Sender<DomainEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A subscriber that falls more than `capacity` events behind loses the oldest ones.
    pub fn with_capacity(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to domain events. Only events published after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event. Returns how many subscribers it reached.
    pub fn publish(&self, event: DomainEvent) -> usize {
        match self.inner.broadcast_tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                debug!("No subscribers for {:?}", event);
                0
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
