/*!
 * Message Bus
 * Page-level broadcast of posted messages (broadcast to all listeners)
 *
 * Every listener sees every envelope, including ones posted by other
 * boundaries or by the page itself; filtering by origin is the listener's job.
 */

use crate::core::types::{BoundaryId, ListenerId};
use crate::protocol::{encode, Envelope, OutboundMessage, Outbox};
use ahash::HashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

#[derive(Default)]
struct BusInner {
    listeners: Mutex<HashMap<ListenerId, flume::Sender<Envelope>>>,
    next_id: AtomicU64,
}

/// Cloning yields another handle to the same bus
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; envelopes posted from now on are buffered in the receiver
    pub fn subscribe(&self) -> (ListenerId, flume::Receiver<Envelope>) {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = flume::unbounded();
        self.inner.listeners.lock().insert(id, tx);
        debug!(listener = %id, "listener subscribed");
        (id, rx)
    }

    /// Remove a listener; its receiver disconnects once drained
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = self.inner.listeners.lock().remove(&id).is_some();
        if removed {
            debug!(listener = %id, "listener unsubscribed");
        }
        removed
    }

    /// Deliver `envelope` to every listener, returning how many received it
    pub fn post(&self, envelope: Envelope) -> usize {
        let mut listeners = self.inner.listeners.lock();
        let mut sent = 0;
        let mut to_remove = Vec::new();

        for (id, tx) in listeners.iter() {
            match tx.send(envelope.clone()) {
                Ok(()) => sent += 1,
                Err(_) => {
                    debug!(listener = %id, "listener disconnected");
                    to_remove.push(*id);
                }
            }
        }

        for id in to_remove {
            listeners.remove(&id);
        }

        trace!(source = ?envelope.source, delivered = sent, "envelope posted");
        sent
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Outbox of an isolated context: posts onto the page bus under its boundary's origin
#[derive(Debug, Clone)]
pub struct BoundaryOutbox {
    origin: BoundaryId,
    bus: MessageBus,
}

impl BoundaryOutbox {
    pub fn new(origin: BoundaryId, bus: MessageBus) -> Self {
        Self { origin, bus }
    }

    pub fn origin(&self) -> BoundaryId {
        self.origin
    }
}

impl Outbox for BoundaryOutbox {
    fn post(&self, message: OutboundMessage) {
        match encode(&message) {
            Ok(data) => {
                self.bus.post(Envelope::from_boundary(self.origin, data));
            }
            Err(err) => error!(boundary = %self.origin, kind = message.kind(), error = %err, "failed to encode message"),
        }
    }
}
