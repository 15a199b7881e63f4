//! Render-topic fan-out: every peer subscribes once, and any dirty event —
//! a pty write, a layout mutation, a cursor move — publishes a fresh tick to
//! every subscriber at once. Grounded on the original implementation's
//! `pkg/pubsub` (a mutex-guarded `map[topic]map[id]chan string`); here there
//! is only ever one topic, so the map is keyed directly by peer id, and the
//! "send on every subscribed channel" step becomes `watch::Sender::send`,
//! whose own coalescing (a late subscriber only ever sees the latest tick)
//! is the same idempotent-frame property the original's full-state refresh
//! depended on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tandem_core::PeerId;
use tokio::sync::watch;

pub struct RenderTopic {
    subscribers: Mutex<HashMap<PeerId, watch::Sender<u64>>>,
    counter: AtomicU64,
}

impl RenderTopic {
    pub fn new() -> Self {
        Self { subscribers: Mutex::new(HashMap::new()), counter: AtomicU64::new(0) }
    }

    pub fn subscribe(&self, peer: PeerId) -> watch::Receiver<u64> {
        let (tx, rx) = watch::channel(self.counter.load(Ordering::Relaxed));
        self.subscribers.lock().unwrap().insert(peer, tx);
        rx
    }

    pub fn unsubscribe(&self, peer: &PeerId) {
        self.subscribers.lock().unwrap().remove(peer);
    }

    /// Notifies every current subscriber that a fresh frame should be
    /// rendered and sent. Never blocks: a subscriber that's lagging just
    /// observes the latest tick next time it polls, same as the original's
    /// idempotent full-state push.
    pub fn publish(&self) {
        let tick = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let subs = self.subscribers.lock().unwrap();
        for tx in subs.values() {
            let _ = tx.send(tick);
        }
    }
}

impl Default for RenderTopic {
    fn default() -> Self {
        Self::new()
    }
}
