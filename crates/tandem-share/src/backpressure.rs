//! Bounded inbound-event queue with the drop policy a shared session needs
//! once a peer's reader outruns its router: first reclaim a stale
//! plain-mouse-move (button-up, no modifier, pure position noise), and only
//! if none is queued, drop the oldest event outright and say so. Keyboard
//! input never disappears silently.

use std::collections::VecDeque;
use std::sync::Mutex;

use tandem_core::{Event, MouseButtons};
use tokio::sync::Notify;

fn is_plain_mouse_move(event: &Event) -> bool {
    matches!(event, Event::Mouse { buttons, .. } if *buttons == MouseButtons::empty())
}

pub struct EventQueue {
    capacity: usize,
    inner: Mutex<VecDeque<Event>>,
    notify: Notify,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(VecDeque::with_capacity(capacity)), notify: Notify::new() }
    }

    pub fn push(&self, event: Event) {
        let mut queue = self.inner.lock().unwrap();
        if queue.len() >= self.capacity {
            if let Some(pos) = queue.iter().position(is_plain_mouse_move) {
                queue.remove(pos);
            } else if let Some(dropped) = queue.pop_front() {
                tracing::warn!(?dropped, "share event queue full, dropping oldest event");
            }
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }

    pub async fn pop(&self) -> Event {
        loop {
            if let Some(event) = self.inner.lock().unwrap().pop_front() {
                return event;
            }
            self.notify.notified().await;
        }
    }
}
