//! Leader hot-key layout commands and pane passthrough input routing (§4.6).

mod encode;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tandem_core::{Event, InputRouter, Key, Modifiers, MouseButtons, PaneId, PeerId, SplitDirection};
use tandem_layout::LayoutTree;

pub use encode::encode_event;

/// Default reactivation window: a leader press stays armed for this long
/// before auto-deactivating (§4.6, §8 scenario 4).
const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Button-none, no-modifier mouse-move events arriving faster than this are
/// collapsed to one per burst.
const MOUSE_MOVE_COALESCE: Duration = Duration::from_millis(16);

fn ctrl_b() -> (Key, Modifiers) {
    (Key::Char('b'), Modifiers { ctrl: true, ..Modifiers::default() })
}

/// Two-tier router: layout hot-keys under a leader key, pane passthrough
/// otherwise. Owns the shared layout tree because the `InputRouter` trait's
/// `route` takes no tree argument — tree mutation for `%`/`"`/`x` happens
/// here, directly against the shared tree the renderer also reads.
pub struct Router {
    tree: Arc<Mutex<LayoutTree>>,
    leader: (Key, Modifiers),
    window: Duration,
    mouse_coalesce: Duration,
    armed_at: HashMap<PeerId, Instant>,
    last_move: HashMap<PeerId, Instant>,
}

impl Router {
    pub fn new(tree: Arc<Mutex<LayoutTree>>) -> Self {
        Self {
            tree,
            leader: ctrl_b(),
            window: DEFAULT_WINDOW,
            mouse_coalesce: MOUSE_MOVE_COALESCE,
            armed_at: HashMap::new(),
            last_move: HashMap::new(),
        }
    }

    pub fn with_leader(mut self, key: Key, mods: Modifiers) -> Self {
        self.leader = (key, mods);
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_mouse_coalesce(mut self, interval: Duration) -> Self {
        self.mouse_coalesce = interval;
        self
    }

    /// `true` while `peer`'s leader press is still within its reactivation
    /// window (exposed for tests and UI "leader active" indicators).
    pub fn is_armed(&self, peer: &PeerId) -> bool {
        self.armed_at
            .get(peer)
            .map(|t| t.elapsed() <= self.window)
            .unwrap_or(false)
    }

    fn route_key(&mut self, peer: &PeerId, key: Key, rune: Option<char>, mods: Modifiers) -> Option<PaneId> {
        if (key, mods) == self.leader {
            self.armed_at.insert(peer.clone(), Instant::now());
            return None;
        }

        if let Some(armed) = self.armed_at.remove(peer) {
            if armed.elapsed() <= self.window {
                let resolved = rune.or(match key {
                    Key::Char(c) => Some(c),
                    _ => None,
                });
                match resolved {
                    Some('%') => {
                        self.tree.lock().unwrap().split(peer, SplitDirection::Vertical);
                        return None;
                    }
                    Some('"') => {
                        self.tree.lock().unwrap().split(peer, SplitDirection::Horizontal);
                        return None;
                    }
                    Some('x') => {
                        self.tree.lock().unwrap().kill(peer);
                        return None;
                    }
                    _ => {}
                }
            }
        }

        self.tree.lock().unwrap().focused_pane(peer)
    }

    fn route_mouse(&mut self, peer: &PeerId, buttons: MouseButtons, mods: Modifiers) -> Option<PaneId> {
        let is_plain_move = buttons.is_empty() && mods == Modifiers::default();
        if is_plain_move {
            if let Some(last) = self.last_move.get(peer) {
                if last.elapsed() < self.mouse_coalesce {
                    return None;
                }
            }
            self.last_move.insert(peer.clone(), Instant::now());
        } else {
            self.last_move.remove(peer);
        }

        self.tree.lock().unwrap().focused_pane(peer)
    }
}

impl InputRouter for Router {
    fn route(&mut self, peer: &PeerId, event: Event) -> Option<PaneId> {
        match event {
            Event::Key { key, rune, mods } => self.route_key(peer, key, rune, mods),
            Event::Mouse { buttons, mods, .. } => self.route_mouse(peer, buttons, mods),
            Event::Resize { .. } => None,
            Event::Paste { .. } => self.tree.lock().unwrap().focused_pane(peer),
        }
    }
}
