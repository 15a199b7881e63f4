//! Session orchestrator: owns the pane tree, the pty-backed panes, the
//! input router, the compositor, and the share server, wiring pty output,
//! layout mutation, and cursor movement into one render trigger (§5).
//!
//! Lock order, enforced by never holding two of these at once across an
//! await or a call into another locked structure: layout tree, then a
//! pane's VT state, then the peer palette.

mod config;
mod pane;

pub use config::Config;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

use tandem_core::{CellRect, Event, InputRouter, PaneId, PeerId, PeerPalette};
use tandem_input::Router;
use tandem_layout::LayoutTree;
use tandem_render::Compositor;
use tandem_share::{EventSink, RenderTopic, ShareServer};
use tandem_terminal::Terminal;
use tandem_transport::Transport;

pub use pane::PaneHandle;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to spawn pane: {0}")]
    SpawnPane(String),
}

/// Shared state behind every view onto a session: the pane tree, the
/// pty-backed panes themselves, and the compositor/palette everything else
/// reads. Does not know about the network at all.
struct SessionCore {
    tree: Arc<Mutex<LayoutTree>>,
    palette: Arc<Mutex<PeerPalette>>,
    panes: Mutex<HashMap<PaneId, Arc<PaneHandle>>>,
    compositor: Arc<Compositor>,
    topic: Arc<RenderTopic>,
    target: Mutex<CellRect>,
    pty_shutdown_grace: std::time::Duration,
}

impl SessionCore {
    fn notify_dirty(&self) {
        self.topic.publish();
    }

    fn target(&self) -> CellRect {
        *self.target.lock().unwrap()
    }

    fn spawn_pane(self: &Arc<Self>, id: PaneId) -> Result<(), EngineError> {
        let target = self.target();
        let mut terminal =
            Terminal::new(target.width, target.height).map_err(|e| EngineError::SpawnPane(e.to_string()))?;
        terminal.set_shutdown_grace(self.pty_shutdown_grace);
        let handle = Arc::new(PaneHandle::new(terminal));

        let core = Arc::downgrade(self);
        handle.set_waker(Box::new(move || {
            if let Some(core) = Weak::upgrade(&core) {
                core.notify_dirty();
            }
        }));

        self.compositor.register_pane(id, handle.clone());
        self.panes.lock().unwrap().insert(id, handle);
        Ok(())
    }

    fn teardown_pane(&self, id: PaneId) {
        self.compositor.unregister_pane(id);
        self.panes.lock().unwrap().remove(&id);
    }

    /// Reconciles the pty-backed pane set against the tree's current
    /// leaves: a split grew the tree without spawning a pty (the router
    /// only knows about layout), a kill shrank it without tearing one down.
    fn sync_panes(self: &Arc<Self>) {
        let tree_ids: HashSet<PaneId> = self.tree.lock().unwrap().pane_ids().into_iter().collect();
        let have_ids: HashSet<PaneId> = self.panes.lock().unwrap().keys().copied().collect();

        for id in tree_ids.difference(&have_ids) {
            if let Err(e) = self.spawn_pane(*id) {
                tracing::error!(pane = %id, error = %e, "failed to spawn pane");
            }
        }
        for id in have_ids.difference(&tree_ids) {
            self.teardown_pane(*id);
        }
    }

    /// Removes any pane whose child process has exited (§4.2, §7 "pty
    /// read/write failure: treat the pane as exited, trigger the kill
    /// flow"), via the same id-addressed removal path used for exits.
    fn reap_exited(self: &Arc<Self>) {
        let done: Vec<PaneId> = {
            let panes = self.panes.lock().unwrap();
            panes.iter().filter(|(_, h)| h.is_done()).map(|(id, _)| *id).collect()
        };
        if done.is_empty() {
            return;
        }
        {
            let mut tree = self.tree.lock().unwrap();
            for id in &done {
                tree.kill_pane(*id);
            }
        }
        self.sync_panes();
    }

    /// `extra` is always included so the caller driving a local (host-side)
    /// event still gets its own cursor refreshed even before it's ever
    /// touched the palette.
    fn peer_ids_including(&self, extra: &PeerId) -> Vec<PeerId> {
        let mut ids = self.palette.lock().unwrap().peers_sorted();
        if !ids.contains(extra) {
            ids.push(extra.clone());
        }
        ids
    }

    /// Recomputes every listed peer's frame-absolute cursor position from
    /// its focused pane's own VT cursor, per the contract
    /// `tandem-render`'s compositor expects (§4.5).
    fn refresh_cursors(&self, peer_ids: &[PeerId]) {
        let target = self.target();
        let (rects, focus): (Vec<(PaneId, CellRect)>, HashMap<PeerId, Option<PaneId>>) = {
            let tree = self.tree.lock().unwrap();
            let rects = tree.compute(target);
            let focus = peer_ids.iter().map(|p| (p.clone(), tree.focused_pane(p))).collect();
            (rects, focus)
        };

        let updates: Vec<(PeerId, tandem_core::Cursor)> = {
            let panes = self.panes.lock().unwrap();
            peer_ids
                .iter()
                .filter_map(|peer| {
                    let pane_id = (*focus.get(peer)?)?;
                    let rect = rects.iter().find(|(id, _)| *id == pane_id).map(|(_, r)| *r)?;
                    let handle = panes.get(&pane_id)?;
                    let mut cursor = handle.cursor();
                    cursor.x = (rect.x + cursor.x).min(rect.x + rect.width.saturating_sub(1));
                    cursor.y = (rect.y + cursor.y).min(rect.y + rect.height.saturating_sub(1));
                    Some((peer.clone(), cursor))
                })
                .collect()
        };

        let mut palette = self.palette.lock().unwrap();
        for (peer, cursor) in updates {
            palette.set_cursor(peer, cursor);
        }
    }

    fn deliver(&self, pane: PaneId, event: Event) {
        if let Some(handle) = self.panes.lock().unwrap().get(&pane) {
            let bytes = tandem_input::encode_event(&event, handle.mode());
            handle.write(&bytes);
        }
    }
}

/// Wraps the layout/hotkey router so every routed event — from a peer
/// through the share server, or from the host directly — reconciles the
/// pane set and refreshes cursors the same way, regardless of caller.
struct EngineRouter {
    core: Arc<SessionCore>,
    inner: Router,
}

impl InputRouter for EngineRouter {
    fn route(&mut self, peer: &PeerId, event: Event) -> Option<PaneId> {
        let resolved = self.inner.route(peer, event);
        self.core.sync_panes();
        self.core.reap_exited();
        let peers = self.core.peer_ids_including(peer);
        self.core.refresh_cursors(&peers);
        self.core.notify_dirty();
        resolved
    }
}

struct EngineSink {
    core: Arc<SessionCore>,
}

impl EventSink for EngineSink {
    fn deliver(&self, pane: PaneId, event: Event) {
        self.core.deliver(pane, event);
    }
}

/// One multiplexer session: the host's own pane tree, renderer, and share
/// server, all sharing one `SessionCore`.
pub struct Session {
    core: Arc<SessionCore>,
    router: Arc<Mutex<EngineRouter>>,
    share: Arc<ShareServer>,
}

impl Session {
    pub fn new(cols: u16, rows: u16) -> Result<Self, EngineError> {
        Self::with_config(cols, rows, &Config::default())
    }

    pub fn with_config(cols: u16, rows: u16, config: &Config) -> Result<Self, EngineError> {
        let (tree_state, root_id) = LayoutTree::with_initial_pane();
        let tree = Arc::new(Mutex::new(tree_state));
        let palette = Arc::new(Mutex::new(PeerPalette::new()));
        let compositor = Arc::new(Compositor::new(tree.clone(), palette.clone()));
        let topic = Arc::new(RenderTopic::new());

        let core = Arc::new(SessionCore {
            tree: tree.clone(),
            palette: palette.clone(),
            panes: Mutex::new(HashMap::new()),
            compositor: compositor.clone(),
            topic: topic.clone(),
            target: Mutex::new(CellRect::new(0, 0, cols, rows)),
            pty_shutdown_grace: config.pty_shutdown_grace(),
        });

        core.spawn_pane(root_id)?;

        let (leader_key, leader_mods) = config.leader();
        let inner_router = Router::new(tree.clone())
            .with_leader(leader_key, leader_mods)
            .with_window(config.leader_window())
            .with_mouse_coalesce(config.mouse_coalesce());
        let router = Arc::new(Mutex::new(EngineRouter { core: core.clone(), inner: inner_router }));
        let sink = Arc::new(EngineSink { core: core.clone() });

        let share = Arc::new(ShareServer::new(
            tree,
            palette,
            router.clone(),
            compositor,
            sink,
            topic,
            CellRect::new(0, 0, cols, rows),
        ));

        Ok(Self { core, router, share })
    }

    pub fn share_server(&self) -> Arc<ShareServer> {
        self.share.clone()
    }

    /// Subscribes to the same dirty-tick topic a joined peer's stream
    /// subscribes to, for a host's own local render loop.
    pub fn subscribe_dirty(&self) -> tokio::sync::watch::Receiver<u64> {
        self.core.topic.subscribe(PeerId::local())
    }

    /// Routes and delivers an event produced directly by the host (read off
    /// its own controlling terminal), bypassing the network entirely.
    pub fn handle_local_event(&self, event: Event) {
        let peer = PeerId::local();
        if let Some(pane) = self.router.lock().unwrap().route(&peer, event.clone()) {
            self.core.deliver(pane, event);
        }
    }

    pub fn render(&self) -> tandem_core::Frame {
        use tandem_core::Renderer;
        self.core.compositor.render(self.core.target())
    }

    /// Resizes the overall target and every pane's pty to match its new
    /// share of the layout (§4.2 "resize forwards to the owning pty").
    pub fn resize(&self, cols: u16, rows: u16) {
        let target = CellRect::new(0, 0, cols, rows);
        *self.core.target.lock().unwrap() = target;
        let rects = self.core.tree.lock().unwrap().compute(target);
        let panes = self.core.panes.lock().unwrap();
        for (id, rect) in rects {
            if let Some(handle) = panes.get(&id) {
                handle.resize(rect.width, rect.height);
            }
        }
        drop(panes);
        self.core.notify_dirty();
    }

    pub fn is_empty(&self) -> bool {
        self.core.tree.lock().unwrap().is_empty()
    }

    /// Tears every pane down (§5 "tree shutdown → cancel all pty pumps →
    /// drain peer streams gracefully → close transport"): each `PaneHandle`
    /// dropped here is the last reference, so its `Terminal`'s own `Drop`
    /// impl runs synchronously and waits on the child before this returns.
    /// A final dirty tick lets any still-subscribed peer stream observe the
    /// now-empty session before its connection closes; draining the
    /// transport itself is the caller's responsibility (abort the handle
    /// `run_share_server` returned, then drop the `Transport`).
    pub fn shutdown(&self) {
        let ids: Vec<PaneId> = self.core.panes.lock().unwrap().keys().copied().collect();
        for id in ids {
            self.core.teardown_pane(id);
        }
        self.core.notify_dirty();
    }

    /// Spawns one task per accepted connection for the lifetime of
    /// `transport`'s incoming stream (§4.7 step 1: "accept stream → wait
    /// Init → ..."). Returns the handle driving the accept loop itself;
    /// dropping `transport` ends it, each per-peer task outlives that until
    /// its own connection closes.
    pub fn run_share_server(&self, transport: Arc<dyn Transport>) -> tokio::task::JoinHandle<()> {
        let share = self.share.clone();
        tokio::spawn(async move {
            use futures::StreamExt;
            let mut incoming = transport.incoming();
            while let Some((peer, stream)) = incoming.next().await {
                let share = share.clone();
                tokio::spawn(async move {
                    if let Err(e) = share.serve(peer.clone(), stream).await {
                        tracing::warn!(peer = %peer, error = %e, "share connection ended");
                    }
                });
            }
        })
    }
}
