//! Host-side connection handler (§4.7): one task per joined peer, driven off
//! three things running concurrently — a reader pulling `Event`s off the
//! wire into a bounded queue, a render-topic tick pushing fresh frames out,
//! and the queue drain routing events into the shared pane tree. Modeled on
//! the original implementation's `rvt.Server.Share`, which paired a
//! `recvMsgs`/`sendMsgs` goroutine with an `updateCh`-driven full-frame
//! push; the goroutine pair becomes a spawned reader task plus a `select!`
//! loop here, and `updateCh` becomes `RenderTopic`.

use std::sync::{Arc, Mutex};

use tandem_core::{CellRect, Event, PaneId, PeerId, PeerPalette, Renderer};
use tandem_layout::LayoutTree;
use tandem_transport::DuplexStream;
use tokio::sync::oneshot;

use crate::backpressure::EventQueue;
use crate::protocol::{CodecError, MessageChannel, ShareMessage};
use crate::topic::RenderTopic;

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("peer sent {0:?} before Init")]
    ProtocolViolation(&'static str),
}

/// Where a routed event ends up: the engine's per-pane pty writer. Kept as a
/// trait so `tandem-share` never needs to know about pty plumbing directly,
/// the same boundary `PaneView` draws for rendering.
pub trait EventSink: Send + Sync {
    fn deliver(&self, pane: PaneId, event: Event);
}

/// Shared state a `ShareServer` needs to serve every joined peer. Cloned
/// (cheaply, via the inner `Arc`s) into each per-connection task.
#[derive(Clone)]
pub struct ShareServer {
    tree: Arc<Mutex<LayoutTree>>,
    palette: Arc<Mutex<PeerPalette>>,
    router: Arc<Mutex<dyn tandem_core::InputRouter + Send>>,
    renderer: Arc<dyn Renderer + Send + Sync>,
    sink: Arc<dyn EventSink>,
    topic: Arc<RenderTopic>,
    target: CellRect,
    queue_capacity: usize,
}

impl ShareServer {
    /// `topic` is taken rather than constructed internally so a caller that
    /// also mutates shared pane/layout state outside of a routed event (pty
    /// output, a reaped exit) can publish to the same topic without going
    /// through the server at all.
    pub fn new(
        tree: Arc<Mutex<LayoutTree>>,
        palette: Arc<Mutex<PeerPalette>>,
        router: Arc<Mutex<dyn tandem_core::InputRouter + Send>>,
        renderer: Arc<dyn Renderer + Send + Sync>,
        sink: Arc<dyn EventSink>,
        topic: Arc<RenderTopic>,
        target: CellRect,
    ) -> Self {
        Self {
            tree,
            palette,
            router,
            renderer,
            sink,
            topic,
            target,
            queue_capacity: 64,
        }
    }

    /// A dirty hook: call after any mutation visible in a frame (pty output,
    /// split/kill, focus or cursor change) to push a fresh render to every
    /// joined peer.
    pub fn notify_dirty(&self) {
        self.topic.publish();
    }

    /// Serves one joined peer until the connection drops. Registers the
    /// peer with the shared palette on `Init`, unregisters it (and forgets
    /// its focus entry) on exit; splits or panes the peer created are left
    /// standing, per §4.7 step 4.
    pub async fn serve(&self, peer: PeerId, stream: Box<dyn DuplexStream>) -> Result<(), ShareError> {
        let mut channel = MessageChannel::new(stream);

        match channel.recv().await {
            Some(Ok(ShareMessage::Init)) => {}
            Some(Ok(_)) => return Err(ShareError::ProtocolViolation("a message")),
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(()),
        }

        self.palette.lock().unwrap().insert(peer.clone());
        let mut ticks = self.topic.subscribe(peer.clone());

        let first_frame = self.renderer.render(self.target);
        channel.send(&ShareMessage::Frame(first_frame)).await?;

        let (mut outbound, mut inbound) = channel.split();
        let queue = Arc::new(EventQueue::new(self.queue_capacity));
        let (closed_tx, mut closed_rx) = oneshot::channel::<()>();

        let reader_queue = queue.clone();
        let reader_task = tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Some(Ok(ShareMessage::Event(event))) => reader_queue.push(event),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "share peer read error");
                        break;
                    }
                    None => break,
                }
            }
            let _ = closed_tx.send(());
        });

        loop {
            tokio::select! {
                _ = &mut closed_rx => break,
                changed = ticks.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let frame = self.renderer.render(self.target);
                    if outbound.send(&ShareMessage::Frame(frame)).await.is_err() {
                        break;
                    }
                }
                event = queue.pop() => {
                    if let Some(pane) = self.router.lock().unwrap().route(&peer, event.clone()) {
                        self.sink.deliver(pane, event);
                        self.notify_dirty();
                    }
                }
            }
        }

        reader_task.abort();
        self.topic.unsubscribe(&peer);
        self.palette.lock().unwrap().remove(&peer);
        self.tree.lock().unwrap().forget_peer(&peer);
        Ok(())
    }
}
