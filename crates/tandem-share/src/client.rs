//! Joiner-side connection (§4.8): symmetric to `ShareServer`, minus
//! authority — a joiner never touches the pane tree directly, it only sends
//! `Event`s and paints whatever `Frame`s come back. On a transport error it
//! falls back to rendezvous discovery and tries the next peer, leaving the
//! last-painted frame on screen rather than blanking it.

use futures::StreamExt;
use std::sync::Arc;
use tandem_core::{Event, Frame};
use tandem_transport::Transport;
use tokio::sync::mpsc;

use crate::protocol::{CodecError, MessageChannel, ShareMessage};

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Transport(#[from] tandem_transport::TransportError),
}

/// Where inbound frames go: the joiner's own terminal, painted cell by
/// cell. Kept as a trait so this crate never needs to know about the host
/// terminal's raw-mode handling.
pub trait FrameSink: Send + Sync {
    fn present(&self, frame: Frame);
}

pub struct ShareClient {
    transport: Arc<dyn Transport>,
    rendezvous: String,
    sink: Arc<dyn FrameSink>,
}

impl ShareClient {
    pub fn new(transport: Arc<dyn Transport>, rendezvous: impl Into<String>, sink: Arc<dyn FrameSink>) -> Self {
        Self { transport, rendezvous: rendezvous.into(), sink }
    }

    /// Runs until rendezvous discovery itself ends (the transport was
    /// dropped) or `inputs` is closed. Individual session failures just
    /// trigger a reconnect to the next discovered peer.
    pub async fn run(&self, mut inputs: mpsc::UnboundedReceiver<Event>) -> Result<(), ShareError> {
        let mut discovered = self.transport.discover(&self.rendezvous);
        while let Some(peer) = discovered.next().await {
            let stream = match self.transport.open_stream(&peer).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, peer = %peer, "failed to open share stream");
                    continue;
                }
            };
            if let Err(e) = self.session(stream, &mut inputs).await {
                tracing::warn!(error = %e, peer = %peer, "share session ended, reconnecting");
            }
        }
        Ok(())
    }

    async fn session(
        &self,
        stream: Box<dyn tandem_transport::DuplexStream>,
        inputs: &mut mpsc::UnboundedReceiver<Event>,
    ) -> Result<(), ShareError> {
        let mut channel = MessageChannel::new(stream);
        channel.send(&ShareMessage::Init).await?;
        let (mut outbound, mut inbound) = channel.split();

        loop {
            tokio::select! {
                frame = inbound.recv() => {
                    match frame {
                        Some(Ok(ShareMessage::Frame(f))) => self.sink.present(f),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    }
                }
                event = inputs.recv() => {
                    match event {
                        Some(event) => outbound.send(&ShareMessage::Event(event)).await?,
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}
