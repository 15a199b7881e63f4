//! P2P duplex-stream transport over libp2p (§6): rendezvous discovery via
//! mDNS + Kademlia, NAT traversal via relay/DCUtR, one named protocol stream
//! per share connection.

mod identity;
mod swarm;
#[cfg(test)]
mod tests;

use futures::Stream;
use libp2p::swarm::StreamProtocol;
use libp2p::PeerId as LibP2pPeerId;
use tandem_core::PeerId;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

pub use identity::{load_or_generate_identity, IdentityError};

/// The single libp2p stream protocol this system speaks; distinguishes a
/// tandem share connection from any other protocol sharing the same swarm.
pub const PROTOCOL: StreamProtocol = StreamProtocol::new("/tandem/share/1");

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("listen failed: {0}")]
    Listen(String),
    #[error("dial failed: {0}")]
    Dial(String),
    #[error("open stream to {0} failed: {1}")]
    OpenStream(PeerId, String),
    #[error("swarm task ended unexpectedly")]
    SwarmGone,
}

/// A live, bidirectional byte stream to one remote peer — a join connection
/// in either direction. Implements the read/write traits the share server
/// and client frame their protocol over.
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> DuplexStream for T {}

/// Everything the share server/client need from the network layer: dial a
/// known peer, accept inbound connections, and discover peers under a
/// shared rendezvous string without a pre-shared address (§6 "Joining").
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// This host's own peer id, derived from its persisted identity key.
    fn local_peer_id(&self) -> PeerId;

    /// Opens a new protocol stream to `peer`, which must already be known
    /// (typically via `discover`).
    async fn open_stream(&self, peer: &PeerId) -> Result<Box<dyn DuplexStream>, TransportError>;

    /// Yields `(PeerId, DuplexStream)` pairs as remote peers open streams to
    /// this host. Ends only when the transport shuts down.
    fn incoming(&self) -> Box<dyn Stream<Item = (PeerId, Box<dyn DuplexStream>)> + Send + Unpin>;

    /// Advertises this host under `rendezvous` and yields every peer id
    /// discovered under the same string, including ones already known.
    fn discover(&self, rendezvous: &str) -> Box<dyn Stream<Item = PeerId> + Send + Unpin>;
}

pub use swarm::P2pTransport;

pub(crate) fn wire_peer_id(id: LibP2pPeerId) -> PeerId {
    PeerId::new(id.to_bytes())
}
