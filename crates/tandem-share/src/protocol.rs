//! Wire messages and framing for a share connection (§4.7/§4.8): tagged
//! `Init`/`Event`/`Frame` values, postcard-encoded and length-delimited —
//! the same pairing already used by the pack's own networked CLIs rather
//! than the gRPC/protobuf stack the original implementation used.

use bytes::{Bytes, BytesMut};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tandem_core::{Event, Frame};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ShareMessage {
    Init,
    Event(Event),
    Frame(Frame),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("framing error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding message: {0}")]
    Encode(#[from] postcard::Error),
}

/// A `ShareMessage` stream+sink over any duplex byte transport.
pub struct MessageChannel<T> {
    inner: Framed<T, LengthDelimitedCodec>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> MessageChannel<T> {
    pub fn new(io: T) -> Self {
        Self { inner: Framed::new(io, LengthDelimitedCodec::new()) }
    }

    pub async fn send(&mut self, msg: &ShareMessage) -> Result<(), CodecError> {
        let bytes = postcard::to_allocvec(msg)?;
        self.inner.send(Bytes::from(bytes)).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Option<Result<ShareMessage, CodecError>> {
        match self.inner.next().await? {
            Ok(frame) => Some(decode(&frame)),
            Err(e) => Some(Err(CodecError::from(e))),
        }
    }

    pub fn split(self) -> (MessageSender<T>, MessageReceiver<T>)
    where
        T: 'static,
    {
        let (sink, stream) = self.inner.split();
        (MessageSender { inner: sink }, MessageReceiver { inner: stream })
    }
}

fn decode(frame: &BytesMut) -> Result<ShareMessage, CodecError> {
    postcard::from_bytes(frame).map_err(CodecError::from)
}

pub struct MessageSender<T> {
    inner: futures::stream::SplitSink<Framed<T, LengthDelimitedCodec>, Bytes>,
}

impl<T: AsyncWrite + Unpin> MessageSender<T> {
    pub async fn send(&mut self, msg: &ShareMessage) -> Result<(), CodecError> {
        let bytes = postcard::to_allocvec(msg)?;
        self.inner.send(Bytes::from(bytes)).await?;
        Ok(())
    }
}

pub struct MessageReceiver<T> {
    inner: futures::stream::SplitStream<Framed<T, LengthDelimitedCodec>>,
}

impl<T: AsyncRead + Unpin> MessageReceiver<T> {
    pub async fn recv(&mut self) -> Option<Result<ShareMessage, CodecError>> {
        match self.inner.next().await? {
            Ok(frame) => Some(decode(&frame)),
            Err(e) => Some(Err(CodecError::from(e))),
        }
    }
}
