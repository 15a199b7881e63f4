//! Wire protocol and host/joiner connection handling for a shared session
//! (§4.7/§4.8): the pieces between a `tandem-transport` duplex stream and
//! the engine's pane tree and renderer.

mod backpressure;
pub mod client;
pub mod protocol;
pub mod server;
#[cfg(test)]
mod tests;
mod topic;

pub use client::{ShareClient, ShareError as ClientError, FrameSink};
pub use protocol::{CodecError, MessageChannel, MessageReceiver, MessageSender, ShareMessage};
pub use server::{EventSink, ShareError as ServerError, ShareServer};
pub use topic::RenderTopic;
