pub mod channel;
pub mod clock;
pub mod receiver;
pub mod sender;
pub mod window;

pub use channel::{Channel, ChannelConfig, ChannelError, UdpChannel};
pub use clock::{Clock, SystemClock, time_until};
pub use receiver::{Delivery, Receiver, ReceiverReport, Sequencer};
pub use sender::{EngineConfig, OutboundFile, Sender, SenderReport};
pub use window::FlightWindow;

use thiserror::Error;

/// Failures that abort a transfer run.
///
/// Protocol-level trouble (malformed datagrams, unexpected sequence
/// numbers, lost packets) never surfaces here; those are absorbed locally
/// by discard-and-continue and healed by retransmission.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transport failure")]
    Channel(#[from] ChannelError),
    #[error("could not build a wire packet")]
    Wire(#[from] gbnft_wire::WireError),
    #[error("delivery of a received file failed")]
    Delivery(#[source] anyhow::Error),
}
