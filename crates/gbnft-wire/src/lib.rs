pub mod codec;
pub mod packet;
pub mod seq;

pub use codec::{decode, decode_header, decode_payload, encode};
pub use packet::{Header, Packet, Payload};
// Re-export flags module from packet so users can name packet types directly
pub use packet::flags;

pub use packet::{HEADER_LEN, MAX_DATAGRAM, PAYLOAD_META_LEN, SENTINEL, SEQ_MODULUS, WINDOW_SIZE};
pub use seq::{SeqClass, already_received, classify, next};

use thiserror::Error;

/// Structural problems found while decoding (or building) a datagram.
///
/// A `WireError` is never fatal at the protocol level: the caller discards
/// the datagram and the retransmission machinery recovers, as if the bytes
/// had been lost in the channel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("datagram truncated: needed {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },
    #[error("bad sentinel byte {0:#04x}")]
    BadSentinel(u8),
    #[error("type flag {0:#04x} is not exactly one of DATA/ACK/TERM")]
    BadFlag(u8),
    #[error("declared length {0} exceeds max datagram size")]
    Oversize(u32),
    #[error("declared length {0} is smaller than the header")]
    Undersize(u32),
    #[error("filename length {0} does not fit the payload region")]
    BadFilenameLen(u32),
}
