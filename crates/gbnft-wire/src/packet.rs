use bytes::Bytes;

use crate::WireError;

/// Packet type flags. Exactly one is set on any valid packet.
pub mod flags {
    pub const DATA: u8 = 0x1;
    pub const ACK: u8 = 0x2;
    pub const TERM: u8 = 0x4;
}

/// Sliding-window size (max packets in flight).
pub const WINDOW_SIZE: u8 = 7;
/// Sequence numbers live in `0..SEQ_MODULUS`. Must exceed the window size
/// so a wrapped-around duplicate cannot be mistaken for a new packet.
pub const SEQ_MODULUS: u8 = WINDOW_SIZE + 1;
/// Fixed header length on the wire.
pub const HEADER_LEN: usize = 8;
/// Payload id + filename-length fields preceding the filename.
pub const PAYLOAD_META_LEN: usize = 8;
/// Upper bound for a whole datagram (header included).
pub const MAX_DATAGRAM: usize = 1430;
/// Structural-validity marker carried in the last header byte.
pub const SENTINEL: u8 = 0x7f;

/// Fixed 8-byte header.
///
/// `len` is the total datagram length, payload included. `last_recv` is
/// overloaded: on an ACK it names the sequence number being acknowledged
/// (the field the sender matches on), on a DATA packet it echoes the
/// sender's view of the last ACK seen. The sentinel byte is not stored; the
/// codec writes and checks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub len: u32,
    pub seq: u8,
    pub last_recv: u8,
    pub flag: u8,
}

impl Header {
    pub fn is_data(&self) -> bool {
        self.flag == flags::DATA
    }
    pub fn is_ack(&self) -> bool {
        self.flag == flags::ACK
    }
    pub fn is_term(&self) -> bool {
        self.flag == flags::TERM
    }

    /// Number of payload bytes this header declares.
    pub fn payload_len(&self) -> usize {
        (self.len as usize).saturating_sub(HEADER_LEN)
    }
}

/// Application payload of a DATA packet: one whole file plus its name.
///
/// On the wire the filename is NUL-terminated and its length field counts
/// the terminator; in memory the name is a plain string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub id: u32,
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Option<Payload>,
}

impl Packet {
    /// Build a DATA packet carrying one file.
    ///
    /// Fails with [`WireError::Oversize`] if the encoded datagram would not
    /// fit in [`MAX_DATAGRAM`].
    pub fn data(
        seq: u8,
        last_recv: u8,
        filename: &str,
        bytes: Bytes,
        id: u32,
    ) -> Result<Self, WireError> {
        let filename_len = filename.len() + 1; // trailing NUL
        let total = HEADER_LEN + PAYLOAD_META_LEN + filename_len + bytes.len();
        if total > MAX_DATAGRAM {
            return Err(WireError::Oversize(total as u32));
        }
        Ok(Self {
            header: Header {
                len: total as u32,
                seq,
                last_recv,
                flag: flags::DATA,
            },
            payload: Some(Payload {
                id,
                filename: filename.to_string(),
                bytes,
            }),
        })
    }

    /// Header-only acknowledgement.
    ///
    /// `seq` carries the receiver's new expected cursor, `last_recv` the
    /// sequence number being acknowledged. The sender matches on
    /// `last_recv` only.
    pub fn ack(seq: u8, last_recv: u8) -> Self {
        Self {
            header: Header {
                len: HEADER_LEN as u32,
                seq,
                last_recv,
                flag: flags::ACK,
            },
            payload: None,
        }
    }

    /// Header-only session terminator. Fire-and-forget, never ACKed.
    pub fn term(seq: u8) -> Self {
        Self {
            header: Header {
                len: HEADER_LEN as u32,
                seq,
                last_recv: 0,
                flag: flags::TERM,
            },
            payload: None,
        }
    }
}
