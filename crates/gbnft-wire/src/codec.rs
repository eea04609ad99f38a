//! Wire codec for the file-transfer protocol.
//!
//! Every datagram starts with a fixed 8-byte header; DATA packets append a
//! payload region. No I/O happens here, only byte-level transformation.
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//! Header (8 bytes):
//!   total_length     : 4 bytes   header + payload
//!   sequence_number  : 1 byte
//!   last_received    : 1 byte
//!   type_flag        : 1 byte    0x1=DATA, 0x2=ACK, 0x4=TERM
//!   sentinel         : 1 byte    always 0x7f
//! Payload (DATA only):
//!   payload_id       : 4 bytes
//!   filename_length  : 4 bytes   includes the trailing NUL
//!   filename         : filename_length bytes, NUL-terminated
//!   file_bytes       : total_length - 8 - 8 - filename_length bytes
//! ```
//!
//! Truncated or malformed input is reported as a [`WireError`], never a
//! panic: every field read is bounds-checked before the cursor advances.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::WireError;
use crate::packet::{
    HEADER_LEN, MAX_DATAGRAM, PAYLOAD_META_LEN, SENTINEL, flags, Header, Packet, Payload,
};

/// Serialize a packet into a fresh buffer, header first.
///
/// The length field is taken from the header, which the [`Packet`]
/// constructors compute from the components; it is never trusted from
/// elsewhere.
pub fn encode(packet: &Packet) -> BytesMut {
    let h = &packet.header;
    let mut buf = BytesMut::with_capacity(h.len as usize);
    buf.put_u32(h.len);
    buf.put_u8(h.seq);
    buf.put_u8(h.last_recv);
    buf.put_u8(h.flag);
    buf.put_u8(SENTINEL);
    if let Some(pl) = &packet.payload {
        buf.put_u32(pl.id);
        buf.put_u32(pl.filename.len() as u32 + 1);
        buf.put_slice(pl.filename.as_bytes());
        buf.put_u8(0); // NUL terminator
        buf.put_slice(&pl.bytes);
    }
    buf
}

/// Parse and validate the first 8 bytes of a datagram.
pub fn decode_header(buf: &[u8]) -> Result<Header, WireError> {
    if buf.len() < HEADER_LEN {
        return Err(WireError::Truncated {
            needed: HEADER_LEN,
            have: buf.len(),
        });
    }
    let mut cur = buf;
    let len = cur.get_u32();
    let seq = cur.get_u8();
    let last_recv = cur.get_u8();
    let flag = cur.get_u8();
    let sentinel = cur.get_u8();

    if sentinel != SENTINEL {
        return Err(WireError::BadSentinel(sentinel));
    }
    if !matches!(flag, flags::DATA | flags::ACK | flags::TERM) {
        return Err(WireError::BadFlag(flag));
    }
    if len as usize > MAX_DATAGRAM {
        return Err(WireError::Oversize(len));
    }
    if (len as usize) < HEADER_LEN {
        return Err(WireError::Undersize(len));
    }
    Ok(Header {
        len,
        seq,
        last_recv,
        flag,
    })
}

/// Parse the payload region of a DATA packet (the bytes after the header).
///
/// The filename is forced to be NUL-terminated on decode: the in-memory
/// name stops at the first NUL even if the source bytes carry none.
pub fn decode_payload(region: &[u8]) -> Result<Payload, WireError> {
    if region.len() < PAYLOAD_META_LEN {
        return Err(WireError::Truncated {
            needed: PAYLOAD_META_LEN,
            have: region.len(),
        });
    }
    let mut cur = region;
    let id = cur.get_u32();
    let filename_len = cur.get_u32();
    if filename_len == 0 || filename_len as usize > cur.remaining() {
        return Err(WireError::BadFilenameLen(filename_len));
    }
    let raw_name = &cur[..filename_len as usize];
    let name_end = raw_name
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(raw_name.len());
    let filename = String::from_utf8_lossy(&raw_name[..name_end]).into_owned();
    cur.advance(filename_len as usize);

    Ok(Payload {
        id,
        filename,
        bytes: Bytes::copy_from_slice(cur),
    })
}

/// Parse a whole datagram: header plus, for DATA packets, the payload.
///
/// The payload region is bounded by the declared total length, so trailing
/// garbage in an oversized receive buffer is ignored.
pub fn decode(buf: &[u8]) -> Result<Packet, WireError> {
    let header = decode_header(buf)?;
    let total = header.len as usize;
    if buf.len() < total {
        return Err(WireError::Truncated {
            needed: total,
            have: buf.len(),
        });
    }
    let payload = if header.is_data() {
        Some(decode_payload(&buf[HEADER_LEN..total])?)
    } else {
        None
    };
    Ok(Packet { header, payload })
}
