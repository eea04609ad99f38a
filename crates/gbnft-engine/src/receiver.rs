//! Receiver sequencer: the server half of the ARQ protocol.
//!
//! One cursor — the next expected sequence number — classifies every
//! arriving DATA packet as expected, duplicate-in-window or out of range.
//! Expected packets are delivered upward exactly once; duplicates are
//! re-ACKed so a sender whose ACK got lost can make progress; everything
//! else is dropped. The session assumes a single sender at a time.

use serde::Serialize;
use tracing::{debug, info, warn};

use gbnft_wire::{self as wire, Packet, Payload, SeqClass};

use crate::EngineError;
use crate::channel::Channel;

/// Where delivered files go: the catalog/comparator boundary.
pub trait Delivery {
    fn deliver(&mut self, file: Payload) -> anyhow::Result<()>;
}

/// Pure expected-sequence state. Owns no I/O, so the classification and
/// the asymmetric ACK field mapping are testable in isolation.
#[derive(Debug, Default)]
pub struct Sequencer {
    expected: u8,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected(&self) -> u8 {
        self.expected
    }

    pub fn classify(&self, seq: u8) -> SeqClass {
        wire::classify(seq, self.expected)
    }

    /// Accept the expected packet `seq`: advance the cursor and build the
    /// ACK. The ACK's `last_recv` names the packet just accepted — the
    /// field the sender matches on — while its `seq` carries the *new*
    /// expected cursor, informational only.
    pub fn accept(&mut self, seq: u8) -> Packet {
        self.expected = wire::next(seq);
        Packet::ack(self.expected, seq)
    }

    /// Re-acknowledge an already-delivered packet without advancing.
    pub fn reack(&self, seq: u8) -> Packet {
        Packet::ack(self.expected, seq)
    }
}

/// Counters exported at the end of a server session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReceiverReport {
    pub files_delivered: u32,
    pub duplicates: u32,
    pub out_of_range: u32,
}

pub struct Receiver<C> {
    channel: C,
    seqr: Sequencer,
    report: ReceiverReport,
}

impl<C: Channel> Receiver<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            seqr: Sequencer::new(),
            report: ReceiverReport::default(),
        }
    }

    /// Serve one session: loop until a TERM packet arrives, handing each
    /// newly delivered payload to `delivery`.
    ///
    /// Malformed datagrams and transport hiccups are absorbed — the sender
    /// retransmits — so the only errors that abort the session come from
    /// `delivery` itself.
    pub fn run(mut self, delivery: &mut dyn Delivery) -> Result<ReceiverReport, EngineError> {
        loop {
            let frame = match self.channel.recv(None) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "receive failed, still waiting");
                    continue;
                }
            };
            let header = match wire::decode_header(&frame) {
                Ok(h) => h,
                Err(e) => {
                    debug!(error = %e, "discarding malformed datagram");
                    continue;
                }
            };

            if header.is_term() {
                // End of session; TERM is never acknowledged.
                info!("connection terminated by sender");
                break;
            }
            if !header.is_data() {
                debug!(flag = header.flag, "ignoring non-DATA packet");
                continue;
            }

            match self.seqr.classify(header.seq) {
                SeqClass::Expected => {
                    let payload = match wire::decode(&frame) {
                        Ok(p) => p.payload,
                        Err(e) => {
                            // Header said DATA but the payload region is
                            // broken; treat the datagram as lost.
                            debug!(error = %e, "discarding DATA with malformed payload");
                            continue;
                        }
                    };
                    let Some(payload) = payload else { continue };
                    debug!(
                        seq = header.seq,
                        id = payload.id,
                        name = %payload.filename,
                        "accepted payload"
                    );
                    let ack = self.seqr.accept(header.seq);
                    self.send_ack(&ack);
                    delivery.deliver(payload).map_err(EngineError::Delivery)?;
                    self.report.files_delivered += 1;
                }
                SeqClass::AlreadyReceived => {
                    debug!(seq = header.seq, "already received, re-ACKing");
                    let ack = self.seqr.reack(header.seq);
                    self.send_ack(&ack);
                    self.report.duplicates += 1;
                }
                SeqClass::OutOfRange => {
                    // No recovery path is defined here; under reordering
                    // beyond the window the protocol simply drops.
                    warn!(
                        seq = header.seq,
                        expected = self.seqr.expected(),
                        "sequence number out of window, dropping"
                    );
                    self.report.out_of_range += 1;
                }
            }
        }
        Ok(self.report)
    }

    fn send_ack(&mut self, ack: &Packet) {
        let frame = wire::encode(ack);
        if let Err(e) = self.channel.send(&frame) {
            // The sender's retransmission will solicit another ACK.
            warn!(error = %e, "failed to send ACK");
        }
    }
}
