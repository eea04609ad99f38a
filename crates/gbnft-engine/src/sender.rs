//! Sender window engine: the client half of the ARQ protocol.
//!
//! The engine runs a three-state machine — fill the window, drain it
//! against incoming ACKs, terminate — over one bounded FIFO of in-flight
//! packets. Loss recovery is go-back-N: a timeout resends the whole window,
//! while steady-state progress is fine-grained, one new packet in for every
//! head packet acknowledged.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gbnft_wire::{self as wire, Packet, WINDOW_SIZE};

use crate::EngineError;
use crate::channel::Channel;
use crate::clock::{Clock, time_until};
use crate::window::{FlightWindow, InFlight};

/// Fixed run parameters, passed in explicitly rather than read from
/// process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retransmission timeout. Fixed for the whole run; the protocol does
    /// not measure RTT.
    pub timeout: Duration,
    /// Window capacity. Must stay below the sequence modulus.
    pub window: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            window: WINDOW_SIZE,
        }
    }
}

/// One file queued for transfer. The whole file travels in a single DATA
/// packet; there is no fragmentation.
#[derive(Debug, Clone)]
pub struct OutboundFile {
    pub name: String,
    pub bytes: Bytes,
}

/// Counters exported at the end of a client run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SenderReport {
    pub files_sent: u32,
    pub packets_sent: u32,
    pub retransmissions: u32,
    pub acks_received: u32,
    pub timeouts: u32,
    /// Largest number of packets simultaneously in flight.
    pub window_peak: usize,
}

pub struct Sender<C, K> {
    channel: C,
    clock: K,
    config: EngineConfig,
    files: std::vec::IntoIter<OutboundFile>,
    window: FlightWindow,
    /// Next sequence number to assign.
    seq: u8,
    /// Sequence field of the last ACK seen, echoed into DATA headers.
    last_recv: u8,
    next_payload_id: u32,
    report: SenderReport,
}

impl<C: Channel, K: Clock> Sender<C, K> {
    pub fn new(files: Vec<OutboundFile>, channel: C, clock: K, config: EngineConfig) -> Self {
        let window = FlightWindow::new(config.window as usize);
        Self {
            channel,
            clock,
            config,
            files: files.into_iter(),
            window,
            seq: 0,
            last_recv: 0,
            next_payload_id: 0,
            report: SenderReport::default(),
        }
    }

    /// Drive the transfer to completion and send the terminating packet.
    pub fn run(mut self) -> Result<SenderReport, EngineError> {
        self.fill_window()?;

        while !self.window.is_empty() {
            self.send_window();

            // Drain: advance one entry per matching ACK until the window
            // empties or the oldest deadline expires.
            while let Some(deadline) = self.window.oldest_deadline() {
                let wait = time_until(self.clock.now(), deadline);
                match self.channel.recv(Some(wait))? {
                    Some(frame) => self.on_frame(&frame)?,
                    None => {
                        self.report.timeouts += 1;
                        debug!("retransmission timeout, resending window");
                        break;
                    }
                }
            }
        }

        // Fire-and-forget handshake: one TERM, never acknowledged. A send
        // failure here cannot be retried into a next cycle, so it is only
        // logged.
        let term = wire::encode(&Packet::term(self.seq));
        match self.channel.send(&term) {
            Ok(_) => self.report.packets_sent += 1,
            Err(e) => warn!(error = %e, "failed to send TERM"),
        }
        info!(
            files = self.report.files_sent,
            packets = self.report.packets_sent,
            retransmissions = self.report.retransmissions,
            "transfer complete"
        );
        Ok(self.report)
    }

    /// FILLING: queue new DATA packets until the window is full or there
    /// are no more files. Nothing is transmitted yet; the first
    /// `send_window` puts the whole batch on the wire.
    fn fill_window(&mut self) -> Result<(), EngineError> {
        while !self.window.is_full() {
            let Some(file) = self.files.next() else { break };
            let entry = self.build_entry(&file)?;
            self.window.push(entry);
            self.report.window_peak = self.report.window_peak.max(self.window.len());
        }
        Ok(())
    }

    fn build_entry(&mut self, file: &OutboundFile) -> Result<InFlight, EngineError> {
        let packet = Packet::data(
            self.seq,
            self.last_recv,
            &file.name,
            file.bytes.clone(),
            self.next_payload_id,
        )?;
        let entry = InFlight {
            seq: self.seq,
            frame: wire::encode(&packet).freeze(),
            deadline: self.clock.now(),
            transmitted: false,
        };
        debug!(seq = self.seq, id = self.next_payload_id, name = %file.name, "queued file");
        self.seq = wire::next(self.seq);
        self.next_payload_id += 1;
        self.report.files_sent += 1;
        Ok(entry)
    }

    /// Transmit every queued packet and stamp every deadline. Send errors
    /// are absorbed: the next timeout cycle retries the whole window.
    fn send_window(&mut self) {
        let deadline = self.clock.now() + self.config.timeout;
        for entry in self.window.iter_mut() {
            match self.channel.send(&entry.frame) {
                Ok(n) => debug!(seq = entry.seq, bytes = n, "sent"),
                Err(e) => warn!(seq = entry.seq, error = %e, "send failed, will retry"),
            }
            self.report.packets_sent += 1;
            if entry.transmitted {
                self.report.retransmissions += 1;
            }
            entry.transmitted = true;
            entry.deadline = deadline;
        }
    }

    fn on_frame(&mut self, frame: &[u8]) -> Result<(), EngineError> {
        let header = match wire::decode_header(frame) {
            Ok(h) => h,
            Err(e) => {
                debug!(error = %e, "discarding malformed datagram");
                return Ok(());
            }
        };
        if !header.is_ack() {
            debug!(flag = header.flag, "ignoring non-ACK packet");
            return Ok(());
        }
        let Some(head_seq) = self.window.head().map(|e| e.seq) else {
            return Ok(());
        };
        if header.last_recv != head_seq {
            // A stale or duplicate ACK; the head is still outstanding.
            debug!(
                acked = header.last_recv,
                head = head_seq,
                "ignoring ACK for non-head packet"
            );
            return Ok(());
        }

        self.report.acks_received += 1;
        self.last_recv = header.seq;
        self.window.pop_head();
        debug!(seq = head_seq, "head acknowledged");

        // Slide: exactly one new packet in for the one acknowledged. The
        // rest of the window keeps its deadlines; only this entry is sent.
        if let Some(file) = self.files.next() {
            let mut entry = self.build_entry(&file)?;
            match self.channel.send(&entry.frame) {
                Ok(n) => debug!(seq = entry.seq, bytes = n, "sent"),
                Err(e) => warn!(seq = entry.seq, error = %e, "send failed, will retry"),
            }
            self.report.packets_sent += 1;
            entry.transmitted = true;
            entry.deadline = self.clock.now() + self.config.timeout;
            self.window.push(entry);
            self.report.window_peak = self.report.window_peak.max(self.window.len());
        }
        Ok(())
    }
}
