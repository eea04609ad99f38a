//! Bounded FIFO of in-flight DATA packets.
//!
//! The queue is the single source of truth for what is currently
//! unacknowledged. Entries are ordered by transmission order, which is also
//! sequence-number order modulo the window, so the head is always both the
//! oldest packet and the next one the peer must acknowledge.

use std::collections::VecDeque;
use std::time::Instant;

use bytes::Bytes;

/// One unacknowledged DATA packet.
#[derive(Debug, Clone)]
pub struct InFlight {
    pub seq: u8,
    /// Pre-encoded wire frame, reused verbatim on every retransmission.
    pub frame: Bytes,
    /// Retransmission deadline, stamped whenever the frame is sent.
    pub deadline: Instant,
    /// False until the frame has been put on the wire at least once.
    pub transmitted: bool,
}

/// Fixed-capacity deque of [`InFlight`] entries.
#[derive(Debug)]
pub struct FlightWindow {
    entries: VecDeque<InFlight>,
    capacity: usize,
}

impl FlightWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Append a new entry at the tail. Panics if the window is full; the
    /// engine only pushes after checking `is_full`, so a violation is a
    /// bug, not a runtime condition.
    pub fn push(&mut self, entry: InFlight) {
        assert!(
            !self.is_full(),
            "window overflow: {} entries, capacity {}",
            self.entries.len(),
            self.capacity
        );
        self.entries.push_back(entry);
    }

    /// The oldest unacknowledged entry.
    pub fn head(&self) -> Option<&InFlight> {
        self.entries.front()
    }

    /// Acknowledge the head entry and drop it.
    pub fn pop_head(&mut self) -> Option<InFlight> {
        self.entries.pop_front()
    }

    /// Deadline of the oldest entry, the anchor for the next wait.
    pub fn oldest_deadline(&self) -> Option<Instant> {
        self.entries.front().map(|e| e.deadline)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut InFlight> {
        self.entries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: u8) -> InFlight {
        InFlight {
            seq,
            frame: Bytes::from_static(b"frame"),
            deadline: Instant::now(),
            transmitted: false,
        }
    }

    #[test]
    fn fifo_order_and_capacity() {
        let mut w = FlightWindow::new(3);
        for seq in 0..3 {
            w.push(entry(seq));
        }
        assert!(w.is_full());
        assert_eq!(w.head().unwrap().seq, 0);
        assert_eq!(w.pop_head().unwrap().seq, 0);
        assert_eq!(w.head().unwrap().seq, 1);
        assert_eq!(w.len(), 2);
    }

    #[test]
    #[should_panic(expected = "window overflow")]
    fn overfilling_panics() {
        let mut w = FlightWindow::new(1);
        w.push(entry(0));
        w.push(entry(1));
    }

    #[test]
    fn oldest_deadline_tracks_the_head() {
        let mut w = FlightWindow::new(2);
        assert!(w.oldest_deadline().is_none());
        let mut a = entry(0);
        a.deadline = Instant::now();
        let mut b = entry(1);
        b.deadline = a.deadline + std::time::Duration::from_secs(1);
        let (da, _) = (a.deadline, b.deadline);
        w.push(a);
        w.push(b);
        assert_eq!(w.oldest_deadline(), Some(da));
    }
}
