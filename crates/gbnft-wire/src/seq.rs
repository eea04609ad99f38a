//! Sequence-number arithmetic modulo [`SEQ_MODULUS`].
//!
//! The window size is strictly smaller than the modulus, which is what lets
//! a receiver tell a new packet apart from a wrapped-around duplicate using
//! only one window's worth of history.

use crate::packet::{SEQ_MODULUS, WINDOW_SIZE};

/// The sequence number following `seq`, wrapping at the modulus.
pub fn next(seq: u8) -> u8 {
    (seq + 1) % SEQ_MODULUS
}

/// True iff `seq` is one of the `window` values immediately preceding
/// `expected` in modular order, i.e. a packet that was already delivered
/// and should be re-ACKed without re-delivery.
pub fn already_received(seq: u8, expected: u8, window: u8, modulus: u8) -> bool {
    // Widen before adding: `seq` comes straight off the wire and may be
    // anywhere in u8 range.
    (1..=window as u16).any(|i| (seq as u16 + i) % modulus as u16 == expected as u16)
}

/// How the receiver classifies an arriving sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqClass {
    /// The packet the receiver is waiting for; deliver and advance.
    Expected,
    /// Already delivered; re-ACK, do not re-deliver.
    AlreadyReceived,
    /// More than one window away in either direction; drop.
    OutOfRange,
}

/// Classify `seq` against the receiver's cursor with the protocol's fixed
/// window and modulus.
pub fn classify(seq: u8, expected: u8) -> SeqClass {
    if seq == expected {
        SeqClass::Expected
    } else if already_received(seq, expected, WINDOW_SIZE, SEQ_MODULUS) {
        SeqClass::AlreadyReceived
    } else {
        SeqClass::OutOfRange
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_wraps_at_modulus() {
        assert_eq!(next(0), 1);
        assert_eq!(next(SEQ_MODULUS - 1), 0);
    }

    #[test]
    fn already_received_matches_the_window_behind_expected() {
        // For every cursor position, exactly the `w` predecessors are in
        // range, the cursor itself is not, and nothing farther behind is.
        let (w, n) = (3u8, SEQ_MODULUS);
        for expected in 0..n {
            for i in 1..=w {
                let s = (expected + n - i) % n;
                assert!(already_received(s, expected, w, n), "s={s} exp={expected}");
            }
            assert!(!already_received(expected, expected, w, n));
            for i in (w + 1)..n {
                let s = (expected + n - i) % n;
                assert!(!already_received(s, expected, w, n), "s={s} exp={expected}");
            }
        }
    }

    #[test]
    fn classify_covers_all_three_cases() {
        assert_eq!(classify(5, 5), SeqClass::Expected);
        // 4 is the immediate predecessor of 5
        assert_eq!(classify(4, 5), SeqClass::AlreadyReceived);
        // With the full window (7 of 8) every in-range value other than the
        // cursor is a duplicate; out-of-range only occurs for raw sequence
        // bytes outside the modulus that alias the cursor.
        assert_eq!(classify(5 + SEQ_MODULUS, 5), SeqClass::OutOfRange);
        // A narrower window leaves genuinely out-of-range values.
        assert!(!already_received(1, 5, 3, 8));
    }
}
