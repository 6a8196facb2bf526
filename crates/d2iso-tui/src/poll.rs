//! PollGate — ordering guard for the status poll.
//!
//! Polls are spawned on a fixed interval and each response carries the
//! sequence number it was issued with.  A response is accepted only if no
//! newer poll has been issued since; a slow response can therefore never
//! overwrite the state written by a faster, later one.

/// Monotonic sequence gate.  `next_seq` stamps an outgoing poll,
/// `accept` decides whether its response may still be applied.
#[derive(Debug, Default)]
pub struct PollGate {
    issued: u64,
    applied: u64,
}

impl PollGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new outgoing poll.
    pub fn next_seq(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Accept a response iff it is newer than everything applied so far
    /// and no later poll's response has been applied in between.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_responses_accepted() {
        let mut gate = PollGate::new();
        let a = gate.next_seq();
        let b = gate.next_seq();
        assert!(gate.accept(a));
        assert!(gate.accept(b));
    }

    #[test]
    fn stale_response_rejected_after_newer_applied() {
        let mut gate = PollGate::new();
        let slow = gate.next_seq();
        let fast = gate.next_seq();
        // The later poll returns first.
        assert!(gate.accept(fast));
        assert!(!gate.accept(slow), "out-of-order response must be dropped");
    }

    #[test]
    fn duplicate_response_rejected() {
        let mut gate = PollGate::new();
        let a = gate.next_seq();
        assert!(gate.accept(a));
        assert!(!gate.accept(a));
    }
}
