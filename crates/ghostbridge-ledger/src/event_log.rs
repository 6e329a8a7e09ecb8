//! Append-only notification log.
//!
//! Sequence numbers start at 0 and never repeat or skip among published
//! events. Observers resume with [`EventLog::since`], passing the next
//! sequence they expect.

use chrono::{DateTime, Utc};
use ghostbridge_types::{EventKind, GhostId, LedgerEvent, LedgerId};

#[derive(Debug)]
pub struct EventLog {
    ledger: LedgerId,
    events: Vec<LedgerEvent>,
}

impl EventLog {
    #[must_use]
    pub fn new(ledger: LedgerId) -> Self {
        Self {
            ledger,
            events: Vec::new(),
        }
    }

    /// Append one event and return a copy of it.
    pub fn append(&mut self, ghost: GhostId, kind: EventKind, at: DateTime<Utc>) -> LedgerEvent {
        let event = LedgerEvent {
            seq: self.events.len() as u64,
            ledger: self.ledger,
            ghost,
            kind,
            at,
        };
        tracing::debug!(ledger = %self.ledger, seq = event.seq, ghost = %ghost, kind = %kind, "event");
        self.events.push(event.clone());
        event
    }

    /// Events with `seq >= cursor`, oldest first.
    #[must_use]
    pub fn since(&self, cursor: u64) -> &[LedgerEvent] {
        let start = usize::try_from(cursor).map_or(self.events.len(), |c| c.min(self.events.len()));
        &self.events[start..]
    }

    /// Remove events with `seq >= from`. Only for events no observer has
    /// been handed yet.
    pub(crate) fn truncate(&mut self, from: u64) {
        if let Ok(from) = usize::try_from(from) {
            self.events.truncate(from);
        }
    }

    /// Every event concerning `ghost`, oldest first.
    #[must_use]
    pub fn for_ghost(&self, ghost: &GhostId) -> Vec<&LedgerEvent> {
        self.events.iter().filter(|e| e.ghost == *ghost).collect()
    }

    /// Sequence number the next append will receive.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.events.len() as u64
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_contiguous() {
        let mut log = EventLog::new(LedgerId(1));
        let g = GhostId([1u8; 32]);
        let now = Utc::now();
        for i in 0..3 {
            let ev = log.append(g, EventKind::GhostLocked, now);
            assert_eq!(ev.seq, i);
        }
        assert_eq!(log.next_seq(), 3);
    }

    #[test]
    fn since_resumes_from_cursor() {
        let mut log = EventLog::new(LedgerId(1));
        let now = Utc::now();
        log.append(GhostId([1u8; 32]), EventKind::GhostLocked, now);
        log.append(GhostId([2u8; 32]), EventKind::GhostBurned, now);

        assert_eq!(log.since(0).len(), 2);
        assert_eq!(log.since(1)[0].kind, EventKind::GhostBurned);
        assert!(log.since(2).is_empty());
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn truncate_reuses_sequence() {
        let mut log = EventLog::new(LedgerId(1));
        let now = Utc::now();
        log.append(GhostId([1u8; 32]), EventKind::GhostLocked, now);
        log.append(GhostId([1u8; 32]), EventKind::GhostBurned, now);
        log.truncate(1);
        assert_eq!(log.next_seq(), 1);
        let ev = log.append(GhostId([2u8; 32]), EventKind::GhostLocked, now);
        assert_eq!(ev.seq, 1);
    }

    #[test]
    fn for_ghost_filters() {
        let mut log = EventLog::new(LedgerId(1));
        let now = Utc::now();
        let a = GhostId([1u8; 32]);
        log.append(a, EventKind::GhostLocked, now);
        log.append(GhostId([2u8; 32]), EventKind::GhostLocked, now);
        log.append(a, EventKind::GhostBurned, now);
        assert_eq!(log.for_ghost(&a).len(), 2);
    }
}
