/// One discrete state change recorded by a session.
///
/// `seq` is a per-bus counter, so the log replays in the exact order the
/// changes happened regardless of wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub kind: &'static str,
    pub message: String,
}

/// Append-only, in-memory log of session state changes.
#[derive(Debug, Default)]
pub struct EventBus {
    next_seq: u64,
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, kind: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::trace!(kind, %message, "event");
        self.events.push(Event {
            seq: self.next_seq,
            kind,
            message,
        });
        self.next_seq += 1;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of recorded events of `kind`.
    pub fn count(&self, kind: &str) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn last(&self, kind: &str) -> Option<&Event> {
        self.events.iter().rev().find(|e| e.kind == kind)
    }

    /// Takes the recorded events; sequence numbers keep counting.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;

    #[test]
    fn records_events_in_sequence() {
        let mut bus = EventBus::new();
        bus.emit("dataset.added", "no2");
        bus.emit("url.write", "date=2020-01-01");
        assert_eq!(bus.events().len(), 2);
        assert_eq!(bus.events()[0].seq, 0);
        assert_eq!(bus.events()[1].seq, 1);
        assert_eq!(bus.count("url.write"), 1);
        assert_eq!(bus.last("dataset.added").unwrap().message, "no2");
    }

    #[test]
    fn drain_clears_events_but_not_sequence() {
        let mut bus = EventBus::new();
        bus.emit("k", "m");
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.events().is_empty());

        bus.emit("k", "m2");
        assert_eq!(bus.events()[0].seq, 1);
    }
}
