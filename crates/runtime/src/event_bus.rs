/// Sequenced event emitted by the session for the host to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<E> {
    pub seq: u64,
    pub payload: E,
}

/// Ordered, drainable queue of events.
///
/// Events keep emission order; `seq` is monotonic across drains so hosts can
/// correlate what they applied with what was logged.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    events: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, payload: E) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.events.push(Event { seq, payload });
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }

    /// Drains and returns payloads only.
    pub fn drain_payloads(&mut self) -> Vec<E> {
        self.drain().into_iter().map(|e| e.payload).collect()
    }
}
