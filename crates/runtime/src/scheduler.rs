use foundation::time::TimestampMs;

/// Deterministic queue of fire-and-forget deferred tasks.
///
/// Tasks are never cancelled. When several are due at once they run in
/// `(due, insertion_order)` order, so a later-scheduled task with the same
/// deadline always runs after an earlier one.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_order: u64,
    pending: Vec<(TimestampMs, u64, T)>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_order: 0,
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, due: TimestampMs, task: T) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.pending.push((due, order, task));
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest pending deadline, if any.
    pub fn next_due(&self) -> Option<TimestampMs> {
        self.pending.iter().map(|(due, _, _)| *due).min()
    }

    /// Removes and returns every task due at or before `now`.
    pub fn take_due(&mut self, now: TimestampMs) -> Vec<T> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(at, _, _)| *at <= now);
        self.pending = rest;

        due.sort_by(|(a_at, a_order, _), (b_at, b_order, _)| {
            a_at.cmp(b_at).then_with(|| a_order.cmp(b_order))
        });
        if !due.is_empty() {
            tracing::trace!(count = due.len(), now = now.0, "deferred tasks due");
        }
        due.into_iter().map(|(_, _, task)| task).collect()
    }
}
