/// Wall-clock timestamp in milliseconds, as reported by the host.
///
/// The core never reads a clock itself; hosts pass `now` into every operation
/// that schedules or fires deferred work.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampMs(pub u64);

impl TimestampMs {
    pub fn after(self, delay_ms: u64) -> Self {
        TimestampMs(self.0.saturating_add(delay_ms))
    }

    /// Converts a JS-style `f64` millisecond clock reading.
    ///
    /// Negative and non-finite readings clamp to zero.
    pub fn from_f64_ms(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            TimestampMs(ms as u64)
        } else {
            TimestampMs(0)
        }
    }
}
