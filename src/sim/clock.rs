//! Clock drift estimation against the server's declared time

/// Two-sample running average of the offset between the local clock and the
/// server's declared time, in milliseconds.
///
/// Deliberately not a smoothing filter: only the immediately preceding
/// reported value participates. The estimate gives the other evaluators a
/// common time base across independently-clocked machines; it makes no
/// sub-millisecond accuracy claim.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockSync {
    drift_ms: f64,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the estimate and return it.
    ///
    /// `reported_drift_ms` is the drift value echoed back by the server from
    /// the last exchange; `server_ms` and `local_ms` are the snapshot's
    /// declared timestamp and the local receive time, both epoch millis.
    pub fn update(&mut self, reported_drift_ms: f64, server_ms: f64, local_ms: f64) -> f64 {
        self.drift_ms = (reported_drift_ms + (server_ms - local_ms)) / 2.0;
        self.drift_ms
    }

    /// Current estimate, echoed in the next outbound frame.
    pub fn drift_ms(&self) -> f64 {
        self.drift_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_is_the_exact_two_sample_mean() {
        let mut clock = ClockSync::new();
        let drift = clock.update(10.0, 1_000.0, 980.0);
        assert_eq!(drift, (10.0 + (1_000.0 - 980.0)) / 2.0);
        assert_eq!(clock.drift_ms(), 15.0);
    }

    #[test]
    fn feeding_back_a_converged_estimate_is_a_fixed_point() {
        // Once the reported drift equals the observed offset, repeating the
        // update with its own output leaves the estimate unchanged.
        let mut clock = ClockSync::new();
        let offset = 42.0; // server is 42ms ahead
        let first = clock.update(offset, 1_042.0, 1_000.0);
        assert_eq!(first, offset);

        let second = clock.update(clock.drift_ms(), 2_042.0, 2_000.0);
        let third = clock.update(clock.drift_ms(), 3_042.0, 3_000.0);
        assert_eq!(second, offset);
        assert_eq!(third, offset);
    }

    #[test]
    fn update_recomputes_rather_than_accumulates() {
        let mut clock = ClockSync::new();
        clock.update(100.0, 0.0, 0.0);
        // A fresh observation fully determines the next value from the
        // reported drift and offset alone.
        let drift = clock.update(0.0, 500.0, 500.0);
        assert_eq!(drift, 0.0);
    }
}
