//! Dead-reckoning prediction error measurement
//!
//! Estimates, without server cooperation, how wrong a naive linear
//! extrapolation of *other* players would have been: each peer's position is
//! extrapolated to a common reference instant from two successive snapshots,
//! and the distance between the two extrapolations is the prediction error.
//! The drift terms cancel the evaluating client's own clock error out of the
//! peer timing, isolating network jitter and peer maneuvers.

use crate::util::time::epoch_millis;
use crate::ws::protocol::{GameSnapshot, PlayerSnapshot, Vector2};

/// Snapshots consumed before any samples are emitted, suppressing the noisy
/// values before the session reaches steady state.
pub const WARMUP_TICKS: u32 = 5;

/// One measurement for one peer on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionSample {
    /// Distance between the prior-snapshot and new-snapshot extrapolations.
    pub error: f64,
    /// Distance between the prior and new advertised headings.
    pub direction_change: f64,
}

/// Computes dead-reckoning error between successive extrapolations of peers'
/// positions. One instance per session, activated when the game starts.
pub struct PredictionEvaluator {
    speed: f64,
    cooldown: u32,
    last_snapshot: Option<GameSnapshot>,
}

impl PredictionEvaluator {
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            cooldown: WARMUP_TICKS,
            last_snapshot: None,
        }
    }

    /// Fold in a snapshot and return one sample per peer present in both this
    /// snapshot and the previous one. Empty during warmup and on the very
    /// first snapshot after it.
    ///
    /// `reference_ms` is the wall-clock time of the evaluating client's most
    /// recent accepted movement; `self_drift_ms` is its current drift
    /// estimate.
    pub fn observe(
        &mut self,
        snapshot: &GameSnapshot,
        self_id: &str,
        self_drift_ms: f64,
        reference_ms: f64,
    ) -> Vec<PredictionSample> {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            self.last_snapshot = Some(snapshot.clone());
            return Vec::new();
        }

        let mut samples = Vec::new();
        if let Some(prior) = &self.last_snapshot {
            for (id, current) in &snapshot.players {
                if id == self_id {
                    continue;
                }
                let Some(previous) = prior.players.get(id) else {
                    continue;
                };
                let from_prior = self.extrapolate(previous, self_drift_ms, reference_ms);
                let from_current = self.extrapolate(current, self_drift_ms, reference_ms);
                samples.push(PredictionSample {
                    error: from_prior.distance(from_current),
                    direction_change: previous.direction.distance(current.direction),
                });
            }
        }
        self.last_snapshot = Some(snapshot.clone());
        samples
    }

    /// Linear dead reckoning: advance the advertised position along the
    /// advertised heading for the drift-corrected interval between the
    /// server last hearing from the peer and the reference instant.
    fn extrapolate(&self, peer: &PlayerSnapshot, self_drift_ms: f64, reference_ms: f64) -> Vector2 {
        let heard_ms = epoch_millis(peer.last_heard) + peer.drift - self_drift_ms;
        let duration_secs = (reference_ms - heard_ms) / 1000.0;
        peer.position.advanced(peer.direction, self.speed * duration_secs)
    }
}
