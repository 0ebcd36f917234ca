//! Random-walk movement generation constrained by the navgrid

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::ws::protocol::Vector2;

use super::navgrid::NavGrid;

/// Candidate headings tried per tick before the planner gives up and stands
/// still for the tick.
pub const MAX_RETRIES: u32 = 10;

/// Successful ticks a heading is held before a forced redraw.
pub const HOLD_LIMIT: u32 = 50;

/// Headings are drawn uniformly from the 8 compass directions.
const COMPASS_POINTS: u32 = 8;

/// Outcome of one planning tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedMove {
    /// Offset from the current position; zero when standing still.
    pub displacement: Vector2,
    /// Unit heading, or zero on the stand-still fallback.
    pub direction: Vector2,
}

impl PlannedMove {
    pub fn stand_still() -> Self {
        Self {
            displacement: Vector2::default(),
            direction: Vector2::default(),
        }
    }

    pub fn is_stand_still(&self) -> bool {
        self.displacement == Vector2::default() && self.direction == Vector2::default()
    }
}

/// Per-client generator of the next displacement. Holds its heading across
/// ticks until it wraps the hold counter or a candidate gets rejected.
pub struct MovementPlanner {
    heading: f64,
    hold: u32,
    rng: ChaCha8Rng,
}

impl MovementPlanner {
    pub fn new(seed: u64) -> Self {
        Self {
            heading: 0.0,
            hold: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn draw_heading(&mut self) {
        let k = self.rng.gen_range(0..COMPASS_POINTS);
        self.heading = std::f64::consts::TAU * f64::from(k) / f64::from(COMPASS_POINTS);
    }

    /// Plan the next displacement from `position` after `dt_secs` of travel
    /// at `speed` world units per second.
    ///
    /// A candidate failing the walkability check resets the hold counter,
    /// consumes one retry and forces a fresh heading. Exhausting the budget
    /// yields a stand-still; that is the designed fallback, not an error.
    pub fn plan(&mut self, position: Vector2, dt_secs: f64, speed: f64, grid: &NavGrid) -> PlannedMove {
        if self.hold == 0 {
            self.draw_heading();
        }

        let range = dt_secs * speed;
        let mut budget = MAX_RETRIES;
        while budget > 0 {
            let direction = Vector2::new(self.heading.cos(), self.heading.sin());
            let candidate = position.advanced(direction, range);
            if grid.is_walkable(candidate.x, candidate.y) {
                self.hold = (self.hold + 1) % HOLD_LIMIT;
                return PlannedMove {
                    displacement: Vector2::new(candidate.x - position.x, candidate.y - position.y),
                    direction,
                };
            }
            self.hold = 0;
            self.draw_heading();
            budget -= 1;
        }

        PlannedMove::stand_still()
    }
}
