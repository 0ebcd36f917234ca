//! Per-client simulation core: walkability, movement generation, clock drift
//! and dead-reckoning accuracy measurement

pub mod clock;
pub mod movement;
pub mod navgrid;
pub mod prediction;

pub use clock::ClockSync;
pub use movement::MovementPlanner;
pub use navgrid::NavGrid;
pub use prediction::PredictionEvaluator;
