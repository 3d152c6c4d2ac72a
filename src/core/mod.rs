//! Engine core: clock, event queue, random stream and the trial loop.

pub mod constants;
pub mod metrics;
pub mod rng;
pub mod scheduler;
pub mod simulation;

pub use metrics::{CastRecord, ResourceFlow, SpellMetrics, TimelineSample, TrialMetrics};
pub use rng::SimRng;
pub use scheduler::{EventHandle, Scheduler};
pub use simulation::{Roster, SimEvent, Simulation};
