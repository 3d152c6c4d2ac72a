//! raidsim - discrete-event combat rotation simulator
//!
//! A trial plays one encounter through an event queue: casts, global
//! cooldowns, dot ticks, aura expiries and resource regeneration are all
//! scheduled events. The iteration harness runs many seeded trials and
//! reports mean throughput with its confidence interval.

pub mod character;
pub mod combat;
pub mod core;
pub mod error;
pub mod rotation;
pub mod simulator;
pub mod spells;
pub mod utils;

pub use error::{ConfigError, RunError, SimError};
pub use simulator::{run_simulation, CancelToken, Harness, RunRequest, SimReport};
