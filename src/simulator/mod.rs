//! Monte Carlo harness over the combat engine.
//!
//! A `RunRequest` is validated once, then trials run independently (one RNG
//! stream each) and fold into a `SimReport`:
//! - mean, deviation and confidence interval for DPS, HPS, TPS and damage
//! - per-spell breakdown
//! - player resource flow

mod aggregate;
mod config;
mod report;
mod runner;

pub use aggregate::{Aggregate, RunningStat, StatSummary};
pub use config::{CombatantConfig, EncounterConfig, RunRequest, TargetConfig};
pub use report::{ResourceReport, SimReport, SpellReport, TrialLog};
pub use runner::{run_simulation, CancelToken, Harness};
