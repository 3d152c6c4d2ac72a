//! Outcome resolution and the effect pipeline.

pub mod effects;
pub mod outcome;

pub use effects::{layer_damage, school_multiplier};
pub use outcome::{Outcome, OutcomeResult, OutcomeTable};
