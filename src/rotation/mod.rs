//! Action-priority rotations.

pub mod interpreter;
pub mod types;

pub use interpreter::{Decision, RotationPhase, RotationState};
pub use types::{Action, ActionTarget, AuraHolder, CompareOp, Condition, PrepullCast, Rotation, Rule, Value};
