//! Spell, aura and dot data model.

pub mod aura;
pub mod registry;
pub mod types;

pub use aura::{Aura, AuraKey, Dot, Snapshot};
pub use registry::SpellBook;
pub use types::*;
