//! Combatant stats, resources and units.

pub mod resources;
pub mod stats;
pub mod unit;

pub use resources::{ResourceConfig, ResourceKind, ResourcePool};
pub use stats::{Defenses, StatKind, Stats};
pub use unit::{Unit, UnitId, UnitKind};
