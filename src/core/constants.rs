//! Shared balance constants for the combat engine.
//!
//! All timing and combat-table numbers live here.

use std::time::Duration;

// =============================================================================
// TIMING
// =============================================================================

/// Default global cooldown triggered by most actions.
pub const DEFAULT_GCD: Duration = Duration::from_millis(1500);

/// Haste never reduces the global cooldown below this.
pub const MIN_GCD: Duration = Duration::from_millis(1000);

/// Default interval between mana regeneration ticks.
pub const MANA_REGEN_INTERVAL: Duration = Duration::from_secs(2);

/// Default interval between energy regeneration ticks.
pub const ENERGY_REGEN_INTERVAL: Duration = Duration::from_millis(100);

/// Default interval for rage / runic power decay or generation ticks.
pub const SLOW_RESOURCE_INTERVAL: Duration = Duration::from_secs(1);

/// Interval between diagnostic timeline samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// COMBAT TABLE
// =============================================================================

/// Critical strike multiplier for spells.
pub const SPELL_CRIT_MULTIPLIER: f64 = 1.5;

/// Critical strike multiplier for physical attacks.
pub const PHYSICAL_CRIT_MULTIPLIER: f64 = 2.0;

/// Damage multiplier applied to blocked attacks.
pub const BLOCK_DAMAGE_MULTIPLIER: f64 = 0.7;

/// Armor constant: reduction = armor / (armor + ARMOR_CONSTANT).
pub const ARMOR_CONSTANT: f64 = 15_232.5;

/// Armor mitigation never exceeds this fraction.
pub const MAX_ARMOR_REDUCTION: f64 = 0.75;

/// Threat generated per point of effective healing.
pub const HEAL_THREAT_FACTOR: f64 = 0.5;

// Default boss defenses (level +3)
pub const BOSS_SPELL_MISS: f64 = 0.17;
pub const BOSS_MELEE_MISS: f64 = 0.08;
pub const BOSS_DODGE: f64 = 0.065;
pub const BOSS_PARRY: f64 = 0.14;
pub const BOSS_BLOCK: f64 = 0.05;
pub const BOSS_ARMOR: f64 = 10_643.0;

// =============================================================================
// ENGINE GUARDS
// =============================================================================

/// Decisions one unit may take at a single instant before it is treated as a loop.
pub const MAX_DECISIONS_PER_INSTANT: u32 = 64;

/// Nesting limit for spells triggered by other spells landing.
pub const MAX_TRIGGER_DEPTH: u32 = 4;

/// Trials handed to the worker pool per batch; cancellation is checked between trials.
pub const TRIAL_BATCH_SIZE: u32 = 256;

/// Z-score for the reported confidence interval (95%).
pub const CONFIDENCE_Z: f64 = 1.96;
