//! Live aura and dot state attached to units.

use std::fmt;
use std::time::Duration;

use crate::character::stats::StatKind;
use crate::character::unit::UnitId;
use crate::core::scheduler::EventHandle;

use super::types::{AuraModifier, SpellId, SpellSchool};

/// Identity of a live aura: at most one instance per spell per bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuraKey {
    pub spell: SpellId,
    pub target: UnitId,
}

impl AuraKey {
    pub fn new(spell: SpellId, target: UnitId) -> Self {
        Self { spell, target }
    }
}

impl fmt::Display for AuraKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.spell, self.target)
    }
}

/// Caster state frozen when a dot is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Spell power or attack power, whichever the formula scales with.
    pub power: f64,
    pub crit: f64,
    pub damage_done_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dot {
    pub remaining_ticks: u32,
    pub interval: Duration,
    pub next_tick_at: Duration,
    pub next_tick: Option<EventHandle>,
    pub snapshot: Snapshot,
    pub ticks_done: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aura {
    pub key: AuraKey,
    pub caster: UnitId,
    pub stacks: u32,
    pub applied_at: Duration,
    pub expires_at: Duration,
    pub modifier: Option<AuraModifier>,
    /// Pending `AuraExpire` event; periodic auras expire on their last tick instead.
    pub expire_event: Option<EventHandle>,
    pub dot: Option<Dot>,
}

impl Aura {
    pub fn remaining(&self, now: Duration) -> Duration {
        self.expires_at.saturating_sub(now)
    }

    pub fn is_periodic(&self) -> bool {
        self.dot.is_some()
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.dot.as_ref().map_or(0, |d| d.remaining_ticks)
    }

    /// Extra damage taken from `school`, as a multiplier (1.0 = none).
    pub fn damage_taken_multiplier(&self, school: SpellSchool) -> f64 {
        match self.modifier {
            Some(AuraModifier::DamageTaken {
                school: filter,
                percent_per_stack,
            }) if AuraModifier::matches_school(filter, school) => {
                1.0 + percent_per_stack * self.stacks as f64 / 100.0
            }
            _ => 1.0,
        }
    }

    pub fn damage_done_multiplier(&self, school: SpellSchool) -> f64 {
        match self.modifier {
            Some(AuraModifier::DamageDone {
                school: filter,
                percent_per_stack,
            }) if AuraModifier::matches_school(filter, school) => {
                1.0 + percent_per_stack * self.stacks as f64 / 100.0
            }
            _ => 1.0,
        }
    }

    pub fn stat_bonus(&self) -> Option<(StatKind, f64)> {
        match self.modifier {
            Some(AuraModifier::Stat {
                stat,
                amount_per_stack,
            }) => Some((stat, amount_per_stack * self.stacks as f64)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aura(modifier: AuraModifier, stacks: u32) -> Aura {
        Aura {
            key: AuraKey::new(SpellId(1), UnitId(1)),
            caster: UnitId(0),
            stacks,
            applied_at: Duration::ZERO,
            expires_at: Duration::from_secs(30),
            modifier: Some(modifier),
            expire_event: None,
            dot: None,
        }
    }

    #[test]
    fn test_damage_taken_scales_with_stacks() {
        let a = aura(
            AuraModifier::DamageTaken {
                school: Some(SpellSchool::Shadow),
                percent_per_stack: 2.0,
            },
            5,
        );
        assert!((a.damage_taken_multiplier(SpellSchool::Shadow) - 1.10).abs() < 1e-12);
        assert_eq!(a.damage_taken_multiplier(SpellSchool::Fire), 1.0);
        assert_eq!(a.damage_done_multiplier(SpellSchool::Shadow), 1.0);
    }

    #[test]
    fn test_remaining_saturates() {
        let a = aura(
            AuraModifier::Stat {
                stat: StatKind::Haste,
                amount_per_stack: 0.05,
            },
            2,
        );
        assert_eq!(a.remaining(Duration::from_secs(40)), Duration::ZERO);
        assert_eq!(a.remaining(Duration::from_secs(10)), Duration::from_secs(20));
        assert_eq!(a.stat_bonus(), Some((StatKind::Haste, 0.1)));
    }
}
