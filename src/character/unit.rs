//! Combatants and targets.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use super::resources::{ResourceKind, ResourcePool};
use super::stats::{Defenses, Stats};
use crate::core::scheduler::EventHandle;
use crate::spells::aura::Aura;
use crate::spells::types::{SpellId, SpellSchool};

/// Index of a unit in the trial roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub usize);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Player,
    Pet,
    Target,
}

/// A cast waiting on its cast time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cast {
    pub spell: SpellId,
    pub target: UnitId,
    pub started_at: Duration,
    pub completes_at: Duration,
    pub event: EventHandle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    /// Owning player, for pets.
    pub owner: Option<UnitId>,
    pub stats: Stats,
    pub defenses: Defenses,
    pub resources: BTreeMap<ResourceKind, ResourcePool>,
    pub auras: BTreeMap<SpellId, Aura>,
    /// Time each spell comes off cooldown.
    pub cooldowns: BTreeMap<SpellId, Duration>,
    pub gcd_ready_at: Duration,
    pub casting: Option<Cast>,
    /// Threat generated against this unit, by attacker.
    pub threat: BTreeMap<UnitId, f64>,
    /// `None` means the unit cannot die.
    pub health: Option<Health>,
    pub target: Option<UnitId>,
    pub in_front_of_target: bool,
    pub threat_multiplier: f64,
}

impl Unit {
    pub fn new(id: UnitId, name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            owner: None,
            stats: Stats::default(),
            defenses: Defenses::none(),
            resources: BTreeMap::new(),
            auras: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            gcd_ready_at: Duration::ZERO,
            casting: None,
            threat: BTreeMap::new(),
            health: None,
            target: None,
            in_front_of_target: false,
            threat_multiplier: 1.0,
        }
    }

    pub fn is_target(&self) -> bool {
        self.kind == UnitKind::Target
    }

    pub fn is_casting(&self) -> bool {
        self.casting.is_some()
    }

    pub fn cooldown_remaining(&self, spell: SpellId, now: Duration) -> Duration {
        self.cooldowns
            .get(&spell)
            .map_or(Duration::ZERO, |ready_at| ready_at.saturating_sub(now))
    }

    pub fn gcd_remaining(&self, now: Duration) -> Duration {
        self.gcd_ready_at.saturating_sub(now)
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourcePool> {
        self.resources.get(&kind)
    }

    pub fn resource_mut(&mut self, kind: ResourceKind) -> Option<&mut ResourcePool> {
        self.resources.get_mut(&kind)
    }

    pub fn is_alive(&self) -> bool {
        self.health.map_or(true, |h| h.current > 0.0)
    }

    pub fn health_percent(&self) -> f64 {
        match self.health {
            Some(h) if h.max > 0.0 => h.current / h.max * 100.0,
            Some(_) => 0.0,
            None => 100.0,
        }
    }

    /// Remove health. Returns the damage actually absorbed by the pool.
    pub fn take_damage(&mut self, amount: f64) -> f64 {
        match &mut self.health {
            Some(h) => {
                let taken = amount.min(h.current).max(0.0);
                h.current -= taken;
                taken
            }
            None => amount,
        }
    }

    /// Restore health. Returns `(effective, overheal)`.
    pub fn heal(&mut self, amount: f64) -> (f64, f64) {
        match &mut self.health {
            Some(h) => {
                let effective = amount.min(h.max - h.current).max(0.0);
                h.current += effective;
                (effective, amount - effective)
            }
            None => (amount, 0.0),
        }
    }

    pub fn add_threat(&mut self, from: UnitId, amount: f64) {
        *self.threat.entry(from).or_insert(0.0) += amount;
    }

    pub fn threat_from(&self, from: UnitId) -> f64 {
        self.threat.get(&from).copied().unwrap_or(0.0)
    }

    /// Base stats plus live aura bonuses.
    pub fn effective_stats(&self) -> Stats {
        let mut stats = self.stats;
        for (stat, amount) in self.auras.values().filter_map(Aura::stat_bonus) {
            stats.add(stat, amount);
        }
        stats
    }

    /// Product of damage-done buffs on this unit for `school`.
    pub fn damage_done_multiplier(&self, school: SpellSchool) -> f64 {
        self.auras
            .values()
            .map(|a| a.damage_done_multiplier(school))
            .product()
    }

    /// Product of damage-taken debuffs on this unit for `school`.
    pub fn damage_taken_multiplier(&self, school: SpellSchool) -> f64 {
        self.auras
            .values()
            .map(|a| a.damage_taken_multiplier(school))
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::stats::StatKind;
    use crate::spells::aura::AuraKey;
    use crate::spells::types::AuraModifier;

    fn buff(spell: u32, modifier: AuraModifier) -> Aura {
        Aura {
            key: AuraKey::new(SpellId(spell), UnitId(0)),
            caster: UnitId(0),
            stacks: 1,
            applied_at: Duration::ZERO,
            expires_at: Duration::from_secs(20),
            modifier: Some(modifier),
            expire_event: None,
            dot: None,
        }
    }

    #[test]
    fn test_cooldown_remaining_never_negative() {
        let mut unit = Unit::new(UnitId(0), "Player", UnitKind::Player);
        unit.cooldowns.insert(SpellId(1), Duration::from_secs(6));
        assert_eq!(unit.cooldown_remaining(SpellId(1), Duration::from_secs(4)), Duration::from_secs(2));
        assert_eq!(unit.cooldown_remaining(SpellId(1), Duration::from_secs(9)), Duration::ZERO);
        assert_eq!(unit.cooldown_remaining(SpellId(2), Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_health_clamps() {
        let mut unit = Unit::new(UnitId(1), "Boss", UnitKind::Target);
        unit.health = Some(Health { current: 100.0, max: 100.0 });
        assert_eq!(unit.take_damage(30.0), 30.0);
        assert_eq!(unit.take_damage(500.0), 70.0);
        assert!(!unit.is_alive());
        assert_eq!(unit.heal(40.0), (40.0, 0.0));
        assert_eq!(unit.heal(100.0), (60.0, 40.0));
    }

    #[test]
    fn test_effective_stats_include_auras() {
        let mut unit = Unit::new(UnitId(0), "Player", UnitKind::Player);
        unit.stats.spell_power = 1000.0;
        unit.auras.insert(
            SpellId(7),
            buff(
                7,
                AuraModifier::Stat {
                    stat: StatKind::SpellPower,
                    amount_per_stack: 200.0,
                },
            ),
        );
        unit.auras.insert(
            SpellId(8),
            buff(
                8,
                AuraModifier::DamageDone {
                    school: None,
                    percent_per_stack: 10.0,
                },
            ),
        );
        assert_eq!(unit.effective_stats().spell_power, 1200.0);
        assert_eq!(unit.stats.spell_power, 1000.0);
        assert!((unit.damage_done_multiplier(SpellSchool::Arcane) - 1.1).abs() < 1e-12);
    }
}
