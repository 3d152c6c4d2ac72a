//! Resolved stat blocks for combatants and targets.
//!
//! Gear, enchants and consumables are resolved by the caller; the engine only
//! sees the final numbers. Chances are fractions (0.05 = 5%).

use serde::{Deserialize, Serialize};

use crate::core::constants::*;
use crate::error::ConfigError;

/// Offensive stats of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub spell_power: f64,
    pub attack_power: f64,
    pub spell_hit: f64,
    pub melee_hit: f64,
    pub spell_crit: f64,
    pub melee_crit: f64,
    /// Reduces target dodge and parry chance.
    pub expertise: f64,
    /// 0.2 = 20% faster casts and global cooldown.
    pub haste: f64,
}

/// Stats an aura can modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    SpellPower,
    AttackPower,
    SpellHit,
    MeleeHit,
    SpellCrit,
    MeleeCrit,
    Expertise,
    Haste,
}

impl Stats {
    pub fn get(&self, kind: StatKind) -> f64 {
        match kind {
            StatKind::SpellPower => self.spell_power,
            StatKind::AttackPower => self.attack_power,
            StatKind::SpellHit => self.spell_hit,
            StatKind::MeleeHit => self.melee_hit,
            StatKind::SpellCrit => self.spell_crit,
            StatKind::MeleeCrit => self.melee_crit,
            StatKind::Expertise => self.expertise,
            StatKind::Haste => self.haste,
        }
    }

    pub fn add(&mut self, kind: StatKind, amount: f64) {
        let slot = match kind {
            StatKind::SpellPower => &mut self.spell_power,
            StatKind::AttackPower => &mut self.attack_power,
            StatKind::SpellHit => &mut self.spell_hit,
            StatKind::MeleeHit => &mut self.melee_hit,
            StatKind::SpellCrit => &mut self.spell_crit,
            StatKind::MeleeCrit => &mut self.melee_crit,
            StatKind::Expertise => &mut self.expertise,
            StatKind::Haste => &mut self.haste,
        };
        *slot += amount;
    }

    /// Divisor applied to cast times and the global cooldown.
    pub fn haste_divisor(&self) -> f64 {
        1.0 + self.haste.max(0.0)
    }

    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        let named = [
            ("spell_power", self.spell_power),
            ("attack_power", self.attack_power),
            ("spell_hit", self.spell_hit),
            ("melee_hit", self.melee_hit),
            ("spell_crit", self.spell_crit),
            ("melee_crit", self.melee_crit),
            ("expertise", self.expertise),
            ("haste", self.haste),
        ];
        for (name, value) in named {
            validate_non_negative(&format!("{field}.{name}"), value)?;
        }
        Ok(())
    }
}

/// Avoidance and mitigation of a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defenses {
    pub spell_miss: f64,
    pub melee_miss: f64,
    pub dodge: f64,
    pub parry: f64,
    pub block: f64,
    /// Chance to fully resist a spell.
    pub resist: f64,
    pub armor: f64,
}

impl Default for Defenses {
    /// A raid boss three levels above the player.
    fn default() -> Self {
        Self {
            spell_miss: BOSS_SPELL_MISS,
            melee_miss: BOSS_MELEE_MISS,
            dodge: BOSS_DODGE,
            parry: BOSS_PARRY,
            block: BOSS_BLOCK,
            resist: 0.0,
            armor: BOSS_ARMOR,
        }
    }
}

impl Defenses {
    /// A target that never avoids and has no armor.
    pub fn none() -> Self {
        Self {
            spell_miss: 0.0,
            melee_miss: 0.0,
            dodge: 0.0,
            parry: 0.0,
            block: 0.0,
            resist: 0.0,
            armor: 0.0,
        }
    }

    /// Fraction of physical damage that gets through armor.
    pub fn armor_multiplier(&self) -> f64 {
        let armor = self.armor.max(0.0);
        let reduction = (armor / (armor + ARMOR_CONSTANT)).min(MAX_ARMOR_REDUCTION);
        1.0 - reduction
    }

    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        let named = [
            ("spell_miss", self.spell_miss),
            ("melee_miss", self.melee_miss),
            ("dodge", self.dodge),
            ("parry", self.parry),
            ("block", self.block),
            ("resist", self.resist),
            ("armor", self.armor),
        ];
        for (name, value) in named {
            validate_non_negative(&format!("{field}.{name}"), value)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid(field, format!("{value} is not a finite number")));
    }
    if value < 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} is negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get_round_trip_through_kind() {
        let mut stats = Stats::default();
        stats.add(StatKind::SpellPower, 250.0);
        stats.add(StatKind::SpellPower, 50.0);
        stats.add(StatKind::Haste, 0.1);
        assert_eq!(stats.get(StatKind::SpellPower), 300.0);
        assert!((stats.haste_divisor() - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_negative_stat_names_field() {
        let stats = Stats {
            spell_crit: -0.05,
            ..Default::default()
        };
        let err = stats.validate("player.stats").unwrap_err();
        assert!(err.to_string().contains("player.stats.spell_crit"));
    }

    #[test]
    fn test_nan_stat_rejected() {
        let stats = Stats {
            attack_power: f64::NAN,
            ..Default::default()
        };
        assert!(stats.validate("player.stats").is_err());
    }

    #[test]
    fn test_armor_multiplier() {
        assert_eq!(Defenses::none().armor_multiplier(), 1.0);
        let boss = Defenses::default();
        let m = boss.armor_multiplier();
        assert!(m > 0.5 && m < 0.7, "boss armor mitigation {m}");

        let absurd = Defenses {
            armor: 1.0e9,
            ..Defenses::none()
        };
        assert!((absurd.armor_multiplier() - (1.0 - MAX_ARMOR_REDUCTION)).abs() < 1e-12);
    }
}
