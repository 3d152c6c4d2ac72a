//! Attack table resolution.
//!
//! A table is an ordered list of outcome bands built from caster stats and
//! target defenses. One uniform draw in [0, 1) walks the cumulative bands;
//! whatever mass is left after the listed bands is a plain hit.
//!
//! Band order is fixed per rule:
//! - magic:  miss, resist, crit, hit
//! - melee:  miss, dodge, parry*, block*, crit, hit (*caster in front)
//! - tick:   crit (if the periodic effect can crit), hit
//! - always: hit

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::character::stats::{Defenses, Stats};
use crate::core::constants::*;
use crate::spells::types::{OutcomeRule, Spell, SpellSchool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Hit,
    Crit,
    Block,
    Miss,
    Dodge,
    Parry,
    Resist,
}

impl Outcome {
    /// Whether the effect connected (and on-land triggers fire).
    pub fn landed(self) -> bool {
        matches!(self, Outcome::Hit | Outcome::Crit | Outcome::Block)
    }
}

/// Result of resolving one draw against a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeResult {
    pub outcome: Outcome,
    pub multiplier: f64,
}

const MAX_BANDS: usize = 5;

/// Ordered outcome bands. Probabilities are already clamped and never sum past 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeTable {
    bands: [(Outcome, f64); MAX_BANDS],
    len: usize,
    crit_multiplier: f64,
}

impl OutcomeTable {
    fn from_raw(raw: &[(Outcome, f64)], crit_multiplier: f64) -> Self {
        let mut bands = [(Outcome::Hit, 0.0); MAX_BANDS];
        let mut remaining = 1.0;
        for (slot, &(outcome, chance)) in bands.iter_mut().zip(raw) {
            let bounded = if chance.is_nan() { 0.0 } else { chance.clamp(0.0, 1.0) };
            let p = bounded.min(remaining);
            if p != chance {
                trace!(?outcome, chance, clamped = p, "outcome band clamped");
            }
            remaining -= p;
            *slot = (outcome, p);
        }
        Self {
            bands,
            len: raw.len().min(MAX_BANDS),
            crit_multiplier,
        }
    }

    /// Spell table: miss, resist, crit, hit.
    pub fn magic(caster: &Stats, target: &Defenses, crit_multiplier: f64) -> Self {
        Self::from_raw(
            &[
                (Outcome::Miss, target.spell_miss - caster.spell_hit),
                (Outcome::Resist, target.resist),
                (Outcome::Crit, caster.spell_crit),
            ],
            crit_multiplier,
        )
    }

    /// Special attack table: miss, dodge, parry, block, crit, hit.
    ///
    /// Attacks from behind cannot be parried or blocked.
    pub fn melee(caster: &Stats, target: &Defenses, in_front: bool, crit_multiplier: f64) -> Self {
        let miss = (Outcome::Miss, target.melee_miss - caster.melee_hit);
        let dodge = (Outcome::Dodge, target.dodge - caster.expertise);
        let crit = (Outcome::Crit, caster.melee_crit);
        if in_front {
            Self::from_raw(
                &[
                    miss,
                    dodge,
                    (Outcome::Parry, target.parry - caster.expertise),
                    (Outcome::Block, target.block),
                    crit,
                ],
                crit_multiplier,
            )
        } else {
            Self::from_raw(&[miss, dodge, crit], crit_multiplier)
        }
    }

    /// Periodic tick table: crit, hit. `crit` is `None` for dots that cannot crit.
    pub fn tick(crit: Option<f64>, crit_multiplier: f64) -> Self {
        match crit {
            Some(chance) => Self::from_raw(&[(Outcome::Crit, chance)], crit_multiplier),
            None => Self::always_hit(),
        }
    }

    pub fn always_hit() -> Self {
        Self::from_raw(&[], 1.0)
    }

    /// Table for a direct cast of `spell`.
    pub fn for_spell(spell: &Spell, caster: &Stats, target: &Defenses, in_front: bool) -> Self {
        let crit_multiplier = crit_multiplier(spell.school);
        match spell.outcome {
            OutcomeRule::MagicHit => Self::magic(caster, target, crit_multiplier),
            OutcomeRule::MeleeSpecial => Self::melee(caster, target, in_front, crit_multiplier),
            OutcomeRule::AlwaysHit => Self::always_hit(),
        }
    }

    pub fn bands(&self) -> &[(Outcome, f64)] {
        &self.bands[..self.len]
    }

    /// Probability of `outcome`; hit gets the leftover mass.
    pub fn chance(&self, outcome: Outcome) -> f64 {
        let listed: f64 = self
            .bands()
            .iter()
            .filter(|(o, _)| *o == outcome)
            .map(|(_, p)| p)
            .sum();
        if outcome == Outcome::Hit {
            listed + (1.0 - self.bands().iter().map(|(_, p)| p).sum::<f64>()).max(0.0)
        } else {
            listed
        }
    }

    /// Select the band containing `draw` (expected in [0, 1)).
    pub fn resolve(&self, draw: f64) -> OutcomeResult {
        let mut cumulative = 0.0;
        let mut outcome = Outcome::Hit;
        for &(band, p) in self.bands() {
            cumulative += p;
            if draw < cumulative {
                outcome = band;
                break;
            }
        }
        OutcomeResult {
            outcome,
            multiplier: self.multiplier(outcome),
        }
    }

    fn multiplier(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Hit => 1.0,
            Outcome::Crit => self.crit_multiplier,
            Outcome::Block => BLOCK_DAMAGE_MULTIPLIER,
            Outcome::Miss | Outcome::Dodge | Outcome::Parry | Outcome::Resist => 0.0,
        }
    }
}

pub fn crit_multiplier(school: SpellSchool) -> f64 {
    if school.is_physical() {
        PHYSICAL_CRIT_MULTIPLIER
    } else {
        SPELL_CRIT_MULTIPLIER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caster(crit: f64) -> Stats {
        Stats {
            spell_crit: crit,
            melee_crit: crit,
            ..Default::default()
        }
    }

    #[test]
    fn test_magic_band_order() {
        let target = Defenses {
            spell_miss: 0.10,
            resist: 0.05,
            ..Defenses::none()
        };
        let table = OutcomeTable::magic(&caster(0.20), &target, SPELL_CRIT_MULTIPLIER);
        assert_eq!(table.resolve(0.05).outcome, Outcome::Miss);
        assert_eq!(table.resolve(0.12).outcome, Outcome::Resist);
        assert_eq!(table.resolve(0.20).outcome, Outcome::Crit);
        assert_eq!(table.resolve(0.34).outcome, Outcome::Crit);
        assert_eq!(table.resolve(0.36).outcome, Outcome::Hit);
        assert_eq!(table.resolve(0.99).outcome, Outcome::Hit);
    }

    #[test]
    fn test_melee_front_and_behind() {
        let target = Defenses {
            melee_miss: 0.1,
            dodge: 0.1,
            parry: 0.1,
            block: 0.1,
            ..Defenses::none()
        };
        let front = OutcomeTable::melee(&caster(0.1), &target, true, PHYSICAL_CRIT_MULTIPLIER);
        let kinds: Vec<_> = front.bands().iter().map(|(o, _)| *o).collect();
        assert_eq!(
            kinds,
            vec![Outcome::Miss, Outcome::Dodge, Outcome::Parry, Outcome::Block, Outcome::Crit]
        );
        assert_eq!(front.resolve(0.25).outcome, Outcome::Parry);
        assert_eq!(front.resolve(0.35).multiplier, BLOCK_DAMAGE_MULTIPLIER);

        let behind = OutcomeTable::melee(&caster(0.1), &target, false, PHYSICAL_CRIT_MULTIPLIER);
        assert_eq!(behind.chance(Outcome::Parry), 0.0);
        assert_eq!(behind.resolve(0.25).outcome, Outcome::Crit);
        assert_eq!(behind.resolve(0.25).multiplier, PHYSICAL_CRIT_MULTIPLIER);
    }

    #[test]
    fn test_hit_rating_above_miss_clamps_to_zero() {
        let stats = Stats {
            spell_hit: 0.30,
            ..Default::default()
        };
        let table = OutcomeTable::magic(&stats, &Defenses::default(), SPELL_CRIT_MULTIPLIER);
        assert_eq!(table.chance(Outcome::Miss), 0.0);
        assert_eq!(table.resolve(0.0).outcome, Outcome::Hit);
    }

    #[test]
    fn test_bands_never_exceed_total_mass() {
        let target = Defenses {
            spell_miss: 0.7,
            resist: 0.6,
            ..Defenses::none()
        };
        let table = OutcomeTable::magic(&caster(0.5), &target, SPELL_CRIT_MULTIPLIER);
        assert!((table.chance(Outcome::Miss) - 0.7).abs() < 1e-12);
        assert!((table.chance(Outcome::Resist) - 0.3).abs() < 1e-12);
        assert_eq!(table.chance(Outcome::Crit), 0.0);
        assert!(table.chance(Outcome::Hit).abs() < 1e-12);
        assert_eq!(table.resolve(0.999_999).outcome, Outcome::Resist);
    }

    #[test]
    fn test_tick_table() {
        let no_crit = OutcomeTable::tick(None, SPELL_CRIT_MULTIPLIER);
        assert_eq!(no_crit.resolve(0.0).outcome, Outcome::Hit);

        let table = OutcomeTable::tick(Some(0.25), SPELL_CRIT_MULTIPLIER);
        assert_eq!(table.resolve(0.1).outcome, Outcome::Crit);
        assert_eq!(table.resolve(0.1).multiplier, SPELL_CRIT_MULTIPLIER);
        assert_eq!(table.resolve(0.3).outcome, Outcome::Hit);
    }

    #[test]
    fn test_avoidance_has_zero_multiplier() {
        for outcome in [Outcome::Miss, Outcome::Dodge, Outcome::Parry, Outcome::Resist] {
            assert!(!outcome.landed());
            assert_eq!(OutcomeTable::always_hit().multiplier(outcome), 0.0);
        }
    }
}
