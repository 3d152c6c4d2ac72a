//! Effect pipeline: turns a landed spell into damage, healing, auras and
//! resource changes.
//!
//! Per target the RNG is drawn in a fixed order: the damage roll first (only
//! when the formula has a range), then the outcome draw. Damage multipliers
//! are layered as separate multiplications in this order:
//!
//! 1. outcome (crit, block)
//! 2. school: spell multiplier, caster damage-done buffs, armor for physical
//! 3. target damage-taken debuffs, always read live
//! 4. split between targets for split area effects

use tracing::{debug, trace};

use super::outcome::{crit_multiplier, Outcome, OutcomeResult, OutcomeTable};
use crate::character::stats::Defenses;
use crate::character::unit::UnitId;
use crate::core::constants::{HEAL_THREAT_FACTOR, MAX_TRIGGER_DEPTH};
use crate::core::metrics::CastRecord;
use crate::core::simulation::{scaling_power, Simulation};
use crate::error::SimError;
use crate::spells::aura::Snapshot;
use crate::spells::types::{DamageFormula, EffectKind, PeriodicConfig, Spell, SpellId};

/// Final damage from a base amount and its multiplier layers.
pub fn layer_damage(base: f64, outcome: f64, school: f64, debuff: f64, split: f64) -> f64 {
    let mut amount = base;
    amount *= outcome;
    amount *= school;
    amount *= debuff;
    amount *= split;
    amount.max(0.0)
}

/// Spell multiplier x caster damage-done modifiers x armor for physical hits.
pub fn school_multiplier(spell: &Spell, damage_done: f64, target: &Defenses) -> f64 {
    let armor = if spell.school.is_physical() {
        target.armor_multiplier()
    } else {
        1.0
    };
    spell.damage_multiplier * damage_done * armor
}

impl<'a> Simulation<'a> {
    /// Resolve and apply a landed cast of `spell_id`, then its on-land triggers.
    pub(crate) fn cast_effect(
        &mut self,
        caster: UnitId,
        spell_id: SpellId,
        target: UnitId,
        depth: u32,
    ) -> Result<(), SimError> {
        if depth > MAX_TRIGGER_DEPTH {
            return Err(SimError::TriggerDepth {
                spell: spell_id,
                limit: MAX_TRIGGER_DEPTH,
            });
        }
        let book = self.book;
        let spell = book.spell(spell_id)?;

        let landed = match &spell.effect {
            EffectKind::DirectDamage { formula } => {
                if self.unit(target)?.is_alive() {
                    self.strike(caster, spell, target, formula, 1.0)?.landed()
                } else {
                    false
                }
            }
            EffectKind::AoeDamage { formula, split } => {
                let victims: Vec<UnitId> = self.live_targets().collect();
                let share = if *split && !victims.is_empty() {
                    1.0 / victims.len() as f64
                } else {
                    1.0
                };
                let mut any = false;
                for victim in victims {
                    any |= self.strike(caster, spell, victim, formula, share)?.landed();
                }
                any
            }
            EffectKind::Periodic(_) => {
                let outcome = self.resolve_application(caster, spell, target)?;
                if outcome.landed() {
                    self.apply_aura(caster, spell_id, target)?;
                }
                outcome.landed()
            }
            EffectKind::ApplyAura { on_caster, .. } => {
                let bearer = if *on_caster { caster } else { target };
                let outcome = if spell.effect.is_harmful() {
                    self.resolve_application(caster, spell, target)?
                } else {
                    self.record(caster, spell, bearer, Outcome::Hit, 0.0, false);
                    Outcome::Hit
                };
                if outcome.landed() {
                    self.apply_aura(caster, spell_id, bearer)?;
                }
                outcome.landed()
            }
            EffectKind::Heal { formula } => {
                self.heal(caster, spell, formula)?;
                true
            }
            EffectKind::ResourceGain { resource, amount } => {
                if let Some(pool) = self.unit_mut(caster)?.resource_mut(*resource) {
                    let gained = pool.gain(*amount);
                    trace!(%caster, ?resource, gained, "resource gained");
                }
                self.record(caster, spell, caster, Outcome::Hit, *amount, false);
                true
            }
        };

        if landed {
            for &triggered in &spell.on_land {
                debug!(%caster, from = %spell.name, spell = %triggered, depth = depth + 1, "triggered");
                self.metrics.spell_mut(triggered).casts += 1;
                self.cast_effect(caster, triggered, target, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Direct damage against one target.
    fn strike(
        &mut self,
        caster: UnitId,
        spell: &Spell,
        target: UnitId,
        formula: &DamageFormula,
        split: f64,
    ) -> Result<Outcome, SimError> {
        let attacker = self.unit(caster)?;
        let stats = attacker.effective_stats();
        let in_front = attacker.in_front_of_target;
        let damage_done = attacker.damage_done_multiplier(spell.school);
        let defenses = self.unit(target)?.defenses;

        let base = self.rng.roll_range(formula.min, formula.max)
            + formula.coefficient * scaling_power(&stats, formula.scaling);
        let table = OutcomeTable::for_spell(spell, &stats, &defenses, in_front);
        let result = self.roll_outcome(&table);

        let debuff = self.unit(target)?.damage_taken_multiplier(spell.school);
        let amount = layer_damage(
            base,
            result.multiplier,
            school_multiplier(spell, damage_done, &defenses),
            debuff,
            split,
        );
        self.metrics.spell_mut(spell.id).record_outcome(result.outcome);
        self.deal_damage(caster, spell, target, amount, result.outcome, false)?;
        Ok(result.outcome)
    }

    /// One dot tick against `target`, using the snapshot taken at application.
    pub(crate) fn periodic_hit(
        &mut self,
        caster: UnitId,
        spell: &Spell,
        periodic: &PeriodicConfig,
        snapshot: &Snapshot,
        stacks: u32,
        target: UnitId,
    ) -> Result<(), SimError> {
        let formula = &periodic.formula;
        let base = self.rng.roll_range(formula.min, formula.max) + formula.coefficient * snapshot.power;
        let crit = periodic.can_crit.then_some(snapshot.crit);
        let table = OutcomeTable::tick(crit, crit_multiplier(spell.school));
        let result = self.roll_outcome(&table);

        let defenses = self.unit(target)?.defenses;
        let debuff = self.unit(target)?.damage_taken_multiplier(spell.school);
        let amount = layer_damage(
            base,
            result.multiplier,
            school_multiplier(spell, snapshot.damage_done_multiplier, &defenses),
            debuff,
            1.0,
        ) * stacks as f64;
        if result.outcome == Outcome::Crit {
            self.metrics.spell_mut(spell.id).crits += 1;
        }
        self.deal_damage(caster, spell, target, amount, result.outcome, true)
    }

    /// Hit check for applying a harmful aura or dot. No damage roll.
    fn resolve_application(&mut self, caster: UnitId, spell: &Spell, target: UnitId) -> Result<Outcome, SimError> {
        if !self.unit(target)?.is_alive() {
            return Ok(Outcome::Miss);
        }
        let attacker = self.unit(caster)?;
        let stats = attacker.effective_stats();
        let in_front = attacker.in_front_of_target;
        let defenses = self.unit(target)?.defenses;
        let table = OutcomeTable::for_spell(spell, &stats, &defenses, in_front);
        // An application either lands or not; crit and block only matter for damage.
        let outcome = match self.roll_outcome(&table).outcome {
            Outcome::Crit | Outcome::Block => Outcome::Hit,
            other => other,
        };
        self.metrics.spell_mut(spell.id).record_application(outcome);
        self.record(caster, spell, target, outcome, 0.0, false);
        Ok(outcome)
    }

    fn heal(&mut self, caster: UnitId, spell: &Spell, formula: &DamageFormula) -> Result<(), SimError> {
        let healer = self.unit(caster)?;
        let stats = healer.effective_stats();
        let threat_modifier = healer.threat_multiplier;
        let threat_target = healer.target;

        let base = self.rng.roll_range(formula.min, formula.max)
            + formula.coefficient * scaling_power(&stats, formula.scaling);
        let crit = if spell.school.is_physical() {
            stats.melee_crit
        } else {
            stats.spell_crit
        };
        let table = OutcomeTable::tick(Some(crit), crit_multiplier(spell.school));
        let result = self.roll_outcome(&table);
        let amount = base * result.multiplier * spell.damage_multiplier;

        let (effective, overheal) = self.unit_mut(caster)?.heal(amount);
        let threat = effective * HEAL_THREAT_FACTOR * spell.threat_multiplier * threat_modifier;
        if let Some(enemy) = threat_target {
            self.unit_mut(enemy)?.add_threat(caster, threat);
        }
        self.metrics.spell_mut(spell.id).record_outcome(result.outcome);
        self.metrics.record_healing(spell.id, effective, overheal, threat);
        self.record(caster, spell, caster, result.outcome, effective, false);
        Ok(())
    }

    fn deal_damage(
        &mut self,
        caster: UnitId,
        spell: &Spell,
        target: UnitId,
        amount: f64,
        outcome: Outcome,
        periodic: bool,
    ) -> Result<(), SimError> {
        let threat = amount * spell.threat_multiplier * self.unit(caster)?.threat_multiplier;
        let victim = self.unit_mut(target)?;
        let was_alive = victim.is_alive();
        victim.take_damage(amount);
        victim.add_threat(caster, threat);
        if was_alive && !victim.is_alive() {
            debug!(at = ?self.now(), %target, "target died");
        }
        self.metrics.record_damage(spell.id, amount, threat, periodic);
        self.record(caster, spell, target, outcome, amount, periodic);
        Ok(())
    }

    /// Draw against `table`. Only a table with no bands at all skips the draw.
    fn roll_outcome(&mut self, table: &OutcomeTable) -> OutcomeResult {
        if table.bands().is_empty() {
            return table.resolve(0.0);
        }
        let draw = self.rng.next_f64();
        table.resolve(draw)
    }

    fn record(&mut self, caster: UnitId, spell: &Spell, target: UnitId, outcome: Outcome, amount: f64, periodic: bool) {
        if !self.diagnostics {
            return;
        }
        let at_secs = self.now().as_secs_f64();
        self.metrics.log_cast(CastRecord {
            at_secs,
            caster: caster.0,
            spell: spell.id,
            target: target.0,
            outcome,
            amount,
            periodic,
        });
    }
}
