//! Validated, immutable spell registry.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::character::stats::validate_non_negative;
use crate::error::{ConfigError, SimError};

use super::types::{AuraConfig, DamageFormula, EffectKind, Spell, SpellId, StackPolicy, TickSchedule};

/// All spells known to a run, shared read-only by every trial.
#[derive(Debug, Clone, Default)]
pub struct SpellBook {
    spells: BTreeMap<SpellId, Spell>,
}

impl SpellBook {
    pub fn new(spells: Vec<Spell>) -> Result<Self, ConfigError> {
        let mut book = BTreeMap::new();
        let mut order = Vec::with_capacity(spells.len());
        for (i, spell) in spells.into_iter().enumerate() {
            validate_spell(&format!("spells[{i}]"), &spell)?;
            if book.contains_key(&spell.id) {
                return Err(ConfigError::DuplicateSpell { spell: spell.id });
            }
            order.push(spell.id);
            book.insert(spell.id, spell);
        }

        for (i, id) in order.iter().enumerate() {
            let Some(spell) = book.get(id) else { continue };
            for (j, triggered) in spell.on_land.iter().enumerate() {
                if !book.contains_key(triggered) {
                    return Err(ConfigError::UnknownSpell {
                        field: format!("spells[{i}].on_land[{j}]"),
                        spell: *triggered,
                    });
                }
            }
        }

        Ok(Self { spells: book })
    }

    pub fn get(&self, id: SpellId) -> Option<&Spell> {
        self.spells.get(&id)
    }

    /// Lookup for use inside a trial, where a miss is an engine defect.
    pub fn spell(&self, id: SpellId) -> Result<&Spell, SimError> {
        self.spells.get(&id).ok_or(SimError::UnknownSpell(id))
    }

    pub fn contains(&self, id: SpellId) -> bool {
        self.spells.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Spell> {
        self.spells.values()
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    /// Checks a spell reference from elsewhere in the request.
    pub fn require(&self, field: impl Into<String>, id: SpellId) -> Result<&Spell, ConfigError> {
        self.spells.get(&id).ok_or_else(|| ConfigError::UnknownSpell {
            field: field.into(),
            spell: id,
        })
    }
}

fn validate_spell(field: &str, spell: &Spell) -> Result<(), ConfigError> {
    validate_non_negative(&format!("{field}.damage_multiplier"), spell.damage_multiplier)?;
    validate_non_negative(&format!("{field}.threat_multiplier"), spell.threat_multiplier)?;
    if let Some(cost) = &spell.cost {
        validate_non_negative(&format!("{field}.cost.amount"), cost.amount)?;
    }
    // An instant must be paced by the GCD or a cooldown
    let paced_by_gcd = spell.triggers_gcd && !spell.gcd.is_zero();
    if !paced_by_gcd && spell.cast_time.is_zero() && spell.cooldown.is_zero() {
        let (path, reason) = if spell.triggers_gcd {
            ("gcd_secs", "an instant spell with no cooldown needs a non-zero global cooldown")
        } else {
            ("cooldown_secs", "an instant spell off the global cooldown needs a cooldown")
        };
        return Err(ConfigError::invalid(format!("{field}.{path}"), reason));
    }

    let effect = format!("{field}.effect");
    match &spell.effect {
        EffectKind::DirectDamage { formula }
        | EffectKind::AoeDamage { formula, .. }
        | EffectKind::Heal { formula } => validate_formula(&format!("{effect}.formula"), formula),
        EffectKind::Periodic(periodic) => {
            validate_schedule(&effect, &periodic.schedule)?;
            if let Some(multi) = &periodic.multi_target {
                validate_schedule(&format!("{effect}.multi_target"), multi)?;
            }
            validate_policy(&effect, &periodic.policy)?;
            validate_formula(&format!("{effect}.formula"), &periodic.formula)
        }
        EffectKind::ApplyAura { aura, .. } => validate_aura(&format!("{effect}.aura"), aura),
        EffectKind::ResourceGain { amount, .. } => {
            validate_non_negative(&format!("{effect}.amount"), *amount)
        }
    }
}

fn validate_formula(field: &str, formula: &DamageFormula) -> Result<(), ConfigError> {
    validate_non_negative(&format!("{field}.min"), formula.min)?;
    validate_non_negative(&format!("{field}.max"), formula.max)?;
    validate_non_negative(&format!("{field}.coefficient"), formula.coefficient)?;
    if formula.max < formula.min {
        return Err(ConfigError::invalid(
            format!("{field}.max"),
            format!("{} is below min {}", formula.max, formula.min),
        ));
    }
    Ok(())
}

fn validate_schedule(field: &str, schedule: &TickSchedule) -> Result<(), ConfigError> {
    if schedule.ticks == 0 {
        return Err(ConfigError::invalid(format!("{field}.ticks"), "must be at least 1"));
    }
    if schedule.interval == Duration::ZERO {
        return Err(ConfigError::invalid(
            format!("{field}.interval_secs"),
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_policy(field: &str, policy: &StackPolicy) -> Result<(), ConfigError> {
    if let StackPolicy::Stack { max_stacks: 0 } = policy {
        return Err(ConfigError::invalid(
            format!("{field}.max_stacks"),
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_aura(field: &str, aura: &AuraConfig) -> Result<(), ConfigError> {
    if aura.duration == Duration::ZERO {
        return Err(ConfigError::invalid(
            format!("{field}.duration_secs"),
            "must be positive",
        ));
    }
    validate_policy(field, &aura.policy)
}
