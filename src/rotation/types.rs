//! Rotation decision tree.
//!
//! Rotations arrive already parsed, as serde data: an ordered list of
//! `(condition, action)` rules plus optional prepull casts.

use serde::{Deserialize, Serialize};

use crate::character::resources::ResourceKind;
use crate::error::ConfigError;
use crate::spells::registry::SpellBook;
use crate::spells::types::SpellId;
use crate::utils::secs;

/// Where an aura lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuraHolder {
    #[serde(rename = "self")]
    Caster,
    #[default]
    Target,
}

/// Numeric expression over live simulation state. Booleans are 1.0 / 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Const(f64),
    /// Seconds since pull.
    CurrentTime,
    /// Seconds until the encounter ends.
    RemainingTime,
    RemainingTimePercent,
    CurrentResource(ResourceKind),
    ResourcePercent(ResourceKind),
    AuraActive {
        spell: SpellId,
        #[serde(default)]
        on: AuraHolder,
    },
    AuraStacks {
        spell: SpellId,
        #[serde(default)]
        on: AuraHolder,
    },
    /// Seconds left on the aura, 0 when absent.
    AuraRemaining {
        spell: SpellId,
        #[serde(default)]
        on: AuraHolder,
    },
    DotTicksRemaining(SpellId),
    SpellReady(SpellId),
    /// Seconds of cooldown left.
    SpellCooldown(SpellId),
    NumTargets,
    TargetHealthPercent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Always,
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Compare { lhs: Value, op: CompareOp, rhs: Value },
    /// Shorthand for `Compare { lhs: value, op: Ne, rhs: Const(0) }`.
    Is(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTarget {
    /// The caster's current target.
    #[default]
    Current,
    #[serde(rename = "self")]
    Caster,
    /// N-th encounter target.
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Cast {
        spell: SpellId,
        #[serde(default)]
        target: ActionTarget,
    },
    /// Do nothing until `secs` from now, then decide again.
    Wait { secs: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub condition: Condition,
    pub action: Action,
}

impl Rule {
    pub fn always(action: Action) -> Self {
        Self {
            condition: Condition::Always,
            action,
        }
    }

    pub fn when(condition: Condition, action: Action) -> Self {
        Self { condition, action }
    }
}

/// A cast made at pull, before the first decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrepullCast {
    pub spell: SpellId,
    #[serde(default)]
    pub target: ActionTarget,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    #[serde(default)]
    pub prepull: Vec<PrepullCast>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Rotation {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            prepull: Vec::new(),
            rules,
        }
    }

    pub fn with_prepull(mut self, spell: SpellId) -> Self {
        self.prepull.push(PrepullCast {
            spell,
            target: ActionTarget::Current,
        });
        self
    }

    /// Every spell this rotation can cast directly.
    pub fn cast_spells(&self) -> impl Iterator<Item = SpellId> + '_ {
        let prepull = self.prepull.iter().map(|p| p.spell);
        let rules = self.rules.iter().filter_map(|r| match r.action {
            Action::Cast { spell, .. } => Some(spell),
            Action::Wait { .. } => None,
        });
        prepull.chain(rules)
    }

    /// Check spell references and action parameters.
    pub fn validate(&self, field: &str, book: &SpellBook, num_targets: usize) -> Result<(), ConfigError> {
        for (i, prepull) in self.prepull.iter().enumerate() {
            let path = format!("{field}.prepull[{i}]");
            book.require(format!("{path}.spell"), prepull.spell)?;
            validate_target(&format!("{path}.target"), prepull.target, num_targets)?;
        }
        for (i, rule) in self.rules.iter().enumerate() {
            let path = format!("{field}.rules[{i}]");
            validate_condition(&format!("{path}.condition"), &rule.condition, book)?;
            match &rule.action {
                Action::Cast { spell, target } => {
                    book.require(format!("{path}.action.spell"), *spell)?;
                    validate_target(&format!("{path}.action.target"), *target, num_targets)?;
                }
                Action::Wait { secs } => {
                    secs::positive(&format!("{path}.action.secs"), *secs)?;
                }
            }
        }
        Ok(())
    }
}

fn validate_target(field: &str, target: ActionTarget, num_targets: usize) -> Result<(), ConfigError> {
    match target {
        ActionTarget::Index(i) if i >= num_targets => Err(ConfigError::invalid(
            field,
            format!("target index {i} but the encounter has {num_targets} targets"),
        )),
        _ => Ok(()),
    }
}

fn validate_condition(field: &str, condition: &Condition, book: &SpellBook) -> Result<(), ConfigError> {
    match condition {
        Condition::Always => Ok(()),
        Condition::Not(inner) => validate_condition(&format!("{field}.not"), inner, book),
        Condition::And(all) | Condition::Or(all) => {
            for (i, c) in all.iter().enumerate() {
                validate_condition(&format!("{field}[{i}]"), c, book)?;
            }
            Ok(())
        }
        Condition::Compare { lhs, rhs, .. } => {
            validate_value(&format!("{field}.lhs"), lhs, book)?;
            validate_value(&format!("{field}.rhs"), rhs, book)
        }
        Condition::Is(value) => validate_value(&format!("{field}.is"), value, book),
    }
}

fn validate_value(field: &str, value: &Value, book: &SpellBook) -> Result<(), ConfigError> {
    let spell = match value {
        Value::AuraActive { spell, .. }
        | Value::AuraStacks { spell, .. }
        | Value::AuraRemaining { spell, .. }
        | Value::DotTicksRemaining(spell)
        | Value::SpellReady(spell)
        | Value::SpellCooldown(spell) => *spell,
        Value::Const(v) if !v.is_finite() => {
            return Err(ConfigError::invalid(field, format!("{v} is not a finite number")));
        }
        _ => return Ok(()),
    };
    book.require(field, spell).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spells::types::{DamageFormula, EffectKind, Spell};

    fn book() -> SpellBook {
        SpellBook::new(vec![Spell::new(
            1,
            "Wrath",
            EffectKind::DirectDamage {
                formula: DamageFormula::flat(100.0),
            },
        )])
        .unwrap()
    }

    #[test]
    fn test_rotation_from_json() {
        let rotation: Rotation = serde_json::from_str(
            r#"{
                "prepull": [{"spell": 1}],
                "rules": [
                    {"condition": {"compare": {
                        "lhs": {"aura_stacks": {"spell": 1, "on": "self"}},
                        "op": "lt",
                        "rhs": {"const": 3}}},
                     "action": {"cast": {"spell": 1, "target": "self"}}},
                    {"action": {"wait": {"secs": 0.5}}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(rotation.prepull.len(), 1);
        assert_eq!(rotation.rules[1].condition, Condition::Always);
        assert_eq!(
            rotation.rules[0].action,
            Action::Cast {
                spell: SpellId(1),
                target: ActionTarget::Caster
            }
        );
        assert!(rotation.validate("player.rotation", &book(), 1).is_ok());
    }

    #[test]
    fn test_unknown_spell_names_rule() {
        let rotation = Rotation::new(vec![
            Rule::always(Action::Cast {
                spell: SpellId(1),
                target: ActionTarget::Current,
            }),
            Rule::when(
                Condition::Is(Value::SpellReady(SpellId(1))),
                Action::Cast {
                    spell: SpellId(42),
                    target: ActionTarget::Current,
                },
            ),
        ]);
        let err = rotation.validate("player.rotation", &book(), 1).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownSpell {
                field: "player.rotation.rules[1].action.spell".into(),
                spell: SpellId(42),
            }
        );
    }

    #[test]
    fn test_zero_wait_rejected() {
        let rotation = Rotation::new(vec![Rule::always(Action::Wait { secs: 0.0 })]);
        assert!(rotation.validate("player.rotation", &book(), 1).is_err());
    }

    #[test]
    fn test_wait_too_long_for_a_duration_rejected() {
        let rotation = Rotation::new(vec![
            Rule::always(Action::Cast {
                spell: SpellId(1),
                target: ActionTarget::Current,
            }),
            Rule::always(Action::Wait { secs: 1e20 }),
        ]);
        let err = rotation.validate("player.rotation", &book(), 1).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField { ref field, .. } if field == "player.rotation.rules[1].action.secs"
        ));
    }

    #[test]
    fn test_compare_ops() {
        assert!(CompareOp::Lt.apply(1.0, 2.0));
        assert!(CompareOp::Ge.apply(2.0, 2.0));
        assert!(!CompareOp::Ne.apply(2.0, 2.0));
    }
}
