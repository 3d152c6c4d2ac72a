//! Priority-list evaluation against live simulation state.
//!
//! The interpreter is re-invoked at decision points (pull, GCD ready, cast
//! complete, cooldown ready, aura expiry, resource tick, end of a wait); it
//! never polls.

use std::time::Duration;

use crate::character::unit::UnitId;
use crate::core::constants::MAX_DECISIONS_PER_INSTANT;
use crate::core::scheduler::EventHandle;
use crate::core::simulation::Simulation;
use crate::error::SimError;
use crate::spells::types::SpellId;

use super::types::{Action, ActionTarget, AuraHolder, Condition, Rotation, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationPhase {
    /// Nothing to do until the next decision point.
    #[default]
    Idle,
    Evaluating,
    /// Casting or waiting out the global cooldown.
    Acting,
}

/// What the rotation chose at a decision point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Cast { spell: SpellId, target: UnitId },
    Wait(Duration),
}

/// Per-unit interpreter state for one trial.
#[derive(Debug, Clone)]
pub struct RotationState<'a> {
    pub rotation: &'a Rotation,
    pub phase: RotationPhase,
    pub wait: Option<EventHandle>,
    decided_at: Duration,
    decisions_at_instant: u32,
}

impl<'a> RotationState<'a> {
    pub fn new(rotation: &'a Rotation) -> Self {
        Self {
            rotation,
            phase: RotationPhase::Idle,
            wait: None,
            decided_at: Duration::ZERO,
            decisions_at_instant: 0,
        }
    }

    /// Count a decision at `now`; too many at one instant means the rotation loops.
    pub fn note_decision(&mut self, unit: UnitId, now: Duration) -> Result<(), SimError> {
        if self.decided_at == now {
            self.decisions_at_instant += 1;
        } else {
            self.decided_at = now;
            self.decisions_at_instant = 1;
        }
        if self.decisions_at_instant > MAX_DECISIONS_PER_INSTANT {
            return Err(SimError::DecisionLoop {
                unit,
                at: now,
                limit: MAX_DECISIONS_PER_INSTANT,
            });
        }
        Ok(())
    }
}

/// Walk the rules in order and return the first satisfied action.
///
/// A cast rule only matches if the spell is castable right now on a live target.
pub fn choose(sim: &Simulation<'_>, unit: UnitId, rotation: &Rotation) -> Option<Decision> {
    for rule in &rotation.rules {
        if !holds(sim, unit, &rule.condition) {
            continue;
        }
        match rule.action {
            Action::Cast { spell, target } => {
                let Some(target) = resolve_target(sim, unit, target) else {
                    continue;
                };
                if sim.can_cast(unit, spell) {
                    return Some(Decision::Cast { spell, target });
                }
            }
            Action::Wait { secs } => {
                // Range checked when the rotation was validated
                let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
                return Some(Decision::Wait(delay));
            }
        }
    }
    None
}

/// Resolve an action target to a live unit.
pub fn resolve_target(sim: &Simulation<'_>, unit: UnitId, target: ActionTarget) -> Option<UnitId> {
    match target {
        ActionTarget::Caster => Some(unit),
        ActionTarget::Index(i) => sim
            .targets()
            .get(i)
            .copied()
            .filter(|t| sim.unit(*t).map_or(false, |u| u.is_alive())),
        ActionTarget::Current => current_target(sim, unit),
    }
}

/// The unit's target if it is alive, else the first live encounter target.
pub fn current_target(sim: &Simulation<'_>, unit: UnitId) -> Option<UnitId> {
    let preferred = sim
        .unit(unit)
        .ok()
        .and_then(|u| u.target)
        .filter(|t| sim.unit(*t).map_or(false, |u| u.is_alive()));
    preferred.or_else(|| sim.live_targets().next())
}

pub fn holds(sim: &Simulation<'_>, unit: UnitId, condition: &Condition) -> bool {
    match condition {
        Condition::Always => true,
        Condition::Not(inner) => !holds(sim, unit, inner),
        Condition::And(all) => all.iter().all(|c| holds(sim, unit, c)),
        Condition::Or(any) => any.iter().any(|c| holds(sim, unit, c)),
        Condition::Compare { lhs, op, rhs } => {
            op.apply(evaluate(sim, unit, lhs), evaluate(sim, unit, rhs))
        }
        Condition::Is(value) => evaluate(sim, unit, value) != 0.0,
    }
}

pub fn evaluate(sim: &Simulation<'_>, unit: UnitId, value: &Value) -> f64 {
    let now = sim.now();
    let Ok(me) = sim.unit(unit) else {
        return 0.0;
    };
    let aura_holder = |on: AuraHolder| match on {
        AuraHolder::Caster => Some(unit),
        AuraHolder::Target => current_target(sim, unit),
    };
    let aura = |spell: SpellId, on: AuraHolder| {
        aura_holder(on)
            .and_then(|holder| sim.unit(holder).ok())
            .and_then(|holder| holder.auras.get(&spell))
    };

    match value {
        Value::Const(v) => *v,
        Value::CurrentTime => now.as_secs_f64(),
        Value::RemainingTime => sim.remaining().as_secs_f64(),
        Value::RemainingTimePercent => {
            let total = sim.duration().as_secs_f64();
            if total > 0.0 {
                sim.remaining().as_secs_f64() / total * 100.0
            } else {
                0.0
            }
        }
        Value::CurrentResource(kind) => me.resource(*kind).map_or(0.0, |p| p.current()),
        Value::ResourcePercent(kind) => me.resource(*kind).map_or(0.0, |p| p.percent() * 100.0),
        Value::AuraActive { spell, on } => flag(aura(*spell, *on).is_some()),
        Value::AuraStacks { spell, on } => aura(*spell, *on).map_or(0.0, |a| a.stacks as f64),
        Value::AuraRemaining { spell, on } => {
            aura(*spell, *on).map_or(0.0, |a| a.remaining(now).as_secs_f64())
        }
        Value::DotTicksRemaining(spell) => aura(*spell, AuraHolder::Target)
            .map_or(0.0, |a| a.ticks_remaining() as f64),
        Value::SpellReady(spell) => flag(me.cooldown_remaining(*spell, now).is_zero()),
        Value::SpellCooldown(spell) => me.cooldown_remaining(*spell, now).as_secs_f64(),
        Value::NumTargets => sim.live_targets().count() as f64,
        Value::TargetHealthPercent => current_target(sim, unit)
            .and_then(|t| sim.unit(t).ok())
            .map_or(0.0, |t| t.health_percent()),
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
