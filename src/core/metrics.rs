//! Per-trial metric accumulation.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::character::resources::{ResourceKind, ResourcePool};
use crate::combat::outcome::Outcome;
use crate::spells::types::SpellId;

/// Per-spell totals for one trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpellMetrics {
    pub casts: u32,
    /// Direct hits, heals and aura applications that resolved.
    pub attempts: u32,
    pub landed: u32,
    /// Landed aura and dot applications, which never crit.
    pub applied: u32,
    pub crits: u32,
    pub avoided: u32,
    pub ticks: u32,
    pub damage: f64,
    pub healing: f64,
    pub threat: f64,
}

impl SpellMetrics {
    pub fn record_outcome(&mut self, outcome: Outcome) {
        self.attempts += 1;
        if outcome.landed() {
            self.landed += 1;
        } else {
            self.avoided += 1;
        }
        if outcome == Outcome::Crit {
            self.crits += 1;
        }
    }

    /// An aura or dot application: lands or is avoided, never crits.
    pub fn record_application(&mut self, outcome: Outcome) {
        self.record_outcome(outcome);
        if outcome.landed() {
            self.applied += 1;
        }
    }
}

/// Resource flow of one pool over a trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceFlow {
    pub starting: f64,
    pub spent: f64,
    pub gained: f64,
    pub wasted: f64,
    pub ending: f64,
    /// Integral of the pool level over time, in amount-seconds.
    pub level_seconds: f64,
}

impl ResourceFlow {
    pub fn mean_level(&self, duration: Duration) -> f64 {
        let secs = duration.as_secs_f64();
        if secs > 0.0 {
            self.level_seconds / secs
        } else {
            self.ending
        }
    }
}

/// One resolved action, kept when diagnostics are enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CastRecord {
    pub at_secs: f64,
    pub caster: usize,
    pub spell: SpellId,
    pub target: usize,
    pub outcome: Outcome,
    pub amount: f64,
    pub periodic: bool,
}

/// Snapshot of player state, kept when diagnostics are enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSample {
    pub at_secs: f64,
    pub damage: f64,
    pub resources: BTreeMap<ResourceKind, f64>,
    pub gcd_remaining_secs: f64,
    pub cooldowns_remaining_secs: BTreeMap<SpellId, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrialMetrics {
    #[serde(rename = "duration_secs", serialize_with = "crate::utils::secs::serialize")]
    pub duration: Duration,
    pub damage: f64,
    pub healing: f64,
    pub overhealing: f64,
    pub threat: f64,
    pub spells: BTreeMap<SpellId, SpellMetrics>,
    pub resources: BTreeMap<ResourceKind, ResourceFlow>,
    pub targets_killed: u32,
    pub rng_draws: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub casts: Vec<CastRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timeline: Vec<TimelineSample>,
}

impl TrialMetrics {
    pub fn spell_mut(&mut self, spell: SpellId) -> &mut SpellMetrics {
        self.spells.entry(spell).or_default()
    }

    pub fn spell(&self, spell: SpellId) -> Option<&SpellMetrics> {
        self.spells.get(&spell)
    }

    pub fn dps(&self) -> f64 {
        per_second(self.damage, self.duration)
    }

    pub fn hps(&self) -> f64 {
        per_second(self.healing, self.duration)
    }

    pub fn tps(&self) -> f64 {
        per_second(self.threat, self.duration)
    }

    pub fn record_damage(&mut self, spell: SpellId, amount: f64, threat: f64, periodic: bool) {
        self.damage += amount;
        self.threat += threat;
        let entry = self.spell_mut(spell);
        entry.damage += amount;
        entry.threat += threat;
        if periodic {
            entry.ticks += 1;
        }
    }

    pub fn record_healing(&mut self, spell: SpellId, effective: f64, overheal: f64, threat: f64) {
        self.healing += effective;
        self.overhealing += overheal;
        self.threat += threat;
        let entry = self.spell_mut(spell);
        entry.healing += effective;
        entry.threat += threat;
    }

    pub(crate) fn open_pools<'p>(&mut self, pools: impl Iterator<Item = &'p ResourcePool>) {
        for pool in pools {
            self.resources.insert(
                pool.kind,
                ResourceFlow {
                    starting: pool.starting(),
                    ending: pool.current(),
                    ..Default::default()
                },
            );
        }
    }

    /// Accumulate `dt` worth of pool levels into the time-weighted totals.
    pub(crate) fn integrate_pools<'p>(
        &mut self,
        pools: impl Iterator<Item = &'p ResourcePool>,
        dt: Duration,
    ) {
        let secs = dt.as_secs_f64();
        for pool in pools {
            if let Some(flow) = self.resources.get_mut(&pool.kind) {
                flow.level_seconds += pool.current() * secs;
            }
        }
    }

    pub(crate) fn close_pools<'p>(&mut self, pools: impl Iterator<Item = &'p ResourcePool>) {
        for pool in pools {
            if let Some(flow) = self.resources.get_mut(&pool.kind) {
                flow.spent = pool.spent();
                flow.gained = pool.gained();
                flow.wasted = pool.wasted();
                flow.ending = pool.current();
            }
        }
    }

    pub(crate) fn log_cast(&mut self, record: CastRecord) {
        self.casts.push(record);
    }

    /// Outcome sequence of the cast log, for replay comparisons.
    pub fn outcome_sequence(&self) -> Vec<(SpellId, Outcome)> {
        self.casts.iter().map(|c| (c.spell, c.outcome)).collect()
    }
}

fn per_second(amount: f64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        amount / secs
    } else {
        0.0
    }
}
