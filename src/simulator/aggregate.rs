//! Mergeable statistics over many trials.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::character::resources::ResourceKind;
use crate::core::constants::CONFIDENCE_Z;
use crate::core::metrics::TrialMetrics;
use crate::spells::types::SpellId;

/// Streaming count/sum/sum-of-squares accumulator.
///
/// Two accumulators merge by adding their fields, so batches can be folded
/// independently and combined afterwards. Merging in the same order always
/// yields the same bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for RunningStat {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn merge(&mut self, other: &RunningStat) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Sample variance (n - 1 denominator). Zero with fewer than two values.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0)
    }

    pub fn stdev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard error of the mean.
    pub fn stderr(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.stdev() / (self.count as f64).sqrt()
    }

    pub fn ci95(&self) -> (f64, f64) {
        let half = CONFIDENCE_Z * self.stderr();
        (self.mean() - half, self.mean() + half)
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }

    pub fn summary(&self) -> StatSummary {
        let (ci95_low, ci95_high) = self.ci95();
        StatSummary {
            count: self.count,
            mean: self.mean(),
            stdev: self.stdev(),
            stderr: self.stderr(),
            ci95_low,
            ci95_high,
            min: self.min(),
            max: self.max(),
        }
    }
}

/// Serializable view of a `RunningStat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatSummary {
    pub count: u64,
    pub mean: f64,
    pub stdev: f64,
    pub stderr: f64,
    pub ci95_low: f64,
    pub ci95_high: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpellAggregate {
    pub casts: RunningStat,
    pub damage: RunningStat,
    pub healing: RunningStat,
    pub threat: RunningStat,
    pub ticks: RunningStat,
    pub attempts: u64,
    pub landed: u64,
    pub applied: u64,
    pub crits: u64,
    pub avoided: u64,
}

impl SpellAggregate {
    fn merge(&mut self, other: &SpellAggregate) {
        self.casts.merge(&other.casts);
        self.damage.merge(&other.damage);
        self.healing.merge(&other.healing);
        self.threat.merge(&other.threat);
        self.ticks.merge(&other.ticks);
        self.attempts += other.attempts;
        self.landed += other.landed;
        self.applied += other.applied;
        self.crits += other.crits;
        self.avoided += other.avoided;
    }

    /// Crits over outcomes that could crit: landed hits and heals plus dot ticks.
    pub fn crit_rate(&self) -> f64 {
        let rolls = self.landed.saturating_sub(self.applied) + self.ticks.sum() as u64;
        if rolls == 0 {
            0.0
        } else {
            self.crits as f64 / rolls as f64
        }
    }

    pub fn avoid_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.avoided as f64 / self.attempts as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceAggregate {
    pub spent: RunningStat,
    pub gained: RunningStat,
    pub wasted: RunningStat,
    pub ending: RunningStat,
    pub mean_level: RunningStat,
}

impl ResourceAggregate {
    fn merge(&mut self, other: &ResourceAggregate) {
        self.spent.merge(&other.spent);
        self.gained.merge(&other.gained);
        self.wasted.merge(&other.wasted);
        self.ending.merge(&other.ending);
        self.mean_level.merge(&other.mean_level);
    }
}

/// Totals over every trial folded so far.
///
/// Spell and resource keys are fixed up front so every accumulator sees one
/// value per trial, zero when the trial never touched it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub dps: RunningStat,
    pub damage: RunningStat,
    pub hps: RunningStat,
    pub tps: RunningStat,
    pub fight_length: RunningStat,
    pub targets_killed: RunningStat,
    pub spells: BTreeMap<SpellId, SpellAggregate>,
    pub resources: BTreeMap<ResourceKind, ResourceAggregate>,
}

impl Aggregate {
    pub fn new(
        spells: impl IntoIterator<Item = SpellId>,
        resources: impl IntoIterator<Item = ResourceKind>,
    ) -> Self {
        Self {
            spells: spells.into_iter().map(|id| (id, SpellAggregate::default())).collect(),
            resources: resources
                .into_iter()
                .map(|kind| (kind, ResourceAggregate::default()))
                .collect(),
            ..Default::default()
        }
    }

    /// An empty aggregate with the same keys.
    pub fn empty_like(&self) -> Self {
        Self::new(self.spells.keys().copied(), self.resources.keys().copied())
    }

    pub fn trials(&self) -> u64 {
        self.dps.count()
    }

    pub fn push(&mut self, trial: &TrialMetrics) {
        self.dps.push(trial.dps());
        self.damage.push(trial.damage);
        self.hps.push(trial.hps());
        self.tps.push(trial.tps());
        self.fight_length.push(trial.duration.as_secs_f64());
        self.targets_killed.push(trial.targets_killed as f64);

        for (id, agg) in &mut self.spells {
            let m = trial.spell(*id).cloned().unwrap_or_default();
            agg.casts.push(m.casts as f64);
            agg.damage.push(m.damage);
            agg.healing.push(m.healing);
            agg.threat.push(m.threat);
            agg.ticks.push(m.ticks as f64);
            agg.attempts += m.attempts as u64;
            agg.landed += m.landed as u64;
            agg.applied += m.applied as u64;
            agg.crits += m.crits as u64;
            agg.avoided += m.avoided as u64;
        }

        for (kind, agg) in &mut self.resources {
            let flow = trial.resources.get(kind).cloned().unwrap_or_default();
            agg.spent.push(flow.spent);
            agg.gained.push(flow.gained);
            agg.wasted.push(flow.wasted);
            agg.ending.push(flow.ending);
            agg.mean_level.push(flow.mean_level(trial.duration));
        }
    }

    pub fn merge(&mut self, other: &Aggregate) {
        self.dps.merge(&other.dps);
        self.damage.merge(&other.damage);
        self.hps.merge(&other.hps);
        self.tps.merge(&other.tps);
        self.fight_length.merge(&other.fight_length);
        self.targets_killed.merge(&other.targets_killed);
        for (id, agg) in &other.spells {
            self.spells.entry(*id).or_default().merge(agg);
        }
        for (kind, agg) in &other.resources {
            self.resources.entry(*kind).or_default().merge(agg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::outcome::Outcome;
    use crate::core::metrics::{ResourceFlow, SpellMetrics};
    use std::time::Duration;

    #[test]
    fn test_running_stat_basics() {
        let mut stat = RunningStat::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stat.push(v);
        }
        assert_eq!(stat.count(), 8);
        assert!((stat.mean() - 5.0).abs() < 1e-12);
        // Sample variance of this set is 32 / 7
        assert!((stat.variance() - 32.0 / 7.0).abs() < 1e-9);
        assert_eq!(stat.min(), 2.0);
        assert_eq!(stat.max(), 9.0);
        let (lo, hi) = stat.ci95();
        assert!(lo < 5.0 && hi > 5.0);
    }

    #[test]
    fn test_empty_and_single() {
        let empty = RunningStat::new();
        assert_eq!(empty.summary(), StatSummary::default());

        let mut one = RunningStat::new();
        one.push(3.0);
        assert_eq!(one.variance(), 0.0);
        assert_eq!(one.stderr(), 0.0);
        assert_eq!(one.ci95(), (3.0, 3.0));
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let values: Vec<f64> = (0..20).map(|i| (i * 7 % 13) as f64).collect();
        let mut whole = RunningStat::new();
        values.iter().for_each(|v| whole.push(*v));

        let mut left = RunningStat::new();
        let mut right = RunningStat::new();
        values[..9].iter().for_each(|v| left.push(*v));
        values[9..].iter().for_each(|v| right.push(*v));
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert!((left.mean() - whole.mean()).abs() < 1e-12);
        assert!((left.variance() - whole.variance()).abs() < 1e-9);
        assert_eq!(left.min(), whole.min());
        assert_eq!(left.max(), whole.max());
    }

    #[test]
    fn test_absent_spell_counts_as_zero() {
        let mut agg = Aggregate::new([SpellId(1), SpellId(2)], [ResourceKind::Mana]);
        let mut trial = TrialMetrics {
            duration: Duration::from_secs(10),
            damage: 500.0,
            ..Default::default()
        };
        trial.spells.insert(
            SpellId(1),
            SpellMetrics {
                casts: 5,
                damage: 500.0,
                ..Default::default()
            },
        );
        trial.resources.insert(
            ResourceKind::Mana,
            ResourceFlow {
                spent: 250.0,
                ..Default::default()
            },
        );
        agg.push(&trial);

        assert_eq!(agg.trials(), 1);
        assert_eq!(agg.dps.mean(), 50.0);
        assert_eq!(agg.spells[&SpellId(1)].casts.mean(), 5.0);
        assert_eq!(agg.spells[&SpellId(2)].casts.count(), 1);
        assert_eq!(agg.spells[&SpellId(2)].damage.mean(), 0.0);
        assert_eq!(agg.resources[&ResourceKind::Mana].spent.mean(), 250.0);
    }

    #[test]
    fn test_dot_crit_rate_ignores_applications() {
        let mut agg = Aggregate::new([SpellId(1)], []);
        let mut trial = TrialMetrics {
            duration: Duration::from_secs(30),
            ..Default::default()
        };
        let dot = trial.spell_mut(SpellId(1));
        for _ in 0..2 {
            dot.record_application(Outcome::Hit);
        }
        dot.record_application(Outcome::Miss);
        dot.ticks = 10;
        dot.crits = 4;
        agg.push(&trial);

        let spell = &agg.spells[&SpellId(1)];
        assert_eq!(spell.landed, 2);
        assert_eq!(spell.applied, 2);
        assert!((spell.crit_rate() - 0.4).abs() < 1e-12);
        assert!((spell.avoid_rate() - 1.0 / 3.0).abs() < 1e-12);
    }
}
