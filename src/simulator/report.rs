//! Simulation report generation.

use std::collections::BTreeMap;

use serde::Serialize;

use super::aggregate::{Aggregate, StatSummary};
use crate::character::resources::ResourceKind;
use crate::core::metrics::TrialMetrics;
use crate::spells::registry::SpellBook;
use crate::spells::types::SpellId;

/// Per-spell breakdown across all completed trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpellReport {
    pub id: SpellId,
    pub name: String,
    pub casts: StatSummary,
    pub damage: StatSummary,
    pub healing: StatSummary,
    pub threat: StatSummary,
    pub ticks: StatSummary,
    /// Fraction of total damage done by this spell.
    pub damage_share: f64,
    pub crit_rate: f64,
    pub avoid_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub spent: StatSummary,
    pub gained: StatSummary,
    pub wasted: StatSummary,
    pub ending: StatSummary,
    pub mean_level: StatSummary,
}

/// Raw metrics of one trial, kept when diagnostics are on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialLog {
    pub trial: u32,
    pub metrics: TrialMetrics,
}

/// Aggregated results from a batch of trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimReport {
    pub iterations: u32,
    pub trials_completed: u32,
    pub cancelled: bool,
    pub seed: u64,
    pub duration_secs: f64,

    pub dps: StatSummary,
    pub damage: StatSummary,
    pub hps: StatSummary,
    pub tps: StatSummary,
    pub fight_length: StatSummary,
    pub targets_killed: StatSummary,

    pub spells: Vec<SpellReport>,
    pub resources: BTreeMap<ResourceKind, ResourceReport>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trials: Vec<TrialLog>,
}

impl SimReport {
    pub(crate) fn new(
        iterations: u32,
        seed: u64,
        duration_secs: f64,
        aggregate: &Aggregate,
        book: &SpellBook,
        trials: Vec<TrialLog>,
        cancelled: bool,
    ) -> Self {
        let total_damage = aggregate.damage.sum();
        let spells = aggregate
            .spells
            .iter()
            .map(|(id, agg)| SpellReport {
                id: *id,
                name: book.get(*id).map_or_else(|| id.to_string(), |s| s.name.clone()),
                casts: agg.casts.summary(),
                damage: agg.damage.summary(),
                healing: agg.healing.summary(),
                threat: agg.threat.summary(),
                ticks: agg.ticks.summary(),
                damage_share: if total_damage > 0.0 {
                    agg.damage.sum() / total_damage
                } else {
                    0.0
                },
                crit_rate: agg.crit_rate(),
                avoid_rate: agg.avoid_rate(),
            })
            .collect();
        let resources = aggregate
            .resources
            .iter()
            .map(|(kind, agg)| {
                (
                    *kind,
                    ResourceReport {
                        spent: agg.spent.summary(),
                        gained: agg.gained.summary(),
                        wasted: agg.wasted.summary(),
                        ending: agg.ending.summary(),
                        mean_level: agg.mean_level.summary(),
                    },
                )
            })
            .collect();

        Self {
            iterations,
            trials_completed: aggregate.trials() as u32,
            cancelled,
            seed,
            duration_secs,
            dps: aggregate.dps.summary(),
            damage: aggregate.damage.summary(),
            hps: aggregate.hps.summary(),
            tps: aggregate.tps.summary(),
            fight_length: aggregate.fight_length.summary(),
            targets_killed: aggregate.targets_killed.summary(),
            spells,
            resources,
            trials,
        }
    }

    pub fn spell(&self, id: SpellId) -> Option<&SpellReport> {
        self.spells.iter().find(|s| s.id == id)
    }

    /// Generate a text report.
    pub fn to_text(&self) -> String {
        let mut report = String::new();

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report.push_str("                    SIMULATION REPORT\n");
        report.push_str("═══════════════════════════════════════════════════════════════\n\n");

        report.push_str(&format!(
            "Trials: {} of {} completed{}\n",
            self.trials_completed,
            self.iterations,
            if self.cancelled { " (cancelled)" } else { "" }
        ));
        report.push_str(&format!(
            "Seed: {}   Encounter: {:.1}s\n\n",
            self.seed, self.duration_secs
        ));

        report.push_str("── THROUGHPUT ───────────────────────────────────────────────────\n");
        push_stat(&mut report, "DPS", &self.dps);
        push_stat(&mut report, "HPS", &self.hps);
        push_stat(&mut report, "TPS", &self.tps);
        push_stat(&mut report, "Damage", &self.damage);
        push_stat(&mut report, "Fight Length (s)", &self.fight_length);
        if self.targets_killed.max > 0.0 {
            push_stat(&mut report, "Targets Killed", &self.targets_killed);
        }
        report.push('\n');

        report.push_str("── SPELLS ───────────────────────────────────────────────────────\n");
        report.push_str(&format!(
            "  {:<20} {:>8} {:>12} {:>7} {:>7} {:>7} {:>7}\n",
            "Spell", "Casts", "Damage", "Share", "Crit", "Avoid", "Ticks"
        ));
        let mut spells: Vec<&SpellReport> = self.spells.iter().collect();
        spells.sort_by(|a, b| b.damage.mean.total_cmp(&a.damage.mean).then(a.id.cmp(&b.id)));
        for spell in spells {
            let bar_len = (spell.damage_share * 20.0) as usize;
            report.push_str(&format!(
                "  {:<20} {:>8.1} {:>12.0} {:>6.1}% {:>6.1}% {:>6.1}% {:>7.1} {}\n",
                truncate(&spell.name, 20),
                spell.casts.mean,
                spell.damage.mean,
                spell.damage_share * 100.0,
                spell.crit_rate * 100.0,
                spell.avoid_rate * 100.0,
                spell.ticks.mean,
                "█".repeat(bar_len)
            ));
        }
        report.push('\n');

        if !self.resources.is_empty() {
            report.push_str("── RESOURCES ────────────────────────────────────────────────────\n");
            for (kind, flow) in &self.resources {
                report.push_str(&format!(
                    "  {:<12} spent {:>9.1}  gained {:>9.1}  wasted {:>8.1}  ending {:>8.1}  avg {:>8.1}\n",
                    format!("{kind:?}"),
                    flow.spent.mean,
                    flow.gained.mean,
                    flow.wasted.mean,
                    flow.ending.mean,
                    flow.mean_level.mean
                ));
            }
            report.push('\n');
        }

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report
    }

    /// Export report as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn push_stat(report: &mut String, label: &str, stat: &StatSummary) {
    report.push_str(&format!(
        "  {:<18} {:>10.1} ± {:<8.2} (sd {:.1}, 95% CI {:.1}..{:.1})\n",
        format!("{label}:"),
        stat.mean,
        stat.stderr,
        stat.stdev,
        stat.ci95_low,
        stat.ci95_high
    ));
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        name.chars().take(width - 1).chain(std::iter::once('…')).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::SpellMetrics;
    use crate::spells::types::{DamageFormula, EffectKind, Spell};
    use std::time::Duration;

    fn report() -> SimReport {
        let book = SpellBook::new(vec![Spell::new(
            1,
            "Shadow Bolt",
            EffectKind::DirectDamage {
                formula: DamageFormula::flat(100.0),
            },
        )])
        .unwrap();
        let mut agg = Aggregate::new([SpellId(1)], []);
        for damage in [900.0, 1100.0] {
            let mut trial = TrialMetrics {
                duration: Duration::from_secs(10),
                damage,
                ..Default::default()
            };
            trial.spells.insert(
                SpellId(1),
                SpellMetrics {
                    casts: 10,
                    attempts: 10,
                    landed: 10,
                    crits: 2,
                    damage,
                    ..Default::default()
                },
            );
            agg.push(&trial);
        }
        SimReport::new(2, 42, 10.0, &agg, &book, Vec::new(), false)
    }

    #[test]
    fn test_report_summaries() {
        let report = report();
        assert_eq!(report.trials_completed, 2);
        assert_eq!(report.dps.mean, 100.0);
        let spell = report.spell(SpellId(1)).unwrap();
        assert_eq!(spell.name, "Shadow Bolt");
        assert_eq!(spell.casts.mean, 10.0);
        assert!((spell.damage_share - 1.0).abs() < 1e-12);
        assert!((spell.crit_rate - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_text_report_sections() {
        let text = report().to_text();
        assert!(text.contains("SIMULATION REPORT"));
        assert!(text.contains("── THROUGHPUT"));
        assert!(text.contains("Shadow Bolt"));
        assert!(!text.contains("── RESOURCES"));
    }

    #[test]
    fn test_json_omits_empty_trial_logs() {
        let json: serde_json::Value = serde_json::from_str(&report().to_json()).unwrap();
        assert_eq!(json["seed"], 42);
        assert_eq!(json["spells"][0]["id"], 1);
        assert!(json.get("trials").is_none());
    }
}
