//! Iteration harness: runs independent trials and folds their metrics.
//!
//! Trial `i` always gets RNG stream `i` of the base seed, so a trial replays
//! identically on its own, on any worker. Results are folded in trial-index
//! order in batches, which makes parallel and sequential runs produce the
//! same report bit for bit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::aggregate::Aggregate;
use super::config::RunRequest;
use super::report::{SimReport, TrialLog};
use crate::core::constants::TRIAL_BATCH_SIZE;
use crate::core::metrics::TrialMetrics;
use crate::core::rng::SimRng;
use crate::core::simulation::{Roster, Simulation};
use crate::error::{ConfigError, RunError};
use crate::spells::registry::SpellBook;

/// Shared flag for stopping a run between trials.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A validated run request, ready to execute.
pub struct Harness {
    request: RunRequest,
    book: SpellBook,
    roster: Roster,
    seed: u64,
    cancel: CancelToken,
}

impl Harness {
    pub fn new(request: RunRequest) -> Result<Self, ConfigError> {
        let book = request.validate()?;
        let roster = request.roster();
        let seed = request.seed.unwrap_or_else(rand::random);
        Ok(Self {
            request,
            book,
            roster,
            seed,
            cancel: CancelToken::new(),
        })
    }

    /// Base seed in use, drawn at random when the request had none.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn book(&self) -> &SpellBook {
        &self.book
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run a single trial by index.
    pub fn run_trial(&self, trial: u32) -> Result<TrialMetrics, RunError> {
        let rng = SimRng::for_trial(self.seed, trial);
        let mut sim = Simulation::new(&self.book, &self.roster, rng);
        let result = sim.run();
        result.map_err(|source| RunError::Trial {
            trial,
            at: sim.now(),
            source,
        })
    }

    /// Run every configured trial and build the report.
    pub fn run(&self) -> Result<SimReport, RunError> {
        let iterations = self.request.iterations;
        let started = Instant::now();
        let budget = self
            .request
            .time_budget_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        info!(
            iterations,
            seed = self.seed,
            parallel = self.request.parallel,
            spells = self.book.len(),
            "starting simulation run"
        );

        let player_pools = self
            .roster
            .units
            .get(self.roster.player.0)
            .map(|u| u.resources.keys().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        let mut total = Aggregate::new(self.book.iter().map(|s| s.id), player_pools);
        let mut logs = Vec::new();
        let mut stopped = false;

        let mut batch_start = 0;
        while batch_start < iterations && !stopped {
            let batch_end = batch_start.saturating_add(TRIAL_BATCH_SIZE).min(iterations);
            let run_one = |trial: u32| {
                if self.out_of_time(started, budget) {
                    return (trial, None);
                }
                (trial, Some(self.run_trial(trial)))
            };
            let results: Vec<_> = if self.request.parallel {
                (batch_start..batch_end).into_par_iter().map(run_one).collect()
            } else {
                (batch_start..batch_end).map(run_one).collect()
            };

            let mut batch = total.empty_like();
            for (trial, result) in results {
                match result {
                    None => stopped = true,
                    Some(Err(err)) => {
                        warn!(trial, error = %err, "trial failed, aborting run");
                        return Err(err);
                    }
                    Some(Ok(metrics)) => {
                        batch.push(&metrics);
                        if self.request.diagnostics {
                            logs.push(TrialLog { trial, metrics });
                        }
                    }
                }
            }
            total.merge(&batch);
            debug!(batch_start, batch_end, completed = total.trials(), "batch folded");
            batch_start = batch_end;
        }

        if stopped {
            warn!(
                completed = total.trials(),
                iterations,
                elapsed = ?started.elapsed(),
                "run stopped early"
            );
        }

        let report = SimReport::new(
            iterations,
            self.seed,
            self.request.encounter.duration_secs,
            &total,
            &self.book,
            logs,
            stopped,
        );
        info!(
            completed = report.trials_completed,
            dps = report.dps.mean,
            stderr = report.dps.stderr,
            elapsed = ?started.elapsed(),
            "simulation run finished"
        );
        Ok(report)
    }

    fn out_of_time(&self, started: Instant, budget: Option<Duration>) -> bool {
        self.cancel.is_cancelled() || budget.map_or(false, |b| started.elapsed() >= b)
    }
}

/// Validate `request`, run it and return the report.
pub fn run_simulation(request: RunRequest) -> Result<SimReport, RunError> {
    Harness::new(request)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::stats::Defenses;
    use crate::rotation::types::{Action, ActionTarget, Rotation, Rule};
    use crate::simulator::config::CombatantConfig;
    use crate::spells::types::{DamageFormula, EffectKind, Scaling, Spell, SpellId, SpellSchool};

    fn request() -> RunRequest {
        let bolt = Spell::new(
            1,
            "Frostbolt",
            EffectKind::DirectDamage {
                formula: DamageFormula::ranged(90.0, 110.0, 0.0, Scaling::None),
            },
        )
        .school(SpellSchool::Frost);
        let mut player = CombatantConfig::new("Mage");
        player.stats.spell_crit = 0.2;
        player.rotation = Rotation::new(vec![Rule::always(Action::Cast {
            spell: SpellId(1),
            target: ActionTarget::Current,
        })]);
        let mut req = RunRequest::new(player, vec![bolt]);
        req.encounter.duration_secs = 30.0;
        req.encounter.targets[0].defenses = Defenses::none();
        req.iterations = 20;
        req.seed = Some(7);
        req
    }

    #[test]
    fn test_seed_reported() {
        let harness = Harness::new(request()).unwrap();
        assert_eq!(harness.seed(), 7);

        let mut unseeded = request();
        unseeded.seed = None;
        let harness = Harness::new(unseeded).unwrap();
        let report = harness.run().unwrap();
        assert_eq!(report.seed, harness.seed());
    }

    #[test]
    fn test_trial_replays_alone() {
        let harness = Harness::new(request()).unwrap();
        let a = harness.run_trial(5).unwrap();
        let b = harness.run_trial(5).unwrap();
        assert_eq!(a, b);
        let c = harness.run_trial(6).unwrap();
        assert_ne!(a.damage, c.damage);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let harness = Harness::new(request()).unwrap().with_cancel_token(token);
        let report = harness.run().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.trials_completed, 0);
    }

    #[test]
    fn test_config_error_surfaces() {
        let mut req = request();
        req.iterations = 0;
        assert!(matches!(run_simulation(req), Err(RunError::Config(_))));
    }
}
