//! Iteration harness behavior: seeding, reduction order, aggregation and
//! request validation.

use std::time::Duration;

use raidsim::character::{ResourceConfig, ResourceKind};
use raidsim::error::{ConfigError, RunError, SimError};
use raidsim::rotation::{Action, ActionTarget, Rotation, Rule};
use raidsim::simulator::{run_simulation, CombatantConfig, Harness, RunRequest};
use raidsim::spells::{DamageFormula, EffectKind, PeriodicConfig, Scaling, Spell, SpellId, SpellSchool};

fn cast(id: u32) -> Action {
    Action::Cast {
        spell: SpellId(id),
        target: ActionTarget::Current,
    }
}

/// A caster with ranged damage, crits and misses, so trials differ.
fn noisy_request(iterations: u32) -> RunRequest {
    let fireball = Spell::new(
        1,
        "Fireball",
        EffectKind::DirectDamage {
            formula: DamageFormula::ranged(700.0, 900.0, 1.0, Scaling::SpellPower),
        },
    )
    .school(SpellSchool::Fire)
    .cast_time(Duration::from_millis(2500))
    .cost(ResourceKind::Mana, 400.0);
    let ignite = Spell::new(
        2,
        "Living Bomb",
        EffectKind::Periodic({
            let mut dot = PeriodicConfig::new(4, Duration::from_secs(3), DamageFormula::flat(250.0));
            dot.can_crit = true;
            dot
        }),
    )
    .school(SpellSchool::Fire)
    .cooldown(Duration::from_secs(12));

    let mut player = CombatantConfig::new("Mage");
    player.stats.spell_power = 1200.0;
    player.stats.spell_crit = 0.25;
    player.stats.spell_hit = 0.1;
    player
        .resources
        .push(ResourceConfig::new(ResourceKind::Mana, 20_000.0).with_regen(50.0));
    player.rotation = Rotation::new(vec![Rule::always(cast(2)), Rule::always(cast(1))]);

    let mut req = RunRequest::new(player, vec![fireball, ignite]);
    req.encounter.duration_secs = 120.0;
    req.iterations = iterations;
    req.seed = Some(0xC0FFEE);
    req
}

#[test]
fn test_same_seed_same_report() {
    let a = run_simulation(noisy_request(50)).unwrap();
    let b = run_simulation(noisy_request(50)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.trials_completed, 50);
    assert!(a.dps.stdev > 0.0);

    let mut other = noisy_request(50);
    other.seed = Some(1);
    let c = run_simulation(other).unwrap();
    assert_ne!(a.dps.mean, c.dps.mean);
}

#[test]
fn test_same_seed_same_outcome_sequence() {
    let mut req = noisy_request(3);
    req.diagnostics = true;
    let a = run_simulation(req.clone()).unwrap();
    let b = run_simulation(req).unwrap();

    assert_eq!(a.trials.len(), 3);
    for (x, y) in a.trials.iter().zip(&b.trials) {
        assert_eq!(x.trial, y.trial);
        assert!(!x.metrics.casts.is_empty());
        assert_eq!(x.metrics.outcome_sequence(), y.metrics.outcome_sequence());
    }
    assert_ne!(
        a.trials[0].metrics.outcome_sequence(),
        a.trials[1].metrics.outcome_sequence()
    );
}

#[test]
fn test_parallel_matches_sequential() {
    // More than one batch, so batch merging is exercised too
    let sequential = run_simulation(noisy_request(300)).unwrap();
    let mut req = noisy_request(300);
    req.parallel = true;
    let parallel = run_simulation(req).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_standard_error_shrinks_with_trials() {
    let small = run_simulation(noisy_request(100)).unwrap();
    let large = run_simulation(noisy_request(1600)).unwrap();
    // Expected ratio is 4; allow plenty of sampling slack
    assert!(large.dps.stderr < small.dps.stderr * 0.5);
    assert!(large.dps.ci95_low <= large.dps.mean && large.dps.mean <= large.dps.ci95_high);
}

#[test]
fn test_report_breakdowns() {
    let report = run_simulation(noisy_request(20)).unwrap();

    let share: f64 = report.spells.iter().map(|s| s.damage_share).sum();
    assert!((share - 1.0).abs() < 1e-9);
    let bomb = report.spell(SpellId(2)).unwrap();
    assert!(bomb.ticks.mean > 0.0);
    assert!(bomb.casts.mean >= 8.0, "12s cooldown over 120s, got {}", bomb.casts.mean);

    let mana = &report.resources[&ResourceKind::Mana];
    assert!(mana.spent.mean > 0.0);
    assert!(mana.ending.max <= 20_000.0);
    assert!(report.to_text().contains("Living Bomb"));
}

#[test]
fn test_cooldowns_never_negative_in_samples() {
    let mut req = noisy_request(2);
    req.diagnostics = true;
    let report = run_simulation(req).unwrap();

    for log in &report.trials {
        assert!(!log.metrics.timeline.is_empty());
        for sample in &log.metrics.timeline {
            assert!(sample.gcd_remaining_secs >= 0.0 && sample.gcd_remaining_secs <= 1.5);
            for remaining in sample.cooldowns_remaining_secs.values() {
                assert!(*remaining >= 0.0 && *remaining <= 12.0);
            }
        }
    }
}

#[test]
fn test_failing_trial_aborts_run_with_lowest_index() {
    let mut req = noisy_request(64);
    req.spells[0].on_land.push(SpellId(1));
    req.parallel = true;
    let err = run_simulation(req).unwrap_err();
    match err {
        RunError::Trial { trial, source, .. } => {
            // Trial 0 may miss its first casts but will land one long before the end
            assert_eq!(trial, 0);
            assert!(matches!(source, SimError::TriggerDepth { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_rotation_spell_names_field() {
    let mut req = noisy_request(10);
    req.player.rotation.rules.push(Rule::always(cast(42)));
    let err = run_simulation(req).unwrap_err();
    match err {
        RunError::Config(ConfigError::UnknownSpell { field, spell }) => {
            assert_eq!(field, "player.rotation.rules[2].action.spell");
            assert_eq!(spell, SpellId(42));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_requests_are_rejected_before_running() {
    let mut duplicate = noisy_request(10);
    duplicate.spells.push(duplicate.spells[0].clone());
    assert!(matches!(
        Harness::new(duplicate),
        Err(ConfigError::DuplicateSpell { spell: SpellId(1) })
    ));

    let mut zero_ticks = noisy_request(10);
    if let EffectKind::Periodic(dot) = &mut zero_ticks.spells[1].effect {
        dot.schedule.ticks = 0;
    }
    assert!(Harness::new(zero_ticks).is_err());

    let mut free_spam = noisy_request(10);
    free_spam.spells[1] = free_spam.spells[1].clone().off_gcd();
    free_spam.spells[1].cooldown = Duration::ZERO;
    assert!(Harness::new(free_spam).is_err());

    let mut no_mana = noisy_request(10);
    no_mana.player.resources.clear();
    assert!(matches!(
        Harness::new(no_mana),
        Err(ConfigError::MissingResource { .. })
    ));
}

#[test]
fn test_durations_too_long_are_config_errors() {
    let mut long_wait = noisy_request(10);
    long_wait.player.rotation.rules.insert(0, Rule::always(Action::Wait { secs: 1e20 }));
    assert!(matches!(
        Harness::new(long_wait),
        Err(ConfigError::InvalidField { ref field, .. }) if field == "player.rotation.rules[0].action.secs"
    ));

    let mut slow_regen = noisy_request(10);
    slow_regen.player.resources[0].regen_interval_secs = Some(1e20);
    assert!(matches!(
        Harness::new(slow_regen),
        Err(ConfigError::InvalidField { ref field, .. }) if field == "player.resources[0].regen_interval_secs"
    ));
}

#[test]
fn test_request_from_json() {
    let json = r#"{
        "player": {
            "name": "Warlock",
            "stats": {"spell_power": 1000.0, "spell_crit": 0.2},
            "resources": [{"kind": "mana", "max": 10000.0, "regen_per_second": 20.0}],
            "rotation": {
                "rules": [
                    {
                        "condition": {"not": {"is": {"aura_active": {"spell": 2}}}},
                        "action": {"cast": {"spell": 2}}
                    },
                    {"action": {"cast": {"spell": 1}}}
                ]
            }
        },
        "spells": [
            {
                "id": 1,
                "name": "Shadow Bolt",
                "school": "shadow",
                "cast_time_secs": 2.5,
                "cost": {"resource": "mana", "amount": 300.0},
                "effect": {"kind": "direct_damage", "formula": {"min": 500.0, "max": 600.0, "coefficient": 0.85}}
            },
            {
                "id": 2,
                "name": "Corruption",
                "school": "shadow",
                "cost": {"resource": "mana", "amount": 250.0},
                "effect": {
                    "kind": "periodic",
                    "ticks": 6,
                    "interval_secs": 3.0,
                    "formula": {"min": 150.0, "max": 150.0, "coefficient": 0.15}
                }
            }
        ],
        "encounter": {"duration_secs": 60.0},
        "iterations": 25,
        "seed": 9
    }"#;
    let req: RunRequest = serde_json::from_str(json).unwrap();
    let report = run_simulation(req).unwrap();
    assert_eq!(report.trials_completed, 25);
    assert_eq!(report.seed, 9);
    assert!(report.dps.mean > 0.0);
    assert!(report.spell(SpellId(2)).unwrap().ticks.mean > 0.0);
}
