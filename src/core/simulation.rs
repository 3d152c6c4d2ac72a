//! One trial of an encounter.
//!
//! A `Simulation` owns the clock, the RNG stream, a private copy of the
//! roster and the event queue. It borrows the spell book and rotations from
//! the run. Events are popped in time order and dispatched to completion
//! before the next one is looked at.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use super::constants::*;
use super::metrics::{TimelineSample, TrialMetrics};
use super::rng::SimRng;
use super::scheduler::Scheduler;
use crate::character::resources::ResourceKind;
use crate::character::stats::Stats;
use crate::character::unit::{Cast, Unit, UnitId};
use crate::error::SimError;
use crate::rotation::interpreter::{self, Decision, RotationPhase, RotationState};
use crate::rotation::types::{ActionTarget, Rotation};
use crate::spells::aura::{Aura, AuraKey, Dot, Snapshot};
use crate::spells::registry::SpellBook;
use crate::spells::types::{
    AuraConfig, EffectKind, PeriodicConfig, RefreshMode, Scaling, Spell, SpellId, StackPolicy,
};

/// Payload of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    CastComplete { unit: UnitId },
    GcdReady { unit: UnitId },
    CooldownReady { unit: UnitId, spell: SpellId },
    DotTick { key: AuraKey },
    AuraExpire { key: AuraKey },
    ResourceTick { unit: UnitId, kind: ResourceKind },
    /// End of a rotation `Wait`, or a follow-up after an off-GCD instant.
    DecisionPoint { unit: UnitId },
    Sample,
}

/// Units and rotations shared by every trial of a run.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub units: Vec<Unit>,
    pub rotations: BTreeMap<UnitId, Rotation>,
    /// Encounter targets, in configuration order.
    pub targets: Vec<UnitId>,
    /// Unit whose resources are reported.
    pub player: UnitId,
    pub duration: Duration,
    /// Keep cast logs and timeline samples.
    pub diagnostics: bool,
}

impl Roster {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    /// Add a unit, assigning its id. Targets are also added to the encounter list.
    pub fn add(&mut self, mut unit: Unit) -> UnitId {
        let id = UnitId(self.units.len());
        unit.id = id;
        if unit.is_target() {
            self.targets.push(id);
        }
        self.units.push(unit);
        id
    }

    pub fn set_rotation(&mut self, unit: UnitId, rotation: Rotation) {
        self.rotations.insert(unit, rotation);
    }
}

pub struct Simulation<'a> {
    pub(crate) book: &'a SpellBook,
    pub(crate) scheduler: Scheduler<SimEvent>,
    pub(crate) rng: SimRng,
    pub(crate) units: Vec<Unit>,
    pub(crate) metrics: TrialMetrics,
    pub(crate) diagnostics: bool,
    targets: &'a [UnitId],
    player: UnitId,
    duration: Duration,
    rotations: BTreeMap<UnitId, RotationState<'a>>,
    last_integrated: Duration,
    ended_at: Option<Duration>,
}

impl<'a> Simulation<'a> {
    pub fn new(book: &'a SpellBook, roster: &'a Roster, rng: SimRng) -> Self {
        let rotations = roster
            .rotations
            .iter()
            .map(|(unit, rotation)| (*unit, RotationState::new(rotation)))
            .collect();
        Self {
            book,
            scheduler: Scheduler::new(),
            rng,
            units: roster.units.clone(),
            metrics: TrialMetrics::default(),
            diagnostics: roster.diagnostics,
            targets: &roster.targets,
            player: roster.player,
            duration: roster.duration,
            rotations,
            last_integrated: Duration::ZERO,
            ended_at: None,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.now())
    }

    pub fn book(&self) -> &'a SpellBook {
        self.book
    }

    pub fn unit(&self, id: UnitId) -> Result<&Unit, SimError> {
        self.units.get(id.0).ok_or(SimError::UnknownUnit(id))
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, SimError> {
        self.units.get_mut(id.0).ok_or(SimError::UnknownUnit(id))
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn targets(&self) -> &[UnitId] {
        self.targets
    }

    pub fn live_targets(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.targets
            .iter()
            .copied()
            .filter(|t| self.units.get(t.0).map_or(false, Unit::is_alive))
    }

    pub fn metrics(&self) -> &TrialMetrics {
        &self.metrics
    }

    pub fn phase(&self, unit: UnitId) -> Option<RotationPhase> {
        self.rotations.get(&unit).map(|s| s.phase)
    }

    pub fn effective_stats(&self, unit: UnitId) -> Result<Stats, SimError> {
        Ok(self.unit(unit)?.effective_stats())
    }

    pub fn can_cast(&self, caster: UnitId, spell: SpellId) -> bool {
        self.check_cast(caster, spell).is_ok()
    }

    /// Cast requirements: not casting, GCD, cooldown, resource.
    pub fn check_cast(&self, caster: UnitId, spell_id: SpellId) -> Result<(), SimError> {
        let spell = self.book.spell(spell_id)?;
        let unit = self.unit(caster)?;
        let now = self.now();
        if unit.is_casting() {
            return Err(SimError::AlreadyCasting {
                unit: caster,
                spell: spell_id,
            });
        }
        let gcd = unit.gcd_remaining(now);
        if spell.triggers_gcd && !gcd.is_zero() {
            return Err(SimError::GcdActive {
                unit: caster,
                spell: spell_id,
                remaining: gcd,
            });
        }
        let cooldown = unit.cooldown_remaining(spell_id, now);
        if !cooldown.is_zero() {
            return Err(SimError::OnCooldown {
                unit: caster,
                spell: spell_id,
                remaining: cooldown,
            });
        }
        check_cost(unit, spell)
    }

    // =========================================================================
    // TRIAL LOOP
    // =========================================================================

    /// Run the trial to completion. On error, `now()` is the failing event's time.
    pub fn run(&mut self) -> Result<TrialMetrics, SimError> {
        self.pull()?;
        if self.all_targets_dead() {
            self.ended_at = Some(self.now());
        }
        while self.ended_at.is_none() {
            let Some((at, event)) = self.scheduler.pop_due(self.duration) else {
                break;
            };
            self.integrate(at);
            self.dispatch(event)?;
            if self.all_targets_dead() {
                debug!(at = ?at, "all targets dead, ending trial");
                self.ended_at = Some(at);
            }
        }
        let end = self.ended_at.unwrap_or(self.duration);
        self.integrate(end);
        self.scheduler.advance_to(end);
        Ok(self.finish(end))
    }

    fn pull(&mut self) -> Result<(), SimError> {
        let player = self.player;
        let pools = self.unit(player)?.resources.values().cloned().collect::<Vec<_>>();
        self.metrics.open_pools(pools.iter());

        for unit in &self.units {
            if unit.is_target() {
                continue;
            }
            for pool in unit.resources.values().filter(|p| p.regenerates()) {
                self.scheduler.schedule(
                    pool.regen_interval(),
                    SimEvent::ResourceTick {
                        unit: unit.id,
                        kind: pool.kind,
                    },
                )?;
            }
        }
        if self.diagnostics {
            self.scheduler.schedule(Duration::ZERO, SimEvent::Sample)?;
        }

        let casters: Vec<(UnitId, &'a Rotation)> =
            self.rotations.iter().map(|(u, s)| (*u, s.rotation)).collect();
        for &(unit, rotation) in &casters {
            for cast in &rotation.prepull {
                self.prepull(unit, cast.spell, cast.target)?;
            }
        }
        for &(unit, _) in &casters {
            self.decide(unit)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: SimEvent) -> Result<(), SimError> {
        match event {
            SimEvent::CastComplete { unit } => self.complete_cast(unit),
            SimEvent::GcdReady { unit } | SimEvent::CooldownReady { unit, .. } => self.decide(unit),
            SimEvent::DotTick { key } => self.tick_dot(key),
            SimEvent::AuraExpire { key } => self.expire_aura(key),
            SimEvent::ResourceTick { unit, kind } => self.regen(unit, kind),
            SimEvent::DecisionPoint { unit } => {
                if let Some(state) = self.rotations.get_mut(&unit) {
                    state.wait = None;
                }
                self.decide(unit)
            }
            SimEvent::Sample => self.sample(),
        }
    }

    fn finish(&mut self, end: Duration) -> TrialMetrics {
        let mut metrics = std::mem::take(&mut self.metrics);
        metrics.duration = end;
        if let Some(player) = self.units.get(self.player.0) {
            metrics.close_pools(player.resources.values());
        }
        metrics.targets_killed = self
            .targets
            .iter()
            .filter(|t| self.units.get(t.0).map_or(false, |u| !u.is_alive()))
            .count() as u32;
        metrics.rng_draws = self.rng.draws();
        metrics
    }

    fn integrate(&mut self, at: Duration) {
        let dt = at.saturating_sub(self.last_integrated);
        self.last_integrated = self.last_integrated.max(at);
        if dt.is_zero() {
            return;
        }
        if let Some(player) = self.units.get(self.player.0) {
            self.metrics.integrate_pools(player.resources.values(), dt);
        }
    }

    fn all_targets_dead(&self) -> bool {
        !self.targets.is_empty()
            && self.targets.iter().all(|t| {
                self.units
                    .get(t.0)
                    .map_or(false, |u| u.health.is_some() && !u.is_alive())
            })
    }

    // =========================================================================
    // ROTATION
    // =========================================================================

    fn decide(&mut self, unit: UnitId) -> Result<(), SimError> {
        if self.ended_at.is_some() || self.unit(unit)?.is_casting() {
            return Ok(());
        }
        let now = self.now();
        let Some(state) = self.rotations.get_mut(&unit) else {
            return Ok(());
        };
        state.note_decision(unit, now)?;
        state.phase = RotationPhase::Evaluating;
        let rotation = state.rotation;

        match interpreter::choose(self, unit, rotation) {
            Some(Decision::Cast { spell, target }) => {
                self.set_phase(unit, RotationPhase::Acting);
                self.start_cast(unit, spell, target)?;
                let book = self.book;
                let instant_off_gcd = {
                    let s = book.spell(spell)?;
                    !s.triggers_gcd && s.cast_time.is_zero()
                };
                if instant_off_gcd {
                    self.scheduler
                        .schedule(now, SimEvent::DecisionPoint { unit })?;
                }
            }
            Some(Decision::Wait(delay)) => {
                let handle = self
                    .scheduler
                    .schedule_in(delay, SimEvent::DecisionPoint { unit })?;
                if let Some(state) = self.rotations.get_mut(&unit) {
                    if let Some(old) = state.wait.replace(handle) {
                        self.scheduler.cancel(old);
                    }
                    state.phase = RotationPhase::Idle;
                }
            }
            None => self.set_phase(unit, RotationPhase::Idle),
        }
        Ok(())
    }

    fn set_phase(&mut self, unit: UnitId, phase: RotationPhase) {
        if let Some(state) = self.rotations.get_mut(&unit) {
            state.phase = phase;
        }
    }

    // =========================================================================
    // CASTING
    // =========================================================================

    /// Begin casting `spell` at `target`, paying its cost and starting its timers.
    pub fn start_cast(&mut self, caster: UnitId, spell_id: SpellId, target: UnitId) -> Result<(), SimError> {
        self.check_cast(caster, spell_id)?;
        self.unit(target)?;
        let book = self.book;
        let spell = book.spell(spell_id)?;
        let now = self.now();

        self.pay_cost(caster, spell)?;
        self.start_cooldown(caster, spell)?;
        let haste = self.unit(caster)?.effective_stats().haste_divisor();
        if spell.triggers_gcd {
            let gcd = spell.gcd.div_f64(haste).max(MIN_GCD.min(spell.gcd));
            self.unit_mut(caster)?.gcd_ready_at = now.saturating_add(gcd);
            self.scheduler
                .schedule_in(gcd, SimEvent::GcdReady { unit: caster })?;
        }
        self.metrics.spell_mut(spell_id).casts += 1;

        let cast_time = spell.cast_time.div_f64(haste);
        debug!(at = ?now, %caster, spell = %spell.name, %target, ?cast_time, "cast started");
        if cast_time.is_zero() {
            return self.cast_effect(caster, spell_id, target, 0);
        }
        let event = self
            .scheduler
            .schedule_in(cast_time, SimEvent::CastComplete { unit: caster })?;
        self.unit_mut(caster)?.casting = Some(Cast {
            spell: spell_id,
            target,
            started_at: now,
            completes_at: now.saturating_add(cast_time),
            event,
        });
        Ok(())
    }

    fn complete_cast(&mut self, caster: UnitId) -> Result<(), SimError> {
        let Some(cast) = self.unit_mut(caster)?.casting.take() else {
            return Ok(());
        };
        debug!(at = ?self.now(), %caster, spell = %cast.spell, "cast complete");
        self.cast_effect(caster, cast.spell, cast.target, 0)?;
        self.decide(caster)
    }

    /// Prepull casts skip cast time and the GCD but still pay and start cooldowns.
    fn prepull(&mut self, caster: UnitId, spell_id: SpellId, target: ActionTarget) -> Result<(), SimError> {
        let book = self.book;
        let spell = book.spell(spell_id)?;
        let Some(target) = interpreter::resolve_target(self, caster, target) else {
            return Ok(());
        };
        check_cost(self.unit(caster)?, spell)?;
        self.pay_cost(caster, spell)?;
        self.start_cooldown(caster, spell)?;
        self.metrics.spell_mut(spell_id).casts += 1;
        debug!(%caster, spell = %spell.name, %target, "prepull cast");
        self.cast_effect(caster, spell_id, target, 0)
    }

    fn pay_cost(&mut self, caster: UnitId, spell: &Spell) -> Result<(), SimError> {
        let Some(cost) = spell.cost else {
            return Ok(());
        };
        let unit = self.unit_mut(caster)?;
        if let Some(pool) = unit.resource_mut(cost.resource) {
            if pool.spend(cost.amount) {
                return Ok(());
            }
        }
        Err(SimError::InsufficientResource {
            unit: caster,
            spell: spell.id,
            kind: cost.resource,
            needed: cost.amount,
            available: unit.resource(cost.resource).map_or(0.0, |p| p.current()),
        })
    }

    fn start_cooldown(&mut self, caster: UnitId, spell: &Spell) -> Result<(), SimError> {
        if spell.cooldown.is_zero() {
            return Ok(());
        }
        let ready_at = self.now().saturating_add(spell.cooldown);
        self.unit_mut(caster)?.cooldowns.insert(spell.id, ready_at);
        self.scheduler.schedule(
            ready_at,
            SimEvent::CooldownReady {
                unit: caster,
                spell: spell.id,
            },
        )?;
        Ok(())
    }

    fn regen(&mut self, unit: UnitId, kind: ResourceKind) -> Result<(), SimError> {
        let Some(pool) = self.unit_mut(unit)?.resource_mut(kind) else {
            return Ok(());
        };
        let interval = pool.regen_interval();
        pool.gain(pool.regen_per_tick());
        self.scheduler
            .schedule_in(interval, SimEvent::ResourceTick { unit, kind })?;
        self.decide(unit)
    }

    fn sample(&mut self) -> Result<(), SimError> {
        let now = self.now();
        let player = self.unit(self.player)?;
        let sample = TimelineSample {
            at_secs: now.as_secs_f64(),
            damage: self.metrics.damage,
            resources: player
                .resources
                .iter()
                .map(|(kind, pool)| (*kind, pool.current()))
                .collect(),
            gcd_remaining_secs: player.gcd_remaining(now).as_secs_f64(),
            cooldowns_remaining_secs: player
                .cooldowns
                .keys()
                .map(|spell| (*spell, player.cooldown_remaining(*spell, now).as_secs_f64()))
                .collect(),
        };
        self.metrics.timeline.push(sample);
        self.scheduler.schedule_in(SAMPLE_INTERVAL, SimEvent::Sample)?;
        Ok(())
    }

    // =========================================================================
    // AURAS
    // =========================================================================

    /// Apply the aura or dot carried by `spell` to `target`, going through the
    /// spell's stacking policy when one is already live.
    pub fn apply_aura(&mut self, caster: UnitId, spell_id: SpellId, target: UnitId) -> Result<(), SimError> {
        let book = self.book;
        let spell = book.spell(spell_id)?;
        let num_targets = self.targets.len();
        let (config, periodic) = match &spell.effect {
            EffectKind::ApplyAura { aura, .. } => (*aura, None),
            EffectKind::Periodic(p) => (p.aura(num_targets), Some(p)),
            _ => return Ok(()),
        };
        let snapshot = match periodic {
            Some(p) => Some(self.snapshot(caster, spell, p)?),
            None => None,
        };
        let now = self.now();
        let key = AuraKey::new(spell_id, target);

        let existing = self.unit(target)?.auras.get(&spell_id).cloned();
        let aura = match existing {
            Some(old) => self.reapply(old, caster, &config, periodic, snapshot, num_targets)?,
            None => {
                let mut aura = Aura {
                    key,
                    caster,
                    stacks: 1,
                    applied_at: now,
                    expires_at: now.saturating_add(config.duration),
                    modifier: config.modifier,
                    expire_event: None,
                    dot: None,
                };
                match (periodic, snapshot) {
                    (Some(p), Some(snapshot)) => {
                        let schedule = p.schedule_for(num_targets);
                        let first = now.saturating_add(schedule.interval);
                        aura.expires_at = now.saturating_add(schedule.total());
                        aura.dot = Some(Dot {
                            remaining_ticks: schedule.ticks,
                            interval: schedule.interval,
                            next_tick_at: first,
                            next_tick: Some(self.scheduler.schedule(first, SimEvent::DotTick { key })?),
                            snapshot,
                            ticks_done: 0,
                        });
                    }
                    _ => {
                        aura.expire_event =
                            Some(self.scheduler.schedule(aura.expires_at, SimEvent::AuraExpire { key })?);
                    }
                }
                debug!(at = ?now, %key, expires = ?aura.expires_at, "aura applied");
                aura
            }
        };
        self.unit_mut(target)?.auras.insert(spell_id, aura);
        Ok(())
    }

    fn reapply(
        &mut self,
        mut aura: Aura,
        caster: UnitId,
        config: &AuraConfig,
        periodic: Option<&PeriodicConfig>,
        snapshot: Option<Snapshot>,
        num_targets: usize,
    ) -> Result<Aura, SimError> {
        let now = self.now();
        let key = aura.key;
        aura.caster = caster;
        aura.modifier = config.modifier;

        let (mode, keep_tick) = match config.policy {
            StackPolicy::Refresh {
                mode,
                keep_partial_tick,
            } => (mode, keep_partial_tick || mode == RefreshMode::Extend),
            StackPolicy::Stack { max_stacks } => {
                aura.stacks = (aura.stacks + 1).min(max_stacks);
                (RefreshMode::Reset, false)
            }
        };

        match (periodic, snapshot, aura.dot.as_mut()) {
            (Some(p), Some(snapshot), Some(dot)) => {
                let schedule = p.schedule_for(num_targets);
                let max_ticks = max_ticks(config.max_duration(), schedule.interval).max(schedule.ticks);
                dot.snapshot = snapshot;
                dot.interval = schedule.interval;
                dot.remaining_ticks = match mode {
                    RefreshMode::Reset => schedule.ticks,
                    RefreshMode::Extend => dot.remaining_ticks.saturating_add(schedule.ticks).min(max_ticks),
                };
                let keep = keep_tick && dot.next_tick.map_or(false, |h| self.scheduler.is_pending(h));
                if !keep {
                    if let Some(old) = dot.next_tick.take() {
                        self.scheduler.cancel(old);
                    }
                    dot.next_tick_at = now.saturating_add(schedule.interval);
                    dot.next_tick = Some(self.scheduler.schedule(dot.next_tick_at, SimEvent::DotTick { key })?);
                }
                aura.expires_at = dot
                    .next_tick_at
                    .saturating_add(dot.interval.saturating_mul(dot.remaining_ticks - 1));
            }
            _ => {
                aura.expires_at = match mode {
                    RefreshMode::Reset => now.saturating_add(config.duration),
                    RefreshMode::Extend => {
                        let extended = aura.expires_at.saturating_sub(now).saturating_add(config.duration);
                        now.saturating_add(extended.min(config.max_duration()))
                    }
                };
                if let Some(old) = aura.expire_event.take() {
                    self.scheduler.cancel(old);
                }
                aura.expire_event = Some(self.scheduler.schedule(aura.expires_at, SimEvent::AuraExpire { key })?);
            }
        }
        debug!(at = ?now, %key, stacks = aura.stacks, expires = ?aura.expires_at, "aura refreshed");
        Ok(aura)
    }

    fn snapshot(&self, caster: UnitId, spell: &Spell, periodic: &PeriodicConfig) -> Result<Snapshot, SimError> {
        let unit = self.unit(caster)?;
        let stats = unit.effective_stats();
        Ok(Snapshot {
            power: scaling_power(&stats, periodic.formula.scaling),
            crit: if spell.school.is_physical() {
                stats.melee_crit
            } else {
                stats.spell_crit
            },
            damage_done_multiplier: unit.damage_done_multiplier(spell.school),
        })
    }

    fn expire_aura(&mut self, key: AuraKey) -> Result<(), SimError> {
        let Some(aura) = self.unit_mut(key.target)?.auras.remove(&key.spell) else {
            return Ok(());
        };
        debug!(at = ?self.now(), %key, "aura expired");
        self.decide(aura.caster)?;
        if key.target != aura.caster {
            self.decide(key.target)?;
        }
        Ok(())
    }

    /// Fire one periodic tick of the dot at `key`.
    pub fn tick_dot(&mut self, key: AuraKey) -> Result<(), SimError> {
        let book = self.book;
        let spell = book.spell(key.spell)?;
        let EffectKind::Periodic(periodic) = &spell.effect else {
            return Ok(());
        };
        let Some(aura) = self.unit_mut(key.target)?.auras.get_mut(&key.spell) else {
            return Ok(());
        };
        let caster = aura.caster;
        let stacks = aura.stacks;
        let Some(dot) = aura.dot.as_mut() else {
            return Ok(());
        };
        dot.remaining_ticks = dot.remaining_ticks.saturating_sub(1);
        dot.ticks_done += 1;
        dot.next_tick = None;
        let snapshot = dot.snapshot;
        let remaining = dot.remaining_ticks;
        let interval = dot.interval;

        let victims: Vec<UnitId> = if periodic.aoe {
            self.live_targets().collect()
        } else if self.unit(key.target)?.is_alive() {
            vec![key.target]
        } else {
            Vec::new()
        };
        for victim in victims {
            self.periodic_hit(caster, spell, periodic, &snapshot, stacks, victim)?;
        }

        if remaining > 0 {
            let next_at = self.now().saturating_add(interval);
            let handle = self.scheduler.schedule(next_at, SimEvent::DotTick { key })?;
            if let Some(dot) = self
                .unit_mut(key.target)?
                .auras
                .get_mut(&key.spell)
                .and_then(|a| a.dot.as_mut())
            {
                dot.next_tick = Some(handle);
                dot.next_tick_at = next_at;
            }
            Ok(())
        } else {
            self.unit_mut(key.target)?.auras.remove(&key.spell);
            debug!(at = ?self.now(), %key, "dot finished");
            self.decide(caster)
        }
    }
}

pub(crate) fn scaling_power(stats: &Stats, scaling: Scaling) -> f64 {
    match scaling {
        Scaling::SpellPower => stats.spell_power,
        Scaling::AttackPower => stats.attack_power,
        Scaling::None => 0.0,
    }
}

fn check_cost(unit: &Unit, spell: &Spell) -> Result<(), SimError> {
    let Some(cost) = spell.cost else {
        return Ok(());
    };
    match unit.resource(cost.resource) {
        Some(pool) if pool.can_afford(cost.amount) => Ok(()),
        pool => Err(SimError::InsufficientResource {
            unit: unit.id,
            spell: spell.id,
            kind: cost.resource,
            needed: cost.amount,
            available: pool.map_or(0.0, |p| p.current()),
        }),
    }
}

fn max_ticks(max_duration: Duration, interval: Duration) -> u32 {
    if interval.is_zero() {
        return 0;
    }
    (max_duration.as_nanos() / interval.as_nanos()).min(u32::MAX as u128) as u32
}
