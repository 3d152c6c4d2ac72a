//! Spell definitions.
//!
//! A `Spell` is plain data: cast requirements plus a tagged `EffectKind` that the
//! effect pipeline dispatches on. Spells are registered once in a
//! [`SpellBook`](super::registry::SpellBook) and never mutated afterwards.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::character::resources::ResourceKind;
use crate::character::stats::StatKind;
use crate::core::constants::DEFAULT_GCD;
use crate::utils::secs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellId(pub u32);

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSchool {
    #[default]
    Physical,
    Arcane,
    Fire,
    Frost,
    Holy,
    Nature,
    Shadow,
}

impl SpellSchool {
    pub fn is_physical(self) -> bool {
        self == SpellSchool::Physical
    }
}

/// Which attack table resolves the spell. See [`crate::combat::outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeRule {
    #[default]
    MagicHit,
    MeleeSpecial,
    AlwaysHit,
}

/// Which caster stat a formula scales with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    #[default]
    SpellPower,
    AttackPower,
    None,
}

/// `uniform(min, max) + coefficient * scaling stat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageFormula {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub coefficient: f64,
    #[serde(default)]
    pub scaling: Scaling,
}

impl DamageFormula {
    pub fn flat(amount: f64) -> Self {
        Self {
            min: amount,
            max: amount,
            coefficient: 0.0,
            scaling: Scaling::None,
        }
    }

    pub fn ranged(min: f64, max: f64, coefficient: f64, scaling: Scaling) -> Self {
        Self {
            min,
            max,
            coefficient,
            scaling,
        }
    }

    pub fn rolls(&self) -> bool {
        self.max > self.min
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Duration goes back to full.
    #[default]
    Reset,
    /// Remaining duration plus a full duration, capped at the aura's max.
    Extend,
}

/// What happens when an aura is applied while the same aura is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StackPolicy {
    Refresh {
        #[serde(default)]
        mode: RefreshMode,
        /// Keep the pending tick time instead of restarting the tick timer.
        #[serde(default)]
        keep_partial_tick: bool,
    },
    Stack {
        max_stacks: u32,
    },
}

impl Default for StackPolicy {
    fn default() -> Self {
        StackPolicy::Refresh {
            mode: RefreshMode::Reset,
            keep_partial_tick: false,
        }
    }
}

impl StackPolicy {
    pub fn max_stacks(&self) -> u32 {
        match self {
            StackPolicy::Refresh { .. } => 1,
            StackPolicy::Stack { max_stacks } => *max_stacks,
        }
    }
}

/// Stat or damage modification carried by an aura, scaled by its stack count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuraModifier {
    /// Target takes more damage (debuff). `school: None` matches every school.
    DamageTaken {
        #[serde(default)]
        school: Option<SpellSchool>,
        percent_per_stack: f64,
    },
    /// Bearer deals more damage (buff).
    DamageDone {
        #[serde(default)]
        school: Option<SpellSchool>,
        percent_per_stack: f64,
    },
    Stat {
        stat: StatKind,
        amount_per_stack: f64,
    },
}

impl AuraModifier {
    pub(crate) fn matches_school(school: Option<SpellSchool>, hit: SpellSchool) -> bool {
        school.map_or(true, |s| s == hit)
    }
}

/// A timed buff or debuff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuraConfig {
    #[serde(rename = "duration_secs", with = "secs")]
    pub duration: Duration,
    /// Ceiling for extended refreshes; defaults to `duration`.
    #[serde(rename = "max_duration_secs", default, with = "secs::option")]
    pub max_duration: Option<Duration>,
    #[serde(default)]
    pub policy: StackPolicy,
    #[serde(default)]
    pub modifier: Option<AuraModifier>,
}

impl AuraConfig {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            max_duration: None,
            policy: StackPolicy::default(),
            modifier: None,
        }
    }

    pub fn with_policy(mut self, policy: StackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_modifier(mut self, modifier: AuraModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = Some(max);
        self
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration.unwrap_or(self.duration).max(self.duration)
    }
}

/// Tick count and interval of a periodic effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSchedule {
    pub ticks: u32,
    #[serde(rename = "interval_secs", with = "secs")]
    pub interval: Duration,
}

impl TickSchedule {
    pub fn new(ticks: u32, interval: Duration) -> Self {
        Self { ticks, interval }
    }

    pub fn total(&self) -> Duration {
        self.interval.saturating_mul(self.ticks)
    }
}

/// A damage-over-time effect carried by an aura on the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicConfig {
    #[serde(flatten)]
    pub schedule: TickSchedule,
    /// Used instead of `schedule` when the encounter has more than one target.
    #[serde(default)]
    pub multi_target: Option<TickSchedule>,
    /// Ceiling for extended refreshes; defaults to the full tick schedule.
    #[serde(rename = "max_duration_secs", default, with = "secs::option")]
    pub max_duration: Option<Duration>,
    pub formula: DamageFormula,
    #[serde(default)]
    pub can_crit: bool,
    /// Each tick hits every target instead of the aura's bearer.
    #[serde(default)]
    pub aoe: bool,
    #[serde(default)]
    pub policy: StackPolicy,
    #[serde(default)]
    pub modifier: Option<AuraModifier>,
}

impl PeriodicConfig {
    pub fn new(ticks: u32, interval: Duration, formula: DamageFormula) -> Self {
        Self {
            schedule: TickSchedule::new(ticks, interval),
            multi_target: None,
            max_duration: None,
            formula,
            can_crit: false,
            aoe: false,
            policy: StackPolicy::default(),
            modifier: None,
        }
    }

    pub fn schedule_for(&self, num_targets: usize) -> TickSchedule {
        match self.multi_target {
            Some(multi) if num_targets > 1 => multi,
            _ => self.schedule,
        }
    }

    /// Aura view used for stacking and expiry bookkeeping.
    pub fn aura(&self, num_targets: usize) -> AuraConfig {
        AuraConfig {
            duration: self.schedule_for(num_targets).total(),
            max_duration: self.max_duration,
            policy: self.policy,
            modifier: self.modifier,
        }
    }
}

/// Effect kinds dispatched by the effect pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    DirectDamage {
        formula: DamageFormula,
    },
    /// Hits every target; `split` divides the damage between them.
    AoeDamage {
        formula: DamageFormula,
        #[serde(default)]
        split: bool,
    },
    Periodic(PeriodicConfig),
    /// Heals the caster.
    Heal {
        formula: DamageFormula,
    },
    ApplyAura {
        aura: AuraConfig,
        /// Apply to the caster instead of the cast target.
        #[serde(default)]
        on_caster: bool,
    },
    ResourceGain {
        resource: ResourceKind,
        amount: f64,
    },
}

impl EffectKind {
    pub fn is_harmful(&self) -> bool {
        match self {
            EffectKind::DirectDamage { .. } | EffectKind::AoeDamage { .. } | EffectKind::Periodic(_) => true,
            EffectKind::ApplyAura { on_caster, .. } => !on_caster,
            EffectKind::Heal { .. } | EffectKind::ResourceGain { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub resource: ResourceKind,
    pub amount: f64,
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

fn default_gcd() -> Duration {
    DEFAULT_GCD
}

/// An executable action bound to a caster at cast time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub id: SpellId,
    pub name: String,
    #[serde(default)]
    pub school: SpellSchool,
    #[serde(default)]
    pub cost: Option<Cost>,
    #[serde(rename = "cast_time_secs", default, with = "secs")]
    pub cast_time: Duration,
    #[serde(default = "yes")]
    pub triggers_gcd: bool,
    #[serde(rename = "gcd_secs", default = "default_gcd", with = "secs")]
    pub gcd: Duration,
    #[serde(rename = "cooldown_secs", default, with = "secs")]
    pub cooldown: Duration,
    #[serde(default)]
    pub outcome: OutcomeRule,
    pub effect: EffectKind,
    #[serde(default = "one")]
    pub damage_multiplier: f64,
    #[serde(default = "one")]
    pub threat_multiplier: f64,
    /// Cast immediately, for free, when this spell lands.
    #[serde(default)]
    pub on_land: Vec<SpellId>,
}

impl Spell {
    pub fn new(id: u32, name: impl Into<String>, effect: EffectKind) -> Self {
        Self {
            id: SpellId(id),
            name: name.into(),
            school: SpellSchool::default(),
            cost: None,
            cast_time: Duration::ZERO,
            triggers_gcd: true,
            gcd: DEFAULT_GCD,
            cooldown: Duration::ZERO,
            outcome: OutcomeRule::default(),
            effect,
            damage_multiplier: 1.0,
            threat_multiplier: 1.0,
            on_land: Vec::new(),
        }
    }

    pub fn school(mut self, school: SpellSchool) -> Self {
        self.school = school;
        self
    }

    pub fn cost(mut self, resource: ResourceKind, amount: f64) -> Self {
        self.cost = Some(Cost { resource, amount });
        self
    }

    pub fn cast_time(mut self, cast_time: Duration) -> Self {
        self.cast_time = cast_time;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn off_gcd(mut self) -> Self {
        self.triggers_gcd = false;
        self
    }

    pub fn outcome(mut self, rule: OutcomeRule) -> Self {
        self.outcome = rule;
        self
    }

    pub fn threat_multiplier(mut self, multiplier: f64) -> Self {
        self.threat_multiplier = multiplier;
        self
    }

    pub fn damage_multiplier(mut self, multiplier: f64) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    pub fn triggers(mut self, spell: SpellId) -> Self {
        self.on_land.push(spell);
        self
    }
}
