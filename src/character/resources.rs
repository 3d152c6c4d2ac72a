//! Resource pools (mana, energy, rage, runic power).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::stats::validate_non_negative;
use crate::core::constants::*;
use crate::error::ConfigError;
use crate::utils::secs;

/// Tolerance for floating point cost comparisons.
const COST_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Mana,
    Energy,
    Rage,
    RunicPower,
}

impl ResourceKind {
    pub fn default_regen_interval(self) -> Duration {
        match self {
            ResourceKind::Mana => MANA_REGEN_INTERVAL,
            ResourceKind::Energy => ENERGY_REGEN_INTERVAL,
            ResourceKind::Rage | ResourceKind::RunicPower => SLOW_RESOURCE_INTERVAL,
        }
    }
}

/// Configured pool for a combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub kind: ResourceKind,
    pub max: f64,
    /// Starting amount; defaults to `max`.
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub regen_per_second: f64,
    #[serde(default)]
    pub regen_interval_secs: Option<f64>,
}

impl ResourceConfig {
    pub fn new(kind: ResourceKind, max: f64) -> Self {
        Self {
            kind,
            max,
            start: None,
            regen_per_second: 0.0,
            regen_interval_secs: None,
        }
    }

    pub fn with_start(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_regen(mut self, per_second: f64) -> Self {
        self.regen_per_second = per_second;
        self
    }

    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        validate_non_negative(&format!("{field}.max"), self.max)?;
        validate_non_negative(&format!("{field}.regen_per_second"), self.regen_per_second)?;
        if let Some(start) = self.start {
            validate_non_negative(&format!("{field}.start"), start)?;
            if start > self.max {
                return Err(ConfigError::invalid(
                    format!("{field}.start"),
                    format!("{start} exceeds max {}", self.max),
                ));
            }
        }
        if let Some(secs) = self.regen_interval_secs {
            secs::positive(&format!("{field}.regen_interval_secs"), secs)?;
        }
        Ok(())
    }

    /// Configured tick interval, or the resource's default when unset or out of range.
    pub fn regen_interval(&self) -> Duration {
        self.regen_interval_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| self.kind.default_regen_interval())
    }
}

/// Live resource pool with flow accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePool {
    pub kind: ResourceKind,
    current: f64,
    max: f64,
    starting: f64,
    regen_per_second: f64,
    regen_interval: Duration,
    spent: f64,
    gained: f64,
    wasted: f64,
}

impl ResourcePool {
    pub fn from_config(config: &ResourceConfig) -> Self {
        let starting = config.start.unwrap_or(config.max);
        Self {
            kind: config.kind,
            current: starting,
            max: config.max,
            starting,
            regen_per_second: config.regen_per_second,
            regen_interval: config.regen_interval(),
            spent: 0.0,
            gained: 0.0,
            wasted: 0.0,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn percent(&self) -> f64 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    pub fn can_afford(&self, amount: f64) -> bool {
        self.current + COST_EPSILON >= amount
    }

    /// Deduct `amount`. Returns false (and changes nothing) if unaffordable.
    pub fn spend(&mut self, amount: f64) -> bool {
        if !self.can_afford(amount) {
            return false;
        }
        self.current = (self.current - amount).max(0.0);
        self.spent += amount;
        true
    }

    /// Add `amount`, clamped at max. Returns the amount actually gained.
    pub fn gain(&mut self, amount: f64) -> f64 {
        let room = (self.max - self.current).max(0.0);
        let gained = amount.min(room).max(0.0);
        self.current += gained;
        self.gained += gained;
        self.wasted += (amount - gained).max(0.0);
        gained
    }

    pub fn regenerates(&self) -> bool {
        self.regen_per_second > 0.0
    }

    pub fn regen_interval(&self) -> Duration {
        self.regen_interval
    }

    /// Amount restored by one regen tick.
    pub fn regen_per_tick(&self) -> f64 {
        self.regen_per_second * self.regen_interval.as_secs_f64()
    }

    pub fn starting(&self) -> f64 {
        self.starting
    }

    pub fn spent(&self) -> f64 {
        self.spent
    }

    pub fn gained(&self) -> f64 {
        self.gained
    }

    pub fn wasted(&self) -> f64 {
        self.wasted
    }
}
