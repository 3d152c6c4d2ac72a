//! Error types for the simulator.
//!
//! Configuration problems are caught before any trial starts. Anything that
//! goes wrong inside a trial is an engine or configuration defect and aborts
//! the whole run.

use std::time::Duration;

use thiserror::Error;

use crate::character::resources::ResourceKind;
use crate::character::unit::UnitId;
use crate::spells::types::SpellId;

/// Problems with a run request, detected before simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("`{field}` references unregistered spell {spell}")]
    UnknownSpell { field: String, spell: SpellId },

    #[error("spell {spell} is registered more than once")]
    DuplicateSpell { spell: SpellId },

    #[error("`{field}` costs {kind:?} but `{unit}` has no such resource pool")]
    MissingResource {
        field: String,
        unit: String,
        kind: ResourceKind,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failures raised while a trial is executing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("{unit} cannot cast {spell}: needs {needed:.1} {kind:?}, has {available:.1}")]
    InsufficientResource {
        unit: UnitId,
        spell: SpellId,
        kind: ResourceKind,
        needed: f64,
        available: f64,
    },

    #[error("{unit} cannot cast {spell}: on cooldown for {remaining:?}")]
    OnCooldown {
        unit: UnitId,
        spell: SpellId,
        remaining: Duration,
    },

    #[error("{unit} cannot cast {spell}: global cooldown active for {remaining:?}")]
    GcdActive {
        unit: UnitId,
        spell: SpellId,
        remaining: Duration,
    },

    #[error("{unit} cannot cast {spell}: already casting")]
    AlreadyCasting { unit: UnitId, spell: SpellId },

    #[error("event scheduled at {at:?} but the clock is already at {now:?}")]
    ScheduledInPast { at: Duration, now: Duration },

    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    #[error("unknown spell {0}")]
    UnknownSpell(SpellId),

    #[error("{unit} made more than {limit} decisions at {at:?}")]
    DecisionLoop {
        unit: UnitId,
        at: Duration,
        limit: u32,
    },

    #[error("spell {spell} exceeded the trigger depth limit of {limit}")]
    TriggerDepth { spell: SpellId, limit: u32 },
}

/// Errors returned by the iteration harness.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("trial {trial} failed at {at:?}: {source}")]
    Trial {
        trial: u32,
        at: Duration,
        #[source]
        source: SimError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_field() {
        let err = ConfigError::invalid("encounter.duration_secs", "must be positive");
        let msg = err.to_string();
        assert!(msg.contains("encounter.duration_secs"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_trial_error_reports_index_and_time() {
        let err = RunError::Trial {
            trial: 17,
            at: Duration::from_millis(4500),
            source: SimError::UnknownUnit(UnitId(3)),
        };
        let msg = err.to_string();
        assert!(msg.contains("trial 17"));
        assert!(msg.contains("4.5s"));
    }
}
