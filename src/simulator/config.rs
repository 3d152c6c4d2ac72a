//! Run request configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::character::resources::{ResourceConfig, ResourcePool};
use crate::character::stats::{validate_non_negative, Defenses, Stats};
use crate::character::unit::{Health, Unit, UnitId, UnitKind};
use crate::core::simulation::Roster;
use crate::error::ConfigError;
use crate::rotation::types::Rotation;
use crate::spells::registry::SpellBook;
use crate::spells::types::Spell;

/// A player or pet with resolved stats and a rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantConfig {
    pub name: String,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    #[serde(default)]
    pub rotation: Rotation,
    /// Attacks from the front can be parried and blocked.
    #[serde(default)]
    pub in_front_of_target: bool,
    #[serde(default = "default_threat_multiplier")]
    pub threat_multiplier: f64,
    /// Health pool for self-heals; `None` counts all healing as effective.
    #[serde(default)]
    pub health: Option<f64>,
}

fn default_threat_multiplier() -> f64 {
    1.0
}

impl CombatantConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats: Stats::default(),
            resources: Vec::new(),
            rotation: Rotation::default(),
            in_front_of_target: false,
            threat_multiplier: 1.0,
            health: None,
        }
    }

    fn validate(&self, field: &str, book: &SpellBook, num_targets: usize) -> Result<(), ConfigError> {
        self.stats.validate(&format!("{field}.stats"))?;
        validate_non_negative(&format!("{field}.threat_multiplier"), self.threat_multiplier)?;
        if let Some(health) = self.health {
            validate_non_negative(&format!("{field}.health"), health)?;
        }

        let mut kinds = BTreeSet::new();
        for (i, resource) in self.resources.iter().enumerate() {
            let path = format!("{field}.resources[{i}]");
            resource.validate(&path)?;
            if !kinds.insert(resource.kind) {
                return Err(ConfigError::invalid(
                    format!("{path}.kind"),
                    format!("{:?} pool defined twice", resource.kind),
                ));
            }
        }

        self.rotation
            .validate(&format!("{field}.rotation"), book, num_targets)?;
        for spell in self.rotation.cast_spells() {
            let Some(cost) = book.get(spell).and_then(|s| s.cost) else {
                continue;
            };
            if cost.amount > 0.0 && !kinds.contains(&cost.resource) {
                return Err(ConfigError::MissingResource {
                    field: format!("spells[{spell}].cost"),
                    unit: self.name.clone(),
                    kind: cost.resource,
                });
            }
        }
        Ok(())
    }

    fn to_unit(&self, kind: UnitKind) -> Unit {
        let mut unit = Unit::new(UnitId::default(), self.name.clone(), kind);
        unit.stats = self.stats;
        unit.resources = self
            .resources
            .iter()
            .map(|r| (r.kind, ResourcePool::from_config(r)))
            .collect();
        unit.in_front_of_target = self.in_front_of_target;
        unit.threat_multiplier = self.threat_multiplier;
        unit.health = self.health.map(|max| Health { current: max, max });
        unit
    }
}

/// An enemy in the encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_name")]
    pub name: String,
    /// `None` means the target cannot die.
    #[serde(default)]
    pub health: Option<f64>,
    #[serde(default)]
    pub defenses: Defenses,
}

fn default_target_name() -> String {
    "Target Dummy".to_string()
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: default_target_name(),
            health: None,
            defenses: Defenses::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    pub duration_secs: f64,
    pub targets: Vec<TargetConfig>,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            duration_secs: 180.0,
            targets: vec![TargetConfig::default()],
        }
    }
}

fn default_iterations() -> u32 {
    1000
}

/// Everything needed to run a batch of trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub player: CombatantConfig,
    #[serde(default)]
    pub pets: Vec<CombatantConfig>,
    pub spells: Vec<Spell>,
    #[serde(default)]
    pub encounter: EncounterConfig,
    /// Number of trials to run
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Base seed; `None` draws one at random
    #[serde(default)]
    pub seed: Option<u64>,
    /// Run trials on the rayon pool
    #[serde(default)]
    pub parallel: bool,
    /// Keep per-trial cast logs and timelines in the report
    #[serde(default)]
    pub diagnostics: bool,
    /// Wall-clock budget; remaining trials are skipped once it runs out
    #[serde(default)]
    pub time_budget_secs: Option<f64>,
}

impl RunRequest {
    pub fn new(player: CombatantConfig, spells: Vec<Spell>) -> Self {
        Self {
            player,
            pets: Vec::new(),
            spells,
            encounter: EncounterConfig::default(),
            iterations: default_iterations(),
            seed: None,
            parallel: false,
            diagnostics: false,
            time_budget_secs: None,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.encounter.duration_secs).unwrap_or(Duration::ZERO)
    }

    /// Validate the whole request and build the spell book.
    pub fn validate(&self) -> Result<SpellBook, ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::invalid("iterations", "must be at least 1"));
        }
        let secs = self.encounter.duration_secs;
        if !secs.is_finite() || secs <= 0.0 || self.duration().is_zero() {
            return Err(ConfigError::invalid(
                "encounter.duration_secs",
                format!("{secs} is not a positive number of seconds"),
            ));
        }
        if self.encounter.targets.is_empty() {
            return Err(ConfigError::invalid("encounter.targets", "at least one target is required"));
        }
        if let Some(budget) = self.time_budget_secs {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(ConfigError::invalid(
                    "time_budget_secs",
                    format!("{budget} is not a positive number of seconds"),
                ));
            }
        }

        let book = SpellBook::new(self.spells.clone())?;
        let num_targets = self.encounter.targets.len();
        self.player.validate("player", &book, num_targets)?;
        for (i, pet) in self.pets.iter().enumerate() {
            pet.validate(&format!("pets[{i}]"), &book, num_targets)?;
        }
        for (i, target) in self.encounter.targets.iter().enumerate() {
            let path = format!("encounter.targets[{i}]");
            target.defenses.validate(&format!("{path}.defenses"))?;
            if let Some(health) = target.health {
                validate_non_negative(&format!("{path}.health"), health)?;
                if health == 0.0 {
                    return Err(ConfigError::invalid(format!("{path}.health"), "must be positive"));
                }
            }
        }
        Ok(book)
    }

    /// Build the trial roster: player first, then pets, then targets.
    pub fn roster(&self) -> Roster {
        let mut roster = Roster::new(self.duration());
        roster.diagnostics = self.diagnostics;

        let player = roster.add(self.player.to_unit(UnitKind::Player));
        roster.player = player;
        roster.set_rotation(player, self.player.rotation.clone());

        let pets: Vec<UnitId> = self
            .pets
            .iter()
            .map(|pet| {
                let mut unit = pet.to_unit(UnitKind::Pet);
                unit.owner = Some(player);
                let id = roster.add(unit);
                roster.set_rotation(id, pet.rotation.clone());
                id
            })
            .collect();

        for target in &self.encounter.targets {
            let mut unit = Unit::new(UnitId::default(), target.name.clone(), UnitKind::Target);
            unit.defenses = target.defenses;
            unit.health = target.health.map(|max| Health { current: max, max });
            roster.add(unit);
        }

        let first_target = roster.targets.first().copied();
        for id in std::iter::once(player).chain(pets) {
            if let Some(unit) = roster.units.get_mut(id.0) {
                unit.target = first_target;
            }
        }
        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::resources::ResourceKind;
    use crate::rotation::types::{Action, ActionTarget, Rule};
    use crate::spells::types::{DamageFormula, EffectKind, SpellId};

    fn request() -> RunRequest {
        let spell = Spell::new(
            1,
            "Starfire",
            EffectKind::DirectDamage {
                formula: DamageFormula::flat(100.0),
            },
        )
        .cost(ResourceKind::Mana, 50.0);
        let mut player = CombatantConfig::new("Druid");
        player.resources.push(ResourceConfig::new(ResourceKind::Mana, 1000.0));
        player.rotation = Rotation::new(vec![Rule::always(Action::Cast {
            spell: SpellId(1),
            target: ActionTarget::Current,
        })]);
        RunRequest::new(player, vec![spell])
    }

    #[test]
    fn test_valid_request() {
        let book = request().validate().unwrap();
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_zero_iterations() {
        let mut req = request();
        req.iterations = 0;
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("iterations"));
    }

    #[test]
    fn test_non_positive_duration() {
        let mut req = request();
        req.encounter.duration_secs = 0.0;
        assert!(req.validate().unwrap_err().to_string().contains("encounter.duration_secs"));
        req.encounter.duration_secs = f64::NAN;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_no_targets() {
        let mut req = request();
        req.encounter.targets.clear();
        assert!(req.validate().unwrap_err().to_string().contains("encounter.targets"));
    }

    #[test]
    fn test_missing_resource_pool() {
        let mut req = request();
        req.player.resources.clear();
        let err = req.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingResource {
                kind: ResourceKind::Mana,
                ..
            }
        ));
    }

    #[test]
    fn test_negative_stat() {
        let mut req = request();
        req.player.stats.haste = -0.1;
        assert!(req.validate().unwrap_err().to_string().contains("player.stats.haste"));
    }

    #[test]
    fn test_roster_layout() {
        let mut req = request();
        req.pets.push(CombatantConfig::new("Treant"));
        req.encounter.targets.push(TargetConfig::default());
        let roster = req.roster();
        assert_eq!(roster.units.len(), 4);
        assert_eq!(roster.player, UnitId(0));
        assert_eq!(roster.targets, vec![UnitId(2), UnitId(3)]);
        assert_eq!(roster.units[1].owner, Some(UnitId(0)));
        assert_eq!(roster.units[1].target, Some(UnitId(2)));
        assert_eq!(roster.rotations.len(), 2);
    }

    #[test]
    fn test_request_from_json_defaults() {
        let req: RunRequest = serde_json::from_str(
            r#"{
                "player": {"name": "Mage", "stats": {"spell_power": 1500}},
                "spells": []
            }"#,
        )
        .unwrap();
        assert_eq!(req.iterations, 1000);
        assert_eq!(req.encounter.duration_secs, 180.0);
        assert_eq!(req.encounter.targets.len(), 1);
        assert_eq!(req.player.stats.spell_power, 1500.0);
        assert!(!req.parallel);
    }
}
