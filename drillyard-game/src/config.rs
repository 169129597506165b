//! Campaign configuration: zone→scene table, missions and anomaly specs.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anomaly::{AnomalyEffectSpec, AnomalyKind, VehicleEffect};
use crate::constants::{GRADUATION_SCENE, HUB_SCENE, MAIN_MENU_SCENE, ZONE_SCENE_PREFIX};
use crate::mission::MissionConfig;
use crate::objectives::ObjectiveConfig;
use crate::vehicle::VehicleKind;
use crate::zone::ZoneId;

/// Errors raised when a campaign config is malformed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("campaign config is not valid JSON: {0}")]
    Parse(String),
    #[error("zone {0} is configured more than once")]
    DuplicateZone(ZoneId),
    #[error("zone {0} has no configuration")]
    MissingZone(ZoneId),
    #[error("zone {zone} has an empty scene name")]
    EmptyScene { zone: ZoneId },
    #[error("scene '{scene}' is mapped to more than one destination")]
    DuplicateScene { scene: String },
    #[error("mission for zone {zone} has no objectives")]
    NoObjectives { zone: ZoneId },
    #[error("mission for zone {zone} has an objective with an empty id")]
    EmptyObjectiveId { zone: ZoneId },
    #[error("mission for zone {zone} repeats objective '{id}'")]
    DuplicateObjective { zone: ZoneId, id: String },
    #[error("objective '{id}' in zone {zone} needs positive required progress (got {value:.2})")]
    RequiredProgress { zone: ZoneId, id: String, value: f32 },
    #[error("{field} for zone {zone} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        zone: ZoneId,
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
}

/// Everything authored for one training zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub zone: ZoneId,
    pub scene: String,
    pub mission: MissionConfig,
    #[serde(default)]
    pub anomalies: Vec<AnomalyEffectSpec>,
    #[serde(default)]
    pub vehicle: Option<VehicleKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    #[serde(default = "CampaignConfig::default_hub_scene")]
    pub hub_scene: String,
    #[serde(default = "CampaignConfig::default_graduation_scene")]
    pub graduation_scene: String,
    #[serde(default = "CampaignConfig::default_main_menu_scene")]
    pub main_menu_scene: String,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl CampaignConfig {
    fn default_hub_scene() -> String {
        HUB_SCENE.to_string()
    }

    fn default_graduation_scene() -> String {
        GRADUATION_SCENE.to_string()
    }

    fn default_main_menu_scene() -> String {
        MAIN_MENU_SCENE.to_string()
    }

    /// Parse a campaign from JSON. Call [`Self::validate`] before use.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the JSON does not match the schema.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Scene name for `zone`, if configured.
    #[must_use]
    pub fn scene_for(&self, zone: ZoneId) -> Option<&str> {
        self.zone(zone).map(|cfg| cfg.scene.as_str())
    }

    #[must_use]
    pub fn zone(&self, zone: ZoneId) -> Option<&ZoneConfig> {
        self.zones.iter().find(|cfg| cfg.zone == zone)
    }

    /// Zone→scene lookup table for the progression controller.
    #[must_use]
    pub fn scene_table(&self) -> BTreeMap<ZoneId, String> {
        let mut table = BTreeMap::new();
        for cfg in &self.zones {
            table.entry(cfg.zone).or_insert_with(|| cfg.scene.clone());
        }
        table
    }

    /// Check configuration invariants.
    ///
    /// Duplicate anomaly kinds within a zone are allowed (the first one
    /// wins at runtime) and only produce a warning.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_zones = BTreeSet::new();
        let mut seen_scenes: BTreeSet<&str> = [
            self.hub_scene.as_str(),
            self.graduation_scene.as_str(),
            self.main_menu_scene.as_str(),
        ]
        .into_iter()
        .collect();
        if seen_scenes.len() != 3 {
            return Err(ConfigError::DuplicateScene {
                scene: self.hub_scene.clone(),
            });
        }

        for cfg in &self.zones {
            if !seen_zones.insert(cfg.zone) {
                return Err(ConfigError::DuplicateZone(cfg.zone));
            }
            if cfg.scene.trim().is_empty() {
                return Err(ConfigError::EmptyScene { zone: cfg.zone });
            }
            if !seen_scenes.insert(cfg.scene.as_str()) {
                return Err(ConfigError::DuplicateScene {
                    scene: cfg.scene.clone(),
                });
            }
            validate_mission(cfg.zone, &cfg.mission)?;
            validate_anomalies(cfg.zone, &cfg.anomalies)?;
        }

        if let Some(missing) = ZoneId::ALL.into_iter().find(|zone| !seen_zones.contains(zone)) {
            return Err(ConfigError::MissingZone(missing));
        }
        Ok(())
    }

    /// Built-in campaign covering all six zones.
    #[must_use]
    pub fn default_config() -> Self {
        use AnomalyKind::{EnvironmentalChange, EquipmentFailure, UnexpectedEvent};
        use VehicleEffect::{DisableControls, ReduceSpeed};

        let entry = |zone: ZoneId,
                     vehicle: VehicleKind,
                     title: &str,
                     objectives: Vec<ObjectiveConfig>,
                     anomalies: Vec<AnomalyEffectSpec>| ZoneConfig {
            zone,
            scene: format!("{ZONE_SCENE_PREFIX}{}", zone.key()),
            mission: MissionConfig {
                title: title.to_string(),
                objectives,
            },
            anomalies,
            vehicle: Some(vehicle),
        };

        let zones = vec![
            entry(
                ZoneId::Construction,
                VehicleKind::Excavator,
                "Break Ground",
                vec![
                    ObjectiveConfig::new("dig_trenches", "Dig the foundation trenches", 3.0),
                    ObjectiveConfig::new("clear_debris", "Clear debris from the pad", 1.0),
                    ObjectiveConfig::new("inspect_site", "Walk the site with the foreman", 1.0)
                        .optional(),
                ],
                vec![AnomalyEffectSpec::new(
                    EquipmentFailure,
                    8.0,
                    0.4,
                    ReduceSpeed,
                )],
            ),
            entry(
                ZoneId::Warehouse,
                VehicleKind::Forklift,
                "Rush Order",
                vec![
                    ObjectiveConfig::new("stack_pallets", "Stack pallets in bay four", 5.0),
                    ObjectiveConfig::new("load_truck", "Load the waiting truck", 1.0),
                    ObjectiveConfig::new("tidy_aisles", "Sweep the aisles", 1.0).optional(),
                ],
                vec![AnomalyEffectSpec::new(
                    UnexpectedEvent,
                    3.0,
                    1.0,
                    DisableControls,
                )],
            ),
            entry(
                ZoneId::Agriculture,
                VehicleKind::Tractor,
                "Planting Season",
                vec![
                    ObjectiveConfig::new("plow_rows", "Plow the east field", 4.0),
                    ObjectiveConfig::new("plant_seeds", "Plant the plowed rows", 4.0),
                    ObjectiveConfig::new("collect_eggs", "Collect eggs from the coop", 6.0)
                        .optional(),
                ],
                vec![AnomalyEffectSpec::new(
                    EnvironmentalChange,
                    10.0,
                    0.3,
                    ReduceSpeed,
                )],
            ),
            entry(
                ZoneId::Firefighting,
                VehicleKind::FireTruck,
                "Five Alarm",
                vec![
                    ObjectiveConfig::new("reach_fire", "Drive to the burning barn", 1.0),
                    ObjectiveConfig::new("extinguish", "Put out the fires", 3.0),
                    ObjectiveConfig::new("rescue_cat", "Rescue the cat", 1.0).optional(),
                ],
                vec![
                    AnomalyEffectSpec::new(EquipmentFailure, 2.0, 1.0, DisableControls),
                    AnomalyEffectSpec::new(EnvironmentalChange, 6.0, 0.6, VehicleEffect::None),
                ],
            ),
            entry(
                ZoneId::Mining,
                VehicleKind::HaulTruck,
                "Deep Haul",
                vec![
                    ObjectiveConfig::new("haul_ore", "Haul ore up from the pit", 3.0),
                    ObjectiveConfig::new("dump_ore", "Dump ore at the crusher", 3.0),
                ],
                vec![AnomalyEffectSpec::new(
                    EquipmentFailure,
                    6.0,
                    0.5,
                    ReduceSpeed,
                )],
            ),
            entry(
                ZoneId::Harbor,
                VehicleKind::Tugboat,
                "High Tide",
                vec![
                    ObjectiveConfig::new("dock_barge", "Guide the barge to berth two", 1.0),
                    ObjectiveConfig::new("moor_lines", "Secure the mooring lines", 2.0),
                ],
                vec![
                    AnomalyEffectSpec::new(EnvironmentalChange, 0.0, 0.35, ReduceSpeed),
                    AnomalyEffectSpec::new(UnexpectedEvent, 4.0, 0.8, DisableControls),
                ],
            ),
        ];

        Self {
            hub_scene: Self::default_hub_scene(),
            graduation_scene: Self::default_graduation_scene(),
            main_menu_scene: Self::default_main_menu_scene(),
            zones,
        }
    }
}

fn validate_mission(zone: ZoneId, mission: &MissionConfig) -> Result<(), ConfigError> {
    if mission.objectives.is_empty() {
        return Err(ConfigError::NoObjectives { zone });
    }
    let mut ids = BTreeSet::new();
    for objective in &mission.objectives {
        if objective.id.trim().is_empty() {
            return Err(ConfigError::EmptyObjectiveId { zone });
        }
        if !ids.insert(objective.id.as_str()) {
            return Err(ConfigError::DuplicateObjective {
                zone,
                id: objective.id.clone(),
            });
        }
        if !(objective.required_progress.is_finite() && objective.required_progress > 0.0) {
            return Err(ConfigError::RequiredProgress {
                zone,
                id: objective.id.clone(),
                value: objective.required_progress,
            });
        }
    }
    Ok(())
}

fn validate_anomalies(zone: ZoneId, anomalies: &[AnomalyEffectSpec]) -> Result<(), ConfigError> {
    let mut kinds = BTreeSet::new();
    for spec in anomalies {
        if !(0.0..=1.0).contains(&spec.intensity) {
            return Err(ConfigError::RangeViolation {
                zone,
                field: "intensity",
                min: 0.0,
                max: 1.0,
                value: spec.intensity,
            });
        }
        if !(spec.duration_seconds.is_finite() && spec.duration_seconds >= 0.0) {
            return Err(ConfigError::RangeViolation {
                zone,
                field: "duration_seconds",
                min: 0.0,
                max: f32::MAX,
                value: spec.duration_seconds,
            });
        }
        if !kinds.insert(spec.kind) {
            log::warn!(
                "zone {zone} configures {:?} more than once; only the first is used",
                spec.kind
            );
        }
    }
    Ok(())
}
