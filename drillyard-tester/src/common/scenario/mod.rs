use anyhow::Result;
use std::path::PathBuf;

use drillyard_game::CampaignConfig;

use crate::logic::driver::ScenarioSummary;

pub mod anomalies;
pub mod campaign;
pub mod faults;

/// Inputs shared by every scenario iteration.
#[derive(Debug, Clone)]
pub struct ScenarioCtx {
    pub seed: u64,
    pub config: CampaignConfig,
    /// Badge save file to use instead of an in-memory store.
    pub save_path: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for ScenarioCtx {
    fn default() -> Self {
        Self {
            seed: 0,
            config: CampaignConfig::default_config(),
            save_path: None,
            verbose: false,
        }
    }
}

impl ScenarioCtx {
    #[must_use]
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }
}

pub type ScenarioFn = fn(&ScenarioCtx) -> Result<ScenarioSummary>;

#[derive(Clone, Copy)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub run: ScenarioFn,
}

pub fn catalog() -> Vec<TestScenario> {
    vec![
        TestScenario {
            key: "smoke",
            name: "Smoke Test",
            description: "New game, one zone, badge lands on the hub board",
            run: campaign::smoke,
        },
        TestScenario {
            key: "full-campaign",
            name: "Full Campaign",
            description: "Every zone in seeded order, then graduation",
            run: campaign::full_campaign,
        },
        TestScenario {
            key: "mission-failure",
            name: "Mission Failure and Retry",
            description: "Failed missions earn nothing; retries still can",
            run: campaign::mission_failure,
        },
        TestScenario {
            key: "persistence",
            name: "Badge Persistence",
            description: "Badges survive a restart through the JSON save file",
            run: campaign::persistence,
        },
        TestScenario {
            key: "anomaly-stress",
            name: "Anomaly Stress",
            description: "Frequent seeded anomalies never stack or leave residue",
            run: anomalies::anomaly_stress,
        },
        TestScenario {
            key: "load-fault",
            name: "Scene Load Faults",
            description: "Broken zone scenes fall back to the hub and recover",
            run: faults::load_fault,
        },
    ]
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = match name.to_lowercase().as_str() {
        "campaign" | "full" => "full-campaign",
        "failure" | "retry" => "mission-failure",
        "save" | "saves" => "persistence",
        "anomaly" | "anomalies" | "stress" => "anomaly-stress",
        "fault" | "faults" => "load-fault",
        other => return catalog().into_iter().find(|scenario| scenario.key == other),
    };
    catalog().into_iter().find(|scenario| scenario.key == key)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_catalog_entries() {
        assert_eq!(get_scenario("SMOKE").map(|s| s.key), Some("smoke"));
        assert_eq!(get_scenario("stress").map(|s| s.key), Some("anomaly-stress"));
        assert!(get_scenario("nope").is_none());
        assert_eq!(list_scenarios().len(), catalog().len());
    }

    #[test]
    fn every_scenario_passes_on_a_fixed_seed() {
        let ctx = ScenarioCtx::default().with_seed(1337);
        for scenario in catalog() {
            if let Err(err) = (scenario.run)(&ctx) {
                panic!("{} failed: {err:#}", scenario.key);
            }
        }
    }
}
