//! Drillyard Training Core
//!
//! Platform-agnostic game logic for the Drillyard vehicle training grounds:
//! zone missions, badge progression, scene flow and anomaly injection.
//! Rendering, physics integration, input devices and asset loading stay in
//! the engine and reach this crate through narrow traits.

pub mod anomaly;
pub mod app;
pub mod badges;
pub mod config;
pub mod constants;
pub mod display;
pub mod events;
pub mod mission;
pub mod objectives;
pub mod progression;
pub mod scene;
pub mod scheduler;
pub mod storage;
pub mod triggers;
pub mod vehicle;
pub mod zone;

// Re-export commonly used types
pub use anomaly::{
    AnomalyController, AnomalyEffectSpec, AnomalyEvent, AnomalyKind, IgnoreReason, RevertCause,
    VehicleEffect,
};
pub use app::TrainingApp;
pub use badges::BadgeStore;
pub use config::{CampaignConfig, ConfigError, ZoneConfig};
pub use display::{DisplayCall, DisplaySink, PanelKind, RecordingDisplay};
pub use events::{ListenerId, Listeners};
pub use mission::{MissionConfig, MissionController, MissionOutcome, MissionState, ProgressionSink};
pub use objectives::{Objective, ObjectiveChange, ObjectiveConfig, ObjectiveSet, ObjectiveSnapshot};
pub use progression::{GameState, ProgressionController, ProgressionEvent};
pub use scene::{SceneError, SceneLoadOp, SceneLoader, ScriptedSceneLoader};
pub use scheduler::{CancelToken, Scheduled, Scheduler, TaskId};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};
pub use triggers::{GraduationGate, ZoneEntrance};
pub use vehicle::{
    Controllable, ControllableRoster, DriveInput, SharedControllable, Vehicle, VehicleKind,
    VehicleSpec,
};
pub use zone::ZoneId;

/// Trait for abstracting campaign data loading
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the campaign definition from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign cannot be read or parsed.
    fn load_campaign(&self) -> Result<CampaignConfig, Self::Error>;
}

/// Loader serving the built-in campaign.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCampaign;

impl DataLoader for BuiltinCampaign {
    type Error = std::convert::Infallible;

    fn load_campaign(&self) -> Result<CampaignConfig, Self::Error> {
        Ok(CampaignConfig::default_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct BrokenLoader;

    impl DataLoader for BrokenLoader {
        type Error = ConfigError;

        fn load_campaign(&self) -> Result<CampaignConfig, Self::Error> {
            CampaignConfig::from_json("{ not json")
        }
    }

    #[test]
    fn builtin_campaign_builds_an_app() {
        let app = TrainingApp::from_loader(
            &BuiltinCampaign,
            Box::new(MemoryStore::new()),
            Box::new(ScriptedSceneLoader::default()),
            Rc::new(RecordingDisplay::new()),
        )
        .unwrap();
        assert_eq!(app.state(), GameState::MainMenu);
        assert_eq!(app.config().zones.len(), ZoneId::COUNT);
    }

    #[test]
    fn loader_errors_carry_context() {
        let err = TrainingApp::from_loader(
            &BrokenLoader,
            Box::new(MemoryStore::new()),
            Box::new(ScriptedSceneLoader::default()),
            Rc::new(RecordingDisplay::new()),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "failed to load campaign config");
        assert!(err.root_cause().to_string().contains("not valid JSON"));
    }
}
