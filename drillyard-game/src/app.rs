//! Application root wiring the progression controller to per-zone content.
//!
//! `TrainingApp` owns the only progression controller. When a zone scene
//! activates it spawns the zone's vehicle, mission and anomaly controllers;
//! when that scene goes away they are torn down and every anomaly effect is
//! reverted.
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use anyhow::Context;

use crate::anomaly::{AnomalyController, AnomalyKind};
use crate::badges::BadgeStore;
use crate::config::{CampaignConfig, ConfigError};
use crate::display::DisplaySink;
use crate::mission::{MissionController, ProgressionSink};
use crate::objectives::ObjectiveChange;
use crate::progression::{GameState, ProgressionController};
use crate::scene::SceneLoader;
use crate::scheduler::seconds;
use crate::storage::KeyValueStore;
use crate::triggers::{GraduationGate, ZoneEntrance};
use crate::vehicle::{Controllable, ControllableRoster, DriveInput, SharedControllable, Vehicle};
use crate::zone::ZoneId;
use crate::DataLoader;

/// Content instantiated for the zone currently being trained.
struct ZoneRuntime {
    zone: ZoneId,
    mission: MissionController,
    anomalies: Option<AnomalyController>,
    vehicle: Option<Rc<RefCell<Vehicle>>>,
}

pub struct TrainingApp {
    config: CampaignConfig,
    progression: Rc<RefCell<ProgressionController>>,
    display: Rc<dyn DisplaySink>,
    roster: ControllableRoster,
    runtime: Option<ZoneRuntime>,
}

impl std::fmt::Debug for TrainingApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingApp")
            .field("progression", &self.progression)
            .field("zone", &self.runtime.as_ref().map(|runtime| runtime.zone))
            .finish_non_exhaustive()
    }
}

impl TrainingApp {
    /// Build the app at the main menu.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` fails validation.
    pub fn new(
        config: CampaignConfig,
        store: Box<dyn KeyValueStore>,
        loader: Box<dyn SceneLoader>,
        display: Rc<dyn DisplaySink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let progression =
            ProgressionController::from_config(&config, BadgeStore::load(store), loader)
                .with_display(Rc::clone(&display));
        progression.refresh_display();
        Ok(Self {
            config,
            progression: Rc::new(RefCell::new(progression)),
            display,
            roster: ControllableRoster::new(),
            runtime: None,
        })
    }

    /// Build the app from a campaign supplied by `data_loader`.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign cannot be loaded or is invalid.
    pub fn from_loader<L: DataLoader>(
        data_loader: &L,
        store: Box<dyn KeyValueStore>,
        loader: Box<dyn SceneLoader>,
        display: Rc<dyn DisplaySink>,
    ) -> anyhow::Result<Self> {
        let config = data_loader
            .load_campaign()
            .context("failed to load campaign config")?;
        Self::new(config, store, loader, display).context("campaign config is invalid")
    }

    #[must_use]
    pub const fn config(&self) -> &CampaignConfig {
        &self.config
    }

    #[must_use]
    pub fn progression(&self) -> Ref<'_, ProgressionController> {
        self.progression.borrow()
    }

    /// Mutable access for engine glue (listener registration and the like).
    /// Call [`Self::sync`] after driving loads through this handle.
    #[must_use]
    pub fn progression_mut(&self) -> RefMut<'_, ProgressionController> {
        self.progression.borrow_mut()
    }

    #[must_use]
    pub fn state(&self) -> GameState {
        self.progression.borrow().state()
    }

    #[must_use]
    pub const fn roster(&self) -> &ControllableRoster {
        &self.roster
    }

    /// Zone whose content is currently instantiated.
    #[must_use]
    pub fn active_zone(&self) -> Option<ZoneId> {
        self.runtime.as_ref().map(|runtime| runtime.zone)
    }

    #[must_use]
    pub fn mission(&self) -> Option<&MissionController> {
        self.runtime.as_ref().map(|runtime| &runtime.mission)
    }

    #[must_use]
    pub fn anomalies(&self) -> Option<&AnomalyController> {
        self.runtime
            .as_ref()
            .and_then(|runtime| runtime.anomalies.as_ref())
    }

    #[must_use]
    pub fn vehicle(&self) -> Option<Rc<RefCell<Vehicle>>> {
        self.runtime
            .as_ref()
            .and_then(|runtime| runtime.vehicle.clone())
    }

    pub fn start_new_game(&mut self) -> bool {
        let started = self.progression.borrow_mut().start_new_game();
        self.sync();
        started
    }

    pub fn continue_game(&mut self) -> bool {
        let started = self.progression.borrow_mut().load_hub();
        self.sync();
        started
    }

    /// Walk through the hub entrance for `zone`.
    pub fn enter_zone(&mut self, zone: ZoneId) -> bool {
        let mut entrance = ZoneEntrance::new(zone);
        entrance.player_entered();
        let started = entrance.interact(&mut self.progression.borrow_mut());
        self.sync();
        started
    }

    /// Walk through the graduation gate.
    pub fn try_graduate(&mut self) -> bool {
        let mut gate = GraduationGate::new();
        gate.player_entered();
        let started = gate.interact(&mut self.progression.borrow_mut());
        self.sync();
        started
    }

    pub fn return_to_menu(&mut self) -> bool {
        let started = self.progression.borrow_mut().load_main_menu();
        self.sync();
        started
    }

    /// Advance one frame: poll scene loading, fire due anomaly reversions and
    /// integrate the driven vehicle.
    pub fn tick(&mut self, dt_seconds: f32) {
        let entered = self.progression.borrow_mut().tick();
        if let Some(state) = entered {
            self.scene_activated(state);
        } else {
            self.sync();
        }
        if let Some(runtime) = &mut self.runtime {
            if let Some(anomalies) = &mut runtime.anomalies {
                anomalies.tick(seconds(dt_seconds));
            }
            if let Some(vehicle) = &runtime.vehicle {
                vehicle.borrow_mut().apply_physics(dt_seconds);
            }
        }
    }

    /// Feed player input to the driven vehicle.
    pub fn drive(&mut self, input: DriveInput) {
        if let Some(vehicle) = self.vehicle() {
            vehicle.borrow_mut().handle_input(input);
        }
    }

    pub fn update_objective(&mut self, id: &str, value: f32) -> ObjectiveChange {
        let change = match &mut self.runtime {
            Some(runtime) => runtime.mission.update_progress(id, value),
            None => {
                log::warn!("objective '{id}' updated with no mission loaded");
                ObjectiveChange::Inactive
            }
        };
        self.sync();
        change
    }

    pub fn complete_objective(&mut self, id: &str) -> ObjectiveChange {
        let change = match &mut self.runtime {
            Some(runtime) => runtime.mission.mark_complete(id),
            None => {
                log::warn!("objective '{id}' completed with no mission loaded");
                ObjectiveChange::Inactive
            }
        };
        self.sync();
        change
    }

    pub fn fail_mission(&mut self) -> bool {
        let failed = self
            .runtime
            .as_mut()
            .is_some_and(|runtime| runtime.mission.fail());
        self.sync();
        failed
    }

    pub fn trigger_anomaly(&mut self, kind: AnomalyKind) -> bool {
        match self
            .runtime
            .as_mut()
            .and_then(|runtime| runtime.anomalies.as_mut())
        {
            Some(anomalies) => anomalies.activate(kind),
            None => {
                log::warn!("anomaly {kind:?} triggered with no anomaly controller loaded");
                false
            }
        }
    }

    /// Drop zone content when the controller left training without a new
    /// scene activating (a load fault fallback).
    pub fn sync(&mut self) {
        let state = self.progression.borrow().state();
        if self.runtime.is_some() && matches!(state, GameState::Hub | GameState::MainMenu) {
            self.teardown_zone();
        }
    }

    fn scene_activated(&mut self, state: GameState) {
        self.teardown_zone();
        if state != GameState::InTraining {
            return;
        }
        let Some(zone) = self.progression.borrow().current_zone() else {
            log::error!("training scene activated without a zone");
            return;
        };
        self.spawn_zone(zone);
    }

    fn spawn_zone(&mut self, zone: ZoneId) {
        let Some(zone_config) = self.config.zone(zone).cloned() else {
            log::error!("zone {zone} activated but has no configuration");
            return;
        };

        let vehicle = zone_config.vehicle.map(|kind| {
            let mut vehicle = Vehicle::new(kind);
            vehicle.set_active(true);
            let vehicle = vehicle.into_shared();
            self.roster.register(vehicle.clone());
            vehicle
        });

        let sink: Rc<dyn ProgressionSink> = self.progression.clone();
        let mut mission = MissionController::new(zone, &zone_config.mission)
            .with_progression(sink)
            .with_display(Rc::clone(&self.display));
        mission.start();

        let anomalies = (!zone_config.anomalies.is_empty())
            .then(|| AnomalyController::new(zone_config.anomalies.clone(), self.roster.clone()));

        log::info!(
            "zone {zone} ready: mission '{}', {} anomaly specs",
            zone_config.mission.title,
            zone_config.anomalies.len()
        );
        self.runtime = Some(ZoneRuntime {
            zone,
            mission,
            anomalies,
            vehicle,
        });
    }

    fn teardown_zone(&mut self) {
        let Some(mut runtime) = self.runtime.take() else {
            return;
        };
        if let Some(anomalies) = &mut runtime.anomalies {
            anomalies.shutdown();
        }
        if let Some(vehicle) = &runtime.vehicle {
            vehicle.borrow_mut().set_active(false);
            let handle: SharedControllable = vehicle.clone();
            self.roster.unregister(&handle);
        }
        log::debug!(
            "zone {} torn down ({:?})",
            runtime.zone,
            runtime.mission.state()
        );
    }
}
