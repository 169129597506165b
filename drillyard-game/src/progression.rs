//! Top-level game flow: menu, hub, zone loading, training and graduation.
//!
//! The controller owns the badge record and the pending scene load. Loads
//! never block; [`ProgressionController::tick`] polls the in-flight load once
//! per frame and commits the state change after the scene has activated.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::badges::BadgeStore;
use crate::config::CampaignConfig;
use crate::constants::{GRADUATION_SCENE, HUB_SCENE, MAIN_MENU_SCENE, SCENE_ACTIVATION_THRESHOLD};
use crate::display::{DisplaySink, PanelKind};
use crate::events::{ListenerId, Listeners};
use crate::mission::ProgressionSink;
use crate::scene::{SceneError, SceneLoadOp, SceneLoader};
use crate::zone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    MainMenu,
    Hub,
    Loading,
    InTraining,
    Graduation,
}

impl GameState {
    #[must_use]
    pub const fn panel(self) -> PanelKind {
        match self {
            Self::MainMenu => PanelKind::MainMenu,
            Self::Hub => PanelKind::Hub,
            Self::Loading => PanelKind::Loading,
            Self::InTraining => PanelKind::MissionHud,
            Self::Graduation => PanelKind::Graduation,
        }
    }
}

/// Notification emitted by [`ProgressionController`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressionEvent {
    StateChanged { from: GameState, to: GameState },
    BadgeEarned(ZoneId),
    GraduationEligible,
    LoadFailed { scene: String },
}

struct PendingLoad {
    op: Box<dyn SceneLoadOp>,
    target: GameState,
    zone: Option<ZoneId>,
    activation_allowed: bool,
}

pub struct ProgressionController {
    state: GameState,
    badges: BadgeStore,
    zone_scenes: BTreeMap<ZoneId, String>,
    hub_scene: String,
    graduation_scene: String,
    main_menu_scene: String,
    loader: Box<dyn SceneLoader>,
    display: Option<Rc<dyn DisplaySink>>,
    listeners: Listeners<ProgressionEvent>,
    pending: Option<PendingLoad>,
    current_zone: Option<ZoneId>,
    active_scene: Option<String>,
}

impl std::fmt::Debug for ProgressionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionController")
            .field("state", &self.state)
            .field("badges", &self.badges)
            .field("zone_scenes", &self.zone_scenes)
            .field("loading", &self.pending.as_ref().map(|load| load.op.scene()))
            .field("current_zone", &self.current_zone)
            .field("active_scene", &self.active_scene)
            .finish_non_exhaustive()
    }
}

impl ProgressionController {
    /// Controller starting at the main menu with the fixed scene names.
    #[must_use]
    pub fn new(
        badges: BadgeStore,
        zone_scenes: BTreeMap<ZoneId, String>,
        loader: Box<dyn SceneLoader>,
    ) -> Self {
        Self {
            state: GameState::MainMenu,
            badges,
            zone_scenes,
            hub_scene: HUB_SCENE.to_string(),
            graduation_scene: GRADUATION_SCENE.to_string(),
            main_menu_scene: MAIN_MENU_SCENE.to_string(),
            loader,
            display: None,
            listeners: Listeners::new(),
            pending: None,
            current_zone: None,
            active_scene: None,
        }
    }

    /// Controller using the scene names from a campaign config.
    #[must_use]
    pub fn from_config(
        config: &CampaignConfig,
        badges: BadgeStore,
        loader: Box<dyn SceneLoader>,
    ) -> Self {
        let mut controller = Self::new(badges, config.scene_table(), loader);
        controller.hub_scene.clone_from(&config.hub_scene);
        controller
            .graduation_scene
            .clone_from(&config.graduation_scene);
        controller.main_menu_scene.clone_from(&config.main_menu_scene);
        controller
    }

    #[must_use]
    pub fn with_display(mut self, display: Rc<dyn DisplaySink>) -> Self {
        self.display = Some(display);
        self
    }

    #[must_use]
    pub const fn state(&self) -> GameState {
        self.state
    }

    /// Zone whose scene is active while training.
    #[must_use]
    pub const fn current_zone(&self) -> Option<ZoneId> {
        self.current_zone
    }

    /// Name of the last scene that fully activated.
    #[must_use]
    pub fn active_scene(&self) -> Option<&str> {
        self.active_scene.as_deref()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub const fn badges(&self) -> &BadgeStore {
        &self.badges
    }

    #[must_use]
    pub const fn is_badge_earned(&self, zone: ZoneId) -> bool {
        self.badges.is_earned(zone)
    }

    #[must_use]
    pub fn earned_count(&self) -> usize {
        self.badges.earned_count()
    }

    #[must_use]
    pub fn is_graduation_eligible(&self) -> bool {
        self.badges.all_earned()
    }

    #[must_use]
    pub fn scene_for(&self, zone: ZoneId) -> Option<&str> {
        self.zone_scenes.get(&zone).map(String::as_str)
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&ProgressionEvent) + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Move to `new_state`, show its panel and notify listeners. Re-entering
    /// the current state does nothing.
    pub fn set_state(&mut self, new_state: GameState) {
        if new_state == self.state {
            return;
        }
        let from = self.state;
        self.state = new_state;
        log::info!("game state {from:?} -> {new_state:?}");
        if !matches!(new_state, GameState::InTraining | GameState::Loading) {
            self.current_zone = None;
        }
        self.refresh_display();
        self.listeners.emit(&ProgressionEvent::StateChanged {
            from,
            to: new_state,
        });
    }

    /// Push the current state's panel and its content to the display.
    pub fn refresh_display(&self) {
        let Some(display) = &self.display else {
            return;
        };
        display.show_panel(self.state.panel());
        match self.state {
            GameState::Hub => display.show_badge_board(self.badges.board()),
            GameState::Graduation => display.show_end_screen(self.badges.earned_count()),
            GameState::MainMenu | GameState::Loading | GameState::InTraining => {}
        }
    }

    /// Begin loading the scene mapped to `zone`. Returns false when the zone
    /// has no scene or another load is still running.
    pub fn load_zone(&mut self, zone: ZoneId) -> bool {
        let Some(scene) = self.zone_scenes.get(&zone).cloned() else {
            log::error!("no scene mapped for zone {zone}; staying in {:?}", self.state);
            return false;
        };
        self.begin_load(scene, GameState::InTraining, Some(zone))
    }

    pub fn load_hub(&mut self) -> bool {
        self.begin_load(self.hub_scene.clone(), GameState::Hub, None)
    }

    pub fn load_graduation(&mut self) -> bool {
        self.begin_load(self.graduation_scene.clone(), GameState::Graduation, None)
    }

    pub fn load_main_menu(&mut self) -> bool {
        self.begin_load(self.main_menu_scene.clone(), GameState::MainMenu, None)
    }

    /// Main-menu "new game": wipe the badge record, then head to the hub.
    pub fn start_new_game(&mut self) -> bool {
        self.reset_progress();
        self.load_hub()
    }

    fn begin_load(&mut self, scene: String, target: GameState, zone: Option<ZoneId>) -> bool {
        if let Some(pending) = &self.pending {
            log::warn!(
                "ignoring load of '{scene}' while '{}' is still loading",
                pending.op.scene()
            );
            return false;
        }
        self.set_state(GameState::Loading);
        if let Some(display) = &self.display {
            display.set_loading_visible(true);
        }
        match self.loader.load_scene_async(&scene) {
            Ok(op) => {
                log::debug!("loading scene '{scene}' for {target:?}");
                if zone.is_some() {
                    self.current_zone = zone;
                }
                self.pending = Some(PendingLoad {
                    op,
                    target,
                    zone,
                    activation_allowed: false,
                });
                true
            }
            Err(err) => {
                self.load_faulted(&scene, &err);
                false
            }
        }
    }

    /// Poll the in-flight load. Returns the state entered when a load
    /// completed during this tick.
    pub fn tick(&mut self) -> Option<GameState> {
        let pending = self.pending.as_mut()?;
        match pending.op.poll() {
            Ok(progress) => {
                if !pending.activation_allowed && progress >= SCENE_ACTIVATION_THRESHOLD {
                    log::debug!("scene '{}' ready; allowing activation", pending.op.scene());
                    pending.op.allow_activation();
                    pending.activation_allowed = true;
                }
                if !pending.op.is_active() {
                    return None;
                }
                let done = self.pending.take()?;
                self.active_scene = Some(done.op.scene().to_string());
                self.set_state(done.target);
                self.current_zone = done.zone;
                if let Some(display) = &self.display {
                    display.set_loading_visible(false);
                }
                Some(done.target)
            }
            Err(err) => {
                let scene = pending.op.scene().to_string();
                self.pending = None;
                self.load_faulted(&scene, &err);
                None
            }
        }
    }

    fn load_faulted(&mut self, scene: &str, err: &SceneError) {
        log::error!("scene load failed: {err}; falling back to the hub");
        self.set_state(GameState::Hub);
        if let Some(display) = &self.display {
            display.set_loading_visible(false);
        }
        self.listeners.emit(&ProgressionEvent::LoadFailed {
            scene: scene.to_string(),
        });
    }

    /// Record a finished mission: a success earns the zone badge, and the
    /// player always returns to the hub.
    pub fn mission_completed(&mut self, zone: ZoneId, success: bool) {
        log::info!(
            "mission in {zone} {}",
            if success { "succeeded" } else { "failed" }
        );
        if success {
            self.earn_badge(zone);
        }
        self.load_hub();
    }

    /// Mark `zone`'s badge earned and persist it. Returns false if it was
    /// already earned.
    pub fn earn_badge(&mut self, zone: ZoneId) -> bool {
        if self.badges.is_earned(zone) {
            log::debug!("badge for {zone} already earned");
            return false;
        }
        if let Err(err) = self.badges.set_earned(zone, true) {
            log::error!("failed to persist badge for {zone}: {err}");
        }
        log::info!(
            "badge earned for {zone} ({}/{})",
            self.badges.earned_count(),
            ZoneId::COUNT
        );
        self.listeners.emit(&ProgressionEvent::BadgeEarned(zone));
        if self.state == GameState::Hub
            && let Some(display) = &self.display
        {
            display.show_badge_board(self.badges.board());
        }
        if self.is_graduation_eligible() {
            log::info!("all badges earned; graduation unlocked");
            self.listeners.emit(&ProgressionEvent::GraduationEligible);
        }
        true
    }

    /// Clear every badge and persist the empty record.
    pub fn reset_progress(&mut self) {
        if let Err(err) = self.badges.clear() {
            log::error!("failed to persist cleared badges: {err}");
        }
        log::info!("progress reset");
        if self.state == GameState::Hub
            && let Some(display) = &self.display
        {
            display.show_badge_board(self.badges.board());
        }
    }
}

impl ProgressionSink for RefCell<ProgressionController> {
    fn mission_completed(&self, zone: ZoneId, success: bool) {
        match self.try_borrow_mut() {
            Ok(mut controller) => controller.mission_completed(zone, success),
            Err(_) => log::error!(
                "progression controller busy; dropped mission result for {zone} (success: {success})"
            ),
        }
    }
}
