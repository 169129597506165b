use anyhow::{Context, Result, bail, ensure};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use drillyard_game::{
    AnomalyKind, CampaignConfig, Controllable, DisplayCall, DriveInput, GameState, KeyValueStore,
    MissionController, MissionState, ObjectiveChange, ProgressionEvent, RecordingDisplay,
    ScriptedSceneLoader, TrainingApp, ZoneId,
};

/// Fraction of a scene load completed per simulated frame.
pub const LOAD_STEP: f32 = 0.3;
/// Simulated frame length in seconds.
pub const FRAME_SECONDS: f32 = 0.25;
const MAX_SETTLE_TICKS: usize = 64;
const MAX_MISSION_STEPS: usize = 256;

/// Counters collected while a scenario drives the app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub ticks: usize,
    pub missions_succeeded: usize,
    pub missions_failed: usize,
    pub badges_earned: usize,
    pub anomalies_applied: usize,
    pub load_faults: usize,
    pub final_state: Option<GameState>,
}

/// Headless rig around a [`TrainingApp`] with a recording display and a
/// scripted scene loader.
pub struct Harness {
    app: TrainingApp,
    display: Rc<RecordingDisplay>,
    loader: ScriptedSceneLoader,
    events: Rc<RefCell<Vec<ProgressionEvent>>>,
    anomaly_chance: f64,
    summary: ScenarioSummary,
}

impl Harness {
    pub fn new(config: &CampaignConfig, store: Box<dyn KeyValueStore>) -> Result<Self> {
        let display = Rc::new(RecordingDisplay::new());
        let loader = ScriptedSceneLoader::new(LOAD_STEP);
        let app = TrainingApp::new(
            config.clone(),
            store,
            Box::new(loader.clone()),
            display.clone(),
        )
        .context("failed to build training app")?;
        let events = Rc::new(RefCell::new(Vec::new()));
        {
            let events = Rc::clone(&events);
            app.progression_mut()
                .subscribe(move |event| events.borrow_mut().push(event.clone()));
        }
        Ok(Self {
            app,
            display,
            loader,
            events,
            anomaly_chance: 0.0,
            summary: ScenarioSummary::default(),
        })
    }

    /// Probability of triggering an anomaly on each mission step.
    #[must_use]
    pub fn with_anomaly_chance(mut self, chance: f64) -> Self {
        self.anomaly_chance = chance;
        self
    }

    pub const fn app(&self) -> &TrainingApp {
        &self.app
    }

    pub const fn app_mut(&mut self) -> &mut TrainingApp {
        &mut self.app
    }

    pub fn display(&self) -> &RecordingDisplay {
        &self.display
    }

    pub const fn loader(&self) -> &ScriptedSceneLoader {
        &self.loader
    }

    pub fn events(&self) -> Vec<ProgressionEvent> {
        self.events.borrow().clone()
    }

    pub fn count_events(&self, predicate: impl Fn(&ProgressionEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }

    pub fn tick(&mut self) {
        self.app.tick(FRAME_SECONDS);
        self.summary.ticks += 1;
    }

    /// Tick until no scene load is pending.
    pub fn settle(&mut self) -> Result<GameState> {
        for _ in 0..MAX_SETTLE_TICKS {
            if !self.app.progression().is_loading() {
                return Ok(self.app.state());
            }
            self.tick();
        }
        bail!(
            "scene load did not settle within {MAX_SETTLE_TICKS} frames (state {:?})",
            self.app.state()
        )
    }

    pub fn new_game(&mut self) -> Result<()> {
        ensure!(self.app.start_new_game(), "new game load was refused");
        let state = self.settle()?;
        ensure!(state == GameState::Hub, "new game landed in {state:?}");
        ensure!(
            self.app.progression().earned_count() == 0,
            "new game kept earned badges"
        );
        Ok(())
    }

    pub fn continue_game(&mut self) -> Result<()> {
        ensure!(self.app.continue_game(), "hub load was refused");
        let state = self.settle()?;
        ensure!(state == GameState::Hub, "continue landed in {state:?}");
        Ok(())
    }

    /// Enter `zone` from the hub and play its mission to the requested
    /// outcome, then return to the hub.
    pub fn train<R: Rng>(
        &mut self,
        zone: ZoneId,
        rng: &mut R,
        succeed: bool,
    ) -> Result<MissionState> {
        ensure!(
            self.app.state() == GameState::Hub,
            "training {zone} requires the hub, found {:?}",
            self.app.state()
        );
        let had_badge = self.app.progression().is_badge_earned(zone);
        ensure!(self.app.enter_zone(zone), "entrance to {zone} refused");
        let state = self.settle()?;
        ensure!(state == GameState::InTraining, "{zone} load ended in {state:?}");
        ensure!(
            self.app.active_zone() == Some(zone),
            "{zone} content was not spawned"
        );
        let vehicle = self.app.vehicle();

        let outcome = if succeed {
            self.play_to_success(zone, rng)?
        } else {
            self.play_to_failure(zone)?
        };

        ensure!(
            self.app.update_objective("anything", 1.0) == ObjectiveChange::Inactive,
            "terminal mission in {zone} still accepted progress"
        );
        let state = self.settle()?;
        ensure!(state == GameState::Hub, "{zone} mission returned to {state:?}");
        ensure!(self.app.mission().is_none(), "{zone} mission outlived its scene");
        if let Some(vehicle) = vehicle {
            let vehicle = vehicle.borrow();
            ensure!(
                (vehicle.speed_multiplier() - 1.0).abs() <= f32::EPSILON
                    && vehicle.control_enabled(),
                "{zone} vehicle kept anomaly residue after teardown"
            );
        }

        let has_badge = self.app.progression().is_badge_earned(zone);
        match outcome {
            MissionState::Succeeded => {
                ensure!(has_badge, "{zone} success did not earn its badge");
                self.summary.missions_succeeded += 1;
            }
            MissionState::Failed => {
                ensure!(has_badge == had_badge, "{zone} failure changed its badge");
                self.summary.missions_failed += 1;
            }
            other => bail!("{zone} mission stopped in {other:?}"),
        }
        let board = self.display.last_badge_board();
        ensure!(
            board == Some(self.app.progression().badges().board()),
            "hub badge board is stale after {zone}"
        );
        Ok(outcome)
    }

    fn mission_state(&self) -> Result<MissionState> {
        self.app
            .mission()
            .map(MissionController::state)
            .context("no mission is loaded")
    }

    fn play_to_success<R: Rng>(&mut self, zone: ZoneId, rng: &mut R) -> Result<MissionState> {
        let mission = self.app.mission().context("no mission spawned")?;
        ensure!(
            mission.state() == MissionState::InProgress,
            "{zone} mission did not start"
        );
        let mut open: Vec<_> = mission
            .snapshot()
            .into_iter()
            .filter(|objective| !objective.optional || rng.gen_bool(0.5))
            .collect();
        let anomaly_kinds: Vec<AnomalyKind> = self
            .app
            .config()
            .zone(zone)
            .map(|cfg| cfg.anomalies.iter().map(|spec| spec.kind).collect())
            .unwrap_or_default();

        for _ in 0..MAX_MISSION_STEPS {
            if self.mission_state()?.is_terminal() {
                return self.mission_state();
            }
            ensure!(!open.is_empty(), "{zone} ran out of objectives while in progress");
            let index = rng.gen_range(0..open.len());
            let objective = &open[index];
            let current = self
                .app
                .mission()
                .and_then(|mission| mission.objectives().get(&objective.id))
                .map_or(0.0, |live| live.current_progress());

            let change = if rng.gen_bool(0.1) {
                self.app.complete_objective(&objective.id)
            } else {
                let step = objective.required_progress * rng.gen_range(0.25_f32..=0.75);
                self.app.update_objective(&objective.id, current + step)
            };
            match change {
                ObjectiveChange::Completed => {
                    open.swap_remove(index);
                }
                ObjectiveChange::Progressed => {}
                other => bail!("unexpected {other:?} for objective '{}'", objective.id),
            }

            if !anomaly_kinds.is_empty() && rng.gen_bool(self.anomaly_chance) {
                let kind = anomaly_kinds[rng.gen_range(0..anomaly_kinds.len())];
                self.inject_anomaly(kind)?;
            }
            self.app.drive(DriveInput {
                throttle: rng.gen_range(-1.0..=1.0),
                steer: rng.gen_range(-1.0..=1.0),
                brake: rng.gen_bool(0.1),
            });
            self.tick();
        }
        bail!("{zone} mission did not finish within {MAX_MISSION_STEPS} steps")
    }

    fn play_to_failure(&mut self, zone: ZoneId) -> Result<MissionState> {
        let first_required = self
            .app
            .mission()
            .context("no mission spawned")?
            .snapshot()
            .into_iter()
            .find(|objective| !objective.optional)
            .context("mission has no required objective")?;
        let change = self
            .app
            .update_objective(&first_required.id, first_required.required_progress * 0.5);
        ensure!(
            change == ObjectiveChange::Progressed,
            "partial progress in {zone} gave {change:?}"
        );
        self.tick();
        ensure!(self.app.fail_mission(), "{zone} mission refused to fail");
        ensure!(!self.app.fail_mission(), "{zone} mission failed twice");
        self.mission_state()
    }

    /// Trigger `kind` in the loaded zone and check that effects never stack.
    pub fn inject_anomaly(&mut self, kind: AnomalyKind) -> Result<bool> {
        let applied = self.app.trigger_anomaly(kind);
        if applied {
            self.summary.anomalies_applied += 1;
        }
        let anomalies = self
            .app
            .anomalies()
            .context("anomaly triggered without a controller")?;
        ensure!(
            anomalies.active_count() <= 1,
            "{} effects stacked on a single vehicle",
            anomalies.active_count()
        );
        if let Some(vehicle) = self.app.vehicle() {
            let multiplier = vehicle.borrow().speed_multiplier();
            ensure!(
                (0.0..=1.0).contains(&multiplier),
                "vehicle multiplier {multiplier} out of range"
            );
        }
        Ok(applied)
    }

    /// Whether the display ever showed the end screen with `count` badges.
    pub fn end_screen_shown(&self, count: usize) -> bool {
        self.display.calls().contains(&DisplayCall::EndScreen(count))
    }

    pub fn finish(mut self) -> ScenarioSummary {
        self.summary.badges_earned = self.app.progression().earned_count();
        self.summary.load_faults =
            self.count_events(|event| matches!(event, ProgressionEvent::LoadFailed { .. }));
        self.summary.final_state = Some(self.app.state());
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillyard_game::MemoryStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn harness_trains_a_zone_both_ways() {
        let mut harness = Harness::new(
            &CampaignConfig::default_config(),
            Box::new(MemoryStore::new()),
        )
        .unwrap()
        .with_anomaly_chance(0.5);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        harness.new_game().unwrap();
        assert_eq!(
            harness.train(ZoneId::Harbor, &mut rng, false).unwrap(),
            MissionState::Failed
        );
        assert_eq!(
            harness.train(ZoneId::Harbor, &mut rng, true).unwrap(),
            MissionState::Succeeded
        );
        let summary = harness.finish();
        assert_eq!(summary.badges_earned, 1);
        assert_eq!(summary.missions_failed, 1);
        assert_eq!(summary.final_state, Some(GameState::Hub));
    }
}
