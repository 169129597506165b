//! Mission lifecycle for a single training-zone run.
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::display::DisplaySink;
use crate::objectives::{ObjectiveChange, ObjectiveConfig, ObjectiveSet, ObjectiveSnapshot};
use crate::zone::ZoneId;

/// Receives mission outcomes; implemented by the progression controller.
pub trait ProgressionSink {
    fn mission_completed(&self, zone: ZoneId, success: bool);
}

/// Authored mission definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionConfig {
    pub title: String,
    #[serde(default)]
    pub objectives: Vec<ObjectiveConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionState {
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
}

impl MissionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Final result reported upward when a mission ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissionOutcome {
    pub zone: ZoneId,
    pub success: bool,
}

/// Drives one mission run: start, progress, and a single terminal report.
pub struct MissionController {
    zone: ZoneId,
    title: String,
    objectives: ObjectiveSet,
    state: MissionState,
    progression: Option<Rc<dyn ProgressionSink>>,
    display: Option<Rc<dyn DisplaySink>>,
    outcome: Option<MissionOutcome>,
}

impl std::fmt::Debug for MissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionController")
            .field("zone", &self.zone)
            .field("title", &self.title)
            .field("state", &self.state)
            .field("objectives", &self.objectives)
            .field("has_progression", &self.progression.is_some())
            .field("has_display", &self.display.is_some())
            .finish()
    }
}

impl MissionController {
    #[must_use]
    pub fn new(zone: ZoneId, config: &MissionConfig) -> Self {
        Self {
            zone,
            title: config.title.clone(),
            objectives: ObjectiveSet::new(&config.objectives),
            state: MissionState::NotStarted,
            progression: None,
            display: None,
            outcome: None,
        }
    }

    #[must_use]
    pub fn with_progression(mut self, sink: Rc<dyn ProgressionSink>) -> Self {
        self.progression = Some(sink);
        self
    }

    #[must_use]
    pub fn with_display(mut self, display: Rc<dyn DisplaySink>) -> Self {
        self.display = Some(display);
        self
    }

    #[must_use]
    pub const fn zone(&self) -> ZoneId {
        self.zone
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn state(&self) -> MissionState {
        self.state
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<MissionOutcome> {
        self.outcome
    }

    #[must_use]
    pub const fn objectives(&self) -> &ObjectiveSet {
        &self.objectives
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ObjectiveSnapshot> {
        self.objectives.snapshot()
    }

    /// Begin the mission. Returns false (and stays `NotStarted`) when the
    /// mission was already started, has no objectives, or is missing a
    /// collaborator.
    pub fn start(&mut self) -> bool {
        if self.state != MissionState::NotStarted {
            log::warn!(
                "mission '{}' start ignored: already {:?}",
                self.title,
                self.state
            );
            return false;
        }
        if self.objectives.is_empty() {
            log::error!("mission '{}' has no objectives configured", self.title);
            return false;
        }
        let Some(display) = self.display.clone() else {
            log::error!("mission '{}' cannot start without a display", self.title);
            return false;
        };
        if self.progression.is_none() {
            log::error!(
                "mission '{}' cannot start without a progression sink",
                self.title
            );
            return false;
        }

        self.state = MissionState::InProgress;
        self.objectives.reset();
        display.show_mission_title(&self.title);
        display.show_objectives(&self.objectives.snapshot());
        log::info!("mission '{}' started in {}", self.title, self.zone);
        true
    }

    /// Record progress on an objective; completes the mission automatically
    /// once every required objective is done.
    pub fn update_progress(&mut self, id: &str, value: f32) -> ObjectiveChange {
        if self.state != MissionState::InProgress {
            log::warn!(
                "progress for '{id}' ignored: mission '{}' is {:?}",
                self.title,
                self.state
            );
            return ObjectiveChange::Inactive;
        }
        let change = self.objectives.update_progress(id, value);
        self.after_change(change);
        change
    }

    /// Force an objective to complete; same completion check as progress.
    pub fn mark_complete(&mut self, id: &str) -> ObjectiveChange {
        if self.state != MissionState::InProgress {
            log::warn!(
                "completion of '{id}' ignored: mission '{}' is {:?}",
                self.title,
                self.state
            );
            return ObjectiveChange::Inactive;
        }
        let change = self.objectives.mark_complete(id);
        self.after_change(change);
        change
    }

    fn after_change(&mut self, change: ObjectiveChange) {
        if change.is_mutation() {
            log::debug!(
                "mission '{}' at {:.0}% of required objectives",
                self.title,
                self.objectives.progress_fraction() * 100.0
            );
            if let Some(display) = &self.display {
                display.show_objectives(&self.objectives.snapshot());
            }
        }
        if change.is_completion() && self.objectives.all_required_complete() {
            self.complete();
        }
    }

    /// Finish the mission successfully if every required objective is done.
    pub fn complete(&mut self) -> bool {
        if self.state != MissionState::InProgress {
            log::warn!(
                "complete ignored: mission '{}' is {:?}",
                self.title,
                self.state
            );
            return false;
        }
        if !self.objectives.all_required_complete() {
            log::warn!(
                "complete ignored: mission '{}' still has required objectives open",
                self.title
            );
            return false;
        }
        self.finish(true);
        true
    }

    /// Fail the mission. Tolerated before start; ignored once terminal.
    pub fn fail(&mut self) -> bool {
        match self.state {
            MissionState::Succeeded | MissionState::Failed => {
                log::debug!("fail ignored: mission '{}' already ended", self.title);
                return false;
            }
            MissionState::NotStarted => {
                log::warn!("mission '{}' failed before it started", self.title);
            }
            MissionState::InProgress => {}
        }
        self.finish(false);
        true
    }

    fn finish(&mut self, success: bool) {
        self.state = if success {
            MissionState::Succeeded
        } else {
            MissionState::Failed
        };
        let outcome = MissionOutcome {
            zone: self.zone,
            success,
        };
        self.outcome = Some(outcome);
        log::info!(
            "mission '{}' ended: {}",
            self.title,
            if success { "succeeded" } else { "failed" }
        );
        match &self.progression {
            Some(sink) => sink.mission_completed(outcome.zone, outcome.success),
            None => log::warn!(
                "mission '{}' has no progression sink; outcome not reported",
                self.title
            ),
        }
    }
}
