//! Mission objectives and their progress/completion rules.
use serde::{Deserialize, Serialize};

/// Static objective definition as authored in the campaign config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "ObjectiveConfig::default_required_progress")]
    pub required_progress: f32,
    #[serde(default)]
    pub optional: bool,
}

impl ObjectiveConfig {
    const fn default_required_progress() -> f32 {
        1.0
    }

    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>, required: f32) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            required_progress: required,
            optional: false,
        }
    }

    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Read-only copy of an objective handed to displays and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSnapshot {
    pub id: String,
    pub description: String,
    pub required_progress: f32,
    pub optional: bool,
    pub current_progress: f32,
    pub completed: bool,
}

/// Live objective owned by an [`ObjectiveSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    id: String,
    description: String,
    required_progress: f32,
    optional: bool,
    current_progress: f32,
    completed: bool,
}

impl Objective {
    fn from_config(cfg: &ObjectiveConfig) -> Self {
        Self {
            id: cfg.id.clone(),
            description: cfg.description.clone(),
            required_progress: cfg.required_progress,
            optional: cfg.optional,
            current_progress: 0.0,
            completed: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn required_progress(&self) -> f32 {
        self.required_progress
    }

    #[must_use]
    pub const fn current_progress(&self) -> f32 {
        self.current_progress
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    fn finish(&mut self) {
        self.current_progress = self.required_progress;
        self.completed = true;
    }

    fn snapshot(&self) -> ObjectiveSnapshot {
        ObjectiveSnapshot {
            id: self.id.clone(),
            description: self.description.clone(),
            required_progress: self.required_progress,
            optional: self.optional,
            current_progress: self.current_progress,
            completed: self.completed,
        }
    }
}

/// Result of feeding progress into an objective set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveChange {
    /// The owning mission is not accepting progress.
    Inactive,
    /// No objective with that id exists.
    Unknown,
    /// The objective was already complete; nothing changed.
    AlreadyComplete,
    /// Progress was rejected (non-numeric value).
    Rejected,
    /// Progress was recorded but the objective is still open.
    Progressed,
    /// The objective transitioned to complete.
    Completed,
}

impl ObjectiveChange {
    /// Whether this change is a completion event.
    #[must_use]
    pub const fn is_completion(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the set's contents changed.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Progressed | Self::Completed)
    }
}

/// Ordered collection of objectives for one mission run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectiveSet {
    objectives: Vec<Objective>,
}

impl ObjectiveSet {
    /// Build a set from authored definitions, keeping authoring order.
    ///
    /// Definitions with an empty or duplicate id, or a non-positive required
    /// progress, are skipped with a warning.
    #[must_use]
    pub fn new(configs: &[ObjectiveConfig]) -> Self {
        let mut objectives: Vec<Objective> = Vec::with_capacity(configs.len());
        for cfg in configs {
            if cfg.id.trim().is_empty() {
                log::warn!("skipping objective with empty id ({:?})", cfg.description);
                continue;
            }
            if objectives.iter().any(|existing| existing.id == cfg.id) {
                log::warn!("skipping duplicate objective id '{}'", cfg.id);
                continue;
            }
            if !(cfg.required_progress.is_finite() && cfg.required_progress > 0.0) {
                log::warn!(
                    "skipping objective '{}' with invalid required progress {}",
                    cfg.id,
                    cfg.required_progress
                );
                continue;
            }
            objectives.push(Objective::from_config(cfg));
        }
        Self { objectives }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|objective| objective.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Objective> {
        self.objectives.iter_mut().find(|objective| objective.id == id)
    }

    /// Zero all progress and clear completion flags.
    pub fn reset(&mut self) {
        for objective in &mut self.objectives {
            objective.current_progress = 0.0;
            objective.completed = false;
        }
    }

    /// Set an objective's progress, clamped to `[0, required]`.
    pub fn update_progress(&mut self, id: &str, value: f32) -> ObjectiveChange {
        let Some(objective) = self.get_mut(id) else {
            log::warn!("progress update for unknown objective '{id}'");
            return ObjectiveChange::Unknown;
        };
        if objective.completed {
            log::debug!("objective '{id}' already complete; ignoring progress {value}");
            return ObjectiveChange::AlreadyComplete;
        }
        if value.is_nan() {
            log::warn!("rejecting NaN progress for objective '{id}'");
            return ObjectiveChange::Rejected;
        }
        let clamped = value.clamp(0.0, objective.required_progress);
        if clamped >= objective.required_progress {
            objective.finish();
            log::info!("objective '{id}' completed");
            ObjectiveChange::Completed
        } else {
            objective.current_progress = clamped;
            ObjectiveChange::Progressed
        }
    }

    /// Force an objective to complete. Idempotent.
    pub fn mark_complete(&mut self, id: &str) -> ObjectiveChange {
        let Some(objective) = self.get_mut(id) else {
            log::warn!("completion for unknown objective '{id}'");
            return ObjectiveChange::Unknown;
        };
        if objective.completed {
            return ObjectiveChange::AlreadyComplete;
        }
        objective.finish();
        log::info!("objective '{id}' marked complete");
        ObjectiveChange::Completed
    }

    /// True when every non-optional objective is complete.
    ///
    /// An empty set is vacuously complete; that almost always means a mission
    /// was configured without objectives, so it is logged.
    #[must_use]
    pub fn all_required_complete(&self) -> bool {
        if self.objectives.is_empty() {
            log::warn!("objective set is empty; treating required objectives as complete");
            return true;
        }
        self.objectives
            .iter()
            .filter(|objective| !objective.optional)
            .all(|objective| objective.completed)
    }

    /// Share of required objectives completed, in `[0, 1]`.
    #[must_use]
    pub fn progress_fraction(&self) -> f32 {
        let required: Vec<&Objective> = self
            .objectives
            .iter()
            .filter(|objective| !objective.optional)
            .collect();
        if required.is_empty() {
            return 1.0;
        }
        let done = required.iter().filter(|objective| objective.completed).count();
        #[allow(clippy::cast_precision_loss)]
        let fraction = done as f32 / required.len() as f32;
        fraction
    }

    /// Owned copies of all objectives in authoring order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ObjectiveSnapshot> {
        self.objectives.iter().map(Objective::snapshot).collect()
    }
}
