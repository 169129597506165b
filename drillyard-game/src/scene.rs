//! Asynchronous scene loading interface.
//!
//! Mirrors the usual engine contract: a load reports progress in `[0, 1]`,
//! parks at the activation threshold until activation is allowed, and then
//! reports itself active once the scene has fully swapped in.
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use thiserror::Error;

use crate::constants::SCENE_ACTIVATION_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("scene '{0}' is not available to the loader")]
    Missing(String),
    #[error("scene '{scene}' failed while loading: {reason}")]
    Faulted { scene: String, reason: String },
}

/// In-flight scene load.
pub trait SceneLoadOp {
    fn scene(&self) -> &str;

    /// Advance the load and report progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the load faults.
    fn poll(&mut self) -> Result<f32, SceneError>;

    /// Let the load finish past the activation threshold.
    fn allow_activation(&mut self);

    /// True once the scene is fully active.
    fn is_active(&self) -> bool;
}

pub trait SceneLoader {
    /// Begin loading `scene` without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the load cannot be started.
    fn load_scene_async(&mut self, scene: &str) -> Result<Box<dyn SceneLoadOp>, SceneError>;
}

/// Headless loader that advances a fixed amount per poll.
///
/// Clones share their history and failure configuration, so a tool can keep
/// one handle while the progression controller owns another.
#[derive(Debug, Clone)]
pub struct ScriptedSceneLoader {
    step: f32,
    shared: Rc<RefCell<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    known: Option<BTreeSet<String>>,
    fail_on_start: BTreeSet<String>,
    fail_mid_load: BTreeSet<String>,
    started: Vec<String>,
    activated: Vec<String>,
}

impl Default for ScriptedSceneLoader {
    fn default() -> Self {
        Self::new(0.25)
    }
}

impl ScriptedSceneLoader {
    /// Loader whose loads advance by `step` on every poll.
    #[must_use]
    pub fn new(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            0.25
        };
        Self {
            step,
            shared: Rc::new(RefCell::new(ScriptState::default())),
        }
    }

    /// Restrict the loader to the given scene names; others are `Missing`.
    #[must_use]
    pub fn with_known_scenes<I, S>(self, scenes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared.borrow_mut().known = Some(scenes.into_iter().map(Into::into).collect());
        self
    }

    /// Make loads of `scene` fail immediately.
    pub fn fail_on_start(&self, scene: impl Into<String>) {
        self.shared.borrow_mut().fail_on_start.insert(scene.into());
    }

    /// Make loads of `scene` fault on their first poll.
    pub fn fail_mid_load(&self, scene: impl Into<String>) {
        self.shared.borrow_mut().fail_mid_load.insert(scene.into());
    }

    /// Remove any configured failure for `scene`.
    pub fn heal(&self, scene: &str) {
        let mut state = self.shared.borrow_mut();
        state.fail_on_start.remove(scene);
        state.fail_mid_load.remove(scene);
    }

    /// Scenes whose loads were started, in order.
    #[must_use]
    pub fn started(&self) -> Vec<String> {
        self.shared.borrow().started.clone()
    }

    /// Scenes that reached full activation, in order.
    #[must_use]
    pub fn activated(&self) -> Vec<String> {
        self.shared.borrow().activated.clone()
    }
}

impl SceneLoader for ScriptedSceneLoader {
    fn load_scene_async(&mut self, scene: &str) -> Result<Box<dyn SceneLoadOp>, SceneError> {
        let mut state = self.shared.borrow_mut();
        if let Some(known) = &state.known
            && !known.contains(scene)
        {
            return Err(SceneError::Missing(scene.to_string()));
        }
        if state.fail_on_start.contains(scene) {
            return Err(SceneError::Faulted {
                scene: scene.to_string(),
                reason: "load refused".to_string(),
            });
        }
        state.started.push(scene.to_string());
        let fault = state.fail_mid_load.contains(scene);
        drop(state);
        Ok(Box::new(ScriptedLoad {
            scene: scene.to_string(),
            step: self.step,
            progress: 0.0,
            activation_allowed: false,
            active: false,
            fault,
            shared: Rc::clone(&self.shared),
        }))
    }
}

#[derive(Debug)]
struct ScriptedLoad {
    scene: String,
    step: f32,
    progress: f32,
    activation_allowed: bool,
    active: bool,
    fault: bool,
    shared: Rc<RefCell<ScriptState>>,
}

impl SceneLoadOp for ScriptedLoad {
    fn scene(&self) -> &str {
        &self.scene
    }

    fn poll(&mut self) -> Result<f32, SceneError> {
        if self.fault {
            return Err(SceneError::Faulted {
                scene: self.scene.clone(),
                reason: "asset bundle corrupted".to_string(),
            });
        }
        if self.active {
            return Ok(1.0);
        }
        if self.activation_allowed && self.progress >= SCENE_ACTIVATION_THRESHOLD {
            self.progress = 1.0;
            self.active = true;
            self.shared.borrow_mut().activated.push(self.scene.clone());
            return Ok(self.progress);
        }
        self.progress = (self.progress + self.step).min(SCENE_ACTIVATION_THRESHOLD);
        Ok(self.progress)
    }

    fn allow_activation(&mut self) {
        self.activation_allowed = true;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
