//! Timed anomaly injection against the vehicle the player is driving.
//!
//! At most one effect is live per target. Activating a new anomaly on an
//! affected target first reverts the old effect and cancels its pending
//! reversion, so effects never stack and never leave residue.
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::NEUTRAL_SPEED_MULTIPLIER;
use crate::events::{ListenerId, Listeners};
use crate::scheduler::{Scheduled, Scheduler, seconds};
use crate::vehicle::{ControllableRoster, SharedControllable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnomalyKind {
    EquipmentFailure,
    EnvironmentalChange,
    UnexpectedEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VehicleEffect {
    #[default]
    None,
    ReduceSpeed,
    DisableControls,
}

/// Authored description of one anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEffectSpec {
    pub kind: AnomalyKind,
    /// Seconds until the effect reverts; zero persists until reset.
    #[serde(default)]
    pub duration_seconds: f32,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(default)]
    pub vehicle_effect: VehicleEffect,
}

const fn default_intensity() -> f32 {
    0.5
}

impl AnomalyEffectSpec {
    #[must_use]
    pub const fn new(
        kind: AnomalyKind,
        duration_seconds: f32,
        intensity: f32,
        vehicle_effect: VehicleEffect,
    ) -> Self {
        Self {
            kind,
            duration_seconds,
            intensity,
            vehicle_effect,
        }
    }

    /// Speed multiplier a `ReduceSpeed` effect applies.
    #[must_use]
    pub fn reduced_multiplier(&self) -> f32 {
        let intensity = if self.intensity.is_finite() {
            self.intensity
        } else {
            0.0
        };
        (1.0 - intensity).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    NoSpec,
    NoVehicleEffect,
    NoActiveTarget,
    TargetBusy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevertCause {
    Expired,
    Superseded,
    Reset,
    Teardown,
}

/// Notification emitted by [`AnomalyController`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnomalyEvent {
    Applied {
        kind: AnomalyKind,
        effect: VehicleEffect,
        intensity: f32,
    },
    Reverted {
        kind: AnomalyKind,
        effect: VehicleEffect,
        cause: RevertCause,
    },
    Ignored {
        kind: AnomalyKind,
        reason: IgnoreReason,
    },
}

struct ActiveEffect {
    serial: u64,
    target: SharedControllable,
    spec: AnomalyEffectSpec,
    reversion: Option<Scheduled>,
    /// Cause recorded by a revert that found the target busy.
    retry_cause: Option<RevertCause>,
}

pub struct AnomalyController {
    specs: Vec<AnomalyEffectSpec>,
    roster: ControllableRoster,
    scheduler: Scheduler<u64>,
    active: Vec<ActiveEffect>,
    next_serial: u64,
    listeners: Listeners<AnomalyEvent>,
}

impl std::fmt::Debug for AnomalyController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyController")
            .field("specs", &self.specs)
            .field("active", &self.active.len())
            .field("now", &self.scheduler.now())
            .finish_non_exhaustive()
    }
}

impl AnomalyController {
    #[must_use]
    pub fn new(specs: Vec<AnomalyEffectSpec>, roster: ControllableRoster) -> Self {
        Self {
            specs,
            roster,
            scheduler: Scheduler::new(),
            active: Vec::new(),
            next_serial: 0,
            listeners: Listeners::new(),
        }
    }

    #[must_use]
    pub fn specs(&self) -> &[AnomalyEffectSpec] {
        &self.specs
    }

    /// Controller clock, advanced only by [`Self::tick`].
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&AnomalyEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Number of targets currently carrying an effect.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of reversions still waiting on their deadline.
    #[must_use]
    pub fn pending_reversions(&self) -> usize {
        self.scheduler.pending()
    }

    #[must_use]
    pub fn is_active_on(&self, target: &SharedControllable) -> bool {
        self.active
            .iter()
            .any(|effect| Rc::ptr_eq(&effect.target, target))
    }

    /// Trigger the first configured anomaly of `kind` against the active
    /// controllable. Returns true when an effect was applied.
    pub fn activate(&mut self, kind: AnomalyKind) -> bool {
        let Some(spec) = self.specs.iter().find(|spec| spec.kind == kind).copied() else {
            log::warn!("no anomaly configured for {kind:?}");
            return self.ignore(kind, IgnoreReason::NoSpec);
        };
        if spec.vehicle_effect == VehicleEffect::None {
            log::info!("anomaly {kind:?} has no vehicle effect; nothing to apply");
            return self.ignore(kind, IgnoreReason::NoVehicleEffect);
        }
        let Some(target) = self.roster.active() else {
            log::warn!("anomaly {kind:?} triggered with no active controllable");
            return self.ignore(kind, IgnoreReason::NoActiveTarget);
        };

        if target.try_borrow_mut().is_err() {
            log::error!("anomaly {kind:?} target is borrowed elsewhere; skipping");
            return self.ignore(kind, IgnoreReason::TargetBusy);
        }

        if let Some(index) = self
            .active
            .iter()
            .position(|effect| Rc::ptr_eq(&effect.target, &target))
        {
            let previous = self.active.remove(index);
            if let Some(reversion) = &previous.reversion {
                reversion.token.cancel();
            }
            if let Err(previous) = self.revert(previous, RevertCause::Superseded) {
                self.retry_later(previous, RevertCause::Superseded);
                return self.ignore(kind, IgnoreReason::TargetBusy);
            }
        }

        let Ok(mut entity) = target.try_borrow_mut() else {
            return self.ignore(kind, IgnoreReason::TargetBusy);
        };
        match spec.vehicle_effect {
            VehicleEffect::ReduceSpeed => entity.set_speed_multiplier(spec.reduced_multiplier()),
            VehicleEffect::DisableControls => entity.set_control_enabled(false),
            VehicleEffect::None => {}
        }
        drop(entity);

        let serial = self.next_serial;
        self.next_serial += 1;
        let reversion = (spec.duration_seconds > 0.0)
            .then(|| self.scheduler.schedule_after(seconds(spec.duration_seconds), serial));
        log::info!(
            "anomaly {kind:?} applied {:?} at intensity {} for {}s",
            spec.vehicle_effect,
            spec.intensity,
            spec.duration_seconds
        );
        self.active.push(ActiveEffect {
            serial,
            target,
            spec,
            reversion,
            retry_cause: None,
        });
        self.listeners.emit(&AnomalyEvent::Applied {
            kind,
            effect: spec.vehicle_effect,
            intensity: spec.intensity,
        });
        true
    }

    /// Advance the controller clock and revert every effect whose duration
    /// has elapsed.
    pub fn tick(&mut self, dt: Duration) {
        for serial in self.scheduler.advance(dt) {
            let Some(index) = self.active.iter().position(|effect| effect.serial == serial) else {
                continue;
            };
            let effect = self.active.remove(index);
            let cause = effect.retry_cause.unwrap_or(RevertCause::Expired);
            if let Err(effect) = self.revert(effect, cause) {
                self.retry_later(effect, cause);
            }
        }
    }

    /// Revert every live effect and drop pending reversions.
    pub fn reset(&mut self) {
        self.revert_all(RevertCause::Reset);
    }

    /// Tear down: same as [`Self::reset`], reported as teardown.
    pub fn shutdown(&mut self) {
        if !self.active.is_empty() {
            log::debug!(
                "anomaly controller shutting down with {} live effects",
                self.active.len()
            );
        }
        self.revert_all(RevertCause::Teardown);
    }

    fn revert_all(&mut self, cause: RevertCause) {
        self.scheduler.cancel_all();
        for effect in std::mem::take(&mut self.active) {
            if let Err(effect) = self.revert(effect, cause) {
                self.retry_later(effect, cause);
            }
        }
    }

    /// Restore the target. A busy target hands the effect back untouched.
    fn revert(&mut self, effect: ActiveEffect, cause: RevertCause) -> Result<(), ActiveEffect> {
        if let Ok(mut entity) = effect.target.try_borrow_mut() {
            match effect.spec.vehicle_effect {
                VehicleEffect::ReduceSpeed => {
                    entity.set_speed_multiplier(NEUTRAL_SPEED_MULTIPLIER);
                }
                VehicleEffect::DisableControls => entity.set_control_enabled(true),
                VehicleEffect::None => {}
            }
        } else {
            log::error!(
                "could not revert {:?}: target is borrowed elsewhere",
                effect.spec.kind
            );
            return Err(effect);
        }
        log::debug!("anomaly {:?} reverted ({cause:?})", effect.spec.kind);
        self.listeners.emit(&AnomalyEvent::Reverted {
            kind: effect.spec.kind,
            effect: effect.spec.vehicle_effect,
            cause,
        });
        Ok(())
    }

    /// Keep an unreverted effect live and retry on the next tick.
    fn retry_later(&mut self, mut effect: ActiveEffect, cause: RevertCause) {
        effect.reversion = Some(self.scheduler.schedule_after(Duration::ZERO, effect.serial));
        effect.retry_cause = Some(cause);
        self.active.push(effect);
    }

    fn ignore(&mut self, kind: AnomalyKind, reason: IgnoreReason) -> bool {
        self.listeners.emit(&AnomalyEvent::Ignored { kind, reason });
        false
    }
}

impl Drop for AnomalyController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{Controllable, Vehicle, VehicleKind};
    use std::cell::RefCell;

    fn driven_roster() -> (ControllableRoster, Rc<RefCell<Vehicle>>) {
        let roster = ControllableRoster::new();
        let mut vehicle = Vehicle::new(VehicleKind::Forklift);
        vehicle.set_active(true);
        let vehicle = vehicle.into_shared();
        roster.register(vehicle.clone());
        (roster, vehicle)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-6
    }

    #[test]
    fn reduce_speed_reverts_after_duration() {
        let (roster, vehicle) = driven_roster();
        let mut anomalies = AnomalyController::new(
            vec![AnomalyEffectSpec::new(
                AnomalyKind::EquipmentFailure,
                2.0,
                0.4,
                VehicleEffect::ReduceSpeed,
            )],
            roster,
        );
        assert!(anomalies.activate(AnomalyKind::EquipmentFailure));
        assert!(approx(vehicle.borrow().speed_multiplier(), 0.6));

        anomalies.tick(seconds(1.5));
        assert!(approx(vehicle.borrow().speed_multiplier(), 0.6));
        anomalies.tick(seconds(0.5));
        assert!(approx(vehicle.borrow().speed_multiplier(), 1.0));
        assert_eq!(anomalies.active_count(), 0);
    }

    #[test]
    fn second_activation_supersedes_first_without_residue() {
        let (roster, vehicle) = driven_roster();
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut anomalies = AnomalyController::new(
            vec![
                AnomalyEffectSpec::new(
                    AnomalyKind::EquipmentFailure,
                    2.0,
                    0.4,
                    VehicleEffect::ReduceSpeed,
                ),
                AnomalyEffectSpec::new(
                    AnomalyKind::UnexpectedEvent,
                    3.0,
                    1.0,
                    VehicleEffect::DisableControls,
                ),
            ],
            roster,
        );
        {
            let events = Rc::clone(&events);
            anomalies.subscribe(move |event| events.borrow_mut().push(*event));
        }

        anomalies.activate(AnomalyKind::EquipmentFailure);
        anomalies.tick(seconds(1.0));
        anomalies.activate(AnomalyKind::UnexpectedEvent);
        assert!(approx(vehicle.borrow().speed_multiplier(), 1.0));
        assert!(!vehicle.borrow().control_enabled());
        assert_eq!(anomalies.pending_reversions(), 1);

        // The cancelled speed reversion would have fired here.
        anomalies.tick(seconds(1.5));
        assert!(!vehicle.borrow().control_enabled());
        anomalies.tick(seconds(1.5));
        assert!(vehicle.borrow().control_enabled());
        assert!(approx(vehicle.borrow().speed_multiplier(), 1.0));

        let causes: Vec<RevertCause> = events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                AnomalyEvent::Reverted { cause, .. } => Some(*cause),
                _ => None,
            })
            .collect();
        assert_eq!(causes, vec![RevertCause::Superseded, RevertCause::Expired]);
    }

    #[test]
    fn zero_duration_persists_until_reset() {
        let (roster, vehicle) = driven_roster();
        let mut anomalies = AnomalyController::new(
            vec![AnomalyEffectSpec::new(
                AnomalyKind::EnvironmentalChange,
                0.0,
                0.25,
                VehicleEffect::ReduceSpeed,
            )],
            roster,
        );
        anomalies.activate(AnomalyKind::EnvironmentalChange);
        anomalies.tick(seconds(600.0));
        assert!(approx(vehicle.borrow().speed_multiplier(), 0.75));
        anomalies.reset();
        assert!(approx(vehicle.borrow().speed_multiplier(), 1.0));
    }

    #[test]
    fn drop_reverts_live_effects() {
        let (roster, vehicle) = driven_roster();
        let shared: SharedControllable = vehicle.clone();
        {
            let mut anomalies = AnomalyController::new(
                vec![AnomalyEffectSpec::new(
                    AnomalyKind::UnexpectedEvent,
                    10.0,
                    1.0,
                    VehicleEffect::DisableControls,
                )],
                roster,
            );
            anomalies.activate(AnomalyKind::UnexpectedEvent);
            assert!(anomalies.is_active_on(&shared));
            assert!(!vehicle.borrow().control_enabled());
        }
        assert!(vehicle.borrow().control_enabled());
    }

    #[test]
    fn busy_target_is_reverted_on_a_later_tick() {
        let (roster, vehicle) = driven_roster();
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut anomalies = AnomalyController::new(
            vec![AnomalyEffectSpec::new(
                AnomalyKind::EquipmentFailure,
                1.0,
                0.4,
                VehicleEffect::ReduceSpeed,
            )],
            roster,
        );
        {
            let events = Rc::clone(&events);
            anomalies.subscribe(move |event| events.borrow_mut().push(*event));
        }
        anomalies.activate(AnomalyKind::EquipmentFailure);

        {
            let held = vehicle.borrow();
            anomalies.tick(seconds(2.0));
            assert!(approx(held.speed_multiplier(), 0.6));
            assert_eq!(anomalies.active_count(), 1);
            anomalies.reset();
            assert_eq!(anomalies.active_count(), 1);
            assert_eq!(anomalies.pending_reversions(), 1);
        }

        anomalies.tick(Duration::ZERO);
        assert_eq!(anomalies.active_count(), 0);
        assert!(approx(vehicle.borrow().speed_multiplier(), 1.0));
        let reverted: Vec<RevertCause> = events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                AnomalyEvent::Reverted { cause, .. } => Some(*cause),
                _ => None,
            })
            .collect();
        assert_eq!(reverted, vec![RevertCause::Reset]);
    }

    #[test]
    fn unmatched_or_targetless_activations_are_ignored() {
        let roster = ControllableRoster::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut anomalies = AnomalyController::new(
            vec![
                AnomalyEffectSpec::new(
                    AnomalyKind::EnvironmentalChange,
                    5.0,
                    0.5,
                    VehicleEffect::None,
                ),
                AnomalyEffectSpec::new(
                    AnomalyKind::EquipmentFailure,
                    5.0,
                    0.5,
                    VehicleEffect::ReduceSpeed,
                ),
            ],
            roster,
        );
        {
            let events = Rc::clone(&events);
            anomalies.subscribe(move |event| events.borrow_mut().push(*event));
        }
        assert!(!anomalies.activate(AnomalyKind::UnexpectedEvent));
        assert!(!anomalies.activate(AnomalyKind::EnvironmentalChange));
        assert!(!anomalies.activate(AnomalyKind::EquipmentFailure));
        assert_eq!(
            *events.borrow(),
            vec![
                AnomalyEvent::Ignored {
                    kind: AnomalyKind::UnexpectedEvent,
                    reason: IgnoreReason::NoSpec
                },
                AnomalyEvent::Ignored {
                    kind: AnomalyKind::EnvironmentalChange,
                    reason: IgnoreReason::NoVehicleEffect
                },
                AnomalyEvent::Ignored {
                    kind: AnomalyKind::EquipmentFailure,
                    reason: IgnoreReason::NoActiveTarget
                },
            ]
        );
    }

    #[test]
    fn spec_defaults_from_json() {
        let spec: AnomalyEffectSpec =
            serde_json::from_str(r#"{ "kind": "EquipmentFailure" }"#).unwrap();
        assert!(spec.duration_seconds.abs() <= f32::EPSILON);
        assert!(approx(spec.intensity, 0.5));
        assert_eq!(spec.vehicle_effect, VehicleEffect::None);
        assert!(approx(
            AnomalyEffectSpec::new(
                AnomalyKind::EquipmentFailure,
                1.0,
                1.5,
                VehicleEffect::ReduceSpeed
            )
            .reduced_multiplier(),
            0.0
        ));
    }
}
