//! Controllable vehicles and the roster anomalies target.
use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::constants::NEUTRAL_SPEED_MULTIPLIER;

/// Player input for one frame, already normalised by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveInput {
    /// Forward throttle in `[-1, 1]`; negative reverses.
    pub throttle: f32,
    /// Steering in `[-1, 1]`; positive turns right.
    pub steer: f32,
    pub brake: bool,
}

/// Entity whose behaviour anomalies can perturb.
pub trait Controllable {
    fn set_speed_multiplier(&mut self, multiplier: f32);
    fn speed_multiplier(&self) -> f32;
    fn set_control_enabled(&mut self, enabled: bool);
    fn control_enabled(&self) -> bool;
    /// Whether this entity is the one the player is currently driving.
    fn is_active(&self) -> bool;
    fn handle_input(&mut self, input: DriveInput);
    fn apply_physics(&mut self, dt: f32);
}

pub type SharedControllable = Rc<RefCell<dyn Controllable>>;

/// Registry of controllable entities present in the loaded zone.
///
/// Clones share the same registry so the zone's spawner and the anomaly
/// controller see the same entities.
#[derive(Clone, Default)]
pub struct ControllableRoster {
    entries: Rc<RefCell<Vec<SharedControllable>>>,
}

impl std::fmt::Debug for ControllableRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllableRoster")
            .field("len", &self.entries.borrow().len())
            .finish()
    }
}

impl ControllableRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, entity: SharedControllable) {
        let mut entries = self.entries.borrow_mut();
        if !entries.iter().any(|existing| Rc::ptr_eq(existing, &entity)) {
            entries.push(entity);
        }
    }

    pub fn unregister(&self, entity: &SharedControllable) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|existing| !Rc::ptr_eq(existing, entity));
        before != entries.len()
    }

    /// The single active entity. When several report active, the earliest
    /// registered wins and the conflict is logged.
    #[must_use]
    pub fn active(&self) -> Option<SharedControllable> {
        let entries = self.entries.borrow();
        let mut active = entries.iter().filter(|entity| {
            entity
                .try_borrow()
                .map(|entity| entity.is_active())
                .unwrap_or(false)
        });
        let first = active.next().cloned();
        if active.next().is_some() {
            log::warn!("more than one active controllable registered; using the first");
        }
        first
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Vehicle variants used across the training zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleKind {
    Forklift,
    Excavator,
    Tractor,
    FireTruck,
    HaulTruck,
    Tugboat,
}

/// Handling characteristics for a vehicle variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    /// Top speed in metres per second at multiplier 1.
    pub max_speed: f32,
    /// Acceleration in metres per second squared.
    pub acceleration: f32,
    /// Braking deceleration in metres per second squared.
    pub braking: f32,
    /// Turn rate in radians per second at full steer.
    pub turn_rate: f32,
}

impl VehicleKind {
    #[must_use]
    pub const fn spec(self) -> VehicleSpec {
        match self {
            Self::Forklift => VehicleSpec {
                max_speed: 4.0,
                acceleration: 2.0,
                braking: 6.0,
                turn_rate: 1.6,
            },
            Self::Excavator => VehicleSpec {
                max_speed: 2.5,
                acceleration: 0.8,
                braking: 4.0,
                turn_rate: 0.6,
            },
            Self::Tractor => VehicleSpec {
                max_speed: 8.0,
                acceleration: 1.5,
                braking: 5.0,
                turn_rate: 0.9,
            },
            Self::FireTruck => VehicleSpec {
                max_speed: 18.0,
                acceleration: 3.5,
                braking: 8.0,
                turn_rate: 0.8,
            },
            Self::HaulTruck => VehicleSpec {
                max_speed: 12.0,
                acceleration: 1.2,
                braking: 4.5,
                turn_rate: 0.5,
            },
            Self::Tugboat => VehicleSpec {
                max_speed: 6.0,
                acceleration: 0.7,
                braking: 1.5,
                turn_rate: 0.4,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub kind: VehicleKind,
    spec: VehicleSpec,
    speed_multiplier: f32,
    control_enabled: bool,
    active: bool,
    input: DriveInput,
    /// Current signed speed in metres per second.
    pub speed: f32,
    /// Heading in radians.
    pub heading: f32,
    /// Total distance travelled in metres.
    pub odometer: f32,
}

impl Vehicle {
    #[must_use]
    pub const fn new(kind: VehicleKind) -> Self {
        Self {
            kind,
            spec: kind.spec(),
            speed_multiplier: NEUTRAL_SPEED_MULTIPLIER,
            control_enabled: true,
            active: false,
            input: DriveInput {
                throttle: 0.0,
                steer: 0.0,
                brake: false,
            },
            speed: 0.0,
            heading: 0.0,
            odometer: 0.0,
        }
    }

    /// Wrap the vehicle in a shared handle for the roster.
    #[must_use]
    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub const fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[must_use]
    pub const fn spec(&self) -> VehicleSpec {
        self.spec
    }

    /// Effective top speed after the current multiplier.
    #[must_use]
    pub fn top_speed(&self) -> f32 {
        self.spec.max_speed * self.speed_multiplier
    }
}

impl Controllable for Vehicle {
    fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = if multiplier.is_nan() {
            NEUTRAL_SPEED_MULTIPLIER
        } else {
            multiplier.clamp(0.0, 1.0)
        };
        let cap = self.top_speed();
        self.speed = self.speed.clamp(-cap, cap);
    }

    fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    fn set_control_enabled(&mut self, enabled: bool) {
        self.control_enabled = enabled;
        if !enabled {
            self.input = DriveInput::default();
        }
    }

    fn control_enabled(&self) -> bool {
        self.control_enabled
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn handle_input(&mut self, input: DriveInput) {
        if !self.control_enabled {
            return;
        }
        self.input = DriveInput {
            throttle: input.throttle.clamp(-1.0, 1.0),
            steer: input.steer.clamp(-1.0, 1.0),
            brake: input.brake,
        };
    }

    fn apply_physics(&mut self, dt: f32) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        let cap = self.top_speed();
        let target = if self.input.brake {
            0.0
        } else {
            self.input.throttle * cap
        };
        let rate = if self.input.brake || target.abs() < self.speed.abs() {
            self.spec.braking
        } else {
            self.spec.acceleration
        };
        let max_delta = rate * dt;
        let delta = (target - self.speed).clamp(-max_delta, max_delta);
        self.speed = (self.speed + delta).clamp(-cap, cap);
        self.heading += self.input.steer * self.spec.turn_rate * dt;
        self.odometer += self.speed.abs() * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driving(kind: VehicleKind) -> Vehicle {
        let mut vehicle = Vehicle::new(kind);
        vehicle.set_active(true);
        vehicle
    }

    #[test]
    fn multiplier_is_clamped_and_caps_speed() {
        let mut vehicle = driving(VehicleKind::Forklift);
        vehicle.speed = 4.0;
        vehicle.set_speed_multiplier(0.5);
        assert!((vehicle.speed - 2.0).abs() <= f32::EPSILON);
        vehicle.set_speed_multiplier(3.0);
        assert!((vehicle.speed_multiplier() - 1.0).abs() <= f32::EPSILON);
        vehicle.set_speed_multiplier(-1.0);
        assert!(vehicle.speed_multiplier().abs() <= f32::EPSILON);
    }

    #[test]
    fn disabled_controls_drop_input() {
        let mut vehicle = driving(VehicleKind::Tractor);
        vehicle.set_control_enabled(false);
        vehicle.handle_input(DriveInput {
            throttle: 1.0,
            steer: 0.0,
            brake: false,
        });
        vehicle.apply_physics(1.0);
        assert!(vehicle.speed.abs() <= f32::EPSILON);
    }

    #[test]
    fn physics_accelerates_toward_scaled_target() {
        let mut vehicle = driving(VehicleKind::FireTruck);
        vehicle.set_speed_multiplier(0.5);
        vehicle.handle_input(DriveInput {
            throttle: 1.0,
            steer: 0.5,
            brake: false,
        });
        for _ in 0..100 {
            vehicle.apply_physics(0.1);
        }
        assert!((vehicle.speed - 9.0).abs() <= 1e-3);
        assert!(vehicle.heading > 0.0);
        assert!(vehicle.odometer > 0.0);

        vehicle.handle_input(DriveInput {
            throttle: 0.0,
            steer: 0.0,
            brake: true,
        });
        for _ in 0..50 {
            vehicle.apply_physics(0.1);
        }
        assert!(vehicle.speed.abs() <= f32::EPSILON);
    }

    #[test]
    fn roster_picks_first_active_entity() {
        let roster = ControllableRoster::new();
        let parked = Vehicle::new(VehicleKind::HaulTruck).into_shared();
        let driven = driving(VehicleKind::Excavator).into_shared();
        let parked_dyn: SharedControllable = parked.clone();
        let driven_dyn: SharedControllable = driven.clone();
        roster.register(parked_dyn.clone());
        roster.register(driven_dyn.clone());
        roster.register(driven_dyn.clone());
        assert_eq!(roster.len(), 2);

        let active = roster.active().expect("active vehicle");
        assert!(Rc::ptr_eq(&active, &driven_dyn));

        assert!(roster.unregister(&driven_dyn));
        assert!(roster.active().is_none());
        assert!(!roster.is_empty());
    }
}
