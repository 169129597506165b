use drillyard_game::{
    AnomalyController, AnomalyEffectSpec, AnomalyEvent, AnomalyKind, Controllable,
    ControllableRoster, DriveInput, IgnoreReason, RevertCause, SharedControllable, Vehicle,
    VehicleEffect, VehicleKind,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Controllable that only records what anomalies did to it.
#[derive(Debug)]
struct Crane {
    active: bool,
    multiplier: f32,
    controls: bool,
    writes: usize,
}

impl Crane {
    fn shared(active: bool) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            active,
            multiplier: 1.0,
            controls: true,
            writes: 0,
        }))
    }
}

impl Controllable for Crane {
    fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.multiplier = multiplier;
        self.writes += 1;
    }

    fn speed_multiplier(&self) -> f32 {
        self.multiplier
    }

    fn set_control_enabled(&mut self, enabled: bool) {
        self.controls = enabled;
        self.writes += 1;
    }

    fn control_enabled(&self) -> bool {
        self.controls
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn handle_input(&mut self, _input: DriveInput) {}

    fn apply_physics(&mut self, _dt: f32) {}
}

fn specs() -> Vec<AnomalyEffectSpec> {
    vec![
        AnomalyEffectSpec::new(
            AnomalyKind::EquipmentFailure,
            2.0,
            0.4,
            VehicleEffect::ReduceSpeed,
        ),
        AnomalyEffectSpec::new(
            AnomalyKind::UnexpectedEvent,
            1.0,
            1.0,
            VehicleEffect::DisableControls,
        ),
        AnomalyEffectSpec::new(
            AnomalyKind::EnvironmentalChange,
            5.0,
            0.5,
            VehicleEffect::None,
        ),
    ]
}

fn recorder(anomalies: &mut AnomalyController) -> Rc<RefCell<Vec<AnomalyEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    anomalies.subscribe(move |event| sink.borrow_mut().push(*event));
    events
}

#[test]
fn effects_follow_the_active_target_and_reset_clears_all() {
    let roster = ControllableRoster::new();
    let first = Crane::shared(true);
    let second = Crane::shared(false);
    roster.register(first.clone());
    roster.register(second.clone());
    let mut anomalies = AnomalyController::new(specs(), roster);

    assert!(anomalies.activate(AnomalyKind::EquipmentFailure));
    first.borrow_mut().active = false;
    second.borrow_mut().active = true;
    assert!(anomalies.activate(AnomalyKind::UnexpectedEvent));

    assert_eq!(anomalies.active_count(), 2);
    let first_handle: SharedControllable = first.clone();
    assert!(anomalies.is_active_on(&first_handle));
    assert!((first.borrow().multiplier - 0.6).abs() <= 1e-6);
    assert!(!second.borrow().controls);

    anomalies.reset();
    assert_eq!(anomalies.active_count(), 0);
    assert_eq!(anomalies.pending_reversions(), 0);
    assert!((first.borrow().multiplier - 1.0).abs() <= 1e-6);
    assert!(second.borrow().controls);
}

#[test]
fn ignored_triggers_touch_nothing() {
    let roster = ControllableRoster::new();
    let crane = Crane::shared(false);
    roster.register(crane.clone());
    let mut anomalies = AnomalyController::new(specs(), roster);
    let events = recorder(&mut anomalies);

    assert!(!anomalies.activate(AnomalyKind::EquipmentFailure));
    assert!(!anomalies.activate(AnomalyKind::EnvironmentalChange));
    assert_eq!(crane.borrow().writes, 0);
    assert_eq!(
        events.borrow().as_slice(),
        &[
            AnomalyEvent::Ignored {
                kind: AnomalyKind::EquipmentFailure,
                reason: IgnoreReason::NoActiveTarget,
            },
            AnomalyEvent::Ignored {
                kind: AnomalyKind::EnvironmentalChange,
                reason: IgnoreReason::NoVehicleEffect,
            },
        ]
    );
}

#[test]
fn repeated_triggers_restart_the_timer_without_stacking() {
    let roster = ControllableRoster::new();
    let mut vehicle = Vehicle::new(VehicleKind::Excavator);
    vehicle.set_active(true);
    let vehicle = vehicle.into_shared();
    roster.register(vehicle.clone());
    let mut anomalies = AnomalyController::new(specs(), roster);
    let events = recorder(&mut anomalies);

    for _ in 0..5 {
        assert!(anomalies.activate(AnomalyKind::EquipmentFailure));
        anomalies.tick(Duration::from_millis(1500));
        assert_eq!(anomalies.active_count(), 1);
        assert_eq!(anomalies.pending_reversions(), 1);
        assert!((vehicle.borrow().speed_multiplier() - 0.6).abs() <= 1e-6);
    }
    anomalies.tick(Duration::from_millis(500));
    assert_eq!(anomalies.active_count(), 0);
    assert!((vehicle.borrow().speed_multiplier() - 1.0).abs() <= 1e-6);

    let superseded = events
        .borrow()
        .iter()
        .filter(|event| {
            matches!(
                event,
                AnomalyEvent::Reverted {
                    cause: RevertCause::Superseded,
                    ..
                }
            )
        })
        .count();
    assert_eq!(superseded, 4);
}

#[test]
fn dropping_the_controller_restores_the_vehicle() {
    let roster = ControllableRoster::new();
    let crane = Crane::shared(true);
    roster.register(crane.clone());
    {
        let mut anomalies = AnomalyController::new(specs(), roster.clone());
        anomalies.activate(AnomalyKind::UnexpectedEvent);
        assert!(!crane.borrow().controls);
    }
    assert!(crane.borrow().controls);
}
