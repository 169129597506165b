use drillyard_game::{
    DisplayCall, MissionConfig, MissionController, MissionState, ObjectiveChange, ObjectiveConfig,
    ObjectiveSet, ProgressionSink, RecordingDisplay, ZoneId,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct OutcomeLog(RefCell<Vec<(ZoneId, bool)>>);

impl ProgressionSink for OutcomeLog {
    fn mission_completed(&self, zone: ZoneId, success: bool) {
        self.0.borrow_mut().push((zone, success));
    }
}

fn mission(
    objectives: Vec<ObjectiveConfig>,
) -> (MissionController, Rc<OutcomeLog>, Rc<RecordingDisplay>) {
    let log = Rc::new(OutcomeLog::default());
    let display = Rc::new(RecordingDisplay::new());
    let config = MissionConfig {
        title: "Drill".to_string(),
        objectives,
    };
    let mut controller = MissionController::new(ZoneId::Warehouse, &config)
        .with_progression(log.clone())
        .with_display(display.clone());
    assert!(controller.start());
    (controller, log, display)
}

#[test]
fn overshooting_progress_clamps_to_required() {
    let mut set = ObjectiveSet::new(&[ObjectiveConfig::new("lift", "Lift crates", 4.0)]);
    assert_eq!(set.update_progress("lift", 2.5), ObjectiveChange::Progressed);
    assert_eq!(set.update_progress("lift", 40.0), ObjectiveChange::Completed);
    let lift = set.get("lift").unwrap();
    assert!(lift.is_completed());
    assert!((lift.current_progress() - 4.0).abs() <= f32::EPSILON);
    assert_eq!(set.update_progress("lift", 1.0), ObjectiveChange::AlreadyComplete);
    assert_eq!(set.update_progress("nope", 1.0), ObjectiveChange::Unknown);
}

#[test]
fn empty_objective_set_is_vacuously_complete() {
    let set = ObjectiveSet::new(&[]);
    assert!(set.is_empty());
    assert!(set.all_required_complete());
}

#[test]
fn optional_objectives_do_not_block_success() {
    let (mut controller, log, display) = mission(vec![
        ObjectiveConfig::new("a", "Required", 1.0),
        ObjectiveConfig::new("b", "Bonus", 2.0).optional(),
    ]);
    assert_eq!(controller.update_progress("a", 1.0), ObjectiveChange::Completed);
    assert_eq!(controller.state(), MissionState::Succeeded);
    assert_eq!(log.0.borrow().as_slice(), &[(ZoneId::Warehouse, true)]);

    let objective_updates = display
        .calls()
        .iter()
        .filter(|call| matches!(call, DisplayCall::Objectives(_)))
        .count();
    assert_eq!(objective_updates, 2, "start plus one mutation");
}

#[test]
fn terminal_missions_ignore_everything() {
    let (mut controller, log, _) = mission(vec![ObjectiveConfig::new("a", "Required", 3.0)]);
    assert_eq!(controller.update_progress("a", 1.0), ObjectiveChange::Progressed);
    assert!(controller.fail());

    assert_eq!(controller.update_progress("a", 3.0), ObjectiveChange::Inactive);
    assert_eq!(controller.mark_complete("a"), ObjectiveChange::Inactive);
    assert!(!controller.complete());
    assert!(!controller.fail());
    assert!(!controller.start());
    assert_eq!(controller.state(), MissionState::Failed);
    assert_eq!(log.0.borrow().len(), 1);
    assert_eq!(controller.outcome().map(|outcome| outcome.success), Some(false));
}

#[test]
fn mission_without_objectives_refuses_to_start() {
    let mut controller = MissionController::new(
        ZoneId::Mining,
        &MissionConfig {
            title: "Empty".to_string(),
            objectives: Vec::new(),
        },
    )
    .with_progression(Rc::new(OutcomeLog::default()))
    .with_display(Rc::new(RecordingDisplay::new()));
    assert!(!controller.start());
    assert_eq!(controller.state(), MissionState::NotStarted);
}
