//! Display collaborator interface.
//!
//! The core only ever pushes presentation state outward; it never reads UI
//! state back. Engine glue implements [`DisplaySink`] over its widget tree.
use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::objectives::ObjectiveSnapshot;
use crate::zone::ZoneId;

/// Top-level panels the UI layer can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelKind {
    MainMenu,
    Hub,
    Loading,
    MissionHud,
    Graduation,
}

pub trait DisplaySink {
    fn show_panel(&self, kind: PanelKind);
    fn set_loading_visible(&self, visible: bool);
    fn show_mission_title(&self, title: &str);
    fn show_objectives(&self, objectives: &[ObjectiveSnapshot]);
    fn show_badge_board(&self, earned: [bool; ZoneId::COUNT]);
    fn show_end_screen(&self, earned_count: usize);
}

/// One call received by a [`RecordingDisplay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisplayCall {
    Panel(PanelKind),
    Loading(bool),
    MissionTitle(String),
    Objectives(Vec<ObjectiveSnapshot>),
    BadgeBoard([bool; ZoneId::COUNT]),
    EndScreen(usize),
}

/// Headless display that records every call, for tools and tests.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    calls: RefCell<Vec<DisplayCall>>,
}

impl RecordingDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<DisplayCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    #[must_use]
    pub fn last_panel(&self) -> Option<PanelKind> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            DisplayCall::Panel(kind) => Some(*kind),
            _ => None,
        })
    }

    #[must_use]
    pub fn loading_visible(&self) -> bool {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find_map(|call| match call {
                DisplayCall::Loading(visible) => Some(*visible),
                _ => None,
            })
            .unwrap_or(false)
    }

    #[must_use]
    pub fn last_badge_board(&self) -> Option<[bool; ZoneId::COUNT]> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            DisplayCall::BadgeBoard(board) => Some(*board),
            _ => None,
        })
    }

    #[must_use]
    pub fn last_objectives(&self) -> Option<Vec<ObjectiveSnapshot>> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            DisplayCall::Objectives(list) => Some(list.clone()),
            _ => None,
        })
    }

    fn push(&self, call: DisplayCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl DisplaySink for RecordingDisplay {
    fn show_panel(&self, kind: PanelKind) {
        self.push(DisplayCall::Panel(kind));
    }

    fn set_loading_visible(&self, visible: bool) {
        self.push(DisplayCall::Loading(visible));
    }

    fn show_mission_title(&self, title: &str) {
        self.push(DisplayCall::MissionTitle(title.to_string()));
    }

    fn show_objectives(&self, objectives: &[ObjectiveSnapshot]) {
        self.push(DisplayCall::Objectives(objectives.to_vec()));
    }

    fn show_badge_board(&self, earned: [bool; ZoneId::COUNT]) {
        self.push(DisplayCall::BadgeBoard(earned));
    }

    fn show_end_screen(&self, earned_count: usize) {
        self.push(DisplayCall::EndScreen(earned_count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_display_tracks_latest_state() {
        let display = RecordingDisplay::new();
        assert!(!display.loading_visible());
        display.show_panel(PanelKind::Loading);
        display.set_loading_visible(true);
        display.show_panel(PanelKind::Hub);
        display.set_loading_visible(false);
        display.show_badge_board([true, false, false, false, false, false]);

        assert_eq!(display.last_panel(), Some(PanelKind::Hub));
        assert!(!display.loading_visible());
        assert!(display.last_badge_board().unwrap()[0]);
        assert_eq!(display.calls().len(), 5);

        display.clear();
        assert!(display.calls().is_empty());
    }
}
