//! Hub interaction volumes: zone entrances and the graduation gate.
use crate::progression::{GameState, ProgressionController};
use crate::zone::ZoneId;

/// Tracks whether the player stands inside an interaction volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Presence {
    inside: bool,
}

/// Doorway in the hub that starts loading one training zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneEntrance {
    zone: ZoneId,
    presence: Presence,
}

impl ZoneEntrance {
    #[must_use]
    pub const fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            presence: Presence { inside: false },
        }
    }

    #[must_use]
    pub const fn zone(&self) -> ZoneId {
        self.zone
    }

    pub const fn player_entered(&mut self) {
        self.presence.inside = true;
    }

    /// Hint shown while the player stands in the doorway.
    #[must_use]
    pub fn prompt(&self, progression: &ProgressionController) -> String {
        if progression.is_badge_earned(self.zone) {
            format!("Replay {} training (badge earned)", self.zone)
        } else {
            format!("Enter {} training", self.zone)
        }
    }

    /// Start the zone load. Only honoured from the hub with the player inside.
    pub fn interact(&self, progression: &mut ProgressionController) -> bool {
        if !self.presence.inside {
            log::debug!("{} entrance used with nobody inside", self.zone);
            return false;
        }
        if progression.state() != GameState::Hub {
            log::warn!(
                "{} entrance used outside the hub ({:?})",
                self.zone,
                progression.state()
            );
            return false;
        }
        progression.load_zone(self.zone)
    }
}

/// Hub gate that opens onto graduation once every badge is earned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraduationGate {
    presence: Presence,
}

impl GraduationGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            presence: Presence { inside: false },
        }
    }

    pub const fn player_entered(&mut self) {
        self.presence.inside = true;
    }

    #[must_use]
    pub fn prompt(&self, progression: &ProgressionController) -> String {
        if progression.is_graduation_eligible() {
            "Graduate".to_string()
        } else {
            format!(
                "Earn every badge to graduate ({}/{})",
                progression.earned_count(),
                ZoneId::COUNT
            )
        }
    }

    /// Load graduation when eligible; otherwise refuse.
    pub fn interact(&self, progression: &mut ProgressionController) -> bool {
        if !self.presence.inside {
            return false;
        }
        if progression.state() != GameState::Hub {
            log::warn!(
                "graduation gate used outside the hub ({:?})",
                progression.state()
            );
            return false;
        }
        if !progression.is_graduation_eligible() {
            log::info!(
                "graduation gate locked: {}/{} badges",
                progression.earned_count(),
                ZoneId::COUNT
            );
            return false;
        }
        progression.load_graduation()
    }
}
