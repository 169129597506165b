//! Training zone identifiers
use serde::{Deserialize, Serialize};

use crate::constants::BADGE_KEY_PREFIX;

/// One of the six training zones reachable from the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneId {
    Construction,
    Warehouse,
    Agriculture,
    Firefighting,
    Mining,
    Harbor,
}

impl ZoneId {
    /// Every zone, in badge-board order.
    pub const ALL: [Self; 6] = [
        Self::Construction,
        Self::Warehouse,
        Self::Agriculture,
        Self::Firefighting,
        Self::Mining,
        Self::Harbor,
    ];

    /// Total number of zones (and therefore badges).
    pub const COUNT: usize = Self::ALL.len();

    /// Stable identifier used in config files and storage keys.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Construction => "Construction",
            Self::Warehouse => "Warehouse",
            Self::Agriculture => "Agriculture",
            Self::Firefighting => "Firefighting",
            Self::Mining => "Mining",
            Self::Harbor => "Harbor",
        }
    }

    /// Position of this zone on the badge board.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Construction => 0,
            Self::Warehouse => 1,
            Self::Agriculture => 2,
            Self::Firefighting => 3,
            Self::Mining => 4,
            Self::Harbor => 5,
        }
    }

    /// Persisted-store key holding this zone's badge flag.
    #[must_use]
    pub fn badge_key(self) -> String {
        format!("{BADGE_KEY_PREFIX}{}", self.key())
    }

    /// Parse a zone from its stable key (case-insensitive).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|zone| zone.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
