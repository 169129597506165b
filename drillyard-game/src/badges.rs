//! Badge record: one persisted earned flag per training zone.
use crate::constants::{BADGE_EARNED, BADGE_UNEARNED};
use crate::storage::{KeyValueStore, StorageError};
use crate::zone::ZoneId;

/// Zone → earned mapping backed by a key-value store.
///
/// Every zone always has an entry. Writes go straight through to the store and
/// are flushed immediately.
pub struct BadgeStore {
    earned: [bool; ZoneId::COUNT],
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for BadgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BadgeStore")
            .field("earned", &self.earned)
            .finish_non_exhaustive()
    }
}

impl BadgeStore {
    /// Load badge flags from `store`. Missing keys are unearned.
    #[must_use]
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let mut earned = [false; ZoneId::COUNT];
        for zone in ZoneId::ALL {
            earned[zone.index()] = store.get_int(&zone.badge_key(), BADGE_UNEARNED) != 0;
        }
        log::debug!(
            "loaded badges: {}/{} earned",
            earned.iter().filter(|flag| **flag).count(),
            ZoneId::COUNT
        );
        Self { earned, store }
    }

    #[must_use]
    pub const fn is_earned(&self, zone: ZoneId) -> bool {
        self.earned[zone.index()]
    }

    #[must_use]
    pub fn earned_count(&self) -> usize {
        self.earned.iter().filter(|flag| **flag).count()
    }

    /// Badge flags in board order.
    #[must_use]
    pub const fn board(&self) -> [bool; ZoneId::COUNT] {
        self.earned
    }

    #[must_use]
    pub fn all_earned(&self) -> bool {
        self.earned.iter().all(|flag| *flag)
    }

    /// Set a zone's flag and persist it. The in-memory flag is updated even
    /// when persisting fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot write or flush.
    pub fn set_earned(&mut self, zone: ZoneId, earned: bool) -> Result<(), StorageError> {
        self.earned[zone.index()] = earned;
        let value = if earned { BADGE_EARNED } else { BADGE_UNEARNED };
        self.store.set_int(&zone.badge_key(), value)?;
        self.store.flush()
    }

    /// Persist every flag and flush once.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot write or flush.
    pub fn save(&mut self) -> Result<(), StorageError> {
        for zone in ZoneId::ALL {
            let value = if self.is_earned(zone) {
                BADGE_EARNED
            } else {
                BADGE_UNEARNED
            };
            self.store.set_int(&zone.badge_key(), value)?;
        }
        self.store.flush()
    }

    /// Clear every badge and persist the cleared record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot write or flush.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.earned = [false; ZoneId::COUNT];
        self.save()
    }
}
