//! Centralized constants for Drillyard progression logic.
//!
//! Scene names, storage keys and load thresholds live here so the engine
//! glue and the core agree on them without a config round-trip.

// Storage -------------------------------------------------------------------
/// Prefix for per-zone badge flags in the persisted key-value store.
pub const BADGE_KEY_PREFIX: &str = "Badge_";
pub(crate) const BADGE_EARNED: i32 = 1;
pub(crate) const BADGE_UNEARNED: i32 = 0;

// Scenes --------------------------------------------------------------------
pub const HUB_SCENE: &str = "Hub";
pub const GRADUATION_SCENE: &str = "Graduation";
pub const MAIN_MENU_SCENE: &str = "MainMenu";
pub(crate) const ZONE_SCENE_PREFIX: &str = "Zone_";

// Loading -------------------------------------------------------------------
/// Progress fraction at which a pending scene load is allowed to activate.
pub const SCENE_ACTIVATION_THRESHOLD: f32 = 0.9;

// Anomalies -----------------------------------------------------------------
pub(crate) const NEUTRAL_SPEED_MULTIPLIER: f32 = 1.0;
