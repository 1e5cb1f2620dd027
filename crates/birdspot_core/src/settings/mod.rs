//! User preference storage.
//!
//! # Responsibility
//! - Hold the per-installation `AppSettings` snapshot.
//! - Persist every mutation immediately as one JSON blob.
//! - Broadcast committed snapshots to subscribers.
//!
//! # Invariants
//! - Loading never fails; unreadable state resolves to defaults.
//! - Update/reset either persist and swap the snapshot, or change nothing.

pub mod kv;
mod model;
mod store;

pub use model::{
    radius_options, AppSettings, InvalidRadius, RadiusOption, SearchRadius, SettingUpdate,
    SettingValidationError, DEFAULT_MIN_RARITY_LEVEL,
};
pub use store::{SettingsError, SettingsResult, SettingsStore, SETTINGS_KEY};
