//! Core domain logic for the BirdSpot app.
//! Fetches nearby bird observations, ranks them by distance and rarity and
//! decides which sightings deserve a notification.

pub mod db;
pub mod geo;
pub mod location;
pub mod logging;
pub mod model;
pub mod notify;
pub mod provider;
pub mod service;
pub mod settings;

pub use geo::distance_km;
pub use location::{current_location, LocationError, LocationSource};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::coordinates::{Coordinates, ObservationQuery};
pub use model::observation::{NotificationKey, Observation, ObservationLocation, Species};
pub use model::rarity::{all_levels, level_for, RarityLevel, MAX_RARITY_ID};
pub use notify::{
    evaluate, is_rare_bird, DispatchReport, NotificationError, NotificationRequest,
    NotificationSink, PermissionStatus, RareBirdNotifier,
};
pub use provider::client::WaarnemingClient;
pub use provider::{ClientConfig, FetchError, FetchResult, ObservationProvider, ObservationSource};
pub use service::bird_watch::{display_filter, BirdWatchService, RefreshOutcome};
pub use service::RefreshPolicy;
pub use settings::kv::{KeyValueStore, KvError, MemoryKeyValueStore, SqliteKeyValueStore};
pub use settings::{
    radius_options, AppSettings, RadiusOption, SearchRadius, SettingUpdate, SettingsError,
    SettingsStore,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
