//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose settings, observation refresh and notification bridging to Dart.
//! - Own the process-wide service, preference DB and async runtime.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures come back as envelopes with `ok=false` and a message.
//! - Network-bound calls are not `sync`, so they never run on the UI thread.

use crate::notifications::QueuedNotificationSink;
use birdspot_core::{
    all_levels, core_version as core_version_inner, default_log_level,
    init_logging as init_logging_inner,
    ping as ping_inner, radius_options as radius_options_inner, AppSettings, BirdWatchService,
    ClientConfig, Coordinates, Observation, ObservationProvider, PermissionStatus,
    RareBirdNotifier, RefreshOutcome, SettingsStore, SqliteKeyValueStore, WaarnemingClient,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::future::Future;
use std::path::PathBuf;
use tokio::runtime::{Builder, Runtime};

const DB_FILE_NAME: &str = "birdspot_prefs.sqlite3";

type AppService = BirdWatchService<WaarnemingClient, QueuedNotificationSink, SqliteKeyValueStore>;

static DB_PATH: OnceCell<PathBuf> = OnceCell::new();
static SERVICE: OnceCell<AppService> = OnceCell::new();
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive);
///   blank selects the build default (`debug` in debug builds, else `info`).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let level = if level.trim().is_empty() {
        default_log_level()
    } else {
        level.as_str()
    };
    match init_logging_inner(level, log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Sets the preference database file before first use.
///
/// Input semantics:
/// - `db_path`: absolute file path, normally inside the app support directory.
///
/// # FFI contract
/// - Sync call, no I/O; the file is opened lazily on first service use.
/// - Repeating the same path is a no-op; a different path is rejected.
/// - Without this call the database lives in the system temp directory.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_storage(db_path: String) -> String {
    let requested = PathBuf::from(db_path.trim());
    if requested.as_os_str().is_empty() || requested.is_relative() {
        return format!("init_storage failed: `{db_path}` is not an absolute path");
    }
    let active = DB_PATH.get_or_init(|| requested.clone());
    if *active != requested {
        return format!(
            "init_storage failed: storage already bound to {}",
            active.display()
        );
    }
    String::new()
}

/// One row of the rarity legend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityItem {
    pub id: u8,
    pub name: String,
    /// Hex color (`#rrggbb`).
    pub color: String,
    pub emoji: String,
}

/// One choice of the search radius picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadiusItem {
    pub label: String,
    pub km: u32,
}

/// Flattened settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub notifications_enabled: bool,
    pub search_radius_km: u32,
    pub rarebirds_only: bool,
    pub min_rarity_level: u8,
    pub notification_min_rarity: u8,
    /// RFC 3339 timestamp in UTC.
    pub last_updated: String,
}

/// Settings response envelope; `settings` is `None` only when the store failed to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsResponse {
    pub ok: bool,
    pub settings: Option<SettingsSnapshot>,
    pub message: String,
}

/// Display-ready observation row.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationItem {
    pub id: u64,
    pub species_id: u64,
    pub species_name: String,
    pub scientific_name: String,
    pub photo_url: Option<String>,
    /// Local ISO-8601 timestamp without offset.
    pub observed_at: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub observer: String,
    pub distance_km: Option<f64>,
    pub rarity_id: u8,
    pub rarity_name: String,
    pub rarity_color: String,
}

/// Observation list envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationsResponse {
    pub ok: bool,
    /// `updated|skipped|superseded|cached|failed`.
    pub status: String,
    /// Visible observations, nearest first.
    pub items: Vec<ObservationItem>,
    /// Count before the display filter.
    pub total: u32,
    /// Rare-bird notifications queued by this refresh.
    pub notifications_queued: u32,
    pub message: String,
}

impl ObservationsResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: "failed".to_string(),
            items: Vec::new(),
            total: 0,
            notifications_queued: 0,
            message: message.into(),
        }
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Notification that Dart should schedule with the platform plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub identifier: String,
    pub title: String,
    pub body: String,
    /// JSON object attached as the notification payload.
    pub data_json: String,
}

/// Returns the rarity legend ordered by id.
#[flutter_rust_bridge::frb(sync)]
pub fn rarity_levels() -> Vec<RarityItem> {
    all_levels()
        .into_iter()
        .map(|level| RarityItem {
            id: level.id,
            name: level.name,
            color: level.color,
            emoji: level.emoji,
        })
        .collect()
}

/// Returns the selectable search radii.
#[flutter_rust_bridge::frb(sync)]
pub fn radius_options() -> Vec<RadiusItem> {
    radius_options_inner()
        .into_iter()
        .map(|option| RadiusItem {
            label: option.label,
            km: option.value,
        })
        .collect()
}

/// Re-reads persisted settings merged over defaults.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Storage failures resolve to defaults inside core.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_load() -> SettingsResponse {
    match service() {
        Ok(service) => SettingsResponse {
            ok: true,
            settings: Some(to_settings_snapshot(&service.settings().load())),
            message: "Settings loaded.".to_string(),
        },
        Err(err) => settings_failure(None, format!("settings_load failed: {err}")),
    }
}

/// Validates and persists one settings field.
///
/// Input semantics:
/// - `key`: camelCase field name (e.g. `searchRadius`).
/// - `json_value`: JSON literal for the new value (e.g. `5`, `true`).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Invalid input or a failed write leaves the stored snapshot unchanged.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_update(key: String, json_value: String) -> SettingsResponse {
    let service = match service() {
        Ok(service) => service,
        Err(err) => return settings_failure(None, format!("settings_update failed: {err}")),
    };
    let store = service.settings();

    let value = match serde_json::from_str::<serde_json::Value>(json_value.trim()) {
        Ok(value) => value,
        Err(err) => {
            return settings_failure(
                Some(store.current()),
                format!("settings_update failed: invalid JSON value: {err}"),
            );
        }
    };

    match store.update_raw(key.trim(), &value) {
        Ok(settings) => SettingsResponse {
            ok: true,
            settings: Some(to_settings_snapshot(&settings)),
            message: "Settings updated.".to_string(),
        },
        Err(err) => settings_failure(
            Some(store.current()),
            format!("settings_update failed: {err}"),
        ),
    }
}

/// Clears persisted settings and returns defaults.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_reset() -> SettingsResponse {
    let service = match service() {
        Ok(service) => service,
        Err(err) => return settings_failure(None, format!("settings_reset failed: {err}")),
    };
    match service.settings().reset() {
        Ok(settings) => SettingsResponse {
            ok: true,
            settings: Some(to_settings_snapshot(&settings)),
            message: "Settings reset.".to_string(),
        },
        Err(err) => settings_failure(
            Some(service.settings().current()),
            format!("settings_reset failed: {err}"),
        ),
    }
}

/// Refreshes observations around a device position.
///
/// Input semantics:
/// - `latitude`/`longitude`: WGS84 degrees.
/// - `accuracy`: reported accuracy in meters, if known.
/// - `force`: refetch even when position and radius are unchanged.
///
/// # FFI contract
/// - Async from Dart's perspective; blocks a worker thread on network I/O.
/// - Provider failures fall back to mock sightings inside core, so `ok`
///   is only false for invalid input or bootstrap failures.
pub fn observations_refresh(
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    force: bool,
) -> ObservationsResponse {
    if !valid_coordinate(latitude, 90.0) || !valid_coordinate(longitude, 180.0) {
        return ObservationsResponse::failure(format!(
            "observations_refresh failed: invalid position {latitude},{longitude}"
        ));
    }
    let mut location = Coordinates::new(latitude, longitude);
    if let Some(accuracy) = accuracy.filter(|value| value.is_finite() && *value >= 0.0) {
        location = location.with_accuracy(accuracy);
    }

    let service = match service() {
        Ok(service) => service,
        Err(err) => {
            return ObservationsResponse::failure(format!("observations_refresh failed: {err}"))
        }
    };
    let outcome = match block_on(service.refresh(location, force)) {
        Ok(outcome) => outcome,
        Err(err) => {
            return ObservationsResponse::failure(format!("observations_refresh failed: {err}"))
        }
    };

    match outcome {
        RefreshOutcome::Updated {
            visible,
            total,
            notifications,
            ..
        } => {
            let queued = notifications.map_or(0, |report| report.sent.len());
            ObservationsResponse {
                ok: true,
                status: "updated".to_string(),
                message: format!("Showing {} of {} observation(s).", visible.len(), total),
                items: visible.iter().map(to_observation_item).collect(),
                total: count(total),
                notifications_queued: count(queued),
            }
        }
        RefreshOutcome::Skipped => cached_response(service, "skipped", "Position unchanged."),
        RefreshOutcome::Superseded(_) => {
            cached_response(service, "superseded", "A newer refresh replaced this one.")
        }
    }
}

/// Returns the last committed observations under the current display filter.
#[flutter_rust_bridge::frb(sync)]
pub fn observations_visible() -> ObservationsResponse {
    match service() {
        Ok(service) => cached_response(service, "cached", "Cached observations."),
        Err(err) => ObservationsResponse::failure(format!("observations_visible failed: {err}")),
    }
}

/// Probes the observation API without fetching data.
pub fn api_test_connection() -> ActionResponse {
    let service = match service() {
        Ok(service) => service,
        Err(err) => return ActionResponse::failure(format!("api_test_connection failed: {err}")),
    };
    match block_on(service.provider().test_connection()) {
        Ok(true) => ActionResponse::success("API reachable."),
        Ok(false) => ActionResponse::failure("API unreachable."),
        Err(err) => ActionResponse::failure(format!("api_test_connection failed: {err}")),
    }
}

/// Records the notification permission reported by the platform.
///
/// Input semantics:
/// - `status`: `granted|denied|undetermined`; anything else is undetermined.
#[flutter_rust_bridge::frb(sync)]
pub fn notifications_set_permission(status: String) -> ActionResponse {
    let service = match service() {
        Ok(service) => service,
        Err(err) => {
            return ActionResponse::failure(format!("notifications_set_permission failed: {err}"))
        }
    };
    let status = PermissionStatus::parse(&status);
    service.notifier().sink().set_permission(status);
    info!(
        "event=notification_permission module=ffi status=ok permission={}",
        status.as_str()
    );
    ActionResponse::success(format!("Permission {}.", status.as_str()))
}

/// Queues the fixed test notification.
pub fn notifications_send_test() -> ActionResponse {
    let service = match service() {
        Ok(service) => service,
        Err(err) => {
            return ActionResponse::failure(format!("notifications_send_test failed: {err}"))
        }
    };
    match block_on(service.notifier().send_test_notification()) {
        Ok(Ok(())) => ActionResponse::success("Test notification queued."),
        Ok(Err(err)) => ActionResponse::failure(format!("notifications_send_test failed: {err}")),
        Err(err) => ActionResponse::failure(format!("notifications_send_test failed: {err}")),
    }
}

/// Forgets which sightings were already notified.
#[flutter_rust_bridge::frb(sync)]
pub fn notifications_clear_history() -> ActionResponse {
    match service() {
        Ok(service) => {
            service.notifier().clear_history();
            ActionResponse::success("Notification history cleared.")
        }
        Err(err) => {
            ActionResponse::failure(format!("notifications_clear_history failed: {err}"))
        }
    }
}

/// Removes and returns the notifications Dart should schedule now.
///
/// # FFI contract
/// - Sync call, memory-only.
/// - Each request is returned exactly once.
#[flutter_rust_bridge::frb(sync)]
pub fn notifications_drain_pending() -> Vec<PendingNotification> {
    match service() {
        Ok(service) => service
            .notifier()
            .sink()
            .drain()
            .into_iter()
            .map(|request| PendingNotification {
                identifier: request.identifier,
                title: request.title,
                body: request.body,
                data_json: request.data.to_string(),
            })
            .collect(),
        Err(err) => {
            error!(
                "event=notifications_drain module=ffi status=error error={}",
                err
            );
            Vec::new()
        }
    }
}

fn service() -> Result<&'static AppService, String> {
    SERVICE.get_or_try_init(|| {
        let db_path = resolve_db_path();
        let kv = SqliteKeyValueStore::open(&db_path)
            .map_err(|err| format!("preference DB open failed: {err}"))?;
        let provider = ObservationProvider::live(ClientConfig::default())
            .map_err(|err| format!("observation client init failed: {err}"))?;
        info!(
            "event=service_init module=ffi status=ok db_path={}",
            db_path.display()
        );
        Ok(BirdWatchService::new(
            provider,
            RareBirdNotifier::new(QueuedNotificationSink::new()),
            SettingsStore::open(kv),
        ))
    })
}

fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .enable_all()
            .thread_name("birdspot-core")
            .build()
            .map_err(|err| format!("async runtime init failed: {err}"))
    })?;
    Ok(runtime.block_on(future))
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| std::env::temp_dir().join(DB_FILE_NAME))
        .clone()
}

fn cached_response(service: &AppService, status: &str, message: &str) -> ObservationsResponse {
    let total = service.observations().len();
    let visible = service.visible_observations();
    ObservationsResponse {
        ok: true,
        status: status.to_string(),
        items: visible.iter().map(to_observation_item).collect(),
        total: count(total),
        notifications_queued: 0,
        message: message.to_string(),
    }
}

fn settings_failure(current: Option<AppSettings>, message: String) -> SettingsResponse {
    error!("event=settings_ffi module=ffi status=error error={}", message);
    SettingsResponse {
        ok: false,
        settings: current.as_ref().map(to_settings_snapshot),
        message,
    }
}

fn to_settings_snapshot(settings: &AppSettings) -> SettingsSnapshot {
    SettingsSnapshot {
        notifications_enabled: settings.notifications_enabled,
        search_radius_km: settings.search_radius.km(),
        rarebirds_only: settings.rarebirds_only,
        min_rarity_level: settings.min_rarity_level,
        notification_min_rarity: settings.notification_min_rarity,
        last_updated: settings.last_updated.to_rfc3339(),
    }
}

fn to_observation_item(observation: &Observation) -> ObservationItem {
    ObservationItem {
        id: observation.id,
        species_id: observation.species.id,
        species_name: observation.species.name.clone(),
        scientific_name: observation.species.scientific_name.clone(),
        photo_url: observation.species.photo_url.clone(),
        observed_at: observation
            .observed_at
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
        latitude: observation.location.lat,
        longitude: observation.location.lng,
        location_name: observation.location.name.clone(),
        observer: observation.observer.clone(),
        distance_km: observation.distance_km,
        rarity_id: observation.rarity.id,
        rarity_name: observation.rarity.name.clone(),
        rarity_color: observation.rarity.color.clone(),
    }
}

fn valid_coordinate(value: f64, bound: f64) -> bool {
    value.is_finite() && value.abs() <= bound
}

fn count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
