//! Settings store with subscribe/notify.

use super::kv::{KeyValueStore, KvError};
use super::model::{AppSettings, SettingUpdate, SettingValidationError};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Storage key holding the serialized settings blob.
pub const SETTINGS_KEY: &str = "birdspot.settings";

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug)]
pub enum SettingsError {
    Validation(SettingValidationError),
    Persistence(KvError),
    Serialization(serde_json::Error),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "failed to persist settings: {err}"),
            Self::Serialization(err) => write!(f, "failed to serialize settings: {err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::Serialization(err) => Some(err),
        }
    }
}

impl From<SettingValidationError> for SettingsError {
    fn from(value: SettingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<KvError> for SettingsError {
    fn from(value: KvError) -> Self {
        Self::Persistence(value)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Explicit settings store, constructed once and shared with consumers.
pub struct SettingsStore<K: KeyValueStore> {
    kv: K,
    snapshot: Mutex<AppSettings>,
    updates: watch::Sender<AppSettings>,
    clock: Clock,
}

impl<K: KeyValueStore> SettingsStore<K> {
    /// Creates the store and loads the persisted snapshot.
    pub fn open(kv: K) -> Self {
        Self::with_clock(kv, Box::new(Utc::now))
    }

    pub fn with_clock(kv: K, clock: Clock) -> Self {
        let initial = AppSettings::defaults(clock());
        let (updates, _) = watch::channel(initial.clone());
        let store = Self {
            kv,
            snapshot: Mutex::new(initial),
            updates,
            clock,
        };
        store.load();
        store
    }

    /// Re-reads persisted state merged over defaults.
    ///
    /// Read or parse failures are logged and resolve to defaults.
    pub fn load(&self) -> AppSettings {
        let mut snapshot = self.snapshot();
        let loaded = self.read_persisted();
        *snapshot = loaded.clone();
        self.updates.send_replace(loaded.clone());
        loaded
    }

    /// Returns the in-memory snapshot without touching storage.
    pub fn current(&self) -> AppSettings {
        self.snapshot().clone()
    }

    /// Applies one field change, stamps `last_updated` and persists.
    ///
    /// Out-of-range values are rejected before anything is written.
    pub fn update(&self, update: SettingUpdate) -> SettingsResult<AppSettings> {
        let update = update.validate()?;
        let mut snapshot = self.snapshot();
        let mut next = snapshot.with_update(update);
        next.last_updated = (self.clock)();

        let blob = serde_json::to_string(&next)?;
        if let Err(err) = self.kv.set(SETTINGS_KEY, &blob) {
            error!(
                "event=settings_update module=settings status=error key={} error={}",
                update.key(),
                err
            );
            return Err(err.into());
        }

        *snapshot = next.clone();
        self.updates.send_replace(next.clone());
        info!(
            "event=settings_update module=settings status=ok key={}",
            update.key()
        );
        Ok(next)
    }

    /// Validates an untyped `(key, value)` pair, then updates.
    pub fn update_raw(&self, key: &str, value: &Value) -> SettingsResult<AppSettings> {
        let update = SettingUpdate::parse(key, value)?;
        self.update(update)
    }

    /// Clears persisted state and returns defaults.
    pub fn reset(&self) -> SettingsResult<AppSettings> {
        let mut snapshot = self.snapshot();
        if let Err(err) = self.kv.remove(SETTINGS_KEY) {
            error!(
                "event=settings_reset module=settings status=error error={}",
                err
            );
            return Err(err.into());
        }

        let defaults = AppSettings::defaults((self.clock)());
        *snapshot = defaults.clone();
        self.updates.send_replace(defaults.clone());
        info!("event=settings_reset module=settings status=ok");
        Ok(defaults)
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Receiver that observes every committed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.updates.subscribe()
    }

    fn read_persisted(&self) -> AppSettings {
        let now = (self.clock)();
        let raw = match self.kv.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("event=settings_load module=settings status=ok source=defaults");
                return AppSettings::defaults(now);
            }
            Err(err) => {
                warn!(
                    "event=settings_load module=settings status=error source=defaults error={}",
                    err
                );
                return AppSettings::defaults(now);
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(blob) => {
                info!("event=settings_load module=settings status=ok source=persisted");
                AppSettings::merge_persisted(&blob, now)
            }
            Err(err) => {
                warn!(
                    "event=settings_load module=settings status=error source=defaults error={}",
                    err
                );
                AppSettings::defaults(now)
            }
        }
    }

    fn snapshot(&self) -> MutexGuard<'_, AppSettings> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
