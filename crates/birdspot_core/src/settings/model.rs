//! User preference model, validation and merge-on-load.
//!
//! # Invariants
//! - `search_radius` is always one of the enumerated radius options.
//! - Rarity thresholds are always within `0..=MAX_RARITY_ID`.
//! - Persisted blobs are merged field-by-field over defaults; invalid or
//!   missing fields fall back to their default.

use crate::model::rarity::MAX_RARITY_ID;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

pub const DEFAULT_MIN_RARITY_LEVEL: u8 = 0;
pub const DEFAULT_NOTIFICATION_MIN_RARITY: u8 = crate::notify::DEFAULT_NOTIFICATION_MIN_RARITY;

/// Search radius options in kilometers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SearchRadius {
    Km1,
    Km2,
    Km5,
    Km10,
    Km20,
}

impl SearchRadius {
    pub const ALL: [SearchRadius; 5] = [
        SearchRadius::Km1,
        SearchRadius::Km2,
        SearchRadius::Km5,
        SearchRadius::Km10,
        SearchRadius::Km20,
    ];

    pub fn km(self) -> u32 {
        match self {
            Self::Km1 => 1,
            Self::Km2 => 2,
            Self::Km5 => 5,
            Self::Km10 => 10,
            Self::Km20 => 20,
        }
    }

    pub fn label(self) -> String {
        format!("{} km", self.km())
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self::Km2
    }
}

impl TryFrom<u32> for SearchRadius {
    type Error = InvalidRadius;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|radius| radius.km() == value)
            .ok_or(InvalidRadius(value))
    }
}

impl From<SearchRadius> for u32 {
    fn from(value: SearchRadius) -> Self {
        value.km()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRadius(pub u32);

impl Display for InvalidRadius {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid search radius {} km; expected 1|2|5|10|20", self.0)
    }
}

/// Labelled radius choice for settings pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadiusOption {
    pub label: String,
    pub value: u32,
}

pub fn radius_options() -> Vec<RadiusOption> {
    SearchRadius::ALL
        .into_iter()
        .map(|radius| RadiusOption {
            label: radius.label(),
            value: radius.km(),
        })
        .collect()
}

/// Per-installation user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub notifications_enabled: bool,
    pub search_radius: SearchRadius,
    pub rarebirds_only: bool,
    /// Minimum rarity shown in the list (0 shows everything).
    pub min_rarity_level: u8,
    pub notification_min_rarity: u8,
    pub last_updated: DateTime<Utc>,
}

impl AppSettings {
    pub fn defaults(now: DateTime<Utc>) -> Self {
        Self {
            notifications_enabled: true,
            search_radius: SearchRadius::default(),
            rarebirds_only: false,
            min_rarity_level: DEFAULT_MIN_RARITY_LEVEL,
            notification_min_rarity: DEFAULT_NOTIFICATION_MIN_RARITY,
            last_updated: now,
        }
    }

    /// Merges a persisted JSON blob over defaults.
    ///
    /// Fields that are missing, mistyped or outside their domain keep the
    /// default so blobs written by older builds still load.
    pub fn merge_persisted(blob: &Value, now: DateTime<Utc>) -> Self {
        let mut settings = Self::defaults(now);
        let Some(map) = blob.as_object() else {
            warn!("event=settings_merge module=settings status=defaulted reason=not_an_object");
            return settings;
        };

        if let Some(value) = field(map, "notificationsEnabled", Value::as_bool) {
            settings.notifications_enabled = value;
        }
        if let Some(value) = field(map, "searchRadius", parse_radius) {
            settings.search_radius = value;
        }
        if let Some(value) = field(map, "rarebirdsOnly", Value::as_bool) {
            settings.rarebirds_only = value;
        }
        if let Some(value) = field(map, "minRarityLevel", parse_rarity) {
            settings.min_rarity_level = value;
        }
        if let Some(value) = field(map, "notificationMinRarity", parse_rarity) {
            settings.notification_min_rarity = value;
        }
        if let Some(value) = field(map, "lastUpdated", parse_instant) {
            settings.last_updated = value;
        }
        settings
    }

    /// Returns a copy with `update` applied.
    pub fn with_update(&self, update: SettingUpdate) -> Self {
        let mut next = self.clone();
        match update {
            SettingUpdate::NotificationsEnabled(value) => next.notifications_enabled = value,
            SettingUpdate::SearchRadius(value) => next.search_radius = value,
            SettingUpdate::RarebirdsOnly(value) => next.rarebirds_only = value,
            SettingUpdate::MinRarityLevel(value) => next.min_rarity_level = value,
            SettingUpdate::NotificationMinRarity(value) => next.notification_min_rarity = value,
        }
        next
    }
}

fn field<T>(map: &Map<String, Value>, key: &str, parse: impl Fn(&Value) -> Option<T>) -> Option<T> {
    let raw = map.get(key)?;
    let parsed = parse(raw);
    if parsed.is_none() {
        warn!(
            "event=settings_merge module=settings status=coerced field={} value={}",
            key, raw
        );
    }
    parsed
}

fn parse_radius(value: &Value) -> Option<SearchRadius> {
    let km = u32::try_from(value.as_u64()?).ok()?;
    SearchRadius::try_from(km).ok()
}

fn parse_rarity(value: &Value) -> Option<u8> {
    u8::try_from(value.as_u64()?)
        .ok()
        .filter(|id| *id <= MAX_RARITY_ID)
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}

/// Single-field mutation of `AppSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingUpdate {
    NotificationsEnabled(bool),
    SearchRadius(SearchRadius),
    RarebirdsOnly(bool),
    MinRarityLevel(u8),
    NotificationMinRarity(u8),
}

impl SettingUpdate {
    /// Validates an untyped `(key, value)` pair from UI or FFI callers.
    pub fn parse(key: &str, value: &Value) -> Result<Self, SettingValidationError> {
        let invalid = || SettingValidationError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "notificationsEnabled" => value
                .as_bool()
                .map(Self::NotificationsEnabled)
                .ok_or_else(invalid),
            "searchRadius" => parse_radius(value)
                .map(Self::SearchRadius)
                .ok_or_else(invalid),
            "rarebirdsOnly" => value.as_bool().map(Self::RarebirdsOnly).ok_or_else(invalid),
            "minRarityLevel" => parse_rarity(value)
                .map(Self::MinRarityLevel)
                .ok_or_else(invalid),
            "notificationMinRarity" => parse_rarity(value)
                .map(Self::NotificationMinRarity)
                .ok_or_else(invalid),
            other => Err(SettingValidationError::UnknownKey(other.to_string())),
        }
    }

    /// Rejects rarity thresholds above `MAX_RARITY_ID`.
    pub fn validate(self) -> Result<Self, SettingValidationError> {
        match self {
            Self::MinRarityLevel(id) | Self::NotificationMinRarity(id) if id > MAX_RARITY_ID => {
                Err(SettingValidationError::InvalidValue {
                    key: self.key().to_string(),
                    value: id.to_string(),
                })
            }
            other => Ok(other),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::NotificationsEnabled(_) => "notificationsEnabled",
            Self::SearchRadius(_) => "searchRadius",
            Self::RarebirdsOnly(_) => "rarebirdsOnly",
            Self::MinRarityLevel(_) => "minRarityLevel",
            Self::NotificationMinRarity(_) => "notificationMinRarity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValidationError {
    UnknownKey(String),
    InvalidValue { key: String, value: String },
}

impl Display for SettingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "unknown setting `{key}`"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for setting `{key}`")
            }
        }
    }
}

impl std::error::Error for SettingValidationError {}
