//! Normalized observation record.

use crate::model::rarity::RarityLevel;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub id: u64,
    pub name: String,
    pub scientific_name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationLocation {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
}

/// One reported sighting, enriched with distance and rarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Unique within one fetch.
    pub id: u64,
    pub species: Species,
    /// Local wall-clock time of the sighting; no offset is attached.
    pub observed_at: NaiveDateTime,
    pub location: ObservationLocation,
    pub observer: String,
    /// Kilometers from the user, rounded to two decimals.
    pub distance_km: Option<f64>,
    pub rarity: RarityLevel,
}

impl Observation {
    /// Deduplication key for rare-bird notifications.
    pub fn notification_key(&self) -> NotificationKey {
        NotificationKey {
            species_id: self.species.id,
            observation_id: self.id,
        }
    }
}

/// Stable `(species id, observation id)` pair identifying one sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationKey {
    pub species_id: u64,
    pub observation_id: u64,
}

impl Display for NotificationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.species_id, self.observation_id)
    }
}
