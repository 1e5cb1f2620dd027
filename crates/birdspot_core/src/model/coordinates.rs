//! Coordinates and per-fetch query shapes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Species group id the provider uses for birds.
pub const BIRDS_SPECIES_GROUP: &str = "1";

/// Immutable WGS84 position with optional accuracy in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

/// Input for one observation fetch. Constructed per request, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationQuery {
    pub center: Coordinates,
    pub radius_km: f64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub species_group: String,
}

impl ObservationQuery {
    /// Builds a bird query covering the single day `today`.
    pub fn for_day(center: Coordinates, radius_km: f64, today: NaiveDate) -> Self {
        Self {
            center,
            radius_km,
            date_from: today,
            date_to: today,
            species_group: BIRDS_SPECIES_GROUP.to_string(),
        }
    }

    /// Radius in the provider's unit (whole meters).
    pub fn radius_meters(&self) -> u64 {
        (self.radius_km.max(0.0) * 1000.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::{Coordinates, ObservationQuery};
    use chrono::NaiveDate;

    #[test]
    fn radius_is_converted_to_whole_meters() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
        let query = ObservationQuery::for_day(Coordinates::new(52.0, 5.0), 2.5, day);
        assert_eq!(query.radius_meters(), 2500);
        assert_eq!(query.species_group, "1");
        assert_eq!(query.date_from, query.date_to);
    }
}
