//! Raw provider records to validated observations.
//!
//! # Responsibility
//! - Map loosely-shaped JSON records onto `Observation`.
//! - Compute distance from the query center and attach rarity metadata.
//!
//! # Invariants
//! - One input record always yields exactly one observation; missing or
//!   malformed fields are defaulted, never dropped.
//! - Output is sorted ascending by distance with input order kept for ties.
//! - A field counts as missing when absent, `null`, zero or empty, matching
//!   the provider's own falsy conventions.

use crate::geo::{distance_km, round_km};
use crate::model::coordinates::ObservationQuery;
use crate::model::observation::{Observation, ObservationLocation, Species};
use crate::model::rarity::level_for;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

pub const UNKNOWN_LOCATION_NAME: &str = "Onbekende locatie";
const UNKNOWN_SPECIES_PREFIX: &str = "Onbekende vogel";
const OBSERVER_PREFIX: &str = "Waarnemer";
const UNKNOWN_OBSERVER: &str = "onbekend";
const SPECIES_ID_BASE: u64 = 100;

/// Normalizes every record and sorts the result nearest-first.
pub fn normalize_records(records: &[Value], query: &ObservationQuery) -> Vec<Observation> {
    let mut observations = records
        .iter()
        .enumerate()
        .map(|(index, record)| normalize_record(index, record, query))
        .collect::<Vec<_>>();
    sort_by_distance(&mut observations);
    observations
}

/// Stable ascending sort on distance; absent distances sort first as zero.
pub fn sort_by_distance(observations: &mut [Observation]) {
    observations.sort_by(|a, b| {
        a.distance_km
            .unwrap_or(0.0)
            .total_cmp(&b.distance_km.unwrap_or(0.0))
    });
}

fn normalize_record(index: usize, record: &Value, query: &ObservationQuery) -> Observation {
    let position = index as u64;
    let lat = non_zero_f64(record.pointer("/point/coordinates/1")).unwrap_or(0.0);
    let lng = non_zero_f64(record.pointer("/point/coordinates/0")).unwrap_or(0.0);
    let distance = distance_km(query.center.latitude, query.center.longitude, lat, lng);

    let species = Species {
        id: positive_u64(record.pointer("/species_detail/id"))
            .unwrap_or(SPECIES_ID_BASE + position),
        name: non_empty_str(record.pointer("/species_detail/name"))
            .unwrap_or_else(|| format!("{UNKNOWN_SPECIES_PREFIX} {}", position + 1)),
        scientific_name: non_empty_str(record.pointer("/species_detail/scientific_name"))
            .unwrap_or_default(),
        photo_url: photo_url(record),
    };

    let location = ObservationLocation {
        lat,
        lng,
        name: non_empty_str(record.pointer("/location_detail/name"))
            .unwrap_or_else(|| UNKNOWN_LOCATION_NAME.to_string()),
    };

    Observation {
        id: positive_u64(record.get("id")).unwrap_or(position + 1),
        species,
        observed_at: observed_at(record, query.date_to),
        location,
        observer: observer_label(record.get("user")),
        distance_km: Some(round_km(distance)),
        rarity: level_for(integer(record.get("rarity")).unwrap_or(0)),
    }
}

/// Joins `date` and `time` into a local timestamp; midnight when time is absent.
fn observed_at(record: &Value, fallback_day: NaiveDate) -> NaiveDateTime {
    let day = record
        .get("date")
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        .unwrap_or(fallback_day);
    let time = record
        .get("time")
        .and_then(Value::as_str)
        .and_then(parse_time)
        .unwrap_or(NaiveTime::MIN);
    day.and_time(time)
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
}

fn photo_url(record: &Value) -> Option<String> {
    let has_photo = record
        .get("has_photo")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !has_photo {
        return None;
    }
    non_empty_str(record.get("permalink"))
}

fn observer_label(user: Option<&Value>) -> String {
    let who = match user {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => UNKNOWN_OBSERVER.to_string(),
    };
    format!("{OBSERVER_PREFIX} {who}")
}

fn non_zero_f64(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|number| number.is_finite() && *number != 0.0)
}

fn integer(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|raw| raw.trim().parse().ok()))
}

fn positive_u64(value: Option<&Value>) -> Option<u64> {
    integer(value).and_then(|number| u64::try_from(number).ok().filter(|id| *id > 0))
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{normalize_records, UNKNOWN_LOCATION_NAME};
    use crate::model::coordinates::{Coordinates, ObservationQuery};
    use chrono::NaiveDate;
    use serde_json::json;

    fn query() -> ObservationQuery {
        let day = NaiveDate::from_ymd_opt(2024, 4, 20).expect("valid date");
        ObservationQuery::for_day(Coordinates::new(52.0907, 5.1214), 5.0, day)
    }

    #[test]
    fn empty_record_gets_placeholders() {
        let observations = normalize_records(&[json!({})], &query());
        let obs = &observations[0];
        assert_eq!(obs.id, 1);
        assert_eq!(obs.species.id, 100);
        assert_eq!(obs.species.name, "Onbekende vogel 1");
        assert_eq!(obs.species.scientific_name, "");
        assert_eq!(obs.location.name, UNKNOWN_LOCATION_NAME);
        assert_eq!(obs.rarity.id, 0);
        assert_eq!(obs.observer, "Waarnemer onbekend");
        assert_eq!(obs.observed_at.to_string(), "2024-04-20 00:00:00");
        assert!(obs.distance_km.expect("distance is computed") >= 0.0);
    }

    #[test]
    fn full_record_is_mapped() {
        let record = json!({
            "id": 987,
            "species_detail": {"id": 55, "name": "Ijsvogel", "scientific_name": "Alcedo atthis"},
            "point": {"coordinates": [5.1214, 52.0907]},
            "location_detail": {"name": "Kromme Rijn"},
            "date": "2024-04-19",
            "time": "07:45",
            "rarity": 3,
            "user": 4411,
            "has_photo": true,
            "permalink": "https://waarneming.nl/observation/987/"
        });
        let obs = &normalize_records(&[record], &query())[0];
        assert_eq!(obs.id, 987);
        assert_eq!(obs.species.name, "Ijsvogel");
        assert_eq!(obs.species.scientific_name, "Alcedo atthis");
        assert_eq!(
            obs.species.photo_url.as_deref(),
            Some("https://waarneming.nl/observation/987/")
        );
        assert_eq!(obs.location.name, "Kromme Rijn");
        assert_eq!(obs.observed_at.to_string(), "2024-04-19 07:45:00");
        assert_eq!(obs.rarity.name, "zeldzaam");
        assert_eq!(obs.observer, "Waarnemer 4411");
        assert_eq!(obs.distance_km, Some(0.0));
    }

    #[test]
    fn unknown_rarity_and_malformed_fields_are_defaulted() {
        let record = json!({
            "rarity": 9,
            "point": {"coordinates": "not-an-array"},
            "species_detail": {"id": "abc", "name": ""},
            "time": "later",
            "date": "yesterday"
        });
        let obs = &normalize_records(&[json!({}), record], &query())[1];
        assert_eq!(obs.rarity.id, 0);
        assert_eq!(obs.species.id, 101);
        assert_eq!(obs.species.name, "Onbekende vogel 2");
        assert_eq!(obs.location.lat, 0.0);
        assert_eq!(obs.observed_at.to_string(), "2024-04-20 00:00:00");
    }

    #[test]
    fn photo_requires_has_photo_flag() {
        let record = json!({"permalink": "https://example.org/p/1", "has_photo": false});
        let obs = &normalize_records(&[record], &query())[0];
        assert!(obs.species.photo_url.is_none());
    }
}
