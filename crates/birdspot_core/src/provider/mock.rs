//! Deterministic offline observation set.
//!
//! Used whenever the live fetch fails so the UI always has something to show.
//! Distances are fixed labels rather than computed values, which keeps the
//! radius filter independent of the query latitude.

use super::normalize::sort_by_distance;
use crate::model::coordinates::ObservationQuery;
use crate::model::observation::{Observation, ObservationLocation, Species};
use crate::model::rarity::level_for;
use chrono::NaiveDateTime;

struct MockSighting {
    id: u64,
    species_id: u64,
    name: &'static str,
    scientific_name: &'static str,
    lat_offset: f64,
    lng_offset: f64,
    location: &'static str,
    observer: &'static str,
    distance_km: f64,
    rarity: i64,
}

const MOCK_SIGHTINGS: [MockSighting; 3] = [
    MockSighting {
        id: 1,
        species_id: 101,
        name: "Merel",
        scientific_name: "Turdus merula",
        lat_offset: 0.005,
        lng_offset: 0.005,
        location: "Griftpark Utrecht",
        observer: "Jan de Vogelvriend",
        distance_km: 0.8,
        rarity: 1,
    },
    MockSighting {
        id: 2,
        species_id: 102,
        name: "Roodborst",
        scientific_name: "Erithacus rubecula",
        lat_offset: -0.003,
        lng_offset: 0.008,
        location: "Wilhelminapark Utrecht",
        observer: "Maria Natuurliefhebber",
        distance_km: 1.2,
        rarity: 2,
    },
    MockSighting {
        id: 3,
        species_id: 103,
        name: "Koolmees",
        scientific_name: "Parus major",
        lat_offset: 0.008,
        lng_offset: -0.002,
        location: "Maximapark Leidsche Rijn",
        observer: "Piet de Vogelaar",
        distance_km: 1.5,
        rarity: 1,
    },
];

/// Builds the mock set around the query center, filtered to its radius and
/// sorted nearest-first.
pub fn mock_observations(query: &ObservationQuery, observed_at: NaiveDateTime) -> Vec<Observation> {
    let mut observations = MOCK_SIGHTINGS
        .iter()
        .filter(|sighting| sighting.distance_km <= query.radius_km)
        .map(|sighting| Observation {
            id: sighting.id,
            species: Species {
                id: sighting.species_id,
                name: sighting.name.to_string(),
                scientific_name: sighting.scientific_name.to_string(),
                photo_url: None,
            },
            observed_at,
            location: ObservationLocation {
                lat: query.center.latitude + sighting.lat_offset,
                lng: query.center.longitude + sighting.lng_offset,
                name: sighting.location.to_string(),
            },
            observer: sighting.observer.to_string(),
            distance_km: Some(sighting.distance_km),
            rarity: level_for(sighting.rarity),
        })
        .collect::<Vec<_>>();
    sort_by_distance(&mut observations);
    observations
}
