//! Great-circle distance helpers.

use crate::model::coordinates::Coordinates;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two latitude/longitude pairs.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Haversine distance in kilometers between two coordinates.
pub fn distance_between(a: &Coordinates, b: &Coordinates) -> f64 {
    distance_km(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Rounds a kilometer value to two decimals.
pub fn round_km(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{distance_km, round_km};

    const POINTS: [(f64, f64); 5] = [
        (52.0907, 5.1214),
        (0.0, 0.0),
        (-33.8688, 151.2093),
        (64.1466, -21.9426),
        (52.0726, 5.0966),
    ];

    #[test]
    fn distance_is_symmetric() {
        for (lat1, lon1) in POINTS {
            for (lat2, lon2) in POINTS {
                let forward = distance_km(lat1, lon1, lat2, lon2);
                let backward = distance_km(lat2, lon2, lat1, lon1);
                assert!((forward - backward).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        for (lat, lon) in POINTS {
            assert_eq!(distance_km(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let dist = distance_km(0.0, 0.0, 0.0, 1.0);
        assert!((dist - 111.195).abs() < 0.01);
    }

    #[test]
    fn round_km_keeps_two_decimals() {
        assert_eq!(round_km(1.23456), 1.23);
        assert_eq!(round_km(0.005), 0.01);
    }
}
