//! Nearest-first ordering of candidate locations.

use std::cmp::Ordering;

use kkn_core::{Coordinate, Location};
use serde::Serialize;

use crate::distance::haversine_km;

/// A location paired with its distance from the reference point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLocation {
    #[serde(flatten)]
    pub location: Location,
    pub distance_km: f64,
}

/// Sort locations ascending by distance from `reference`.
///
/// The sort is stable, so equidistant locations keep their input order and
/// re-ranking an already ranked list leaves it unchanged. A reference at
/// (0, 0) is not rejected here; validating the campus point is the caller's
/// concern.
pub fn rank_locations(reference: Coordinate, locations: &[Location]) -> Vec<RankedLocation> {
    let mut ranked: Vec<RankedLocation> = locations
        .iter()
        .map(|loc| RankedLocation {
            distance_km: haversine_km(reference, loc.coordinate()),
            location: loc.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPUS: Coordinate = Coordinate::new(-7.7979, 110.3701);

    fn make_location(id: u64, name: &str, lat: Option<f64>, lon: Option<f64>) -> Location {
        Location {
            id,
            name: name.to_string(),
            village: None,
            district: None,
            regency: None,
            quota_total: 20,
            quota_used: 0,
            latitude: lat,
            longitude: lon,
            near_health_facility: false,
        }
    }

    fn names(ranked: &[RankedLocation]) -> Vec<&str> {
        ranked.iter().map(|r| r.location.name.as_str()).collect()
    }

    #[test]
    fn sorts_nearest_first() {
        let locations = vec![
            make_location(1, "Wates", Some(-7.8607), Some(110.1583)),
            make_location(2, "Sleman", Some(-7.7167), Some(110.3550)),
            make_location(3, "Bantul", Some(-7.8881), Some(110.3289)),
        ];

        let ranked = rank_locations(CAMPUS, &locations);

        assert_eq!(names(&ranked), vec!["Sleman", "Bantul", "Wates"]);
        assert!(ranked[0].distance_km <= ranked[1].distance_km);
        assert!(ranked[1].distance_km <= ranked[2].distance_km);
    }

    #[test]
    fn ties_keep_input_order() {
        let locations = vec![
            make_location(1, "B", Some(-7.7167), Some(110.3550)),
            make_location(2, "A", Some(-7.7167), Some(110.3550)),
            make_location(3, "C", Some(-7.7167), Some(110.3550)),
        ];

        let ranked = rank_locations(CAMPUS, &locations);
        assert_eq!(names(&ranked), vec!["B", "A", "C"]);
    }

    #[test]
    fn reranking_is_idempotent() {
        let locations = vec![
            make_location(1, "Wates", Some(-7.8607), Some(110.1583)),
            make_location(2, "Same-1", Some(-7.7167), Some(110.3550)),
            make_location(3, "Same-2", Some(-7.7167), Some(110.3550)),
            make_location(4, "Nowhere", None, None),
        ];

        let once = rank_locations(CAMPUS, &locations);
        let sorted: Vec<Location> = once.iter().map(|r| r.location.clone()).collect();
        let twice = rank_locations(CAMPUS, &sorted);

        assert_eq!(once, twice);
    }

    #[test]
    fn missing_coordinates_rank_last() {
        let locations = vec![
            make_location(1, "Nowhere", None, Some(110.0)),
            make_location(2, "Wates", Some(-7.8607), Some(110.1583)),
        ];

        let ranked = rank_locations(CAMPUS, &locations);
        assert_eq!(names(&ranked), vec!["Wates", "Nowhere"]);
    }

    #[test]
    fn zero_reference_still_ranks() {
        let locations = vec![
            make_location(1, "Wates", Some(-7.8607), Some(110.1583)),
            make_location(2, "Nowhere", None, None),
        ];

        let ranked = rank_locations(Coordinate::ORIGIN, &locations);
        assert_eq!(names(&ranked), vec!["Nowhere", "Wates"]);
        assert_eq!(ranked[0].distance_km, 0.0);
    }

    #[test]
    fn empty_input() {
        assert!(rank_locations(CAMPUS, &[]).is_empty());
    }
}
