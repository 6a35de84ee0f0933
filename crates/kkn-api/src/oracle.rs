//! Location oracles: geocoding and health-facility proximity.
//!
//! Both lookups are best effort. A failed or empty lookup never blocks a
//! location write; the location is stored without coordinates or with the
//! facility flag cleared.

use std::future::Future;
use std::pin::Pin;

use kkn_core::{Coordinate, Location};
use kkn_grouping::haversine_km;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Boxed future returned by oracle lookups.
pub type OracleFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'a>>;

/// A geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeHit {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

/// A health facility near a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    /// `hospital`, `clinic`, `doctors`, `pharmacy`, ...
    pub kind: String,
    pub lat: f64,
    pub lon: f64,
}

/// Result of a proximity search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityCheck {
    #[serde(rename = "hasFakes")]
    pub has_facility: bool,
    pub items: Vec<Facility>,
}

impl FacilityCheck {
    pub fn from_items(items: Vec<Facility>) -> Self {
        Self {
            has_facility: !items.is_empty(),
            items,
        }
    }
}

/// External lookups used when locations are written.
pub trait LocationOracle: Send + Sync {
    /// Resolve a free-text place query. `Ok(None)` when nothing matches.
    fn geocode<'a>(&'a self, query: &'a str) -> OracleFuture<'a, Option<GeocodeHit>>;

    /// Health facilities within `radius_m` metres of `at`.
    fn health_facility_nearby(
        &self,
        at: Coordinate,
        radius_m: u32,
    ) -> OracleFuture<'_, FacilityCheck>;
}

/// Oracle that never finds anything. Used when no lookup service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

impl LocationOracle for NullOracle {
    fn geocode<'a>(&'a self, _query: &'a str) -> OracleFuture<'a, Option<GeocodeHit>> {
        Box::pin(async { Ok(None) })
    }

    fn health_facility_nearby(
        &self,
        _at: Coordinate,
        _radius_m: u32,
    ) -> OracleFuture<'_, FacilityCheck> {
        Box::pin(async { Ok(FacilityCheck::default()) })
    }
}

/// In-memory oracle backed by fixed place and facility lists.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    places: Vec<(String, GeocodeHit)>,
    facilities: Vec<Facility>,
    failing: bool,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a place; queries containing `name` (case-insensitive) match it.
    pub fn with_place(mut self, name: &str, hit: GeocodeHit) -> Self {
        self.places.push((name.to_lowercase(), hit));
        self
    }

    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facilities.push(facility);
        self
    }

    /// Make every lookup fail, as an unreachable service would.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

impl LocationOracle for StaticOracle {
    fn geocode<'a>(&'a self, query: &'a str) -> OracleFuture<'a, Option<GeocodeHit>> {
        Box::pin(async move {
            if self.failing {
                return Err("geocoder unavailable".to_string());
            }
            let q = query.to_lowercase();
            Ok(self
                .places
                .iter()
                .find(|(name, _)| q.contains(name.as_str()))
                .map(|(_, hit)| hit.clone()))
        })
    }

    fn health_facility_nearby(
        &self,
        at: Coordinate,
        radius_m: u32,
    ) -> OracleFuture<'_, FacilityCheck> {
        Box::pin(async move {
            if self.failing {
                return Err("facility search unavailable".to_string());
            }
            let radius_km = f64::from(radius_m) / 1000.0;
            let items = self
                .facilities
                .iter()
                .filter(|f| haversine_km(at, Coordinate::new(f.lat, f.lon)) <= radius_km)
                .cloned()
                .collect();
            Ok(FacilityCheck::from_items(items))
        })
    }
}

/// Free-text query for a location: `"lokasi, desa/kecamatan, kabupaten"`.
pub fn geocode_query(name: &str, village_district: Option<&str>, regency: Option<&str>) -> String {
    format!(
        "{}, {}, {}",
        name.trim(),
        village_district.unwrap_or_default().trim(),
        regency.unwrap_or("Indonesia").trim()
    )
}

/// Fill in coordinates and the facility flag before a location is stored.
///
/// Missing coordinates are geocoded. When coordinates are known and the
/// caller did not set the flag, a facility search within `radius_m` decides
/// it. Lookup failures leave the location as it was.
pub async fn enrich_location(
    oracle: &dyn LocationOracle,
    location: &mut Location,
    flag_given: bool,
    radius_m: u32,
) {
    if !location.has_coordinate() {
        let query = geocode_query(
            &location.name,
            location.village.as_deref(),
            location.regency.as_deref(),
        );
        match oracle.geocode(&query).await {
            Ok(Some(hit)) => {
                debug!(%query, lat = hit.latitude, lng = hit.longitude, "location geocoded");
                location.latitude = Some(hit.latitude);
                location.longitude = Some(hit.longitude);
            }
            Ok(None) => debug!(%query, "no geocoding match"),
            Err(e) => warn!(%query, error = %e, "geocoding failed"),
        }
    }

    if flag_given || !location.has_coordinate() {
        return;
    }

    match oracle
        .health_facility_nearby(location.coordinate(), radius_m)
        .await
    {
        Ok(check) => {
            debug!(
                location = %location.name,
                facilities = check.items.len(),
                radius_m,
                "facility check"
            );
            location.near_health_facility = check.has_facility;
        }
        Err(e) => {
            warn!(location = %location.name, error = %e, "facility check failed");
            location.near_health_facility = false;
        }
    }
}
