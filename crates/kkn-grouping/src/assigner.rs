//! Binding formed groups to ranked locations.

use kkn_core::{AssignmentStrategy, Coordinate, Location, LocationId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::balancer::Group;
use crate::error::{EngineError, EngineResult};
use crate::ranker::{RankedLocation, rank_locations};

/// Location fields copied onto a group at assignment time.
///
/// Values are copied, so later edits to the location record do not change
/// a stored grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(rename = "id_lokasi")]
    pub location_id: LocationId,
    #[serde(rename = "lokasi")]
    pub name: String,
    #[serde(rename = "desa_kecamatan")]
    pub village_district: Option<String>,
    #[serde(rename = "kabupaten")]
    pub regency: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_km: f64,
}

impl From<&RankedLocation> for Placement {
    fn from(ranked: &RankedLocation) -> Self {
        let loc = &ranked.location;
        Self {
            location_id: loc.id,
            name: loc.name.clone(),
            village_district: loc.village_district(),
            regency: loc.regency.clone(),
            latitude: loc.latitude,
            longitude: loc.longitude,
            distance_km: ranked.distance_km,
        }
    }
}

/// A group together with the location it was sent to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedGroup {
    #[serde(flatten)]
    pub group: Group,
    #[serde(flatten)]
    pub placement: Placement,
}

/// A location that received more students than its remaining quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityOverrun {
    #[serde(rename = "id_lokasi")]
    pub location_id: LocationId,
    #[serde(rename = "lokasi")]
    pub location: String,
    pub assigned: u32,
    pub remaining: u32,
}

/// Bind each group to a location ranked nearest-first from `campus`.
pub fn assign_locations(
    strategy: AssignmentStrategy,
    groups: Vec<Group>,
    locations: &[Location],
    campus: Coordinate,
) -> EngineResult<Vec<PlacedGroup>> {
    if locations.is_empty() {
        return Err(EngineError::NoLocations);
    }

    let ranked = rank_locations(campus, locations);
    debug!(
        locations = ranked.len(),
        nearest = %ranked[0].location.name,
        nearest_km = ranked[0].distance_km,
        "locations ranked"
    );

    match strategy {
        AssignmentStrategy::RoundRobin => Ok(round_robin(groups, &ranked)),
        AssignmentStrategy::CapacityAware => capacity_aware(groups, &ranked),
    }
}

/// Group `i` goes to `ranked[i % len]`. Quota is not consulted.
fn round_robin(groups: Vec<Group>, ranked: &[RankedLocation]) -> Vec<PlacedGroup> {
    groups
        .into_iter()
        .enumerate()
        .map(|(idx, group)| PlacedGroup {
            placement: Placement::from(&ranked[idx % ranked.len()]),
            group,
        })
        .collect()
}

/// Walk the ranked list from a rotating cursor and take the first location
/// whose remaining quota holds the whole group.
fn capacity_aware(groups: Vec<Group>, ranked: &[RankedLocation]) -> EngineResult<Vec<PlacedGroup>> {
    let mut remaining: Vec<usize> = ranked
        .iter()
        .map(|r| r.location.remaining() as usize)
        .collect();
    let mut cursor = 0;
    let mut placed = Vec::with_capacity(groups.len());

    for group in groups {
        let size = group.len();
        let slot = (0..ranked.len())
            .map(|step| (cursor + step) % ranked.len())
            .find(|&i| remaining[i] >= size);

        let Some(i) = slot else {
            warn!(group = group.number, size, "no location has room for group");
            return Err(EngineError::InsufficientCapacity {
                group: group.number,
                size,
            });
        };

        if i != cursor {
            debug!(
                group = group.number,
                skipped = (i + ranked.len() - cursor) % ranked.len(),
                location = %ranked[i].location.name,
                "skipped locations without room"
            );
        }

        remaining[i] -= size;
        cursor = (i + 1) % ranked.len();
        placed.push(PlacedGroup {
            placement: Placement::from(&ranked[i]),
            group,
        });
    }

    Ok(placed)
}

/// Locations whose assigned head count exceeds their remaining quota,
/// in order of first use.
pub fn capacity_overruns(placed: &[PlacedGroup], locations: &[Location]) -> Vec<CapacityOverrun> {
    let mut tally: Vec<(LocationId, String, u32)> = Vec::new();
    for pg in placed {
        let size = pg.group.len() as u32;
        let p = &pg.placement;
        match tally
            .iter_mut()
            .find(|(id, name, _)| *id == p.location_id && *name == p.name)
        {
            Some((_, _, assigned)) => *assigned += size,
            None => tally.push((p.location_id, p.name.clone(), size)),
        }
    }

    tally
        .into_iter()
        .filter_map(|(id, name, assigned)| {
            let remaining = locations
                .iter()
                .find(|l| l.id == id && l.name == name)
                .map(Location::remaining)?;
            (assigned > remaining).then_some(CapacityOverrun {
                location_id: id,
                location: name,
                assigned,
                remaining,
            })
        })
        .collect()
}
