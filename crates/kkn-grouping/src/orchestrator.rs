//! End-to-end grouping run: validate, filter, balance, assign.

use std::collections::HashSet;

use kkn_core::{AssignmentStrategy, Coordinate, FilterCriteria, Location, Student};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assigner::{CapacityOverrun, PlacedGroup, assign_locations, capacity_overruns};
use crate::balancer::{filter_roster, form_groups};
use crate::error::{EngineError, EngineResult};

/// Everything one grouping run needs. Built by the caller from the request,
/// stored criteria, and configuration.
#[derive(Debug, Clone)]
pub struct GroupingRequest {
    pub cohort_name: String,
    pub cohort_number: u32,
    pub campus: Coordinate,
    pub roster: Vec<Student>,
    pub criteria: FilterCriteria,
    pub locations: Vec<Location>,
    pub strategy: AssignmentStrategy,
}

/// Outcome of a run. Not persisted here; see [`crate::convert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingResult {
    #[serde(rename = "nama_angkatan")]
    pub cohort_name: String,
    #[serde(rename = "angkatan_ke")]
    pub cohort_number: u32,
    #[serde(rename = "kampus_lat")]
    pub campus_lat: f64,
    #[serde(rename = "kampus_lng")]
    pub campus_lng: f64,
    /// Input locations that received at least one group, in input order.
    #[serde(rename = "lokasi_terpilih")]
    pub selected_locations: Vec<Location>,
    #[serde(rename = "jumlah_kelompok")]
    pub group_count: usize,
    /// Size of the submitted roster, before the gender filter.
    #[serde(rename = "jumlah_mahasiswa")]
    pub student_count: usize,
    /// Students that passed the gender filter and were placed.
    #[serde(rename = "jumlah_ditempatkan")]
    pub placed_count: usize,
    pub strategy: AssignmentStrategy,
    #[serde(rename = "filter_criteria")]
    pub criteria: FilterCriteria,
    pub groups: Vec<PlacedGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capacity_overruns: Vec<CapacityOverrun>,
}

/// Run the grouping pipeline.
///
/// Checks run in this order: empty roster, empty location set, blank
/// cohort name, criteria band, and finally an empty roster after the
/// gender filter.
pub fn run_grouping(req: &GroupingRequest) -> EngineResult<GroupingResult> {
    if req.roster.is_empty() {
        return Err(EngineError::EmptyRoster);
    }
    if req.locations.is_empty() {
        return Err(EngineError::NoLocations);
    }
    if req.cohort_name.trim().is_empty() {
        return Err(EngineError::MissingField("nama_angkatan"));
    }
    req.criteria.validate()?;

    if req.campus.is_origin() {
        warn!("campus coordinate is (0, 0); distances are measured from the origin");
    }

    info!(
        cohort = %req.cohort_name,
        roster = req.roster.len(),
        locations = req.locations.len(),
        criteria = %req.criteria.name,
        strategy = ?req.strategy,
        "grouping started"
    );

    let eligible = filter_roster(&req.roster, req.criteria.gender_filter);
    if eligible.is_empty() {
        return Err(EngineError::NoEligibleStudents(
            req.criteria.gender_filter.as_str(),
        ));
    }

    let groups = form_groups(&eligible, &req.criteria);
    for g in &groups {
        if g.distinct_programs() < req.criteria.min_distinct_prodi as usize
            || g.distinct_faculties() < req.criteria.min_distinct_fakultas as usize
        {
            debug!(
                group = g.number,
                programs = g.distinct_programs(),
                faculties = g.distinct_faculties(),
                "group below composition target"
            );
        }
    }
    let placed = assign_locations(req.strategy, groups, &req.locations, req.campus)?;

    let overruns = capacity_overruns(&placed, &req.locations);
    for o in &overruns {
        warn!(
            location = %o.location,
            assigned = o.assigned,
            remaining = o.remaining,
            "location assigned beyond remaining quota"
        );
    }

    let used: HashSet<&str> = placed.iter().map(|p| p.placement.name.as_str()).collect();
    let selected_locations: Vec<Location> = req
        .locations
        .iter()
        .filter(|l| used.contains(l.name.as_str()))
        .cloned()
        .collect();

    info!(
        cohort = %req.cohort_name,
        placed = eligible.len(),
        groups = placed.len(),
        locations_used = selected_locations.len(),
        "grouping finished"
    );

    Ok(GroupingResult {
        cohort_name: req.cohort_name.trim().to_string(),
        cohort_number: req.cohort_number,
        campus_lat: req.campus.latitude,
        campus_lng: req.campus.longitude,
        selected_locations,
        group_count: placed.len(),
        student_count: req.roster.len(),
        placed_count: eligible.len(),
        strategy: req.strategy,
        criteria: req.criteria.clone(),
        groups: placed,
        capacity_overruns: overruns,
    })
}
