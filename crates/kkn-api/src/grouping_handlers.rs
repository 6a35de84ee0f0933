//! Grouping run and history handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kkn_core::{AssignmentStrategy, Coordinate, FilterCriteria, Location, Student, lenient};
use kkn_grouping::{
    EngineError, GroupingRequest, GroupingResult, run_grouping, to_history_record, to_member_rows,
};
use kkn_state::{CriteriaId, GroupingId, GroupingMember};

use crate::ApiState;
use crate::handlers::{
    ApiResponse, Deleted, error_response, rejection_response, state_error_response,
};

/// Body of `POST /api/autogroup`.
#[derive(Debug, Deserialize)]
pub struct AutogroupRequest {
    #[serde(default, deserialize_with = "lenient::string")]
    pub nama_angkatan: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub angkatan_ke: u32,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub kampus_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub kampus_lng: Option<f64>,
    #[serde(rename = "mahasiswaList", alias = "mahasiswa", default)]
    pub roster: Vec<Student>,
    /// Inline criteria; wins over `criteria_id`.
    #[serde(rename = "filterCriteria", alias = "filter_criteria", default)]
    pub criteria: Option<FilterCriteria>,
    #[serde(default)]
    pub criteria_id: Option<CriteriaId>,
    /// Inline locations; when absent, every stored location is used.
    #[serde(default)]
    pub locations: Option<Vec<Location>>,
    #[serde(default)]
    pub strategy: Option<AssignmentStrategy>,
}

/// Result of a stored run.
#[derive(Serialize)]
pub struct AutogroupResponse {
    pub id_grouping: GroupingId,
    #[serde(flatten)]
    pub result: GroupingResult,
}

fn engine_error_response(e: &EngineError) -> Response {
    let status = if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::CONFLICT
    };
    error_response(&e.to_string(), status)
}

/// Criteria for a run: inline, then by id, then the active record, then
/// the configured default.
fn resolve_criteria(
    state: &ApiState,
    inline: Option<FilterCriteria>,
    id: Option<CriteriaId>,
) -> Result<FilterCriteria, Response> {
    if let Some(criteria) = inline {
        return Ok(criteria);
    }
    if let Some(id) = id {
        return match state.store.get_criteria(id) {
            Ok(Some(record)) => Ok(record.criteria),
            Ok(None) => Err(error_response("criteria not found", StatusCode::NOT_FOUND)),
            Err(e) => Err(state_error_response(&e)),
        };
    }
    match state.store.active_criteria() {
        Ok(Some(record)) => Ok(record.criteria),
        Ok(None) => Ok(state.settings.default_criteria.clone()),
        Err(e) => Err(state_error_response(&e)),
    }
}

/// POST /api/autogroup
pub async fn autogroup(
    State(state): State<ApiState>,
    body: Result<Json<AutogroupRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(&rejection),
    };
    let criteria = match resolve_criteria(&state, req.criteria, req.criteria_id) {
        Ok(criteria) => criteria,
        Err(resp) => return resp,
    };
    let locations = match req.locations {
        Some(locations) => locations,
        None => match state.store.list_locations() {
            Ok(locations) => locations,
            Err(e) => return state_error_response(&e),
        },
    };
    let campus = if req.kampus_lat.is_some() || req.kampus_lng.is_some() {
        Coordinate::from_parts(req.kampus_lat, req.kampus_lng)
    } else {
        state.settings.campus
    };

    let request = GroupingRequest {
        cohort_name: req.nama_angkatan,
        cohort_number: req.angkatan_ke,
        campus,
        roster: req.roster,
        criteria,
        locations,
        strategy: req.strategy.unwrap_or(state.settings.strategy),
    };

    let result = match run_grouping(&request) {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "grouping rejected");
            return engine_error_response(&e);
        }
    };

    let header = match to_history_record(&result) {
        Ok(header) => header,
        Err(e) => return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    };
    let members = to_member_rows(&result);

    match state.store.save_grouping(&header, &members) {
        Ok(id) => {
            info!(
                id,
                cohort = %result.cohort_name,
                groups = result.group_count,
                members = members.len(),
                "grouping saved"
            );
            (
                StatusCode::CREATED,
                ApiResponse::ok(AutogroupResponse {
                    id_grouping: id,
                    result,
                }),
            )
                .into_response()
        }
        Err(e) => state_error_response(&e),
    }
}

/// GET /api/grouping-history
pub async fn list_history(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_groupings() {
        Ok(summaries) => ApiResponse::ok(summaries).into_response(),
        Err(e) => state_error_response(&e),
    }
}

/// GET /api/grouping-history/{id}
pub async fn get_history(
    State(state): State<ApiState>,
    Path(id): Path<GroupingId>,
) -> impl IntoResponse {
    match state.store.get_grouping(id) {
        Ok(Some(record)) => ApiResponse::ok(record).into_response(),
        Ok(None) => error_response("grouping not found", StatusCode::NOT_FOUND),
        Err(e) => state_error_response(&e),
    }
}

/// DELETE /api/grouping-history/{id}
pub async fn delete_history(
    State(state): State<ApiState>,
    Path(id): Path<GroupingId>,
) -> impl IntoResponse {
    match state.store.delete_grouping(id) {
        Ok(true) => ApiResponse::ok(Deleted { deleted_id: id }).into_response(),
        Ok(false) => error_response("grouping not found", StatusCode::NOT_FOUND),
        Err(e) => state_error_response(&e),
    }
}

/// One member as listed under a result group.
#[derive(Debug, Serialize)]
pub struct MemberView {
    pub nim: Option<String>,
    pub nama: Option<String>,
    pub prodi: Option<String>,
    pub fakultas: Option<String>,
    pub nomor_telepon: Option<String>,
}

/// Member rows of one group with the location copied at run time.
#[derive(Debug, Serialize)]
pub struct ResultGroup {
    pub nomor_kelompok: u32,
    pub lokasi: Option<String>,
    pub desa_kecamatan: Option<String>,
    pub kabupaten: Option<String>,
    pub anggota: Vec<MemberView>,
}

#[derive(Debug, Serialize)]
pub struct GroupingResults {
    pub total: usize,
    pub groups: Vec<ResultGroup>,
}

/// Fold rows ordered by group number into one entry per group.
fn regroup(rows: Vec<GroupingMember>) -> GroupingResults {
    let total = rows.len();
    let mut groups: Vec<ResultGroup> = Vec::new();
    for row in rows {
        let member = MemberView {
            nim: row.nim,
            nama: row.name,
            prodi: row.program,
            fakultas: row.faculty,
            nomor_telepon: row.phone,
        };
        match groups.last_mut() {
            Some(g) if g.nomor_kelompok == row.group_number => g.anggota.push(member),
            _ => groups.push(ResultGroup {
                nomor_kelompok: row.group_number,
                lokasi: row.location,
                desa_kecamatan: row.village_district,
                kabupaten: row.regency,
                anggota: vec![member],
            }),
        }
    }
    GroupingResults { total, groups }
}

/// GET /api/grouping-results/{id}
pub async fn get_results(
    State(state): State<ApiState>,
    Path(id): Path<GroupingId>,
) -> impl IntoResponse {
    match state.store.get_grouping(id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_response("grouping not found", StatusCode::NOT_FOUND),
        Err(e) => return state_error_response(&e),
    }
    match state.store.list_grouping_members(id) {
        Ok(rows) => ApiResponse::ok(regroup(rows)).into_response(),
        Err(e) => state_error_response(&e),
    }
}
