//! REST API handlers for locations, criteria, and oracle lookups.
//!
//! Each handler reads/writes via `StateStore` and returns JSON responses
//! in the `{ success, data, error }` envelope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use kkn_core::{Coordinate, Location, LocationId, lenient, split_village_district};
use kkn_grouping::rank_locations;
use kkn_state::*;

use crate::ApiState;
use crate::oracle::{FacilityCheck, enrich_location, geocode_query};

/// Response wrapper for consistent API format.
#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

pub(crate) fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

/// Map a store error to its HTTP status.
pub(crate) fn state_error_response(e: &StateError) -> Response {
    let status = match e {
        StateError::NotFound(_) => StatusCode::NOT_FOUND,
        StateError::Conflict(_) => StatusCode::CONFLICT,
        StateError::Invalid(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if !e.is_client_error() {
        warn!(error = %e, "store error");
    }
    error_response(&e.to_string(), status)
}

/// Map a body that fails to decode to a 400 carrying the decoder message.
pub(crate) fn rejection_response(rejection: &JsonRejection) -> Response {
    debug!(error = %rejection.body_text(), "request body rejected");
    error_response(&rejection.body_text(), StatusCode::BAD_REQUEST)
}

/// Body of delete responses.
#[derive(Serialize)]
pub(crate) struct Deleted {
    #[serde(rename = "deletedId")]
    pub deleted_id: u64,
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok("ok")
}

// ── Locations ──────────────────────────────────────────────────

/// A location as returned to clients, with its remaining quota.
#[derive(Serialize)]
pub struct LocationView {
    #[serde(flatten)]
    pub location: Location,
    pub sisa_kuota: u32,
}

impl From<Location> for LocationView {
    fn from(location: Location) -> Self {
        Self {
            sisa_kuota: location.remaining(),
            location,
        }
    }
}

/// Location create/update body.
///
/// Accepts the legacy combined `desa_kecamatan` (`"Desa / Kecamatan"`)
/// when `desa` or `kecamatan` is missing.
#[derive(Debug, Deserialize)]
pub struct LocationInput {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub lokasi: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub desa: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub kecamatan: Option<String>,
    #[serde(
        default,
        alias = "dusun_kecamatan",
        deserialize_with = "lenient::opt_string"
    )]
    pub desa_kecamatan: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub kabupaten: Option<String>,
    #[serde(default, alias = "kuota", deserialize_with = "lenient::count")]
    pub kuota_total: u32,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, alias = "fakes", deserialize_with = "lenient::opt_flag")]
    pub faskes: Option<bool>,
}

impl LocationInput {
    /// Build a location record, or name the missing required fields.
    fn into_location(self, id: LocationId, quota_used: u32) -> Result<(Location, bool), String> {
        let (mut village, mut district) = (self.desa, self.kecamatan);
        if village.is_none() || district.is_none() {
            if let Some(combined) = self.desa_kecamatan.as_deref() {
                let (v, d) = split_village_district(combined);
                village = village.or(v);
                district = district.or(d);
            }
        }

        let mut missing = Vec::new();
        if self.lokasi.is_none() {
            missing.push("lokasi");
        }
        if village.is_none() {
            missing.push("desa");
        }
        if district.is_none() {
            missing.push("kecamatan");
        }
        if self.kabupaten.is_none() {
            missing.push("kabupaten");
        }
        if self.kuota_total == 0 {
            missing.push("kuota_total");
        }
        if !missing.is_empty() {
            return Err(format!("missing required fields: {}", missing.join(", ")));
        }

        let location = Location {
            id,
            name: self.lokasi.unwrap_or_default(),
            village,
            district,
            regency: self.kabupaten,
            quota_total: self.kuota_total,
            quota_used,
            latitude: self.latitude,
            longitude: self.longitude,
            near_health_facility: self.faskes.unwrap_or(false),
        };
        Ok((location, self.faskes.is_some()))
    }
}

/// GET /api/locations
pub async fn list_locations(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_locations() {
        Ok(locations) => {
            let views: Vec<LocationView> = locations.into_iter().map(LocationView::from).collect();
            ApiResponse::ok(views).into_response()
        }
        Err(e) => state_error_response(&e),
    }
}

/// GET /api/locations/{id}
pub async fn get_location(
    State(state): State<ApiState>,
    Path(id): Path<LocationId>,
) -> impl IntoResponse {
    match state.store.get_location(id) {
        Ok(Some(location)) => ApiResponse::ok(LocationView::from(location)).into_response(),
        Ok(None) => error_response("location not found", StatusCode::NOT_FOUND),
        Err(e) => state_error_response(&e),
    }
}

/// POST /api/locations
pub async fn create_location(
    State(state): State<ApiState>,
    Json(input): Json<LocationInput>,
) -> impl IntoResponse {
    let (mut location, flag_given) = match input.into_location(0, 0) {
        Ok(parts) => parts,
        Err(msg) => return error_response(&msg, StatusCode::BAD_REQUEST),
    };
    enrich_location(
        state.oracle.as_ref(),
        &mut location,
        flag_given,
        state.settings.facility_radius_m,
    )
    .await;

    match state.store.insert_location(&location) {
        Ok(stored) => {
            info!(id = stored.id, name = %stored.name, "location created");
            (StatusCode::CREATED, ApiResponse::ok(LocationView::from(stored))).into_response()
        }
        Err(e) => state_error_response(&e),
    }
}

/// PUT /api/locations/{id}
///
/// The used quota is kept from the stored record.
pub async fn update_location(
    State(state): State<ApiState>,
    Path(id): Path<LocationId>,
    Json(input): Json<LocationInput>,
) -> impl IntoResponse {
    let existing = match state.store.get_location(id) {
        Ok(Some(location)) => location,
        Ok(None) => return error_response("location not found", StatusCode::NOT_FOUND),
        Err(e) => return state_error_response(&e),
    };
    let (mut location, flag_given) = match input.into_location(id, existing.quota_used) {
        Ok(parts) => parts,
        Err(msg) => return error_response(&msg, StatusCode::BAD_REQUEST),
    };
    enrich_location(
        state.oracle.as_ref(),
        &mut location,
        flag_given,
        state.settings.facility_radius_m,
    )
    .await;

    match state.store.put_location(&location) {
        Ok(()) => ApiResponse::ok(LocationView::from(location)).into_response(),
        Err(e) => state_error_response(&e),
    }
}

/// DELETE /api/locations/{id}
pub async fn delete_location(
    State(state): State<ApiState>,
    Path(id): Path<LocationId>,
) -> impl IntoResponse {
    match state.store.delete_location(id) {
        Ok(true) => ApiResponse::ok(Deleted { deleted_id: id }).into_response(),
        Ok(false) => error_response("location not found", StatusCode::NOT_FOUND),
        Err(e) => state_error_response(&e),
    }
}

/// Query for the distance ranking. Missing axes fall back to the campus.
#[derive(Debug, Default, Deserialize)]
pub struct DistanceQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// A location with its distance from the reference point.
#[derive(Serialize)]
pub struct RankedView {
    #[serde(flatten)]
    pub location: Location,
    pub distance_km: f64,
    pub sisa_kuota: u32,
}

/// GET /api/locations/by-distance?lat=&lng=
pub async fn locations_by_distance(
    State(state): State<ApiState>,
    Query(query): Query<DistanceQuery>,
) -> impl IntoResponse {
    let reference = Coordinate::new(
        query.lat.unwrap_or(state.settings.campus.latitude),
        query.lng.unwrap_or(state.settings.campus.longitude),
    );
    if reference.latitude == 0.0 || reference.longitude == 0.0 {
        return error_response(
            "reference lat/lng required via query or campus config",
            StatusCode::BAD_REQUEST,
        );
    }

    match state.store.list_locations() {
        Ok(locations) => {
            let ranked: Vec<RankedView> = rank_locations(reference, &locations)
                .into_iter()
                .map(|r| RankedView {
                    sisa_kuota: r.location.remaining(),
                    location: r.location,
                    distance_km: r.distance_km,
                })
                .collect();
            debug!(count = ranked.len(), "locations ranked by distance");
            ApiResponse::ok(ranked).into_response()
        }
        Err(e) => state_error_response(&e),
    }
}

// ── Criteria ───────────────────────────────────────────────────

/// GET /api/filter-criteria
pub async fn list_criteria(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_criteria() {
        Ok(records) => ApiResponse::ok(records).into_response(),
        Err(e) => state_error_response(&e),
    }
}

/// GET /api/filter-criteria/{id}
pub async fn get_criteria(
    State(state): State<ApiState>,
    Path(id): Path<CriteriaId>,
) -> impl IntoResponse {
    match state.store.get_criteria(id) {
        Ok(Some(record)) => ApiResponse::ok(record).into_response(),
        Ok(None) => error_response("criteria not found", StatusCode::NOT_FOUND),
        Err(e) => state_error_response(&e),
    }
}

/// POST /api/filter-criteria
pub async fn create_criteria(
    State(state): State<ApiState>,
    body: Result<Json<CriteriaRecord>, JsonRejection>,
) -> impl IntoResponse {
    let Json(draft) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(&rejection),
    };
    match state.store.insert_criteria(&draft) {
        Ok(record) => {
            info!(id = record.id, name = %record.criteria.name, "criteria created");
            (StatusCode::CREATED, ApiResponse::ok(record)).into_response()
        }
        Err(e) => state_error_response(&e),
    }
}

/// PUT /api/filter-criteria/{id}
pub async fn update_criteria(
    State(state): State<ApiState>,
    Path(id): Path<CriteriaId>,
    body: Result<Json<CriteriaRecord>, JsonRejection>,
) -> impl IntoResponse {
    let Json(mut record) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(&rejection),
    };
    record.id = id;
    match state.store.put_criteria(&record) {
        Ok(updated) => ApiResponse::ok(updated).into_response(),
        Err(e) => state_error_response(&e),
    }
}

/// DELETE /api/filter-criteria/{id}
pub async fn delete_criteria(
    State(state): State<ApiState>,
    Path(id): Path<CriteriaId>,
) -> impl IntoResponse {
    match state.store.delete_criteria(id) {
        Ok(true) => ApiResponse::ok(Deleted { deleted_id: id }).into_response(),
        Ok(false) => error_response("criteria not found", StatusCode::NOT_FOUND),
        Err(e) => state_error_response(&e),
    }
}

// ── Oracles ────────────────────────────────────────────────────

/// Geocode request body.
#[derive(Debug, Deserialize)]
pub struct GeocodeRequest {
    #[serde(default, deserialize_with = "lenient::string")]
    pub lokasi: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub desa_kecamatan: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub kabupaten: Option<String>,
}

/// POST /api/geocode
pub async fn geocode(
    State(state): State<ApiState>,
    Json(req): Json<GeocodeRequest>,
) -> impl IntoResponse {
    if req.lokasi.is_empty() {
        return error_response("lokasi required", StatusCode::BAD_REQUEST);
    }
    let query = geocode_query(
        &req.lokasi,
        req.desa_kecamatan.as_deref(),
        req.kabupaten.as_deref(),
    );
    match state.oracle.geocode(&query).await {
        Ok(Some(hit)) => ApiResponse::ok(hit).into_response(),
        Ok(None) => error_response("location not found by geocoder", StatusCode::NOT_FOUND),
        Err(e) => {
            warn!(%query, error = %e, "geocoding failed");
            error_response(&format!("geocoding failed: {e}"), StatusCode::BAD_GATEWAY)
        }
    }
}

/// Default search radius for `/api/check-fakes`.
pub const DEFAULT_CHECK_RADIUS_M: u32 = 2000;

/// Facility check request body.
#[derive(Debug, Deserialize)]
pub struct FacilityRequest {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(rename = "radiusMeters", alias = "radius_m", default)]
    pub radius_m: Option<u32>,
}

/// POST /api/check-fakes
///
/// Lookup failures answer "no facility" rather than an error.
pub async fn check_facilities(
    State(state): State<ApiState>,
    Json(req): Json<FacilityRequest>,
) -> impl IntoResponse {
    let (Some(lat), Some(lng)) = (req.latitude, req.longitude) else {
        return error_response("latitude and longitude required", StatusCode::BAD_REQUEST);
    };
    let radius = req.radius_m.unwrap_or(DEFAULT_CHECK_RADIUS_M);
    let check = match state
        .oracle
        .health_facility_nearby(Coordinate::new(lat, lng), radius)
        .await
    {
        Ok(check) => check,
        Err(e) => {
            warn!(lat, lng, error = %e, "facility check failed");
            FacilityCheck::default()
        }
    };
    ApiResponse::ok(check).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use kkn_core::FilterCriteria;

    use crate::ApiSettings;
    use crate::oracle::{Facility, GeocodeHit, StaticOracle};

    fn test_state() -> ApiState {
        let store = StateStore::open_in_memory().unwrap();
        let oracle = StaticOracle::new()
            .with_place(
                "sendangsari",
                GeocodeHit {
                    latitude: -7.8445,
                    longitude: 110.1689,
                    display_name: "Sendangsari, Pengasih".to_string(),
                },
            )
            .with_facility(Facility {
                name: "Puskesmas Pengasih".to_string(),
                kind: "clinic".to_string(),
                lat: -7.8450,
                lon: 110.1700,
            });
        ApiState::new(store, ApiSettings::default(), Arc::new(oracle))
    }

    fn location_input(json: serde_json::Value) -> Json<LocationInput> {
        Json(serde_json::from_value(json).unwrap())
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sendangsari() -> serde_json::Value {
        serde_json::json!({
            "lokasi": "Balai Desa Sendangsari",
            "desa_kecamatan": "Sendangsari / Pengasih",
            "kabupaten": "Kulon Progo",
            "kuota": "24"
        })
    }

    #[tokio::test]
    async fn healthz_ok() {
        let resp = healthz().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn list_locations_empty() {
        let resp = list_locations(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn create_location_splits_legacy_field_and_enriches() {
        let state = test_state();
        let resp = create_location(State(state.clone()), location_input(sendangsari()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = body_json(resp).await;
        let data = &body["data"];
        assert_eq!(data["desa"], "Sendangsari");
        assert_eq!(data["kecamatan"], "Pengasih");
        assert_eq!(data["kuota_total"], 24);
        assert_eq!(data["sisa_kuota"], 24);
        assert_eq!(data["latitude"], -7.8445);
        assert_eq!(data["faskes"], true);

        let stored = state.store.get_location(1).unwrap().unwrap();
        assert!(stored.near_health_facility);
    }

    #[tokio::test]
    async fn create_location_requires_fields() {
        let resp = create_location(
            State(test_state()),
            location_input(serde_json::json!({ "lokasi": "X", "kuota_total": 0 })),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = body_json(resp).await;
        let msg = body["error"].as_str().unwrap();
        assert!(msg.contains("desa"));
        assert!(msg.contains("kuota_total"));
        assert!(!msg.contains("lokasi"));
    }

    #[tokio::test]
    async fn explicit_facility_flag_wins() {
        let state = test_state();
        let mut input = sendangsari();
        input["fakes"] = serde_json::json!(0);
        let resp = create_location(State(state.clone()), location_input(input))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(!state.store.get_location(1).unwrap().unwrap().near_health_facility);
    }

    #[tokio::test]
    async fn update_keeps_used_quota() {
        let state = test_state();
        let mut loc = state
            .store
            .insert_location(&Location {
                id: 0,
                name: "Lama".to_string(),
                village: Some("A".to_string()),
                district: Some("B".to_string()),
                regency: Some("C".to_string()),
                quota_total: 30,
                quota_used: 10,
                latitude: Some(-7.8),
                longitude: Some(110.3),
                near_health_facility: false,
            })
            .unwrap();
        loc.name = "Baru".to_string();

        let resp = update_location(
            State(state.clone()),
            Path(loc.id),
            location_input(serde_json::json!({
                "lokasi": "Baru", "desa": "A", "kecamatan": "B", "kabupaten": "C",
                "kuota_total": 25, "latitude": -7.8, "longitude": 110.3
            })),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = state.store.get_location(loc.id).unwrap().unwrap();
        assert_eq!(stored.name, "Baru");
        assert_eq!(stored.quota_used, 10);
        assert_eq!(stored.remaining(), 15);
    }

    #[tokio::test]
    async fn update_rejects_quota_below_used() {
        let state = test_state();
        let loc = state
            .store
            .insert_location(&Location {
                id: 0,
                name: "A".to_string(),
                village: Some("A".to_string()),
                district: Some("B".to_string()),
                regency: Some("C".to_string()),
                quota_total: 30,
                quota_used: 20,
                latitude: Some(-7.8),
                longitude: Some(110.3),
                near_health_facility: false,
            })
            .unwrap();

        let resp = update_location(
            State(state),
            Path(loc.id),
            location_input(serde_json::json!({
                "lokasi": "A", "desa": "A", "kecamatan": "B", "kabupaten": "C",
                "kuota_total": 5, "faskes": false
            })),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_unknown_location() {
        let resp = update_location(State(test_state()), Path(9), location_input(sendangsari()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_location_twice() {
        let state = test_state();
        create_location(State(state.clone()), location_input(sendangsari())).await;

        let resp = delete_location(State(state.clone()), Path(1)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["deletedId"], 1);

        let resp = delete_location(State(state), Path(1)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn by_distance_rejects_zero_reference() {
        let resp = locations_by_distance(
            State(test_state()),
            Query(DistanceQuery {
                lat: Some(0.0),
                lng: Some(110.0),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn by_distance_falls_back_to_campus() {
        let state = test_state();
        create_location(State(state.clone()), location_input(sendangsari())).await;

        let resp = locations_by_distance(State(state), Query(DistanceQuery::default()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let km = body["data"][0]["distance_km"].as_f64().unwrap();
        assert!(km > 20.0 && km < 30.0, "distance {km}");
        assert_eq!(body["data"][0]["sisa_kuota"], 24);
    }

    #[tokio::test]
    async fn store_errors_map_to_status() {
        let cases = [
            (StateError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (StateError::Conflict("x".into()), StatusCode::CONFLICT),
            (StateError::Invalid("x".into()), StatusCode::BAD_REQUEST),
            (StateError::Write("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(state_error_response(&err).status(), status);
            assert_eq!(err.is_client_error(), status.is_client_error());
        }
    }

    #[tokio::test]
    async fn criteria_create_conflict() {
        let state = test_state();
        let draft = || {
            Ok(Json(
                serde_json::from_value::<CriteriaRecord>(serde_json::json!({
                    "nama_kriteria": "Reguler",
                    "min_jumlah_mahasiswa": 6
                }))
                .unwrap(),
            ))
        };

        let resp = create_criteria(State(state.clone()), draft()).await.into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["min_jumlah_mahasiswa"], 6);
        assert_eq!(body["data"]["max_jumlah_mahasiswa"], 12);
        assert_eq!(body["data"]["is_active"], true);

        let resp = create_criteria(State(state), draft()).await.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn criteria_update_and_get() {
        let state = test_state();
        let rec = state
            .store
            .insert_criteria(&CriteriaRecord::draft(FilterCriteria::default()))
            .unwrap();

        let mut changed = rec.clone();
        changed.criteria.max_group_size = 15;
        let resp = update_criteria(State(state.clone()), Path(rec.id), Ok(Json(changed)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get_criteria(State(state), Path(rec.id)).await.into_response();
        assert_eq!(body_json(resp).await["data"]["max_jumlah_mahasiswa"], 15);
    }

    #[tokio::test]
    async fn criteria_missing() {
        let state = test_state();
        let resp = get_criteria(State(state.clone()), Path(3)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = delete_criteria(State(state), Path(3)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn geocode_found_and_missing() {
        let state = test_state();
        let req = |name: &str| {
            Json(
                serde_json::from_value::<GeocodeRequest>(serde_json::json!({ "lokasi": name }))
                    .unwrap(),
            )
        };

        let resp = geocode(State(state.clone()), req("Sendangsari")).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["latitude"], -7.8445);

        let resp = geocode(State(state), req("Atlantis")).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn check_facilities_default_radius() {
        let state = test_state();
        let req = |json: serde_json::Value| Json(serde_json::from_value::<FacilityRequest>(json).unwrap());

        let resp = check_facilities(
            State(state.clone()),
            req(serde_json::json!({ "latitude": -7.8445, "longitude": 110.1689 })),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["hasFakes"], true);

        let resp = check_facilities(State(state), req(serde_json::json!({ "latitude": -7.8 })))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn check_facilities_degrades_on_failure() {
        let state = ApiState::new(
            StateStore::open_in_memory().unwrap(),
            ApiSettings::default(),
            Arc::new(StaticOracle::new().failing()),
        );
        let req = serde_json::from_value::<FacilityRequest>(
            serde_json::json!({ "latitude": -7.8, "longitude": 110.3 }),
        )
        .unwrap();
        let resp = check_facilities(State(state), Json(req)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["hasFakes"], false);
    }
}
