//! kkn-api: REST API for the KKN autogroup service.
//!
//! Provides axum route handlers for placement locations, filter criteria,
//! grouping runs, and the location oracles.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness |
//! | GET | `/api/locations` | List locations |
//! | POST | `/api/locations` | Create a location |
//! | GET | `/api/locations/by-distance` | Locations ranked from a reference point |
//! | GET/PUT/DELETE | `/api/locations/{id}` | Get, update, delete a location |
//! | GET | `/api/filter-criteria` | List criteria, active first |
//! | POST | `/api/filter-criteria` | Create criteria |
//! | GET/PUT/DELETE | `/api/filter-criteria/{id}` | Get, update, delete criteria |
//! | POST | `/api/autogroup` | Run and store a grouping |
//! | GET | `/api/grouping-history` | List grouping summaries |
//! | GET/DELETE | `/api/grouping-history/{id}` | Get, delete a grouping |
//! | GET | `/api/grouping-results/{id}` | Member rows regrouped by group |
//! | POST | `/api/geocode` | Geocode a place |
//! | POST | `/api/check-fakes` | Health facilities near a point |

pub mod grouping_handlers;
pub mod handlers;
pub mod oracle;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use kkn_core::{AssignmentStrategy, Coordinate, FilterCriteria, KknConfig};
use kkn_state::StateStore;

pub use oracle::{LocationOracle, NullOracle, StaticOracle};

/// Request-independent settings taken from `kkn.toml`.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub campus: Coordinate,
    /// Used when a run names no criteria and none is active.
    pub default_criteria: FilterCriteria,
    pub strategy: AssignmentStrategy,
    /// Radius for the facility check on location writes.
    pub facility_radius_m: u32,
}

impl From<&KknConfig> for ApiSettings {
    fn from(config: &KknConfig) -> Self {
        Self {
            campus: config.campus,
            default_criteria: config.criteria.clone(),
            strategy: config.assignment.strategy,
            facility_radius_m: config.oracle.facility_radius_m,
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self::from(&KknConfig::default())
    }
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub settings: Arc<ApiSettings>,
    pub oracle: Arc<dyn LocationOracle>,
}

impl ApiState {
    pub fn new(store: StateStore, settings: ApiSettings, oracle: Arc<dyn LocationOracle>) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
            oracle,
        }
    }
}

/// Build the complete API router.
pub fn build_router(
    store: StateStore,
    settings: ApiSettings,
    oracle: Arc<dyn LocationOracle>,
) -> Router {
    let state = ApiState::new(store, settings, oracle);

    let api_routes = Router::new()
        .route(
            "/locations",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route("/locations/by-distance", get(handlers::locations_by_distance))
        .route(
            "/locations/{id}",
            get(handlers::get_location)
                .put(handlers::update_location)
                .delete(handlers::delete_location),
        )
        .route(
            "/filter-criteria",
            get(handlers::list_criteria).post(handlers::create_criteria),
        )
        .route(
            "/filter-criteria/{id}",
            get(handlers::get_criteria)
                .put(handlers::update_criteria)
                .delete(handlers::delete_criteria),
        )
        .route("/autogroup", post(grouping_handlers::autogroup))
        .route("/grouping-history", get(grouping_handlers::list_history))
        .route(
            "/grouping-history/{id}",
            get(grouping_handlers::get_history).delete(grouping_handlers::delete_history),
        )
        .route("/grouping-results/{id}", get(grouping_handlers::get_results))
        .route("/geocode", post(handlers::geocode))
        .route("/check-fakes", post(handlers::check_facilities))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .route("/healthz", get(handlers::healthz))
}
