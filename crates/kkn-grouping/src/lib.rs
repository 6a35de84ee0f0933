//! kkn-grouping: group formation and location assignment.
//!
//! Partitions a student roster into size-balanced groups and binds each
//! group to a village location ranked by distance from campus. The engine
//! is pure: it reads plain records and returns a [`GroupingResult`];
//! persisting that result is the caller's job (see [`convert`]).
//!
//! # Components
//!
//! - **`distance`**: Haversine great-circle distance
//! - **`ranker`**: Stable nearest-first ordering of locations
//! - **`balancer`**: Gender pre-filter, group count policy, least-loaded fill
//! - **`assigner`**: Round-robin and capacity-aware location binding
//! - **`orchestrator`**: Validation and the end-to-end run
//! - **`convert`**: Result → store records

pub mod assigner;
pub mod balancer;
pub mod convert;
pub mod distance;
pub mod error;
pub mod orchestrator;
pub mod ranker;

pub use assigner::{
    CapacityOverrun, PlacedGroup, Placement, assign_locations, capacity_overruns,
};
pub use balancer::{
    Group, PREFERRED_GROUP_COUNT, RELAXED_MAX_GROUP_SIZE, filter_roster, form_groups,
    target_group_count,
};
pub use convert::{to_history_record, to_member_rows};
pub use distance::{EARTH_RADIUS_KM, haversine_km};
pub use error::{EngineError, EngineResult};
pub use orchestrator::{GroupingRequest, GroupingResult, run_grouping};
pub use ranker::{RankedLocation, rank_locations};
