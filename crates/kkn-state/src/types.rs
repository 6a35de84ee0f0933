//! Persisted record types.
//!
//! Locations are stored as [`kkn_core::Location`] directly. Criteria and
//! grouping records wrap the core types with ids, flags, and timestamps.

use kkn_core::FilterCriteria;
use serde::{Deserialize, Serialize};

/// Unique identifier for a stored criteria record.
pub type CriteriaId = u64;

/// Unique identifier for a grouping run.
pub type GroupingId = u64;

// ── Criteria ───────────────────────────────────────────────────────

/// A named, versioned filter criteria record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRecord {
    #[serde(rename = "id_criteria", default)]
    pub id: CriteriaId,
    #[serde(flatten)]
    pub criteria: FilterCriteria,
    #[serde(rename = "deskripsi", default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub created_at: u64,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub updated_at: u64,
}

fn default_active() -> bool {
    true
}

impl CriteriaRecord {
    /// Draft record for insertion; id and timestamps are assigned by the store.
    pub fn draft(criteria: FilterCriteria) -> Self {
        Self {
            id: 0,
            criteria,
            description: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }
}

// ── Grouping history ───────────────────────────────────────────────

/// Header of one grouping run with the full group payload.
///
/// `data_grouping` holds the placed groups as produced by the engine. It is
/// kept as opaque JSON so the store does not depend on the engine crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingHistory {
    #[serde(rename = "id_grouping", default)]
    pub id: GroupingId,
    #[serde(rename = "nama_angkatan")]
    pub cohort_name: String,
    #[serde(rename = "angkatan_ke")]
    pub cohort_number: u32,
    #[serde(rename = "jumlah_kelompok")]
    pub group_count: usize,
    #[serde(rename = "jumlah_mahasiswa")]
    pub student_count: usize,
    pub data_grouping: serde_json::Value,
    pub filter_criteria: Option<FilterCriteria>,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub created_at: u64,
}

/// List view of a grouping run without the group payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingSummary {
    #[serde(rename = "id_grouping")]
    pub id: GroupingId,
    #[serde(rename = "nama_angkatan")]
    pub cohort_name: String,
    #[serde(rename = "angkatan_ke")]
    pub cohort_number: u32,
    #[serde(rename = "jumlah_kelompok")]
    pub group_count: usize,
    #[serde(rename = "jumlah_mahasiswa")]
    pub student_count: usize,
    pub created_at: u64,
}

impl From<&GroupingHistory> for GroupingSummary {
    fn from(h: &GroupingHistory) -> Self {
        Self {
            id: h.id,
            cohort_name: h.cohort_name.clone(),
            cohort_number: h.cohort_number,
            group_count: h.group_count,
            student_count: h.student_count,
            created_at: h.created_at,
        }
    }
}

/// One placed student in a stored grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingMember {
    #[serde(rename = "id_grouping", default)]
    pub grouping_id: GroupingId,
    #[serde(rename = "nomor_kelompok")]
    pub group_number: u32,
    #[serde(rename = "lokasi")]
    pub location: Option<String>,
    #[serde(rename = "desa_kecamatan")]
    pub village_district: Option<String>,
    #[serde(rename = "kabupaten")]
    pub regency: Option<String>,
    pub nim: Option<String>,
    #[serde(rename = "nama")]
    pub name: Option<String>,
    #[serde(rename = "prodi")]
    pub program: Option<String>,
    #[serde(rename = "fakultas")]
    pub faculty: Option<String>,
    #[serde(rename = "nomor_telepon")]
    pub phone: Option<String>,
}
