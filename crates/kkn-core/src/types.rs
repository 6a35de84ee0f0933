//! Shared domain types used across the KKN autogroup crates.
//!
//! Field names on the wire follow the records the administration office
//! already exchanges (`nim`, `nama`, `prodi`, `lokasi`, `kuota_total`, ...),
//! while the Rust names describe what the field holds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lenient;

/// Label used in reports when a student record leaves a category blank.
pub const NOT_LISTED: &str = "Tidak Tercantum";

// ── Coordinates ────────────────────────────────────────────────────

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Equator / prime meridian. Missing coordinates collapse to this point.
    pub const ORIGIN: Coordinate = Coordinate {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a coordinate from optional parts; a missing axis reads as 0.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        Self::new(latitude.unwrap_or(0.0), longitude.unwrap_or(0.0))
    }

    /// True when both axes are zero (unset reference point).
    pub fn is_origin(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

// ── Students ───────────────────────────────────────────────────────

/// One row of the submitted roster.
///
/// Column names from spreadsheet exports vary in capitalisation, so every
/// field accepts the alternate spellings seen in practice. A row may carry
/// several spellings at once; the first non-blank one wins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RosterRow")]
pub struct Student {
    pub nim: String,
    #[serde(rename = "nama")]
    pub name: String,
    #[serde(rename = "prodi")]
    pub program: Option<String>,
    #[serde(rename = "fakultas")]
    pub faculty: Option<String>,
    #[serde(rename = "jenis_kelamin")]
    pub gender: Option<String>,
    #[serde(rename = "nomor_telepon")]
    pub phone: Option<String>,
}

/// Roster row as submitted, one slot per known spelling.
#[derive(Deserialize)]
struct RosterRow {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    nim: Option<String>,
    #[serde(rename = "NIM", default, deserialize_with = "lenient::opt_string")]
    nim_upper: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    nama: Option<String>,
    #[serde(rename = "Nama", default, deserialize_with = "lenient::opt_string")]
    nama_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    prodi: Option<String>,
    #[serde(rename = "Prodi", default, deserialize_with = "lenient::opt_string")]
    prodi_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    fakultas: Option<String>,
    #[serde(rename = "Fakultas", default, deserialize_with = "lenient::opt_string")]
    fakultas_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    jenis_kelamin: Option<String>,
    #[serde(
        rename = "Jenis Kelamin",
        default,
        deserialize_with = "lenient::opt_string"
    )]
    jenis_kelamin_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    nomor_telepon: Option<String>,
    #[serde(
        rename = "Nomor Telepon",
        default,
        deserialize_with = "lenient::opt_string"
    )]
    nomor_telepon_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    no_telepon: Option<String>,
    #[serde(rename = "No. Telepon", default, deserialize_with = "lenient::opt_string")]
    no_telepon_title: Option<String>,
}

impl From<RosterRow> for Student {
    fn from(row: RosterRow) -> Self {
        Self {
            nim: row.nim.or(row.nim_upper).unwrap_or_default(),
            name: row.nama.or(row.nama_title).unwrap_or_default(),
            program: row.prodi.or(row.prodi_title),
            faculty: row.fakultas.or(row.fakultas_title),
            gender: row.jenis_kelamin.or(row.jenis_kelamin_title),
            phone: row
                .nomor_telepon
                .or(row.nomor_telepon_title)
                .or(row.no_telepon)
                .or(row.no_telepon_title),
        }
    }
}

impl Student {
    pub fn program_label(&self) -> &str {
        self.program.as_deref().unwrap_or(NOT_LISTED)
    }

    pub fn faculty_label(&self) -> &str {
        self.faculty.as_deref().unwrap_or(NOT_LISTED)
    }

    pub fn gender_label(&self) -> &str {
        self.gender.as_deref().unwrap_or(NOT_LISTED)
    }
}

// ── Criteria ───────────────────────────────────────────────────────

/// Hard pre-filter on the roster by gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenderFilter {
    #[default]
    #[serde(rename = "semua", alias = "all")]
    All,
    #[serde(rename = "laki-laki", alias = "male")]
    Male,
    #[serde(rename = "perempuan", alias = "female")]
    Female,
}

impl GenderFilter {
    /// Whether a student with the given gender field passes the filter.
    ///
    /// Matching is case-insensitive: male is anything containing `laki`
    /// or exactly `l`/`male`; female is anything containing `perempuan`
    /// or exactly `p`/`female`.
    pub fn accepts(&self, gender: Option<&str>) -> bool {
        let value = gender.unwrap_or_default().trim().to_lowercase();
        match self {
            GenderFilter::All => true,
            GenderFilter::Male => value.contains("laki") || value == "l" || value == "male",
            GenderFilter::Female => {
                value.contains("perempuan") || value == "p" || value == "female"
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenderFilter::All => "semua",
            GenderFilter::Male => "laki-laki",
            GenderFilter::Female => "perempuan",
        }
    }
}

/// Group-size band and composition targets for one grouping run.
///
/// `min_distinct_prodi` and `min_distinct_fakultas` are recorded targets
/// only; the balancer reports composition but does not enforce them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    #[serde(rename = "nama_kriteria", alias = "name")]
    pub name: String,
    #[serde(rename = "min_jumlah_mahasiswa", alias = "minJumlahMahasiswa")]
    pub min_group_size: u32,
    #[serde(rename = "max_jumlah_mahasiswa", alias = "maxJumlahMahasiswa")]
    pub max_group_size: u32,
    #[serde(rename = "min_prodi", alias = "minProdi")]
    pub min_distinct_prodi: u32,
    #[serde(rename = "min_fakultas", alias = "minFakultas")]
    pub min_distinct_fakultas: u32,
    #[serde(rename = "jenis_kelamin", alias = "jenisKelamin")]
    pub gender_filter: GenderFilter,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            min_group_size: 8,
            max_group_size: 12,
            min_distinct_prodi: 2,
            min_distinct_fakultas: 1,
            gender_filter: GenderFilter::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("min_jumlah_mahasiswa must be at least 1")]
    ZeroMinGroupSize,
    #[error("max_jumlah_mahasiswa ({max}) is below min_jumlah_mahasiswa ({min})")]
    InvertedBand { min: u32, max: u32 },
}

impl FilterCriteria {
    /// Check the size band is usable for computing a group count.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.min_group_size == 0 {
            return Err(CriteriaError::ZeroMinGroupSize);
        }
        if self.max_group_size < self.min_group_size {
            return Err(CriteriaError::InvertedBand {
                min: self.min_group_size,
                max: self.max_group_size,
            });
        }
        Ok(())
    }
}

// ── Locations ──────────────────────────────────────────────────────

/// Unique identifier for a location in the store.
pub type LocationId = u64;

/// A village placement site with a student quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "id_lokasi", default)]
    pub id: LocationId,
    #[serde(rename = "lokasi", default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(rename = "desa", default, deserialize_with = "lenient::opt_string")]
    pub village: Option<String>,
    #[serde(rename = "kecamatan", default, deserialize_with = "lenient::opt_string")]
    pub district: Option<String>,
    #[serde(rename = "kabupaten", default, deserialize_with = "lenient::opt_string")]
    pub regency: Option<String>,
    #[serde(
        rename = "kuota_total",
        alias = "kuota",
        default,
        deserialize_with = "lenient::count"
    )]
    pub quota_total: u32,
    #[serde(rename = "kuota_terpakai", default, deserialize_with = "lenient::count")]
    pub quota_used: u32,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    /// A health facility lies within the configured radius.
    #[serde(
        rename = "faskes",
        alias = "fakes",
        default,
        deserialize_with = "lenient::flag"
    )]
    pub near_health_facility: bool,
}

impl Location {
    /// Quota still available (`total - used`, never negative).
    pub fn remaining(&self) -> u32 {
        self.quota_total.saturating_sub(self.quota_used)
    }

    /// Coordinate of the site; missing axes read as 0.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::from_parts(self.latitude, self.longitude)
    }

    pub fn has_coordinate(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Combined `"Desa / Kecamatan"` label used in reports.
    pub fn village_district(&self) -> Option<String> {
        match (self.village.as_deref(), self.district.as_deref()) {
            (Some(v), Some(d)) => Some(format!("{v} / {d}")),
            (Some(v), None) => Some(v.to_string()),
            (None, Some(d)) => Some(d.to_string()),
            (None, None) => None,
        }
    }
}

/// Split a legacy combined `"Desa / Kecamatan"` field into its parts.
pub fn split_village_district(combined: &str) -> (Option<String>, Option<String>) {
    let mut parts = combined
        .split('/')
        .map(str::trim)
        .map(|p| (!p.is_empty()).then(|| p.to_string()));
    let village = parts.next().flatten();
    let district = parts.next().flatten();
    (village, district)
}

// ── Assignment strategy ────────────────────────────────────────────

/// How formed groups are bound to ranked locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Cycle through the distance-ranked list without looking at quota.
    #[default]
    RoundRobin,
    /// Skip locations whose remaining quota cannot hold the group.
    CapacityAware,
}
