//! kkn.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::{AssignmentStrategy, Coordinate, FilterCriteria};

/// Environment variables that override the configured campus point.
pub const CAMPUS_LAT_ENV: &str = "KKN_CAMPUS_LAT";
pub const CAMPUS_LNG_ENV: &str = "KKN_CAMPUS_LNG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KknConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_campus")]
    pub campus: Coordinate,
    /// Criteria used when no stored criteria is selected or active.
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentConfig {
    #[serde(default)]
    pub strategy: AssignmentStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Radius searched for health facilities when a location is saved.
    #[serde(default = "default_facility_radius")]
    pub facility_radius_m: u32,
}

impl Default for KknConfig {
    fn default() -> Self {
        Self::scaffold()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            facility_radius_m: default_facility_radius(),
        }
    }
}

fn default_port() -> u16 {
    4000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/kkn")
}

fn default_campus() -> Coordinate {
    Coordinate::new(-7.7979, 110.3701)
}

fn default_facility_radius() -> u32 {
    7000
}

impl KknConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KknConfig = toml::from_str(&content)?;
        config.criteria.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A fully populated config with every default spelled out.
    pub fn scaffold() -> Self {
        KknConfig {
            server: ServerConfig::default(),
            campus: default_campus(),
            criteria: FilterCriteria::default(),
            assignment: AssignmentConfig::default(),
            oracle: OracleConfig::default(),
        }
    }

    /// Apply `KKN_CAMPUS_LAT` / `KKN_CAMPUS_LNG` from the environment.
    pub fn apply_env_overrides(&mut self) {
        let lat = std::env::var(CAMPUS_LAT_ENV).ok();
        let lng = std::env::var(CAMPUS_LNG_ENV).ok();
        self.override_campus(lat.as_deref(), lng.as_deref());
    }

    /// Replace each campus axis that parses as a float; others are kept.
    pub fn override_campus(&mut self, lat: Option<&str>, lng: Option<&str>) {
        if let Some(v) = lat.and_then(|s| s.trim().parse::<f64>().ok()) {
            self.campus.latitude = v;
        }
        if let Some(v) = lng.and_then(|s| s.trim().parse::<f64>().ok()) {
            self.campus.longitude = v;
        }
    }
}
