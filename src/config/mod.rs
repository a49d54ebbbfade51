use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub geoip: GeoIpConfig,
    pub counter: CounterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// CSV range table, e.g. IP2Location LITE DB1 (IPv6 edition)
    pub range_table: PathBuf,
    pub mode: LookupMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// Rescan the table file for every lookup
    Scan,
    /// Load the table once and binary search it
    Indexed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// JSON file holding per-country visit counts
    pub data_file: PathBuf,
}

impl LookupMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "scan" | "stream" | "streaming" => Some(LookupMode::Scan),
            "indexed" | "index" => Some(LookupMode::Indexed),
            _ => None,
        }
    }
}

impl Config {
    pub const DEFAULT_RANGE_TABLE: &'static str = "./IP2LOCATION-LITE-DB1.IPV6.CSV";
    pub const DEFAULT_DATA_FILE: &'static str = "./data.json";

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let range_table = std::env::var("GEOTALLY_RANGE_TABLE")
            .unwrap_or_else(|_| Self::DEFAULT_RANGE_TABLE.to_string());

        let mode_str =
            std::env::var("GEOTALLY_LOOKUP_MODE").unwrap_or_else(|_| "indexed".to_string());
        let mode = LookupMode::parse(&mode_str).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown GEOTALLY_LOOKUP_MODE '{mode_str}', falling back to 'indexed'. Supported values: scan, indexed"
            );
            LookupMode::Indexed
        });

        let data_file = std::env::var("GEOTALLY_DATA_FILE")
            .unwrap_or_else(|_| Self::DEFAULT_DATA_FILE.to_string());

        Ok(Config {
            geoip: GeoIpConfig {
                range_table: PathBuf::from(range_table),
                mode,
            },
            counter: CounterConfig {
                data_file: PathBuf::from(data_file),
            },
        })
    }
}
