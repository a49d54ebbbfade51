//! Country lookup service over a CSV range table
//!
//! Either rescans the table file on every lookup or answers from a
//! [`RangeIndex`] built once at startup.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{GeoIpConfig, LookupMode};
use crate::geoip::classifier::{classify, classify_str};
use crate::geoip::error::GeoIpResult;
use crate::geoip::index::RangeIndex;
use crate::geoip::key::AddressKey;
use crate::geoip::reader::RangeTableReader;

#[derive(Clone)]
enum Strategy {
    /// Re-open and scan the table file per lookup
    Scan(Arc<PathBuf>),
    /// Binary search over a table loaded once
    Indexed(Arc<RangeIndex>),
}

/// Country lookup service; cloning shares the underlying table
#[derive(Clone)]
pub struct CountryLookup {
    strategy: Strategy,
}

impl CountryLookup {
    /// Create a service that scans `path` on every lookup
    ///
    /// The file is not opened until the first lookup.
    pub fn streaming<P: AsRef<Path>>(path: P) -> Self {
        Self {
            strategy: Strategy::Scan(Arc::new(path.as_ref().to_path_buf())),
        }
    }

    /// Create a service backed by an index loaded from `path`
    ///
    /// # Errors
    /// Fails with `SourceUnavailable` when the table cannot be opened.
    pub fn indexed<P: AsRef<Path>>(path: P) -> GeoIpResult<Self> {
        let index = RangeIndex::load(path)?;
        Ok(Self::from_index(Arc::new(index)))
    }

    pub fn from_index(index: Arc<RangeIndex>) -> Self {
        Self {
            strategy: Strategy::Indexed(index),
        }
    }

    pub fn from_config(config: &GeoIpConfig) -> GeoIpResult<Self> {
        match config.mode {
            LookupMode::Scan => Ok(Self::streaming(&config.range_table)),
            LookupMode::Indexed => Self::indexed(&config.range_table),
        }
    }

    /// Lookup the country code for a textual address
    ///
    /// Invalid addresses and unmatched addresses both yield `"ZZ"`.
    ///
    /// # Errors
    /// Only `SourceUnavailable` is returned, when a scanning service cannot
    /// open its table.
    pub fn country_for(&self, address: &str) -> GeoIpResult<String> {
        match &self.strategy {
            Strategy::Scan(path) => {
                let reader = RangeTableReader::open(path.as_path())?;
                Ok(classify_str(address, reader))
            }
            Strategy::Indexed(index) => Ok(index.classify_str(address).to_string()),
        }
    }

    /// Lookup the country code for an already parsed address
    pub fn country_for_ip(&self, ip: IpAddr) -> GeoIpResult<String> {
        let key = AddressKey::from(ip);
        match &self.strategy {
            Strategy::Scan(path) => {
                let reader = RangeTableReader::open(path.as_path())?;
                Ok(classify(&key, reader))
            }
            Strategy::Indexed(index) => Ok(index.classify(&key).to_string()),
        }
    }

    pub fn mode(&self) -> LookupMode {
        match self.strategy {
            Strategy::Scan(_) => LookupMode::Scan,
            Strategy::Indexed(_) => LookupMode::Indexed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoip::GeoIpError;
    use std::io::Write;

    fn write_table(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_indexed_creation_invalid_path() {
        let result = CountryLookup::indexed("/nonexistent/path.csv");
        assert!(matches!(result, Err(GeoIpError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_streaming_defers_open_until_lookup() {
        let lookup = CountryLookup::streaming("/nonexistent/path.csv");
        assert!(matches!(
            lookup.country_for("1.1.1.1"),
            Err(GeoIpError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_both_modes_agree() {
        let file = write_table(
            "\"16777216\",\"16777471\",\"AU\",\"Australia\"\n\
             \"16777472\",\"16778239\",\"CN\",\"China\"\n",
        );

        let scan = CountryLookup::streaming(file.path());
        let indexed = CountryLookup::indexed(file.path()).unwrap();
        assert_eq!(scan.mode(), LookupMode::Scan);
        assert_eq!(indexed.mode(), LookupMode::Indexed);

        for (address, expected) in [
            ("1.0.0.1", "AU"),
            ("1.0.1.1", "CN"),
            ("1.0.4.0", "ZZ"),
            ("::1", "ZZ"),
            ("garbage", "ZZ"),
        ] {
            assert_eq!(scan.country_for(address).unwrap(), expected, "{address}");
            assert_eq!(indexed.country_for(address).unwrap(), expected, "{address}");
        }

        let ip: IpAddr = "1.0.0.200".parse().unwrap();
        assert_eq!(scan.country_for_ip(ip).unwrap(), "AU");
        assert_eq!(indexed.country_for_ip(ip).unwrap(), "AU");
    }

    #[test]
    fn test_indexed_survives_table_removal() {
        let file = write_table("1.0.0.0,1.0.0.255,AU\n");
        let lookup = CountryLookup::indexed(file.path()).unwrap();
        let shared = lookup.clone();
        drop(file);

        assert_eq!(shared.country_for("1.0.0.9").unwrap(), "AU");
    }
}
