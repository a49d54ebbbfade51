//! Data models for the visit counter

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Contents of the counter file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitCounts {
    /// Visits per country code
    #[serde(default)]
    pub countries: BTreeMap<String, u64>,

    /// RFC 3339 UTC timestamp of the last write
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl VisitCounts {
    /// Lenient conversion from arbitrary JSON
    ///
    /// Anything that is not an object, a non-object `countries` field, and
    /// non-integer counts are all dropped rather than rejected.
    pub fn from_json(value: Value) -> Self {
        let Value::Object(mut root) = value else {
            return Self::default();
        };

        let countries = match root.remove("countries") {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(code, count)| count.as_u64().map(|n| (code, n)))
                .collect(),
            _ => BTreeMap::new(),
        };

        let last_updated = root
            .remove("last_updated")
            .and_then(|v| v.as_str().map(str::to_string));

        Self {
            countries,
            last_updated,
        }
    }

    /// Add one visit for `country`, returning its new total
    pub fn bump(&mut self, country: &str) -> u64 {
        let count = self.countries.entry(country.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn total(&self) -> u64 {
        self.countries.values().sum()
    }

    /// Countries by visit count, highest first; ties by code
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self
            .countries
            .iter()
            .map(|(code, count)| (code.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Result of recording one visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitOutcome {
    pub country: String,
    pub total: u64,
}
