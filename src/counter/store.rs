//! File-backed visit counter
//!
//! The counter lives in a single JSON file that is rewritten in full on each
//! visit. Writes go to a sibling `.tmp` file first and are renamed into place.
//! Concurrent writers are not coordinated; the last rename wins.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::counter::models::{VisitCounts, VisitOutcome};

pub struct CounterStore {
    path: PathBuf,
}

impl CounterStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load current counts; a missing or unreadable file counts as empty
    pub async fn load(&self) -> VisitCounts {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "counter file not readable, starting empty");
                return VisitCounts::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => VisitCounts::from_json(value),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "counter file is not valid JSON, starting empty");
                VisitCounts::default()
            }
        }
    }

    /// Stamp and atomically replace the counter file
    pub async fn save(&self, counts: &mut VisitCounts) -> Result<()> {
        counts.last_updated = Some(chrono::Utc::now().to_rfc3339());

        let body = serde_json::to_string_pretty(counts).context("Failed to serialize counts")?;
        let tmp = self.tmp_path();

        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }

    /// Count one visit for `country` and persist it
    pub async fn record(&self, country: &str) -> Result<VisitOutcome> {
        let mut counts = self.load().await;
        let total = counts.bump(country);
        self.save(&mut counts).await?;

        Ok(VisitOutcome {
            country: country.to_string(),
            total,
        })
    }
}
