//! Streaming reader for CSV range tables
//!
//! Rows are parsed one at a time so that large tables never need to be held
//! in memory. Bad rows are skipped; only failing to open the source is an
//! error.

use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

use crate::geoip::error::{GeoIpError, GeoIpResult};
use crate::geoip::range::{parse_record, RangeRecord};

/// Lazy sequence of [`RangeRecord`]s read from a delimited source
pub struct RangeTableReader<R> {
    csv: csv::Reader<R>,
    row: StringRecord,
    skipped: u64,
    finished: bool,
}

impl RangeTableReader<BufReader<File>> {
    /// Open a range table file
    ///
    /// # Errors
    /// Returns [`GeoIpError::SourceUnavailable`] when the file is missing or
    /// cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> GeoIpResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| GeoIpError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: Read> RangeTableReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let csv = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        Self {
            csv,
            row: StringRecord::new(),
            skipped: 0,
            finished: false,
        }
    }

    /// Number of rows skipped so far as malformed
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn current_line(&self) -> u64 {
        self.row.position().map(|p| p.line()).unwrap_or(0)
    }
}

impl<R: Read> Iterator for RangeTableReader<R> {
    type Item = RangeRecord;

    fn next(&mut self) -> Option<RangeRecord> {
        while !self.finished {
            match self.csv.read_record(&mut self.row) {
                Ok(false) => self.finished = true,
                Ok(true) => {
                    let fields: Vec<&str> = self.row.iter().collect();
                    match parse_record(&fields[..]) {
                        Ok(record) => return Some(record),
                        Err(e) => {
                            self.skipped += 1;
                            debug!(line = self.current_line(), error = %e, "skipping range row");
                        }
                    }
                }
                Err(e) if e.is_io_error() => {
                    warn!(error = %e, "range table read failed, ending scan early");
                    self.finished = true;
                }
                Err(e) => {
                    self.skipped += 1;
                    debug!(error = %e, "skipping undecodable range row");
                }
            }
        }
        None
    }
}
