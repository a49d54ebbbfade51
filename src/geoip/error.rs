use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoIpError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("malformed range record: {0}")]
    MalformedRange(String),
    #[error("range table unavailable at {}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type GeoIpResult<T> = Result<T, GeoIpError>;
