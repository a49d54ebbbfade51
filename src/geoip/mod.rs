//! IP-to-country classification
//!
//! Addresses are normalized into a single ordered 128-bit key space and
//! matched against a table of `(low, high, country)` ranges. The table can be
//! streamed from disk per lookup or loaded once into a [`RangeIndex`].

pub mod classifier;
pub mod decimal;
pub mod error;
pub mod index;
pub mod key;
pub mod range;
pub mod reader;
pub mod service;

/// Country code returned when no range matches or the address is invalid
pub const UNKNOWN_COUNTRY: &str = "ZZ";

pub use classifier::{classify, classify_str};
pub use decimal::{decimal_to_key, is_v4_sized_decimal};
pub use error::{GeoIpError, GeoIpResult};
pub use index::RangeIndex;
pub use key::{normalize, AddressKey};
pub use range::{parse_record, RangeRecord};
pub use reader::RangeTableReader;
pub use service::CountryLookup;
