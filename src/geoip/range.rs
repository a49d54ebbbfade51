//! Range records and per-row parsing

use crate::geoip::decimal::{decimal_to_key, is_decimal, is_v4_sized_decimal};
use crate::geoip::error::{GeoIpError, GeoIpResult};
use crate::geoip::key::{normalize, AddressKey};

/// Minimum number of fields in a range row: low, high, country code
pub const MIN_FIELDS: usize = 3;

/// One contiguous address interval mapped to a country
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRecord {
    pub low: AddressKey,
    pub high: AddressKey,
    /// ISO country code, trimmed and uppercased
    pub country_code: String,
}

impl RangeRecord {
    pub fn contains(&self, key: &AddressKey) -> bool {
        self.low <= *key && *key <= self.high
    }
}

/// Parse one raw row into a [`RangeRecord`]
///
/// Bounds are decimal integers when both fields are all digits, otherwise
/// address literals. For decimal rows the high bound alone decides whether
/// both bounds are IPv4 or IPv6 sized.
///
/// # Errors
/// Returns [`GeoIpError::MalformedRange`] when the row has too few fields,
/// a bound cannot be parsed, or `low > high`.
pub fn parse_record<S: AsRef<str>>(fields: &[S]) -> GeoIpResult<RangeRecord> {
    if fields.len() < MIN_FIELDS {
        return Err(GeoIpError::MalformedRange(format!(
            "expected at least {MIN_FIELDS} fields, found {}",
            fields.len()
        )));
    }

    let from = fields[0].as_ref();
    let to = fields[1].as_ref();
    let country_code = fields[2].as_ref().trim().to_uppercase();

    let (low, high) = if is_decimal(from) && is_decimal(to) {
        let v4_sized = is_v4_sized_decimal(to);
        (
            decimal_to_key(from, v4_sized)?,
            decimal_to_key(to, v4_sized)?,
        )
    } else {
        let bound = |text: &str| {
            normalize(text).map_err(|_| {
                GeoIpError::MalformedRange(format!("'{text}' is not an address literal"))
            })
        };
        (bound(from)?, bound(to)?)
    };

    if low > high {
        return Err(GeoIpError::MalformedRange(format!(
            "low bound {low} is above high bound {high}"
        )));
    }

    Ok(RangeRecord {
        low,
        high,
        country_code,
    })
}
