//! First-match range classification
//!
//! Records are scanned in the order given and the first range containing the
//! address wins. Tables are expected to be sorted and non-overlapping; when
//! they are not, the answer is whichever containing range appears first.

use crate::geoip::key::{normalize, AddressKey};
use crate::geoip::range::RangeRecord;
use crate::geoip::UNKNOWN_COUNTRY;

/// Classify a normalized address against a sequence of ranges
///
/// Returns the matching record's country code, or [`UNKNOWN_COUNTRY`] when
/// nothing matches.
pub fn classify<I>(address: &AddressKey, records: I) -> String
where
    I: IntoIterator<Item = RangeRecord>,
{
    records
        .into_iter()
        .find(|record| record.contains(address))
        .map(|record| country_or_unknown(&record.country_code).to_string())
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
}

/// Classify a textual address; unparseable input yields [`UNKNOWN_COUNTRY`]
pub fn classify_str<I>(address: &str, records: I) -> String
where
    I: IntoIterator<Item = RangeRecord>,
{
    match normalize(address) {
        Ok(key) => classify(&key, records),
        Err(e) => {
            tracing::debug!(error = %e, "address not classifiable");
            UNKNOWN_COUNTRY.to_string()
        }
    }
}

/// Placeholder codes such as IP2Location's `-` collapse to the unknown code
pub(crate) fn country_or_unknown(code: &str) -> &str {
    if code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        code
    } else {
        UNKNOWN_COUNTRY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoip::range::parse_record;

    fn table(rows: &[[&str; 3]]) -> Vec<RangeRecord> {
        rows.iter().map(|row| parse_record(&row[..]).unwrap()).collect()
    }

    #[test]
    fn test_single_range() {
        let records = table(&[["1.0.0.0", "1.0.0.255", "AU"]]);
        assert_eq!(classify_str("1.0.0.128", records.clone()), "AU");
        assert_eq!(classify_str("1.0.0.0", records.clone()), "AU");
        assert_eq!(classify_str("1.0.0.255", records.clone()), "AU");
        assert_eq!(classify_str("1.0.1.0", records), "ZZ");
    }

    #[test]
    fn test_invalid_address_is_unknown() {
        let records = table(&[["0.0.0.0", "255.255.255.255", "US"]]);
        assert_eq!(classify_str("not-an-ip", records), "ZZ");
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(classify_str("8.8.8.8", Vec::new()), "ZZ");
    }

    #[test]
    fn test_ipv6_address() {
        let records = table(&[
            ["1.0.0.0", "1.0.0.255", "AU"],
            ["2001:200::", "2001:200:ffff:ffff:ffff:ffff:ffff:ffff", "JP"],
        ]);
        assert_eq!(classify_str("2001:200:1::5", records), "JP");
    }

    #[test]
    fn test_ipv4_against_decimal_ipv6_table() {
        // IP2Location IPv6 tables carry IPv4 space as ::ffff:0:0/96 in decimal
        let records = vec![parse_record(&["281470698520576", "281470698520831", "AU"]).unwrap()];
        assert_eq!(classify_str("1.0.0.7", records), "AU");
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let records = table(&[
            ["10.0.0.0", "10.255.255.255", "US"],
            ["10.1.0.0", "10.1.255.255", "CA"],
        ]);
        assert_eq!(classify_str("10.1.2.3", records), "US");
    }

    #[test]
    fn test_placeholder_code_is_unknown() {
        let records = table(&[["0.0.0.0", "0.255.255.255", "-"]]);
        assert_eq!(classify_str("0.1.2.3", records), "ZZ");
    }

    #[test]
    fn test_scan_stops_at_first_match() {
        let records = table(&[["1.0.0.0", "1.0.0.255", "AU"]]);
        let mut visited = 0;
        let iter = records
            .into_iter()
            .chain(std::iter::repeat_with(|| {
                parse_record(&["9.0.0.0", "9.0.0.1", "XX"]).unwrap()
            }))
            .inspect(|_| visited += 1);
        assert_eq!(classify_str("1.0.0.1", iter), "AU");
        assert_eq!(visited, 1);
    }
}
