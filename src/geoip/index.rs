//! In-memory range index
//!
//! Built once from a range table, then shared read-only (typically behind an
//! `Arc`) and queried by binary search. Answers always match a streaming
//! scan of the same records in the same order: overlapping tables are
//! flattened into disjoint segments where the earlier row wins.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::geoip::classifier::country_or_unknown;
use crate::geoip::error::GeoIpResult;
use crate::geoip::key::{normalize, AddressKey};
use crate::geoip::range::RangeRecord;
use crate::geoip::reader::RangeTableReader;
use crate::geoip::UNKNOWN_COUNTRY;

/// Immutable, sorted, non-overlapping range table
#[derive(Debug, Clone, Default)]
pub struct RangeIndex {
    records: Vec<RangeRecord>,
    overlaps: usize,
}

impl RangeIndex {
    /// Build an index from records in scan order
    ///
    /// Records are sorted by low bound. If any range starts inside an earlier
    /// one, the table is flattened so that each address resolves to the
    /// first record in input order that contains it.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RangeRecord>,
    {
        let mut records: Vec<RangeRecord> = records.into_iter().collect();
        let mut by_low: Vec<usize> = (0..records.len()).collect();
        by_low.sort_by_key(|&i| records[i].low);

        let mut overlaps = 0;
        let mut max_high: Option<AddressKey> = None;
        for &i in &by_low {
            if max_high.is_some_and(|high| records[i].low <= high) {
                overlaps += 1;
            }
            max_high = max_high.max(Some(records[i].high));
        }

        if overlaps > 0 {
            warn!(
                overlaps,
                "range table has overlapping ranges; flattening so earlier rows take precedence"
            );
            records = flatten(&records, &by_low);
        } else {
            records.sort_by_key(|record| record.low);
        }

        Self { records, overlaps }
    }

    /// Read a whole range table file and index it
    ///
    /// # Errors
    /// Returns [`GeoIpError::SourceUnavailable`](crate::geoip::GeoIpError::SourceUnavailable)
    /// when the file cannot be opened.
    pub fn load<P: AsRef<Path>>(path: P) -> GeoIpResult<Self> {
        let path = path.as_ref();
        let mut reader = RangeTableReader::open(path)?;
        let index = Self::build(reader.by_ref());

        info!(
            path = %path.display(),
            ranges = index.len(),
            skipped = reader.skipped(),
            "loaded range table"
        );

        Ok(index)
    }

    /// Number of indexed segments; differs from the row count once flattened
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records that start inside an earlier (lower) range
    pub fn overlaps(&self) -> usize {
        self.overlaps
    }

    /// Find the range containing `key`
    pub fn lookup(&self, key: &AddressKey) -> Option<&RangeRecord> {
        let idx = self.records.partition_point(|record| record.low <= *key);
        if idx == 0 {
            return None;
        }

        let candidate = &self.records[idx - 1];
        candidate.contains(key).then_some(candidate)
    }

    /// Country code for `key`, or the unknown code
    pub fn classify(&self, key: &AddressKey) -> &str {
        self.lookup(key)
            .map(|record| country_or_unknown(&record.country_code))
            .unwrap_or(UNKNOWN_COUNTRY)
    }

    /// Country code for a textual address, or the unknown code
    pub fn classify_str(&self, address: &str) -> &str {
        match normalize(address) {
            Ok(key) => self.classify(&key),
            Err(e) => {
                debug!(error = %e, "address not classifiable");
                UNKNOWN_COUNTRY
            }
        }
    }
}

/// Split overlapping records into disjoint segments
///
/// Every low bound and every `high + 1` starts a segment. Within a segment
/// the set of covering records is constant, and the one with the smallest
/// input position wins. Adjacent segments won by the same record are merged.
fn flatten(records: &[RangeRecord], by_low: &[usize]) -> Vec<RangeRecord> {
    let mut boundaries: Vec<u128> = records
        .iter()
        .flat_map(|r| {
            let start = r.low.as_u128();
            let after = r.high.as_u128().checked_add(1);
            std::iter::once(start).chain(after)
        })
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    // Active records as (input position, high), smallest position on top
    let mut active: BinaryHeap<Reverse<(usize, u128)>> = BinaryHeap::new();
    let mut next = 0;
    let mut segments: Vec<(usize, u128, u128)> = Vec::new();

    for (j, &start) in boundaries.iter().enumerate() {
        while next < by_low.len() && records[by_low[next]].low.as_u128() <= start {
            let i = by_low[next];
            active.push(Reverse((i, records[i].high.as_u128())));
            next += 1;
        }
        while active.peek().is_some_and(|Reverse((_, high))| *high < start) {
            active.pop();
        }

        let Some(&Reverse((winner, _))) = active.peek() else {
            continue;
        };
        let end = boundaries
            .get(j + 1)
            .map(|b| b - 1)
            .unwrap_or(u128::MAX);

        let extends = matches!(
            segments.last(),
            Some(&(prev, _, prev_end)) if prev == winner && prev_end.checked_add(1) == Some(start)
        );
        if extends {
            if let Some(last) = segments.last_mut() {
                last.2 = end;
            }
        } else {
            segments.push((winner, start, end));
        }
    }

    segments
        .into_iter()
        .map(|(i, low, high)| RangeRecord {
            low: AddressKey::from_u128(low),
            high: AddressKey::from_u128(high),
            country_code: records[i].country_code.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoip::classifier::classify;
    use crate::geoip::range::parse_record;

    fn index(rows: &[[&str; 3]]) -> RangeIndex {
        RangeIndex::build(rows.iter().map(|row| parse_record(&row[..]).unwrap()))
    }

    #[test]
    fn test_lookup_sorted_table() {
        let idx = index(&[
            ["1.0.0.0", "1.0.0.255", "AU"],
            ["1.0.1.0", "1.0.3.255", "CN"],
            ["1.0.8.0", "1.0.15.255", "CN"],
            ["2001:200::", "2001:200:ffff:ffff:ffff:ffff:ffff:ffff", "JP"],
        ]);

        assert_eq!(idx.len(), 4);
        assert_eq!(idx.overlaps(), 0);
        assert_eq!(idx.classify_str("1.0.0.128"), "AU");
        assert_eq!(idx.classify_str("1.0.2.1"), "CN");
        assert_eq!(idx.classify_str("1.0.4.0"), "ZZ");
        assert_eq!(idx.classify_str("0.255.255.255"), "ZZ");
        assert_eq!(idx.classify_str("2001:200::1"), "JP");
        assert_eq!(idx.classify_str("2001:201::"), "ZZ");
        assert_eq!(idx.classify_str("not-an-ip"), "ZZ");
    }

    #[test]
    fn test_build_sorts_input() {
        let idx = index(&[
            ["1.0.8.0", "1.0.15.255", "CN"],
            ["1.0.0.0", "1.0.0.255", "AU"],
        ]);
        assert_eq!(idx.classify_str("1.0.0.1"), "AU");
        assert_eq!(idx.classify_str("1.0.9.1"), "CN");
    }

    #[test]
    fn test_overlaps_are_counted() {
        let idx = index(&[
            ["10.0.0.0", "10.255.255.255", "US"],
            ["10.1.0.0", "10.1.255.255", "CA"],
        ]);
        assert_eq!(idx.overlaps(), 1);
    }

    #[test]
    fn test_overlaps_count_every_nested_range() {
        let idx = index(&[
            ["10.0.0.0", "10.255.255.255", "US"],
            ["10.1.0.0", "10.1.0.255", "CA"],
            ["10.2.0.0", "10.2.0.255", "MX"],
            ["10.3.0.0", "10.3.0.255", "BR"],
        ]);
        assert_eq!(idx.overlaps(), 3);
    }

    #[test]
    fn test_nested_ranges_match_file_order_scan() {
        let rows = [
            ["10.0.0.0", "10.255.255.255", "US"],
            ["10.1.0.0", "10.1.255.255", "CA"],
        ];
        let records: Vec<RangeRecord> = rows.iter().map(|r| parse_record(&r[..]).unwrap()).collect();
        let idx = RangeIndex::build(records.clone());

        for address in ["10.0.0.1", "10.1.0.0", "10.1.2.3", "10.2.0.0", "10.255.255.255", "11.0.0.0"] {
            let key = normalize(address).unwrap();
            assert_eq!(idx.classify(&key), classify(&key, records.clone()), "{address}");
        }
        assert_eq!(idx.classify_str("10.2.0.0"), "US");
        assert_eq!(idx.classify_str("10.1.2.3"), "US");
    }

    #[test]
    fn test_unsorted_overlaps_earlier_row_wins() {
        let rows = [
            ["10.1.0.0", "10.1.255.255", "CA"],
            ["10.0.0.0", "10.255.255.255", "US"],
            ["10.0.128.0", "10.3.0.0", "MX"],
            ["9.0.0.0", "10.0.0.0", "BR"],
        ];
        let records: Vec<RangeRecord> = rows.iter().map(|r| parse_record(&r[..]).unwrap()).collect();
        let idx = RangeIndex::build(records.clone());

        assert_eq!(idx.classify_str("10.1.2.3"), "CA");
        assert_eq!(idx.classify_str("10.2.0.0"), "US");
        assert_eq!(idx.classify_str("10.0.0.0"), "US");
        assert_eq!(idx.classify_str("9.255.255.255"), "BR");

        for address in [
            "8.255.255.255", "9.0.0.0", "10.0.0.0", "10.0.127.255", "10.0.128.0", "10.0.255.255",
            "10.1.0.0", "10.1.255.255", "10.2.0.0", "10.3.0.0", "10.3.0.1", "10.255.255.255",
            "11.0.0.0",
        ] {
            let key = normalize(address).unwrap();
            assert_eq!(idx.classify(&key), classify(&key, records.clone()), "{address}");
        }
    }

    #[test]
    fn test_overlap_reaching_top_of_key_space() {
        let records = vec![
            RangeRecord {
                low: AddressKey::from_u128(u128::MAX - 10),
                high: AddressKey::MAX,
                country_code: "AA".to_string(),
            },
            RangeRecord {
                low: AddressKey::from_u128(u128::MAX - 20),
                high: AddressKey::MAX,
                country_code: "BB".to_string(),
            },
        ];
        let idx = RangeIndex::build(records);
        assert_eq!(idx.classify(&AddressKey::MAX), "AA");
        assert_eq!(idx.classify(&AddressKey::from_u128(u128::MAX - 15)), "BB");
        assert_eq!(idx.classify(&AddressKey::from_u128(u128::MAX - 21)), "ZZ");
    }

    #[test]
    fn test_unparseable_address_matches_scan() {
        let rows = [["1.0.0.0", "1.0.0.255", "AU"]];
        let records: Vec<RangeRecord> = rows.iter().map(|r| parse_record(&r[..]).unwrap()).collect();
        let idx = RangeIndex::build(records.clone());

        for address in ["", "not-an-ip", " 1.0.0.1", "1.0.0", "2001:db8:::1"] {
            assert_eq!(
                idx.classify_str(address),
                crate::geoip::classifier::classify_str(address, records.clone()),
                "{address:?}"
            );
            assert_eq!(idx.classify_str(address), "ZZ");
        }
    }

    #[test]
    fn test_empty_index() {
        let idx = RangeIndex::default();
        assert!(idx.is_empty());
        assert!(idx.lookup(&AddressKey::MAX).is_none());
        assert_eq!(idx.classify(&AddressKey::MIN), "ZZ");
    }
}
