//! Decimal-encoded address conversion
//!
//! Range tables such as IP2Location LITE store bounds as base-10 integers.
//! IPv6 bounds reach 2^128 - 1, so the wide path works on the digit string
//! directly with schoolbook long division by 256 instead of any fixed-width
//! or floating-point intermediate.

use crate::geoip::error::{GeoIpError, GeoIpResult};
use crate::geoip::key::AddressKey;

/// Longest decimal string that can still be an IPv4-sized bound
const MAX_V4_DECIMAL_DIGITS: usize = 10;

/// True when `dec` is non-empty and made only of ASCII digits
pub fn is_decimal(dec: &str) -> bool {
    !dec.is_empty() && dec.bytes().all(|b| b.is_ascii_digit())
}

/// Decide whether a decimal high bound describes an IPv4 range
///
/// The bound must have at most 10 digits and a value no greater than
/// `u32::MAX`. The decision made for the high bound applies to both bounds
/// of the record.
pub fn is_v4_sized_decimal(high: &str) -> bool {
    is_decimal(high)
        && high.len() <= MAX_V4_DECIMAL_DIGITS
        && high
            .parse::<u64>()
            .map(|value| value <= u64::from(u32::MAX))
            .unwrap_or(false)
}

/// Convert a decimal integer string into an address key
///
/// With `is_v4_sized` the value is read as a 32-bit IPv4 address and embedded
/// as an IPv4-mapped key. Otherwise it is converted exactly into a 128-bit
/// big-endian value.
///
/// # Errors
/// Returns [`GeoIpError::MalformedRange`] for empty input, non-digit
/// characters, or values too large for the selected width.
pub fn decimal_to_key(dec: &str, is_v4_sized: bool) -> GeoIpResult<AddressKey> {
    if !is_decimal(dec) {
        return Err(GeoIpError::MalformedRange(format!(
            "'{dec}' is not a decimal integer"
        )));
    }

    if is_v4_sized {
        let value = dec.parse::<u32>().map_err(|_| {
            GeoIpError::MalformedRange(format!("'{dec}' does not fit an IPv4 address"))
        })?;
        return Ok(AddressKey::from_ipv4_u32(value));
    }

    let bytes = decimal_to_be_bytes(dec).ok_or_else(|| {
        GeoIpError::MalformedRange(format!("'{dec}' does not fit an IPv6 address"))
    })?;
    Ok(AddressKey::from_bytes(bytes))
}

/// Repeatedly divide the digit array by 256, collecting remainders as bytes.
///
/// Returns `None` once more than 16 bytes would be needed.
fn decimal_to_be_bytes(dec: &str) -> Option<[u8; 16]> {
    let mut digits: Vec<u8> = dec
        .bytes()
        .map(|b| b - b'0')
        .skip_while(|&d| d == 0)
        .collect();

    let mut out = [0u8; 16];
    let mut written = 0;

    while !digits.is_empty() {
        if written == out.len() {
            return None;
        }

        let mut quotient = Vec::with_capacity(digits.len());
        let mut remainder: u32 = 0;
        for &digit in &digits {
            remainder = remainder * 10 + u32::from(digit);
            let q = remainder / 256;
            remainder %= 256;
            if !(quotient.is_empty() && q == 0) {
                quotient.push(q as u8);
            }
        }

        out[out.len() - 1 - written] = remainder as u8;
        written += 1;
        digits = quotient;
    }

    Some(out)
}
