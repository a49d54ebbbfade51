//! Canonical ordered address keys
//!
//! Every address, IPv4 or IPv6, is mapped into one 128-bit space so that a
//! single byte-wise comparison orders both families. IPv4 addresses are
//! embedded as IPv4-mapped IPv6 (`::ffff:a.b.c.d`).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::geoip::error::{GeoIpError, GeoIpResult};

/// Bytes 10 and 11 of an IPv4-mapped key
const V4_MAPPED_MARKER: [u8; 2] = [0xff, 0xff];

/// 16-byte big-endian address key
///
/// Ordering is the derived lexicographic ordering of the byte array, which
/// is the unsigned numeric ordering of the 128-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AddressKey([u8; 16]);

impl AddressKey {
    pub const MIN: AddressKey = AddressKey([0; 16]);
    pub const MAX: AddressKey = AddressKey([0xff; 16]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    pub const fn as_u128(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    /// Embed a 32-bit IPv4 value into the mapped region
    pub fn from_ipv4_u32(value: u32) -> Self {
        let mut bytes = [0u8; 16];
        bytes[10..12].copy_from_slice(&V4_MAPPED_MARKER);
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// True when the key lies in `::ffff:0:0/96`
    pub fn is_ipv4_mapped(&self) -> bool {
        self.0[..10].iter().all(|&b| b == 0) && self.0[10..12] == V4_MAPPED_MARKER
    }

    /// Convert back to an address; mapped keys come back as IPv4
    pub fn to_ip_addr(&self) -> IpAddr {
        if self.is_ipv4_mapped() {
            IpAddr::V4(Ipv4Addr::new(self.0[12], self.0[13], self.0[14], self.0[15]))
        } else {
            IpAddr::V6(Ipv6Addr::from(self.0))
        }
    }
}

/// Parse a textual IPv4 or IPv6 literal into its canonical key
///
/// # Errors
/// Returns [`GeoIpError::InvalidAddress`] when the text is neither an IPv4
/// nor an IPv6 literal.
pub fn normalize(input: &str) -> GeoIpResult<AddressKey> {
    input
        .parse::<IpAddr>()
        .map(AddressKey::from)
        .map_err(|_| GeoIpError::InvalidAddress(input.to_string()))
}

impl From<Ipv4Addr> for AddressKey {
    fn from(addr: Ipv4Addr) -> Self {
        Self::from_ipv4_u32(u32::from(addr))
    }
}

impl From<Ipv6Addr> for AddressKey {
    fn from(addr: Ipv6Addr) -> Self {
        Self(addr.octets())
    }
}

impl From<IpAddr> for AddressKey {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Ipv6Addr::from(self.0), f)
    }
}
