use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

/// Vendor prefix the console expects on controllers it pairs with.
const SWITCH_OUI: [u8; 3] = [0x7C, 0xBB, 0x8A];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("expected 6 colon-separated octets, got {0}")]
    OctetCount(usize),
    #[error("invalid octet {0:?}")]
    InvalidOctet(String),
}

/// Link-layer address of the emulated controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Random address carrying the Nintendo vendor prefix (`7C:BB:8A:xx:xx:xx`).
    pub fn random_switch_compatible<R: Rng>(rng: &mut R) -> Self {
        let mut octets = [0u8; 6];
        octets[..3].copy_from_slice(&SWITCH_OUI);
        rng.fill(&mut octets[3..]);
        Self(octets)
    }
}

impl FromStr for BdAddr {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.trim().split(':').collect::<Vec<_>>();
        if parts.len() != 6 {
            return Err(AddressError::OctetCount(parts.len()));
        }

        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AddressError::InvalidOctet(part.to_owned()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| AddressError::InvalidOctet(part.to_owned()))?;
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_address() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            "98:B6:E9:12:34:57".parse::<BdAddr>()?.octets(),
            [0x98, 0xB6, 0xE9, 0x12, 0x34, 0x57]
        );
        assert_eq!(
            " 98:b6:e9:12:34:57\n".parse::<BdAddr>()?,
            BdAddr::new([0x98, 0xB6, 0xE9, 0x12, 0x34, 0x57])
        );

        Ok(())
    }

    #[test]
    fn test_reject_bad_addresses() {
        assert_eq!(
            "98:B6:E9:12:34".parse::<BdAddr>(),
            Err(AddressError::OctetCount(5))
        );
        assert_eq!(
            "98:B6:E9:12:34:ZZ".parse::<BdAddr>(),
            Err(AddressError::InvalidOctet("ZZ".into()))
        );
        assert_eq!(
            "98:B6:E9:12:34:+5".parse::<BdAddr>(),
            Err(AddressError::InvalidOctet("+5".into()))
        );
        assert!("".parse::<BdAddr>().is_err());
    }

    #[test]
    fn test_display() {
        let addr = BdAddr::new([0x7C, 0xBB, 0x8A, 0x01, 0x0A, 0xFF]);
        assert_eq!(addr.to_string(), "7C:BB:8A:01:0A:FF");
    }

    #[test]
    fn test_random_switch_compatible() {
        let mut rng = StdRng::seed_from_u64(7);
        let addr = BdAddr::random_switch_compatible(&mut rng);
        assert_eq!(addr.octets()[..3], SWITCH_OUI);
        assert!(addr.to_string().starts_with("7C:BB:8A:"));
    }
}
