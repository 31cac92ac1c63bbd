use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A 32-byte account or object identifier.
///
/// The canonical text form is `0x` followed by 64 lowercase hex digits.
/// Shorter forms (`0x2`, `0x2::...` package addresses and the like) are
/// accepted on input and left-padded with zeros.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 32]);

impl Address {
    pub const LENGTH: usize = 32;
    pub const ZERO: Self = Self([0; 32]);

    /// `0x1`, the Move standard library.
    pub const ONE: Self = Self::from_suffix(1);
    /// `0x2`, the system framework package.
    pub const TWO: Self = Self::from_suffix(2);

    const fn from_suffix(byte: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = byte;
        Self(bytes)
    }

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub const fn into_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 64 {
            return Err(Error::InvalidAddress(s.to_owned()));
        }
        // Left-pad short addresses to the full 64-digit width.
        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|_| Error::InvalidAddress(s.to_owned()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            // Binary form is the bare 32 bytes, no length prefix.
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_addresses_are_left_padded() {
        let addr: Address = "0x2".parse().unwrap();
        assert_eq!(
            addr.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000002"
        );
        assert_eq!(addr, Address::TWO);
    }

    #[test]
    fn mixed_case_input_is_canonicalized() {
        let addr: Address = "0xABCdef".parse().unwrap();
        assert!(addr.to_string().ends_with("abcdef"));
    }

    #[test]
    fn rejects_garbage() {
        assert!("0x".parse::<Address>().is_err());
        assert!("zz".parse::<Address>().is_err());
        assert!(format!("0x{}", "0".repeat(65)).parse::<Address>().is_err());
    }

    #[test]
    fn bcs_form_is_fixed_width() {
        let addr: Address = "0x2".parse().unwrap();
        let bytes = bcs::to_bytes(&addr).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[31], 2);
        assert_eq!(bcs::from_bytes::<Address>(&bytes).unwrap(), addr);
    }

    #[test]
    fn json_form_is_canonical_string() {
        let addr: Address = "0x11".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(
            json,
            "\"0x0000000000000000000000000000000000000000000000000000000000000011\""
        );
    }
}
