//! Composite entity keys.
//!
//! The subgraph identifies entities by joining address and index components with `-`.
//! Address components are always lower-cased so two keys built from the same address in
//! different case compare equal and resolve to the same entity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("invalid address `{0}`: expected 0x followed by 40 hex characters")]
    InvalidAddress(String),

    #[error("composite key has no components")]
    Empty,
}

/// A canonical (lower-cased, validated) 20-byte ledger address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| KeyError::InvalidAddress(raw.to_string()))?;

        if digits.len() != 40 || hex::decode(digits).is_err() {
            return Err(KeyError::InvalidAddress(raw.to_string()));
        }

        Ok(Self(format!("0x{}", digits.to_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw 20 bytes, for ABI encoding.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // validated in `parse`
        if let Ok(bytes) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&bytes);
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A deterministic identifier of a single read-model entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn builder() -> EntityKeyBuilder {
        EntityKeyBuilder::default()
    }

    /// Wrap a key the caller already formatted canonically.
    pub fn from_canonical(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Address> for EntityKey {
    fn from(address: &Address) -> Self {
        Self(address.as_str().to_string())
    }
}

#[derive(Debug, Default, Clone)]
pub struct EntityKeyBuilder {
    parts: Vec<String>,
}

impl EntityKeyBuilder {
    pub fn address(mut self, address: &Address) -> Self {
        self.parts.push(address.as_str().to_string());
        self
    }

    pub fn index(mut self, index: u128) -> Self {
        self.parts.push(index.to_string());
        self
    }

    /// A free-form component, kept verbatim.
    pub fn part(mut self, part: &str) -> Self {
        self.parts.push(part.to_string());
        self
    }

    pub fn build(self) -> Result<EntityKey, KeyError> {
        if self.parts.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(self.finish())
    }

    fn finish(self) -> EntityKey {
        EntityKey(self.parts.join(&SEPARATOR.to_string()))
    }
}

/// `<core>-<projectNumber>`
pub fn project(core: &Address, project_number: u64) -> EntityKey {
    EntityKey::builder().address(core).index(project_number.into()).finish()
}

/// `<minter>-<core>-<projectNumber>`
pub fn minter_config(minter: &Address, core: &Address, project_number: u64) -> EntityKey {
    EntityKey::builder()
        .address(minter)
        .address(core)
        .index(project_number.into())
        .finish()
}

/// `<minter>-<core>-<projectNumber>-<account>`
pub fn receipt(
    minter: &Address,
    core: &Address,
    project_number: u64,
    account: &Address,
) -> EntityKey {
    EntityKey::builder()
        .address(minter)
        .address(core)
        .index(project_number.into())
        .address(account)
        .finish()
}

/// `<minter>-<core>-<projectNumber>-<bidId>`
pub fn bid(minter: &Address, core: &Address, project_number: u64, bid_id: u64) -> EntityKey {
    EntityKey::builder()
        .address(minter)
        .address(core)
        .index(project_number.into())
        .index(bid_id.into())
        .finish()
}

/// `<core>-<projectNumber>`, the PMP project configuration shares the project key layout.
pub fn pmp_project_config(core: &Address, project_number: u64) -> EntityKey {
    project(core, project_number)
}

/// `<core>-<tokenId>-<key>`
pub fn pmp_token_config(core: &Address, token_id: u128, key: &str) -> EntityKey {
    EntityKey::builder().address(core).index(token_id).part(key).finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const MINTER: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";

    #[test]
    fn addresses_are_lower_cased() {
        let addr = Address::parse(CORE).unwrap();
        assert_eq!(addr.as_str(), "0x5fbdb2315678afecb367f032d93f642f64180aa3");
    }

    #[test]
    fn differently_cased_addresses_build_the_same_key() {
        let upper = Address::parse(&CORE.to_uppercase().replacen("0X", "0x", 1)).unwrap();
        let lower = Address::parse(&CORE.to_lowercase()).unwrap();
        let minter = Address::parse(MINTER).unwrap();

        assert_eq!(upper, lower);
        assert_eq!(
            minter_config(&minter, &upper, 3),
            minter_config(&minter, &lower, 3)
        );
        assert_eq!(
            minter_config(&minter, &lower, 3).as_str(),
            "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512-0x5fbdb2315678afecb367f032d93f642f64180aa3-3"
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(Address::parse("5fbdb2315678afecb367f032d93f642f64180aa3").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzzdb2315678afecb367f032d93f642f64180aa3").is_err());
    }

    #[test]
    fn builder_requires_a_component() {
        assert_eq!(EntityKey::builder().build(), Err(KeyError::Empty));
    }

    #[test]
    fn token_config_key_keeps_its_parameter_name_verbatim() {
        let core = Address::parse(CORE).unwrap();
        let key = pmp_token_config(&core, 3_000_001, "BackgroundColor");
        assert_eq!(
            key.as_str(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3-3000001-BackgroundColor"
        );
    }

    #[test]
    fn address_round_trips_through_serde() {
        let addr: Address = serde_json::from_str(&format!("\"{}\"", MINTER)).unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            "\"0xe7f1725e7734ce288f8367e1bb143e90bb3f0512\""
        );
    }
}
