//! Typed projections of the subgraph's entities.
//!
//! Each entity implements [`Entity`], which names its root query field and selection set so the
//! query layer can fetch any of them by key.

use super::keys::Address;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An entity that can be fetched by id from the read model.
pub trait Entity: DeserializeOwned + Send {
    /// Single-entity root field, e.g. `projectMinterConfiguration`.
    const FIELD: &'static str;
    /// GraphQL operation name used for the lookup.
    const OPERATION: &'static str;
    /// Selection set, without the surrounding braces.
    const SELECTION: &'static str;
}

/// A reference to another entity, selected as `{ id }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

/// A reference to an `Account` entity, whose id is the account address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountRef {
    pub id: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Minter {
    pub id: Address,
    #[serde(rename = "type")]
    pub minter_type: String,
    pub minter_filter: Option<EntityRef>,
    pub is_globally_allowlisted_on_minter_filter: bool,
    /// JSON document maintained by the mapping for minter-specific settings.
    pub extra_minter_details: String,
    #[serde(with = "bigint")]
    pub updated_at: u128,
}

impl Entity for Minter {
    const FIELD: &'static str = "minter";
    const OPERATION: &'static str = "Minter";
    const SELECTION: &'static str = "id type minterFilter { id } isGloballyAllowlistedOnMinterFilter extraMinterDetails updatedAt";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinterFilter {
    pub id: Address,
    pub core_registry: EntityRef,
    pub minter_global_allowlist: Vec<EntityRef>,
    #[serde(with = "bigint")]
    pub updated_at: u128,
}

impl Entity for MinterFilter {
    const FIELD: &'static str = "minterFilter";
    const OPERATION: &'static str = "MinterFilter";
    const SELECTION: &'static str = "id coreRegistry { id } minterGlobalAllowlist { id } updatedAt";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(with = "bigint")]
    pub project_id: u128,
    pub name: Option<String>,
    pub contract: EntityRef,
    pub active: bool,
    pub paused: bool,
    #[serde(with = "bigint")]
    pub invocations: u128,
    #[serde(with = "bigint")]
    pub max_invocations: u128,
    pub minter_configuration: Option<EntityRef>,
    #[serde(with = "bigint")]
    pub updated_at: u128,
}

impl Entity for Project {
    const FIELD: &'static str = "project";
    const OPERATION: &'static str = "Project";
    const SELECTION: &'static str = "id projectId name contract { id } active paused invocations maxInvocations minterConfiguration { id } updatedAt";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMinterConfiguration {
    pub id: String,
    pub project: EntityRef,
    pub minter: EntityRef,
    pub price_is_configured: bool,
    /// `None` once the price has been reset.
    #[serde(with = "bigint::option", default)]
    pub base_price: Option<u128>,
    pub currency_symbol: String,
    pub currency_address: Address,
    pub purchase_to_disabled: bool,
    pub extra_minter_details: String,
    #[serde(with = "bigint::option", default)]
    pub max_invocations: Option<u128>,
}

impl Entity for ProjectMinterConfiguration {
    const FIELD: &'static str = "projectMinterConfiguration";
    const OPERATION: &'static str = "ProjectMinterConfiguration";
    const SELECTION: &'static str = "id project { id } minter { id } priceIsConfigured basePrice currencySymbol currencyAddress purchaseToDisabled extraMinterDetails maxInvocations";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    pub project: EntityRef,
    pub minter: EntityRef,
    pub account: AccountRef,
    #[serde(with = "bigint")]
    pub net_posted: u128,
    #[serde(with = "bigint")]
    pub num_purchased: u128,
    #[serde(with = "bigint")]
    pub updated_at: u128,
}

impl Entity for Receipt {
    const FIELD: &'static str = "receipt";
    const OPERATION: &'static str = "Receipt";
    const SELECTION: &'static str = "id project { id } minter { id } account { id } netPosted numPurchased updatedAt";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub project: EntityRef,
    pub minter: EntityRef,
    pub bidder: AccountRef,
    /// Zero once the bid has been displaced.
    #[serde(with = "bigint")]
    pub value: u128,
    /// `None` once the bid has been displaced.
    #[serde(with = "bigint::option", default)]
    pub slot_index: Option<u128>,
    pub is_removed: bool,
    pub settled: bool,
    #[serde(with = "bigint")]
    pub timestamp: u128,
    #[serde(with = "bigint")]
    pub updated_at: u128,
}

impl Entity for Bid {
    const FIELD: &'static str = "bid";
    const OPERATION: &'static str = "Bid";
    const SELECTION: &'static str = "id project { id } minter { id } bidder { id } value slotIndex isRemoved settled timestamp updatedAt";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreRegistry {
    pub id: Address,
    pub registered_contracts: Vec<EntityRef>,
}

impl Entity for CoreRegistry {
    const FIELD: &'static str = "coreRegistry";
    const OPERATION: &'static str = "CoreRegistry";
    const SELECTION: &'static str = "id registeredContracts { id }";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitAtomicFactory {
    pub id: Address,
    #[serde(rename = "type")]
    pub factory_type: String,
    pub implementation: Address,
    pub required_split_address: Address,
    #[serde(with = "bigint")]
    pub required_split_basis_points: u128,
    pub abandoned: bool,
    #[serde(with = "bigint")]
    pub updated_at: u128,
}

impl Entity for SplitAtomicFactory {
    const FIELD: &'static str = "splitAtomicFactory";
    const OPERATION: &'static str = "SplitAtomicFactory";
    const SELECTION: &'static str = "id type implementation requiredSplitAddress requiredSplitBasisPoints abandoned updatedAt";
}

/// Programmable metadata parameters configured for a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmpProjectConfig {
    pub id: String,
    pub project: EntityRef,
    #[serde(with = "bigint")]
    pub pmp_config_count: u128,
    pub pmp_config_keys: Vec<String>,
    #[serde(with = "bigint")]
    pub updated_at: u128,
}

impl Entity for PmpProjectConfig {
    const FIELD: &'static str = "pmpProjectConfig";
    const OPERATION: &'static str = "PmpProjectConfig";
    const SELECTION: &'static str = "id project { id } pmpConfigCount pmpConfigKeys updatedAt";
}

/// The value a token owner (or artist) configured for one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmpTokenConfig {
    pub id: String,
    pub token: EntityRef,
    pub key: String,
    pub value: Option<String>,
    #[serde(with = "bigint")]
    pub updated_at: u128,
}

impl Entity for PmpTokenConfig {
    const FIELD: &'static str = "pmpTokenConfig";
    const OPERATION: &'static str = "PmpTokenConfig";
    const SELECTION: &'static str = "id token { id } key value updatedAt";
}

/// `BigInt` scalars arrive as decimal strings.
pub(crate) mod bigint {
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    fn parse<E: Error>(raw: Raw) -> Result<u128, E> {
        match raw {
            Raw::Text(text) => text
                .parse::<u128>()
                .map_err(|e| E::custom(format!("invalid BigInt `{text}`: {e}"))),
            Raw::Number(n) => Ok(n.into()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        parse(Raw::deserialize(deserializer)?)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u128>, D::Error> {
            Option::<Raw>::deserialize(deserializer)?
                .map(parse::<D::Error>)
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minter_config_decodes_reset_price_as_none() {
        let raw = json!({
            "id": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512-0x5fbdb2315678afecb367f032d93f642f64180aa3-0",
            "project": { "id": "0x5fbdb2315678afecb367f032d93f642f64180aa3-0" },
            "minter": { "id": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512" },
            "priceIsConfigured": false,
            "basePrice": null,
            "currencySymbol": "ETH",
            "currencyAddress": "0x0000000000000000000000000000000000000000",
            "purchaseToDisabled": false,
            "extraMinterDetails": "{}",
            "maxInvocations": "1000"
        });
        let config: ProjectMinterConfiguration = serde_json::from_value(raw).unwrap();

        assert!(!config.price_is_configured);
        assert_eq!(config.base_price, None);
        assert_eq!(config.max_invocations, Some(1000));
    }

    #[test]
    fn bid_value_larger_than_u64_decodes() {
        let raw = json!({
            "id": "bid",
            "project": { "id": "p" },
            "minter": { "id": "m" },
            "bidder": { "id": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8" },
            "value": "50000000000000000000",
            "slotIndex": "10",
            "isRemoved": false,
            "settled": false,
            "timestamp": "1700000000",
            "updatedAt": 1700000000u64
        });
        let bid: Bid = serde_json::from_value(raw).unwrap();

        assert_eq!(bid.value, 50_000_000_000_000_000_000);
        assert_eq!(bid.slot_index, Some(10));
        assert_eq!(bid.bidder.id.as_str(), "0x70997970c51812dc3a010c7d01b50e0d17dc79c8");
    }

    #[test]
    fn receipt_account_is_an_entity_reference() {
        let raw = json!({
            "id": "receipt",
            "project": { "id": "p" },
            "minter": { "id": "m" },
            "account": { "id": "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC" },
            "netPosted": "20000000000000000",
            "numPurchased": "2",
            "updatedAt": "1700000000"
        });
        let receipt: Receipt = serde_json::from_value(raw).unwrap();

        assert_eq!(
            receipt.account.id.as_str(),
            "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"
        );
        assert_eq!(receipt.num_purchased, 2);
        assert!(Receipt::SELECTION.contains("account { id }"));
    }

    #[test]
    fn malformed_bigint_is_rejected() {
        let raw = json!({
            "id": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512",
            "registeredContracts": [],
        });
        assert!(serde_json::from_value::<CoreRegistry>(raw).is_ok());

        let raw = json!({
            "id": "p",
            "project": { "id": "p" },
            "pmpConfigCount": "two",
            "pmpConfigKeys": [],
            "updatedAt": "1"
        });
        assert!(serde_json::from_value::<PmpProjectConfig>(raw).is_err());
    }
}
