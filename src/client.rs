use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::data::encoding;
use crate::digest::Digest;
use crate::error::BoxError;

/// The native coin type used for gas payments.
pub const NATIVE_COIN_TYPE: &str = "0x2::sui::SUI";

/// Chain state consumed by the resolution pipeline. Implementations wrap an
/// RPC transport; the pipeline never retries and treats every failure as
/// fatal for the current build.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_reference_gas_price(&self) -> Result<u64, BoxError>;

    async fn get_coins(&self, owner: Address, coin_type: &str) -> Result<Vec<Coin>, BoxError>;

    async fn multi_get_objects(
        &self,
        ids: &[Address],
        options: ObjectDataOptions,
    ) -> Result<Vec<ObjectResponse>, BoxError>;

    async fn get_normalized_move_function(
        &self,
        package: Address,
        module: &str,
        function: &str,
    ) -> Result<NormalizedFunction, BoxError>;

    async fn dry_run_transaction_block(
        &self,
        transaction_block: &[u8],
    ) -> Result<DryRunResponse, BoxError>;

    async fn get_protocol_config(&self) -> Result<ProtocolConfig, BoxError>;
}

/// A gas coin owned by some address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub coin_object_id: Address,
    #[serde(with = "encoding::u64_string")]
    pub version: u64,
    pub digest: Digest,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDataOptions {
    pub show_owner: bool,
}

/// One entry of a `multi_get_objects` response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ObjectData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: Address,
    #[serde(with = "encoding::u64_string")]
    pub version: u64,
    pub digest: Digest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
}

/// Object ownership as reported by the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    AddressOwner(Address),
    ObjectOwner(Address),
    Shared {
        #[serde(with = "encoding::u64_string")]
        initial_shared_version: u64,
    },
    Immutable,
}

/// A Move function signature with generic parameters left open.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFunction {
    pub parameters: Vec<NormalizedType>,
}

/// A normalized Move type, in the chain's JSON form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NormalizedType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Address,
    Signer,
    Struct(NormalizedStructType),
    Vector(Box<NormalizedType>),
    TypeParameter(u16),
    Reference(Box<NormalizedType>),
    MutableReference(Box<NormalizedType>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStructType {
    pub address: Address,
    pub module: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_arguments: Vec<NormalizedType>,
}

/// Dry-run execution response, reduced to the pieces gas estimation needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DryRunResponse {
    pub effects: DryRunEffects,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunEffects {
    pub status: EffectsStatus,
    pub gas_used: GasCostSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectsStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EffectsStatus {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasCostSummary {
    #[serde(with = "encoding::u64_string")]
    pub computation_cost: u64,
    #[serde(with = "encoding::u64_string")]
    pub storage_cost: u64,
    #[serde(with = "encoding::u64_string")]
    pub storage_rebate: u64,
}

/// Protocol configuration attributes, as reported by the chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub attributes: BTreeMap<String, Option<ProtocolConfigValue>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolConfigValue {
    U32(#[serde(with = "encoding::u64_string")] u64),
    U64(#[serde(with = "encoding::u64_string")] u64),
    F64(f64),
}

impl ProtocolConfigValue {
    fn as_u64(&self) -> Option<u64> {
        match self {
            ProtocolConfigValue::U32(v) | ProtocolConfigValue::U64(v) => Some(*v),
            ProtocolConfigValue::F64(v) => Some(*v as u64),
        }
    }
}

/// Size and gas limits consulted by the pipeline. The defaults are the
/// documented offline values, used when no protocol config is available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionLimits {
    pub max_tx_gas: u64,
    pub max_gas_objects: u64,
    pub max_tx_size_bytes: u64,
    pub max_pure_argument_size: u64,
}

impl Default for TransactionLimits {
    fn default() -> Self {
        Self {
            max_tx_gas: 50_000_000_000,
            max_gas_objects: 256,
            max_tx_size_bytes: 131_072,
            max_pure_argument_size: 16_384,
        }
    }
}

impl TransactionLimits {
    /// Read the limits out of a protocol config, falling back to the offline
    /// defaults for any missing attribute.
    pub fn from_protocol_config(config: &ProtocolConfig) -> Self {
        let defaults = Self::default();
        let attr = |key: &str, fallback: u64| {
            config
                .attributes
                .get(key)
                .and_then(|value| value.as_ref().and_then(ProtocolConfigValue::as_u64))
                .unwrap_or(fallback)
        };
        Self {
            max_tx_gas: attr("max_tx_gas", defaults.max_tx_gas),
            max_gas_objects: attr("max_gas_payment_objects", defaults.max_gas_objects),
            max_tx_size_bytes: attr("max_tx_size_bytes", defaults.max_tx_size_bytes),
            max_pure_argument_size: attr(
                "max_pure_argument_size",
                defaults.max_pure_argument_size,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_json_matches_rpc_shape() {
        let shared: Owner = serde_json::from_value(serde_json::json!({
            "Shared": { "initial_shared_version": 42 }
        }))
        .unwrap();
        assert_eq!(
            shared,
            Owner::Shared {
                initial_shared_version: 42
            }
        );
        let immutable: Owner = serde_json::from_value(serde_json::json!("Immutable")).unwrap();
        assert_eq!(immutable, Owner::Immutable);
    }

    #[test]
    fn normalized_type_json_round_trip() {
        let ty: NormalizedType = serde_json::from_value(serde_json::json!({
            "MutableReference": {
                "Struct": {
                    "address": "0x2",
                    "module": "coin",
                    "name": "Coin",
                    "typeArguments": ["U64"]
                }
            }
        }))
        .unwrap();
        match &ty {
            NormalizedType::MutableReference(inner) => match inner.as_ref() {
                NormalizedType::Struct(s) => {
                    assert_eq!(s.module, "coin");
                    assert_eq!(s.type_arguments, vec![NormalizedType::U64]);
                }
                other => panic!("unexpected inner type {other:?}"),
            },
            other => panic!("unexpected type {other:?}"),
        }
    }

    #[test]
    fn limits_fall_back_per_attribute() {
        let config: ProtocolConfig = serde_json::from_value(serde_json::json!({
            "attributes": {
                "max_tx_gas": { "u64": "1000" },
                "max_gas_payment_objects": { "u32": "8" }
            }
        }))
        .unwrap();
        let limits = TransactionLimits::from_protocol_config(&config);
        assert_eq!(limits.max_tx_gas, 1000);
        assert_eq!(limits.max_gas_objects, 8);
        assert_eq!(limits.max_tx_size_bytes, 131_072);
    }
}
