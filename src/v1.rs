//! The legacy (version 1) snapshot schema and its lossless translation to
//! and from the current in-memory form.

use std::collections::BTreeMap;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::Address;
use crate::data::{
    Argument, CallArg, Command, Expiration, GasData, IntentInput, MakeMoveVec, MergeCoins,
    MoveCall, ObjectArg, Publish, RawValue, RawValueKind, SplitCoins, TransactionIntent,
    TransactionState, TransferObjects, Upgrade,
};
use crate::error::Error;
use crate::type_tag::TypeTag;

/// A version-1 snapshot. Inputs are positional entries tagged by kind with a
/// separate value; commands live under `transactions` with a `kind` tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStateV1 {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
    #[serde(default)]
    pub gas_config: GasData,
    #[serde(default)]
    pub inputs: Vec<InputV1>,
    #[serde(default)]
    pub transactions: Vec<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKindV1 {
    Input,
    Object,
    Pure,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputV1 {
    pub kind: InputKindV1,
    pub index: u16,
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<RawValueKind>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum ArgumentV1 {
    GasCoin,
    Input {
        index: u16,
    },
    Result {
        index: u16,
    },
    NestedResult {
        index: u16,
        #[serde(rename = "resultIndex")]
        result_index: u16,
    },
    IntentResult {
        index: u16,
    },
    NestedIntentResult {
        index: u16,
        #[serde(rename = "resultIndex")]
        result_index: u16,
    },
}

impl From<Argument> for ArgumentV1 {
    fn from(arg: Argument) -> Self {
        match arg {
            Argument::GasCoin => ArgumentV1::GasCoin,
            Argument::Input(index) => ArgumentV1::Input { index },
            Argument::Result(index) => ArgumentV1::Result { index },
            Argument::NestedResult(index, result_index) => ArgumentV1::NestedResult {
                index,
                result_index,
            },
            Argument::IntentResult(index) => ArgumentV1::IntentResult { index },
            Argument::NestedIntentResult(index, result_index) => ArgumentV1::NestedIntentResult {
                index,
                result_index,
            },
        }
    }
}

impl From<ArgumentV1> for Argument {
    fn from(arg: ArgumentV1) -> Self {
        match arg {
            ArgumentV1::GasCoin => Argument::GasCoin,
            ArgumentV1::Input { index } => Argument::Input(index),
            ArgumentV1::Result { index } => Argument::Result(index),
            ArgumentV1::NestedResult {
                index,
                result_index,
            } => Argument::NestedResult(index, result_index),
            ArgumentV1::IntentResult { index } => Argument::IntentResult(index),
            ArgumentV1::NestedIntentResult {
                index,
                result_index,
            } => Argument::NestedIntentResult(index, result_index),
        }
    }
}

// Per-kind payloads of the v1 `transactions` entries.

#[derive(Serialize, Deserialize)]
struct MoveCallV1 {
    target: String,
    #[serde(rename = "typeArguments", default)]
    type_arguments: Vec<TypeTag>,
    #[serde(default)]
    arguments: Vec<ArgumentV1>,
}

#[derive(Serialize, Deserialize)]
struct TransferObjectsV1 {
    objects: Vec<ArgumentV1>,
    address: ArgumentV1,
}

#[derive(Serialize, Deserialize)]
struct SplitCoinsV1 {
    coin: ArgumentV1,
    amounts: Vec<ArgumentV1>,
}

#[derive(Serialize, Deserialize)]
struct MergeCoinsV1 {
    destination: ArgumentV1,
    sources: Vec<ArgumentV1>,
}

#[derive(Serialize, Deserialize)]
struct PublishV1 {
    modules: Vec<Vec<u8>>,
    dependencies: Vec<Address>,
}

#[derive(Serialize, Deserialize)]
struct UpgradeV1 {
    modules: Vec<Vec<u8>>,
    dependencies: Vec<Address>,
    #[serde(rename = "packageId")]
    package_id: Address,
    ticket: ArgumentV1,
}

#[derive(Serialize, Deserialize)]
struct MakeMoveVecV1 {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_: Option<TypeTag>,
    objects: Vec<ArgumentV1>,
}

#[derive(Serialize, Deserialize)]
struct IntentV1 {
    name: String,
    #[serde(default)]
    inputs: BTreeMap<String, IntentInputV1>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    data: Value,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IntentInputV1 {
    Single(ArgumentV1),
    List(Vec<ArgumentV1>),
}

/// Translate a v1 snapshot into the current form. Input order and command
/// indices are preserved exactly.
pub fn to_v2(v1: &TransactionStateV1) -> Result<TransactionState, Error> {
    if v1.version != 1 {
        return Err(Error::validation(
            "version",
            format!("expected schema version 1, got {}", v1.version),
        ));
    }

    let inputs = v1
        .inputs
        .iter()
        .map(input_to_v2)
        .collect::<Result<Vec<_>, _>>()?;
    let commands = v1
        .transactions
        .iter()
        .map(command_to_v2)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TransactionState {
        version: 2,
        features: Vec::new(),
        sender: v1.sender,
        expiration: v1.expiration,
        gas_data: v1.gas_config.clone(),
        inputs,
        commands,
    })
}

fn input_to_v2(input: &InputV1) -> Result<CallArg, Error> {
    match input.kind {
        InputKindV1::Pure => Ok(CallArg::pure(bytes_from_value(&input.value)?)),
        InputKindV1::Object => {
            if let Some(id) = input.value.as_str() {
                Ok(CallArg::UnresolvedObject(crate::data::UnresolvedObject {
                    value: id.parse()?,
                    type_signatures: Vec::new(),
                }))
            } else {
                let arg: ObjectArg = serde_json::from_value(input.value.clone())
                    .map_err(|e| Error::DeserializationFailed(e.to_string()))?;
                Ok(CallArg::Object(arg))
            }
        }
        InputKindV1::Input => Ok(CallArg::RawValue(RawValue {
            value: input.value.clone(),
            kind: input.value_type,
        })),
    }
}

/// Pure bytes in v1 snapshots appear either as a number array or as base64
/// text.
fn bytes_from_value(value: &Value) -> Result<Vec<u8>, Error> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| {
                        Error::DeserializationFailed("pure bytes must be 0-255".into())
                    })
            })
            .collect(),
        Value::String(text) => base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|e| Error::DeserializationFailed(e.to_string())),
        other => Err(Error::DeserializationFailed(format!(
            "unsupported pure value {other}"
        ))),
    }
}

fn command_to_v2(value: &Value) -> Result<Command, Error> {
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::DeserializationFailed("transaction entry without kind".into()))?;

    fn parse<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, Error> {
        serde_json::from_value(value.clone())
            .map_err(|e| Error::DeserializationFailed(e.to_string()))
    }

    Ok(match kind {
        "MoveCall" => {
            let call: MoveCallV1 = parse(value)?;
            let mut parts = call.target.split("::");
            let (package, module, function) = match (parts.next(), parts.next(), parts.next()) {
                (Some(p), Some(m), Some(f)) if parts.next().is_none() => (p, m, f),
                _ => {
                    return Err(Error::DeserializationFailed(format!(
                        "malformed move call target {:?}",
                        call.target
                    )))
                }
            };
            Command::MoveCall(MoveCall {
                package: package.parse()?,
                module: module.parse()?,
                function: function.parse()?,
                type_arguments: call.type_arguments,
                arguments: call.arguments.into_iter().map(Into::into).collect(),
            })
        }
        "TransferObjects" => {
            let transfer: TransferObjectsV1 = parse(value)?;
            Command::TransferObjects(TransferObjects {
                objects: transfer.objects.into_iter().map(Into::into).collect(),
                recipient: transfer.address.into(),
            })
        }
        "SplitCoins" => {
            let split: SplitCoinsV1 = parse(value)?;
            Command::SplitCoins(SplitCoins {
                coin: split.coin.into(),
                amounts: split.amounts.into_iter().map(Into::into).collect(),
            })
        }
        "MergeCoins" => {
            let merge: MergeCoinsV1 = parse(value)?;
            Command::MergeCoins(MergeCoins {
                destination: merge.destination.into(),
                sources: merge.sources.into_iter().map(Into::into).collect(),
            })
        }
        "Publish" => {
            let publish: PublishV1 = parse(value)?;
            Command::Publish(Publish {
                modules: publish.modules,
                dependencies: publish.dependencies,
            })
        }
        "Upgrade" => {
            let upgrade: UpgradeV1 = parse(value)?;
            Command::Upgrade(Upgrade {
                modules: upgrade.modules,
                dependencies: upgrade.dependencies,
                package_id: upgrade.package_id,
                ticket: upgrade.ticket.into(),
            })
        }
        "MakeMoveVec" => {
            let make_vec: MakeMoveVecV1 = parse(value)?;
            Command::MakeMoveVec(MakeMoveVec {
                type_: make_vec.type_,
                elements: make_vec.objects.into_iter().map(Into::into).collect(),
            })
        }
        "Intent" => {
            let intent: IntentV1 = parse(value)?;
            Command::TransactionIntent(TransactionIntent {
                name: intent.name,
                inputs: intent
                    .inputs
                    .into_iter()
                    .map(|(key, input)| {
                        let input = match input {
                            IntentInputV1::Single(arg) => IntentInput::Single(arg.into()),
                            IntentInputV1::List(args) => {
                                IntentInput::List(args.into_iter().map(Into::into).collect())
                            }
                        };
                        (key, input)
                    })
                    .collect(),
                data: intent.data,
            })
        }
        other => return Err(Error::UnexpectedCommandKind(other.to_owned())),
    })
}

/// Translate the current form back into a v1 snapshot.
pub fn to_v1(state: &TransactionState) -> Result<TransactionStateV1, Error> {
    let inputs = state
        .inputs
        .iter()
        .enumerate()
        .map(|(index, input)| input_to_v1(index as u16, input))
        .collect::<Result<Vec<_>, _>>()?;
    let transactions = state
        .commands
        .iter()
        .map(command_to_v1)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TransactionStateV1 {
        version: 1,
        sender: state.sender,
        expiration: state.expiration,
        gas_config: state.gas_data.clone(),
        inputs,
        transactions,
    })
}

fn input_to_v1(index: u16, input: &CallArg) -> Result<InputV1, Error> {
    Ok(match input {
        CallArg::Pure(pure) => InputV1 {
            kind: InputKindV1::Pure,
            index,
            value: Value::Array(pure.bytes.iter().map(|b| Value::from(*b)).collect()),
            value_type: Some(RawValueKind::Pure),
        },
        CallArg::Object(arg) => InputV1 {
            kind: InputKindV1::Object,
            index,
            value: serde_json::to_value(arg)
                .map_err(|e| Error::DeserializationFailed(e.to_string()))?,
            value_type: Some(RawValueKind::Object),
        },
        CallArg::UnresolvedObject(unresolved) => InputV1 {
            kind: InputKindV1::Object,
            index,
            value: Value::String(unresolved.value.to_string()),
            value_type: Some(RawValueKind::Object),
        },
        CallArg::RawValue(raw) => InputV1 {
            kind: InputKindV1::Input,
            index,
            value: raw.value.clone(),
            value_type: raw.kind,
        },
    })
}

fn command_to_v1(command: &Command) -> Result<Value, Error> {
    fn with_kind<T: Serialize>(kind: &str, payload: &T) -> Result<Value, Error> {
        let mut value = serde_json::to_value(payload)
            .map_err(|e| Error::DeserializationFailed(e.to_string()))?;
        match value.as_object_mut() {
            Some(map) => {
                map.insert("kind".into(), Value::String(kind.into()));
                Ok(value)
            }
            None => Err(Error::DeserializationFailed(format!(
                "{kind} payload did not serialize to an object"
            ))),
        }
    }

    match command {
        Command::MoveCall(call) => with_kind(
            "MoveCall",
            &MoveCallV1 {
                target: format!("{}::{}::{}", call.package, call.module, call.function),
                type_arguments: call.type_arguments.clone(),
                arguments: call.arguments.iter().copied().map(Into::into).collect(),
            },
        ),
        Command::TransferObjects(transfer) => with_kind(
            "TransferObjects",
            &TransferObjectsV1 {
                objects: transfer.objects.iter().copied().map(Into::into).collect(),
                address: transfer.recipient.into(),
            },
        ),
        Command::SplitCoins(split) => with_kind(
            "SplitCoins",
            &SplitCoinsV1 {
                coin: split.coin.into(),
                amounts: split.amounts.iter().copied().map(Into::into).collect(),
            },
        ),
        Command::MergeCoins(merge) => with_kind(
            "MergeCoins",
            &MergeCoinsV1 {
                destination: merge.destination.into(),
                sources: merge.sources.iter().copied().map(Into::into).collect(),
            },
        ),
        Command::Publish(publish) => with_kind(
            "Publish",
            &PublishV1 {
                modules: publish.modules.clone(),
                dependencies: publish.dependencies.clone(),
            },
        ),
        Command::Upgrade(upgrade) => with_kind(
            "Upgrade",
            &UpgradeV1 {
                modules: upgrade.modules.clone(),
                dependencies: upgrade.dependencies.clone(),
                package_id: upgrade.package_id,
                ticket: upgrade.ticket.into(),
            },
        ),
        Command::MakeMoveVec(make_vec) => with_kind(
            "MakeMoveVec",
            &MakeMoveVecV1 {
                type_: make_vec.type_.clone(),
                objects: make_vec.elements.iter().copied().map(Into::into).collect(),
            },
        ),
        Command::TransactionIntent(intent) => with_kind(
            "Intent",
            &IntentV1 {
                name: intent.name.clone(),
                inputs: intent
                    .inputs
                    .iter()
                    .map(|(key, input)| {
                        let input = match input {
                            IntentInput::Single(arg) => IntentInputV1::Single((*arg).into()),
                            IntentInput::List(args) => IntentInputV1::List(
                                args.iter().copied().map(Into::into).collect(),
                            ),
                        };
                        (key.clone(), input)
                    })
                    .collect(),
                data: intent.data.clone(),
            },
        ),
    }
}
