//! The canonical binary form. Wire types mirror the chain's BCS layout
//! exactly; the in-memory state is lowered into them at encode time and
//! lifted back out when parsing bytes.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::data::{
    Argument, CallArg, Command, Expiration, GasData, MakeMoveVec, MergeCoins, MoveCall,
    ObjectArg, ObjectRef, Publish, SharedObjectRef, SplitCoins, TransactionState,
    TransferObjects, Upgrade,
};
use crate::digest::Digest;
use crate::error::Error;
use crate::type_tag::{Identifier, TypeTag};

#[derive(Serialize, Deserialize)]
enum WireTransactionData {
    V1(WireTransactionDataV1),
}

#[derive(Serialize, Deserialize)]
struct WireTransactionDataV1 {
    kind: WireTransactionKind,
    sender: Address,
    gas_data: WireGasData,
    expiration: WireExpiration,
}

#[derive(Serialize, Deserialize)]
struct WireGasData {
    payment: Vec<WireObjectRef>,
    owner: Address,
    price: u64,
    budget: u64,
}

#[derive(Serialize, Deserialize)]
struct WireObjectRef(Address, u64, Digest);

#[derive(Serialize, Deserialize)]
enum WireExpiration {
    None,
    Epoch(u64),
}

#[derive(Serialize, Deserialize)]
enum WireTransactionKind {
    ProgrammableTransaction(WireProgrammableTransaction),
}

#[derive(Serialize, Deserialize)]
struct WireProgrammableTransaction {
    inputs: Vec<WireCallArg>,
    commands: Vec<WireCommand>,
}

#[derive(Serialize, Deserialize)]
enum WireCallArg {
    Pure(Vec<u8>),
    Object(WireObjectArg),
}

#[derive(Serialize, Deserialize)]
enum WireObjectArg {
    ImmOrOwnedObject(WireObjectRef),
    SharedObject {
        object_id: Address,
        initial_shared_version: u64,
        mutable: bool,
    },
    Receiving(WireObjectRef),
}

#[derive(Clone, Copy, Serialize, Deserialize)]
enum WireArgument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

#[derive(Serialize, Deserialize)]
enum WireCommand {
    MoveCall(WireMoveCall),
    TransferObjects(Vec<WireArgument>, WireArgument),
    SplitCoins(WireArgument, Vec<WireArgument>),
    MergeCoins(WireArgument, Vec<WireArgument>),
    Publish(Vec<Vec<u8>>, Vec<Address>),
    MakeMoveVec(Option<TypeTag>, Vec<WireArgument>),
    Upgrade(Vec<Vec<u8>>, Vec<Address>, Address, WireArgument),
}

#[derive(Serialize, Deserialize)]
struct WireMoveCall {
    package: Address,
    module: Identifier,
    function: Identifier,
    type_arguments: Vec<TypeTag>,
    arguments: Vec<WireArgument>,
}

// ── Lowering ─────────────────────────────────────────────────────────────────

impl From<ObjectRef> for WireObjectRef {
    fn from(obj: ObjectRef) -> Self {
        WireObjectRef(obj.object_id, obj.version, obj.digest)
    }
}

impl From<WireObjectRef> for ObjectRef {
    fn from(WireObjectRef(object_id, version, digest): WireObjectRef) -> Self {
        ObjectRef {
            object_id,
            version,
            digest,
        }
    }
}

fn lower_argument(arg: Argument, path: &str) -> Result<WireArgument, Error> {
    match arg {
        Argument::GasCoin => Ok(WireArgument::GasCoin),
        Argument::Input(i) => Ok(WireArgument::Input(i)),
        Argument::Result(i) => Ok(WireArgument::Result(i)),
        Argument::NestedResult(i, j) => Ok(WireArgument::NestedResult(i, j)),
        Argument::IntentResult(_) | Argument::NestedIntentResult(_, _) => Err(Error::validation(
            path,
            "intent results cannot appear in built output",
        )),
    }
}

fn lower_arguments(args: &[Argument], path: &str) -> Result<Vec<WireArgument>, Error> {
    args.iter().map(|arg| lower_argument(*arg, path)).collect()
}

fn lower_input(index: usize, input: &CallArg) -> Result<WireCallArg, Error> {
    let path = format!("inputs[{index}]");
    match input {
        CallArg::Pure(pure) => Ok(WireCallArg::Pure(pure.bytes.clone())),
        CallArg::Object(ObjectArg::ImmOrOwnedObject(obj)) => {
            Ok(WireCallArg::Object(WireObjectArg::ImmOrOwnedObject((*obj).into())))
        }
        CallArg::Object(ObjectArg::SharedObject(obj)) => {
            Ok(WireCallArg::Object(WireObjectArg::SharedObject {
                object_id: obj.object_id,
                initial_shared_version: obj.initial_shared_version,
                mutable: obj.mutable,
            }))
        }
        CallArg::Object(ObjectArg::Receiving(obj)) => {
            Ok(WireCallArg::Object(WireObjectArg::Receiving((*obj).into())))
        }
        CallArg::UnresolvedObject(_) => Err(Error::validation(
            path,
            "object input has not been resolved",
        )),
        CallArg::RawValue(_) => Err(Error::validation(
            path,
            "raw input has not been normalized",
        )),
    }
}

fn lower_command(index: usize, command: &Command) -> Result<WireCommand, Error> {
    let path = format!("commands[{index}]");
    Ok(match command {
        Command::MoveCall(call) => WireCommand::MoveCall(WireMoveCall {
            package: call.package,
            module: call.module.clone(),
            function: call.function.clone(),
            type_arguments: call.type_arguments.clone(),
            arguments: lower_arguments(&call.arguments, &path)?,
        }),
        Command::TransferObjects(transfer) => WireCommand::TransferObjects(
            lower_arguments(&transfer.objects, &path)?,
            lower_argument(transfer.recipient, &path)?,
        ),
        Command::SplitCoins(split) => WireCommand::SplitCoins(
            lower_argument(split.coin, &path)?,
            lower_arguments(&split.amounts, &path)?,
        ),
        Command::MergeCoins(merge) => WireCommand::MergeCoins(
            lower_argument(merge.destination, &path)?,
            lower_arguments(&merge.sources, &path)?,
        ),
        Command::Publish(publish) => {
            WireCommand::Publish(publish.modules.clone(), publish.dependencies.clone())
        }
        Command::MakeMoveVec(vec) => WireCommand::MakeMoveVec(
            vec.type_.clone(),
            lower_arguments(&vec.elements, &path)?,
        ),
        Command::Upgrade(upgrade) => WireCommand::Upgrade(
            upgrade.modules.clone(),
            upgrade.dependencies.clone(),
            upgrade.package_id,
            lower_argument(upgrade.ticket, &path)?,
        ),
        Command::TransactionIntent(intent) => {
            return Err(Error::UnresolvedIntent(intent.name.clone()))
        }
    })
}

fn lower_kind(state: &TransactionState) -> Result<WireTransactionKind, Error> {
    state.validate()?;
    let inputs = state
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| lower_input(i, input))
        .collect::<Result<_, _>>()?;
    let commands = state
        .commands
        .iter()
        .enumerate()
        .map(|(i, command)| lower_command(i, command))
        .collect::<Result<_, _>>()?;
    Ok(WireTransactionKind::ProgrammableTransaction(
        WireProgrammableTransaction { inputs, commands },
    ))
}

fn lower_data(state: &TransactionState) -> Result<WireTransactionData, Error> {
    let sender = state.sender.ok_or(Error::MissingSender)?;
    let budget = state.gas_data.budget.ok_or(Error::MissingGasBudget)?;
    let payment = state
        .gas_data
        .payment
        .as_ref()
        .ok_or(Error::MissingGasPayment)?;
    let price = state.gas_data.price.ok_or(Error::MissingGasPrice)?;

    Ok(WireTransactionData::V1(WireTransactionDataV1 {
        kind: lower_kind(state)?,
        sender,
        gas_data: WireGasData {
            payment: payment.iter().copied().map(Into::into).collect(),
            owner: state.gas_data.owner.unwrap_or(sender),
            price,
            budget,
        },
        expiration: match state.expiration.unwrap_or_default() {
            Expiration::None => WireExpiration::None,
            Expiration::Epoch(epoch) => WireExpiration::Epoch(epoch),
        },
    }))
}

// ── Lifting ──────────────────────────────────────────────────────────────────

fn lift_argument(arg: WireArgument) -> Argument {
    match arg {
        WireArgument::GasCoin => Argument::GasCoin,
        WireArgument::Input(i) => Argument::Input(i),
        WireArgument::Result(i) => Argument::Result(i),
        WireArgument::NestedResult(i, j) => Argument::NestedResult(i, j),
    }
}

fn lift_input(input: WireCallArg) -> CallArg {
    match input {
        WireCallArg::Pure(bytes) => CallArg::pure(bytes),
        WireCallArg::Object(WireObjectArg::ImmOrOwnedObject(obj)) => {
            CallArg::Object(ObjectArg::ImmOrOwnedObject(obj.into()))
        }
        WireCallArg::Object(WireObjectArg::SharedObject {
            object_id,
            initial_shared_version,
            mutable,
        }) => CallArg::Object(ObjectArg::SharedObject(SharedObjectRef {
            object_id,
            initial_shared_version,
            mutable,
        })),
        WireCallArg::Object(WireObjectArg::Receiving(obj)) => {
            CallArg::Object(ObjectArg::Receiving(obj.into()))
        }
    }
}

fn lift_command(command: WireCommand) -> Command {
    match command {
        WireCommand::MoveCall(call) => Command::MoveCall(MoveCall {
            package: call.package,
            module: call.module,
            function: call.function,
            type_arguments: call.type_arguments,
            arguments: call.arguments.into_iter().map(lift_argument).collect(),
        }),
        WireCommand::TransferObjects(objects, recipient) => {
            Command::TransferObjects(TransferObjects {
                objects: objects.into_iter().map(lift_argument).collect(),
                recipient: lift_argument(recipient),
            })
        }
        WireCommand::SplitCoins(coin, amounts) => Command::SplitCoins(SplitCoins {
            coin: lift_argument(coin),
            amounts: amounts.into_iter().map(lift_argument).collect(),
        }),
        WireCommand::MergeCoins(destination, sources) => Command::MergeCoins(MergeCoins {
            destination: lift_argument(destination),
            sources: sources.into_iter().map(lift_argument).collect(),
        }),
        WireCommand::Publish(modules, dependencies) => Command::Publish(Publish {
            modules,
            dependencies,
        }),
        WireCommand::MakeMoveVec(type_, elements) => Command::MakeMoveVec(MakeMoveVec {
            type_,
            elements: elements.into_iter().map(lift_argument).collect(),
        }),
        WireCommand::Upgrade(modules, dependencies, package_id, ticket) => {
            Command::Upgrade(Upgrade {
                modules,
                dependencies,
                package_id,
                ticket: lift_argument(ticket),
            })
        }
    }
}

fn lift_kind(kind: WireTransactionKind) -> TransactionState {
    let WireTransactionKind::ProgrammableTransaction(ptb) = kind;
    TransactionState {
        inputs: ptb.inputs.into_iter().map(lift_input).collect(),
        commands: ptb.commands.into_iter().map(lift_command).collect(),
        ..TransactionState::new()
    }
}

fn lift_data(data: WireTransactionData) -> TransactionState {
    let WireTransactionData::V1(data) = data;
    let mut state = lift_kind(data.kind);
    state.sender = Some(data.sender);
    state.expiration = Some(match data.expiration {
        WireExpiration::None => Expiration::None,
        WireExpiration::Epoch(epoch) => Expiration::Epoch(epoch),
    });
    state.gas_data = GasData {
        budget: Some(data.gas_data.budget),
        price: Some(data.gas_data.price),
        owner: Some(data.gas_data.owner),
        payment: Some(data.gas_data.payment.into_iter().map(Into::into).collect()),
    };
    state
}

// ── Public surface ───────────────────────────────────────────────────────────

/// Encode the full `TransactionData` envelope.
pub fn encode_transaction_data(state: &TransactionState) -> Result<Vec<u8>, Error> {
    Ok(bcs::to_bytes(&lower_data(state)?)?)
}

/// Encode only the `TransactionKind::ProgrammableTransaction` payload.
pub fn encode_transaction_kind(state: &TransactionState) -> Result<Vec<u8>, Error> {
    Ok(bcs::to_bytes(&lower_kind(state)?)?)
}

pub fn decode_transaction_data(bytes: &[u8]) -> Result<TransactionState, Error> {
    let data: WireTransactionData = bcs::from_bytes(bytes)
        .map_err(|e| Error::DeserializationFailed(e.to_string()))?;
    Ok(lift_data(data))
}

pub fn decode_transaction_kind(bytes: &[u8]) -> Result<TransactionState, Error> {
    let kind: WireTransactionKind = bcs::from_bytes(bytes)
        .map_err(|e| Error::DeserializationFailed(e.to_string()))?;
    Ok(lift_kind(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PureBytes;

    fn resolved_state() -> TransactionState {
        let mut state = TransactionState::new();
        state.sender = Some("0x11".parse().unwrap());
        state.gas_data = GasData {
            budget: Some(5_000_000),
            price: Some(1000),
            owner: None,
            payment: Some(vec![ObjectRef {
                object_id: "0xdef".parse().unwrap(),
                version: 3,
                digest: Digest::new([1; 32]),
            }]),
        };
        state.inputs.push(CallArg::pure(bcs::to_bytes(&100u64).unwrap()));
        state.commands.push(Command::SplitCoins(SplitCoins {
            coin: Argument::GasCoin,
            amounts: vec![Argument::Input(0)],
        }));
        state
    }

    #[test]
    fn data_round_trips_through_bytes() {
        let state = resolved_state();
        let bytes = encode_transaction_data(&state).unwrap();
        let decoded = decode_transaction_data(&bytes).unwrap();
        assert_eq!(encode_transaction_data(&decoded).unwrap(), bytes);
        assert_eq!(decoded.sender, state.sender);
        assert_eq!(decoded.gas_data.budget, Some(5_000_000));
    }

    #[test]
    fn kind_round_trips_through_bytes() {
        let state = resolved_state();
        let bytes = encode_transaction_kind(&state).unwrap();
        let decoded = decode_transaction_kind(&bytes).unwrap();
        assert_eq!(encode_transaction_kind(&decoded).unwrap(), bytes);
        // Gas configuration is not part of the kind payload.
        assert_eq!(decoded.gas_data, GasData::default());
    }

    #[test]
    fn missing_gas_fields_surface_in_order() {
        let mut state = resolved_state();
        state.sender = None;
        assert!(matches!(
            encode_transaction_data(&state),
            Err(Error::MissingSender)
        ));

        let mut state = resolved_state();
        state.gas_data.budget = None;
        assert!(matches!(
            encode_transaction_data(&state),
            Err(Error::MissingGasBudget)
        ));

        let mut state = resolved_state();
        state.gas_data.payment = None;
        assert!(matches!(
            encode_transaction_data(&state),
            Err(Error::MissingGasPayment)
        ));

        let mut state = resolved_state();
        state.gas_data.price = None;
        assert!(matches!(
            encode_transaction_data(&state),
            Err(Error::MissingGasPrice)
        ));
    }

    #[test]
    fn transient_inputs_are_rejected() {
        let mut state = resolved_state();
        state.inputs.push(CallArg::RawValue(crate::data::RawValue {
            value: serde_json::json!(42),
            kind: None,
        }));
        assert!(matches!(
            encode_transaction_kind(&state),
            Err(Error::ValidationFailed { .. })
        ));
    }

    #[test]
    fn remaining_intents_are_rejected() {
        let mut state = resolved_state();
        state
            .commands
            .push(Command::TransactionIntent(crate::data::TransactionIntent {
                name: "CoinWithBalance".into(),
                inputs: Default::default(),
                data: serde_json::Value::Null,
            }));
        assert!(matches!(
            encode_transaction_kind(&state),
            Err(Error::UnresolvedIntent(name)) if name == "CoinWithBalance"
        ));
    }

    #[test]
    fn command_discriminators_follow_canonical_order() {
        let publish = lower_command(
            0,
            &Command::Publish(Publish {
                modules: vec![],
                dependencies: vec![],
            }),
        )
        .unwrap();
        let bytes = bcs::to_bytes(&publish).unwrap();
        assert_eq!(bytes[0], 4);

        let make_vec = lower_command(
            0,
            &Command::MakeMoveVec(MakeMoveVec {
                type_: None,
                elements: vec![],
            }),
        )
        .unwrap();
        let bytes = bcs::to_bytes(&make_vec).unwrap();
        assert_eq!(bytes[0], 5);
    }

    #[test]
    fn pure_input_encoding_is_length_prefixed() {
        let arg = lower_input(0, &CallArg::Pure(PureBytes { bytes: vec![1, 2] })).unwrap();
        // variant 0, then 2-byte vec
        assert_eq!(bcs::to_bytes(&arg).unwrap(), vec![0, 2, 1, 2]);
    }
}
