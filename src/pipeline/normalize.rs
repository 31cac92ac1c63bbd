//! `normalizeInputs`: force-encode the slots whose Move type is fixed by the
//! command shape, then type the remaining raw inputs against fetched
//! function signatures.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::data::{Argument, CallArg, Command, MoveCall, ObjectArg, TransactionState, UnresolvedObject};
use crate::client::NormalizedFunction;
use crate::error::Error;
use crate::pure::PureSchema;
use crate::signature::{is_tx_context, OpenMoveTypeSignature};

use super::{ResolveContext, TerminalHandler};

pub struct NormalizeInputs;

#[async_trait]
impl TerminalHandler for NormalizeInputs {
    async fn run(&self, ctx: &mut ResolveContext<'_>) -> Result<(), Error> {
        force_encode_fixed_slots(ctx.data.state_mut())?;

        let calls: Vec<MoveCall> = ctx
            .data
            .state()
            .commands
            .iter()
            .filter_map(|command| match command {
                Command::MoveCall(call) if needs_signatures(ctx.data.state(), call) => {
                    Some(call.clone())
                }
                _ => None,
            })
            .collect();
        if calls.is_empty() {
            return Ok(());
        }

        let client = ctx.require_client("normalizeInputs")?;
        debug!(calls = calls.len(), "fetching normalized move functions");
        let functions = try_join_all(calls.iter().map(|call| {
            client.get_normalized_move_function(
                call.package,
                call.module.as_str(),
                call.function.as_str(),
            )
        }))
        .await
        .map_err(Error::ChainClient)?;

        for (call, function) in calls.iter().zip(functions) {
            apply_signatures(ctx.data.state_mut(), call, function)?;
        }
        Ok(())
    }
}

/// `SplitCoins` amounts are always `u64`; `TransferObjects` recipients are
/// always addresses.
fn force_encode_fixed_slots(state: &mut TransactionState) -> Result<(), Error> {
    let mut slots: Vec<(Argument, PureSchema)> = Vec::new();
    for command in &state.commands {
        match command {
            Command::SplitCoins(split) => {
                slots.extend(split.amounts.iter().map(|arg| (*arg, PureSchema::U64)));
            }
            Command::TransferObjects(transfer) => {
                slots.push((transfer.recipient, PureSchema::Address));
            }
            _ => {}
        }
    }
    for (arg, schema) in slots {
        normalize_raw_argument(state, arg, &schema)?;
    }
    Ok(())
}

/// Replace a raw input pointed at by `arg` with its BCS encoding under
/// `schema`; anything already typed is left alone.
fn normalize_raw_argument(
    state: &mut TransactionState,
    arg: Argument,
    schema: &PureSchema,
) -> Result<(), Error> {
    let Argument::Input(index) = arg else {
        return Ok(());
    };
    let index = index as usize;
    if let Some(CallArg::RawValue(raw)) = state.inputs.get(index) {
        let bytes = schema.serialize_value(&raw.value)?;
        state.inputs[index] = CallArg::pure(bytes);
    }
    Ok(())
}

/// A call needs its signature fetched when any argument still points at an
/// untyped input, or at a shared object whose mutability may need upgrading.
fn needs_signatures(state: &TransactionState, call: &MoveCall) -> bool {
    call.arguments.iter().any(|arg| {
        let Argument::Input(index) = arg else {
            return false;
        };
        match state.inputs.get(*index as usize) {
            Some(CallArg::RawValue(_)) | Some(CallArg::UnresolvedObject(_)) => true,
            // A read-only shared input may still need its mutability
            // upgraded by the parameter's reference kind.
            Some(CallArg::Object(ObjectArg::SharedObject(shared))) => !shared.mutable,
            _ => false,
        }
    })
}

fn apply_signatures(
    state: &mut TransactionState,
    call: &MoveCall,
    function: NormalizedFunction,
) -> Result<(), Error> {
    let mut parameters = function.parameters;
    if parameters.last().map(is_tx_context).unwrap_or(false) {
        parameters.pop();
    }
    if parameters.len() != call.arguments.len() {
        return Err(Error::ArityMismatch {
            package: call.package,
            module: call.module.to_string(),
            function: call.function.to_string(),
            expected: parameters.len(),
            actual: call.arguments.len(),
        });
    }

    for (parameter, arg) in parameters.iter().zip(&call.arguments) {
        let Argument::Input(index) = arg else {
            continue;
        };
        let index = *index as usize;
        let signature = OpenMoveTypeSignature::from_normalized(parameter);

        let Some(current) = state.inputs.get(index).cloned() else {
            continue;
        };
        match current {
            CallArg::RawValue(raw) => {
                if let Some(schema) = PureSchema::from_signature_body(&signature.body) {
                    state.inputs[index] = CallArg::pure(schema.serialize_value(&raw.value)?);
                } else {
                    let id = raw
                        .value
                        .as_str()
                        .ok_or(Error::ExpectedObjectIdString { index })?;
                    state.inputs[index] = CallArg::UnresolvedObject(UnresolvedObject {
                        value: id.parse()?,
                        type_signatures: vec![signature],
                    });
                }
            }
            CallArg::UnresolvedObject(mut unresolved) => {
                unresolved.type_signatures.push(signature);
                state.inputs[index] = CallArg::UnresolvedObject(unresolved);
            }
            CallArg::Object(ObjectArg::SharedObject(mut shared)) => {
                if signature.is_by_value() || signature.is_mutable_ref() {
                    shared.mutable = true;
                    state.inputs[index] = CallArg::Object(ObjectArg::SharedObject(shared));
                }
            }
            CallArg::Pure(_) | CallArg::Object(_) => {}
        }
    }
    Ok(())
}
