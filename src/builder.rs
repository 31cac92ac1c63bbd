use serde_json::Value;
use tracing::debug;

use crate::data::{
    Argument, CallArg, Command, Expiration, GasData, ObjectArg, RawValueKind, TransactionState,
};
use crate::digest::transaction_digest;
use crate::error::Error;
use crate::serialization;
use crate::v1::{self, TransactionStateV1};

/// Input slot classification used by [`BlockDataBuilder::add_input`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Object,
    Pure,
}

/// Field overrides applied while encoding, without touching the stored
/// state. Used by gas estimation (forced budget, empty payment) and by
/// callers that sign on behalf of a sponsor.
#[derive(Clone, Debug, Default)]
pub struct TransactionOverrides {
    pub sender: Option<crate::address::Address>,
    pub expiration: Option<Expiration>,
    pub gas_budget: Option<u64>,
    pub gas_price: Option<u64>,
    pub gas_owner: Option<crate::address::Address>,
    pub gas_payment: Option<Vec<crate::data::ObjectRef>>,
}

/// Options for [`BlockDataBuilder::build`].
#[derive(Clone, Debug, Default)]
pub struct BuildArgs {
    pub max_size_bytes: Option<usize>,
    pub only_transaction_kind: bool,
    pub overrides: Option<TransactionOverrides>,
}

/// Owns a [`TransactionState`] and keeps its indexed back-references
/// consistent while inputs and commands are appended, replaced, or spliced.
#[derive(Clone, Debug, Default)]
pub struct BlockDataBuilder {
    state: TransactionState,
}

impl BlockDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an existing state, validating it first.
    pub fn with_state(state: TransactionState) -> Result<Self, Error> {
        state.validate()?;
        Ok(Self { state })
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TransactionState {
        &mut self.state
    }

    /// Parse and validate a full `TransactionData` payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::with_state(serialization::decode_transaction_data(bytes)?)
    }

    /// Parse and validate a bare `TransactionKind` payload.
    pub fn from_kind_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::with_state(serialization::decode_transaction_kind(bytes)?)
    }

    /// Restore a JSON snapshot of either schema version.
    pub fn restore(snapshot: Value) -> Result<Self, Error> {
        let version = snapshot
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::DeserializationFailed("snapshot without version".into()))?;
        let state = match version {
            1 => {
                let v1: TransactionStateV1 = serde_json::from_value(snapshot)
                    .map_err(|e| Error::DeserializationFailed(e.to_string()))?;
                v1::to_v2(&v1)?
            }
            2 => serde_json::from_value(snapshot)
                .map_err(|e| Error::DeserializationFailed(e.to_string()))?,
            other => {
                return Err(Error::DeserializationFailed(format!(
                    "unsupported snapshot version {other}"
                )))
            }
        };
        Self::with_state(state)
    }

    /// Append an input and return the argument that refers to it.
    pub fn add_input(&mut self, kind: InputKind, mut value: CallArg) -> Argument {
        if let CallArg::RawValue(raw) = &mut value {
            raw.kind.get_or_insert(match kind {
                InputKind::Object => RawValueKind::Object,
                InputKind::Pure => RawValueKind::Pure,
            });
        }
        let index = self.state.inputs.len() as u16;
        self.state.inputs.push(value);
        Argument::Input(index)
    }

    /// Append an object input, merging with an existing input for the same
    /// object id. A shared object's `mutable` flag is the logical OR of all
    /// appearances.
    pub fn add_object_input(&mut self, value: CallArg) -> Result<Argument, Error> {
        let id = value.object_id().ok_or_else(|| {
            Error::validation("inputs", "expected an object-shaped input")
        })?;

        for (index, existing) in self.state.inputs.iter_mut().enumerate() {
            if existing.object_id() != Some(id) {
                continue;
            }
            if let (
                CallArg::Object(ObjectArg::SharedObject(current)),
                CallArg::Object(ObjectArg::SharedObject(incoming)),
            ) = (&mut *existing, &value)
            {
                current.mutable |= incoming.mutable;
            }
            return Ok(Argument::Input(index as u16));
        }
        Ok(self.add_input(InputKind::Object, value))
    }

    /// Append a command and return its index.
    pub fn add_command(&mut self, command: Command) -> u16 {
        let index = self.state.commands.len() as u16;
        self.state.commands.push(command);
        index
    }

    /// Apply `f` to every argument slot in every command.
    pub fn map_arguments(&mut self, f: impl FnMut(Argument) -> Argument) {
        self.state.map_arguments(f);
    }

    /// Replace command `index` with one or more commands. When the
    /// replacement splices in `k` commands, every result reference past the
    /// splice point shifts by `k - 1`; references to the replaced command
    /// itself stay bound to the first inserted command.
    pub fn replace_command(&mut self, index: u16, replacement: Vec<Command>) {
        if replacement.len() == 1 {
            if let Some(replacement) = replacement.into_iter().next() {
                self.state.commands[index as usize] = replacement;
            }
            return;
        }

        let shift = (replacement.len() as i32) - 1;
        self.state
            .commands
            .splice(index as usize..=index as usize, replacement);
        if shift == 0 {
            return;
        }

        debug!(index, shift, "rewriting result references after splice");
        let bump = |i: u16| -> u16 {
            if i > index {
                (i as i32 + shift) as u16
            } else {
                i
            }
        };
        self.state.map_arguments(|arg| match arg {
            Argument::Result(i) => Argument::Result(bump(i)),
            Argument::NestedResult(i, j) => Argument::NestedResult(bump(i), j),
            Argument::IntentResult(i) => Argument::IntentResult(bump(i)),
            Argument::NestedIntentResult(i, j) => Argument::NestedIntentResult(bump(i), j),
            other => other,
        });
    }

    /// A validated deep copy of the state, sharing nothing with the builder.
    pub fn snapshot(&self) -> Result<TransactionState, Error> {
        self.state.validate()?;
        Ok(self.state.clone())
    }

    /// Encode to canonical bytes. With `only_transaction_kind` this encodes
    /// the bare programmable-transaction payload and ignores gas
    /// configuration entirely.
    pub fn build(&self, args: &BuildArgs) -> Result<Vec<u8>, Error> {
        let bytes = if args.only_transaction_kind {
            serialization::encode_transaction_kind(&self.state)?
        } else {
            let mut state = self.state.clone();
            if let Some(overrides) = &args.overrides {
                apply_overrides(&mut state, overrides);
            }
            serialization::encode_transaction_data(&state)?
        };

        if let Some(max) = args.max_size_bytes {
            if bytes.len() > max {
                return Err(Error::TransactionTooLarge {
                    size: bytes.len(),
                    max,
                });
            }
        }
        Ok(bytes)
    }

    /// Digest of the fully-built transaction data, in base58 text form.
    pub fn digest(&self) -> Result<String, Error> {
        let bytes = self.build(&BuildArgs::default())?;
        Ok(transaction_digest(&bytes).to_string())
    }
}

fn apply_overrides(state: &mut TransactionState, overrides: &TransactionOverrides) {
    if let Some(sender) = overrides.sender {
        state.sender = Some(sender);
    }
    if let Some(expiration) = overrides.expiration {
        state.expiration = Some(expiration);
    }
    let gas = GasData {
        budget: overrides.gas_budget.or(state.gas_data.budget),
        price: overrides.gas_price.or(state.gas_data.price),
        owner: overrides.gas_owner.or(state.gas_data.owner),
        payment: overrides
            .gas_payment
            .clone()
            .or_else(|| state.gas_data.payment.clone()),
    };
    state.gas_data = gas;
}
