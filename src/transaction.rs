//! The user-facing assembly API. A [`TransactionBuilder`] wraps a
//! [`BlockDataBuilder`], hands out argument handles whose indices are bound
//! at registration time, and drives the resolution pipeline on build.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::address::Address;
use crate::builder::{BlockDataBuilder, BuildArgs, InputKind};
use crate::client::{ChainClient, TransactionLimits};
use crate::data::{
    Argument, CallArg, Command, Expiration, IntentInput, MakeMoveVec, MergeCoins, MoveCall,
    ObjectRef, Publish, RawValue, SplitCoins, TransactionIntent, TransactionState,
    TransferObjects, UnresolvedObject, Upgrade,
};
use crate::error::Error;
use crate::intent::IntentResolver;
use crate::pipeline::{PipelineOptions, ResolutionPipeline, ResolvePlugin, Stage};
use crate::pure;
use crate::signer::{SignatureBytes, Signer};
use crate::type_tag::{Identifier, TypeTag};

/// A Move function target plus its type arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub package: Address,
    pub module: Identifier,
    pub function: Identifier,
    pub type_args: Vec<TypeTag>,
}

impl Function {
    pub fn new(package: Address, module: Identifier, function: Identifier) -> Self {
        Self {
            package,
            module,
            function,
            type_args: Vec::new(),
        }
    }

    pub fn with_type_args(mut self, type_args: Vec<TypeTag>) -> Self {
        self.type_args = type_args;
        self
    }
}

impl std::str::FromStr for Function {
    type Err = Error;

    /// Parse a `package::module::function` target.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split("::");
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(package), Some(module), Some(function), None) => Ok(Function::new(
                package.trim().parse()?,
                module.trim().parse()?,
                function.trim().parse()?,
            )),
            _ => Err(Error::validation(
                "function",
                format!("expected package::module::function, got {s:?}"),
            )),
        }
    }
}

/// Handle to a command's result slots. Converts into
/// [`Argument::Result`]; `at(n)` addresses the nth nested result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionResult {
    index: u16,
    intent: bool,
}

impl TransactionResult {
    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn argument(&self) -> Argument {
        if self.intent {
            Argument::IntentResult(self.index)
        } else {
            Argument::Result(self.index)
        }
    }

    pub fn at(&self, nth: u16) -> Argument {
        if self.intent {
            Argument::NestedIntentResult(self.index, nth)
        } else {
            Argument::NestedResult(self.index, nth)
        }
    }
}

impl From<TransactionResult> for Argument {
    fn from(result: TransactionResult) -> Self {
        result.argument()
    }
}

/// Anything accepted by [`TransactionBuilder::object`].
pub enum ObjectInput {
    /// An object id; resolved against chain state during the pipeline.
    Id(String),
    /// A fully specified input.
    Value(CallArg),
    /// An argument that already points at an input.
    Resolved(Argument),
    /// Deferred construction: invoked with the builder at registration time.
    Producer(Box<dyn FnOnce(&mut TransactionBuilder) -> Result<Argument, Error>>),
}

impl ObjectInput {
    pub fn with(f: impl FnOnce(&mut TransactionBuilder) -> Result<Argument, Error> + 'static) -> Self {
        ObjectInput::Producer(Box::new(f))
    }
}

impl From<&str> for ObjectInput {
    fn from(id: &str) -> Self {
        ObjectInput::Id(id.to_owned())
    }
}

impl From<String> for ObjectInput {
    fn from(id: String) -> Self {
        ObjectInput::Id(id)
    }
}

impl From<Address> for ObjectInput {
    fn from(id: Address) -> Self {
        ObjectInput::Id(id.to_string())
    }
}

impl From<CallArg> for ObjectInput {
    fn from(value: CallArg) -> Self {
        ObjectInput::Value(value)
    }
}

impl From<Argument> for ObjectInput {
    fn from(arg: Argument) -> Self {
        ObjectInput::Resolved(arg)
    }
}

/// A split/merge amount: either a literal (encoded as `u64`) or an argument.
#[derive(Clone, Copy, Debug)]
pub enum Amount {
    Value(u64),
    Argument(Argument),
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount::Value(value)
    }
}

impl From<Argument> for Amount {
    fn from(arg: Argument) -> Self {
        Amount::Argument(arg)
    }
}

impl From<TransactionResult> for Amount {
    fn from(result: TransactionResult) -> Self {
        Amount::Argument(result.argument())
    }
}

/// A transfer recipient: a literal address (encoded as a pure input) or an
/// argument.
#[derive(Clone, Copy, Debug)]
pub enum Recipient {
    Address(Address),
    Argument(Argument),
}

impl From<Address> for Recipient {
    fn from(address: Address) -> Self {
        Recipient::Address(address)
    }
}

impl From<Argument> for Recipient {
    fn from(arg: Argument) -> Self {
        Recipient::Argument(arg)
    }
}

/// Knobs for `build`, `to_json`, `digest`, and `sign`.
#[derive(Clone, Copy, Default)]
pub struct ResolveOptions<'a> {
    pub client: Option<&'a dyn ChainClient>,
    pub limits: Option<TransactionLimits>,
    pub only_transaction_kind: bool,
    pub max_size_bytes: Option<usize>,
}

/// Stateful assembly API over a [`BlockDataBuilder`].
#[derive(Default)]
pub struct TransactionBuilder {
    data: BlockDataBuilder,
    pipeline: ResolutionPipeline,
    intent_resolvers: HashMap<String, Arc<dyn IntentResolver>>,
    supported_intents: Vec<String>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a builder from a JSON snapshot of either schema version.
    pub fn restore(snapshot: Value) -> Result<Self, Error> {
        Ok(Self {
            data: BlockDataBuilder::restore(snapshot)?,
            ..Self::default()
        })
    }

    pub fn data(&self) -> &BlockDataBuilder {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut BlockDataBuilder {
        &mut self.data
    }

    // ── Inputs ───────────────────────────────────────────────────────────

    /// The gas-coin pseudo-input.
    pub fn gas(&self) -> Argument {
        Argument::GasCoin
    }

    /// Register an object input. Ids are deduplicated: a second use of the
    /// same object returns the existing slot, upgrading a shared object's
    /// mutability if the new use asks for more.
    pub fn object(&mut self, input: impl Into<ObjectInput>) -> Result<Argument, Error> {
        match input.into() {
            ObjectInput::Resolved(arg) => Ok(arg),
            ObjectInput::Producer(producer) => producer(self),
            ObjectInput::Id(id) => {
                let value: Address = id.parse()?;
                self.data.add_object_input(CallArg::UnresolvedObject(UnresolvedObject {
                    value,
                    type_signatures: Vec::new(),
                }))
            }
            ObjectInput::Value(value) => self.data.add_object_input(value),
        }
    }

    /// BCS-encode `value` and register it as a pure input.
    pub fn pure<T: Serialize>(&mut self, value: &T) -> Result<Argument, Error> {
        Ok(self.pure_bytes(bcs::to_bytes(value)?))
    }

    /// Register pre-encoded BCS bytes as a pure input.
    pub fn pure_bytes(&mut self, bytes: Vec<u8>) -> Argument {
        self.data.add_input(InputKind::Pure, CallArg::pure(bytes))
    }

    /// Register a raw JSON value; its Move type is bound later by the
    /// pipeline from the signature of the call that consumes it.
    pub fn pure_value(&mut self, value: Value) -> Argument {
        self.data.add_input(
            InputKind::Pure,
            CallArg::RawValue(RawValue { value, kind: None }),
        )
    }

    pub fn pure_bool(&mut self, value: bool) -> Argument {
        self.pure_bytes(vec![value as u8])
    }

    pub fn pure_u8(&mut self, value: u8) -> Argument {
        self.pure_bytes(vec![value])
    }

    pub fn pure_u16(&mut self, value: u16) -> Argument {
        self.pure_bytes(value.to_le_bytes().to_vec())
    }

    pub fn pure_u32(&mut self, value: u32) -> Argument {
        self.pure_bytes(value.to_le_bytes().to_vec())
    }

    pub fn pure_u64(&mut self, value: u64) -> Argument {
        self.pure_bytes(value.to_le_bytes().to_vec())
    }

    pub fn pure_u128(&mut self, value: u128) -> Argument {
        self.pure_bytes(value.to_le_bytes().to_vec())
    }

    /// A `u256` literal, as 32 little-endian bytes.
    pub fn pure_u256(&mut self, value: [u8; 32]) -> Argument {
        self.pure_bytes(value.to_vec())
    }

    pub fn pure_address(&mut self, value: Address) -> Argument {
        self.pure_bytes(value.as_bytes().to_vec())
    }

    /// A `0x1::string::String` literal.
    pub fn pure_string(&mut self, value: &str) -> Argument {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        pure::write_uleb128(value.len() as u64, &mut bytes);
        bytes.extend_from_slice(value.as_bytes());
        self.pure_bytes(bytes)
    }

    /// A `0x2::object::ID` literal.
    pub fn pure_id(&mut self, value: Address) -> Argument {
        self.pure_address(value)
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Append a command and return its result handle.
    pub fn add(&mut self, command: Command) -> TransactionResult {
        let intent = matches!(command, Command::TransactionIntent(_));
        let index = self.data.add_command(command);
        TransactionResult { index, intent }
    }

    pub fn move_call(&mut self, function: Function, arguments: Vec<Argument>) -> TransactionResult {
        self.add(Command::MoveCall(MoveCall {
            package: function.package,
            module: function.module,
            function: function.function,
            type_arguments: function.type_args,
            arguments,
        }))
    }

    pub fn split_coins(
        &mut self,
        coin: Argument,
        amounts: Vec<impl Into<Amount>>,
    ) -> TransactionResult {
        let amounts = amounts
            .into_iter()
            .map(|amount| match amount.into() {
                Amount::Value(value) => self.pure_u64(value),
                Amount::Argument(arg) => arg,
            })
            .collect();
        self.add(Command::SplitCoins(SplitCoins { coin, amounts }))
    }

    pub fn merge_coins(&mut self, destination: Argument, sources: Vec<Argument>) -> TransactionResult {
        self.add(Command::MergeCoins(MergeCoins {
            destination,
            sources,
        }))
    }

    pub fn transfer_objects(
        &mut self,
        objects: Vec<Argument>,
        recipient: impl Into<Recipient>,
    ) -> TransactionResult {
        let recipient = match recipient.into() {
            Recipient::Address(address) => self.pure_address(address),
            Recipient::Argument(arg) => arg,
        };
        self.add(Command::TransferObjects(TransferObjects {
            objects,
            recipient,
        }))
    }

    pub fn make_move_vec(
        &mut self,
        type_: Option<TypeTag>,
        elements: Vec<Argument>,
    ) -> TransactionResult {
        self.add(Command::MakeMoveVec(MakeMoveVec { type_, elements }))
    }

    pub fn publish(&mut self, modules: Vec<Vec<u8>>, dependencies: Vec<Address>) -> TransactionResult {
        self.add(Command::Publish(Publish {
            modules,
            dependencies,
        }))
    }

    pub fn upgrade(
        &mut self,
        modules: Vec<Vec<u8>>,
        dependencies: Vec<Address>,
        package_id: Address,
        ticket: Argument,
    ) -> TransactionResult {
        self.add(Command::Upgrade(Upgrade {
            modules,
            dependencies,
            package_id,
            ticket,
        }))
    }

    /// Append a symbolic intent command; a resolver registered under the
    /// same name rewrites it during the pipeline.
    pub fn intent(
        &mut self,
        name: impl Into<String>,
        inputs: BTreeMap<String, IntentInput>,
        data: Value,
    ) -> TransactionResult {
        self.add(Command::TransactionIntent(TransactionIntent {
            name: name.into(),
            inputs,
            data,
        }))
    }

    // ── Sender, expiration, gas ──────────────────────────────────────────

    pub fn set_sender(&mut self, sender: Address) {
        self.data.state_mut().sender = Some(sender);
    }

    pub fn set_sender_if_not_set(&mut self, sender: Address) {
        self.data.state_mut().sender.get_or_insert(sender);
    }

    pub fn set_expiration(&mut self, expiration: Expiration) {
        self.data.state_mut().expiration = Some(expiration);
    }

    pub fn set_gas_price(&mut self, price: u64) {
        self.data.state_mut().gas_data.price = Some(price);
    }

    pub fn set_gas_budget(&mut self, budget: u64) {
        self.data.state_mut().gas_data.budget = Some(budget);
    }

    pub fn set_gas_owner(&mut self, owner: Address) {
        self.data.state_mut().gas_data.owner = Some(owner);
    }

    pub fn set_gas_payment(&mut self, payment: Vec<ObjectRef>) {
        self.data.state_mut().gas_data.payment = Some(payment);
    }

    // ── Extension points ─────────────────────────────────────────────────

    /// Register an intent resolver. At most one resolver per intent name.
    pub fn register_intent_resolver(
        &mut self,
        name: impl Into<String>,
        resolver: Arc<dyn IntentResolver>,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.intent_resolvers.contains_key(&name) {
            return Err(Error::IntentResolverConflict(name));
        }
        self.intent_resolvers.insert(name, resolver);
        Ok(())
    }

    /// Mark an intent name as understood by the executor, so the pipeline
    /// leaves it in place.
    pub fn add_supported_intent(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.supported_intents.contains(&name) {
            self.supported_intents.push(name);
        }
    }

    pub fn register_plugin(&mut self, stage: Stage, plugin: Arc<dyn ResolvePlugin>) {
        self.pipeline.register(stage, plugin);
    }

    // ── Output ───────────────────────────────────────────────────────────

    /// A validated snapshot of the current state.
    pub fn snapshot(&self) -> Result<TransactionState, Error> {
        self.data.snapshot()
    }

    /// JSON of the current snapshot, without running the pipeline.
    pub fn serialize(&self) -> Result<String, Error> {
        serde_json::to_string(&self.snapshot()?)
            .map_err(|e| Error::DeserializationFailed(e.to_string()))
    }

    async fn prepare(
        &mut self,
        options: &ResolveOptions<'_>,
        prepare_only: bool,
    ) -> Result<TransactionLimits, Error> {
        self.pipeline
            .run(
                &mut self.data,
                PipelineOptions {
                    client: options.client,
                    limits: options.limits,
                    only_transaction_kind: options.only_transaction_kind,
                    prepare_only,
                    supported_intents: &self.supported_intents,
                    intent_resolvers: Some(&self.intent_resolvers),
                },
            )
            .await
    }

    /// Run the non-gas preparation stages, then return the JSON snapshot.
    pub async fn to_json(&mut self, options: &ResolveOptions<'_>) -> Result<String, Error> {
        self.prepare(options, true).await?;
        self.serialize()
    }

    /// Run the full pipeline and encode to canonical bytes.
    pub async fn build(&mut self, options: &ResolveOptions<'_>) -> Result<Vec<u8>, Error> {
        let limits = self.prepare(options, false).await?;
        self.data.build(&BuildArgs {
            max_size_bytes: options
                .max_size_bytes
                .or(Some(limits.max_tx_size_bytes as usize)),
            only_transaction_kind: options.only_transaction_kind,
            overrides: None,
        })
    }

    /// Build the full transaction and return its base58 digest.
    pub async fn digest(&mut self, options: &ResolveOptions<'_>) -> Result<String, Error> {
        let options = ResolveOptions {
            only_transaction_kind: false,
            ..*options
        };
        self.prepare(&options, false).await?;
        self.data.digest()
    }

    /// Build the full transaction and sign its bytes.
    pub async fn sign(
        &mut self,
        options: &ResolveOptions<'_>,
        signer: &dyn Signer,
    ) -> Result<SignatureBytes, Error> {
        let options = ResolveOptions {
            only_transaction_kind: false,
            ..*options
        };
        let bytes = self.build(&options).await?;
        signer.sign(&bytes).await.map_err(Error::Signer)
    }
}
