use std::collections::BTreeMap;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;
use crate::digest::Digest;
use crate::error::Error;
use crate::signature::OpenMoveTypeSignature;
use crate::type_tag::{Identifier, TypeTag};

/// Serde helpers shared by the v1 and v2 snapshot forms.
pub(crate) mod encoding {
    use serde::{Deserialize, Deserializer, Serializer};

    /// `u64` carried as a decimal string.
    pub mod u64_string {
        use super::*;

        pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(value)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
            #[derive(Deserialize)]
            #[serde(untagged)]
            enum Repr {
                Number(u64),
                Text(String),
            }
            match Repr::deserialize(deserializer)? {
                Repr::Number(n) => Ok(n),
                Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            }
        }
    }

    /// `Option<u64>` carried as an optional decimal string.
    pub mod opt_u64_string {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<u64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            #[derive(Deserialize)]
            #[serde(untagged)]
            enum Repr {
                Number(u64),
                Text(String),
            }
            match Option::<Repr>::deserialize(deserializer)? {
                None => Ok(None),
                Some(Repr::Number(n)) => Ok(Some(n)),
                Some(Repr::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
            }
        }
    }

    /// Byte sequences carried as base64 text.
    pub mod base64_bytes {
        use base64::Engine as _;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(&base64::engine::general_purpose::STANDARD.encode(value))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<u8>, D::Error> {
            let text = String::deserialize(deserializer)?;
            base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(serde::de::Error::custom)
        }
    }

    /// Module bytecode lists carried as base64 text entries.
    pub mod base64_modules {
        use base64::Engine as _;
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &[Vec<u8>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(value.len()))?;
            for module in value {
                seq.serialize_element(&base64::engine::general_purpose::STANDARD.encode(module))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<u8>>, D::Error> {
            let texts = Vec::<String>::deserialize(deserializer)?;
            texts
                .into_iter()
                .map(|text| {
                    base64::engine::general_purpose::STANDARD
                        .decode(text)
                        .map_err(serde::de::Error::custom)
                })
                .collect()
        }
    }
}

/// A reference to a specific on-chain object version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub object_id: Address,
    #[serde(with = "encoding::u64_string")]
    pub version: u64,
    pub digest: Digest,
}

/// A reference to a shared object, with the caller's mutability request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedObjectRef {
    pub object_id: Address,
    #[serde(with = "encoding::u64_string")]
    pub initial_shared_version: u64,
    pub mutable: bool,
}

/// An object input, by ownership kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectArg {
    ImmOrOwnedObject(ObjectRef),
    SharedObject(SharedObjectRef),
    Receiving(ObjectRef),
}

impl ObjectArg {
    pub fn object_id(&self) -> Address {
        match self {
            ObjectArg::ImmOrOwnedObject(obj) | ObjectArg::Receiving(obj) => obj.object_id,
            ObjectArg::SharedObject(obj) => obj.object_id,
        }
    }
}

/// An object input that still needs chain metadata before it can be encoded.
/// Must be gone once `resolveObjectReferences` has run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedObject {
    pub value: Address,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_signatures: Vec<OpenMoveTypeSignature>,
}

/// Hint attached to a raw input value before its Move type is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawValueKind {
    Pure,
    Object,
}

/// A not-yet-typed input value. Must be gone once `normalizeInputs` has
/// bound it to a typed parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawValue {
    pub value: serde_json::Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RawValueKind>,
}

/// BCS-encoded bytes for a pure input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PureBytes {
    #[serde(with = "encoding::base64_bytes")]
    pub bytes: Vec<u8>,
}

/// A top-level transaction input slot.
#[derive(Clone, Debug, PartialEq)]
pub enum CallArg {
    Pure(PureBytes),
    Object(ObjectArg),
    UnresolvedObject(UnresolvedObject),
    RawValue(RawValue),
}

impl CallArg {
    pub fn pure(bytes: Vec<u8>) -> Self {
        CallArg::Pure(PureBytes { bytes })
    }

    /// The object id this input refers to, for any object-shaped variant.
    pub fn object_id(&self) -> Option<Address> {
        match self {
            CallArg::Object(arg) => Some(arg.object_id()),
            CallArg::UnresolvedObject(unresolved) => Some(unresolved.value),
            CallArg::Pure(_) | CallArg::RawValue(_) => None,
        }
    }
}

/// A reference to an input or a prior command's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Argument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
    /// Result of an intent command; rewritten away by `resolveIntents`.
    IntentResult(u16),
    NestedIntentResult(u16, u16),
}

/// A call to a Move function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCall {
    pub package: Address,
    pub module: Identifier,
    pub function: Identifier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_arguments: Vec<TypeTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferObjects {
    pub objects: Vec<Argument>,
    pub recipient: Argument,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitCoins {
    pub coin: Argument,
    pub amounts: Vec<Argument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeCoins {
    pub destination: Argument,
    pub sources: Vec<Argument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeMoveVec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<TypeTag>,
    pub elements: Vec<Argument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publish {
    #[serde(with = "encoding::base64_modules")]
    pub modules: Vec<Vec<u8>>,
    pub dependencies: Vec<Address>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    #[serde(with = "encoding::base64_modules")]
    pub modules: Vec<Vec<u8>>,
    pub dependencies: Vec<Address>,
    pub package_id: Address,
    pub ticket: Argument,
}

/// An intent input is either a single argument or a list of arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntentInput {
    Single(Argument),
    List(Vec<Argument>),
}

/// A symbolic command that a registered resolver must rewrite into primitive
/// commands before the transaction can be encoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, IntentInput>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

/// A single command in a programmable transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    MoveCall(MoveCall),
    TransferObjects(TransferObjects),
    SplitCoins(SplitCoins),
    MergeCoins(MergeCoins),
    MakeMoveVec(MakeMoveVec),
    Publish(Publish),
    Upgrade(Upgrade),
    TransactionIntent(TransactionIntent),
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::MoveCall(_) => "MoveCall",
            Command::TransferObjects(_) => "TransferObjects",
            Command::SplitCoins(_) => "SplitCoins",
            Command::MergeCoins(_) => "MergeCoins",
            Command::MakeMoveVec(_) => "MakeMoveVec",
            Command::Publish(_) => "Publish",
            Command::Upgrade(_) => "Upgrade",
            Command::TransactionIntent(_) => "TransactionIntent",
        }
    }

    /// Apply `f` to every argument slot of this command. The slot set per
    /// variant is fixed; `Publish` has none.
    pub fn map_arguments(&mut self, f: &mut dyn FnMut(Argument) -> Argument) {
        match self {
            Command::MoveCall(call) => {
                for arg in &mut call.arguments {
                    *arg = f(*arg);
                }
            }
            Command::TransferObjects(transfer) => {
                for arg in &mut transfer.objects {
                    *arg = f(*arg);
                }
                transfer.recipient = f(transfer.recipient);
            }
            Command::SplitCoins(split) => {
                split.coin = f(split.coin);
                for arg in &mut split.amounts {
                    *arg = f(*arg);
                }
            }
            Command::MergeCoins(merge) => {
                merge.destination = f(merge.destination);
                for arg in &mut merge.sources {
                    *arg = f(*arg);
                }
            }
            Command::MakeMoveVec(vec) => {
                for arg in &mut vec.elements {
                    *arg = f(*arg);
                }
            }
            Command::Publish(_) => {}
            Command::Upgrade(upgrade) => {
                upgrade.ticket = f(upgrade.ticket);
            }
            Command::TransactionIntent(intent) => {
                for input in intent.inputs.values_mut() {
                    match input {
                        IntentInput::Single(arg) => *arg = f(*arg),
                        IntentInput::List(args) => {
                            for arg in args {
                                *arg = f(*arg);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Visit every argument slot without mutating.
    pub fn for_each_argument(&self, f: &mut dyn FnMut(Argument)) {
        let mut copy = self.clone();
        copy.map_arguments(&mut |arg| {
            f(arg);
            arg
        });
    }
}

/// Gas configuration; every field may still be absent before the pipeline
/// has run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasData {
    #[serde(
        default,
        with = "encoding::opt_u64_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget: Option<u64>,
    #[serde(
        default,
        with = "encoding::opt_u64_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<Vec<ObjectRef>>,
}

/// Transaction expiration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Expiration {
    #[default]
    None,
    Epoch(u64),
}

/// The complete in-memory form of a transaction under assembly (schema
/// version 2).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionState {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
    #[serde(default)]
    pub gas_data: GasData,
    #[serde(default)]
    pub inputs: Vec<CallArg>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Default for TransactionState {
    fn default() -> Self {
        Self {
            version: 2,
            features: Vec::new(),
            sender: None,
            expiration: None,
            gas_data: GasData::default(),
            inputs: Vec::new(),
            commands: Vec::new(),
        }
    }
}

impl TransactionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to every argument slot in every command.
    pub fn map_arguments(&mut self, mut f: impl FnMut(Argument) -> Argument) {
        for command in &mut self.commands {
            command.map_arguments(&mut f);
        }
    }

    /// Structural validation: schema version, index bounds.
    pub fn validate(&self) -> Result<(), Error> {
        if self.version != 2 {
            return Err(Error::validation(
                "version",
                format!("expected schema version 2, got {}", self.version),
            ));
        }
        let inputs = self.inputs.len();
        let commands = self.commands.len();
        for (index, command) in self.commands.iter().enumerate() {
            let mut out_of_range = None;
            command.for_each_argument(&mut |arg| match arg {
                Argument::Input(i) if i as usize >= inputs => {
                    out_of_range.get_or_insert(format!("input index {i} out of range"));
                }
                Argument::Result(i) | Argument::NestedResult(i, _) if i as usize >= commands => {
                    out_of_range.get_or_insert(format!("result index {i} out of range"));
                }
                _ => {}
            });
            if let Some(message) = out_of_range {
                return Err(Error::validation(format!("commands[{index}]"), message));
            }
        }
        Ok(())
    }
}

// ── $kind tag-keyed serde ─────────────────────────────────────────────────────
//
// Every sum value serializes as an object with a single tag key plus a
// `$kind` mirror field; deserialization dispatches on the tag key and
// ignores `$kind`.

impl Serialize for Argument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Argument::GasCoin => {
                map.serialize_entry("$kind", "GasCoin")?;
                map.serialize_entry("GasCoin", &true)?;
            }
            Argument::Input(i) => {
                map.serialize_entry("$kind", "Input")?;
                map.serialize_entry("Input", i)?;
            }
            Argument::Result(i) => {
                map.serialize_entry("$kind", "Result")?;
                map.serialize_entry("Result", i)?;
            }
            Argument::NestedResult(i, j) => {
                map.serialize_entry("$kind", "NestedResult")?;
                map.serialize_entry("NestedResult", &(i, j))?;
            }
            Argument::IntentResult(i) => {
                map.serialize_entry("$kind", "IntentResult")?;
                map.serialize_entry("IntentResult", i)?;
            }
            Argument::NestedIntentResult(i, j) => {
                map.serialize_entry("$kind", "NestedIntentResult")?;
                map.serialize_entry("NestedIntentResult", &(i, j))?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Argument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArgumentVisitor;

        impl<'de> Visitor<'de> for ArgumentVisitor {
            type Value = Argument;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a tag-keyed argument object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Argument, A::Error> {
                let mut value = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "$kind" => {
                            map.next_value::<IgnoredAny>()?;
                        }
                        "GasCoin" => {
                            map.next_value::<IgnoredAny>()?;
                            value = Some(Argument::GasCoin);
                        }
                        "Input" => value = Some(Argument::Input(map.next_value()?)),
                        "Result" => value = Some(Argument::Result(map.next_value()?)),
                        "NestedResult" => {
                            let (i, j) = map.next_value()?;
                            value = Some(Argument::NestedResult(i, j));
                        }
                        "IntentResult" => value = Some(Argument::IntentResult(map.next_value()?)),
                        "NestedIntentResult" => {
                            let (i, j) = map.next_value()?;
                            value = Some(Argument::NestedIntentResult(i, j));
                        }
                        other => {
                            return Err(de::Error::custom(format!(
                                "unknown argument kind {other:?}"
                            )))
                        }
                    }
                }
                value.ok_or_else(|| de::Error::custom("argument object carried no kind"))
            }
        }

        deserializer.deserialize_map(ArgumentVisitor)
    }
}

impl Serialize for ObjectArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            ObjectArg::ImmOrOwnedObject(obj) => {
                map.serialize_entry("$kind", "ImmOrOwnedObject")?;
                map.serialize_entry("ImmOrOwnedObject", obj)?;
            }
            ObjectArg::SharedObject(obj) => {
                map.serialize_entry("$kind", "SharedObject")?;
                map.serialize_entry("SharedObject", obj)?;
            }
            ObjectArg::Receiving(obj) => {
                map.serialize_entry("$kind", "Receiving")?;
                map.serialize_entry("Receiving", obj)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ObjectArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjectArgVisitor;

        impl<'de> Visitor<'de> for ObjectArgVisitor {
            type Value = ObjectArg;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a tag-keyed object argument")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ObjectArg, A::Error> {
                let mut value = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "$kind" => {
                            map.next_value::<IgnoredAny>()?;
                        }
                        "ImmOrOwnedObject" => {
                            value = Some(ObjectArg::ImmOrOwnedObject(map.next_value()?))
                        }
                        "SharedObject" => value = Some(ObjectArg::SharedObject(map.next_value()?)),
                        "Receiving" => value = Some(ObjectArg::Receiving(map.next_value()?)),
                        other => {
                            return Err(de::Error::custom(format!(
                                "unknown object argument kind {other:?}"
                            )))
                        }
                    }
                }
                value.ok_or_else(|| de::Error::custom("object argument carried no kind"))
            }
        }

        deserializer.deserialize_map(ObjectArgVisitor)
    }
}

impl Serialize for CallArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            CallArg::Pure(pure) => {
                map.serialize_entry("$kind", "Pure")?;
                map.serialize_entry("Pure", pure)?;
            }
            CallArg::Object(obj) => {
                map.serialize_entry("$kind", "Object")?;
                map.serialize_entry("Object", obj)?;
            }
            CallArg::UnresolvedObject(unresolved) => {
                map.serialize_entry("$kind", "UnresolvedObject")?;
                map.serialize_entry("UnresolvedObject", unresolved)?;
            }
            CallArg::RawValue(raw) => {
                map.serialize_entry("$kind", "RawValue")?;
                map.serialize_entry("RawValue", raw)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CallArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CallArgVisitor;

        impl<'de> Visitor<'de> for CallArgVisitor {
            type Value = CallArg;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a tag-keyed call argument")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<CallArg, A::Error> {
                let mut value = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "$kind" => {
                            map.next_value::<IgnoredAny>()?;
                        }
                        "Pure" => value = Some(CallArg::Pure(map.next_value()?)),
                        "Object" => value = Some(CallArg::Object(map.next_value()?)),
                        "UnresolvedObject" => {
                            value = Some(CallArg::UnresolvedObject(map.next_value()?))
                        }
                        "RawValue" => value = Some(CallArg::RawValue(map.next_value()?)),
                        other => {
                            return Err(de::Error::custom(format!(
                                "unknown input kind {other:?}"
                            )))
                        }
                    }
                }
                value.ok_or_else(|| de::Error::custom("input carried no kind"))
            }
        }

        deserializer.deserialize_map(CallArgVisitor)
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("$kind", self.kind())?;
        match self {
            Command::MoveCall(call) => map.serialize_entry("MoveCall", call)?,
            Command::TransferObjects(v) => map.serialize_entry("TransferObjects", v)?,
            Command::SplitCoins(v) => map.serialize_entry("SplitCoins", v)?,
            Command::MergeCoins(v) => map.serialize_entry("MergeCoins", v)?,
            Command::MakeMoveVec(v) => map.serialize_entry("MakeMoveVec", v)?,
            Command::Publish(v) => map.serialize_entry("Publish", v)?,
            Command::Upgrade(v) => map.serialize_entry("Upgrade", v)?,
            Command::TransactionIntent(v) => map.serialize_entry("TransactionIntent", v)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CommandVisitor;

        impl<'de> Visitor<'de> for CommandVisitor {
            type Value = Command;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a tag-keyed command")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Command, A::Error> {
                let mut value = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "$kind" => {
                            map.next_value::<IgnoredAny>()?;
                        }
                        "MoveCall" => value = Some(Command::MoveCall(map.next_value()?)),
                        "TransferObjects" => {
                            value = Some(Command::TransferObjects(map.next_value()?))
                        }
                        "SplitCoins" => value = Some(Command::SplitCoins(map.next_value()?)),
                        "MergeCoins" => value = Some(Command::MergeCoins(map.next_value()?)),
                        "MakeMoveVec" => value = Some(Command::MakeMoveVec(map.next_value()?)),
                        "Publish" => value = Some(Command::Publish(map.next_value()?)),
                        "Upgrade" => value = Some(Command::Upgrade(map.next_value()?)),
                        "TransactionIntent" => {
                            value = Some(Command::TransactionIntent(map.next_value()?))
                        }
                        other => {
                            return Err(de::Error::custom(format!(
                                "unexpected command kind {other:?}"
                            )))
                        }
                    }
                }
                value.ok_or_else(|| de::Error::custom("command carried no kind"))
            }
        }

        deserializer.deserialize_map(CommandVisitor)
    }
}

impl Serialize for Expiration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Expiration::None => {
                map.serialize_entry("$kind", "None")?;
                map.serialize_entry("None", &true)?;
            }
            Expiration::Epoch(epoch) => {
                map.serialize_entry("$kind", "Epoch")?;
                map.serialize_entry("Epoch", epoch)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Expiration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExpirationVisitor;

        impl<'de> Visitor<'de> for ExpirationVisitor {
            type Value = Expiration;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a tag-keyed expiration")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Expiration, A::Error> {
                let mut value = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "$kind" => {
                            map.next_value::<IgnoredAny>()?;
                        }
                        "None" => {
                            map.next_value::<IgnoredAny>()?;
                            value = Some(Expiration::None);
                        }
                        "Epoch" => value = Some(Expiration::Epoch(map.next_value()?)),
                        other => {
                            return Err(de::Error::custom(format!(
                                "unknown expiration kind {other:?}"
                            )))
                        }
                    }
                }
                value.ok_or_else(|| de::Error::custom("expiration carried no kind"))
            }
        }

        deserializer.deserialize_map(ExpirationVisitor)
    }
}
