//! Client-side builder for programmable transactions: an in-memory assembly
//! model, a staged resolution pipeline that fills in chain-derived data, and
//! canonical BCS encoding plus digest derivation.

mod address;
mod builder;
mod client;
mod data;
mod digest;
mod error;
mod intent;
mod pipeline;
mod pure;
mod serialization;
mod signature;
mod signer;
mod transaction;
mod type_tag;
mod v1;

pub use address::Address;
pub use builder::{BlockDataBuilder, BuildArgs, InputKind, TransactionOverrides};
pub use client::{
    ChainClient, Coin, DryRunEffects, DryRunResponse, EffectsStatus, GasCostSummary,
    NormalizedFunction, NormalizedStructType, NormalizedType, ObjectData, ObjectDataOptions,
    ObjectResponse, Owner, ProtocolConfig, ProtocolConfigValue, TransactionLimits,
    NATIVE_COIN_TYPE,
};
pub use data::{
    Argument, CallArg, Command, Expiration, GasData, IntentInput, MakeMoveVec, MergeCoins,
    MoveCall, ObjectArg, ObjectRef, Publish, PureBytes, RawValue, RawValueKind, SharedObjectRef,
    SplitCoins, TransactionIntent, TransactionState, TransferObjects, UnresolvedObject, Upgrade,
};
pub use digest::{transaction_digest, Digest};
pub use error::{BoxError, Error};
pub use intent::{rewrite_intents, IntentResolver};
pub use pipeline::{
    Next, PipelineOptions, ResolutionPipeline, ResolveContext, ResolvePlugin, Stage,
    TerminalHandler,
};
pub use pure::PureSchema;
pub use serialization::{
    decode_transaction_data, decode_transaction_kind, encode_transaction_data,
    encode_transaction_kind,
};
pub use signature::{
    DatatypeSignature, OpenMoveTypeSignature, OpenMoveTypeSignatureBody, PrimitiveType, RefKind,
};
pub use signer::{SignatureBytes, Signer};
pub use transaction::{
    Amount, Function, ObjectInput, Recipient, ResolveOptions, TransactionBuilder,
    TransactionResult,
};
pub use type_tag::{Identifier, StructTag, TypeTag};
pub use v1::{to_v1, to_v2, InputKindV1, InputV1, TransactionStateV1};
