use crate::address::Address;

/// Error type carried across the external seams (chain client, signer).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong while assembling, resolving, or encoding a
/// transaction. Errors abort the current build; nothing is retried
/// internally, and a corrected builder can be re-built.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    // Schema errors
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),
    #[error("validation failed at {path}: {message}")]
    ValidationFailed { path: String, message: String },
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("invalid type tag: {0}")]
    InvalidTypeTag(String),
    #[error("unexpected command kind: {0}")]
    UnexpectedCommandKind(String),

    // Missing state at build time
    #[error("missing transaction sender")]
    MissingSender,
    #[error("missing gas budget")]
    MissingGasBudget,
    #[error("missing gas payment")]
    MissingGasPayment,
    #[error("missing gas price")]
    MissingGasPrice,
    #[error("the {stage} step requires a chain client and none was provided")]
    MissingClient { stage: &'static str },

    // Resolution errors
    #[error("the following object inputs could not be resolved: {}", format_ids(.0))]
    InvalidObjectInputs(Vec<Address>),
    #[error(
        "move call {package}::{module}::{function} expects {expected} arguments, got {actual}"
    )]
    ArityMismatch {
        package: Address,
        module: String,
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("expected an object id string for input {index}")]
    ExpectedObjectIdString { index: usize },
    #[error("no resolver produced primitive commands for intent {0:?}")]
    UnresolvedIntent(String),
    #[error("an intent resolver for {0:?} is already registered")]
    IntentResolverConflict(String),

    // Gas errors
    #[error("dry run failed: {effects_error}")]
    DryRunFailed {
        effects_error: String,
        /// The raw dry-run response, kept for diagnostics.
        cause: String,
    },
    #[error("no gas coins found for the gas owner")]
    NoGasCoins,
    #[error("at most {max} gas payment objects are allowed")]
    TooManyGasCoins { max: u64 },

    // Validation errors
    #[error("pure input {index} is {got} bytes, max is {max}")]
    PureTooLarge { index: usize, got: usize, max: u64 },
    #[error("serialized transaction is {size} bytes, max is {max}")]
    TransactionTooLarge { size: usize, max: usize },

    // External seams
    #[error("chain client error")]
    ChainClient(#[source] BoxError),
    #[error("signing failed")]
    Signer(#[source] BoxError),
    #[error("bcs encoding failed")]
    Bcs(#[from] bcs::Error),
}

fn format_ids(ids: &[Address]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ValidationFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}
