//!
//! Error types used by the wallet transaction engine.
//!

use kaspa_consensus_core::tx::TransactionId;
use std::num::ParseIntError;
use thiserror::Error;
use workflow_core::channel::ChannelError;

#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("{0}")]
    Custom(String),

    #[error(
        "Insufficient funds: {} sompi more is required to complete the payment ({origin})",
        additional_needed.to_string()
    )]
    InsufficientFunds { additional_needed: u64, origin: &'static str },

    #[error("Transaction mass exceeds the maximum standard transaction mass and cannot be reduced further")]
    MassExceeded,

    #[error("Invalid transaction shape: {0}")]
    InvalidTransactionShape(String),

    #[error("Transaction submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Transaction {0} was invalidated by a chain reorganization")]
    ReorgInvalidated(TransactionId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Generator: no transaction outputs were supplied")]
    GeneratorNoOutputs,

    #[error("Generator: payment output value is below the dust threshold")]
    GeneratorPaymentOutputIsDust,

    #[error("Generator: transaction outputs and payload exceed 2/3 of the maximum standard transaction mass")]
    GeneratorTransactionIsTooHeavy,

    #[error("Generator: including fees in the payment amount requires exactly one output")]
    GeneratorIncludeFeesRequiresOneOutput,

    #[error("Generator: priority fees can not be included in a sweep transaction")]
    GeneratorFeesInSweepTransaction,

    #[error("Generator: UTXO entry {0} is no longer reserved for this transaction")]
    GeneratorReservationLost(String),

    #[error("Pending transaction: {0}")]
    PendingTransactionState(String),

    #[error("Pending transaction {0} is not sourced from a UtxoContext")]
    PendingTransactionWithoutUtxoContext(TransactionId),

    #[error("Node is on network {actual}, while the processor is configured for {expected}")]
    InvalidNetwork { expected: String, actual: String },

    #[error("The node does not have the UTXO index enabled")]
    MissingUtxoIndex,

    #[error("The UTXO processor is running; maturity settings can only be changed while it is stopped")]
    ProcessorIsRunning,

    #[error("Invalid maturity period: coinbase maturity {coinbase} must be greater than the stasis period {stasis}")]
    InvalidMaturityPeriod { coinbase: u64, stasis: u64 },

    #[error("Network id is not set")]
    MissingNetworkId,

    #[error("Address error: {0}")]
    AddressError(#[from] kaspa_addresses::AddressError),

    #[error("Network id error: {0}")]
    NetworkIdError(#[from] kaspa_consensus_core::network::NetworkIdError),

    #[error("Consensus client error: {0}")]
    ConsensusClient(String),

    #[error("Serde JSON error: {0}")]
    SerdeJson(String),

    #[error("TOML error: {0}")]
    Toml(String),

    #[error(transparent)]
    ParseIntError(#[from] ParseIntError),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl Error {
    pub fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::Custom(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Self::Custom(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::SerdeJson(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Toml(err.to_string())
    }
}

impl From<kaspa_consensus_client::error::Error> for Error {
    fn from(err: kaspa_consensus_client::error::Error) -> Self {
        Self::ConsensusClient(err.to_string())
    }
}

impl<T> From<ChannelError<T>> for Error {
    fn from(err: ChannelError<T>) -> Self {
        Self::ChannelError(err.to_string())
    }
}
