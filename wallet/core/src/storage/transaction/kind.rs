//!
//! Wallet transaction record types.
//!

use crate::imports::*;
pub use kaspa_consensus_core::tx::TransactionId;

// Do not change the order of the variants in this enum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, BorshSerialize, BorshDeserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    /// Reorg transaction (caused by UTXO reorg).
    /// NOTE: These transactions should be ignored by clients
    /// if the transaction has not reached Pending maturity.
    Reorg,
    /// Stasis transaction (caused by a reorg during coinbase UTXO stasis).
    /// NOTE: These types of transactions should be ignored by clients.
    Stasis,
    /// Internal batch (compound) transaction. Generated as a part
    /// of Outgoing or Transfer transactions if the number of
    /// UTXOs needed for the payment exceeds the transaction mass limit.
    Batch,
    /// Change transaction. Generated as a part of the Outgoing
    /// or Transfer transactions.
    Change,
    /// A regular incoming transaction comprised of one or more UTXOs.
    Incoming,
    /// An outgoing transaction created by the generator. If the payment
    /// required batch transactions, this is the final transaction of the chain.
    Outgoing,
    /// Externally triggered *Outgoing* transaction observed by the
    /// processor, i.e. another wallet spending from tracked addresses.
    External,
    /// Incoming transfer between two contexts managed by the same processor.
    TransferIncoming,
    /// Outgoing transfer between two contexts managed by the same processor.
    TransferOutgoing,
}

impl TransactionKind {
    pub fn sign(&self) -> String {
        match self {
            TransactionKind::Incoming => "+",
            TransactionKind::Outgoing => "-",
            TransactionKind::External => "-",
            TransactionKind::Reorg => "-",
            TransactionKind::Batch
            | TransactionKind::Stasis
            | TransactionKind::TransferIncoming
            | TransactionKind::TransferOutgoing
            | TransactionKind::Change => "",
        }
        .to_string()
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionKind::Incoming => "incoming",
            TransactionKind::Outgoing => "outgoing",
            TransactionKind::External => "external",
            TransactionKind::Batch => "batch",
            TransactionKind::Reorg => "reorg",
            TransactionKind::Stasis => "stasis",
            TransactionKind::TransferIncoming => "transfer-incoming",
            TransactionKind::TransferOutgoing => "transfer-outgoing",
            TransactionKind::Change => "change",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TransactionKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "incoming" => Ok(TransactionKind::Incoming),
            "outgoing" => Ok(TransactionKind::Outgoing),
            "external" => Ok(TransactionKind::External),
            "batch" => Ok(TransactionKind::Batch),
            "reorg" => Ok(TransactionKind::Reorg),
            "stasis" => Ok(TransactionKind::Stasis),
            "transfer-incoming" => Ok(TransactionKind::TransferIncoming),
            "transfer-outgoing" => Ok(TransactionKind::TransferOutgoing),
            "change" => Ok(TransactionKind::Change),
            _ => Err(Error::custom(format!("Invalid transaction kind: {s}"))),
        }
    }
}
