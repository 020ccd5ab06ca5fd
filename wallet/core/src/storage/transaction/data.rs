//!
//! Wallet transaction data variants.
//!

use super::{TransactionKind, UtxoRecord};
use crate::imports::*;
use kaspa_consensus_core::tx::Transaction;

pub use kaspa_consensus_core::tx::TransactionId;

/// Data of a record describing UTXO entries observed on the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoTransactionData {
    pub utxo_entries: Vec<UtxoRecord>,
    #[serde(rename = "value")]
    pub aggregate_input_value: u64,
}

/// Data of a record describing a transaction created by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTransactionData {
    pub fees: u64,
    #[serde(rename = "inputValue")]
    pub aggregate_input_value: u64,
    #[serde(rename = "outputValue")]
    pub aggregate_output_value: u64,
    pub transaction: Transaction,
    pub payment_value: Option<u64>,
    pub change_value: u64,
    pub accepted_daa_score: Option<u64>,
    #[serde(default)]
    pub utxo_entries: Vec<UtxoRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(tag = "type", content = "transaction")]
#[serde(rename_all = "kebab-case")]
pub enum TransactionData {
    Reorg(UtxoTransactionData),
    Incoming(UtxoTransactionData),
    Stasis(UtxoTransactionData),
    External(UtxoTransactionData),
    Batch(GeneratedTransactionData),
    Outgoing(GeneratedTransactionData),
    TransferIncoming(GeneratedTransactionData),
    TransferOutgoing(GeneratedTransactionData),
    Change(GeneratedTransactionData),
}

impl TransactionData {
    pub fn new_utxo(kind: TransactionKind, data: UtxoTransactionData) -> Result<Self> {
        match kind {
            TransactionKind::Reorg => Ok(TransactionData::Reorg(data)),
            TransactionKind::Incoming => Ok(TransactionData::Incoming(data)),
            TransactionKind::Stasis => Ok(TransactionData::Stasis(data)),
            TransactionKind::External => Ok(TransactionData::External(data)),
            _ => Err(Error::custom(format!("transaction kind `{kind}` does not describe observed UTXO entries"))),
        }
    }

    pub fn new_generated(kind: TransactionKind, data: GeneratedTransactionData) -> Result<Self> {
        match kind {
            TransactionKind::Batch => Ok(TransactionData::Batch(data)),
            TransactionKind::Outgoing => Ok(TransactionData::Outgoing(data)),
            TransactionKind::TransferIncoming => Ok(TransactionData::TransferIncoming(data)),
            TransactionKind::TransferOutgoing => Ok(TransactionData::TransferOutgoing(data)),
            TransactionKind::Change => Ok(TransactionData::Change(data)),
            _ => Err(Error::custom(format!("transaction kind `{kind}` does not describe a generated transaction"))),
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionData::Reorg(_) => TransactionKind::Reorg,
            TransactionData::Stasis(_) => TransactionKind::Stasis,
            TransactionData::Incoming(_) => TransactionKind::Incoming,
            TransactionData::External(_) => TransactionKind::External,
            TransactionData::Outgoing(_) => TransactionKind::Outgoing,
            TransactionData::Batch(_) => TransactionKind::Batch,
            TransactionData::TransferIncoming(_) => TransactionKind::TransferIncoming,
            TransactionData::TransferOutgoing(_) => TransactionKind::TransferOutgoing,
            TransactionData::Change(_) => TransactionKind::Change,
        }
    }

    pub fn utxo_data(&self) -> Option<&UtxoTransactionData> {
        match self {
            TransactionData::Reorg(data)
            | TransactionData::Incoming(data)
            | TransactionData::Stasis(data)
            | TransactionData::External(data) => Some(data),
            _ => None,
        }
    }

    pub fn generated_data(&self) -> Option<&GeneratedTransactionData> {
        match self {
            TransactionData::Batch(data)
            | TransactionData::Outgoing(data)
            | TransactionData::TransferIncoming(data)
            | TransactionData::TransferOutgoing(data)
            | TransactionData::Change(data) => Some(data),
            _ => None,
        }
    }

    pub fn utxo_entries(&self) -> &[UtxoRecord] {
        match (self.utxo_data(), self.generated_data()) {
            (Some(data), _) => &data.utxo_entries,
            (_, Some(data)) => &data.utxo_entries,
            _ => &[],
        }
    }

    pub fn aggregate_input_value(&self) -> u64 {
        match (self.utxo_data(), self.generated_data()) {
            (Some(data), _) => data.aggregate_input_value,
            (_, Some(data)) => data.aggregate_input_value,
            _ => 0,
        }
    }

    pub fn has_address(&self, address: &Address) -> bool {
        self.utxo_entries().iter().any(|utxo| utxo.address.as_ref() == Some(address))
    }
}
