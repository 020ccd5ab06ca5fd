//!
//! Wallet transaction record implementation.
//!

use super::*;
use crate::imports::*;
use crate::utxo::entry::UtxoEntryReferenceExtension;
use workflow_core::time::unixtime_as_millis_u64;

pub use kaspa_consensus_core::tx::TransactionId;

/// Record of a single event affecting the UTXO set of a [`UtxoContext`].
///
/// Records are immutable once created, with the exception of the
/// user-editable `note` and `metadata` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    id: TransactionId,
    /// Unix time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    unixtime_msec: Option<u64>,
    value: u64,
    binding: UtxoContextId,
    block_daa_score: u64,
    #[serde(rename = "network")]
    network_id: NetworkId,
    #[serde(rename = "data")]
    transaction_data: TransactionData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// JSON-serialized client metadata. A client updating the metadata
    /// should store its data under its own key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl TransactionRecord {
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn unixtime_msec(&self) -> Option<u64> {
        self.unixtime_msec
    }

    pub fn unixtime_or_daa_as_string(&self) -> String {
        if let Some(unixtime) = self.unixtime_msec { unixtime.to_string() } else { self.block_daa_score.separated_string() }
    }

    pub fn binding(&self) -> &UtxoContextId {
        &self.binding
    }

    pub fn block_daa_score(&self) -> u64 {
        self.block_daa_score
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn kind(&self) -> TransactionKind {
        self.transaction_data.kind()
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    pub fn transaction_data(&self) -> &TransactionData {
        &self.transaction_data
    }

    pub fn aggregate_input_value(&self) -> u64 {
        self.transaction_data.aggregate_input_value()
    }

    pub fn is_coinbase(&self) -> bool {
        self.transaction_data.utxo_entries().iter().any(|entry| entry.is_coinbase)
    }

    pub fn is_outgoing(&self) -> bool {
        matches!(self.kind(), TransactionKind::Outgoing)
    }

    pub fn is_change(&self) -> bool {
        matches!(self.kind(), TransactionKind::Change)
    }

    pub fn is_batch(&self) -> bool {
        matches!(self.kind(), TransactionKind::Batch)
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self.kind(), TransactionKind::TransferIncoming | TransactionKind::TransferOutgoing)
    }

    pub fn has_address(&self, address: &Address) -> bool {
        self.transaction_data.has_address(address)
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note;
    }

    pub fn set_metadata(&mut self, metadata: Option<String>) {
        self.metadata = metadata;
    }

    /// Maturity of the record at `current_daa_score`, using the coinbase
    /// thresholds when the record describes coinbase entries.
    pub fn maturity(&self, params: &NetworkParams, current_daa_score: u64) -> Maturity {
        let maturity_period = if self.is_coinbase() {
            if self.block_daa_score.saturating_add(params.coinbase_transaction_stasis_period_daa()) > current_daa_score {
                return Maturity::Stasis;
            }
            params.coinbase_transaction_maturity_period_daa()
        } else {
            params.user_transaction_maturity_period_daa()
        };

        if self.block_daa_score.saturating_add(maturity_period) > current_daa_score { Maturity::Pending } else { Maturity::Confirmed }
    }

    pub fn new_incoming(utxo_context: &UtxoContext, id: TransactionId, utxos: &[UtxoEntryReference]) -> Result<Self> {
        Self::new_observed(utxo_context, TransactionKind::Incoming, id, utxos)
    }

    pub fn new_reorg(utxo_context: &UtxoContext, id: TransactionId, utxos: &[UtxoEntryReference]) -> Result<Self> {
        Self::new_observed(utxo_context, TransactionKind::Reorg, id, utxos)
    }

    pub fn new_stasis(utxo_context: &UtxoContext, id: TransactionId, utxos: &[UtxoEntryReference]) -> Result<Self> {
        Self::new_observed(utxo_context, TransactionKind::Stasis, id, utxos)
    }

    pub fn new_external(utxo_context: &UtxoContext, id: TransactionId, utxos: &[UtxoEntryReference]) -> Result<Self> {
        Self::new_observed(utxo_context, TransactionKind::External, id, utxos)
    }

    fn new_observed(utxo_context: &UtxoContext, kind: TransactionKind, id: TransactionId, utxos: &[UtxoEntryReference]) -> Result<Self> {
        let utxo_entries = utxos.iter().map(UtxoRecord::from).collect::<Vec<_>>();
        let aggregate_input_value = utxo_entries.iter().map(|utxo| utxo.amount).sum::<u64>();
        // locally created entries carry no acceptance score yet
        let block_daa_score = utxos
            .iter()
            .find(|utxo| !utxo.is_unaccepted())
            .map(|utxo| utxo.block_daa_score())
            .unwrap_or_else(|| utxo_context.processor().current_daa_score());

        let transaction_data = TransactionData::new_utxo(kind, UtxoTransactionData { utxo_entries, aggregate_input_value })?;

        Ok(TransactionRecord {
            id,
            unixtime_msec: Some(unixtime_as_millis_u64()),
            value: aggregate_input_value,
            binding: utxo_context.id(),
            block_daa_score,
            network_id: utxo_context.processor().network_id()?,
            transaction_data,
            note: None,
            metadata: None,
        })
    }

    pub fn new_outgoing(utxo_context: &UtxoContext, outgoing_tx: &OutgoingTransaction, accepted_daa_score: Option<u64>) -> Result<Self> {
        Self::new_generated(utxo_context, TransactionKind::Outgoing, outgoing_tx, accepted_daa_score)
    }

    pub fn new_batch(utxo_context: &UtxoContext, outgoing_tx: &OutgoingTransaction, accepted_daa_score: Option<u64>) -> Result<Self> {
        Self::new_generated(utxo_context, TransactionKind::Batch, outgoing_tx, accepted_daa_score)
    }

    pub fn new_change(utxo_context: &UtxoContext, outgoing_tx: &OutgoingTransaction, accepted_daa_score: Option<u64>) -> Result<Self> {
        Self::new_generated(utxo_context, TransactionKind::Change, outgoing_tx, accepted_daa_score)
    }

    pub fn new_transfer_incoming(
        utxo_context: &UtxoContext,
        outgoing_tx: &OutgoingTransaction,
        accepted_daa_score: Option<u64>,
    ) -> Result<Self> {
        Self::new_generated(utxo_context, TransactionKind::TransferIncoming, outgoing_tx, accepted_daa_score)
    }

    pub fn new_transfer_outgoing(
        utxo_context: &UtxoContext,
        outgoing_tx: &OutgoingTransaction,
        accepted_daa_score: Option<u64>,
    ) -> Result<Self> {
        Self::new_generated(utxo_context, TransactionKind::TransferOutgoing, outgoing_tx, accepted_daa_score)
    }

    fn new_generated(
        utxo_context: &UtxoContext,
        kind: TransactionKind,
        outgoing_tx: &OutgoingTransaction,
        accepted_daa_score: Option<u64>,
    ) -> Result<Self> {
        let pending = outgoing_tx.pending_transaction();
        let transaction = pending.transaction();
        let id = transaction.id();
        let utxo_entries = pending.utxo_entries().iter().map(UtxoRecord::from).collect::<Vec<_>>();

        let value = match kind {
            TransactionKind::Batch => pending.aggregate_output_value(),
            TransactionKind::Change => pending.change_value(),
            _ => pending.payment_value().unwrap_or(pending.aggregate_input_value()),
        };

        let transaction_data = TransactionData::new_generated(
            kind,
            GeneratedTransactionData {
                fees: pending.fees(),
                aggregate_input_value: pending.aggregate_input_value(),
                aggregate_output_value: pending.aggregate_output_value(),
                transaction,
                payment_value: pending.payment_value(),
                change_value: pending.change_value(),
                accepted_daa_score,
                utxo_entries,
            },
        )?;

        Ok(TransactionRecord {
            id,
            unixtime_msec: Some(unixtime_as_millis_u64()),
            value,
            binding: utxo_context.id(),
            block_daa_score: accepted_daa_score.unwrap_or_else(|| outgoing_tx.creation_daa_score()),
            network_id: utxo_context.processor().network_id()?,
            transaction_data,
            note: None,
            metadata: None,
        })
    }
}
