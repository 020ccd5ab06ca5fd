//!
//! Transaction [`GeneratorSettings`] used when
//! constructing and instance of the [`Generator`](crate::tx::Generator).
//!

use crate::imports::*;
use crate::tx::{Fees, PaymentDestination};
use crate::utxo::UtxoIterator;
use sorted_insert::SortedInsertBinaryByKey;

pub type UtxoSourceIterator = Box<dyn Iterator<Item = UtxoEntryReference> + Send + Sync + 'static>;

pub struct GeneratorSettings {
    // Network type
    pub network_id: NetworkId,
    // Utxo iterator
    pub utxo_iterator: UtxoSourceIterator,
    // Utxo entries consumed before any entry of the iterator
    pub priority_utxo_entries: Option<Vec<UtxoEntryReference>>,
    // Utxo Context
    pub source_utxo_context: Option<UtxoContext>,
    // typically a number of keys required to sign the transaction
    pub sig_op_count: u8,
    // number of minimum signatures required to sign the transaction
    pub minimum_signatures: u16,
    // change address
    pub change_address: Address,
    // sompi per gram; `None` applies the minimum relay fee only
    pub fee_rate: Option<f64>,
    // applies only to the final transaction
    pub final_transaction_priority_fee: Fees,
    // final transaction outputs
    pub final_transaction_destination: PaymentDestination,
    // payload
    pub final_transaction_payload: Option<Vec<u8>>,
    // transaction is a transfer between contexts
    pub destination_utxo_context: Option<UtxoContext>,
}

impl std::fmt::Debug for GeneratorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorSettings")
            .field("network_id", &self.network_id)
            .field("priority_utxo_entries", &self.priority_utxo_entries.as_ref().map(|entries| entries.len()))
            .field("source_utxo_context", &self.source_utxo_context.as_ref().map(|context| context.id()))
            .field("sig_op_count", &self.sig_op_count)
            .field("minimum_signatures", &self.minimum_signatures)
            .field("change_address", &self.change_address)
            .field("fee_rate", &self.fee_rate)
            .field("final_transaction_priority_fee", &self.final_transaction_priority_fee)
            .field("final_transaction_destination", &self.final_transaction_destination)
            .field("final_transaction_payload", &self.final_transaction_payload.as_ref().map(|payload| payload.len()))
            .field("destination_utxo_context", &self.destination_utxo_context.as_ref().map(|context| context.id()))
            .finish()
    }
}

impl GeneratorSettings {
    /// Settings drawing entries from the mature pool of `utxo_context`.
    /// Consumed entries are reserved in the context as transactions are
    /// generated. The fee rate defaults to the one configured on the
    /// context's processor.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new_with_context(
        utxo_context: UtxoContext,
        priority_utxo_entries: Option<Vec<UtxoEntryReference>>,
        change_address: Address,
        sig_op_count: u8,
        minimum_signatures: u16,
        final_transaction_destination: PaymentDestination,
        fee_rate: Option<f64>,
        final_priority_fee: Fees,
        final_transaction_payload: Option<Vec<u8>>,
    ) -> Result<Self> {
        let network_id = utxo_context.processor().network_id()?;
        let fee_rate = fee_rate.or_else(|| utxo_context.processor().fee_rate());
        let utxo_iterator = UtxoIterator::new(&utxo_context);

        let settings = GeneratorSettings {
            network_id,
            sig_op_count,
            minimum_signatures,
            change_address,
            utxo_iterator: Box::new(utxo_iterator),
            priority_utxo_entries,
            source_utxo_context: Some(utxo_context),
            fee_rate,
            final_transaction_priority_fee: final_priority_fee,
            final_transaction_destination,
            final_transaction_payload,
            destination_utxo_context: None,
        };

        Ok(settings)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn try_new_with_iterator(
        network_id: NetworkId,
        utxo_iterator: UtxoSourceIterator,
        priority_utxo_entries: Option<Vec<UtxoEntryReference>>,
        change_address: Address,
        sig_op_count: u8,
        minimum_signatures: u16,
        final_transaction_destination: PaymentDestination,
        fee_rate: Option<f64>,
        final_priority_fee: Fees,
        final_transaction_payload: Option<Vec<u8>>,
    ) -> Result<Self> {
        let settings = GeneratorSettings {
            network_id,
            sig_op_count,
            minimum_signatures,
            change_address,
            utxo_iterator,
            priority_utxo_entries,
            source_utxo_context: None,
            fee_rate,
            final_transaction_priority_fee: final_priority_fee,
            final_transaction_destination,
            final_transaction_payload,
            destination_utxo_context: None,
        };

        Ok(settings)
    }

    /// Settings drawing from a caller-owned set of entries. The entries
    /// are consumed largest first.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new_with_entries(
        network_id: NetworkId,
        utxo_entries: Vec<UtxoEntryReference>,
        priority_utxo_entries: Option<Vec<UtxoEntryReference>>,
        change_address: Address,
        sig_op_count: u8,
        minimum_signatures: u16,
        final_transaction_destination: PaymentDestination,
        fee_rate: Option<f64>,
        final_priority_fee: Fees,
        final_transaction_payload: Option<Vec<u8>>,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(utxo_entries.len());
        for entry in utxo_entries {
            entries.sorted_insert_binary_asc_by_key(entry, |entry| entry.amount_as_ref());
        }
        entries.reverse();

        Self::try_new_with_iterator(
            network_id,
            Box::new(entries.into_iter()),
            priority_utxo_entries,
            change_address,
            sig_op_count,
            minimum_signatures,
            final_transaction_destination,
            fee_rate,
            final_priority_fee,
            final_transaction_payload,
        )
    }

    pub fn utxo_context_transfer(mut self, destination_utxo_context: &UtxoContext) -> Self {
        self.destination_utxo_context = Some(destination_utxo_context.clone());
        self
    }
}
