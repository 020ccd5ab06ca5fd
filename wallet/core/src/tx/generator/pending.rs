//!
//! Pending transaction encapsulating a
//! transaction generated by the [`Generator`].
//!

use crate::imports::*;
use crate::tx::Generator;
use kaspa_consensus_core::tx::{SignableTransaction, Transaction, TransactionOutpoint, UtxoEntry as ConsensusUtxoEntry};
use kaspa_consensus_client::serializable::{numeric, string};
use kaspa_consensus_core::constants::UNACCEPTED_DAA_SCORE;

/// Signing primitive used by [`PendingTransaction::try_sign`].
///
/// Implementations receive the transaction together with the addresses
/// of the consumed UTXO entries and must return it with every input
/// carrying a signature script.
pub trait Signer: Send + Sync {
    fn try_sign(&self, transaction: SignableTransaction, addresses: &[Address]) -> Result<SignableTransaction>;
}

/// Lifecycle of a [`PendingTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingTransactionState {
    Draft,
    Signed,
    Submitted,
    Accepted,
    Rejected,
}

impl std::fmt::Display for PendingTransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            PendingTransactionState::Draft => "draft",
            PendingTransactionState::Signed => "signed",
            PendingTransactionState::Submitted => "submitted",
            PendingTransactionState::Accepted => "accepted",
            PendingTransactionState::Rejected => "rejected",
        };
        write!(f, "{state}")
    }
}

/// Position of a transaction within a generated chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingTransactionKind {
    /// Intermediate transaction compounding inputs into the change address
    Batch,
    /// Last transaction of the chain, carrying the payment outputs
    Final,
}

impl PendingTransactionKind {
    pub fn is_final(&self) -> bool {
        matches!(self, PendingTransactionKind::Final)
    }
}

struct PendingTransactionInner {
    /// Generator that produced the transaction
    generator: Generator,
    /// UtxoEntryReferences of the pending transaction
    utxo_entries: Vec<UtxoEntryReference>,
    /// Transaction Id (cached in pending to avoid mutex lock)
    id: TransactionId,
    /// Signable transaction (actual transaction that will be signed and sent)
    signable_tx: Mutex<SignableTransaction>,
    /// UTXO addresses used by this transaction
    addresses: Vec<Address>,
    state: Mutex<PendingTransactionState>,
    /// Payment value of the transaction (transaction destination amount)
    payment_value: Option<u64>,
    /// The index (position) of the change output in the transaction
    change_output_index: Option<usize>,
    /// Change value of the transaction (transaction change amount)
    change_output_value: u64,
    /// Total aggregate value of all inputs consumed by this transaction
    aggregate_input_value: u64,
    /// Total aggregate value of all outputs
    aggregate_output_value: u64,
    /// Minimum number of signatures required by the transaction
    /// (passed in the user supplied [`GeneratorSettings`])
    minimum_signatures: u16,
    mass: u64,
    /// Fees of the transaction
    fees: u64,
    kind: PendingTransactionKind,
}

impl std::fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let transaction = self.transaction();
        f.debug_struct("PendingTransaction")
            .field("kind", &self.inner.kind)
            .field("state", &self.state())
            .field("utxo_entries", &self.inner.utxo_entries)
            .field("addresses", &self.inner.addresses)
            .field("payment_value", &self.inner.payment_value)
            .field("change_output_index", &self.inner.change_output_index)
            .field("change_output_value", &self.inner.change_output_value)
            .field("aggregate_input_value", &self.inner.aggregate_input_value)
            .field("aggregate_output_value", &self.inner.aggregate_output_value)
            .field("minimum_signatures", &self.inner.minimum_signatures)
            .field("mass", &self.inner.mass)
            .field("fees", &self.inner.fees)
            .field("transaction", &transaction)
            .finish()
    }
}

/// Meta transaction encapsulating a transaction generated by the [`Generator`].
/// Contains auxiliary information about the transaction such as aggregate
/// input/output amounts, fees, etc.
#[derive(Clone)]
pub struct PendingTransaction {
    inner: Arc<PendingTransactionInner>,
}

impl PendingTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        generator: &Generator,
        transaction: Transaction,
        utxo_entries: Vec<UtxoEntryReference>,
        addresses: Vec<Address>,
        payment_value: Option<u64>,
        change_output_index: Option<usize>,
        change_output_value: u64,
        aggregate_input_value: u64,
        aggregate_output_value: u64,
        minimum_signatures: u16,
        mass: u64,
        fees: u64,
        kind: PendingTransactionKind,
    ) -> Result<Self> {
        if transaction.inputs.len() != utxo_entries.len() {
            return Err(Error::InvalidTransactionShape(format!(
                "transaction has {} inputs but {} utxo entries were supplied",
                transaction.inputs.len(),
                utxo_entries.len()
            )));
        }

        let id = transaction.id();
        let entries = utxo_entries.iter().map(ConsensusUtxoEntry::from).collect::<Vec<_>>();
        let signable_tx = Mutex::new(SignableTransaction::with_entries(transaction, entries));

        Ok(Self {
            inner: Arc::new(PendingTransactionInner {
                generator: generator.clone(),
                id,
                signable_tx,
                utxo_entries,
                addresses,
                state: Mutex::new(PendingTransactionState::Draft),
                payment_value,
                change_output_index,
                change_output_value,
                aggregate_input_value,
                aggregate_output_value,
                minimum_signatures,
                mass,
                fees,
                kind,
            }),
        })
    }

    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    pub fn generator(&self) -> &Generator {
        &self.inner.generator
    }

    pub fn source_utxo_context(&self) -> Option<&UtxoContext> {
        self.inner.generator.source_utxo_context().as_ref()
    }

    pub fn destination_utxo_context(&self) -> Option<UtxoContext> {
        self.inner.generator.destination_utxo_context().clone()
    }

    /// Addresses used by the pending transaction
    pub fn addresses(&self) -> &[Address] {
        &self.inner.addresses
    }

    /// Get UTXO entries [`UtxoEntryReference`] used by the pending transaction
    pub fn utxo_entries(&self) -> &[UtxoEntryReference] {
        &self.inner.utxo_entries
    }

    pub fn fees(&self) -> u64 {
        self.inner.fees
    }

    pub fn mass(&self) -> u64 {
        self.inner.mass
    }

    pub fn minimum_signatures(&self) -> u16 {
        self.inner.minimum_signatures
    }

    pub fn aggregate_input_value(&self) -> u64 {
        self.inner.aggregate_input_value
    }

    pub fn aggregate_output_value(&self) -> u64 {
        self.inner.aggregate_output_value
    }

    /// Value sent to the payment destination, `None` for batch and
    /// sweep transactions.
    pub fn payment_value(&self) -> Option<u64> {
        self.inner.payment_value
    }

    pub fn change_output_index(&self) -> Option<usize> {
        self.inner.change_output_index
    }

    pub fn change_value(&self) -> u64 {
        self.inner.change_output_value
    }

    pub fn kind(&self) -> PendingTransactionKind {
        self.inner.kind
    }

    pub fn is_final(&self) -> bool {
        self.inner.kind.is_final()
    }

    pub fn is_batch(&self) -> bool {
        !self.inner.kind.is_final()
    }

    pub fn state(&self) -> PendingTransactionState {
        *self.inner.state.lock().unwrap()
    }

    fn set_state(&self, state: PendingTransactionState) {
        *self.inner.state.lock().unwrap() = state;
    }

    /// Moves to `state` only from one of the `from` states.
    fn transition(&self, from: &[PendingTransactionState], state: PendingTransactionState) -> bool {
        let mut current = self.inner.state.lock().unwrap();
        if from.contains(&*current) {
            *current = state;
            true
        } else {
            false
        }
    }

    /// Current state of the transaction, including any signatures
    /// applied so far.
    pub fn transaction(&self) -> Transaction {
        self.inner.signable_tx.lock().unwrap().tx.clone()
    }

    pub fn signable_transaction(&self) -> SignableTransaction {
        self.inner.signable_tx.lock().unwrap().clone()
    }

    /// JSON form of the transaction and its input entries, for signers
    /// that live outside of this process. With `safe` set, 64-bit amounts
    /// are encoded as decimal strings.
    pub fn serialize_to_json(&self, safe: bool) -> Result<String> {
        let signable_tx = self.signable_transaction();
        let json = if safe {
            string::SerializableTransaction::from_signable_transaction(&signable_tx)?.serialize_to_json()?
        } else {
            numeric::SerializableTransaction::from_signable_transaction(&signable_tx)?.serialize_to_json()?
        };
        Ok(json)
    }

    /// The change output expressed as a UTXO entry that has not yet been
    /// accepted by the network. `None` if the transaction has no change output.
    pub fn change_utxo_entry(&self) -> Option<UtxoEntryReference> {
        let index = self.inner.change_output_index?;
        let signable_tx = self.inner.signable_tx.lock().unwrap();
        let output = signable_tx.tx.outputs.get(index)?;
        let entry = UtxoEntry {
            address: Some(self.inner.generator.change_address().clone()),
            outpoint: TransactionOutpoint::new(self.inner.id, index as TransactionIndexType),
            amount: output.value,
            script_public_key: output.script_public_key.clone(),
            block_daa_score: UNACCEPTED_DAA_SCORE,
            is_coinbase: false,
        };
        Some(entry.into())
    }

    /// Sign the transaction using the [`Signer`] supplied to the [`Generator`].
    pub fn try_sign(&self) -> Result<()> {
        let signer = self.inner.generator.signer().clone().ok_or_else(|| Error::custom("Generator has no signer"))?;
        self.try_sign_with(signer.as_ref())
    }

    pub fn try_sign_with(&self, signer: &dyn Signer) -> Result<()> {
        let state = self.state();
        if state != PendingTransactionState::Draft {
            return Err(Error::PendingTransactionState(format!("can not sign a transaction in the `{state}` state")));
        }

        let signable_tx = self.signable_transaction();
        let signed_tx = signer.try_sign(signable_tx, self.addresses())?;
        if signed_tx.id() != self.id() || !signed_tx.is_fully_signed() {
            return Err(Error::PendingTransactionState("signer did not produce a fully signed transaction".to_string()));
        }

        *self.inner.signable_tx.lock().unwrap() = signed_tx;
        self.set_state(PendingTransactionState::Signed);
        Ok(())
    }

    /// Supply a signature script for a single input, for signing flows
    /// that operate outside of the [`Signer`] trait. The transaction moves
    /// to the `Signed` state once every input carries a signature.
    pub fn fill_input(&self, input_index: usize, signature_script: Vec<u8>) -> Result<()> {
        let state = self.state();
        if state != PendingTransactionState::Draft {
            return Err(Error::PendingTransactionState(format!("can not fill inputs of a transaction in the `{state}` state")));
        }

        let is_fully_signed = {
            let mut signable_tx = self.inner.signable_tx.lock().unwrap();
            let input = signable_tx
                .tx
                .inputs
                .get_mut(input_index)
                .ok_or_else(|| Error::PendingTransactionState(format!("input index {input_index} is out of range")))?;
            input.signature_script = signature_script;
            signable_tx.is_fully_signed()
        };

        if is_fully_signed {
            self.set_state(PendingTransactionState::Signed);
        }
        Ok(())
    }

    /// Submit the signed transaction through the node connector.
    ///
    /// The consumed entries are registered as outgoing with the source
    /// [`UtxoContext`] before submission. A rejected submission restores
    /// them to the spendable pool.
    pub async fn try_submit(&self, connector: &Arc<DynNodeConnector>) -> Result<TransactionId> {
        let state = self.state();
        if state != PendingTransactionState::Signed {
            return Err(Error::PendingTransactionState(format!("can not submit a transaction in the `{state}` state")));
        }

        let utxo_context = self.source_utxo_context().cloned().ok_or(Error::PendingTransactionWithoutUtxoContext(self.id()))?;

        if let Some(entry) = self.utxo_entries().iter().find(|entry| utxo_context.is_invalidated(&entry.transaction_id())) {
            return Err(Error::ReorgInvalidated(entry.transaction_id()));
        }

        let outgoing = utxo_context.register_outgoing_transaction(self)?;

        match connector.submit_transaction(self.transaction()).await {
            Ok(id) => {
                // acceptance may have been observed while the submission was in flight
                self.transition(&[PendingTransactionState::Signed], PendingTransactionState::Submitted);
                utxo_context.notify_outgoing_transaction(&outgoing).await?;
                Ok(id)
            }
            Err(err) => {
                log_warn!("{} submission of {} failed: {err}", utxo_context.id().short(), self.id());
                utxo_context.cancel_outgoing_transaction(&outgoing).await?;
                self.set_state(PendingTransactionState::Rejected);
                match err {
                    Error::SubmissionRejected(_) => Err(err),
                    err => Err(Error::SubmissionRejected(err.to_string())),
                }
            }
        }
    }

    /// Marks a submitted transaction as accepted by the network.
    pub(crate) fn set_accepted(&self) {
        self.transition(&[PendingTransactionState::Signed, PendingTransactionState::Submitted], PendingTransactionState::Accepted);
    }

    /// Reverts acceptance after the accepting block left the selected chain.
    pub(crate) fn revert_acceptance(&self) {
        self.transition(&[PendingTransactionState::Accepted], PendingTransactionState::Submitted);
    }

    /// Returns the consumed entries of an abandoned transaction to the
    /// spendable pool of the source [`UtxoContext`].
    pub fn release(&self) -> Result<()> {
        match self.source_utxo_context() {
            Some(utxo_context) => utxo_context.release(self.utxo_entries()),
            None => Ok(()),
        }
    }
}
