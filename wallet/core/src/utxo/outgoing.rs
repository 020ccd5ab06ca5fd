//!
//! Implements the [`OutgoingTransaction`] type, a submitted
//! [`PendingTransaction`] tracked by its originating [`UtxoContext`]
//! until the network confirms (or rejects) it.
//!

use crate::imports::*;
use crate::tx::PendingTransaction;
use kaspa_hashes::Hash;

struct Inner {
    id: TransactionId,
    pending_transaction: PendingTransaction,
    originating_context: UtxoContext,
    destination_context: Option<UtxoContext>,
    creation_daa_score: u64,
    // 0 while the transaction has not been accepted
    acceptance_daa_score: AtomicU64,
    accepting_block_hash: Mutex<Option<Hash>>,
}

/// A wrapper around [`PendingTransaction`] that adds the submission
/// context used by [`UtxoContext`] while the transaction is in flight.
#[derive(Clone)]
pub struct OutgoingTransaction {
    inner: Arc<Inner>,
}

impl OutgoingTransaction {
    pub fn new(current_daa_score: u64, originating_context: UtxoContext, pending_transaction: PendingTransaction) -> Self {
        let destination_context = pending_transaction.destination_utxo_context();

        let inner = Inner {
            id: pending_transaction.id(),
            pending_transaction,
            originating_context,
            destination_context,
            creation_daa_score: current_daa_score,
            acceptance_daa_score: AtomicU64::new(0),
            accepting_block_hash: Mutex::new(None),
        };

        Self { inner: Arc::new(inner) }
    }

    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    pub fn pending_transaction(&self) -> &PendingTransaction {
        &self.inner.pending_transaction
    }

    pub fn originating_context(&self) -> &UtxoContext {
        &self.inner.originating_context
    }

    pub fn destination_context(&self) -> Option<&UtxoContext> {
        self.inner.destination_context.as_ref()
    }

    pub fn creation_daa_score(&self) -> u64 {
        self.inner.creation_daa_score
    }

    pub fn payment_value(&self) -> Option<u64> {
        self.inner.pending_transaction.payment_value()
    }

    pub fn fees(&self) -> u64 {
        self.inner.pending_transaction.fees()
    }

    pub fn aggregate_input_value(&self) -> u64 {
        self.inner.pending_transaction.aggregate_input_value()
    }

    pub fn aggregate_output_value(&self) -> u64 {
        self.inner.pending_transaction.aggregate_output_value()
    }

    pub fn is_batch(&self) -> bool {
        self.inner.pending_transaction.is_batch()
    }

    pub fn utxo_entries(&self) -> &[UtxoEntryReference] {
        self.inner.pending_transaction.utxo_entries()
    }

    /// Marks the transaction as accepted by the chain. A zero DAA score
    /// is stored as 1 so that acceptance remains observable.
    pub fn tag_as_accepted_at_daa_score(&self, accepted_daa_score: u64, accepting_block_hash: Option<Hash>) {
        self.inner.acceptance_daa_score.store(accepted_daa_score.max(1), Ordering::SeqCst);
        *self.inner.accepting_block_hash.lock().unwrap() = accepting_block_hash;
        self.inner.pending_transaction.set_accepted();
    }

    /// Reverts acceptance, used when the accepting block is removed
    /// from the selected chain.
    pub fn clear_acceptance(&self) {
        self.inner.acceptance_daa_score.store(0, Ordering::SeqCst);
        *self.inner.accepting_block_hash.lock().unwrap() = None;
        self.inner.pending_transaction.revert_acceptance();
    }

    pub fn acceptance_daa_score(&self) -> Option<u64> {
        match self.inner.acceptance_daa_score.load(Ordering::SeqCst) {
            0 => None,
            score => Some(score),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.inner.acceptance_daa_score.load(Ordering::SeqCst) != 0
    }

    pub fn accepting_block_hash(&self) -> Option<Hash> {
        *self.inner.accepting_block_hash.lock().unwrap()
    }
}

impl Eq for OutgoingTransaction {}

impl PartialEq for OutgoingTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl std::hash::Hash for OutgoingTransaction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for OutgoingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutgoingTransaction")
            .field("id", &self.id())
            .field("originating_context", &self.originating_context().id())
            .field("acceptance_daa_score", &self.acceptance_daa_score())
            .finish()
    }
}
