//!
//! Implementation of the [`UtxoContext`], a set of UTXO entries
//! owned by a group of tracked addresses.
//!
//! Every tracked entry is in exactly one [`UtxoEntryState`]. Entries move
//! from stasis (coinbase only) to pending to mature as the virtual DAA
//! score advances, are reserved by a [`Generator`](crate::tx::Generator)
//! while a transaction is being built, and become outgoing once the
//! transaction spending them has been submitted. Every transition that
//! affects the balance is followed by a [`Events::Balance`] notification.
//!

use crate::imports::*;
use crate::tx::PendingTransaction;
use crate::utxo::balance::BalanceStrings;
use crate::utxo::UtxoEntryReferenceExtension;
use kaspa_hashes::{Hash, Hasher, UtxoContextIdHash};
use sorted_insert::SortedInsertBinaryByKey;

static UTXO_CONTEXT_ID_SEQUENCER: AtomicU64 = AtomicU64::new(0);

fn next_utxo_context_id() -> u64 {
    UTXO_CONTEXT_ID_SEQUENCER.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UtxoContextId(pub(crate) Hash);

impl Default for UtxoContextId {
    fn default() -> Self {
        UtxoContextId(UtxoContextIdHash::hash(next_utxo_context_id().to_le_bytes()))
    }
}

impl From<Hash> for UtxoContextId {
    fn from(id: Hash) -> Self {
        UtxoContextId(id)
    }
}

impl UtxoContextId {
    pub fn new(id: Hash) -> Self {
        UtxoContextId(id)
    }

    pub fn short(&self) -> String {
        let hex = self.to_string();
        format!("[{}]", &hex[0..8])
    }
}

impl std::fmt::Display for UtxoContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an entry tracked by a [`UtxoContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtxoEntryState {
    Stasis,
    Pending,
    Mature,
    /// Mature entry held by a generator for a transaction that has
    /// not been submitted yet.
    Reserved,
    /// Entry consumed by a submitted transaction awaiting confirmation.
    Outgoing,
}

impl From<Maturity> for UtxoEntryState {
    fn from(maturity: Maturity) -> Self {
        match maturity {
            Maturity::Stasis => UtxoEntryState::Stasis,
            Maturity::Pending => UtxoEntryState::Pending,
            Maturity::Confirmed => UtxoEntryState::Mature,
        }
    }
}

/// Outcome of [`UtxoContext::try_reserve_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The entry was mature and is now reserved by the caller.
    Reserved,
    /// The entry is tracked but is not spendable.
    Unavailable,
    /// The entry is not tracked by the context.
    Untracked,
}

struct TrackedEntry {
    entry: UtxoEntryReference,
    state: UtxoEntryState,
    // set while the entry is outgoing
    spending_transaction: Option<TransactionId>,
    // state the entry was in when it became outgoing
    spent_from: Option<UtxoEntryState>,
}

#[derive(Default)]
pub(crate) struct Context {
    entries: AHashMap<UtxoEntryId, TrackedEntry>,
    /// Entries in [`UtxoEntryState::Mature`] sorted by amount (ascending).
    mature: Vec<UtxoEntryReference>,
    outgoing: AHashMap<TransactionId, OutgoingTransaction>,
    /// Transactions whose outputs were removed by a chain reorganization.
    invalidated: AHashSet<TransactionId>,
    balance: Option<Balance>,
    addresses: Arc<DashSet<Arc<Address>>>,
}

impl Context {
    fn insert(&mut self, entry: UtxoEntryReference, state: UtxoEntryState) {
        if state == UtxoEntryState::Mature {
            self.mature.sorted_insert_binary_asc_by_key(entry.clone(), |entry| entry.amount_as_ref());
        }
        self.entries.insert(entry.id(), TrackedEntry { entry, state, spending_transaction: None, spent_from: None });
    }

    fn remove(&mut self, id: &UtxoEntryId) -> Option<TrackedEntry> {
        let tracked = self.entries.remove(id)?;
        if tracked.state == UtxoEntryState::Mature {
            self.mature.retain(|entry| entry.id_as_ref() != id);
        }
        Some(tracked)
    }

    /// Moves an entry to `state`, keeping the mature index in sync.
    /// Returns the previous state.
    fn transition(&mut self, id: &UtxoEntryId, state: UtxoEntryState) -> Option<UtxoEntryState> {
        let tracked = self.entries.get_mut(id)?;
        let previous = tracked.state;
        if previous == state {
            return Some(previous);
        }
        tracked.state = state;
        if state == UtxoEntryState::Outgoing {
            tracked.spent_from = Some(previous);
        } else {
            tracked.spending_transaction = None;
            tracked.spent_from = None;
        }
        let entry = tracked.entry.clone();
        if previous == UtxoEntryState::Mature {
            self.mature.retain(|mature| mature.id_as_ref() != id);
        } else if state == UtxoEntryState::Mature {
            self.mature.sorted_insert_binary_asc_by_key(entry, |entry| entry.amount_as_ref());
        }
        Some(previous)
    }

    fn count(&self, state: UtxoEntryState) -> usize {
        self.entries.values().filter(|tracked| tracked.state == state).count()
    }

    fn calculate_balance(&self) -> Balance {
        let mut balance = Balance::default();
        for tracked in self.entries.values() {
            let amount = tracked.entry.amount();
            match tracked.state {
                // batch outputs are reserved for the next step before they are accepted
                UtxoEntryState::Reserved if tracked.entry.is_unaccepted() => {
                    balance.pending += amount;
                    balance.pending_utxo_count += 1;
                }
                UtxoEntryState::Mature | UtxoEntryState::Reserved => {
                    balance.mature += amount;
                    balance.mature_utxo_count += 1;
                }
                UtxoEntryState::Pending => {
                    balance.pending += amount;
                    balance.pending_utxo_count += 1;
                }
                UtxoEntryState::Stasis => {
                    balance.pending += amount;
                    balance.stasis_utxo_count += 1;
                }
                UtxoEntryState::Outgoing => {
                    balance.outgoing += amount;
                    // counted in the bucket the entry was spent from
                    match tracked.spent_from {
                        Some(UtxoEntryState::Stasis) => balance.stasis_utxo_count += 1,
                        Some(UtxoEntryState::Pending) => balance.pending_utxo_count += 1,
                        Some(UtxoEntryState::Reserved) if tracked.entry.is_unaccepted() => balance.pending_utxo_count += 1,
                        _ => balance.mature_utxo_count += 1,
                    }
                }
            }
        }
        balance
    }

    /// Recomputes the balance, returning it only if it differs
    /// from the previously published one.
    fn refresh_balance(&mut self) -> Option<Balance> {
        let mut balance = self.calculate_balance();
        if self.balance.as_ref().is_some_and(|previous| previous.same_as(&balance)) {
            return None;
        }
        balance.delta(&self.balance);
        self.balance = Some(balance.clone());
        Some(balance)
    }

    fn clear_entries(&mut self) {
        self.entries.clear();
        self.mature.clear();
        self.outgoing.clear();
        self.invalidated.clear();
        self.balance = None;
    }
}

struct Inner {
    id: UtxoContextId,
    context: Mutex<Context>,
    processor: UtxoProcessor,
}

/// A collection of UTXO entries belonging to a set of tracked addresses,
/// bound to a [`UtxoProcessor`] that feeds it node notifications.
#[derive(Clone)]
pub struct UtxoContext {
    inner: Arc<Inner>,
}

impl UtxoContext {
    pub fn new(processor: &UtxoProcessor, id: Option<UtxoContextId>) -> Self {
        let inner = Inner { id: id.unwrap_or_default(), context: Mutex::new(Context::default()), processor: processor.clone() };
        Self { inner: Arc::new(inner) }
    }

    pub(crate) fn context(&self) -> MutexGuard<'_, Context> {
        self.inner.context.lock().unwrap()
    }

    pub fn id(&self) -> UtxoContextId {
        self.inner.id
    }

    pub fn processor(&self) -> &UtxoProcessor {
        &self.inner.processor
    }

    pub fn addresses(&self) -> Arc<DashSet<Arc<Address>>> {
        self.context().addresses.clone()
    }

    /// Number of tracked entries, in any state.
    pub fn utxo_size(&self) -> usize {
        self.context().entries.len()
    }

    pub fn mature_utxo_size(&self) -> usize {
        self.context().mature.len()
    }

    pub fn pending_utxo_size(&self) -> usize {
        self.context().count(UtxoEntryState::Pending)
    }

    pub fn stasis_utxo_size(&self) -> usize {
        self.context().count(UtxoEntryState::Stasis)
    }

    pub fn reserved_utxo_size(&self) -> usize {
        self.context().count(UtxoEntryState::Reserved)
    }

    pub fn outgoing_utxo_size(&self) -> usize {
        self.context().count(UtxoEntryState::Outgoing)
    }

    pub fn entry_state(&self, id: &UtxoEntryId) -> Option<UtxoEntryState> {
        self.context().entries.get(id).map(|tracked| tracked.state)
    }

    /// Last published balance, `None` before the first balance update.
    pub fn balance(&self) -> Option<Balance> {
        self.context().balance.clone()
    }

    pub fn balance_strings(&self, padding: Option<usize>) -> Result<BalanceStrings> {
        let network_id = self.processor().network_id()?;
        Ok(BalanceStrings::from((self.balance().as_ref(), &network_id.network_type, padding)))
    }

    /// Mature entries with indexes `from..to` in ascending amount order.
    pub fn get_mature_range(&self, from: usize, to: usize) -> Vec<UtxoEntryReference> {
        let context = self.context();
        let to = to.min(context.mature.len());
        if from >= to {
            return vec![];
        }
        context.mature[from..to].to_vec()
    }

    /// Snapshot of the spendable entries, largest first.
    pub fn mature_entries_descending(&self) -> Vec<UtxoEntryReference> {
        self.context().mature.iter().rev().cloned().collect()
    }

    pub fn is_spendable(&self, id: &UtxoEntryId) -> bool {
        self.context().entries.get(id).is_some_and(|tracked| tracked.state == UtxoEntryState::Mature)
    }

    /// `true` if the transaction was invalidated by a chain reorganization.
    pub fn is_invalidated(&self, id: &TransactionId) -> bool {
        self.context().invalidated.contains(id)
    }

    pub fn outgoing_transactions(&self) -> Vec<OutgoingTransaction> {
        self.context().outgoing.values().cloned().collect()
    }

    /// Atomically reserves a mature entry for a transaction under
    /// construction.
    pub fn try_reserve_entry(&self, id: &UtxoEntryId) -> Reservation {
        let mut context = self.context();
        match context.entries.get(id).map(|tracked| tracked.state) {
            None => Reservation::Untracked,
            Some(UtxoEntryState::Mature) => {
                context.transition(id, UtxoEntryState::Reserved);
                Reservation::Reserved
            }
            Some(_) => Reservation::Unavailable,
        }
    }

    /// Returns reserved entries to the state their maturity dictates.
    /// Entries in any other state are left untouched.
    pub fn release(&self, entries: &[UtxoEntryReference]) -> Result<()> {
        let params = self.processor().network_params().inspect_err(|err| {
            log_error!("utxo context {}: unable to release {} entries: {err}", self.id().short(), entries.len());
        })?;
        let current_daa_score = self.processor().current_daa_score();
        let mut context = self.context();
        for entry in entries {
            let id = entry.id_as_ref();
            let Some(tracked) = context.entries.get(id).filter(|tracked| tracked.state == UtxoEntryState::Reserved) else {
                continue;
            };
            let state: UtxoEntryState = tracked.entry.maturity(&params, current_daa_score).into();
            context.transition(id, state);
        }
        Ok(())
    }

    /// Releases all reserved entries.
    pub fn release_reserved(&self) -> Result<()> {
        let reserved = self
            .context()
            .entries
            .values()
            .filter(|tracked| tracked.state == UtxoEntryState::Reserved)
            .map(|tracked| tracked.entry.clone())
            .collect::<Vec<_>>();
        self.release(&reserved)
    }

    /// Unregisters all addresses and drops all entries.
    pub async fn clear(&self) -> Result<()> {
        let local = self.addresses();
        let addresses = local.iter().map(|address| address.clone()).collect::<Vec<_>>();
        if !addresses.is_empty() {
            self.processor().unregister_addresses(addresses, self).await?;
            local.clear();
        }

        self.context().clear_entries();

        Ok(())
    }

    /// Drops all entries while keeping the tracked addresses.
    pub(crate) fn reset(&self) {
        self.context().clear_entries();
    }

    pub async fn update_balance(&self) -> Result<Balance> {
        let balance = {
            let mut context = self.context();
            let mut balance = context.calculate_balance();
            balance.delta(&context.balance);
            context.balance = Some(balance.clone());
            balance
        };

        self.processor().notify(Events::Balance { balance: Some(balance.clone()), id: self.id() }).await?;

        Ok(balance)
    }

    async fn notify_all(&self, events: Vec<Events>) -> Result<()> {
        for event in events {
            self.processor().notify(event).await?;
        }
        Ok(())
    }

    fn balance_event(&self, context: &mut Context, events: &mut Vec<Events>) {
        if let Some(balance) = context.refresh_balance() {
            events.push(Events::Balance { balance: Some(balance), id: self.id() });
        }
    }

    pub async fn register_addresses(&self, addresses: &[Address]) -> Result<()> {
        let local = self.addresses();

        let addresses = addresses
            .iter()
            .filter_map(|address| {
                let address = Arc::new(address.clone());
                if local.insert(address.clone()) { Some(address) } else { None }
            })
            .collect::<Vec<_>>();

        if !addresses.is_empty() {
            self.processor().register_addresses(addresses, self).await?;
        }

        Ok(())
    }

    /// Stops tracking `addresses`. Entries belonging to them are dropped
    /// from the balance without being treated as spent.
    pub async fn unregister_addresses(&self, addresses: Vec<Address>) -> Result<()> {
        if addresses.is_empty() {
            log_warn!("utxo context: unregistering empty address set");
            return Ok(());
        }

        let local = self.addresses();
        let addresses = addresses.into_iter().map(Arc::new).collect::<Vec<_>>();
        self.processor().unregister_addresses(addresses.clone(), self).await?;
        addresses.iter().for_each(|address| {
            local.remove(address);
        });

        let dropped = {
            let mut context = self.context();
            let ids = context
                .entries
                .values()
                .filter(|tracked| tracked.entry.address().is_some_and(|address| addresses.iter().any(|a| a.as_ref() == address)))
                .map(|tracked| tracked.entry.id())
                .collect::<Vec<_>>();
            ids.iter().for_each(|id| {
                context.remove(id);
            });
            ids.len()
        };

        if dropped > 0 || self.balance().is_some() {
            self.update_balance().await?;
        }

        Ok(())
    }

    /// Registers `addresses` and, when the processor is connected, seeds the
    /// entry set with the UTXOs currently held by these addresses.
    pub async fn track_addresses(&self, addresses: &[Address], current_daa_score: Option<u64>) -> Result<()> {
        self.register_addresses(addresses).await?;

        if self.processor().is_connected() {
            let entries = self.processor().connector().get_utxos_by_addresses(addresses.to_vec()).await?;
            let current_daa_score = current_daa_score.unwrap_or_else(|| self.processor().current_daa_score());
            self.scan(entries, current_daa_score).await?;
        }

        Ok(())
    }

    /// Re-fetches the entries of all tracked addresses.
    pub(crate) async fn rescan(&self) -> Result<()> {
        let addresses = self.addresses().iter().map(|address| (**address).clone()).collect::<Vec<_>>();
        if !addresses.is_empty() {
            let entries = self.processor().connector().get_utxos_by_addresses(addresses).await?;
            self.scan(entries, self.processor().current_daa_score()).await?;
        }
        Ok(())
    }

    /// Inserts entries obtained by an address scan, emitting
    /// [`Events::Discovery`] (or [`Events::Stasis`] for coinbase entries
    /// in stasis) per transaction.
    pub(crate) async fn scan(&self, entries: Vec<UtxoEntry>, current_daa_score: u64) -> Result<()> {
        let params = self.processor().network_params()?;
        let mut events = vec![];
        {
            let mut context = self.context();
            let mut discovered = vec![];
            for entry in entries.into_iter().map(UtxoEntryReference::from) {
                if !self.accept_new_entry(&mut context, &entry) {
                    continue;
                }
                let state = UtxoEntryState::from(entry.maturity(&params, current_daa_score));
                context.insert(entry.clone(), state);
                discovered.push((entry, state));
            }

            for (txid, group) in group_by_transaction(discovered) {
                let (stasis, other): (Vec<_>, Vec<_>) = group.into_iter().partition(|(_, state)| *state == UtxoEntryState::Stasis);
                if !stasis.is_empty() {
                    let utxos = stasis.into_iter().map(|(entry, _)| entry).collect::<Vec<_>>();
                    events.push(Events::Stasis { record: TransactionRecord::new_stasis(self, txid, &utxos)? });
                }
                if !other.is_empty() {
                    let utxos = other.into_iter().map(|(entry, _)| entry).collect::<Vec<_>>();
                    events.push(Events::Discovery { record: TransactionRecord::new_external(self, txid, &utxos)? });
                }
            }

            self.balance_event(&mut context, &mut events);
        }

        self.notify_all(events).await
    }

    /// Decides whether a newly reported entry should be inserted.
    /// Duplicates are ignored, unless the tracked copy was created
    /// locally and the network now reports it as accepted.
    fn accept_new_entry(&self, context: &mut Context, entry: &UtxoEntryReference) -> bool {
        let id = entry.id();
        match context.entries.get(&id) {
            None => true,
            Some(tracked) if tracked.entry.is_unaccepted() && !entry.is_unaccepted() && tracked.state == UtxoEntryState::Pending => {
                context.remove(&id);
                true
            }
            Some(_) => {
                log_warn!("utxo context {}: ignoring duplicate utxo entry {}", self.id().short(), id);
                false
            }
        }
    }

    pub(crate) async fn handle_utxo_added(&self, utxos: Vec<UtxoEntryReference>) -> Result<()> {
        let params = self.processor().network_params()?;
        let current_daa_score = self.processor().current_daa_score();
        let mut events = vec![];
        {
            let mut context = self.context();

            for (txid, group) in group_by_transaction(utxos.into_iter().map(|utxo| (utxo, ()))) {
                let group = group.into_iter().map(|(utxo, _)| utxo).collect::<Vec<_>>();

                if let Some(outgoing) = self.processor().outgoing_transaction(&txid) {
                    // outputs of our own transaction are trusted as soon as they are accepted
                    for utxo in group.iter() {
                        let id = utxo.id();
                        match context.entries.get(&id).map(|tracked| tracked.state) {
                            None => context.insert(utxo.clone(), UtxoEntryState::Mature),
                            Some(state @ (UtxoEntryState::Pending | UtxoEntryState::Reserved)) => {
                                context.remove(&id);
                                let state = if state == UtxoEntryState::Reserved { state } else { UtxoEntryState::Mature };
                                context.insert(utxo.clone(), state);
                            }
                            Some(_) => {}
                        }
                    }
                    if !outgoing.is_accepted() {
                        outgoing.tag_as_accepted_at_daa_score(current_daa_score, None);
                    }
                    let accepted_daa_score = outgoing.acceptance_daa_score();
                    let record = if outgoing.is_batch() {
                        TransactionRecord::new_batch(self, &outgoing, accepted_daa_score)?
                    } else if outgoing.originating_context().id() == self.id() {
                        TransactionRecord::new_change(self, &outgoing, accepted_daa_score)?
                    } else {
                        TransactionRecord::new_transfer_incoming(self, &outgoing, accepted_daa_score)?
                    };
                    events.push(Events::Maturity { record });
                    continue;
                }

                context.invalidated.remove(&txid);

                let mut stasis = vec![];
                let mut pending = vec![];
                let mut mature = vec![];
                for utxo in group {
                    if !self.accept_new_entry(&mut context, &utxo) {
                        continue;
                    }
                    let state = UtxoEntryState::from(utxo.maturity(&params, current_daa_score));
                    context.insert(utxo.clone(), state);
                    match state {
                        UtxoEntryState::Stasis => stasis.push(utxo),
                        UtxoEntryState::Mature => mature.push(utxo),
                        _ => pending.push(utxo),
                    }
                }

                if !stasis.is_empty() {
                    events.push(Events::Stasis { record: TransactionRecord::new_stasis(self, txid, &stasis)? });
                }
                if !pending.is_empty() {
                    events.push(Events::Pending { record: TransactionRecord::new_incoming(self, txid, &pending)? });
                }
                if !mature.is_empty() {
                    events.push(Events::Maturity { record: TransactionRecord::new_incoming(self, txid, &mature)? });
                }
            }

            self.balance_event(&mut context, &mut events);
        }

        self.notify_all(events).await
    }

    pub(crate) async fn handle_utxo_removed(&self, utxos: Vec<UtxoEntryReference>) -> Result<()> {
        let mut events = vec![];
        {
            let mut context = self.context();

            let mut spending_transactions = vec![];
            let mut reorged = vec![];
            let mut stasis = vec![];

            for utxo in utxos {
                let Some(tracked) = context.remove(utxo.id_as_ref()) else {
                    continue;
                };
                match tracked.state {
                    UtxoEntryState::Outgoing => {
                        if let Some(txid) = tracked.spending_transaction {
                            if !spending_transactions.contains(&txid) {
                                spending_transactions.push(txid);
                            }
                        }
                    }
                    UtxoEntryState::Mature | UtxoEntryState::Reserved => {
                        log_trace!("utxo context {}: external spend of {}", self.id().short(), tracked.entry.id());
                    }
                    UtxoEntryState::Pending => reorged.push((tracked.entry, ())),
                    UtxoEntryState::Stasis => stasis.push((tracked.entry, ())),
                }
            }

            for txid in spending_transactions {
                let in_flight = context.entries.values().any(|tracked| tracked.spending_transaction == Some(txid));
                if in_flight {
                    continue;
                }
                let Some(outgoing) = context.outgoing.remove(&txid) else {
                    continue;
                };
                self.processor().remove_outgoing_transaction(&txid);
                if !outgoing.is_accepted() {
                    outgoing.tag_as_accepted_at_daa_score(self.processor().current_daa_score(), None);
                }
                let accepted_daa_score = outgoing.acceptance_daa_score();
                let record = if outgoing.is_batch() {
                    TransactionRecord::new_batch(self, &outgoing, accepted_daa_score)?
                } else if outgoing.destination_context().is_some_and(|destination| destination.id() != self.id()) {
                    TransactionRecord::new_transfer_outgoing(self, &outgoing, accepted_daa_score)?
                } else {
                    TransactionRecord::new_outgoing(self, &outgoing, accepted_daa_score)?
                };
                events.push(Events::Maturity { record });
            }

            for (txid, group) in group_by_transaction(reorged) {
                let utxos = group.into_iter().map(|(utxo, _)| utxo).collect::<Vec<_>>();
                context.invalidated.insert(txid);
                events.push(Events::Reorg { record: TransactionRecord::new_reorg(self, txid, &utxos)? });
            }

            for (txid, group) in group_by_transaction(stasis) {
                let utxos = group.into_iter().map(|(utxo, _)| utxo).collect::<Vec<_>>();
                events.push(Events::Stasis { record: TransactionRecord::new_stasis(self, txid, &utxos)? });
            }

            self.balance_event(&mut context, &mut events);
        }

        self.notify_all(events).await
    }

    /// Maturity sweep: promotes stasis and pending entries that have
    /// crossed their maturity thresholds at `current_daa_score`.
    pub(crate) async fn handle_daa_score_change(&self, current_daa_score: u64) -> Result<()> {
        let params = self.processor().network_params()?;
        let mut events = vec![];
        {
            let mut context = self.context();

            let mut transitions = context
                .entries
                .values()
                .filter(|tracked| matches!(tracked.state, UtxoEntryState::Stasis | UtxoEntryState::Pending))
                .filter_map(|tracked| {
                    let state = UtxoEntryState::from(tracked.entry.maturity(&params, current_daa_score));
                    (state != tracked.state).then(|| (tracked.entry.clone(), state))
                })
                .collect::<Vec<_>>();

            if transitions.is_empty() {
                return Ok(());
            }

            transitions.sort_by_key(|(entry, _)| (entry.block_daa_score(), entry.id()));
            for (entry, state) in transitions.iter() {
                context.transition(entry.id_as_ref(), *state);
            }

            for (txid, group) in group_by_transaction(transitions) {
                let (mature, pending): (Vec<_>, Vec<_>) = group.into_iter().partition(|(_, state)| *state == UtxoEntryState::Mature);
                if !pending.is_empty() {
                    let utxos = pending.into_iter().map(|(utxo, _)| utxo).collect::<Vec<_>>();
                    events.push(Events::Pending { record: TransactionRecord::new_incoming(self, txid, &utxos)? });
                }
                if !mature.is_empty() {
                    let utxos = mature.into_iter().map(|(utxo, _)| utxo).collect::<Vec<_>>();
                    events.push(Events::Maturity { record: TransactionRecord::new_incoming(self, txid, &utxos)? });
                }
            }

            self.balance_event(&mut context, &mut events);
        }

        self.notify_all(events).await
    }

    /// Handles a transaction whose accepting block was removed from the
    /// selected chain: outputs it produced are dropped and the transaction
    /// is marked invalidated.
    pub(crate) async fn handle_reorged_transaction(&self, txid: TransactionId) -> Result<()> {
        let mut events = vec![];
        {
            let mut context = self.context();
            let ids = context
                .entries
                .values()
                .filter(|tracked| tracked.entry.transaction_id() == txid && tracked.state != UtxoEntryState::Outgoing)
                .map(|tracked| tracked.entry.id())
                .collect::<Vec<_>>();
            context.invalidated.insert(txid);
            if ids.is_empty() {
                return Ok(());
            }
            let utxos = ids.iter().filter_map(|id| context.remove(id)).map(|tracked| tracked.entry).collect::<Vec<_>>();
            events.push(Events::Reorg { record: TransactionRecord::new_reorg(self, txid, &utxos)? });
            self.balance_event(&mut context, &mut events);
        }

        self.notify_all(events).await
    }

    /// Marks the inputs of `pending_transaction` as outgoing before the
    /// transaction is submitted.
    pub fn register_outgoing_transaction(&self, pending_transaction: &PendingTransaction) -> Result<OutgoingTransaction> {
        let outgoing = OutgoingTransaction::new(self.processor().current_daa_score(), self.clone(), pending_transaction.clone());
        {
            let mut context = self.context();
            for entry in pending_transaction.utxo_entries() {
                let id = entry.id_as_ref();
                if context.transition(id, UtxoEntryState::Outgoing).is_some() {
                    if let Some(tracked) = context.entries.get_mut(id) {
                        tracked.spending_transaction = Some(outgoing.id());
                    }
                }
            }
            context.outgoing.insert(outgoing.id(), outgoing.clone());
        }
        self.processor().register_outgoing_transaction(&outgoing);
        Ok(outgoing)
    }

    /// Publishes a successfully submitted transaction. The change output,
    /// if owned by this context, is tracked immediately as a pending entry.
    pub async fn notify_outgoing_transaction(&self, outgoing: &OutgoingTransaction) -> Result<()> {
        let mut events = vec![];
        {
            let mut context = self.context();

            if let Some(change) = outgoing.pending_transaction().change_utxo_entry() {
                let owned = change.address().is_some_and(|address| context.addresses.contains(address));
                if owned && !context.entries.contains_key(change.id_as_ref()) {
                    // a batch output is the next input of the same generator run
                    let state = if outgoing.is_batch() { UtxoEntryState::Reserved } else { UtxoEntryState::Pending };
                    context.insert(change, state);
                }
            }

            let record = if outgoing.is_batch() {
                TransactionRecord::new_batch(self, outgoing, None)?
            } else if outgoing.destination_context().is_some_and(|destination| destination.id() != self.id()) {
                TransactionRecord::new_transfer_outgoing(self, outgoing, None)?
            } else {
                TransactionRecord::new_outgoing(self, outgoing, None)?
            };
            events.push(Events::Pending { record });

            self.balance_event(&mut context, &mut events);
        }

        self.notify_all(events).await
    }

    /// Reverts a transaction that failed submission: its inputs are
    /// returned to the state their maturity dictates.
    pub async fn cancel_outgoing_transaction(&self, outgoing: &OutgoingTransaction) -> Result<()> {
        let params = self.processor().network_params()?;
        let current_daa_score = self.processor().current_daa_score();
        let txid = outgoing.id();
        let mut events = vec![];
        {
            let mut context = self.context();
            let restored = context
                .entries
                .values()
                .filter(|tracked| tracked.spending_transaction == Some(txid))
                .map(|tracked| tracked.entry.clone())
                .collect::<Vec<_>>();
            for entry in restored {
                context.transition(entry.id_as_ref(), entry.maturity(&params, current_daa_score).into());
            }
            context.outgoing.remove(&txid);
            self.balance_event(&mut context, &mut events);
        }
        self.processor().remove_outgoing_transaction(&txid);

        self.notify_all(events).await
    }
}

impl std::fmt::Debug for UtxoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtxoContext").field("id", &self.id()).finish()
    }
}

/// Groups values by the transaction that produced each entry,
/// preserving first-seen order.
fn group_by_transaction<T>(
    items: impl IntoIterator<Item = (UtxoEntryReference, T)>,
) -> Vec<(TransactionId, Vec<(UtxoEntryReference, T)>)> {
    let mut index: AHashMap<TransactionId, usize> = AHashMap::new();
    let mut groups: Vec<(TransactionId, Vec<_>)> = vec![];
    for (entry, value) in items {
        let txid = entry.transaction_id();
        match index.get(&txid) {
            Some(&position) => groups[position].1.push((entry, value)),
            None => {
                index.insert(txid, groups.len());
                groups.push((txid, vec![(entry, value)]));
            }
        }
    }
    groups
}
