//!
//! Transaction generator implementation used to construct
//! Kaspa transactions.
//!
//! The [`Generator`] consumes UTXO entries from a source (a [`UtxoContext`]
//! or a caller-supplied iterator) and produces a chain of transactions. When
//! the entries required for a payment do not fit into a single transaction
//! without exceeding the maximum standard transaction mass, the generator
//! emits *batch* transactions that compound the consumed entries into a
//! single output sent to the change address. Each batch output becomes the
//! first input candidate of the next step. The chain always ends with a
//! single *final* transaction carrying the payment outputs and the payload.
//!
//! Generation is pull-driven: every call to [`Generator::generate_transaction`]
//! (or every poll of [`Generator::iter`] / [`Generator::stream`]) produces
//! at most one transaction. Once the final transaction has been produced,
//! or an error has been returned, the generator is done and yields nothing.
//!
//! Fees are derived from the overall transaction mass: the compute mass of
//! the transaction (including the expected signatures) combined with its
//! storage mass. Since the storage mass depends on the output values and the
//! output values depend on the fees, the fees are recomputed until they cover
//! the mass of the transaction they are charged to.
//!
//! Entries are reserved in the source [`UtxoContext`] as soon as they are
//! selected, preventing concurrent generators from reusing them. Entries
//! selected but not consumed by a produced transaction are released when the
//! generator finishes, fails or is aborted. [`PendingTransaction::release`]
//! returns the entries of a produced transaction to the spendable pool if the
//! transaction is abandoned.
//!

use crate::imports::*;
use crate::tx::{
    Fees, GeneratorSettings, GeneratorSummary, MassCalculator, PaymentDestination, PendingTransaction, PendingTransactionIterator,
    PendingTransactionKind, PendingTransactionStream, Signer, UtxoSourceIterator,
};
use crate::utxo::{Reservation, UtxoEntryReferenceExtension, UtxoEntryState};
use futures::Stream;
use kaspa_consensus_core::config::params::Params;
use kaspa_consensus_core::constants::TX_VERSION;
use kaspa_consensus_core::subnets::SUBNETWORK_ID_NATIVE;
use kaspa_consensus_core::tx::{pay_to_address_script, Transaction, TransactionInput, TransactionOutput};

// fee recalculation rounds before a transaction shape is considered unviable
const MAXIMUM_FEE_CONVERGENCE_ITERATIONS: usize = 16;

struct Context {
    // source of entries
    utxo_source_iterator: UtxoSourceIterator,
    // entries consumed before the source iterator
    priority_utxo_entries: VecDeque<UtxoEntryReference>,
    // ids of priority entries, skipped if the source iterator yields them
    priority_utxo_entry_filter: AHashSet<UtxoEntryId>,
    // entries taken from the sources that were not used by the
    // previous transaction, as well as outputs of batch transactions
    utxo_stash: VecDeque<UtxoEntryReference>,
    // source context entries reserved by this run and not yet
    // consumed by a produced transaction
    reserved: AHashSet<UtxoEntryId>,
    // number of utxos consumed by all generated transactions
    aggregated_utxos: usize,
    // total fees of all transactions issued by
    // the single generator instance
    aggregate_fees: u64,
    // total mass of all generated transactions
    aggregate_mass: u64,
    // number of generated transactions
    number_of_generated_transactions: usize,
    // final transaction id
    final_transaction_id: Option<TransactionId>,
    // signifies that the generator is finished
    // no more items will be produced in the
    // iterator or a stream
    is_done: bool,
}

impl Context {
    /// Next input candidate. Entries taken from the sources are reserved in
    /// `utxo_context`; entries it tracks but can not reserve are skipped.
    fn next_utxo_entry(&mut self, utxo_context: Option<&UtxoContext>) -> Option<UtxoEntryReference> {
        if let Some(entry) = self.utxo_stash.pop_front() {
            return Some(entry);
        }
        while let Some(entry) = self.priority_utxo_entries.pop_front() {
            if try_reserve(utxo_context, &mut self.reserved, &entry) {
                return Some(entry);
            }
            log_trace!("generator: skipping unavailable priority entry {}", entry.id());
        }
        let Self { utxo_source_iterator, priority_utxo_entry_filter, reserved, .. } = self;
        utxo_source_iterator
            .by_ref()
            .find(|entry| !priority_utxo_entry_filter.contains(entry.id_as_ref()) && try_reserve(utxo_context, reserved, entry))
    }
}

fn try_reserve(utxo_context: Option<&UtxoContext>, reserved: &mut AHashSet<UtxoEntryId>, entry: &UtxoEntryReference) -> bool {
    match utxo_context.map(|utxo_context| utxo_context.try_reserve_entry(entry.id_as_ref())) {
        Some(Reservation::Reserved) => {
            reserved.insert(entry.id());
            true
        }
        Some(Reservation::Unavailable) => false,
        Some(Reservation::Untracked) | None => true,
    }
}

struct Inner {
    // signer used by `PendingTransaction::try_sign()`
    signer: Option<Arc<dyn Signer>>,
    mass_calculator: MassCalculator,
    network_id: NetworkId,
    network_params: NetworkParams,
    // Utxo Context
    source_utxo_context: Option<UtxoContext>,
    // Utxo Context receiving the final payment (transfers between contexts)
    destination_utxo_context: Option<UtxoContext>,
    fee_rate: Option<f64>,
    // typically a number of keys required to sign the transaction
    sig_op_count: u8,
    // number of minimum signatures required to sign the transaction
    minimum_signatures: u16,
    // change address
    change_address: Address,
    change_script_public_key: ScriptPublicKey,
    // compute mass of a standard change output
    standard_change_output_compute_mass: u64,
    // signature mass added to every input
    signature_mass_per_input: u64,
    // transaction amount (`None` results in consumption of all available UTXOs)
    // `None` is used for sweep transactions
    final_transaction_amount: Option<u64>,
    // applies only to the final transaction
    final_transaction_priority_fee: Fees,
    // issued only in the final transaction
    final_transaction_outputs: Vec<TransactionOutput>,
    // compute mass of the final transaction outputs
    final_transaction_outputs_compute_mass: u64,
    // final transaction payload
    final_transaction_payload: Vec<u8>,
    final_transaction_payload_mass: u64,
    // estimation mode: entries are not reserved
    dry_run: AtomicBool,
    // execution context
    context: Mutex<Context>,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("network_id", &self.network_id)
            .field("source_utxo_context", &self.source_utxo_context.as_ref().map(|context| context.id()))
            .field("destination_utxo_context", &self.destination_utxo_context.as_ref().map(|context| context.id()))
            .field("fee_rate", &self.fee_rate)
            .field("sig_op_count", &self.sig_op_count)
            .field("minimum_signatures", &self.minimum_signatures)
            .field("change_address", &self.change_address)
            .field("final_transaction_amount", &self.final_transaction_amount)
            .field("final_transaction_priority_fee", &self.final_transaction_priority_fee)
            .field("final_transaction_outputs", &self.final_transaction_outputs)
            .field("final_transaction_payload", &self.final_transaction_payload)
            .finish()
    }
}

/// Entries accumulated for the transaction currently being built.
#[derive(Default)]
struct Data {
    inputs: Vec<TransactionInput>,
    utxo_entries: Vec<UtxoEntryReference>,
    addresses: AHashSet<Address>,
    aggregate_input_value: u64,
    // compute mass of all inputs, including signatures
    inputs_compute_mass: u64,
}

impl Data {
    fn push(&mut self, utxo_entry: UtxoEntryReference, input: TransactionInput, input_compute_mass: u64) {
        self.aggregate_input_value += utxo_entry.amount();
        self.inputs_compute_mass += input_compute_mass;
        if let Some(address) = utxo_entry.address() {
            self.addresses.insert(address.clone());
        }
        self.inputs.push(input);
        self.utxo_entries.push(utxo_entry);
    }

    fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    fn len(&self) -> usize {
        self.inputs.len()
    }
}

/// Outputs and mass of a transaction whose network fee covers its mass.
struct Converged {
    network_fee: u64,
    outputs: Vec<TransactionOutput>,
    storage_mass: u64,
    mass: u64,
}

/// Transaction ready to be emitted.
struct Draft {
    outputs: Vec<TransactionOutput>,
    fees: u64,
    mass: u64,
    payment_value: Option<u64>,
    change_output_index: Option<usize>,
    change_output_value: u64,
    payload: Vec<u8>,
    kind: PendingTransactionKind,
}

/// Outcome of an attempt to finalize the payment with the current inputs.
enum Finalization {
    // inputs do not cover the payment yet
    Insufficient,
    // the change output pushes the storage mass over the limit,
    // additional inputs lower it
    StorageMassExceeded,
    // the final transaction exceeds the mass limit
    MassExceeded { storage_mass: u64 },
    Ready(Draft),
}

/// Transaction generator
#[derive(Clone)]
pub struct Generator {
    inner: Arc<Inner>,
}

impl Generator {
    pub fn try_new(settings: GeneratorSettings, signer: Option<Arc<dyn Signer>>) -> Result<Self> {
        let GeneratorSettings {
            network_id,
            utxo_iterator,
            priority_utxo_entries,
            source_utxo_context,
            sig_op_count,
            minimum_signatures,
            change_address,
            fee_rate,
            final_transaction_priority_fee,
            final_transaction_destination,
            final_transaction_payload,
            destination_utxo_context,
        } = settings;

        let network_params = match source_utxo_context.as_ref() {
            Some(utxo_context) => utxo_context.processor().network_params()?,
            None => NetworkParams::from(network_id),
        };
        let mass_calculator = MassCalculator::new(&Params::from(network_id), &network_params);

        let (final_transaction_outputs, final_transaction_amount) = match final_transaction_destination {
            PaymentDestination::Change => {
                if !final_transaction_priority_fee.is_none() {
                    return Err(Error::GeneratorFeesInSweepTransaction);
                }
                (vec![], None)
            }
            PaymentDestination::PaymentOutputs(outputs) => {
                if outputs.is_empty() {
                    return Err(Error::GeneratorNoOutputs);
                }
                if outputs.iter().any(|output| mass_calculator.is_dust(output.amount)) {
                    return Err(Error::GeneratorPaymentOutputIsDust);
                }
                if final_transaction_priority_fee.is_receiver_pays() && outputs.len() != 1 {
                    return Err(Error::GeneratorIncludeFeesRequiresOneOutput);
                }
                let amount = outputs.iter().try_fold(0u64, |total, output| total.checked_add(output.amount));
                let amount = amount.ok_or_else(|| Error::InvalidAmount("payment outputs exceed the maximum amount".to_string()))?;
                (Vec::<TransactionOutput>::from(&outputs), Some(amount))
            }
        };

        let change_script_public_key = pay_to_address_script(&change_address);
        let standard_change_output_compute_mass =
            mass_calculator.calc_compute_mass_for_output(&TransactionOutput::new(0, change_script_public_key.clone()));
        let signature_mass_per_input = mass_calculator.calc_compute_mass_for_signature(minimum_signatures);
        let final_transaction_outputs_compute_mass = mass_calculator.calc_compute_mass_for_outputs(&final_transaction_outputs);
        let final_transaction_payload = final_transaction_payload.unwrap_or_default();
        let final_transaction_payload_mass = mass_calculator.calc_compute_mass_for_payload(final_transaction_payload.len());

        // reject transactions whose outputs and payload leave too little room for inputs
        if standard_change_output_compute_mass + final_transaction_outputs_compute_mass + final_transaction_payload_mass
            > mass_calculator.maximum_standard_transaction_mass() / 3 * 2
        {
            return Err(Error::GeneratorTransactionIsTooHeavy);
        }

        let priority_utxo_entries = priority_utxo_entries.unwrap_or_default();
        let priority_utxo_entry_filter = priority_utxo_entries.iter().map(|entry| entry.id()).collect();

        let context = Mutex::new(Context {
            utxo_source_iterator: utxo_iterator,
            priority_utxo_entries: priority_utxo_entries.into(),
            priority_utxo_entry_filter,
            utxo_stash: VecDeque::default(),
            reserved: AHashSet::default(),
            aggregated_utxos: 0,
            aggregate_fees: 0,
            aggregate_mass: 0,
            number_of_generated_transactions: 0,
            final_transaction_id: None,
            is_done: false,
        });

        let inner = Inner {
            signer,
            mass_calculator,
            network_id,
            network_params,
            source_utxo_context,
            destination_utxo_context,
            fee_rate,
            sig_op_count,
            minimum_signatures,
            change_address,
            change_script_public_key,
            standard_change_output_compute_mass,
            signature_mass_per_input,
            final_transaction_amount,
            final_transaction_priority_fee,
            final_transaction_outputs,
            final_transaction_outputs_compute_mass,
            final_transaction_payload,
            final_transaction_payload_mass,
            dry_run: AtomicBool::new(false),
            context,
        };

        Ok(Self { inner: Arc::new(inner) })
    }

    /// Mutable context used by the generator to track state
    fn context(&self) -> MutexGuard<'_, Context> {
        self.inner.context.lock().unwrap()
    }

    /// Returns the underlying instance of the [`Signer`]
    pub(crate) fn signer(&self) -> &Option<Arc<dyn Signer>> {
        &self.inner.signer
    }

    /// The underlying [`UtxoContext`] (if available).
    pub fn source_utxo_context(&self) -> &Option<UtxoContext> {
        &self.inner.source_utxo_context
    }

    /// Destination [`UtxoContext`] receiving the final payment
    /// when transferring funds between contexts.
    pub fn destination_utxo_context(&self) -> &Option<UtxoContext> {
        &self.inner.destination_utxo_context
    }

    pub fn network_id(&self) -> NetworkId {
        self.inner.network_id
    }

    pub fn network_params(&self) -> &NetworkParams {
        &self.inner.network_params
    }

    pub fn mass_calculator(&self) -> &MassCalculator {
        &self.inner.mass_calculator
    }

    pub fn change_address(&self) -> &Address {
        &self.inner.change_address
    }

    pub fn sig_op_count(&self) -> u8 {
        self.inner.sig_op_count
    }

    pub fn minimum_signatures(&self) -> u16 {
        self.inner.minimum_signatures
    }

    pub fn fee_rate(&self) -> Option<f64> {
        self.inner.fee_rate
    }

    /// The total amount of fees in SOMPI consumed during the transaction generation process.
    pub fn aggregate_fees(&self) -> u64 {
        self.context().aggregate_fees
    }

    /// The total mass of all transactions generated so far.
    pub fn aggregate_mass(&self) -> u64 {
        self.context().aggregate_mass
    }

    /// The total number of UTXOs consumed during the transaction generation process.
    pub fn aggregate_utxos(&self) -> usize {
        self.context().aggregated_utxos
    }

    /// Returns the final transaction id if the generator has finished successfully.
    pub fn final_transaction_id(&self) -> Option<TransactionId> {
        self.context().final_transaction_id
    }

    pub fn is_done(&self) -> bool {
        self.context().is_done
    }

    /// Stops the generation. Entries selected for transactions that have
    /// not been produced are released. Transactions produced so far keep
    /// their entries until each of them is submitted or released.
    pub fn abort(&self) -> Result<()> {
        let mut context = self.context();
        context.is_done = true;
        self.release_unused(&mut context, Data::default())
    }

    /// Context in which selected entries are reserved, `None` for dry runs.
    fn reservation_context(&self) -> Option<&UtxoContext> {
        if self.inner.dry_run.load(Ordering::SeqCst) {
            None
        } else {
            self.inner.source_utxo_context.as_ref()
        }
    }

    fn release_unused(&self, context: &mut Context, data: Data) -> Result<()> {
        let reserved = std::mem::take(&mut context.reserved);
        let unused = data
            .utxo_entries
            .into_iter()
            .chain(context.utxo_stash.drain(..))
            // batch outputs are reserved by the context once the batch is submitted
            .filter(|entry| reserved.contains(entry.id_as_ref()) || entry.is_unaccepted())
            .collect::<Vec<_>>();
        match self.reservation_context() {
            Some(utxo_context) if !unused.is_empty() => utxo_context.release(&unused),
            _ => Ok(()),
        }
    }

    /// Returns an async Stream causes the [`Generator`] to produce
    /// transaction for each stream item request. NOTE: transactions
    /// are generated only when each stream item is polled.
    pub fn stream(&self) -> impl Stream<Item = Result<PendingTransaction>> {
        Box::pin(PendingTransactionStream::new(self))
    }

    /// Returns an iterator that causes the [`Generator`] to produce
    /// transaction for each iterator poll request. NOTE: transactions
    /// are generated only when the returned iterator is iterated.
    pub fn iter(&self) -> impl Iterator<Item = Result<PendingTransaction>> {
        PendingTransactionIterator::new(self)
    }

    /// Runs the generation to completion without reserving any entries
    /// and returns the resulting [`GeneratorSummary`]. The generator is
    /// consumed by the estimation and can not be used to produce
    /// transactions afterwards.
    pub fn estimate(&self) -> Result<GeneratorSummary> {
        self.inner.dry_run.store(true, Ordering::SeqCst);
        while self.generate_transaction()?.is_some() {}
        Ok(self.summary())
    }

    /// Generates a single transaction by draining the supplied UTXO iterator.
    /// This function is used by the by the available async Stream and Iterator
    /// implementations to generate a stream of transactions.
    ///
    /// This function returns `None` once the final transaction has been
    /// produced or if a sweep has nothing to compound. Errors are terminal:
    /// the generator is done once an error has been returned.
    pub fn generate_transaction(&self) -> Result<Option<PendingTransaction>> {
        let mut context = self.context();

        if context.is_done {
            return Ok(None);
        }

        let mut data = Data::default();
        let result = self.generate_transaction_impl(&mut context, &mut data);
        if result.is_err() {
            context.is_done = true;
        }
        if context.is_done {
            let released = self.release_unused(&mut context, data);
            let pending = result?;
            released?;
            return Ok(pending);
        }
        result
    }

    fn generate_transaction_impl(&self, context: &mut Context, data: &mut Data) -> Result<Option<PendingTransaction>> {
        let calc = &self.inner.mass_calculator;
        let maximum_mass = calc.maximum_standard_transaction_mass();
        let compound_mass = self.inner.network_params.additional_compound_transaction_mass();
        let base_mass = calc.blank_transaction_compute_mass() + self.inner.standard_change_output_compute_mass + compound_mass;

        // set while the payment is covered but its change output is too heavy
        let mut storage_mass_exceeded = false;

        loop {
            let Some(utxo_entry) = context.next_utxo_entry(self.reservation_context()) else {
                return match self.inner.final_transaction_amount {
                    None => self.finish_sweep(context, data),
                    Some(_) if storage_mass_exceeded => Err(Error::MassExceeded),
                    Some(final_transaction_amount) => {
                        Err(Error::InsufficientFunds { additional_needed: self.additional_needed(data, final_transaction_amount), origin: "final" })
                    }
                };
            };

            let input = TransactionInput::new(utxo_entry.id(), vec![], 0, self.inner.sig_op_count);
            let input_compute_mass = calc.calc_compute_mass_for_input(&input) + self.inner.signature_mass_per_input;

            // maximum mass reached, require additional transaction
            if base_mass + data.inputs_compute_mass + input_compute_mass > maximum_mass {
                if data.is_empty() {
                    return Err(Error::MassExceeded);
                }
                context.utxo_stash.push_front(utxo_entry);
                return self.generate_batch(context, std::mem::take(data)).map(Some);
            }

            data.push(utxo_entry, input, input_compute_mass);

            if let Some(final_transaction_amount) = self.inner.final_transaction_amount {
                match self.try_finalize(data, final_transaction_amount)? {
                    Finalization::Insufficient => continue,
                    Finalization::StorageMassExceeded => {
                        storage_mass_exceeded = true;
                        continue;
                    }
                    Finalization::Ready(draft) => return self.emit(context, std::mem::take(data), draft).map(Some),
                    // compound the inputs and retry with the batch output
                    Finalization::MassExceeded { storage_mass } if storage_mass <= maximum_mass && data.len() > 1 => {
                        return self.generate_batch(context, std::mem::take(data)).map(Some);
                    }
                    Finalization::MassExceeded { .. } => return Err(Error::MassExceeded),
                }
            }
        }
    }

    /// Amount missing for the payment to be covered by the entries
    /// accumulated so far.
    fn additional_needed(&self, data: &Data, final_transaction_amount: u64) -> u64 {
        let calc = &self.inner.mass_calculator;
        let required = match self.inner.final_transaction_priority_fee {
            Fees::ReceiverPays(_) => final_transaction_amount,
            fees => {
                let compute_mass = calc.blank_transaction_compute_mass()
                    + data.inputs_compute_mass
                    + self.inner.final_transaction_outputs_compute_mass
                    + self.inner.final_transaction_payload_mass;
                let network_fee = calc.calc_fee_for_mass(compute_mass, self.inner.fee_rate);
                final_transaction_amount.saturating_add(network_fee).saturating_add(fees.priority_fee())
            }
        };
        required.saturating_sub(data.aggregate_input_value).max(1)
    }

    /// Increases the network fee until it covers the overall mass of the
    /// transaction built by `build_outputs`. `build_outputs` receives the
    /// network fee and returns `None` if the transaction shape can not
    /// carry that fee.
    fn converge<F>(&self, utxo_entries: &[UtxoEntryReference], compute_mass: u64, build_outputs: F) -> Result<Option<Converged>>
    where
        F: Fn(u64) -> Result<Option<Vec<TransactionOutput>>>,
    {
        let calc = &self.inner.mass_calculator;
        let mut network_fee = calc.calc_fee_for_mass(compute_mass, self.inner.fee_rate);
        for _ in 0..MAXIMUM_FEE_CONVERGENCE_ITERATIONS {
            let Some(outputs) = build_outputs(network_fee)? else {
                return Ok(None);
            };
            let storage_mass = calc
                .calc_storage_mass_for_transaction_parts(utxo_entries, &outputs)
                .ok_or_else(|| Error::InvalidTransactionShape("storage mass is incomputable".to_string()))?;
            let mass = calc.combine_mass(compute_mass, storage_mass);
            let required_fee = calc.calc_fee_for_mass(mass, self.inner.fee_rate);
            if required_fee <= network_fee {
                return Ok(Some(Converged { network_fee, outputs, storage_mass, mass }));
            }
            network_fee = required_fee;
        }

        log_trace!("generator: fees did not converge for a transaction with {} inputs", utxo_entries.len());
        Ok(None)
    }

    fn change_output(&self, value: u64) -> TransactionOutput {
        TransactionOutput::new(value, self.inner.change_script_public_key.clone())
    }

    fn try_finalize(&self, data: &Data, final_transaction_amount: u64) -> Result<Finalization> {
        match self.inner.final_transaction_priority_fee {
            Fees::ReceiverPays(priority_fee) => self.try_finalize_receiver_pays(data, final_transaction_amount, priority_fee),
            fees => self.try_finalize_sender_pays(data, final_transaction_amount, fees.priority_fee()),
        }
    }

    fn final_compute_mass(&self, data: &Data) -> u64 {
        let calc = &self.inner.mass_calculator;
        calc.blank_transaction_compute_mass()
            + data.inputs_compute_mass
            + self.inner.final_transaction_outputs_compute_mass
            + self.inner.final_transaction_payload_mass
    }

    fn try_finalize_sender_pays(&self, data: &Data, final_transaction_amount: u64, priority_fee: u64) -> Result<Finalization> {
        let calc = &self.inner.mass_calculator;
        let maximum_mass = calc.maximum_standard_transaction_mass();
        let aggregate_input_value = data.aggregate_input_value;
        let compute_mass = self.final_compute_mass(data);

        if aggregate_input_value < final_transaction_amount + priority_fee {
            return Ok(Finalization::Insufficient);
        }

        let with_change = self.converge(&data.utxo_entries, compute_mass + self.inner.standard_change_output_compute_mass, |network_fee| {
            let total = final_transaction_amount + network_fee + priority_fee;
            if aggregate_input_value <= total || calc.is_dust(aggregate_input_value - total) {
                return Ok(None);
            }
            let mut outputs = self.inner.final_transaction_outputs.clone();
            outputs.push(self.change_output(aggregate_input_value - total));
            Ok(Some(outputs))
        })?;

        let with_change_compute_mass = compute_mass + self.inner.standard_change_output_compute_mass;
        if let Some(converged) = with_change.as_ref().filter(|converged| converged.mass <= maximum_mass) {
            let fees = converged.network_fee + priority_fee;
            let change_output_index = converged.outputs.len() - 1;
            return Ok(Finalization::Ready(Draft {
                change_output_value: aggregate_input_value - final_transaction_amount - fees,
                outputs: converged.outputs.clone(),
                fees,
                mass: converged.mass,
                payment_value: Some(final_transaction_amount),
                change_output_index: Some(change_output_index),
                payload: self.inner.final_transaction_payload.clone(),
                kind: PendingTransactionKind::Final,
            }));
        }

        // only a dust remainder may be absorbed by the fees
        let without_change = self.converge(&data.utxo_entries, compute_mass, |network_fee| {
            let total = final_transaction_amount + network_fee + priority_fee;
            if aggregate_input_value < total || !calc.is_dust(aggregate_input_value - total) {
                return Ok(None);
            }
            Ok(Some(self.inner.final_transaction_outputs.clone()))
        })?;

        match (without_change, with_change) {
            (Some(converged), _) if converged.mass <= maximum_mass => Ok(Finalization::Ready(Draft {
                outputs: converged.outputs,
                fees: aggregate_input_value - final_transaction_amount,
                mass: converged.mass,
                payment_value: Some(final_transaction_amount),
                change_output_index: None,
                change_output_value: 0,
                payload: self.inner.final_transaction_payload.clone(),
                kind: PendingTransactionKind::Final,
            })),
            (Some(without_change), Some(with_change)) => {
                Ok(Finalization::MassExceeded { storage_mass: without_change.storage_mass.min(with_change.storage_mass) })
            }
            (None, Some(_)) if with_change_compute_mass <= maximum_mass => Ok(Finalization::StorageMassExceeded),
            (Some(converged), None) | (None, Some(converged)) => Ok(Finalization::MassExceeded { storage_mass: converged.storage_mass }),
            (None, None) => Ok(Finalization::Insufficient),
        }
    }

    fn try_finalize_receiver_pays(&self, data: &Data, final_transaction_amount: u64, priority_fee: u64) -> Result<Finalization> {
        let calc = &self.inner.mass_calculator;
        let aggregate_input_value = data.aggregate_input_value;

        if aggregate_input_value < final_transaction_amount {
            return Ok(Finalization::Insufficient);
        }

        let change = aggregate_input_value - final_transaction_amount;
        let has_change = change > 0 && !calc.is_dust(change);
        let mut compute_mass = self.final_compute_mass(data);
        if has_change {
            compute_mass += self.inner.standard_change_output_compute_mass;
        }

        let payment_output = self.inner.final_transaction_outputs.first().ok_or(Error::GeneratorNoOutputs)?;
        let converged = self.converge(&data.utxo_entries, compute_mass, |network_fee| {
            let fees = network_fee + priority_fee;
            if final_transaction_amount <= fees || calc.is_dust(final_transaction_amount - fees) {
                return Err(Error::GeneratorPaymentOutputIsDust);
            }
            let mut outputs = vec![TransactionOutput::new(final_transaction_amount - fees, payment_output.script_public_key.clone())];
            if has_change {
                outputs.push(self.change_output(change));
            }
            Ok(Some(outputs))
        })?;

        let Some(converged) = converged else {
            return Ok(Finalization::Insufficient);
        };

        if converged.mass > calc.maximum_standard_transaction_mass() {
            if has_change && compute_mass <= calc.maximum_standard_transaction_mass() {
                return Ok(Finalization::StorageMassExceeded);
            }
            return Ok(Finalization::MassExceeded { storage_mass: converged.storage_mass });
        }

        let payment_value = final_transaction_amount - converged.network_fee - priority_fee;
        let (change_output_index, change_output_value) = if has_change { (Some(1), change) } else { (None, 0) };

        Ok(Finalization::Ready(Draft {
            outputs: converged.outputs,
            fees: aggregate_input_value - payment_value - change_output_value,
            mass: converged.mass,
            payment_value: Some(payment_value),
            change_output_index,
            change_output_value,
            payload: self.inner.final_transaction_payload.clone(),
            kind: PendingTransactionKind::Final,
        }))
    }

    /// Emits a transaction compounding all accumulated entries into a
    /// single change output. The output is stashed as the first input
    /// candidate of the next transaction.
    fn generate_batch(&self, context: &mut Context, data: Data) -> Result<PendingTransaction> {
        let calc = &self.inner.mass_calculator;
        let compute_mass =
            calc.blank_transaction_compute_mass() + data.inputs_compute_mass + self.inner.standard_change_output_compute_mass;
        let compound_mass = self.inner.network_params.additional_compound_transaction_mass();
        let aggregate_input_value = data.aggregate_input_value;

        let converged = self.converge(&data.utxo_entries, compute_mass + compound_mass, |network_fee| {
            if aggregate_input_value <= network_fee || calc.is_dust(aggregate_input_value - network_fee) {
                return Ok(None);
            }
            Ok(Some(vec![self.change_output(aggregate_input_value - network_fee)]))
        })?;

        let Some(Converged { network_fee, outputs, storage_mass, .. }) = converged else {
            let network_fee = calc.calc_fee_for_mass(compute_mass + compound_mass, self.inner.fee_rate);
            let additional_needed = (network_fee + 1).saturating_sub(aggregate_input_value).max(1);
            return Err(Error::InsufficientFunds { additional_needed, origin: "batch" });
        };

        let draft = Draft {
            change_output_value: aggregate_input_value - network_fee,
            outputs,
            fees: network_fee,
            mass: calc.combine_mass(compute_mass, storage_mass),
            payment_value: None,
            change_output_index: Some(0),
            payload: vec![],
            kind: PendingTransactionKind::Batch,
        };

        let pending = self.emit(context, data, draft)?;
        if let Some(change_utxo_entry) = pending.change_utxo_entry() {
            context.utxo_stash.push_front(change_utxo_entry);
        }

        Ok(pending)
    }

    /// Completes a sweep once the source is depleted: compounds the
    /// remaining entries into the change address. A single entry that
    /// was not produced by a preceding batch is left untouched.
    fn finish_sweep(&self, context: &mut Context, data: &mut Data) -> Result<Option<PendingTransaction>> {
        if data.is_empty() || (data.len() == 1 && context.number_of_generated_transactions == 0) {
            context.is_done = true;
            return Ok(None);
        }

        let calc = &self.inner.mass_calculator;
        let compute_mass = calc.blank_transaction_compute_mass()
            + data.inputs_compute_mass
            + self.inner.standard_change_output_compute_mass
            + self.inner.final_transaction_payload_mass;
        let aggregate_input_value = data.aggregate_input_value;

        let converged = self.converge(&data.utxo_entries, compute_mass, |network_fee| {
            if aggregate_input_value <= network_fee || calc.is_dust(aggregate_input_value - network_fee) {
                return Ok(None);
            }
            Ok(Some(vec![self.change_output(aggregate_input_value - network_fee)]))
        })?;

        let Some(converged) = converged else {
            context.is_done = true;
            return Ok(None);
        };

        if converged.mass > calc.maximum_standard_transaction_mass() {
            return Err(Error::MassExceeded);
        }

        let draft = Draft {
            change_output_value: aggregate_input_value - converged.network_fee,
            outputs: converged.outputs,
            fees: converged.network_fee,
            mass: converged.mass,
            payment_value: None,
            change_output_index: Some(0),
            payload: self.inner.final_transaction_payload.clone(),
            kind: PendingTransactionKind::Final,
        };

        self.emit(context, std::mem::take(data), draft).map(Some)
    }

    fn emit(&self, context: &mut Context, data: Data, draft: Draft) -> Result<PendingTransaction> {
        if let Some(utxo_context) = self.reservation_context() {
            let lost = data.utxo_entries.iter().find(|entry| {
                context.reserved.contains(entry.id_as_ref()) && utxo_context.entry_state(entry.id_as_ref()) != Some(UtxoEntryState::Reserved)
            });
            if let Some(entry) = lost {
                return Err(Error::GeneratorReservationLost(entry.id().to_string()));
            }
        }

        let Data { inputs, utxo_entries, addresses, aggregate_input_value, .. } = data;
        let Draft { outputs, fees, mass, payment_value, change_output_index, change_output_value, payload, kind } = draft;

        let aggregate_output_value = outputs.iter().map(|output| output.value).sum::<u64>();
        let transaction = Transaction::new(TX_VERSION, inputs, outputs, 0, SUBNETWORK_ID_NATIVE, 0, payload);

        let pending = PendingTransaction::try_new(
            self,
            transaction,
            utxo_entries,
            addresses.into_iter().collect(),
            payment_value,
            change_output_index,
            change_output_value,
            aggregate_input_value,
            aggregate_output_value,
            self.inner.minimum_signatures,
            mass,
            fees,
            kind,
        )?;

        context.aggregated_utxos += pending.utxo_entries().len();
        context.aggregate_fees += fees;
        context.aggregate_mass += mass;
        context.number_of_generated_transactions += 1;

        // reservations are now held by the pending transaction
        for entry in pending.utxo_entries() {
            context.reserved.remove(entry.id_as_ref());
        }

        if kind.is_final() {
            context.final_transaction_id = Some(pending.id());
            context.is_done = true;
        }

        Ok(pending)
    }

    /// Produces [`GeneratorSummary`] for the current state of the generator.
    /// This method is useful for creation of transaction estimations.
    pub fn summary(&self) -> GeneratorSummary {
        let context = self.context();

        GeneratorSummary {
            network_id: self.inner.network_id,
            aggregated_utxos: context.aggregated_utxos,
            aggregated_fees: context.aggregate_fees,
            aggregated_mass: context.aggregate_mass,
            number_of_generated_transactions: context.number_of_generated_transactions,
            final_transaction_amount: self.inner.final_transaction_amount,
            final_transaction_id: context.final_transaction_id,
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}
