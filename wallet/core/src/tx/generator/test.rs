#![allow(clippy::inconsistent_digit_grouping)]

use crate::imports::*;
use crate::tx::{Fees, MassCalculator, PaymentDestination, PaymentOutput, PaymentOutputs};
use crate::utils::kaspa_to_sompi;
use kaspa_addresses::Version;
use kaspa_consensus_core::config::params::Params;
use kaspa_consensus_core::tx::{pay_to_address_script, SignableTransaction, TransactionInput, TransactionOutpoint};
use kaspa_hashes::Hash;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::*;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Sompi(pub u64);

#[derive(Clone, Copy)]
pub(crate) struct Kaspa(pub f64);

impl Debug for Kaspa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sompi: Sompi = self.into();
        write!(f, "{}", sompi.0)
    }
}

impl From<Kaspa> for Sompi {
    fn from(kaspa: Kaspa) -> Self {
        Sompi(kaspa_to_sompi(kaspa.0))
    }
}

impl From<&Kaspa> for Sompi {
    fn from(kaspa: &Kaspa) -> Self {
        Sompi(kaspa_to_sompi(kaspa.0))
    }
}

#[derive(Debug)]
enum FeesExpected {
    None,
    Sender(u64),
    Receiver(u64),
}

impl FeesExpected {
    fn sender<T: Into<Sompi>>(v: T) -> Self {
        let sompi: Sompi = v.into();
        FeesExpected::Sender(sompi.0)
    }
    fn receiver<T: Into<Sompi>>(v: T) -> Self {
        let sompi: Sompi = v.into();
        FeesExpected::Receiver(sompi.0)
    }
}

trait PendingTransactionExtension {
    fn expect<SOMPI>(self, expected: &Expected<SOMPI>) -> Self
    where
        SOMPI: Into<Sompi> + Debug + Copy;
    fn accumulate(self, accumulator: &mut Accumulator) -> Self;
}

impl PendingTransactionExtension for PendingTransaction {
    fn expect<SOMPI>(self, expected: &Expected<SOMPI>) -> Self
    where
        SOMPI: Into<Sompi> + Debug + Copy,
    {
        expect(&self, expected);
        self
    }
    fn accumulate(self, accumulator: &mut Accumulator) -> Self {
        accumulator.list.push(self.clone());
        self
    }
}

trait GeneratorSummaryExtension {
    fn check(self, accumulator: &Accumulator) -> Self;
}

impl GeneratorSummaryExtension for GeneratorSummary {
    fn check(self, accumulator: &Accumulator) -> Self {
        assert_eq!(self.number_of_generated_transactions, accumulator.list.len(), "number of generated transactions");
        assert_eq!(
            self.aggregated_utxos,
            accumulator.list.iter().map(|pt| pt.utxo_entries().len()).sum::<usize>(),
            "number of utxo entries"
        );
        let aggregated_fees = accumulator.list.iter().map(|pt| pt.fees()).sum::<u64>();
        assert_eq!(self.aggregated_fees, aggregated_fees, "aggregated fees");
        let aggregated_mass = accumulator.list.iter().map(|pt| pt.mass()).sum::<u64>();
        assert_eq!(self.aggregated_mass, aggregated_mass, "aggregated mass");
        assert_eq!(self.final_transaction_id, accumulator.list.last().map(|pt| pt.id()), "final transaction id");
        self
    }
}

trait FeesExtension {
    fn sender<T: Into<Sompi>>(v: T) -> Self;
    fn receiver<T: Into<Sompi>>(v: T) -> Self;
}

impl FeesExtension for Fees {
    fn sender<T: Into<Sompi>>(v: T) -> Self {
        let sompi: Sompi = v.into();
        Fees::SenderPays(sompi.0)
    }
    fn receiver<T: Into<Sompi>>(v: T) -> Self {
        let sompi: Sompi = v.into();
        Fees::ReceiverPays(sompi.0)
    }
}

trait GeneratorExtension {
    fn harness(self) -> Rc<Harness>;
}

impl GeneratorExtension for Generator {
    fn harness(self) -> Rc<Harness> {
        Harness::new(self)
    }
}

pub(crate) fn test_network_id() -> NetworkId {
    NetworkId::with_suffix(NetworkType::Testnet, 10)
}

fn mass_calculator(network_id: NetworkId) -> MassCalculator {
    MassCalculator::new(&Params::from(network_id), &NetworkParams::from(network_id))
}

/// Number of standard inputs that fit into a batch transaction.
pub(crate) fn max_inputs_per_transaction(network_id: NetworkId) -> usize {
    let calc = mass_calculator(network_id);
    let change_output = kaspa_consensus_core::tx::TransactionOutput::new(0, pay_to_address_script(&change_address(network_id.into())));
    let input = TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(1), 0), vec![], 0, 1);
    let input_mass = calc.calc_compute_mass_for_input(&input) + calc.calc_compute_mass_for_signature(1);
    let base_mass = calc.blank_transaction_compute_mass()
        + calc.calc_compute_mass_for_output(&change_output)
        + NetworkParams::from(network_id).additional_compound_transaction_mass();
    ((calc.maximum_standard_transaction_mass() - base_mass) / input_mass) as usize
}

#[derive(Default)]
struct Accumulator {
    list: Vec<PendingTransaction>,
}

#[derive(Debug)]
pub(crate) struct Expected<SOMPI: Into<Sompi>> {
    is_final: bool,
    input_count: usize,
    aggregate_input_value: SOMPI,
    output_count: usize,
    priority_fees: FeesExpected,
}

fn expect<SOMPI>(pt: &PendingTransaction, expected: &Expected<SOMPI>)
where
    SOMPI: Into<Sompi> + Debug + Copy,
{
    let tx = pt.transaction();

    let aggregate_input_value = pt.utxo_entries().iter().map(|o| o.amount()).sum::<u64>();
    let aggregate_output_value = tx.outputs.iter().map(|o| o.value).sum::<u64>();
    assert_ne!(aggregate_input_value, aggregate_output_value, "aggregate input and output values can not be the same due to fees");
    assert_eq!(pt.aggregate_input_value(), aggregate_input_value, "pending transaction aggregate input value");
    assert_eq!(pt.aggregate_output_value(), aggregate_output_value, "pending transaction aggregate output value");
    assert_eq!(pt.is_final(), expected.is_final, "expected final transaction");

    let expected_aggregate_input_value: Sompi = expected.aggregate_input_value.into();
    assert_eq!(tx.inputs.len(), expected.input_count, "expected input count");
    assert_eq!(aggregate_input_value, expected_aggregate_input_value.0, "expected aggregate input value");
    assert_eq!(tx.outputs.len(), expected.output_count, "expected output count");

    let calc = pt.generator().mass_calculator();
    let calculated_mass = calc.calc_overall_mass_for_unsigned_transaction(&tx, pt.utxo_entries(), pt.minimum_signatures()).unwrap();
    assert_eq!(pt.mass(), calculated_mass, "pending transaction mass does not match calculated mass");
    assert!(pt.mass() <= calc.maximum_standard_transaction_mass(), "transaction mass exceeds the maximum standard transaction mass");

    if let Some(index) = pt.change_output_index() {
        assert_eq!(tx.outputs[index].value, pt.change_value(), "change output value");
    }

    let pt_fees = pt.fees();
    let calculated_fees = calc.calc_fee_for_mass(calculated_mass, None);

    let priority_fees = match expected.priority_fees {
        FeesExpected::Sender(priority_fees) | FeesExpected::Receiver(priority_fees) => priority_fees,
        FeesExpected::None => 0,
    };

    let total_fees_expected = priority_fees + calculated_fees;
    assert!(
        total_fees_expected <= pt_fees,
        "[{:?}] total fees expected: {} are greater than the PT fees: {}",
        expected.priority_fees,
        total_fees_expected,
        pt_fees
    );

    // a dust change output may have been consumed to fees
    let dust_disposal_fees = pt_fees - total_fees_expected;
    assert!(
        calc.is_dust(dust_disposal_fees),
        "[{:?}] pt fees: {pt_fees} expected fees: {total_fees_expected} difference: {dust_disposal_fees}",
        expected.priority_fees
    );

    assert_eq!(aggregate_input_value, aggregate_output_value + pt_fees, "aggregate input value vs total output value with fees");
}

pub(crate) struct Harness {
    generator: Generator,
    accumulator: RefCell<Accumulator>,
}

impl Harness {
    pub fn new(generator: Generator) -> Rc<Self> {
        Rc::new(Harness { generator, accumulator: RefCell::new(Accumulator::default()) })
    }

    pub fn fetch<SOMPI>(self: &Rc<Self>, expected: &Expected<SOMPI>) -> Rc<Self>
    where
        SOMPI: Into<Sompi> + Debug + Copy,
    {
        self.generator.generate_transaction().unwrap().unwrap().accumulate(&mut self.accumulator.borrow_mut()).expect(expected);
        self.clone()
    }

    pub fn drain<SOMPI>(self: &Rc<Self>, count: usize, expected: &Expected<SOMPI>) -> Rc<Self>
    where
        SOMPI: Into<Sompi> + Debug + Copy,
    {
        for _ in 0..count {
            self.generator.generate_transaction().unwrap().unwrap().accumulate(&mut self.accumulator.borrow_mut()).expect(expected);
        }
        self.clone()
    }

    pub fn finalize(self: Rc<Self>) -> GeneratorSummary {
        let pt = self.generator.generate_transaction().unwrap();
        assert!(pt.is_none(), "expected no more transactions");
        let summary = self.generator.summary();
        summary.check(&self.accumulator.borrow())
    }

    pub fn insufficient_funds(self: Rc<Self>) {
        match &self.generator.generate_transaction() {
            Ok(_pt) => {
                panic!("expected insufficient funds, instead received a transaction");
            }
            Err(err) => {
                assert!(matches!(&err, Error::InsufficientFunds { .. }), "expecting insufficient funds error, received: {:?}", err);
            }
        }
        assert!(self.generator.generate_transaction().unwrap().is_none(), "generator must be done after an error");
    }
}

pub(crate) fn change_address(network_type: NetworkType) -> Address {
    Address::new(network_type.into(), Version::PubKey, &[0xc4; 32])
}

pub(crate) fn output_address(network_type: NetworkType) -> Address {
    Address::new(network_type.into(), Version::PubKey, &[0x0a; 32])
}

/// A simulated mature entry owned by `address`. Entries with distinct
/// `index` values have distinct outpoints.
pub(crate) fn make_utxo_entry(address: &Address, index: u64, amount: u64, block_daa_score: u64) -> UtxoEntryReference {
    UtxoEntry {
        address: Some(address.clone()),
        outpoint: TransactionOutpoint::new(Hash::from_u64_word(index), 0),
        amount,
        script_public_key: pay_to_address_script(address),
        block_daa_score,
        is_coinbase: false,
    }
    .into()
}

pub(crate) fn make_utxo_entries(network_id: NetworkId, values: &[f64]) -> Vec<UtxoEntryReference> {
    let address = change_address(network_id.into());
    values.iter().enumerate().map(|(index, kaspa)| make_utxo_entry(&address, index as u64 + 1, kaspa_to_sompi(*kaspa), 0)).collect()
}

pub(crate) fn generator<T, F>(network_id: NetworkId, head: &[f64], tail: &[f64], fees: Fees, outputs: &[(F, T)]) -> Result<Generator>
where
    T: Into<Sompi> + Clone,
    F: FnOnce(NetworkType) -> Address + Clone,
{
    let outputs = outputs
        .iter()
        .map(|(address, amount)| {
            let sompi: Sompi = (*amount).clone().into();
            (address.clone()(network_id.into()), sompi.0)
        })
        .collect::<Vec<_>>();
    make_generator(network_id, head, tail, fees, change_address, PaymentOutputs::from(outputs.as_slice()).into())
}

pub(crate) fn make_generator<F>(
    network_id: NetworkId,
    head: &[f64],
    tail: &[f64],
    fees: Fees,
    change_address: F,
    final_transaction_destination: PaymentDestination,
) -> Result<Generator>
where
    F: FnOnce(NetworkType) -> Address,
{
    let mut values = head.to_vec();
    values.extend(tail);

    let utxo_entries = make_utxo_entries(network_id, &values);
    let utxo_iterator: UtxoSourceIterator = Box::new(utxo_entries.into_iter());
    let change_address = change_address(network_id.into());

    let settings = GeneratorSettings {
        network_id,
        utxo_iterator,
        priority_utxo_entries: None,
        source_utxo_context: None,
        sig_op_count: 1,
        minimum_signatures: 1,
        change_address,
        fee_rate: None,
        final_transaction_priority_fee: fees,
        final_transaction_destination,
        final_transaction_payload: None,
        destination_utxo_context: None,
    };

    Generator::try_new(settings, None)
}

#[test]
fn test_generator_empty_utxo_noop() -> Result<()> {
    let generator = make_generator(test_network_id(), &[], &[], Fees::None, change_address, PaymentDestination::Change).unwrap();
    let tx = generator.generate_transaction().unwrap();
    assert!(tx.is_none());
    assert!(generator.is_done());
    Ok(())
}

#[test]
fn test_generator_sweep_single_utxo_noop() -> Result<()> {
    let generator = make_generator(test_network_id(), &[10.0], &[], Fees::None, change_address, PaymentDestination::Change)
        .expect("single UTXO input: generator");
    let tx = generator.generate_transaction().unwrap();
    assert!(tx.is_none());
    Ok(())
}

#[test]
fn test_generator_sweep_two_utxos() -> Result<()> {
    let summary = make_generator(test_network_id(), &[10.0, 10.0], &[], Fees::None, change_address, PaymentDestination::Change)
        .expect("merge 2 UTXOs without fees: generator")
        .harness()
        .fetch(&Expected {
            is_final: true,
            input_count: 2,
            aggregate_input_value: Kaspa(20.0),
            output_count: 1,
            priority_fees: FeesExpected::None,
        })
        .finalize();
    assert_eq!(summary.final_transaction_amount, None);
    Ok(())
}

#[test]
fn test_generator_sweep_two_utxos_with_priority_fees_rejection() -> Result<()> {
    let generator =
        make_generator(test_network_id(), &[10.0, 10.0], &[], Fees::sender(Kaspa(5.0)), change_address, PaymentDestination::Change);
    match generator {
        Err(Error::GeneratorFeesInSweepTransaction) => {}
        _ => panic!("merge 2 UTXOs with fees must fail generator creation"),
    }
    Ok(())
}

#[test]
fn test_generator_no_outputs_rejection() -> Result<()> {
    let destination = PaymentDestination::PaymentOutputs(PaymentOutputs { outputs: vec![] });
    let generator = make_generator(test_network_id(), &[10.0], &[], Fees::sender(Kaspa(0.0)), change_address, destination);
    assert!(matches!(generator, Err(Error::GeneratorNoOutputs)));
    Ok(())
}

#[test]
fn test_generator_dust_output_rejection() -> Result<()> {
    let generator = generator(test_network_id(), &[10.0], &[], Fees::sender(Kaspa(0.0)), [(output_address, Sompi(100))].as_slice());
    assert!(matches!(generator, Err(Error::GeneratorPaymentOutputIsDust)));
    Ok(())
}

#[test]
fn test_generator_receiver_pays_requires_single_output() -> Result<()> {
    let generator = generator(
        test_network_id(),
        &[10.0; 4],
        &[],
        Fees::receiver(Kaspa(1.0)),
        [(output_address, Kaspa(5.0)), (output_address, Kaspa(5.0))].as_slice(),
    );
    assert!(matches!(generator, Err(Error::GeneratorIncludeFeesRequiresOneOutput)));
    Ok(())
}

#[test]
fn test_generator_heavy_payload_rejection() -> Result<()> {
    let network_id = test_network_id();
    let settings = GeneratorSettings::try_new_with_entries(
        network_id,
        make_utxo_entries(network_id, &[10.0; 2]),
        None,
        change_address(network_id.into()),
        1,
        1,
        PaymentOutput::new(output_address(network_id.into()), kaspa_to_sompi(1.0)).into(),
        None,
        Fees::SenderPays(0),
        Some(vec![0u8; 70_000]),
    )?;
    assert!(matches!(Generator::try_new(settings, None), Err(Error::GeneratorTransactionIsTooHeavy)));
    Ok(())
}

#[test]
fn test_generator_single_input_payment_with_change() -> Result<()> {
    let summary = generator(test_network_id(), &[100.0], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(10.0))].as_slice())
        .unwrap()
        .harness()
        .fetch(&Expected {
            is_final: true,
            input_count: 1,
            aggregate_input_value: Kaspa(100.0),
            output_count: 2,
            priority_fees: FeesExpected::sender(Kaspa(0.0)),
        })
        .finalize();

    assert_eq!(summary.number_of_generated_transactions, 1);
    assert_eq!(summary.final_transaction_amount, Some(kaspa_to_sompi(10.0)));
    Ok(())
}

#[test]
fn test_generator_inputs_2_outputs_2_fees_exclude() -> Result<()> {
    generator(
        test_network_id(),
        &[10.0; 2],
        &[],
        Fees::sender(Kaspa(5.0)),
        [(output_address, Kaspa(10.0)), (output_address, Kaspa(1.0))].as_slice(),
    )
    .unwrap()
    .harness()
    .fetch(&Expected {
        is_final: true,
        input_count: 2,
        aggregate_input_value: Kaspa(20.0),
        output_count: 3,
        priority_fees: FeesExpected::sender(Kaspa(5.0)),
    })
    .finalize();

    Ok(())
}

#[test]
fn test_generator_inputs_2_outputs_1_fees_include() -> Result<()> {
    let network_id = test_network_id();
    let generator = generator(network_id, &[10.0; 2], &[], Fees::receiver(Kaspa(1.0)), [(output_address, Kaspa(15.0))].as_slice())?;
    let pt = generator.generate_transaction()?.expect("final transaction");
    expect(
        &pt,
        &Expected {
            is_final: true,
            input_count: 2,
            aggregate_input_value: Kaspa(20.0),
            output_count: 2,
            priority_fees: FeesExpected::receiver(Kaspa(1.0)),
        },
    );

    // fees are deducted from the payment output, the change is untouched
    let tx = pt.transaction();
    assert_eq!(pt.change_value(), kaspa_to_sompi(5.0));
    assert_eq!(tx.outputs[0].value, kaspa_to_sompi(15.0) - pt.fees());
    assert_eq!(pt.payment_value(), Some(tx.outputs[0].value));
    assert!(generator.generate_transaction()?.is_none());
    Ok(())
}

#[test]
fn test_generator_inputs_100_outputs_1_fees_exclude_success() -> Result<()> {
    let network_id = test_network_id();
    let max_inputs = max_inputs_per_transaction(network_id);
    assert!(max_inputs < 99);

    let harness = generator(network_id, &[10.0; 100], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(990.0))].as_slice())
        .unwrap()
        .harness()
        .fetch(&Expected {
            is_final: false,
            input_count: max_inputs,
            aggregate_input_value: Kaspa(10.0 * max_inputs as f64),
            output_count: 1,
            priority_fees: FeesExpected::None,
        });

    let batch = harness.accumulator.borrow().list[0].clone();
    assert!(batch.is_batch());
    assert_eq!(batch.payment_value(), None);
    let batch_output_value = batch.transaction().outputs[0].value;

    // the batch output is the first input of the final transaction
    let summary = harness
        .fetch(&Expected {
            is_final: true,
            input_count: 100 - max_inputs + 1,
            aggregate_input_value: Sompi(batch_output_value + kaspa_to_sompi(10.0) * (100 - max_inputs) as u64),
            output_count: 2,
            priority_fees: FeesExpected::sender(Kaspa(0.0)),
        })
        .finalize();

    assert_eq!(summary.number_of_generated_transactions, 2);
    assert_eq!(summary.aggregated_utxos, 101);
    Ok(())
}

#[test]
fn test_generator_batch_output_chains_into_final_input() -> Result<()> {
    let network_id = test_network_id();
    let generator = generator(network_id, &[10.0; 100], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(990.0))].as_slice())?;

    let transactions = generator.iter().collect::<Result<Vec<_>>>()?;
    assert_eq!(transactions.len(), 2);
    let (batch, final_transaction) = (&transactions[0], &transactions[1]);
    assert!(batch.is_batch());
    assert!(final_transaction.is_final());

    let first_input = &final_transaction.transaction().inputs[0];
    assert_eq!(first_input.previous_outpoint, TransactionOutpoint::new(batch.id(), 0));
    assert_eq!(final_transaction.utxo_entries()[0].block_daa_score(), kaspa_consensus_core::constants::UNACCEPTED_DAA_SCORE);

    // every source entry is consumed exactly once
    let mut consumed = transactions
        .iter()
        .flat_map(|pt| pt.utxo_entries().iter().map(|entry| entry.id()))
        .filter(|id| id.transaction_id != batch.id())
        .collect::<Vec<_>>();
    consumed.sort();
    consumed.dedup();
    assert_eq!(consumed.len(), 100);
    Ok(())
}

#[test]
fn test_generator_inputs_100_outputs_1_fees_exclude_insufficient_funds() -> Result<()> {
    let network_id = test_network_id();
    let max_inputs = max_inputs_per_transaction(network_id);

    generator(network_id, &[10.0; 100], &[], Fees::sender(Kaspa(5.0)), [(output_address, Kaspa(1000.0))].as_slice())
        .unwrap()
        .harness()
        .fetch(&Expected {
            is_final: false,
            input_count: max_inputs,
            aggregate_input_value: Kaspa(10.0 * max_inputs as f64),
            output_count: 1,
            priority_fees: FeesExpected::None,
        })
        .insufficient_funds();

    Ok(())
}

#[test]
fn test_generator_insufficient_funds_reports_shortfall() -> Result<()> {
    let generator = generator(test_network_id(), &[1.0; 3], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(5.0))].as_slice())?;
    match generator.generate_transaction() {
        Err(Error::InsufficientFunds { additional_needed, origin }) => {
            assert_eq!(origin, "final");
            assert!(additional_needed > kaspa_to_sompi(2.0));
        }
        other => panic!("expected insufficient funds, received: {other:?}"),
    }
    Ok(())
}

/// Batches needed to spend `required` source entries: the first batch
/// compounds `max_inputs` entries, every following step carries the previous
/// batch output and `max_inputs - 1` entries.
fn expected_batch_count(required: usize, max_inputs: usize) -> usize {
    (required - 1).div_ceil(max_inputs - 1) - 1
}

#[test]
fn test_generator_inputs_500_batch_chain() -> Result<()> {
    let network_id = test_network_id();
    let max_inputs = max_inputs_per_transaction(network_id);
    let generator = generator(network_id, &[10.0; 500], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(4_000.0))].as_slice())?;

    let transactions = generator.iter().collect::<Result<Vec<_>>>()?;
    let (final_transaction, batches) = transactions.split_last().expect("transactions");
    // 400 entries only cover the payment without fees
    assert_eq!(batches.len(), expected_batch_count(401, max_inputs));
    assert!(batches.iter().all(|pt| pt.is_batch()));
    assert!(final_transaction.is_final());
    assert_eq!(final_transaction.payment_value(), Some(kaspa_to_sompi(4_000.0)));

    for (previous, next) in transactions.iter().zip(transactions.iter().skip(1)) {
        assert_eq!(next.transaction().inputs[0].previous_outpoint, TransactionOutpoint::new(previous.id(), 0));
    }
    for pt in transactions.iter() {
        let calc = pt.generator().mass_calculator();
        assert!(pt.mass() <= calc.maximum_standard_transaction_mass());
        assert!(pt.utxo_entries().len() <= max_inputs);
    }

    let sources = transactions
        .iter()
        .flat_map(|pt| pt.utxo_entries().iter())
        .filter(|entry| entry.block_daa_score() != kaspa_consensus_core::constants::UNACCEPTED_DAA_SCORE)
        .count();
    assert_eq!(sources, 401);
    Ok(())
}

#[test]
fn test_generator_selects_largest_entry_first() -> Result<()> {
    let network_id = test_network_id();
    let settings = GeneratorSettings::try_new_with_entries(
        network_id,
        make_utxo_entries(network_id, &[10.0, 20.0, 70.0]),
        None,
        change_address(network_id.into()),
        1,
        1,
        PaymentOutput::new(output_address(network_id.into()), kaspa_to_sompi(25.0)).into(),
        None,
        Fees::SenderPays(0),
        None,
    )?;
    let generator = Generator::try_new(settings, None)?;
    let pt = generator.generate_transaction()?.expect("final transaction");
    expect(
        &pt,
        &Expected {
            is_final: true,
            input_count: 1,
            aggregate_input_value: Kaspa(70.0),
            output_count: 2,
            priority_fees: FeesExpected::sender(Kaspa(0.0)),
        },
    );
    assert_eq!(pt.change_value(), kaspa_to_sompi(45.0) - pt.fees());
    assert!(generator.generate_transaction()?.is_none());
    Ok(())
}

#[test]
fn test_generator_keeps_non_dust_remainder_as_change() -> Result<()> {
    let network_id = test_network_id();

    // the change output of a single entry pushes the storage mass over the limit
    let single = generator(network_id, &[1.0], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(0.101))].as_slice())?;
    assert!(matches!(single.generate_transaction(), Err(Error::MassExceeded)));
    assert!(single.generate_transaction()?.is_none());

    // a second entry lowers the storage mass enough to carry the change
    let generator = generator(network_id, &[1.0; 2], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(0.101))].as_slice())?;
    let pt = generator.generate_transaction()?.expect("final transaction");
    expect(
        &pt,
        &Expected {
            is_final: true,
            input_count: 2,
            aggregate_input_value: Kaspa(2.0),
            output_count: 2,
            priority_fees: FeesExpected::sender(Kaspa(0.0)),
        },
    );
    assert!(pt.fees() < kaspa_to_sompi(0.001));
    assert_eq!(pt.change_value(), kaspa_to_sompi(2.0) - kaspa_to_sompi(0.101) - pt.fees());
    Ok(())
}

#[test]
fn test_generator_inputs_1000_outputs_1_fees_exclude() -> Result<()> {
    let network_id = test_network_id();
    let max_inputs = max_inputs_per_transaction(network_id);
    let generator =
        generator(network_id, &[10.0; 1_000], &[], Fees::sender(Kaspa(5.0)), [(output_address, Kaspa(9_000.0))].as_slice())?;

    let transactions = generator.iter().collect::<Result<Vec<_>>>()?;
    let (final_transaction, batches) = transactions.split_last().expect("transactions");
    assert!(final_transaction.is_final());
    assert_eq!(batches.len(), expected_batch_count(901, max_inputs));
    assert!(batches.iter().all(|pt| pt.is_batch() && pt.transaction().outputs.len() == 1));
    assert_eq!(batches[0].utxo_entries().len(), max_inputs);
    assert_eq!(final_transaction.payment_value(), Some(kaspa_to_sompi(9_000.0)));

    for pt in transactions.iter() {
        let calc = pt.generator().mass_calculator();
        assert!(pt.mass() <= calc.maximum_standard_transaction_mass());
    }

    let summary = generator.summary();
    assert_eq!(summary.number_of_generated_transactions, transactions.len());
    assert_eq!(summary.final_transaction_id, Some(final_transaction.id()));
    assert_eq!(summary.aggregated_fees, transactions.iter().map(|pt| pt.fees()).sum::<u64>());
    Ok(())
}

#[test]
fn test_generator_priority_entries_first() -> Result<()> {
    let network_id = test_network_id();
    let address = change_address(network_id.into());
    let priority = make_utxo_entry(&address, 1_000, kaspa_to_sompi(3.0), 0);
    let mut entries = make_utxo_entries(network_id, &[50.0, 40.0]);
    // the priority entry is also present in the pool and must not be used twice
    entries.push(priority.clone());

    let settings = GeneratorSettings::try_new_with_entries(
        network_id,
        entries,
        Some(vec![priority.clone()]),
        address,
        1,
        1,
        PaymentOutput::new(output_address(network_id.into()), kaspa_to_sompi(20.0)).into(),
        None,
        Fees::SenderPays(0),
        None,
    )?;
    let generator = Generator::try_new(settings, None)?;
    let pt = generator.generate_transaction()?.expect("final transaction");
    let ids = pt.utxo_entries().iter().map(|entry| entry.id()).collect::<Vec<_>>();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], priority.id());
    assert_eq!(pt.utxo_entries()[1].amount(), kaspa_to_sompi(50.0));
    Ok(())
}

#[test]
fn test_generator_estimate() -> Result<()> {
    let network_id = test_network_id();
    let outputs = [(output_address, Kaspa(990.0))];

    let estimate = generator(network_id, &[10.0; 100], &[], Fees::sender(Kaspa(0.0)), outputs.as_slice())?.estimate()?;
    let generator = generator(network_id, &[10.0; 100], &[], Fees::sender(Kaspa(0.0)), outputs.as_slice())?;
    let transactions = generator.iter().collect::<Result<Vec<_>>>()?;
    let summary = generator.summary();

    assert_eq!(estimate.number_of_generated_transactions, 2);
    assert_eq!(estimate.number_of_generated_transactions, summary.number_of_generated_transactions);
    assert_eq!(estimate.aggregated_utxos, summary.aggregated_utxos);
    assert_eq!(estimate.aggregated_fees, summary.aggregated_fees);
    assert_eq!(estimate.aggregated_mass, summary.aggregated_mass);
    assert_eq!(estimate.final_transaction_id, transactions.last().map(|pt| pt.id()));
    Ok(())
}

#[test]
fn test_generator_fee_rate() -> Result<()> {
    let network_id = test_network_id();
    let settings = GeneratorSettings::try_new_with_entries(
        network_id,
        make_utxo_entries(network_id, &[10.0; 2]),
        None,
        change_address(network_id.into()),
        1,
        1,
        PaymentOutput::new(output_address(network_id.into()), kaspa_to_sompi(12.0)).into(),
        Some(10.0),
        Fees::SenderPays(0),
        None,
    )?;
    let pt = Generator::try_new(settings, None)?.generate_transaction()?.expect("final transaction");
    assert!(pt.fees() >= pt.mass() * 10);
    assert_eq!(pt.aggregate_input_value(), pt.aggregate_output_value() + pt.fees());
    Ok(())
}

#[tokio::test]
async fn test_generator_stream() -> Result<()> {
    let generator = make_generator(test_network_id(), &[10.0; 3], &[], Fees::None, change_address, PaymentDestination::Change)?;
    let transactions = generator.stream().collect::<Vec<_>>().await;
    assert_eq!(transactions.len(), 1);
    let pt = transactions.into_iter().next().unwrap()?;
    assert!(pt.is_final());
    assert_eq!(pt.utxo_entries().len(), 3);
    Ok(())
}

pub(crate) struct MockSigner;

impl Signer for MockSigner {
    fn try_sign(&self, mut transaction: SignableTransaction, _addresses: &[Address]) -> Result<SignableTransaction> {
        transaction.tx.inputs.iter_mut().for_each(|input| input.signature_script = vec![0x41; 66]);
        Ok(transaction)
    }
}

#[test]
fn test_pending_transaction_signing() -> Result<()> {
    let pt = generator(test_network_id(), &[10.0; 2], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(12.0))].as_slice())?
        .generate_transaction()?
        .expect("final transaction");

    assert_eq!(pt.state(), PendingTransactionState::Draft);
    assert!(pt.try_sign().is_err(), "generator has no signer");
    pt.try_sign_with(&MockSigner)?;
    assert_eq!(pt.state(), PendingTransactionState::Signed);
    assert!(pt.signable_transaction().is_fully_signed());
    assert_eq!(pt.transaction().id(), pt.id());
    assert!(matches!(pt.try_sign_with(&MockSigner), Err(Error::PendingTransactionState(_))));
    Ok(())
}

#[test]
fn test_pending_transaction_external_signer_json() -> Result<()> {
    use kaspa_consensus_client::serializable::string::SerializableTransaction;

    let pt = generator(test_network_id(), &[10.0; 2], &[], Fees::sender(Kaspa(0.0)), [(output_address, Kaspa(12.0))].as_slice())?
        .generate_transaction()?
        .expect("final transaction");

    let json = pt.serialize_to_json(true)?;
    let signable_tx = SignableTransaction::try_from(SerializableTransaction::deserialize_from_json(&json)?)?;
    assert_eq!(signable_tx.id(), pt.id());
    assert_eq!(signable_tx.entries.len(), 2);

    assert!(pt.serialize_to_json(false)?.contains(&pt.id().to_string()));
    Ok(())
}
