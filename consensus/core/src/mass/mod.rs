//!
//! Transaction mass: compute mass derived from the transaction shape and
//! storage mass (KIP-0009) derived from the value distribution of inputs
//! and outputs.
//!

use crate::{
    config::params::Params,
    subnets::SUBNETWORK_ID_SIZE,
    tx::{ScriptPublicKey, SignableTransaction, Transaction, TransactionInput, TransactionOutput, UtxoEntry},
};
use kaspa_hashes::HASH_SIZE;
use serde::{Deserialize, Serialize};

// The estimated size of a transaction in some serialization. This has to be
// deterministic, but not necessarily accurate, since it's only used as the
// size component in the transaction and block mass limit calculation.
pub fn transaction_estimated_serialized_size(tx: &Transaction) -> u64 {
    let mut size: u64 = blank_transaction_estimated_serialized_size();
    size += tx.inputs.iter().map(transaction_input_estimated_serialized_size).sum::<u64>();
    size += tx.outputs.iter().map(transaction_output_estimated_serialized_size).sum::<u64>();
    size += tx.payload.len() as u64;
    size
}

/// Size of a transaction with no inputs, no outputs and an empty payload.
pub const fn blank_transaction_estimated_serialized_size() -> u64 {
    let mut size: u64 = 0;
    size += 2; // Tx version (u16)
    size += 8; // Number of inputs (u64)
    size += 8; // number of outputs (u64)
    size += 8; // lock time (u64)
    size += SUBNETWORK_ID_SIZE as u64;
    size += 8; // gas (u64)
    size += HASH_SIZE as u64; // payload hash
    size += 8; // length of the payload (u64)
    size
}

pub fn transaction_input_estimated_serialized_size(input: &TransactionInput) -> u64 {
    let mut size = 0;
    size += outpoint_estimated_serialized_size();

    size += 8; // length of signature script (u64)
    size += input.signature_script.len() as u64;

    size += 8; // sequence (uint64)
    size
}

const fn outpoint_estimated_serialized_size() -> u64 {
    let mut size: u64 = 0;
    size += HASH_SIZE as u64; // Previous tx ID
    size += 4; // Index (u32)
    size
}

pub fn transaction_output_estimated_serialized_size(output: &TransactionOutput) -> u64 {
    let mut size: u64 = 0;
    size += 8; // value (u64)
    size += 2; // output.ScriptPublicKey.Version (u16)
    size += 8; // length of script public key (u64)
    size += output.script_public_key.script().len() as u64;
    size
}

/// Returns the UTXO storage "plurality" for this script public key,
/// i.e. how many 100-byte storage units it occupies.
/// All standard script public keys have a plurality of 1.
pub fn utxo_plurality(spk: &ScriptPublicKey) -> u64 {
    /// Bytes used by the fixed parts of a UTXO.
    const UTXO_CONST_STORAGE: usize =
        32  // outpoint::tx_id
        + 4 // outpoint::index
        + 8 // entry amount
        + 8 // entry DAA score
        + 1 // entry is coinbase
        + 2 // entry spk version
        + 8 // entry spk len
    ;

    const UTXO_UNIT_SIZE: usize = 100;

    (UTXO_CONST_STORAGE + spk.script().len()).div_ceil(UTXO_UNIT_SIZE) as u64
}

pub trait UtxoPlurality {
    /// Returns the UTXO storage plurality for the script public key associated with this object.
    fn plurality(&self) -> u64;
}

impl UtxoPlurality for ScriptPublicKey {
    fn plurality(&self) -> u64 {
        utxo_plurality(self)
    }
}

impl UtxoPlurality for UtxoEntry {
    fn plurality(&self) -> u64 {
        utxo_plurality(&self.script_public_key)
    }
}

impl UtxoPlurality for TransactionOutput {
    fn plurality(&self) -> u64 {
        utxo_plurality(&self.script_public_key)
    }
}

/// An abstract UTXO storage cell.
///
/// A UTXO occupying `p` storage units is treated as `p` sub-entries each
/// holding `amount / p`, which keeps the locked amount while scaling the
/// entry count with the script size.
#[derive(Clone, Copy, Debug)]
pub struct UtxoCell {
    /// The plurality (number of "storage units") for this UTXO
    pub plurality: u64,
    /// The amount of KAS (in sompis) locked in this UTXO
    pub amount: u64,
}

impl UtxoCell {
    pub fn new(plurality: u64, amount: u64) -> Self {
        Self { plurality, amount }
    }
}

impl From<&UtxoEntry> for UtxoCell {
    fn from(entry: &UtxoEntry) -> Self {
        Self::new(entry.plurality(), entry.amount)
    }
}

impl From<&TransactionOutput> for UtxoCell {
    fn from(output: &TransactionOutput) -> Self {
        Self::new(output.plurality(), output.value)
    }
}

/// Rule used to fold compute mass and storage mass into the single
/// overall mass that is checked against the standard mass ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MassCombinationStrategy {
    /// `compute + storage` (saturating)
    Add,
    /// `max(compute, storage)`
    Max,
}

impl MassCombinationStrategy {
    #[inline]
    pub fn combine(&self, compute_mass: u64, storage_mass: u64) -> u64 {
        match self {
            MassCombinationStrategy::Add => compute_mass.saturating_add(storage_mass),
            MassCombinationStrategy::Max => compute_mass.max(storage_mass),
        }
    }
}

/// Consensus mass calculator. Operates on fully shaped transactions;
/// wallet-side estimation of unsigned transactions lives in the wallet crate.
#[derive(Clone, Debug)]
pub struct MassCalculator {
    mass_per_tx_byte: u64,
    mass_per_script_pub_key_byte: u64,
    mass_per_sig_op: u64,
    storage_mass_parameter: u64,
}

impl MassCalculator {
    pub fn new(mass_per_tx_byte: u64, mass_per_script_pub_key_byte: u64, mass_per_sig_op: u64, storage_mass_parameter: u64) -> Self {
        Self { mass_per_tx_byte, mass_per_script_pub_key_byte, mass_per_sig_op, storage_mass_parameter }
    }

    pub fn new_with_consensus_params(consensus_params: &Params) -> Self {
        Self {
            mass_per_tx_byte: consensus_params.mass_per_tx_byte,
            mass_per_script_pub_key_byte: consensus_params.mass_per_script_pub_key_byte,
            mass_per_sig_op: consensus_params.mass_per_sig_op,
            storage_mass_parameter: consensus_params.storage_mass_parameter,
        }
    }

    pub fn storage_mass_parameter(&self) -> u64 {
        self.storage_mass_parameter
    }

    /// Calculates the compute mass of this transaction from its size, the
    /// size of its output scripts and its signature operation count.
    pub fn calc_compute_mass(&self, tx: &Transaction) -> u64 {
        if tx.is_coinbase() {
            return 0;
        }

        let size = transaction_estimated_serialized_size(tx);
        let compute_mass_for_size = size * self.mass_per_tx_byte;
        let total_script_public_key_size: u64 = tx
            .outputs
            .iter()
            .map(|output| 2 /* script public key version (u16) */ + output.script_public_key.script().len() as u64)
            .sum();
        let total_script_public_key_mass = total_script_public_key_size * self.mass_per_script_pub_key_byte;

        let total_sigops: u64 = tx.inputs.iter().map(|input| input.sig_op_count as u64).sum();
        let total_sigops_mass = total_sigops * self.mass_per_sig_op;

        compute_mass_for_size + total_script_public_key_mass + total_sigops_mass
    }

    /// Calculates the storage mass for this populated transaction.
    /// Returns `None` if the mass is incomputable (zero-valued outputs or no inputs).
    pub fn calc_storage_mass(&self, tx: &SignableTransaction) -> Option<u64> {
        calc_storage_mass(
            tx.tx.is_coinbase(),
            tx.entries.iter().map(UtxoCell::from),
            tx.tx.outputs.iter().map(UtxoCell::from),
            self.storage_mass_parameter,
        )
    }
}

/// Calculates the storage mass (KIP-0009) for a given set of inputs and outputs.
///
/// The formula is
///
/// ```ignore
///     max(0, C · (|O| / H(O) - |I| / A(I)))
/// ```
///
/// where `C` is the storage mass parameter, `|O|` and `|I|` are the total
/// pluralities of outputs and inputs, `H(O)` is the plurality-weighted harmonic
/// mean of output amounts (each output contributes `C · p² / amount`) and `A(I)`
/// is the arithmetic mean of input amounts.
///
/// Under the relaxed conditions (`|O| = 1`, `|I| = 1`, or `|O| = |I| = 2`)
/// the harmonic mean is used for the inputs as well.
///
/// Returns `None` when an input or output value is zero or there are no inputs,
/// in which case the mass is incomputable and must be treated as too high.
pub fn calc_storage_mass(
    is_coinbase: bool,
    inputs: impl ExactSizeIterator<Item = UtxoCell> + Clone,
    mut outputs: impl Iterator<Item = UtxoCell>,
    storm_param: u64,
) -> Option<u64> {
    if is_coinbase {
        return Some(0);
    }

    // outs_plurality = Σ p(o), harmonic_outs = Σ C·p(o)²/amount(o)
    let (outs_plurality, harmonic_outs) =
        outputs.try_fold((0u64, 0u64), |(acc_plurality, acc_harm), UtxoCell { plurality, amount }| {
            Some((
                acc_plurality + plurality,
                acc_harm.checked_add(storm_param.checked_mul(plurality)?.checked_mul(plurality)?.checked_div(amount)?)?,
            ))
        })?;

    if inputs.len() == 0 {
        return None;
    }

    let relaxed_formula_path = if outs_plurality == 1 {
        true
    } else if inputs.len() > 2 {
        // element plurality is always >= 1, so |I| > 2
        false
    } else {
        let ins_plurality = inputs.clone().map(|cell| cell.plurality).sum::<u64>();
        ins_plurality == 1 || (outs_plurality == 2 && ins_plurality == 2)
    };

    if relaxed_formula_path {
        let harmonic_ins = inputs
            .map(|UtxoCell { plurality, amount }| storm_param.saturating_mul(plurality * plurality).checked_div(amount))
            .try_fold(0u64, |total, current| current.map(|current| total.saturating_add(current)))?;

        return Some(harmonic_outs.saturating_sub(harmonic_ins));
    }

    let (ins_plurality, sum_ins) =
        inputs.fold((0u64, 0u64), |(acc_plur, acc_amt), UtxoCell { plurality, amount }| (acc_plur + plurality, acc_amt.saturating_add(amount)));

    let mean_ins = sum_ins / ins_plurality;

    // C · |I| / A(I)
    let arithmetic_ins = ins_plurality.saturating_mul(storm_param.checked_div(mean_ins)?);

    Some(harmonic_outs.saturating_sub(arithmetic_ins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{SOMPI_PER_KASPA, STORAGE_MASS_PARAMETER},
        subnets::SubnetworkId,
        tx::*,
    };
    use std::str::FromStr;

    #[test]
    fn test_utxo_plurality() {
        assert_eq!(utxo_plurality(&ScriptPublicKey::from_vec(0, vec![0u8; 34])), 1);
        assert_eq!(utxo_plurality(&ScriptPublicKey::from_vec(0, vec![0u8; 37])), 1);
        assert_eq!(utxo_plurality(&ScriptPublicKey::from_vec(0, vec![0u8; 38])), 2);
        assert_eq!(utxo_plurality(&ScriptPublicKey::from_vec(0, vec![0u8; 137])), 2);
        assert_eq!(utxo_plurality(&ScriptPublicKey::from_vec(0, vec![0u8; 138])), 3);
    }

    #[test]
    fn test_storage_mass() {
        // Tx with less outs than ins
        let mut tx = generate_tx_from_amounts(&[100, 200, 300], &[300, 300]);

        //
        // Assert the formula: max( 0 , C·( |O|/H(O) - |I|/A(I) ) )
        //

        let storage_mass = MassCalculator::new(0, 0, 0, 10u64.pow(12)).calc_storage_mass(&tx).unwrap();
        assert_eq!(storage_mass, 0); // Compounds from 3 to 2, with symmetric outputs and no fee, should be zero

        // Create asymmetry
        tx.tx.outputs[0].value = 50;
        tx.tx.outputs[1].value = 550;
        let storage_mass_parameter = 10u64.pow(12);
        let storage_mass = MassCalculator::new(0, 0, 0, storage_mass_parameter).calc_storage_mass(&tx).unwrap();
        assert_eq!(storage_mass, storage_mass_parameter / 50 + storage_mass_parameter / 550 - 3 * (storage_mass_parameter / 200));

        // Create a tx with more outs than ins
        let base_value = 10_000 * SOMPI_PER_KASPA;
        let mut tx = generate_tx_from_amounts(&[base_value, base_value, base_value * 2], &[base_value; 4]);
        let storage_mass_parameter = STORAGE_MASS_PARAMETER;
        let storage_mass = MassCalculator::new(0, 0, 0, storage_mass_parameter).calc_storage_mass(&tx).unwrap();
        assert_eq!(storage_mass, 4); // Inputs are above C so they don't contribute negative mass, 4 outputs exactly equal C each charge 1

        let mut tx2 = tx.clone();
        tx2.tx.outputs[0].value = 10 * SOMPI_PER_KASPA;
        let storage_mass = MassCalculator::new(0, 0, 0, storage_mass_parameter).calc_storage_mass(&tx2).unwrap();
        assert_eq!(storage_mass, 1003);

        // Increase values over the lim
        for out in tx.tx.outputs.iter_mut() {
            out.value += 1
        }
        tx.entries[0].amount += tx.tx.outputs.len() as u64;
        let storage_mass = MassCalculator::new(0, 0, 0, storage_mass_parameter).calc_storage_mass(&tx).unwrap();
        assert_eq!(storage_mass, 0);

        // Now create 2:2 transaction
        // Assert the formula: max( 0 , C·( |O|/H(O) - |I|/H(I) ) )
        let mut tx = generate_tx_from_amounts(&[100, 200], &[50, 250]);
        let storage_mass_parameter = 10u64.pow(12);

        let storage_mass = MassCalculator::new(0, 0, 0, storage_mass_parameter).calc_storage_mass(&tx).unwrap();
        assert_eq!(storage_mass, 9000000000);

        // Set outputs to be equal to inputs
        tx.tx.outputs[0].value = 100;
        tx.tx.outputs[1].value = 200;
        let storage_mass = MassCalculator::new(0, 0, 0, storage_mass_parameter).calc_storage_mass(&tx).unwrap();
        assert_eq!(storage_mass, 0);

        // Remove an output and make sure the other is small enough to make storage mass greater than zero
        tx.tx.outputs.pop();
        tx.tx.outputs[0].value = 50;
        let storage_mass = MassCalculator::new(0, 0, 0, storage_mass_parameter).calc_storage_mass(&tx).unwrap();
        assert_eq!(storage_mass, 5000000000);
    }

    #[test]
    fn test_storage_mass_incomputable() {
        let tx = generate_tx_from_amounts(&[100, 200], &[0, 300]);
        assert_eq!(MassCalculator::new(0, 0, 0, 10u64.pow(12)).calc_storage_mass(&tx), None);

        let tx = generate_tx_from_amounts(&[], &[300]);
        assert_eq!(MassCalculator::new(0, 0, 0, 10u64.pow(12)).calc_storage_mass(&tx), None);
    }

    #[test]
    fn test_compute_mass() {
        let tx = generate_tx_from_amounts(&[100, 200], &[300]);
        let calc = MassCalculator::new_with_consensus_params(&crate::config::params::MAINNET_PARAMS);
        let size = transaction_estimated_serialized_size(&tx.tx);
        // two inputs with a single sig op each, one output with an empty script
        assert_eq!(calc.calc_compute_mass(&tx.tx), size + 2 * 10 + 2 * 1000);
    }

    #[test]
    fn test_mass_combination() {
        assert_eq!(MassCombinationStrategy::Add.combine(10, 20), 30);
        assert_eq!(MassCombinationStrategy::Max.combine(10, 20), 20);
        assert_eq!(MassCombinationStrategy::Add.combine(u64::MAX, 1), u64::MAX);
    }

    fn generate_tx_from_amounts(ins: &[u64], outs: &[u64]) -> SignableTransaction {
        let script_pub_key = ScriptVec::from_slice(&[]);
        let prev_tx_id = TransactionId::from_str("880eb9819a31821d9d2399e2f35e2433b72637e393d71ecc9b8d0250f49153c3").unwrap();
        let tx = Transaction::new(
            0,
            (0..ins.len())
                .map(|i| TransactionInput {
                    previous_outpoint: TransactionOutpoint { transaction_id: prev_tx_id, index: i as u32 },
                    signature_script: vec![],
                    sequence: 0,
                    sig_op_count: 1,
                })
                .collect(),
            outs.iter()
                .copied()
                .map(|out_amount| TransactionOutput {
                    value: out_amount,
                    script_public_key: ScriptPublicKey::new(0, script_pub_key.clone()),
                })
                .collect(),
            1615462089000,
            SubnetworkId::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            0,
            vec![],
        );
        let entries = ins
            .iter()
            .copied()
            .map(|in_amount| UtxoEntry {
                amount: in_amount,
                script_public_key: ScriptPublicKey::new(0, script_pub_key.clone()),
                block_daa_score: 0,
                is_coinbase: false,
            })
            .collect();
        SignableTransaction::with_entries(tx, entries)
    }
}
