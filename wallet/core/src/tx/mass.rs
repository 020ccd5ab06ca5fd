//!
//! Transaction mass estimation for unsigned transactions.
//!
//! The consensus mass calculator operates on signed transactions. During
//! generation the signature scripts are still empty, so the wallet adds the
//! expected signature size per input on top of the consensus estimate.
//!

use crate::error::Error;
use crate::result::Result;
use crate::utxo::NetworkParams;
use kaspa_consensus_client::UtxoEntryReference;
use kaspa_consensus_core::config::params::Params;
use kaspa_consensus_core::constants::MAX_SOMPI;
use kaspa_consensus_core::mass::{
    blank_transaction_estimated_serialized_size, calc_storage_mass as consensus_calc_storage_mass, transaction_input_estimated_serialized_size,
    transaction_output_estimated_serialized_size, utxo_plurality, UtxoCell,
};
use kaspa_consensus_core::tx::{Transaction, TransactionInput, TransactionOutput, SCRIPT_VECTOR_SIZE};

pub use kaspa_consensus_core::mass::MassCombinationStrategy;

/// 1 byte for OP_DATA_65 + 64 (length of signature) + 1 byte for sig hash type
pub const SIGNATURE_SIZE: u64 = 1 + 64 + 1;

/// Minimum fee, in sompi per 1000 grams of mass, required to relay a transaction.
pub const MINIMUM_RELAY_TRANSACTION_FEE: u64 = 1000;

/// Mass ceiling for a transaction to be considered standard and relayed by nodes.
pub const MAXIMUM_STANDARD_TRANSACTION_MASS: u64 = 100_000;

pub const STANDARD_OUTPUT_SIZE_PLUS_INPUT_SIZE: u64 = transaction_standard_output_serialized_byte_size() + 148;
pub const STANDARD_OUTPUT_SIZE_PLUS_INPUT_SIZE_3X: u64 = STANDARD_OUTPUT_SIZE_PLUS_INPUT_SIZE * 3;

/// Minimum fee required to relay a transaction of the given mass.
/// Never zero, capped at [`MAX_SOMPI`].
pub fn calc_minimum_required_transaction_relay_fee(mass: u64) -> u64 {
    let mut minimum_fee = mass.saturating_mul(MINIMUM_RELAY_TRANSACTION_FEE) / 1000;

    if minimum_fee == 0 {
        minimum_fee = MINIMUM_RELAY_TRANSACTION_FEE;
    }

    minimum_fee.min(MAX_SOMPI)
}

pub const fn transaction_standard_output_serialized_byte_size() -> u64 {
    let mut size: u64 = 0;
    size += 8; // value (u64)
    size += 2; // output.ScriptPublicKey.Version (u16)
    size += 8; // length of script public key (u64)
    size += SCRIPT_VECTOR_SIZE as u64;
    size
}

/// Mass calculator used by the transaction generator. Combines the consensus
/// mass parameters with the per-network combination rule from [`NetworkParams`].
#[derive(Clone, Debug)]
pub struct MassCalculator {
    mass_per_tx_byte: u64,
    mass_per_script_pub_key_byte: u64,
    mass_per_sig_op: u64,
    storage_mass_parameter: u64,
    maximum_standard_transaction_mass: u64,
    mass_combination_strategy: MassCombinationStrategy,
}

impl MassCalculator {
    pub fn new(consensus_params: &Params, network_params: &NetworkParams) -> Self {
        Self {
            mass_per_tx_byte: consensus_params.mass_per_tx_byte,
            mass_per_script_pub_key_byte: consensus_params.mass_per_script_pub_key_byte,
            mass_per_sig_op: consensus_params.mass_per_sig_op,
            storage_mass_parameter: consensus_params.storage_mass_parameter,
            maximum_standard_transaction_mass: consensus_params.max_standard_tx_mass,
            mass_combination_strategy: network_params.mass_combination_strategy,
        }
    }

    #[inline(always)]
    pub fn maximum_standard_transaction_mass(&self) -> u64 {
        self.maximum_standard_transaction_mass
    }

    #[inline(always)]
    pub fn mass_combination_strategy(&self) -> MassCombinationStrategy {
        self.mass_combination_strategy
    }

    /// Returns `true` if an output carrying `value` would be considered dust,
    /// i.e. costs more to spend than it is worth.
    pub fn is_dust(&self, value: u64) -> bool {
        match value.checked_mul(1000) {
            Some(value_1000) => value_1000 / STANDARD_OUTPUT_SIZE_PLUS_INPUT_SIZE_3X < MINIMUM_RELAY_TRANSACTION_FEE,
            None => (value as u128 * 1000 / STANDARD_OUTPUT_SIZE_PLUS_INPUT_SIZE_3X as u128) < MINIMUM_RELAY_TRANSACTION_FEE as u128,
        }
    }

    pub fn blank_transaction_compute_mass(&self) -> u64 {
        blank_transaction_estimated_serialized_size() * self.mass_per_tx_byte
    }

    pub fn calc_compute_mass_for_payload(&self, payload_byte_size: usize) -> u64 {
        payload_byte_size as u64 * self.mass_per_tx_byte
    }

    pub fn calc_compute_mass_for_output(&self, output: &TransactionOutput) -> u64 {
        self.mass_per_script_pub_key_byte * (2 + output.script_public_key.script().len() as u64)
            + transaction_output_estimated_serialized_size(output) * self.mass_per_tx_byte
    }

    pub fn calc_compute_mass_for_outputs(&self, outputs: &[TransactionOutput]) -> u64 {
        outputs.iter().map(|output| self.calc_compute_mass_for_output(output)).sum()
    }

    /// Compute mass of an input without its signature.
    pub fn calc_compute_mass_for_input(&self, input: &TransactionInput) -> u64 {
        input.sig_op_count as u64 * self.mass_per_sig_op + transaction_input_estimated_serialized_size(input) * self.mass_per_tx_byte
    }

    pub fn calc_compute_mass_for_inputs(&self, inputs: &[TransactionInput]) -> u64 {
        inputs.iter().map(|input| self.calc_compute_mass_for_input(input)).sum()
    }

    /// Mass of the signatures expected in a single input.
    pub fn calc_compute_mass_for_signature(&self, minimum_signatures: u16) -> u64 {
        SIGNATURE_SIZE * self.mass_per_tx_byte * minimum_signatures.max(1) as u64
    }

    pub fn calc_signature_compute_mass_for_inputs(&self, number_of_inputs: usize, minimum_signatures: u16) -> u64 {
        self.calc_compute_mass_for_signature(minimum_signatures) * number_of_inputs as u64
    }

    /// Compute mass of a transaction whose inputs already carry signatures.
    pub fn calc_compute_mass_for_signed_transaction(&self, tx: &Transaction) -> u64 {
        self.blank_transaction_compute_mass()
            + self.calc_compute_mass_for_payload(tx.payload.len())
            + self.calc_compute_mass_for_outputs(&tx.outputs)
            + self.calc_compute_mass_for_inputs(&tx.inputs)
    }

    /// Compute mass of an unsigned transaction, accounting for the signatures
    /// that will be added to each input.
    pub fn calc_compute_mass_for_unsigned_transaction(&self, tx: &Transaction, minimum_signatures: u16) -> u64 {
        self.calc_compute_mass_for_signed_transaction(tx) + self.calc_signature_compute_mass_for_inputs(tx.inputs.len(), minimum_signatures)
    }

    /// Storage mass for the given inputs and outputs, `None` when incomputable
    /// (no inputs or a zero-valued input or output).
    pub fn calc_storage_mass_for_transaction_parts(&self, inputs: &[UtxoEntryReference], outputs: &[TransactionOutput]) -> Option<u64> {
        consensus_calc_storage_mass(
            false,
            inputs.iter().map(|entry| UtxoCell::new(utxo_plurality(entry.script_public_key()), entry.amount())),
            outputs.iter().map(UtxoCell::from),
            self.storage_mass_parameter,
        )
    }

    #[inline(always)]
    pub fn combine_mass(&self, compute_mass: u64, storage_mass: u64) -> u64 {
        self.mass_combination_strategy.combine(compute_mass, storage_mass)
    }

    /// Overall mass of an unsigned transaction spending `utxos`. Fails with
    /// [`Error::InvalidTransactionShape`] when the storage mass is incomputable
    /// or the entries do not match the inputs.
    pub fn calc_overall_mass_for_unsigned_transaction(
        &self,
        tx: &Transaction,
        utxos: &[UtxoEntryReference],
        minimum_signatures: u16,
    ) -> Result<u64> {
        if tx.inputs.len() != utxos.len() {
            return Err(Error::InvalidTransactionShape(format!(
                "transaction has {} inputs but {} utxo entries were supplied",
                tx.inputs.len(),
                utxos.len()
            )));
        }
        let storage_mass = self
            .calc_storage_mass_for_transaction_parts(utxos, &tx.outputs)
            .ok_or_else(|| Error::InvalidTransactionShape("storage mass is incomputable".to_string()))?;
        let compute_mass = self.calc_compute_mass_for_unsigned_transaction(tx, minimum_signatures);
        Ok(self.combine_mass(compute_mass, storage_mass))
    }

    /// Minimum fee for a transaction of the given mass: `ceil(mass * fee_rate)`,
    /// never less than the minimum relay fee. Without a fee rate only the
    /// relay fee applies.
    pub fn calc_fee_for_mass(&self, mass: u64, fee_rate: Option<f64>) -> u64 {
        let relay_fee = calc_minimum_required_transaction_relay_fee(mass);
        match fee_rate {
            Some(fee_rate) if fee_rate.is_finite() && fee_rate > 0.0 => ((mass as f64 * fee_rate).ceil() as u64).max(relay_fee),
            _ => relay_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utxo::settings::MAINNET_NETWORK_PARAMS;
    use kaspa_addresses::{Address, Prefix, Version};
    use kaspa_consensus_client::UtxoEntry;
    use kaspa_consensus_core::config::params::MAINNET_PARAMS;
    use kaspa_consensus_core::constants::SOMPI_PER_KASPA;
    use kaspa_consensus_core::subnets::SUBNETWORK_ID_NATIVE;
    use kaspa_consensus_core::tx::{pay_to_address_script, TransactionOutpoint};
    use kaspa_hashes::Hash;

    fn calculator() -> MassCalculator {
        MassCalculator::new(&MAINNET_PARAMS, &MAINNET_NETWORK_PARAMS)
    }

    fn address() -> Address {
        Address::new(Prefix::Mainnet, Version::PubKey, &[7u8; 32])
    }

    fn entry(index: u32, amount: u64) -> UtxoEntryReference {
        UtxoEntry {
            address: Some(address()),
            outpoint: TransactionOutpoint::new(Hash::from_u64_word(1), index),
            amount,
            script_public_key: pay_to_address_script(&address()),
            block_daa_score: 0,
            is_coinbase: false,
        }
        .into()
    }

    #[test]
    fn test_standard_component_masses() {
        let calc = calculator();
        let spk = pay_to_address_script(&address());
        let output = TransactionOutput::new(SOMPI_PER_KASPA, spk);
        let input = TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(1), 0), vec![], 0, 1);

        assert_eq!(calc.blank_transaction_compute_mass(), 94);
        assert_eq!(calc.calc_compute_mass_for_output(&output), 412);
        assert_eq!(calc.calc_compute_mass_for_input(&input), 1052);
        assert_eq!(calc.calc_compute_mass_for_signature(1), 66);
        assert_eq!(calc.calc_compute_mass_for_signature(0), 66);
        assert_eq!(calc.calc_compute_mass_for_signature(2), 132);

        let tx = Transaction::new(0, vec![input], vec![output.clone(), output], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        assert_eq!(calc.calc_compute_mass_for_unsigned_transaction(&tx, 1), 94 + 1118 + 412 * 2);
    }

    #[test]
    fn test_overall_mass_and_shape() {
        let calc = calculator();
        let spk = pay_to_address_script(&address());
        let utxos = vec![entry(0, 70 * SOMPI_PER_KASPA)];
        let input = TransactionInput::new(utxos[0].id(), vec![], 0, 1);
        let outputs = vec![TransactionOutput::new(25 * SOMPI_PER_KASPA, spk.clone()), TransactionOutput::new(44 * SOMPI_PER_KASPA, spk)];
        let tx = Transaction::new(0, vec![input], outputs, 0, SUBNETWORK_ID_NATIVE, 0, vec![]);

        let mass = calc.calc_overall_mass_for_unsigned_transaction(&tx, &utxos, 1).unwrap();
        assert_eq!(mass, 2036);
        assert!(matches!(calc.calc_overall_mass_for_unsigned_transaction(&tx, &[], 1), Err(Error::InvalidTransactionShape(_))));

        let mut zero = tx.clone();
        zero.outputs[0].value = 0;
        assert!(matches!(calc.calc_overall_mass_for_unsigned_transaction(&zero, &utxos, 1), Err(Error::InvalidTransactionShape(_))));
    }

    #[test]
    fn test_fees_and_dust() {
        let calc = calculator();
        assert_eq!(calc_minimum_required_transaction_relay_fee(0), MINIMUM_RELAY_TRANSACTION_FEE);
        assert_eq!(calc_minimum_required_transaction_relay_fee(2036), 2036);
        assert_eq!(calc.calc_fee_for_mass(2036, None), 2036);
        assert_eq!(calc.calc_fee_for_mass(2036, Some(1.0)), 2036);
        assert_eq!(calc.calc_fee_for_mass(2036, Some(1.5)), 3054);
        assert_eq!(calc.calc_fee_for_mass(1001, Some(0.5)), 1001);

        assert!(calc.is_dust(0));
        assert!(calc.is_dust(605));
        assert!(!calc.is_dust(606));
        assert!(!calc.is_dust(u64::MAX));
    }
}
