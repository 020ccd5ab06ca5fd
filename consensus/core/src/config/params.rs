use crate::constants::STORAGE_MASS_PARAMETER;
use crate::network::{NetworkId, NetworkType};

/// Consensus parameters relevant to transaction construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Params {
    pub mass_per_tx_byte: u64,
    pub mass_per_script_pub_key_byte: u64,
    pub mass_per_sig_op: u64,
    pub max_tx_inputs: usize,
    pub max_tx_outputs: usize,

    /// Mempool standardness ceiling for the overall mass of a single transaction
    pub max_standard_tx_mass: u64,

    /// The parameter for scaling inverse KAS value to mass units (KIP-0009)
    pub storage_mass_parameter: u64,

    /// DAA periods after which coinbase and user outputs become spendable
    pub coinbase_maturity: u64,
}

pub const MAINNET_PARAMS: Params = Params {
    mass_per_tx_byte: 1,
    mass_per_script_pub_key_byte: 10,
    mass_per_sig_op: 1000,
    max_tx_inputs: 1000,
    max_tx_outputs: 1000,
    max_standard_tx_mass: 100_000,
    storage_mass_parameter: STORAGE_MASS_PARAMETER,
    coinbase_maturity: 100,
};

pub const TESTNET_PARAMS: Params = MAINNET_PARAMS;

pub const TESTNET11_PARAMS: Params = Params { coinbase_maturity: 1000, ..MAINNET_PARAMS };

pub const SIMNET_PARAMS: Params = MAINNET_PARAMS;

pub const DEVNET_PARAMS: Params = MAINNET_PARAMS;

impl From<NetworkId> for Params {
    fn from(value: NetworkId) -> Self {
        match value.network_type {
            NetworkType::Mainnet => MAINNET_PARAMS,
            NetworkType::Testnet => match value.suffix {
                Some(11) => TESTNET11_PARAMS,
                _ => TESTNET_PARAMS,
            },
            NetworkType::Devnet => DEVNET_PARAMS,
            NetworkType::Simnet => SIMNET_PARAMS,
        }
    }
}

impl From<&NetworkId> for Params {
    fn from(value: &NetworkId) -> Self {
        (*value).into()
    }
}
