//!
//! Network parameters that control maturity durations
//! and other transaction related properties.
//!

use crate::imports::*;

/// Per-network UTXO processing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParams {
    /// DAA period after which coinbase outputs become mature.
    pub coinbase_transaction_maturity_period_daa: u64,
    /// DAA period during which coinbase outputs are held in stasis
    /// before they are reported as pending.
    pub coinbase_transaction_stasis_period_daa: u64,
    /// DAA period after which user transaction outputs become mature.
    pub user_transaction_maturity_period_daa: u64,
    pub mass_combination_strategy: MassCombinationStrategy,
    /// Mass margin added to every batch (compound) transaction.
    pub additional_compound_transaction_mass: u64,
}

impl NetworkParams {
    #[inline]
    pub fn coinbase_transaction_maturity_period_daa(&self) -> u64 {
        self.coinbase_transaction_maturity_period_daa
    }

    #[inline]
    pub fn coinbase_transaction_stasis_period_daa(&self) -> u64 {
        self.coinbase_transaction_stasis_period_daa
    }

    #[inline]
    pub fn user_transaction_maturity_period_daa(&self) -> u64 {
        self.user_transaction_maturity_period_daa
    }

    #[inline]
    pub fn mass_combination_strategy(&self) -> MassCombinationStrategy {
        self.mass_combination_strategy
    }

    #[inline]
    pub fn additional_compound_transaction_mass(&self) -> u64 {
        self.additional_compound_transaction_mass
    }
}

pub const MAINNET_NETWORK_PARAMS: NetworkParams = NetworkParams {
    coinbase_transaction_maturity_period_daa: 100,
    coinbase_transaction_stasis_period_daa: 50,
    user_transaction_maturity_period_daa: 10,
    mass_combination_strategy: MassCombinationStrategy::Max,
    additional_compound_transaction_mass: 0,
};

pub const TESTNET10_NETWORK_PARAMS: NetworkParams = MAINNET_NETWORK_PARAMS;

pub const TESTNET11_NETWORK_PARAMS: NetworkParams = NetworkParams {
    coinbase_transaction_maturity_period_daa: 1_000,
    coinbase_transaction_stasis_period_daa: 500,
    user_transaction_maturity_period_daa: 100,
    mass_combination_strategy: MassCombinationStrategy::Max,
    additional_compound_transaction_mass: 100,
};

pub const SIMNET_NETWORK_PARAMS: NetworkParams = MAINNET_NETWORK_PARAMS;

pub const DEVNET_NETWORK_PARAMS: NetworkParams = MAINNET_NETWORK_PARAMS;

/// Unknown testnet suffixes fall back to the testnet-10 parameters.
impl From<NetworkId> for NetworkParams {
    fn from(value: NetworkId) -> Self {
        match value.network_type {
            NetworkType::Mainnet => MAINNET_NETWORK_PARAMS,
            NetworkType::Testnet => match value.suffix {
                Some(11) => TESTNET11_NETWORK_PARAMS,
                _ => TESTNET10_NETWORK_PARAMS,
            },
            NetworkType::Devnet => DEVNET_NETWORK_PARAMS,
            NetworkType::Simnet => SIMNET_NETWORK_PARAMS,
        }
    }
}

impl From<&NetworkId> for NetworkParams {
    fn from(value: &NetworkId) -> Self {
        (*value).into()
    }
}

/// Table of [`NetworkParams`] keyed by network id.
///
/// Each [`UtxoProcessor`] owns its own copy; tables are never shared
/// between processors. Networks without an explicit entry resolve to
/// their defaults.
#[derive(Debug, Clone, Default)]
pub struct NetworkParamsMap {
    map: AHashMap<NetworkId, NetworkParams>,
}

impl NetworkParamsMap {
    /// A table populated with the defaults of every known network.
    pub fn new() -> Self {
        Self { map: NetworkId::iter().map(|network_id| (network_id, NetworkParams::from(network_id))).collect() }
    }

    pub fn get(&self, network_id: &NetworkId) -> NetworkParams {
        self.map.get(network_id).copied().unwrap_or_else(|| NetworkParams::from(network_id))
    }

    pub fn insert(&mut self, network_id: NetworkId, network_params: NetworkParams) {
        self.map.insert(network_id, network_params);
    }

    /// Sets the coinbase maturity period. The period must be greater than
    /// the coinbase stasis period of the network.
    pub fn set_coinbase_transaction_maturity_period_daa(&mut self, network_id: &NetworkId, value: u64) -> Result<()> {
        let mut network_params = self.get(network_id);
        let stasis = network_params.coinbase_transaction_stasis_period_daa;
        if value <= stasis {
            return Err(Error::InvalidMaturityPeriod { coinbase: value, stasis });
        }
        network_params.coinbase_transaction_maturity_period_daa = value;
        self.insert(*network_id, network_params);
        Ok(())
    }

    /// Sets the user transaction maturity period. The period must be non-zero.
    pub fn set_user_transaction_maturity_period_daa(&mut self, network_id: &NetworkId, value: u64) -> Result<()> {
        if value == 0 {
            return Err(Error::InvalidMaturityPeriod { coinbase: value, stasis: 0 });
        }
        let mut network_params = self.get(network_id);
        network_params.user_transaction_maturity_period_daa = value;
        self.insert(*network_id, network_params);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_params_defaults() {
        let map = NetworkParamsMap::new();
        let mainnet = map.get(&NetworkId::mainnet());
        assert_eq!(mainnet.coinbase_transaction_maturity_period_daa(), 100);
        assert_eq!(mainnet.coinbase_transaction_stasis_period_daa(), 50);
        assert_eq!(mainnet.user_transaction_maturity_period_daa(), 10);

        let tn11 = map.get(&NetworkId::with_suffix(NetworkType::Testnet, 11));
        assert_eq!(tn11.coinbase_transaction_maturity_period_daa(), 1_000);
        assert_eq!(tn11.additional_compound_transaction_mass(), 100);

        let unknown = map.get(&NetworkId::with_suffix(NetworkType::Testnet, 99));
        assert_eq!(unknown, TESTNET10_NETWORK_PARAMS);

        for network_id in NetworkId::iter() {
            assert_eq!(map.get(&network_id).mass_combination_strategy(), MassCombinationStrategy::Max);
        }
    }

    #[test]
    fn test_network_params_overrides_are_local() {
        let mainnet = NetworkId::mainnet();
        let mut a = NetworkParamsMap::new();
        let b = NetworkParamsMap::new();

        a.set_coinbase_transaction_maturity_period_daa(&mainnet, 200).unwrap();
        a.set_user_transaction_maturity_period_daa(&mainnet, 20).unwrap();
        assert_eq!(a.get(&mainnet).coinbase_transaction_maturity_period_daa(), 200);
        assert_eq!(a.get(&mainnet).user_transaction_maturity_period_daa(), 20);
        assert_eq!(b.get(&mainnet), MAINNET_NETWORK_PARAMS);

        assert!(matches!(a.set_coinbase_transaction_maturity_period_daa(&mainnet, 50), Err(Error::InvalidMaturityPeriod { .. })));
        assert!(matches!(a.set_user_transaction_maturity_period_daa(&mainnet, 0), Err(Error::InvalidMaturityPeriod { .. })));
        assert_eq!(a.get(&mainnet).coinbase_transaction_maturity_period_daa(), 200);
    }
}
