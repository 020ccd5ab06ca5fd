//!
//! Engine configuration loaded from TOML.
//!
//! ```toml
//! network-id = "testnet-11"
//! fee-rate = 1.5
//!
//! [[maturity]]
//! network-id = "testnet-11"
//! coinbase-transaction-maturity-daa = 2000
//! ```
//!

use crate::imports::*;
use crate::utxo::settings::NetworkParamsMap;

/// Per-network override of the maturity periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MaturityOverride {
    pub network_id: NetworkId,
    #[serde(default)]
    pub coinbase_transaction_maturity_daa: Option<u64>,
    #[serde(default)]
    pub user_transaction_maturity_daa: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineSettings {
    pub network_id: NetworkId,
    /// Fee rate in sompi per gram of mass. When absent only the
    /// minimum relay fee is charged.
    #[serde(default)]
    pub fee_rate: Option<f64>,
    #[serde(default)]
    pub maturity: Vec<MaturityOverride>,
}

impl EngineSettings {
    pub fn new(network_id: NetworkId) -> Self {
        Self { network_id, fee_rate: None, maturity: vec![] }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: EngineSettings = toml::from_str(text)?;
        if let Some(fee_rate) = settings.fee_rate {
            if !fee_rate.is_finite() || fee_rate < 0.0 {
                return Err(Error::custom(format!("invalid fee rate: {fee_rate}")));
            }
        }
        Ok(settings)
    }

    /// Default network parameters with the configured overrides applied.
    pub fn network_params_map(&self) -> Result<NetworkParamsMap> {
        let mut map = NetworkParamsMap::new();
        for entry in self.maturity.iter() {
            if let Some(value) = entry.coinbase_transaction_maturity_daa {
                map.set_coinbase_transaction_maturity_period_daa(&entry.network_id, value)?;
            }
            if let Some(value) = entry.user_transaction_maturity_daa {
                map.set_user_transaction_maturity_period_daa(&entry.network_id, value)?;
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_settings_from_toml() {
        let text = r#"
            network-id = "testnet-11"
            fee-rate = 1.5

            [[maturity]]
            network-id = "testnet-11"
            coinbase-transaction-maturity-daa = 2000
            user-transaction-maturity-daa = 200
        "#;

        let settings = EngineSettings::from_toml_str(text).unwrap();
        let network_id = NetworkId::with_suffix(NetworkType::Testnet, 11);
        assert_eq!(settings.network_id, network_id);
        assert_eq!(settings.fee_rate, Some(1.5));

        let map = settings.network_params_map().unwrap();
        let params = map.get(&network_id);
        assert_eq!(params.coinbase_transaction_maturity_period_daa(), 2000);
        assert_eq!(params.user_transaction_maturity_period_daa(), 200);
        assert_eq!(map.get(&NetworkId::mainnet()).coinbase_transaction_maturity_period_daa(), 100);
    }

    #[test]
    fn test_engine_settings_rejects_invalid_values() {
        assert!(EngineSettings::from_toml_str("network-id = \"mainnet\"\nfee-rate = -1.0").is_err());
        assert!(EngineSettings::from_toml_str("network-id = \"nonet\"").is_err());

        let text = r#"
            network-id = "mainnet"

            [[maturity]]
            network-id = "mainnet"
            coinbase-transaction-maturity-daa = 10
        "#;
        let settings = EngineSettings::from_toml_str(text).unwrap();
        assert!(matches!(settings.network_params_map(), Err(Error::InvalidMaturityPeriod { coinbase: 10, stasis: 50 })));
    }
}
