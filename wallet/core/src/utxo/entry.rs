use crate::imports::*;
use kaspa_consensus_core::constants::UNACCEPTED_DAA_SCORE;

/// Maturity stage of a UTXO entry relative to the current virtual DAA score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Maturity {
    /// Coinbase output that has not yet passed the stasis period. Stasis
    /// outputs are not reported to the user since they are very likely
    /// to be reorged away.
    Stasis,
    /// Output that has not yet reached the maturity period.
    Pending,
    /// Mature output, available for spending.
    Confirmed,
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Maturity::Stasis => write!(f, "stasis"),
            Maturity::Pending => write!(f, "pending"),
            Maturity::Confirmed => write!(f, "confirmed"),
        }
    }
}

pub trait UtxoEntryReferenceExtension {
    /// Maturity of this entry at `current_daa_score`. An entry is mature once
    /// `block_daa_score + maturity_period <= current_daa_score`. Entries that
    /// have not been accepted yet (unaccepted DAA score) are always pending.
    fn maturity(&self, params: &NetworkParams, current_daa_score: u64) -> Maturity;

    /// `true` if the entry was produced by a transaction that has not been
    /// accepted into the chain yet (i.e. a locally created change entry).
    fn is_unaccepted(&self) -> bool;
}

impl UtxoEntryReferenceExtension for UtxoEntryReference {
    fn maturity(&self, params: &NetworkParams, current_daa_score: u64) -> Maturity {
        let block_daa_score = self.block_daa_score();
        if block_daa_score == UNACCEPTED_DAA_SCORE {
            return Maturity::Pending;
        }

        if self.is_coinbase() {
            if block_daa_score.saturating_add(params.coinbase_transaction_stasis_period_daa()) > current_daa_score {
                Maturity::Stasis
            } else if block_daa_score.saturating_add(params.coinbase_transaction_maturity_period_daa()) > current_daa_score {
                Maturity::Pending
            } else {
                Maturity::Confirmed
            }
        } else if block_daa_score.saturating_add(params.user_transaction_maturity_period_daa()) > current_daa_score {
            Maturity::Pending
        } else {
            Maturity::Confirmed
        }
    }

    fn is_unaccepted(&self) -> bool {
        self.block_daa_score() == UNACCEPTED_DAA_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utxo::settings::MAINNET_NETWORK_PARAMS;
    use kaspa_addresses::Version;
    use kaspa_consensus_core::tx::{pay_to_address_script, TransactionOutpoint};
    use kaspa_hashes::Hash;

    fn entry(block_daa_score: u64, is_coinbase: bool) -> UtxoEntryReference {
        let address = Address::new(Prefix::Mainnet, Version::PubKey, &[1u8; 32]);
        UtxoEntry {
            script_public_key: pay_to_address_script(&address),
            address: Some(address),
            outpoint: TransactionOutpoint::new(Hash::from_u64_word(9), 0),
            amount: 1_000_000,
            block_daa_score,
            is_coinbase,
        }
        .into()
    }

    #[test]
    fn test_maturity_boundaries() {
        let params = MAINNET_NETWORK_PARAMS;

        let coinbase = entry(1_000, true);
        assert_eq!(coinbase.maturity(&params, 1_000), Maturity::Stasis);
        assert_eq!(coinbase.maturity(&params, 1_049), Maturity::Stasis);
        assert_eq!(coinbase.maturity(&params, 1_050), Maturity::Pending);
        assert_eq!(coinbase.maturity(&params, 1_099), Maturity::Pending);
        assert_eq!(coinbase.maturity(&params, 1_100), Maturity::Confirmed);

        let user = entry(1_000, false);
        assert_eq!(user.maturity(&params, 1_000), Maturity::Pending);
        assert_eq!(user.maturity(&params, 1_009), Maturity::Pending);
        assert_eq!(user.maturity(&params, 1_010), Maturity::Confirmed);

        let unaccepted = entry(UNACCEPTED_DAA_SCORE, false);
        assert!(unaccepted.is_unaccepted());
        assert_eq!(unaccepted.maturity(&params, u64::MAX), Maturity::Pending);
    }
}
