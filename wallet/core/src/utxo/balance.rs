//!
//! UtxoContext balances.
//!

use crate::imports::*;
use workflow_log::style;

pub enum DeltaStyle {
    Mature,
    Pending,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    #[default]
    NoChange = 0,
    Increase,
    Decrease,
}

impl Delta {
    pub fn style(&self, s: &str, delta_style: DeltaStyle) -> String {
        match self {
            Delta::NoChange => "".to_string() + s,
            Delta::Increase => style(s).green().to_string(),
            Delta::Decrease => {
                if matches!(delta_style, DeltaStyle::Mature) {
                    style(s).red().to_string()
                } else {
                    style(s).dim().to_string()
                }
            }
        }
    }
}

impl From<std::cmp::Ordering> for Delta {
    fn from(o: std::cmp::Ordering) -> Self {
        match o {
            std::cmp::Ordering::Less => Delta::Decrease,
            std::cmp::Ordering::Greater => Delta::Increase,
            std::cmp::Ordering::Equal => Delta::NoChange,
        }
    }
}

impl From<i64> for Delta {
    fn from(delta: i64) -> Self {
        delta.cmp(&0).into()
    }
}

/// [`UtxoContext`] balance.
///
/// `mature + pending + outgoing` always equals the total value of the entries
/// owned by the context, and the three utxo counts partition the tracked
/// entries (outgoing entries are counted separately by the context).
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Amount (in sompi) available for spending. Includes entries
    /// reserved by a generator that have not been submitted yet.
    pub mature: u64,
    /// Amount received and pending maturity (coinbase entries in stasis included).
    pub pending: u64,
    /// Amount consumed by submitted transactions that have not yet
    /// been confirmed by the network.
    pub outgoing: u64,
    pub mature_utxo_count: usize,
    pub pending_utxo_count: usize,
    pub stasis_utxo_count: usize,
    /// Change of `mature` relative to the previously published balance.
    pub mature_delta: i64,
    /// Change of `pending` relative to the previously published balance.
    pub pending_delta: i64,
}

impl Balance {
    pub fn new(
        mature: u64,
        pending: u64,
        outgoing: u64,
        mature_utxo_count: usize,
        pending_utxo_count: usize,
        stasis_utxo_count: usize,
    ) -> Self {
        Self { mature, pending, outgoing, mature_utxo_count, pending_utxo_count, stasis_utxo_count, mature_delta: 0, pending_delta: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.mature == 0 && self.pending == 0
    }

    /// Sum of all balance partitions.
    pub fn total(&self) -> u64 {
        self.mature + self.pending + self.outgoing
    }

    pub fn delta(&mut self, previous: &Option<Balance>) {
        if let Some(previous) = previous {
            self.mature_delta = self.mature as i64 - previous.mature as i64;
            self.pending_delta = self.pending as i64 - previous.pending as i64;
        } else {
            self.mature_delta = 0;
            self.pending_delta = 0;
        }
    }

    /// Compares amounts and counts, ignoring deltas.
    pub fn same_as(&self, other: &Balance) -> bool {
        self.mature == other.mature
            && self.pending == other.pending
            && self.outgoing == other.outgoing
            && self.mature_utxo_count == other.mature_utxo_count
            && self.pending_utxo_count == other.pending_utxo_count
            && self.stasis_utxo_count == other.stasis_utxo_count
    }

    pub fn to_balance_strings(&self, network_type: &NetworkType, padding: Option<usize>) -> BalanceStrings {
        (Some(self), network_type, padding).into()
    }
}

pub struct BalanceStrings {
    pub mature: String,
    pub pending: Option<String>,
}

impl From<(Option<&Balance>, &NetworkType, Option<usize>)> for BalanceStrings {
    fn from((balance, network_type, padding): (Option<&Balance>, &NetworkType, Option<usize>)) -> Self {
        let suffix = network_type.suffix();
        if let Some(balance) = balance {
            let mut mature = utils::sompi_to_kaspa_string(balance.mature);
            let mut pending = if balance.pending > 0 { Some(utils::sompi_to_kaspa_string(balance.pending)) } else { None };
            if let Some(padding) = padding {
                mature = mature.pad_to_width(padding);
                pending = pending.map(|pending| pending.pad_to_width(padding));
            }
            Self {
                mature: format!("{} {}", Delta::from(balance.mature_delta).style(&mature, DeltaStyle::Mature), suffix),
                pending: pending
                    .map(|pending| format!("{} {}", Delta::from(balance.pending_delta).style(&pending, DeltaStyle::Pending), suffix)),
            }
        } else {
            Self { mature: format!("N/A {suffix}"), pending: None }
        }
    }
}

impl std::fmt::Display for BalanceStrings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(pending) = &self.pending {
            write!(f, "{} ({} pending)", self.mature, pending)
        } else {
            write!(f, "{}", self.mature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_delta() {
        let previous = Some(Balance::new(100, 50, 0, 1, 1, 0));
        let mut balance = Balance::new(80, 70, 20, 1, 1, 0);
        balance.delta(&previous);
        assert_eq!(balance.mature_delta, -20);
        assert_eq!(balance.pending_delta, 20);
        assert_eq!(balance.total(), 170);
        assert!(!balance.same_as(previous.as_ref().unwrap()));

        balance.delta(&None);
        assert_eq!(balance.mature_delta, 0);
        assert_eq!(Delta::from(-5i64), Delta::Decrease);
    }

    #[test]
    fn test_balance_strings() {
        let balance = Balance::new(150_000_000, 0, 0, 1, 0, 0);
        let strings = balance.to_balance_strings(&NetworkType::Testnet, None);
        assert_eq!(strings.to_string(), "1.5 TKAS");

        let balance = Balance::new(100_000_000, 50_000_000, 0, 1, 1, 0);
        let strings = balance.to_balance_strings(&NetworkType::Mainnet, None);
        assert_eq!(strings.to_string(), "1 KAS (0.5 pending)");

        let strings = BalanceStrings::from((None, &NetworkType::Simnet, None));
        assert_eq!(strings.mature, "N/A SKAS");
    }
}
