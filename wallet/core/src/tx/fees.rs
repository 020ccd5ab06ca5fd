//!
//! Transaction fee policy.
//!

use crate::result::Result;
use serde::{Deserialize, Serialize};

/// Transaction fees. Fees are comprised of 2 values:
///
/// `network` fees - mandatory fees derived from the transaction mass and
/// the fee rate, required for the transaction to be relayed.
/// `priority` fees - optional fees applied to the final outgoing transaction
/// in addition to `network` fees.
///
/// Fees can be:
/// - `SenderPays` - (standard) fees are added to outgoing transaction value
/// - `ReceiverPays` - final transaction fees, including priority fees,
///   are deducted from the single payment output. Fees of any batch
///   transactions preceding the final transaction are still paid by the sender.
///
/// NOTE: `ReceiverPays` fails during generation if the final transaction
/// fees leave the payment output below the dust threshold. Use estimation
/// to check that the payment amount is sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "priorityFee")]
pub enum Fees {
    /// Fee management disabled (sweep transactions, pays network fees only)
    None,
    /// fees are added to the transaction value
    SenderPays(u64),
    /// fees are subtracted from the transaction value
    ReceiverPays(u64),
}

impl Fees {
    pub fn is_none(&self) -> bool {
        matches!(self, Fees::None)
    }

    pub fn is_receiver_pays(&self) -> bool {
        matches!(self, Fees::ReceiverPays(_))
    }

    /// Priority fee amount in sompi, `0` for [`Fees::None`].
    pub fn priority_fee(&self) -> u64 {
        match self {
            Fees::None => 0,
            Fees::SenderPays(fee) | Fees::ReceiverPays(fee) => *fee,
        }
    }
}

/// Converts a positive `i64` value into `SenderPays` fees
/// and a negative `i64` value into `ReceiverPays` fees. I.e. `Fees::from(-100)`
/// results in priority fees that are deducted from the payment output.
impl From<i64> for Fees {
    fn from(fee: i64) -> Self {
        if fee < 0 { Fees::ReceiverPays(fee.unsigned_abs()) } else { Fees::SenderPays(fee as u64) }
    }
}

impl From<u64> for Fees {
    fn from(fee: u64) -> Self {
        Fees::SenderPays(fee)
    }
}

impl TryFrom<&str> for Fees {
    type Error = crate::error::Error;
    fn try_from(fee: &str) -> Result<Self> {
        let fee = fee.trim();
        if fee.is_empty() {
            Ok(Fees::None)
        } else if let Some(fee) = fee.strip_prefix('-') {
            Ok(Fees::ReceiverPays(crate::utils::try_kaspa_str_to_sompi(fee)?.unwrap_or(0)))
        } else {
            Ok(Fees::SenderPays(crate::utils::try_kaspa_str_to_sompi(fee)?.unwrap_or(0)))
        }
    }
}

impl TryFrom<String> for Fees {
    type Error = crate::error::Error;
    fn try_from(fee: String) -> Result<Self> {
        Self::try_from(fee.as_str())
    }
}
