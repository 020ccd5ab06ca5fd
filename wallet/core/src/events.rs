//!
//! Events emitted by the UTXO processor. This includes node connection
//! state as well as UTXO lifecycle and balance events produced by the
//! [`UtxoContext`] instances bound to the processor.
//!

use crate::imports::*;
use crate::storage::TransactionRecord;

/// Events emitted by the UTXO processor. All events are published on the
/// processor [`Multiplexer`] as a single tagged stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[serde(tag = "type", content = "data")]
pub enum Events {
    /// Successful node connection
    Connect {
        #[serde(rename = "networkId")]
        network_id: NetworkId,
        /// Kaspa node RPC url on which connection
        /// has been established
        url: Option<String>,
    },
    /// Node disconnection
    Disconnect {
        #[serde(rename = "networkId")]
        network_id: Option<NetworkId>,
        url: Option<String>,
    },
    /// Emitted after successful node connection
    /// after the initial state negotiation.
    ServerStatus {
        #[serde(rename = "networkId")]
        network_id: NetworkId,
        #[serde(rename = "serverVersion")]
        server_version: String,
        #[serde(rename = "isSynced")]
        is_synced: bool,
        url: Option<String>,
    },
    /// Successful start of [`UtxoProcessor`].
    /// This event signifies that the application can
    /// start interfacing with the UTXO processor.
    UtxoProcStart,
    /// [`UtxoProcessor`] has shut down.
    UtxoProcStop,
    /// General processing error (for example a failure
    /// while handling a notification). Safe to ignore,
    /// intended for logging.
    UtxoProcError { message: String },
    /// DAA score change
    DaaScoreChange {
        #[serde(rename = "currentDaaScore")]
        current_daa_score: u64,
    },
    /// New pending UTXO/transaction, or an outgoing
    /// transaction that has been submitted
    Pending { record: TransactionRecord },
    /// Pending UTXO has been removed (reorg)
    Reorg { record: TransactionRecord },
    /// Coinbase UTXO has been observed during the stasis
    /// period (or removed while in stasis).
    /// NOTE: These records should be ignored by clients.
    Stasis { record: TransactionRecord },
    /// Transaction has reached maturity
    Maturity { record: TransactionRecord },
    /// Emitted when a transaction has been discovered
    /// during the initial UTXO scan of tracked addresses
    /// (see [`UtxoContext::track_addresses()`](UtxoContext::track_addresses)).
    Discovery { record: TransactionRecord },
    /// A [`Balance`] update. Always follows the event
    /// describing the change that caused it.
    Balance {
        balance: Option<Balance>,
        /// Id of the [`UtxoContext`] the balance belongs to
        id: UtxoContextId,
    },
    /// General error
    Error { message: String },
}

impl Events {
    pub fn kind(&self) -> EventKind {
        EventKind::from(self)
    }
}

/// Discriminant of [`Events`], useful for filtering the event stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Connect,
    Disconnect,
    ServerStatus,
    UtxoProcStart,
    UtxoProcStop,
    UtxoProcError,
    DaaScoreChange,
    Pending,
    Reorg,
    Stasis,
    Maturity,
    Discovery,
    Balance,
    Error,
}

impl From<&Events> for EventKind {
    fn from(event: &Events) -> Self {
        match event {
            Events::Connect { .. } => EventKind::Connect,
            Events::Disconnect { .. } => EventKind::Disconnect,
            Events::ServerStatus { .. } => EventKind::ServerStatus,
            Events::UtxoProcStart => EventKind::UtxoProcStart,
            Events::UtxoProcStop => EventKind::UtxoProcStop,
            Events::UtxoProcError { .. } => EventKind::UtxoProcError,
            Events::DaaScoreChange { .. } => EventKind::DaaScoreChange,
            Events::Pending { .. } => EventKind::Pending,
            Events::Reorg { .. } => EventKind::Reorg,
            Events::Stasis { .. } => EventKind::Stasis,
            Events::Maturity { .. } => EventKind::Maturity,
            Events::Discovery { .. } => EventKind::Discovery,
            Events::Balance { .. } => EventKind::Balance,
            Events::Error { .. } => EventKind::Error,
        }
    }
}
