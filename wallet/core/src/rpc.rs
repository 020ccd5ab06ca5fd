//!
//! Node connector interface consumed by the UTXO processor.
//!
//! The wire protocol is not part of this crate: any client able to fetch
//! UTXOs by address, relay notifications and submit transactions can drive
//! the processor by implementing [`NodeConnector`].
//!

use crate::imports::*;
use kaspa_consensus_core::tx::Transaction;
use kaspa_hashes::Hash;

/// Identifier of a notification listener registered with a [`NodeConnector`].
pub type ListenerId = u64;

/// Connection state changes published by the connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ctl {
    /// Connection to the node has been established.
    Connect,
    /// Connection to the node has been lost or closed.
    Disconnect,
}

/// Notification subscription scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    UtxosChanged(Vec<Address>),
    VirtualDaaScoreChanged,
    VirtualChainChanged,
}

/// UTXO set changes affecting subscribed addresses.
#[derive(Clone, Debug, Default)]
pub struct UtxosChangedNotification {
    pub added: Vec<UtxoEntry>,
    pub removed: Vec<UtxoEntry>,
}

/// Transactions accepted by a chain block.
#[derive(Clone, Debug)]
pub struct AcceptedTransactionIds {
    pub accepting_block_hash: Hash,
    pub accepted_transaction_ids: Vec<TransactionId>,
}

#[derive(Clone, Debug, Default)]
pub struct VirtualChainChangedNotification {
    pub removed_chain_block_hashes: Vec<Hash>,
    pub added_chain_block_hashes: Vec<Hash>,
    pub accepted_transaction_ids: Vec<AcceptedTransactionIds>,
}

/// Notifications relayed by the connector to registered listeners.
#[derive(Clone, Debug)]
pub enum Notification {
    UtxosChanged(UtxosChangedNotification),
    VirtualDaaScoreChanged(u64),
    VirtualChainChanged(VirtualChainChangedNotification),
}

/// Node information obtained on connection.
#[derive(Clone, Debug)]
pub struct ServerInfo {
    pub server_version: String,
    pub network_id: NetworkId,
    pub is_synced: bool,
    pub has_utxo_index: bool,
    pub virtual_daa_score: u64,
}

/// Interface of the node connection used by the UTXO processor.
#[async_trait]
pub trait NodeConnector: Send + Sync {
    /// Url of the connected node, if known.
    fn url(&self) -> Option<String>;

    fn is_connected(&self) -> bool;

    /// Multiplexer publishing [`Ctl`] connection state changes.
    fn ctl_multiplexer(&self) -> Multiplexer<Ctl>;

    /// Registers a listener; notifications for the scopes started on
    /// the returned id are delivered to `sender`.
    fn register_new_listener(&self, sender: Sender<Notification>) -> ListenerId;

    async fn unregister_listener(&self, id: ListenerId) -> Result<()>;

    async fn start_notify(&self, id: ListenerId, scope: Scope) -> Result<()>;

    async fn stop_notify(&self, id: ListenerId, scope: Scope) -> Result<()>;

    async fn get_server_info(&self) -> Result<ServerInfo>;

    async fn get_utxos_by_addresses(&self, addresses: Vec<Address>) -> Result<Vec<UtxoEntry>>;

    /// Submits a signed transaction. Network-level rejections (orphan,
    /// double spend, insufficient fee) are returned as errors.
    async fn submit_transaction(&self, transaction: Transaction) -> Result<TransactionId>;
}

/// Type alias for [`dyn NodeConnector`](NodeConnector).
pub type DynNodeConnector = dyn NodeConnector;
