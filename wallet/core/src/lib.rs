//!
//! # Kaspa Wallet Core
//!
//! Transaction generation and UTXO lifecycle tracking for Kaspa wallets.
//!
//! The crate is organized around two subsystems:
//!
//! - [`tx::Generator`] turns a payment request into a lazy sequence of
//!   [`tx::PendingTransaction`]s. When the inputs required to fund the payment
//!   do not fit into a single transaction, the generator compounds them
//!   through a chain of *batch* transactions into a single *final* transaction.
//! - [`utxo::UtxoProcessor`] and [`utxo::UtxoContext`] ingest node notifications
//!   and maintain the balance state machine (stasis, pending, mature, spent)
//!   for a set of tracked addresses.
//!
//! The node itself is abstracted by the [`rpc::NodeConnector`] trait. Lifecycle
//! changes are published on a single [`events::Events`] bus.
//!

extern crate self as kaspa_wallet_core;

pub mod error;
pub mod events;
mod imports;
pub mod result;
pub mod rpc;
pub mod settings;
pub mod storage;
pub mod tx;
pub mod utils;
pub mod utxo;

pub use events::Events;
pub use kaspa_addresses::{Address, Prefix as AddressPrefix};
pub use result::Result;
pub use settings::EngineSettings;
