//!
//! UTXO tracking: [`UtxoProcessor`] ingests node notifications and routes
//! them to the [`UtxoContext`] instances that maintain the balance state
//! machine of their tracked addresses.
//!

pub mod balance;
pub mod context;
pub mod entry;
pub mod iterator;
pub mod outgoing;
pub mod processor;
pub mod settings;

pub use balance::{Balance, BalanceStrings};
pub use context::{Reservation, UtxoContext, UtxoContextId, UtxoEntryState};
pub use entry::{Maturity, UtxoEntryReferenceExtension};
pub use iterator::UtxoIterator;
pub use kaspa_consensus_client::{UtxoEntry, UtxoEntryId, UtxoEntryReference};
pub use outgoing::OutgoingTransaction;
pub use processor::UtxoProcessor;
pub use settings::{NetworkParams, NetworkParamsMap};
