//!
//! Transaction records produced by the UTXO lifecycle.
//!
//! Persistence of records is left to the client; this module only
//! defines the record types and their serialization.
//!

pub mod transaction;

pub use transaction::{TransactionData, TransactionId, TransactionKind, TransactionRecord, UtxoRecord};
