//!
//! Consensus primitives consumed by the wallet transaction engine:
//! transactions, UTXO entries, network identifiers and mass rules.
//!

pub mod config;
pub mod constants;
pub mod hashing;
pub mod mass;
pub mod network;
pub mod subnets;
pub mod tx;
