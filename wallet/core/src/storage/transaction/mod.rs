//!
//! Wallet transaction records.
//!

pub mod data;
pub mod kind;
pub mod record;
pub mod utxo;

pub use data::*;
pub use kind::*;
pub use record::*;
pub use utxo::*;
