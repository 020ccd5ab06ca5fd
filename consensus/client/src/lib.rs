pub mod error;
mod imports;
pub mod result;
pub mod serializable;
mod utxo;

pub use utxo::*;
