//! Serializable transaction formats used to hand unsigned transactions
//! to external signers and to read the signed result back.
//!
//! [`numeric`] encodes 64-bit quantities as JSON numbers, [`string`]
//! encodes them as decimal strings for consumers that cannot represent
//! the full `u64` range.

pub mod numeric;
pub mod string;

#[cfg(test)]
mod test;
