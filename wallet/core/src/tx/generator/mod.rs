//!
//! Transaction generator: produces chains of batch transactions
//! followed by a single final transaction.
//!

#[allow(clippy::module_inception)]
pub mod generator;
pub mod iterator;
pub mod pending;
pub mod settings;
pub mod stream;
pub mod summary;

pub use generator::*;
pub use iterator::*;
pub use pending::*;
pub use settings::*;
pub use stream::*;
pub use summary::*;

#[cfg(test)]
pub(crate) mod test;
