//!
//! Transaction generation and processing primitives.
//!

pub mod fees;
pub mod generator;
pub mod mass;
pub mod payment;

pub use self::fees::*;
pub use self::generator::*;
pub use self::mass::*;
pub use self::payment::*;
