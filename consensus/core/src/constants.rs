/// TX_VERSION is the current latest supported transaction version.
pub const TX_VERSION: u16 = 0;

/// SOMPI_PER_KASPA is the number of sompi in one kaspa (1 KAS).
pub const SOMPI_PER_KASPA: u64 = 100_000_000;

/// The parameter for scaling inverse KAS value to mass units (KIP-0009)
pub const STORAGE_MASS_PARAMETER: u64 = SOMPI_PER_KASPA * 10_000;

/// MAX_SOMPI is the maximum transaction amount allowed in sompi.
pub const MAX_SOMPI: u64 = 29_000_000_000 * SOMPI_PER_KASPA;

/// MAX_TX_IN_SEQUENCE_NUM is the maximum sequence number the sequence field
/// of a transaction input can be.
pub const MAX_TX_IN_SEQUENCE_NUM: u64 = u64::MAX;

/// Block DAA score assigned to UTXO entries produced by transactions that
/// have been submitted but not yet observed in the DAG.
pub const UNACCEPTED_DAA_SCORE: u64 = u64::MAX;
