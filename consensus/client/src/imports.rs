pub use crate::error::Error;
pub use borsh::{BorshDeserialize, BorshSerialize};
pub use kaspa_addresses::Address;
pub use kaspa_consensus_core::tx as cctx;
pub use kaspa_consensus_core::tx::{ScriptPublicKey, TransactionId, TransactionIndexType};
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
