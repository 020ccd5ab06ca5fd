//!
//! This file contains most common imports that
//! are used internally in the wallet transaction engine.
//!

pub use crate::error::Error;
pub use crate::events::Events;
pub use crate::result::Result;
pub use crate::rpc::{DynNodeConnector, NodeConnector};
pub use crate::storage::*;
pub use crate::tx::MassCombinationStrategy;
pub use crate::utxo::balance::Balance;
pub use crate::utxo::{Maturity, NetworkParams, OutgoingTransaction, UtxoContext, UtxoContextId, UtxoProcessor};
pub use crate::utils;

pub use ahash::{AHashMap, AHashSet};
pub use async_trait::async_trait;
pub use borsh::{BorshDeserialize, BorshSerialize};
pub use dashmap::{DashMap, DashSet};
pub use futures::{select_biased, FutureExt, StreamExt};
pub use kaspa_addresses::{Address, Prefix};
pub use kaspa_consensus_client::{UtxoEntry, UtxoEntryId, UtxoEntryReference};
pub use kaspa_consensus_core::network::{NetworkId, NetworkType};
pub use kaspa_consensus_core::tx::{ScriptPublicKey, TransactionId, TransactionIndexType};
pub use pad::PadStr;
pub use separator::Separatable;
pub use serde::{Deserialize, Serialize};
pub use std::collections::{HashMap, HashSet, VecDeque};
pub use std::str::FromStr;
pub use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
pub use std::sync::{Arc, Mutex, MutexGuard, RwLock};
pub use workflow_core::channel::{Channel, DuplexChannel, Multiplexer, MultiplexerChannel, Receiver, Sender};
pub use workflow_log::prelude::*;
