//! Address, spent-output and logical-timestamp indexes over a blockchain.
//!
//! The indexes share one ordered key/value store. Block connection buffers
//! mutations through the per-transaction operations and flushes them once
//! per block; see [`IndexContext`] for the driver.

pub mod address_index;
pub mod address_type;
pub mod buffer;
pub mod chain;
pub mod coins;
pub mod config;
pub mod context;
mod error;
pub mod keys;
pub mod shutdown;
pub mod spentindex;
pub mod timestampindex;

pub use address_index::{AddressActivity, AddressBalance, AddressIndex, AddressUnspent, UnspentValue};
pub use address_type::{hash_and_address_type, hash_and_address_type_for_destination, AddressType};
pub use buffer::Entry;
pub use chain::{ActiveChain, BlockRef, ChainFn};
pub use coins::{BlockCoinView, BlockUndo, Coin, CoinView, TxUndo};
pub use config::{Backend, IndexConfig};
pub use context::{IndexContext, SharedStore};
pub use error::IndexError;
pub use shutdown::ShutdownSignal;
pub use spentindex::{SpentIndex, SpentUndoPolicy, SpentValue};
pub use timestampindex::{BlockTimestamp, TimestampIndex};
