//! Core block/transaction types and consensus serialization.

pub mod address;
pub mod block;
pub mod encoding;
pub mod hash;
pub mod outpoint;
pub mod transaction;

pub use address::{decode_destination, encode_destination, AddressError, Destination, Network};
pub use block::{Block, BlockHeader};
pub use hash::{sha256, sha256d, Hash160, Hash256};
pub use outpoint::OutPoint;
pub use transaction::{Transaction, TxIn, TxOut};
