//! Maps a spent output (txid, vout) to the input that consumed it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chainidx_log::{log_error, log_trace};
use chainidx_primitives::{Hash160, Hash256, OutPoint, Transaction, TxIn};
use chainidx_storage::{Column, KeyValueStore, WriteBatch};

use crate::address_index::hex;
use crate::address_type::{hash_and_address_type, AddressType};
use crate::buffer::{collapse, stage, Entry};
use crate::chain::BlockRef;
use crate::coins::CoinView;
use crate::keys::SpentKey;
use crate::IndexError;

pub const NAME: &str = "spentindex";

const SPENT_VALUE_LEN: usize = 72;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SpentValue {
    /// Spending transaction.
    pub txid: Hash256,
    pub input_index: u32,
    /// Height of the block containing the spending transaction.
    pub height: u32,
    pub amount: i64,
    pub address_type: AddressType,
    pub address_hash: Hash160,
}

impl SpentValue {
    pub fn encode(&self) -> [u8; SPENT_VALUE_LEN] {
        let mut out = [0u8; SPENT_VALUE_LEN];
        out[0..32].copy_from_slice(&self.txid);
        out[32..36].copy_from_slice(&self.input_index.to_le_bytes());
        out[36..40].copy_from_slice(&self.height.to_le_bytes());
        out[40..48].copy_from_slice(&self.amount.to_le_bytes());
        out[48..52].copy_from_slice(&u32::from(self.address_type.as_u8()).to_le_bytes());
        out[52..72].copy_from_slice(&self.address_hash);
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SPENT_VALUE_LEN {
            return None;
        }
        let address_type = u32::from_le_bytes(bytes[48..52].try_into().ok()?);
        Some(Self {
            txid: bytes[0..32].try_into().ok()?,
            input_index: u32::from_le_bytes(bytes[32..36].try_into().ok()?),
            height: u32::from_le_bytes(bytes[36..40].try_into().ok()?),
            amount: i64::from_le_bytes(bytes[40..48].try_into().ok()?),
            address_type: AddressType::from_u8(u8::try_from(address_type).ok()?)?,
            address_hash: bytes[52..72].try_into().ok()?,
        })
    }
}

/// What disconnecting a block does to the spent index.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SpentUndoPolicy {
    /// Leave records in place; a later reconnect overwrites them.
    #[default]
    Retain,
    /// Erase the record of every un-spent input.
    Tombstone,
}

pub struct SpentIndex<S> {
    store: S,
    pending: Mutex<Vec<(SpentKey, Entry<SpentValue>)>>,
    undo_policy: SpentUndoPolicy,
}

impl<S> SpentIndex<S> {
    pub fn new(store: S) -> Self {
        Self::with_undo_policy(store, SpentUndoPolicy::default())
    }

    pub fn with_undo_policy(store: S, undo_policy: SpentUndoPolicy) -> Self {
        Self {
            store,
            pending: Mutex::new(Vec::new()),
            undo_policy,
        }
    }

    pub fn undo_policy(&self) -> SpentUndoPolicy {
        self.undo_policy
    }

    pub fn pending_len(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, Vec<(SpentKey, Entry<SpentValue>)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: KeyValueStore> SpentIndex<S> {
    /// Buffers one record per input of `tx`. Inputs paying to non-standard
    /// scripts are recorded with the null hash and an unknown type.
    pub fn spend_coins<V: CoinView + ?Sized>(&self, tx: &Transaction, block: &BlockRef, view: &V) {
        if tx.is_coinbase() {
            return;
        }
        let txid = tx.txid();
        let mut pending = self.pending();
        for (input_index, input) in tx.vin.iter().enumerate() {
            let Some(prev) = view.spent_output(&input.prevout) else {
                log_error!(
                    target: NAME,
                    "missing spent output {}:{} for tx {}",
                    hex(&input.prevout.hash),
                    input.prevout.index,
                    hex(&txid)
                );
                continue;
            };
            let (address_hash, address_type) = hash_and_address_type(&prev.script_pubkey);
            pending.push((
                SpentKey::from(&input.prevout),
                Entry::Present(SpentValue {
                    txid,
                    input_index: input_index as u32,
                    height: block.height,
                    amount: prev.value,
                    address_type,
                    address_hash,
                }),
            ));
        }
    }

    pub fn undo_coin_spend(&self, input: &TxIn) {
        match self.undo_policy {
            SpentUndoPolicy::Retain => {
                log_trace!(
                    target: NAME,
                    "retaining record for {}:{}",
                    hex(&input.prevout.hash),
                    input.prevout.index
                );
            }
            SpentUndoPolicy::Tombstone => {
                self.pending()
                    .push((SpentKey::from(&input.prevout), Entry::Tombstone));
            }
        }
    }

    /// Writes every buffered record as one atomic batch. The buffer is empty
    /// afterwards whether or not the write succeeded.
    pub fn write_changes(&self) -> Result<(), IndexError> {
        let pending = std::mem::take(&mut *self.pending());
        if pending.is_empty() {
            return Ok(());
        }
        let entries = collapse(pending);
        let mut batch = WriteBatch::with_capacity(entries.len());
        stage(
            &mut batch,
            Column::Spent,
            &entries,
            SpentKey::encode,
            SpentValue::encode,
        );
        if let Err(err) = self.store.write_batch(&batch) {
            let message = format!("failed to write spent index: {err}");
            log_error!(target: NAME, "{message}");
            return Err(IndexError::FlushFailed(message));
        }
        Ok(())
    }

    pub fn read_spent(&self, outpoint: &OutPoint) -> Result<Option<SpentValue>, IndexError> {
        let key = SpentKey::from(outpoint).encode();
        let Some(bytes) = self.store.get(Column::Spent, &key)? else {
            return Ok(None);
        };
        SpentValue::decode(&bytes)
            .map(Some)
            .ok_or(IndexError::Corrupt("invalid spent index value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_layout_is_fixed_width_little_endian() {
        let value = SpentValue {
            txid: [0x11; 32],
            input_index: 2,
            height: 0x0102_0304,
            amount: -5,
            address_type: AddressType::P2Sh,
            address_hash: [0x22; 20],
        };
        let bytes = value.encode();
        assert_eq!(bytes.len(), 72);
        assert_eq!(&bytes[32..36], &[2, 0, 0, 0]);
        assert_eq!(&bytes[36..40], &[4, 3, 2, 1]);
        assert_eq!(&bytes[48..52], &[2, 0, 0, 0]);
        assert_eq!(SpentValue::decode(&bytes), Some(value));
    }

    #[test]
    fn decode_rejects_short_values_and_unknown_types() {
        assert_eq!(SpentValue::decode(&[0u8; 40]), None);
        let mut bytes = [0u8; SPENT_VALUE_LEN];
        bytes[48] = 9;
        assert_eq!(SpentValue::decode(&bytes), None);
    }
}
