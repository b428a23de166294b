//! Per-address activity history and unspent-output set.
//!
//! Mutations are buffered in memory while a block is connected or
//! disconnected and written by [`AddressIndex::write_changes`] as three
//! atomic batches: activity writes, then unspent upserts and erases, then
//! activity erases.

use std::ops::ControlFlow;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chainidx_log::{log_error, log_trace};
use chainidx_primitives::encoding::{DecodeError, Decoder, Encoder};
use chainidx_primitives::{Hash160, Transaction};
use chainidx_storage::{Column, KeyValueStore, WriteBatch};

use crate::address_type::{hash_and_address_type, AddressType};
use crate::buffer::{collapse, stage, Entry};
use crate::chain::BlockRef;
use crate::coins::{Coin, CoinView};
use crate::keys::{
    address_height_prefix, address_prefix, AddressActivityKey, AddressUnspentKey,
};
use crate::shutdown::ShutdownSignal;
use crate::IndexError;

pub const NAME: &str = "addressindex";

/// What is stored under an [`AddressUnspentKey`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnspentValue {
    pub amount: i64,
    pub script_pubkey: Vec<u8>,
    /// Height of the block that created the output.
    pub height: u32,
}

impl UnspentValue {
    pub fn encode(&self) -> Vec<u8> {
        let mut encoder = Encoder::with_capacity(8 + 1 + self.script_pubkey.len() + 4);
        encoder.write_i64_le(self.amount);
        encoder.write_var_bytes(&self.script_pubkey);
        encoder.write_u32_le(self.height);
        encoder.into_inner()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = Decoder::new(bytes);
        let amount = decoder.read_i64_le()?;
        let script_pubkey = decoder.read_var_bytes()?;
        let height = decoder.read_u32_le()?;
        if !decoder.is_empty() {
            return Err(DecodeError::TrailingBytes);
        }
        Ok(Self {
            amount,
            script_pubkey,
            height,
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AddressActivity {
    pub key: AddressActivityKey,
    /// Positive for a receive, negative for a spend.
    pub amount: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddressUnspent {
    pub key: AddressUnspentKey,
    pub value: UnspentValue,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AddressBalance {
    pub balance: i64,
    /// Sum of every positive change.
    pub received: i64,
}

#[derive(Default)]
struct PendingWrites {
    activity: Vec<(AddressActivityKey, i64)>,
    unspent: Vec<(AddressUnspentKey, Entry<UnspentValue>)>,
    erased_activity: Vec<AddressActivityKey>,
}

impl PendingWrites {
    fn len(&self) -> usize {
        self.activity.len() + self.unspent.len() + self.erased_activity.len()
    }
}

pub struct AddressIndex<S> {
    store: S,
    pending: Mutex<PendingWrites>,
    shutdown: ShutdownSignal,
}

impl<S> AddressIndex<S> {
    pub fn new(store: S) -> Self {
        Self::with_shutdown(store, ShutdownSignal::new())
    }

    pub fn with_shutdown(store: S, shutdown: ShutdownSignal) -> Self {
        Self {
            store,
            pending: Mutex::new(PendingWrites::default()),
            shutdown,
        }
    }

    /// Number of buffered mutations not yet written.
    pub fn pending_len(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, PendingWrites> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: KeyValueStore> AddressIndex<S> {
    /// Records every standard output of `tx` as received activity and as a
    /// new unspent entry.
    pub fn add_coins(&self, tx_index: u32, tx: &Transaction, block: &BlockRef) {
        let txid = tx.txid();
        let mut pending = self.pending();
        for (index, output) in tx.vout.iter().enumerate() {
            let (hash, address_type) = hash_and_address_type(&output.script_pubkey);
            if !address_type.is_known() {
                continue;
            }
            let index = index as u32;
            pending.activity.push((
                AddressActivityKey {
                    address_type,
                    hash,
                    height: block.height,
                    tx_index,
                    txid,
                    index,
                    is_spend: false,
                },
                output.value,
            ));
            pending.unspent.push((
                AddressUnspentKey {
                    address_type,
                    hash,
                    txid,
                    index,
                },
                Entry::Present(UnspentValue {
                    amount: output.value,
                    script_pubkey: output.script_pubkey.clone(),
                    height: block.height,
                }),
            ));
        }
    }

    /// Records every input of `tx` that spends a standard output as negative
    /// activity and erases the consumed unspent entry.
    pub fn spend_coins<V: CoinView + ?Sized>(
        &self,
        tx_index: u32,
        tx: &Transaction,
        block: &BlockRef,
        view: &V,
    ) {
        if tx.is_coinbase() {
            return;
        }
        let txid = tx.txid();
        let mut pending = self.pending();
        for (index, input) in tx.vin.iter().enumerate() {
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
            let (hash, address_type) = hash_and_address_type(&prev.script_pubkey);
            if !address_type.is_known() {
                continue;
            }
            pending.activity.push((
                AddressActivityKey {
                    address_type,
                    hash,
                    height: block.height,
                    tx_index,
                    txid,
                    index: index as u32,
                    is_spend: true,
                },
                -prev.value,
            ));
            pending.unspent.push((
                AddressUnspentKey {
                    address_type,
                    hash,
                    txid: input.prevout.hash,
                    index: input.prevout.index,
                },
                Entry::Tombstone,
            ));
        }
    }

    /// Reverses the spend of input `input_index` of `tx`: erases its
    /// activity entry and restores the consumed output from `undo`.
    pub fn undo_coin_spend(
        &self,
        input_index: u32,
        tx_index: u32,
        tx: &Transaction,
        undo: &Coin,
        block: &BlockRef,
    ) {
        let Some(input) = tx.vin.get(input_index as usize) else {
            log_error!(target: NAME, "undo of missing input {input_index}");
            return;
        };
        let (hash, address_type) = hash_and_address_type(&undo.output.script_pubkey);
        if !address_type.is_known() {
            return;
        }
        let mut pending = self.pending();
        pending.erased_activity.push(AddressActivityKey {
            address_type,
            hash,
            height: block.height,
            tx_index,
            txid: tx.txid(),
            index: input_index,
            is_spend: true,
        });
        pending.unspent.push((
            AddressUnspentKey {
                address_type,
                hash,
                txid: input.prevout.hash,
                index: input.prevout.index,
            },
            Entry::Present(UnspentValue {
                amount: undo.output.value,
                script_pubkey: undo.output.script_pubkey.clone(),
                height: undo.height,
            }),
        ));
    }

    /// Reverses the creation of output `output_index` of `tx`.
    pub fn undo_coin_add(&self, output_index: u32, tx_index: u32, tx: &Transaction, block: &BlockRef) {
        let Some(output) = tx.vout.get(output_index as usize) else {
            log_error!(target: NAME, "undo of missing output {output_index}");
            return;
        };
        let (hash, address_type) = hash_and_address_type(&output.script_pubkey);
        if !address_type.is_known() {
            return;
        }
        let txid = tx.txid();
        let mut pending = self.pending();
        pending.erased_activity.push(AddressActivityKey {
            address_type,
            hash,
            height: block.height,
            tx_index,
            txid,
            index: output_index,
            is_spend: false,
        });
        pending.unspent.push((
            AddressUnspentKey {
                address_type,
                hash,
                txid,
                index: output_index,
            },
            Entry::Tombstone,
        ));
    }

    /// Flushes every buffered mutation. The buffers are empty afterwards
    /// whether or not the writes succeeded.
    pub fn write_changes(&self) -> Result<(), IndexError> {
        let pending = std::mem::take(&mut *self.pending());
        let mut failures = Vec::new();

        if !pending.activity.is_empty() {
            let mut batch = WriteBatch::with_capacity(pending.activity.len());
            for (key, amount) in &pending.activity {
                batch.put(Column::AddressActivity, key.encode(), amount.to_le_bytes());
            }
            if let Err(err) = self.store.write_batch(&batch) {
                failures.push(format!("failed to write address activity: {err}"));
            }
        }

        if !pending.unspent.is_empty() {
            let unspent = collapse(pending.unspent);
            let mut batch = WriteBatch::with_capacity(unspent.len());
            stage(
                &mut batch,
                Column::AddressUnspent,
                &unspent,
                AddressUnspentKey::encode,
                UnspentValue::encode,
            );
            if let Err(err) = self.store.write_batch(&batch) {
                failures.push(format!("failed to update address unspent set: {err}"));
            }
        }

        if !pending.erased_activity.is_empty() {
            let mut batch = WriteBatch::with_capacity(pending.erased_activity.len());
            for key in &pending.erased_activity {
                batch.delete(Column::AddressActivity, key.encode());
            }
            if let Err(err) = self.store.write_batch(&batch) {
                failures.push(format!("failed to erase address activity: {err}"));
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        let message = failures.join("; ");
        log_error!(target: NAME, "{message}");
        Err(IndexError::FlushFailed(message))
    }

    /// Activity for one address in ascending (height, tx_index, txid, index,
    /// is_spend) order. A zero `start` or `end` leaves that side unbounded;
    /// both bounds are inclusive.
    ///
    /// A shutdown request stops the scan with [`IndexError::Interrupted`] and
    /// the entries gathered so far are dropped.
    pub fn read_address_index(
        &self,
        hash: &Hash160,
        address_type: AddressType,
        start: u32,
        end: u32,
    ) -> Result<Vec<AddressActivity>, IndexError> {
        let prefix = address_prefix(address_type, hash);
        let seek = address_height_prefix(address_type, hash, start);
        let mut out = Vec::new();
        let mut failure = None;
        self.store
            .for_each_from(Column::AddressActivity, &seek, &mut |key, value| {
                if !key.starts_with(&prefix) {
                    return Ok(ControlFlow::Break(()));
                }
                if let Err(err) = self.shutdown.check() {
                    failure = Some(err);
                    return Ok(ControlFlow::Break(()));
                }
                let Some(key) = AddressActivityKey::decode(key) else {
                    failure = Some(IndexError::Corrupt("invalid address activity key"));
                    return Ok(ControlFlow::Break(()));
                };
                if end > 0 && key.height > end {
                    return Ok(ControlFlow::Break(()));
                }
                let Ok(amount) = <[u8; 8]>::try_from(value).map(i64::from_le_bytes) else {
                    failure = Some(IndexError::Corrupt("invalid address activity value"));
                    return Ok(ControlFlow::Break(()));
                };
                out.push(AddressActivity { key, amount });
                Ok(ControlFlow::Continue(()))
            })?;
        if let Some(err) = failure {
            return Err(err);
        }
        log_trace!(
            target: NAME,
            "read {} activity entries for {}",
            out.len(),
            hex(hash)
        );
        Ok(out)
    }

    /// Current unspent outputs of one address, ordered by (txid, index).
    pub fn read_address_unspent(
        &self,
        hash: &Hash160,
        address_type: AddressType,
    ) -> Result<Vec<AddressUnspent>, IndexError> {
        let prefix = address_prefix(address_type, hash);
        let mut out = Vec::new();
        let mut failure = None;
        self.store
            .for_each_from(Column::AddressUnspent, &prefix, &mut |key, value| {
                if !key.starts_with(&prefix) {
                    return Ok(ControlFlow::Break(()));
                }
                if let Err(err) = self.shutdown.check() {
                    failure = Some(err);
                    return Ok(ControlFlow::Break(()));
                }
                let Some(key) = AddressUnspentKey::decode(key) else {
                    failure = Some(IndexError::Corrupt("invalid address unspent key"));
                    return Ok(ControlFlow::Break(()));
                };
                let Ok(value) = UnspentValue::decode(value) else {
                    failure = Some(IndexError::Corrupt("invalid address unspent value"));
                    return Ok(ControlFlow::Break(()));
                };
                out.push(AddressUnspent { key, value });
                Ok(ControlFlow::Continue(()))
            })?;
        match failure {
            Some(err) => Err(err),
            None => Ok(out),
        }
    }

    pub fn read_balance(
        &self,
        hash: &Hash160,
        address_type: AddressType,
    ) -> Result<AddressBalance, IndexError> {
        let mut balance = AddressBalance::default();
        for entry in self.read_address_index(hash, address_type, 0, 0)? {
            balance.balance += entry.amount;
            if entry.amount > 0 {
                balance.received += entry.amount;
            }
        }
        Ok(balance)
    }
}

/// Display form of a hash: bytes reversed, as block explorers print them.
pub(crate) fn hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes.iter().rev() {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspent_value_roundtrip_and_trailing_bytes() {
        let value = UnspentValue {
            amount: 500,
            script_pubkey: vec![0x76, 0xa9],
            height: 100,
        };
        let mut bytes = value.encode();
        assert_eq!(bytes.len(), 8 + 1 + 2 + 4);
        assert_eq!(UnspentValue::decode(&bytes), Ok(value));
        bytes.push(0);
        assert_eq!(UnspentValue::decode(&bytes), Err(DecodeError::TrailingBytes));
    }

    #[test]
    fn hex_prints_reversed_bytes() {
        assert_eq!(hex(&[0x01, 0xab]), "ab01");
    }
}
