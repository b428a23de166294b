//! Logical block timestamps.
//!
//! Each connected block gets a timestamp strictly greater than its parent's,
//! so iterating the forward map yields blocks in connection order even when
//! header times go backwards.

use std::ops::ControlFlow;

use chainidx_log::{log_debug, log_error, log_warn};
use chainidx_primitives::Hash256;
use chainidx_storage::{Column, KeyValueStore, WriteBatch};

use crate::address_index::hex;
use crate::chain::{ActiveChain, BlockRef};
use crate::keys::{decode_block_timestamp, encode_block_timestamp, TimestampKey};
use crate::shutdown::ShutdownSignal;
use crate::IndexError;

pub const NAME: &str = "timestampindex";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockTimestamp {
    pub block_hash: Hash256,
    pub timestamp: u32,
}

pub struct TimestampIndex<S> {
    store: S,
    shutdown: ShutdownSignal,
}

impl<S> TimestampIndex<S> {
    pub fn new(store: S) -> Self {
        Self::with_shutdown(store, ShutdownSignal::new())
    }

    pub fn with_shutdown(store: S, shutdown: ShutdownSignal) -> Self {
        Self { store, shutdown }
    }
}

impl<S: KeyValueStore> TimestampIndex<S> {
    /// Assigns `block` its logical timestamp and records it in both maps.
    /// Returns the assigned timestamp. A parent that cannot be read fails
    /// the call before anything is written; an unknown parent counts as 0.
    pub fn write_block(&self, block: &BlockRef) -> Result<u32, IndexError> {
        let prev_ts = match block.prev_hash {
            Some(prev_hash) => match self.block_logical_time(&prev_hash)? {
                Some(ts) => ts,
                None => {
                    log_warn!(
                        target: NAME,
                        "no logical timestamp for previous block {}",
                        hex(&prev_hash)
                    );
                    0
                }
            },
            None => 0,
        };

        let mut logical_ts = block.time;
        if logical_ts <= prev_ts {
            logical_ts = prev_ts
                .checked_add(1)
                .ok_or(IndexError::Corrupt("logical timestamp overflow"))?;
            log_debug!(
                target: NAME,
                "previous logical timestamp is newer actual {} previous {} logical {}",
                block.time,
                prev_ts,
                logical_ts
            );
        }

        let forward = TimestampKey {
            timestamp: logical_ts,
            block_hash: block.hash,
        };
        let mut batch = WriteBatch::with_capacity(1);
        batch.put(Column::TimestampForward, forward.encode(), []);
        if let Err(err) = self.store.write_batch(&batch) {
            let message = format!("failed to write timestamp index: {err}");
            log_error!(target: NAME, "{message}");
            return Err(IndexError::FlushFailed(message));
        }

        let mut batch = WriteBatch::with_capacity(1);
        batch.put(
            Column::TimestampReverse,
            block.hash,
            encode_block_timestamp(logical_ts),
        );
        if let Err(err) = self.store.write_batch(&batch) {
            let message = format!("failed to write block timestamp: {err}");
            log_error!(target: NAME, "{message}");
            return Err(IndexError::FlushFailed(message));
        }
        Ok(logical_ts)
    }

    /// Blocks with `low <= timestamp < high`, ascending by timestamp then
    /// hash. With `active`, blocks off the active chain are left out.
    ///
    /// Returns [`IndexError::Interrupted`] without partial results if
    /// shutdown is requested mid-scan.
    pub fn read_range(
        &self,
        high: u32,
        low: u32,
        active: Option<&dyn ActiveChain>,
    ) -> Result<Vec<BlockTimestamp>, IndexError> {
        let mut out = Vec::new();
        let mut failure = None;
        self.store.for_each_from(
            Column::TimestampForward,
            &low.to_be_bytes(),
            &mut |key, _| {
                if let Err(err) = self.shutdown.check() {
                    failure = Some(err);
                    return Ok(ControlFlow::Break(()));
                }
                let Some(key) = TimestampKey::decode(key) else {
                    failure = Some(IndexError::Corrupt("invalid timestamp index key"));
                    return Ok(ControlFlow::Break(()));
                };
                if key.timestamp >= high {
                    return Ok(ControlFlow::Break(()));
                }
                if active.map_or(true, |chain| chain.contains(&key.block_hash)) {
                    out.push(BlockTimestamp {
                        block_hash: key.block_hash,
                        timestamp: key.timestamp,
                    });
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;
        match failure {
            Some(err) => Err(err),
            None => Ok(out),
        }
    }

    pub fn block_logical_time(&self, hash: &Hash256) -> Result<Option<u32>, IndexError> {
        let Some(bytes) = self.store.get(Column::TimestampReverse, hash)? else {
            return Ok(None);
        };
        decode_block_timestamp(&bytes)
            .map(Some)
            .ok_or(IndexError::Corrupt("invalid block timestamp entry"))
    }
}
