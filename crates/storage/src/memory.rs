//! Single-keyspace in-memory backend.
//!
//! All columns share one ordered map; each physical key is the column tag
//! followed by the logical key.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::{PoisonError, RwLock};

use crate::{Column, KeyValueStore, SeekVisitor, StoreError, WriteBatch, WriteOp};

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, column: Column) -> usize {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .range(vec![column.tag()]..)
            .take_while(|(key, _)| key.first() == Some(&column.tag()))
            .count()
    }

    pub fn is_empty(&self, column: Column) -> bool {
        self.len(column) == 0
    }
}

fn physical_key(column: Column, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 1);
    out.push(column.tag());
    out.extend_from_slice(key);
    out
}

impl KeyValueStore for MemoryStore {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(&physical_key(column, key)).cloned())
    }

    fn write_batch(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for op in batch.iter() {
            match op {
                WriteOp::Put { column, key, value } => {
                    guard.insert(
                        physical_key(*column, key.as_slice()),
                        value.as_slice().to_vec(),
                    );
                }
                WriteOp::Delete { column, key } => {
                    guard.remove(&physical_key(*column, key.as_slice()));
                }
            }
        }
        Ok(())
    }

    fn for_each_from<'a>(
        &self,
        column: Column,
        start: &[u8],
        visitor: &mut SeekVisitor<'a>,
    ) -> Result<(), StoreError> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in guard.range(physical_key(column, start)..) {
            if key.first() != Some(&column.tag()) {
                break;
            }
            if let ControlFlow::Break(()) = visitor(&key[1..], value.as_slice())? {
                break;
            }
        }
        Ok(())
    }
}
