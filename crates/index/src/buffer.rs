use std::collections::BTreeMap;

use chainidx_storage::{Column, WriteBatch, WriteKey, WriteValue};

/// A pending mutation: either a value to upsert or an erase marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Entry<T> {
    Present(T),
    Tombstone,
}

impl<T> Entry<T> {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Entry::Tombstone)
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            Entry::Present(value) => Some(value),
            Entry::Tombstone => None,
        }
    }
}

/// Collapses an ordered list of mutations to the last one per key, so a
/// batch never carries two ops for the same key.
pub(crate) fn collapse<K: Ord, V>(entries: Vec<(K, Entry<V>)>) -> BTreeMap<K, Entry<V>> {
    let mut out = BTreeMap::new();
    for (key, entry) in entries {
        out.insert(key, entry);
    }
    out
}

/// Translates collapsed mutations into put/delete ops.
pub(crate) fn stage<K, V, KB, VB>(
    batch: &mut WriteBatch,
    column: Column,
    entries: &BTreeMap<K, Entry<V>>,
    encode_key: impl Fn(&K) -> KB,
    encode_value: impl Fn(&V) -> VB,
) where
    KB: Into<WriteKey>,
    VB: Into<WriteValue>,
{
    for (key, entry) in entries {
        match entry {
            Entry::Present(value) => batch.put(column, encode_key(key), encode_value(value)),
            Entry::Tombstone => batch.delete(column, encode_key(key)),
        }
    }
}
