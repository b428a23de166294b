#![cfg(feature = "fjall")]

use std::ops::ControlFlow;

use chainidx_storage::fjall::FjallStore;
use chainidx_storage::{Column, KeyValueStore, WriteBatch};

#[test]
fn fjall_smoke_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FjallStore::open(dir.path()).expect("open fjall");

    let mut batch = WriteBatch::new();
    batch.put(Column::Meta, b"key", b"value");
    batch.put(Column::Spent, b"prefix:2", b"b");
    batch.put(Column::Spent, b"prefix:1", b"a");
    batch.put(Column::Spent, b"other", b"c");
    store.write_batch(&batch).expect("batch commit");

    assert_eq!(
        store.get(Column::Meta, b"key").expect("get"),
        Some(b"value".to_vec())
    );
    assert!(store.get(Column::Spent, b"key").expect("get").is_none());

    let entries = store.scan_prefix(Column::Spent, b"prefix:").expect("scan");
    assert_eq!(
        entries,
        vec![
            (b"prefix:1".to_vec(), b"a".to_vec()),
            (b"prefix:2".to_vec(), b"b".to_vec()),
        ]
    );

    let mut batch = WriteBatch::new();
    batch.delete(Column::Meta, b"key");
    store.write_batch(&batch).expect("batch commit");
    assert!(store.get(Column::Meta, b"key").expect("get").is_none());
}

#[test]
fn fjall_seek_scans_in_byte_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FjallStore::open(dir.path()).expect("open fjall");

    let mut batch = WriteBatch::new();
    for height in [300u32, 5, 70_000, 256] {
        batch.put(Column::TimestampForward, height.to_be_bytes(), []);
    }
    store.write_batch(&batch).expect("batch commit");

    let mut seen = Vec::new();
    store
        .for_each_from(Column::TimestampForward, &6u32.to_be_bytes(), &mut |key, _| {
            let height = u32::from_be_bytes(key.try_into().expect("4 bytes"));
            if height >= 70_000 {
                return Ok(ControlFlow::Break(()));
            }
            seen.push(height);
            Ok(ControlFlow::Continue(()))
        })
        .expect("scan");
    assert_eq!(seen, vec![256, 300]);
}
