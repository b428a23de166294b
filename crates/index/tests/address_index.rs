use std::collections::HashMap;
use std::sync::Arc;

use chainidx_index::{
    AddressIndex, AddressType, BlockRef, Coin, IndexError, ShutdownSignal, UnspentValue,
};
use chainidx_primitives::{OutPoint, Transaction, TxIn, TxOut};
use chainidx_script::standard::{p2pkh_script, p2sh_script};
use chainidx_storage::memory::MemoryStore;
use chainidx_storage::{Column, KeyValueStore, SeekVisitor, StoreError, WriteBatch};

const H: [u8; 20] = [0x48; 20];
const G: [u8; 20] = [0x47; 20];

fn block(height: u32) -> BlockRef {
    BlockRef {
        hash: [height as u8; 32],
        prev_hash: Some([height.wrapping_sub(1) as u8; 32]),
        height,
        time: 1_600_000_000 + height,
    }
}

fn spend_tx(inputs: &[OutPoint], outputs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: 1,
        vin: inputs
            .iter()
            .map(|prevout| TxIn {
                prevout: prevout.clone(),
                script_sig: vec![0x51],
                sequence: u32::MAX,
            })
            .collect(),
        vout: outputs,
        lock_time: 0,
    }
}

fn pay(value: i64, script_pubkey: Vec<u8>) -> TxOut {
    TxOut {
        value,
        script_pubkey,
    }
}

fn funding() -> OutPoint {
    OutPoint::new([0xee; 32], 0)
}

struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _column: Column, _key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    fn write_batch(&self, _batch: &WriteBatch) -> Result<(), StoreError> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    fn for_each_from<'a>(
        &self,
        _column: Column,
        _start: &[u8],
        _visitor: &mut SeekVisitor<'a>,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

#[test]
fn add_coins_indexes_standard_outputs_only() {
    let store = Arc::new(MemoryStore::new());
    let index = AddressIndex::new(Arc::clone(&store));
    let tx = spend_tx(
        &[funding()],
        vec![pay(500, p2pkh_script(&H)), pay(0, vec![0x6a, 0x01, 0x00])],
    );

    index.add_coins(1, &tx, &block(100));
    assert_eq!(index.pending_len(), 2);
    index.write_changes().expect("flush");
    assert_eq!(index.pending_len(), 0);

    let activity = index
        .read_address_index(&H, AddressType::P2Pkh, 0, 0)
        .expect("read");
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].amount, 500);
    assert_eq!(activity[0].key.height, 100);
    assert_eq!(activity[0].key.tx_index, 1);
    assert_eq!(activity[0].key.txid, tx.txid());
    assert_eq!(activity[0].key.index, 0);
    assert!(!activity[0].key.is_spend);

    let unspent = index
        .read_address_unspent(&H, AddressType::P2Pkh)
        .expect("unspent");
    assert_eq!(unspent.len(), 1);
    assert_eq!(unspent[0].key.outpoint(), OutPoint::new(tx.txid(), 0));
    assert_eq!(
        unspent[0].value,
        UnspentValue {
            amount: 500,
            script_pubkey: p2pkh_script(&H),
            height: 100,
        }
    );
    assert_eq!(store.len(Column::AddressActivity), 1);
}

#[test]
fn spend_then_undo_restores_prior_state() {
    let store = Arc::new(MemoryStore::new());
    let index = AddressIndex::new(Arc::clone(&store));

    let t1 = spend_tx(&[funding()], vec![pay(500, p2pkh_script(&H))]);
    index.add_coins(1, &t1, &block(100));
    index.write_changes().expect("flush 100");

    let t1_out = OutPoint::new(t1.txid(), 0);
    let t2 = spend_tx(&[t1_out.clone()], vec![pay(400, p2pkh_script(&G))]);
    let mut view = HashMap::new();
    view.insert(t1_out.clone(), t1.vout[0].clone());
    index.add_coins(1, &t2, &block(101));
    index.spend_coins(1, &t2, &block(101), &view);
    index.write_changes().expect("flush 101");

    let activity = index
        .read_address_index(&H, AddressType::P2Pkh, 0, 0)
        .expect("read");
    let summary: Vec<_> = activity
        .iter()
        .map(|entry| (entry.key.height, entry.amount, entry.key.is_spend))
        .collect();
    assert_eq!(summary, vec![(100, 500, false), (101, -500, true)]);
    assert_eq!(activity[1].key.txid, t2.txid());
    assert!(index
        .read_address_unspent(&H, AddressType::P2Pkh)
        .expect("unspent")
        .is_empty());
    let balance = index.read_balance(&H, AddressType::P2Pkh).expect("balance");
    assert_eq!(balance.balance, 0);
    assert_eq!(balance.received, 500);

    let undo = Coin {
        output: t1.vout[0].clone(),
        height: 100,
        is_coinbase: false,
    };
    index.undo_coin_add(0, 1, &t2, &block(101));
    index.undo_coin_spend(0, 1, &t2, &undo, &block(101));
    index.write_changes().expect("flush undo");

    let activity = index
        .read_address_index(&H, AddressType::P2Pkh, 0, 0)
        .expect("read");
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].amount, 500);
    let unspent = index
        .read_address_unspent(&H, AddressType::P2Pkh)
        .expect("unspent");
    assert_eq!(unspent.len(), 1);
    assert_eq!(unspent[0].key.outpoint(), t1_out);
    assert_eq!(unspent[0].value.height, 100);
    assert!(index
        .read_address_index(&G, AddressType::P2Pkh, 0, 0)
        .expect("read g")
        .is_empty());
    assert!(!store.is_empty(Column::AddressUnspent));
}

#[test]
fn height_bounds_are_inclusive_and_zero_is_unbounded() {
    let store = Arc::new(MemoryStore::new());
    let index = AddressIndex::new(Arc::clone(&store));
    for (seq, height) in [10u32, 20, 30].into_iter().enumerate() {
        let tx = spend_tx(
            &[OutPoint::new([seq as u8; 32], 0)],
            vec![pay(i64::from(height), p2pkh_script(&H))],
        );
        index.add_coins(0, &tx, &block(height));
    }
    index.write_changes().expect("flush");

    let heights = |start, end| -> Vec<u32> {
        index
            .read_address_index(&H, AddressType::P2Pkh, start, end)
            .expect("read")
            .iter()
            .map(|entry| entry.key.height)
            .collect()
    };
    assert_eq!(heights(0, 0), vec![10, 20, 30]);
    assert_eq!(heights(15, 25), vec![20]);
    assert_eq!(heights(10, 20), vec![10, 20]);
    assert_eq!(heights(0, 20), vec![10, 20]);
    assert_eq!(heights(20, 0), vec![20, 30]);
    assert_eq!(heights(31, 0), Vec::<u32>::new());
}

#[test]
fn address_types_do_not_share_history() {
    let store = Arc::new(MemoryStore::new());
    let index = AddressIndex::new(Arc::clone(&store));
    let tx = spend_tx(
        &[funding()],
        vec![pay(1, p2pkh_script(&H)), pay(2, p2sh_script(&H))],
    );
    index.add_coins(0, &tx, &block(5));
    index.write_changes().expect("flush");

    let pkh = index
        .read_address_index(&H, AddressType::P2Pkh, 0, 0)
        .expect("p2pkh");
    let sh = index
        .read_address_index(&H, AddressType::P2Sh, 0, 0)
        .expect("p2sh");
    assert_eq!(pkh.len(), 1);
    assert_eq!(pkh[0].amount, 1);
    assert_eq!(sh.len(), 1);
    assert_eq!(sh[0].amount, 2);
    assert!(index
        .read_address_index(&G, AddressType::P2Pkh, 0, 0)
        .expect("other")
        .is_empty());
}

#[test]
fn create_and_spend_in_one_flush_leaves_no_unspent_entry() {
    let store = Arc::new(MemoryStore::new());
    let index = AddressIndex::new(Arc::clone(&store));
    let t1 = spend_tx(&[funding()], vec![pay(500, p2pkh_script(&H))]);
    let t1_out = OutPoint::new(t1.txid(), 0);
    let t2 = spend_tx(&[t1_out.clone()], vec![pay(500, p2pkh_script(&G))]);
    let mut view = HashMap::new();
    view.insert(t1_out, t1.vout[0].clone());

    index.add_coins(1, &t1, &block(7));
    index.add_coins(2, &t2, &block(7));
    index.spend_coins(2, &t2, &block(7), &view);
    index.write_changes().expect("flush");

    assert!(index
        .read_address_unspent(&H, AddressType::P2Pkh)
        .expect("unspent")
        .is_empty());
    assert_eq!(
        index
            .read_address_index(&H, AddressType::P2Pkh, 0, 0)
            .expect("read")
            .len(),
        2
    );
}

#[test]
fn missing_prevout_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    let index = AddressIndex::new(Arc::clone(&store));
    let tx = spend_tx(&[funding()], Vec::new());
    let view: HashMap<OutPoint, TxOut> = HashMap::new();
    index.spend_coins(1, &tx, &block(3), &view);
    assert_eq!(index.pending_len(), 0);
}

#[test]
fn failed_flush_reports_and_clears_buffers() {
    let index = AddressIndex::new(FailingStore);
    let tx = spend_tx(&[funding()], vec![pay(500, p2pkh_script(&H))]);
    index.add_coins(0, &tx, &block(1));
    assert_eq!(index.pending_len(), 2);

    let err = index.write_changes().expect_err("flush must fail");
    assert!(matches!(err, IndexError::FlushFailed(_)));
    assert!(err.is_fatal());
    assert_eq!(index.pending_len(), 0);
    index.write_changes().expect("nothing left to write");
}

#[test]
fn shutdown_interrupts_scans() {
    let store = Arc::new(MemoryStore::new());
    let shutdown = ShutdownSignal::new();
    let index = AddressIndex::with_shutdown(Arc::clone(&store), shutdown.clone());
    let tx = spend_tx(&[funding()], vec![pay(500, p2pkh_script(&H))]);
    index.add_coins(0, &tx, &block(1));
    index.write_changes().expect("flush");

    shutdown.request();
    let err = index
        .read_address_index(&H, AddressType::P2Pkh, 0, 0)
        .expect_err("interrupted");
    assert!(matches!(err, IndexError::Interrupted));
    assert!(!err.is_fatal());
}

#[test]
fn corrupt_activity_value_is_reported() {
    let store = Arc::new(MemoryStore::new());
    let index = AddressIndex::new(Arc::clone(&store));
    let tx = spend_tx(&[funding()], vec![pay(500, p2pkh_script(&H))]);
    index.add_coins(0, &tx, &block(1));
    index.write_changes().expect("flush");

    let key = index
        .read_address_index(&H, AddressType::P2Pkh, 0, 0)
        .expect("read")[0]
        .key;
    let mut batch = WriteBatch::new();
    batch.put(Column::AddressActivity, key.encode(), [1u8, 2, 3]);
    store.write_batch(&batch).expect("commit");

    let err = index
        .read_address_index(&H, AddressType::P2Pkh, 0, 0)
        .expect_err("corrupt");
    assert!(matches!(err, IndexError::Corrupt(_)));
}

#[test]
fn undo_coin_add_is_exact_inverse() {
    let store = Arc::new(MemoryStore::new());
    let index = AddressIndex::new(Arc::clone(&store));
    let earlier = spend_tx(&[OutPoint::new([0x01; 32], 0)], vec![pay(9, p2pkh_script(&H))]);
    index.add_coins(0, &earlier, &block(4));
    index.write_changes().expect("flush 4");
    let before_activity = index
        .read_address_index(&H, AddressType::P2Pkh, 0, 0)
        .expect("read");
    let before_unspent = index
        .read_address_unspent(&H, AddressType::P2Pkh)
        .expect("unspent");

    let tx = spend_tx(
        &[funding()],
        vec![pay(500, p2pkh_script(&H)), pay(3, p2sh_script(&G))],
    );
    index.add_coins(2, &tx, &block(5));
    index.write_changes().expect("flush 5");
    for output_index in (0..tx.vout.len() as u32).rev() {
        index.undo_coin_add(output_index, 2, &tx, &block(5));
    }
    index.write_changes().expect("flush undo");

    assert_eq!(
        index
            .read_address_index(&H, AddressType::P2Pkh, 0, 0)
            .expect("read"),
        before_activity
    );
    assert_eq!(
        index
            .read_address_unspent(&H, AddressType::P2Pkh)
            .expect("unspent"),
        before_unspent
    );
    assert!(index
        .read_address_index(&G, AddressType::P2Sh, 0, 0)
        .expect("read g")
        .is_empty());
    assert_eq!(store.len(Column::AddressActivity), 1);
    assert_eq!(store.len(Column::AddressUnspent), 1);
}
