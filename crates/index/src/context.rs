//! Owns the enabled indexes over one shared store and drives them through
//! block connect and disconnect.

use std::sync::Arc;

use chainidx_log::log_warn;
use chainidx_primitives::Block;
use chainidx_storage::memory::MemoryStore;
use chainidx_storage::{Column, KeyValueStore, WriteBatch};

use crate::address_index::AddressIndex;
use crate::chain::BlockRef;
use crate::coins::{BlockCoinView, BlockUndo, CoinView};
use crate::config::{Backend, IndexConfig};
use crate::shutdown::ShutdownSignal;
use crate::spentindex::SpentIndex;
use crate::timestampindex::TimestampIndex;
use crate::IndexError;

pub type SharedStore = Arc<dyn KeyValueStore>;

pub const STORE_VERSION: u32 = 1;
const STORE_VERSION_KEY: &[u8] = b"index_store_version";

pub struct IndexContext {
    store: SharedStore,
    address: Option<AddressIndex<SharedStore>>,
    spent: Option<SpentIndex<SharedStore>>,
    timestamp: Option<TimestampIndex<SharedStore>>,
    shutdown: ShutdownSignal,
}

impl IndexContext {
    /// Applies the configured log settings, then opens the store the
    /// config selects.
    pub fn open(config: &IndexConfig) -> Result<Self, IndexError> {
        chainidx_log::init(config.log);
        if !config.any_enabled() {
            log_warn!("Every index is disabled; blocks will not be indexed");
        }
        let store: SharedStore = match config.backend {
            Backend::Memory => Arc::new(MemoryStore::new()),
            Backend::Fjall => open_fjall(config)?,
        };
        Self::with_store(store, config)
    }

    pub fn in_memory() -> Result<Self, IndexError> {
        Self::open(&IndexConfig::in_memory())
    }

    pub fn with_store(store: SharedStore, config: &IndexConfig) -> Result<Self, IndexError> {
        check_store_version(&*store)?;
        let shutdown = ShutdownSignal::new();
        let address = config
            .address_index
            .then(|| AddressIndex::with_shutdown(Arc::clone(&store), shutdown.clone()));
        let spent = config
            .spent_index
            .then(|| SpentIndex::with_undo_policy(Arc::clone(&store), config.spent_undo));
        let timestamp = config
            .timestamp_index
            .then(|| TimestampIndex::with_shutdown(Arc::clone(&store), shutdown.clone()));
        Ok(Self {
            store,
            address,
            spent,
            timestamp,
            shutdown,
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn address_index(&self) -> Option<&AddressIndex<SharedStore>> {
        self.address.as_ref()
    }

    pub fn spent_index(&self) -> Option<&SpentIndex<SharedStore>> {
        self.spent.as_ref()
    }

    pub fn timestamp_index(&self) -> Option<&TimestampIndex<SharedStore>> {
        self.timestamp.as_ref()
    }

    /// Shared with every scan the indexes run.
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Indexes `block` at `height`. `view` must resolve every output the
    /// block spends that was created by an earlier block.
    pub fn connect_block<V: CoinView + ?Sized>(
        &self,
        block: &Block,
        height: u32,
        view: &V,
    ) -> Result<(), IndexError> {
        let block_ref = BlockRef::new(&block.header, height);
        if self.address.is_some() || self.spent.is_some() {
            let mut coins = BlockCoinView::new(view);
            for (tx_index, tx) in block.transactions.iter().enumerate() {
                let tx_index = tx_index as u32;
                if let Some(index) = &self.address {
                    index.add_coins(tx_index, tx, &block_ref);
                    index.spend_coins(tx_index, tx, &block_ref, &coins);
                }
                if let Some(index) = &self.spent {
                    index.spend_coins(tx, &block_ref, &coins);
                }
                coins.add_outputs(tx);
            }
        }

        let mut first_error = None;
        if let Some(index) = &self.timestamp {
            keep_first(&mut first_error, index.write_block(&block_ref).map(|_| ()));
        }
        self.flush(&mut first_error);
        first_error.map_or(Ok(()), Err)
    }

    /// Reverses [`connect_block`](Self::connect_block) for the tip block.
    /// The timestamp index keeps its entries; readers filter them with
    /// [`ActiveChain`](crate::ActiveChain).
    pub fn disconnect_block(
        &self,
        block: &Block,
        height: u32,
        undo: &BlockUndo,
    ) -> Result<(), IndexError> {
        let spending: Vec<_> = block
            .transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| !tx.is_coinbase())
            .collect();
        if spending.len() != undo.txs.len() {
            return Err(IndexError::Corrupt("block undo does not match block"));
        }
        if spending
            .iter()
            .zip(&undo.txs)
            .any(|((_, tx), tx_undo)| tx.vin.len() != tx_undo.spent.len())
        {
            return Err(IndexError::Corrupt("transaction undo does not match inputs"));
        }

        let block_ref = BlockRef::new(&block.header, height);
        let mut undo_txs = undo.txs.iter().rev();
        for (tx_index, tx) in block.transactions.iter().enumerate().rev() {
            let tx_index = tx_index as u32;
            if let Some(index) = &self.address {
                for output_index in (0..tx.vout.len() as u32).rev() {
                    index.undo_coin_add(output_index, tx_index, tx, &block_ref);
                }
            }
            if tx.is_coinbase() {
                continue;
            }
            let Some(tx_undo) = undo_txs.next() else {
                break;
            };
            for (input_index, (input, coin)) in
                tx.vin.iter().zip(&tx_undo.spent).enumerate().rev()
            {
                if let Some(index) = &self.address {
                    index.undo_coin_spend(input_index as u32, tx_index, tx, coin, &block_ref);
                }
                if let Some(index) = &self.spent {
                    index.undo_coin_spend(input);
                }
            }
        }

        let mut first_error = None;
        self.flush(&mut first_error);
        first_error.map_or(Ok(()), Err)
    }

    fn flush(&self, first_error: &mut Option<IndexError>) {
        if let Some(index) = &self.address {
            keep_first(first_error, index.write_changes());
        }
        if let Some(index) = &self.spent {
            keep_first(first_error, index.write_changes());
        }
    }
}

fn keep_first(slot: &mut Option<IndexError>, result: Result<(), IndexError>) {
    if let Err(err) = result {
        slot.get_or_insert(err);
    }
}

fn check_store_version(store: &dyn KeyValueStore) -> Result<(), IndexError> {
    match store.get(Column::Meta, STORE_VERSION_KEY)? {
        Some(bytes) => {
            let version = <[u8; 4]>::try_from(bytes.as_slice())
                .map(u32::from_le_bytes)
                .map_err(|_| IndexError::Corrupt("invalid index store version"))?;
            if version != STORE_VERSION {
                return Err(IndexError::Config(format!(
                    "index store version {version} is not supported (expected {STORE_VERSION}); reindex required"
                )));
            }
            Ok(())
        }
        None => {
            let mut batch = WriteBatch::new();
            batch.put(Column::Meta, STORE_VERSION_KEY, STORE_VERSION.to_le_bytes());
            store.write_batch(&batch)?;
            Ok(())
        }
    }
}

#[cfg(feature = "fjall")]
fn open_fjall(config: &IndexConfig) -> Result<SharedStore, IndexError> {
    use chainidx_log::log_info;
    use chainidx_storage::fjall::{FjallOptions, FjallStore};
    use chainidx_storage::StoreError;

    let path = config.store_path();
    if config.reindex && path.exists() {
        log_info!("Wiping index store at {}", path.display());
        std::fs::remove_dir_all(&path).map_err(|err| {
            StoreError::Backend(format!("failed to wipe {}: {err}", path.display()))
        })?;
    }
    std::fs::create_dir_all(&path).map_err(|err| {
        StoreError::Backend(format!("failed to create {}: {err}", path.display()))
    })?;
    let options = FjallOptions {
        cache_bytes: Some(config.db_cache_bytes),
        ..FjallOptions::default()
    };
    let store = FjallStore::open_with_options(&path, options)?;
    log_info!("Opened index store at {}", path.display());
    Ok(Arc::new(store))
}

#[cfg(not(feature = "fjall"))]
fn open_fjall(_config: &IndexConfig) -> Result<SharedStore, IndexError> {
    Err(IndexError::Config(
        "fjall backend requested but chainidx-index was built without the fjall feature".to_string(),
    ))
}
