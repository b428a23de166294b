//! Read-only access to the outputs a block's inputs consume.

use std::collections::HashMap;
use std::hash::BuildHasher;

use chainidx_primitives::{OutPoint, Transaction, TxOut};

pub trait CoinView {
    /// The output `prevout` refers to, if it is known.
    fn spent_output(&self, prevout: &OutPoint) -> Option<TxOut>;
}

impl<S: BuildHasher> CoinView for HashMap<OutPoint, TxOut, S> {
    fn spent_output(&self, prevout: &OutPoint) -> Option<TxOut> {
        self.get(prevout).cloned()
    }
}

impl<S: BuildHasher> CoinView for HashMap<OutPoint, Coin, S> {
    fn spent_output(&self, prevout: &OutPoint) -> Option<TxOut> {
        self.get(prevout).map(|coin| coin.output.clone())
    }
}

impl<T: CoinView + ?Sized> CoinView for &T {
    fn spent_output(&self, prevout: &OutPoint) -> Option<TxOut> {
        (**self).spent_output(prevout)
    }
}

/// A spent output as recorded in block undo data.
#[derive(Clone, Debug, PartialEq)]
pub struct Coin {
    pub output: TxOut,
    /// Height of the block that created the output.
    pub height: u32,
    pub is_coinbase: bool,
}

/// Undo data for one non-coinbase transaction: one coin per input, in input
/// order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TxUndo {
    pub spent: Vec<Coin>,
}

/// Undo data for a block: one [`TxUndo`] per non-coinbase transaction, in
/// block order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockUndo {
    pub txs: Vec<TxUndo>,
}

/// Layers the outputs created earlier in the same block over a base view.
pub struct BlockCoinView<'a, V: ?Sized> {
    base: &'a V,
    created: HashMap<OutPoint, TxOut>,
}

impl<'a, V: CoinView + ?Sized> BlockCoinView<'a, V> {
    pub fn new(base: &'a V) -> Self {
        Self {
            base,
            created: HashMap::new(),
        }
    }

    pub fn add_outputs(&mut self, tx: &Transaction) {
        let txid = tx.txid();
        for (index, output) in tx.vout.iter().enumerate() {
            self.created
                .insert(OutPoint::new(txid, index as u32), output.clone());
        }
    }
}

impl<V: CoinView + ?Sized> CoinView for BlockCoinView<'_, V> {
    fn spent_output(&self, prevout: &OutPoint) -> Option<TxOut> {
        self.created
            .get(prevout)
            .cloned()
            .or_else(|| self.base.spent_output(prevout))
    }
}
