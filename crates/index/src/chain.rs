use std::collections::HashSet;
use std::hash::BuildHasher;
use std::sync::Arc;

use chainidx_primitives::{BlockHeader, Hash256};

/// The block-level facts the indexes need about a connected block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockRef {
    pub hash: Hash256,
    /// `None` for the genesis block.
    pub prev_hash: Option<Hash256>,
    pub height: u32,
    /// Header time as mined.
    pub time: u32,
}

impl BlockRef {
    pub fn new(header: &BlockHeader, height: u32) -> Self {
        let prev_hash = if header.is_genesis() {
            None
        } else {
            Some(header.prev_block)
        };
        Self {
            hash: header.hash(),
            prev_hash,
            height,
            time: header.time,
        }
    }
}

/// Answers whether a block is on the currently active chain.
pub trait ActiveChain {
    fn contains(&self, hash: &Hash256) -> bool;
}

impl<S: BuildHasher> ActiveChain for HashSet<Hash256, S> {
    fn contains(&self, hash: &Hash256) -> bool {
        HashSet::contains(self, hash)
    }
}

impl<T: ActiveChain + ?Sized> ActiveChain for &T {
    fn contains(&self, hash: &Hash256) -> bool {
        (**self).contains(hash)
    }
}

impl<T: ActiveChain + ?Sized> ActiveChain for Arc<T> {
    fn contains(&self, hash: &Hash256) -> bool {
        self.as_ref().contains(hash)
    }
}

/// Adapts a predicate to [`ActiveChain`].
pub struct ChainFn<F>(pub F);

impl<F: Fn(&Hash256) -> bool> ActiveChain for ChainFn<F> {
    fn contains(&self, hash: &Hash256) -> bool {
        (self.0)(hash)
    }
}
