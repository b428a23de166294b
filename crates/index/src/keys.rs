//! Key layouts for every index column.
//!
//! Integer fields are big-endian so that byte order equals the logical order
//! of the key tuple; iterating a column in byte order yields entries grouped
//! by address and sorted by height, or sorted by logical timestamp.

use chainidx_primitives::{Hash160, Hash256, OutPoint};

use crate::address_type::AddressType;

pub const ADDRESS_PREFIX_LEN: usize = 1 + 20;
pub const ADDRESS_ACTIVITY_KEY_LEN: usize = ADDRESS_PREFIX_LEN + 4 + 4 + 32 + 4 + 1;
pub const ADDRESS_UNSPENT_KEY_LEN: usize = ADDRESS_PREFIX_LEN + 32 + 4;
pub const SPENT_KEY_LEN: usize = 32 + 4;
pub const TIMESTAMP_KEY_LEN: usize = 4 + 32;

/// type ‖ hash; the common prefix of every key belonging to one address.
pub fn address_prefix(address_type: AddressType, hash: &Hash160) -> [u8; ADDRESS_PREFIX_LEN] {
    let mut out = [0u8; ADDRESS_PREFIX_LEN];
    out[0] = address_type.as_u8();
    out[1..21].copy_from_slice(hash);
    out
}

/// type ‖ hash ‖ height; seek position for a height-bounded scan.
pub fn address_height_prefix(
    address_type: AddressType,
    hash: &Hash160,
    height: u32,
) -> [u8; ADDRESS_PREFIX_LEN + 4] {
    let mut out = [0u8; ADDRESS_PREFIX_LEN + 4];
    out[..ADDRESS_PREFIX_LEN].copy_from_slice(&address_prefix(address_type, hash));
    out[ADDRESS_PREFIX_LEN..].copy_from_slice(&height.to_be_bytes());
    out
}

/// One balance change of one address.
///
/// Field order matches the encoded layout so the derived `Ord` agrees with
/// byte order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AddressActivityKey {
    pub address_type: AddressType,
    pub hash: Hash160,
    pub height: u32,
    pub tx_index: u32,
    pub txid: Hash256,
    /// Output index for a receive, input index for a spend.
    pub index: u32,
    pub is_spend: bool,
}

impl AddressActivityKey {
    pub fn encode(&self) -> [u8; ADDRESS_ACTIVITY_KEY_LEN] {
        let mut out = [0u8; ADDRESS_ACTIVITY_KEY_LEN];
        out[0..21].copy_from_slice(&address_prefix(self.address_type, &self.hash));
        out[21..25].copy_from_slice(&self.height.to_be_bytes());
        out[25..29].copy_from_slice(&self.tx_index.to_be_bytes());
        out[29..61].copy_from_slice(&self.txid);
        out[61..65].copy_from_slice(&self.index.to_be_bytes());
        out[65] = u8::from(self.is_spend);
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ADDRESS_ACTIVITY_KEY_LEN {
            return None;
        }
        let is_spend = match bytes[65] {
            0 => false,
            1 => true,
            _ => return None,
        };
        Some(Self {
            address_type: AddressType::from_u8(bytes[0])?,
            hash: bytes[1..21].try_into().ok()?,
            height: u32::from_be_bytes(bytes[21..25].try_into().ok()?),
            tx_index: u32::from_be_bytes(bytes[25..29].try_into().ok()?),
            txid: bytes[29..61].try_into().ok()?,
            index: u32::from_be_bytes(bytes[61..65].try_into().ok()?),
            is_spend,
        })
    }
}

/// An unspent output currently paying to an address.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AddressUnspentKey {
    pub address_type: AddressType,
    pub hash: Hash160,
    pub txid: Hash256,
    pub index: u32,
}

impl AddressUnspentKey {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.index)
    }

    pub fn encode(&self) -> [u8; ADDRESS_UNSPENT_KEY_LEN] {
        let mut out = [0u8; ADDRESS_UNSPENT_KEY_LEN];
        out[0..21].copy_from_slice(&address_prefix(self.address_type, &self.hash));
        out[21..53].copy_from_slice(&self.txid);
        out[53..57].copy_from_slice(&self.index.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ADDRESS_UNSPENT_KEY_LEN {
            return None;
        }
        Some(Self {
            address_type: AddressType::from_u8(bytes[0])?,
            hash: bytes[1..21].try_into().ok()?,
            txid: bytes[21..53].try_into().ok()?,
            index: u32::from_be_bytes(bytes[53..57].try_into().ok()?),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SpentKey {
    pub txid: Hash256,
    pub index: u32,
}

impl SpentKey {
    pub fn encode(&self) -> [u8; SPENT_KEY_LEN] {
        let mut out = [0u8; SPENT_KEY_LEN];
        out[0..32].copy_from_slice(&self.txid);
        out[32..36].copy_from_slice(&self.index.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SPENT_KEY_LEN {
            return None;
        }
        Some(Self {
            txid: bytes[0..32].try_into().ok()?,
            index: u32::from_be_bytes(bytes[32..36].try_into().ok()?),
        })
    }
}

impl From<&OutPoint> for SpentKey {
    fn from(outpoint: &OutPoint) -> Self {
        Self {
            txid: outpoint.hash,
            index: outpoint.index,
        }
    }
}

/// Forward timestamp entry; the value stored under it is empty.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TimestampKey {
    pub timestamp: u32,
    pub block_hash: Hash256,
}

impl TimestampKey {
    pub fn encode(&self) -> [u8; TIMESTAMP_KEY_LEN] {
        let mut out = [0u8; TIMESTAMP_KEY_LEN];
        out[0..4].copy_from_slice(&self.timestamp.to_be_bytes());
        out[4..36].copy_from_slice(&self.block_hash);
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != TIMESTAMP_KEY_LEN {
            return None;
        }
        Some(Self {
            timestamp: u32::from_be_bytes(bytes[0..4].try_into().ok()?),
            block_hash: bytes[4..36].try_into().ok()?,
        })
    }
}

pub fn encode_block_timestamp(timestamp: u32) -> [u8; 4] {
    timestamp.to_be_bytes()
}

pub fn decode_block_timestamp(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.try_into().ok()?))
}
