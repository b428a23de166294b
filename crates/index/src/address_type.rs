//! Maps locking scripts and destinations to the (hash, type) pair that keys
//! the address index.

use chainidx_primitives::{Destination, Hash160};
use chainidx_script::standard::{
    classify_script_pubkey, ScriptType, P2PKH_HASH_RANGE, P2SH_HASH_RANGE,
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(u8)]
pub enum AddressType {
    #[default]
    Unknown = 0,
    P2Pkh = 1,
    P2Sh = 2,
}

impl AddressType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::P2Pkh),
            2 => Some(Self::P2Sh),
            _ => None,
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

/// Total: any script that is not P2PKH or P2SH yields the null hash with
/// [`AddressType::Unknown`].
pub fn hash_and_address_type(script_pubkey: &[u8]) -> (Hash160, AddressType) {
    match classify_script_pubkey(script_pubkey) {
        ScriptType::P2Sh => (copy_hash(&script_pubkey[P2SH_HASH_RANGE]), AddressType::P2Sh),
        ScriptType::P2Pkh => (
            copy_hash(&script_pubkey[P2PKH_HASH_RANGE]),
            AddressType::P2Pkh,
        ),
        _ => ([0u8; 20], AddressType::Unknown),
    }
}

pub fn hash_and_address_type_for_destination(destination: &Destination) -> (Hash160, AddressType) {
    match destination {
        Destination::PubKeyHash(hash) => (*hash, AddressType::P2Pkh),
        Destination::ScriptHash(hash) => (*hash, AddressType::P2Sh),
        Destination::None => ([0u8; 20], AddressType::Unknown),
    }
}

fn copy_hash(bytes: &[u8]) -> Hash160 {
    let mut out = [0u8; 20];
    out.copy_from_slice(bytes);
    out
}
