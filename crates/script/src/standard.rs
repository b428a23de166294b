//! Standard script classification utilities.

use chainidx_primitives::hash::Hash160;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScriptType {
    P2Pkh,
    P2Sh,
    Unknown,
}

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const PUSH_20: u8 = 0x14;

/// Byte range of the 20-byte hash inside a P2PKH script.
pub const P2PKH_HASH_RANGE: std::ops::Range<usize> = 3..23;
/// Byte range of the 20-byte hash inside a P2SH script.
pub const P2SH_HASH_RANGE: std::ops::Range<usize> = 2..22;

/// Matches the exact canonical byte layouts. Anything else, including
/// scripts that merely start like a standard one, is `Unknown`.
pub fn classify_script_pubkey(script: &[u8]) -> ScriptType {
    if is_p2pkh(script) {
        ScriptType::P2Pkh
    } else if is_p2sh(script) {
        ScriptType::P2Sh
    } else {
        ScriptType::Unknown
    }
}

pub fn p2pkh_script(hash: &Hash160) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, PUSH_20]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2sh_script(hash: &Hash160) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[OP_HASH160, PUSH_20]);
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

fn is_p2pkh(script: &[u8]) -> bool {
    matches!(
        script,
        [OP_DUP, OP_HASH160, PUSH_20, .., OP_EQUALVERIFY, OP_CHECKSIG] if script.len() == 25
    )
}

fn is_p2sh(script: &[u8]) -> bool {
    matches!(script, [OP_HASH160, PUSH_20, .., OP_EQUAL] if script.len() == 23)
}
