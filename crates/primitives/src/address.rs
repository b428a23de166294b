//! Base58check addresses and the destinations they decode to.

use std::fmt;

use crate::hash::{sha256d, Hash160};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Some(Self::Mainnet),
            "test" | "testnet" => Some(Self::Testnet),
            "regtest" => Some(Self::Regtest),
            _ => None,
        }
    }

    fn prefixes(self) -> (u8, u8) {
        match self {
            Network::Mainnet => (0x00, 0x05),
            Network::Testnet | Network::Regtest => (0x6f, 0xc4),
        }
    }
}

/// What a standard locking script pays to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Destination {
    PubKeyHash(Hash160),
    ScriptHash(Hash160),
    None,
}

#[derive(Debug, Eq, PartialEq)]
pub enum AddressError {
    InvalidLength,
    InvalidCharacter,
    InvalidChecksum,
    UnknownPrefix,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidLength => write!(f, "invalid address length"),
            AddressError::InvalidCharacter => write!(f, "invalid base58 character"),
            AddressError::InvalidChecksum => write!(f, "invalid address checksum"),
            AddressError::UnknownPrefix => write!(f, "unknown address prefix"),
        }
    }
}

impl std::error::Error for AddressError {}

pub fn decode_destination(address: &str, network: Network) -> Result<Destination, AddressError> {
    let payload = base58check_decode(address)?;
    let (pubkey_prefix, script_prefix) = network.prefixes();
    let Some((&prefix, hash)) = payload.split_first() else {
        return Err(AddressError::InvalidLength);
    };
    let hash: Hash160 = hash.try_into().map_err(|_| AddressError::InvalidLength)?;
    if prefix == pubkey_prefix {
        return Ok(Destination::PubKeyHash(hash));
    }
    if prefix == script_prefix {
        return Ok(Destination::ScriptHash(hash));
    }
    Err(AddressError::UnknownPrefix)
}

pub fn encode_destination(destination: &Destination, network: Network) -> Option<String> {
    let (pubkey_prefix, script_prefix) = network.prefixes();
    let (prefix, hash) = match destination {
        Destination::PubKeyHash(hash) => (pubkey_prefix, hash),
        Destination::ScriptHash(hash) => (script_prefix, hash),
        Destination::None => return None,
    };
    let mut payload = Vec::with_capacity(1 + hash.len());
    payload.push(prefix);
    payload.extend_from_slice(hash);
    Some(base58check_encode(&payload))
}

fn base58check_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    let bytes = base58_decode(input)?;
    if bytes.len() < 4 {
        return Err(AddressError::InvalidLength);
    }
    let (payload, checksum) = bytes.split_at(bytes.len() - 4);
    let digest = sha256d(payload);
    if checksum != &digest[..4] {
        return Err(AddressError::InvalidChecksum);
    }
    Ok(payload.to_vec())
}

fn base58check_encode(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 4);
    data.extend_from_slice(payload);
    let checksum = sha256d(payload);
    data.extend_from_slice(&checksum[..4]);
    base58_encode(&data)
}

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn base58_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    if input.is_empty() {
        return Err(AddressError::InvalidLength);
    }
    let mut bytes = Vec::new();
    for ch in input.bytes() {
        let mut carry = base58_value(ch).ok_or(AddressError::InvalidCharacter)? as u32;
        for byte in bytes.iter_mut().rev() {
            let val = (*byte as u32) * 58 + carry;
            *byte = (val & 0xff) as u8;
            carry = val >> 8;
        }
        while carry > 0 {
            bytes.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let leading_zeros = input.bytes().take_while(|b| *b == b'1').count();
    let mut out = vec![0u8; leading_zeros];
    out.extend_from_slice(&bytes);
    Ok(out)
}

fn base58_encode(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }
    let mut digits: Vec<u8> = Vec::new();
    for byte in data {
        let mut carry = *byte as u32;
        for digit in digits.iter_mut().rev() {
            let value = (*digit as u32) * 256 + carry;
            *digit = (value % 58) as u8;
            carry = value / 58;
        }
        while carry > 0 {
            digits.insert(0, (carry % 58) as u8);
            carry /= 58;
        }
    }
    let leading_zeros = data.iter().take_while(|b| **b == 0u8).count();
    let mut out = String::with_capacity(leading_zeros + digits.len());
    for _ in 0..leading_zeros {
        out.push('1');
    }
    for digit in digits {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}

fn base58_value(byte: u8) -> Option<u8> {
    ALPHABET
        .iter()
        .position(|value| *value == byte)
        .map(|pos| pos as u8)
}
