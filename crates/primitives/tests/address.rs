use chainidx_primitives::address::{decode_destination, encode_destination, AddressError};
use chainidx_primitives::{Destination, Network};

fn hex20(raw: &str) -> [u8; 20] {
    let mut out = [0u8; 20];
    for (idx, chunk) in raw.as_bytes().chunks(2).enumerate() {
        let text = std::str::from_utf8(chunk).expect("ascii");
        out[idx] = u8::from_str_radix(text, 16).expect("hex");
    }
    out
}

#[test]
fn mainnet_p2pkh_vector() {
    let hash = hex20("010966776006953d5567439e5e39f86a0d273bee");
    let address = encode_destination(&Destination::PubKeyHash(hash), Network::Mainnet)
        .expect("encodable");
    assert_eq!(address, "16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM");
    assert_eq!(
        decode_destination(&address, Network::Mainnet),
        Ok(Destination::PubKeyHash(hash))
    );
}

#[test]
fn zero_hash_keeps_leading_ones() {
    let address = encode_destination(&Destination::PubKeyHash([0u8; 20]), Network::Mainnet)
        .expect("encodable");
    assert_eq!(address, "1111111111111111111114oLvT2");
}

#[test]
fn script_hash_roundtrips_on_testnet() {
    let destination = Destination::ScriptHash([0x42; 20]);
    let address = encode_destination(&destination, Network::Testnet).expect("encodable");
    assert_eq!(decode_destination(&address, Network::Regtest), Ok(destination));
    assert_eq!(
        decode_destination(&address, Network::Mainnet),
        Err(AddressError::UnknownPrefix)
    );
}

#[test]
fn rejects_corrupted_addresses() {
    assert_eq!(
        decode_destination("16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvN", Network::Mainnet),
        Err(AddressError::InvalidChecksum)
    );
    assert_eq!(
        decode_destination("16UwLL9Risc3QfPqBUvKofHmBQ7wMtjv0", Network::Mainnet),
        Err(AddressError::InvalidCharacter)
    );
    assert_eq!(
        decode_destination("", Network::Mainnet),
        Err(AddressError::InvalidLength)
    );
    assert!(encode_destination(&Destination::None, Network::Mainnet).is_none());
}
