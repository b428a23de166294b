use chainidx_script::standard::{
    classify_script_pubkey, p2pkh_script, p2sh_script, ScriptType, P2PKH_HASH_RANGE,
    P2SH_HASH_RANGE,
};

#[test]
fn classify_p2pkh() {
    let mut script = vec![0x76, 0xa9, 0x14];
    script.extend_from_slice(&[0x11; 20]);
    script.extend_from_slice(&[0x88, 0xac]);
    assert_eq!(classify_script_pubkey(&script), ScriptType::P2Pkh);
    assert_eq!(script, p2pkh_script(&[0x11; 20]));
    assert_eq!(&script[P2PKH_HASH_RANGE], &[0x11; 20]);
}

#[test]
fn classify_p2sh() {
    let mut script = vec![0xa9, 0x14];
    script.extend_from_slice(&[0x22; 20]);
    script.push(0x87);
    assert_eq!(classify_script_pubkey(&script), ScriptType::P2Sh);
    assert_eq!(script, p2sh_script(&[0x22; 20]));
    assert_eq!(&script[P2SH_HASH_RANGE], &[0x22; 20]);
}

#[test]
fn other_shapes_are_unknown() {
    let mut p2pk = vec![33];
    p2pk.extend_from_slice(&[0x02; 33]);
    p2pk.push(0xac);
    assert_eq!(classify_script_pubkey(&p2pk), ScriptType::Unknown);

    let mut wpkh = vec![0x00, 0x14];
    wpkh.extend_from_slice(&[0x33; 20]);
    assert_eq!(classify_script_pubkey(&wpkh), ScriptType::Unknown);

    assert_eq!(classify_script_pubkey(&[0x6a, 0x01, 0x01]), ScriptType::Unknown);
    assert_eq!(classify_script_pubkey(&[]), ScriptType::Unknown);
    assert_eq!(classify_script_pubkey(&[0xa9, 0x14, 0x00]), ScriptType::Unknown);
}

#[test]
fn trailing_byte_breaks_the_match() {
    let mut script = p2pkh_script(&[0x44; 20]);
    script.push(0x00);
    assert_eq!(classify_script_pubkey(&script), ScriptType::Unknown);

    let mut script = p2sh_script(&[0x55; 20]);
    script.insert(0, 0x00);
    assert_eq!(classify_script_pubkey(&script), ScriptType::Unknown);
}
