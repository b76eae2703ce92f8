//! Key identity through the public codec surface.

use flaxkv::{decode_key, encode_key, Error, Key};

#[test]
fn int_float_text_are_three_distinct_keys() {
    let int = encode_key(&Key::Int(1)).unwrap();
    let float = encode_key(&Key::Float(1.0)).unwrap();
    let text = encode_key(&Key::Str("1".into())).unwrap();

    assert_ne!(int, float);
    assert_ne!(int, text);
    assert_ne!(float, text);
}

#[test]
fn group_keys_roundtrip() {
    let key = Key::Group(vec![Key::Int(1), Key::Int(2), Key::Int(3)]);
    let encoded = encode_key(&key).unwrap();
    assert_eq!(decode_key(&encoded).unwrap(), key);
}

#[test]
fn equal_keys_encode_identically() {
    let a = Key::Group(vec![Key::Str("x".into()), Key::Bool(true)]);
    let b = Key::Group(vec![Key::Str("x".into()), Key::Bool(true)]);
    assert_eq!(a, b);
    assert_eq!(encode_key(&a).unwrap(), encode_key(&b).unwrap());
}

#[test]
fn nan_is_not_a_key() {
    assert!(matches!(
        encode_key(&Key::Float(f64::NAN)),
        Err(Error::Encoding { .. })
    ));
}

#[test]
fn largest_key_fits_one_more_byte_does_not() {
    // Tag byte + payload: 511 total is the ceiling.
    let largest = Key::Bytes(vec![0u8; 510]);
    assert_eq!(encode_key(&largest).unwrap().len(), 511);

    let over = Key::Bytes(vec![0u8; 511]);
    assert!(matches!(encode_key(&over), Err(Error::Encoding { .. })));
}

#[test]
fn decode_rejects_trailing_garbage() {
    let mut encoded = encode_key(&Key::Int(5)).unwrap();
    encoded.push(0xAB);
    assert!(matches!(decode_key(&encoded), Err(Error::Encoding { .. })));
}
