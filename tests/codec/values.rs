//! Value round trips through the public codec surface.

use flaxkv::{decode_value, encode_value, Dtype, Error, NdArray, Value};

fn roundtrip(value: Value) {
    let encoded = encode_value(&value).unwrap();
    assert_eq!(decode_value(&encoded).unwrap(), value);
}

#[test]
fn scalars_roundtrip() {
    roundtrip(Value::Null);
    roundtrip(Value::Bool(false));
    roundtrip(Value::Int(i64::MIN));
    roundtrip(Value::Float(f64::MAX));
    roundtrip(Value::Str("ünïcode".into()));
    roundtrip(Value::Bytes((0u8..=255).collect()));
}

#[test]
fn nested_containers_roundtrip() {
    roundtrip(Value::List(vec![
        Value::Map(vec![(Value::Str("k".into()), Value::List(vec![Value::Int(1)]))]),
        Value::Null,
    ]));
}

#[test]
fn dense_array_roundtrip() {
    let mut data = Vec::new();
    for v in [1.5f32, -2.5, 0.0, f32::INFINITY] {
        data.extend_from_slice(&v.to_le_bytes());
    }
    let arr = NdArray::new(Dtype::F32, vec![2, 2], data).unwrap();
    roundtrip(Value::Array(arr));
}

#[test]
fn set_like_containers_arrive_as_lists() {
    // Producers with set or tuple types hand us their elements as an
    // ordered sequence; there is no set variant to preserve. The policy is
    // degradation to List, not an error, so a sequence built from such a
    // container round-trips as exactly that sequence.
    let from_set = Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    roundtrip(from_set);
}

#[test]
fn map_key_policy_is_enforced() {
    let ok = Value::Map(vec![
        (Value::Str("s".into()), Value::Null),
        (Value::Int(1), Value::Null),
        (Value::Float(0.5), Value::Null),
        (Value::Bool(true), Value::Null),
    ]);
    assert!(encode_value(&ok).is_ok());

    let bad = Value::Map(vec![(Value::List(vec![]), Value::Null)]);
    assert!(matches!(encode_value(&bad), Err(Error::Encoding { .. })));
}

#[test]
fn array_shape_is_validated() {
    assert!(matches!(
        NdArray::new(Dtype::I64, vec![2, 2], vec![0u8; 8]),
        Err(Error::Encoding { .. })
    ));
}
