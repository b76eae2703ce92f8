//! Property-based sweep: encode ∘ decode = id over the supported domain.

use flaxkv::{decode_key, decode_value, encode_key, encode_value, Dtype, Key, NdArray, Value};
use proptest::prelude::*;

fn key_strategy() -> impl Strategy<Value = Key> {
    let scalar = prop_oneof![
        any::<i64>().prop_map(Key::Int),
        any::<f64>()
            .prop_filter("NaN is not a key", |f| !f.is_nan())
            .prop_map(Key::Float),
        any::<bool>().prop_map(Key::Bool),
        "[a-zA-Z0-9]{0,12}".prop_map(Key::Str),
        proptest::collection::vec(any::<u8>(), 0..24).prop_map(Key::Bytes),
    ];
    // Shallow groups keep encodings well under the key size ceiling.
    scalar.prop_recursive(2, 8, 3, |inner| {
        proptest::collection::vec(inner, 0..3).prop_map(Key::Group)
    })
}

fn value_strategy() -> impl Strategy<Value = Value> {
    let scalar_key = prop_oneof![
        any::<i64>().prop_map(Value::Int),
        "[a-z]{0,8}".prop_map(Value::Str),
        any::<bool>().prop_map(Value::Bool),
    ]
    .boxed();
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>()
            .prop_filter("NaN breaks Value equality", |f| !f.is_nan())
            .prop_map(Value::Float),
        "[ -~]{0,16}".prop_map(Value::Str),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
        proptest::collection::vec(any::<u8>(), 0..32)
            .prop_map(|data| {
                let len = data.len() as u64;
                Value::Array(NdArray::new(Dtype::U8, vec![len], data).unwrap())
            }),
    ];
    leaf.prop_recursive(3, 24, 4, move |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            proptest::collection::vec((scalar_key.clone(), inner), 0..4)
                .prop_map(Value::Map),
        ]
    })
}

proptest! {
    #[test]
    fn key_roundtrip(key in key_strategy()) {
        let encoded = encode_key(&key).unwrap();
        let decoded = decode_key(&encoded).unwrap();
        prop_assert_eq!(&decoded, &key);
        // Determinism: re-encoding the decoded key yields identical bytes.
        prop_assert_eq!(encode_key(&decoded).unwrap(), encoded);
    }

    #[test]
    fn value_roundtrip(value in value_strategy()) {
        let encoded = encode_value(&value).unwrap();
        let decoded = decode_value(&encoded).unwrap();
        prop_assert_eq!(&decoded, &value);
        prop_assert_eq!(encode_value(&decoded).unwrap(), encoded);
    }

    #[test]
    fn distinct_keys_encode_distinctly(a in key_strategy(), b in key_strategy()) {
        let ea = encode_key(&a).unwrap();
        let eb = encode_key(&b).unwrap();
        prop_assert_eq!(a == b, ea == eb);
    }
}
