use std::collections::BTreeMap;

use footprint_canonical::{
    decode_value, encode, encode_value, hash_hex_from_object, ByteOrder, Bytes, Complex, DType,
    Digest, DigestAlg, NamedSequence, NdArray, ObjectFrame, TypePath, Value,
};

fn hex_of<T: footprint_canonical::Encodable + ?Sized>(input: &T) -> String {
    hex::encode(encode(input).unwrap())
}

#[test]
fn scalars_match_golden_bytes() {
    assert_eq!(hex_of(&()), "0100");
    assert_eq!(hex_of(&true), "0101");
    assert_eq!(hex_of(&false), "0102");
    assert_eq!(hex_of(&0), "01030000000000");
    assert_eq!(hex_of(&-1), "0103010000000101");
    assert_eq!(hex_of(&1.5), "01043ff8000000000000");
    assert_eq!(
        hex_of(&Complex::new(0.0, 1.0)),
        "010500000000000000003ff0000000000000"
    );
    assert_eq!(hex_of("ab"), "0106000000026162");
    assert_eq!(hex_of(&Bytes(vec![0xff])), "010700000001ff");
}

#[test]
fn containers_match_golden_bytes() {
    assert_eq!(hex_of(&Vec::<i32>::new()), "010800000000");

    let map: BTreeMap<&str, i32> = [("b", 1), ("a", 2)].into_iter().collect();
    assert_eq!(
        hex_of(&map),
        concat!(
            "010a00000002",
            "060000000161",
            "03000000000102",
            "060000000162",
            "03000000000101"
        )
    );
}

#[test]
fn array_blob_matches_golden_bytes() {
    let array = NdArray::from_f64(vec![2], &[1.0, 2.0]).unwrap();
    assert_eq!(
        hex_of(&array),
        concat!(
            "010b",
            "0000001e",
            "465041",
            "0b",
            "3c",
            "01",
            "0000000000000002",
            "000000000000f03f",
            "0000000000000040"
        )
    );
}

#[test]
fn golden_values_decode_back() {
    let value = Value::seq([
        Value::Null,
        Value::from(-(1i64 << 40)),
        Value::from("text"),
        Value::NamedSequence(NamedSequence::new("Point").field("x", 1).field("y", 2.0)),
        Value::Object(ObjectFrame::new(
            TypePath::new("geo", "Circle"),
            Value::map([("r", 1.0)]),
        )),
        Value::KeyedObject(ObjectFrame::new(TypePath::new("geo", "Key"), Value::from(3))),
        Value::Complex(Complex::new(-0.0, f64::INFINITY)),
        Value::Array(NdArray::from_f64(vec![2, 1], &[0.5, -1.5]).unwrap()),
        Value::Array(NdArray::from_raw(DType::U8, ByteOrder::Big, vec![0, 5], Vec::new()).unwrap()),
        Value::Array(NdArray::from_raw(DType::U8, ByteOrder::Big, vec![5, 0], Vec::new()).unwrap()),
    ]);
    let bytes = encode_value(&value).unwrap();
    assert_eq!(decode_value(&bytes).unwrap(), value);

    let Value::Sequence(items) = value else {
        unreachable!()
    };
    assert_ne!(
        encode_value(&items[8]).unwrap(),
        encode_value(&items[9]).unwrap()
    );
}

#[test]
fn digest_serializes_to_golden_json() {
    let digest = Digest {
        alg: DigestAlg::Sha256,
        bytes: [0u8; 32],
    };

    assert_eq!(
        serde_json::to_string(&digest).unwrap(),
        r#"{"alg":"sha-256","b64":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}"#
    );
}

#[test]
fn object_hash_is_stable_hex() {
    let first = hash_hex_from_object(&vec![1, 2, 3]).unwrap();
    let second = hash_hex_from_object(&[1, 2, 3]).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);
}
