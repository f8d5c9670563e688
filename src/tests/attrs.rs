// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use super::*;

#[test]
fn test_bool_roundtrip() {
    for b in [true, false] {
        let a = Attribute::from_bool(CKA_EXTRACTABLE, b);
        let raw = ret_or_panic!(codec::encode(&a, &limits()));
        assert_eq!(raw.as_slice(), &[if b { CK_TRUE } else { CK_FALSE }]);
        assert_eq!(roundtrip(&a), a);
    }
}

#[test]
fn test_ulong_roundtrip() {
    for v in [0, 1, 2048, CK_ULONG::MAX] {
        let a = Attribute::from_ulong(CKA_VALUE_LEN, v);
        let raw = ret_or_panic!(codec::encode(&a, &limits()));
        assert_eq!(raw.as_slice(), word(v).as_slice());
        assert!(!raw.is_unset());
        let back = roundtrip(&a);
        assert_eq!(ret_or_panic!(back.to_ulong()), v);
    }
}

#[test]
fn test_bytes_roundtrip() {
    for v in [vec![], vec![0xa5], (0..=255).collect::<Vec<u8>>()] {
        let a = Attribute::from_bytes(CKA_ID, v.clone());
        let raw = ret_or_panic!(codec::encode(&a, &limits()));
        assert_eq!(raw.len(), v.len() as CK_ULONG);
        let back = roundtrip(&a);
        assert!(back.is_present());
        assert_eq!(ret_or_panic!(back.to_bytes()), &v);
    }
}

#[test]
fn test_chars_roundtrip() {
    let a = Attribute::from_string(CKA_LABEL, "ключ".to_string());
    assert_eq!(ret_or_panic!(roundtrip(&a).to_utf8()), "ключ");

    /* not UTF-8, accepted unless strict */
    let raw = RawAttr::new(CKA_LABEL, vec![0xff, 0xfe]);
    let a = ret_or_panic!(codec::decode(&raw, &limits()));
    assert_eq!(ret_or_panic!(a.to_chars()), &[0xff, 0xfe]);
    let strict = CodecLimits {
        strict_chars: true,
        ..Default::default()
    };
    let e = codec::decode(&raw, &strict).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::MalformedValue);
}

#[test]
fn test_date_roundtrip() {
    let d = ret_or_panic!(CkDate::new(2024, 2, 29));
    let a = Attribute::from_date(CKA_START_DATE, d);
    let raw = ret_or_panic!(codec::encode(&a, &limits()));
    assert_eq!(raw.as_slice(), b"20240229");
    assert_eq!(ret_or_panic!(roundtrip(&a).to_date()), Some(d));

    let a = Attribute::from_empty_date(CKA_END_DATE);
    let raw = ret_or_panic!(codec::encode(&a, &limits()));
    assert_eq!(raw.len(), 0);
    assert_eq!(ret_or_panic!(roundtrip(&a).to_date()), None);

    let raw = RawAttr::new(CKA_END_DATE, b"2024-1-1".to_vec());
    let e = codec::decode(&raw, &limits()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::MalformedValue);
}

#[test]
fn test_code_roundtrip() {
    let attrs = [
        Attribute::from_object_class(CKA_CLASS, CKO_PRIVATE_KEY),
        Attribute::from_key_type(CKA_KEY_TYPE, CKK_EC),
        Attribute::from_certificate_type(CKA_CERTIFICATE_TYPE, CKC_X_509),
        Attribute::from_hw_feature_type(CKA_HW_FEATURE_TYPE, CKH_CLOCK),
        Attribute::from_mechanism(CKA_KEY_GEN_MECHANISM, CKM_AES_KEY_GEN),
        /* codes outside the name tables survive as well */
        Attribute::from_key_type(CKA_KEY_TYPE, CKK_VENDOR_DEFINED | 7),
    ];
    for a in attrs {
        let back = roundtrip(&a);
        assert_eq!(back.kind(), a.kind());
        assert_eq!(back, a);
    }
}

#[test]
fn test_mechanism_array_roundtrip() {
    let lists = [
        vec![],
        vec![CKM_AES_GCM],
        vec![CKM_RSA_PKCS, CKM_SHA256_RSA_PKCS, CKM_VENDOR_DEFINED | 3],
    ];
    for l in lists {
        let a = Attribute::from_mechanisms(CKA_ALLOWED_MECHANISMS, l.clone());
        let raw = ret_or_panic!(codec::encode(&a, &limits()));
        assert_eq!(raw.as_slice().len(), l.len() * std::mem::size_of::<CK_ULONG>());
        let back = roundtrip(&a);
        assert_eq!(ret_or_panic!(back.to_mechanisms()), l.as_slice());
    }
}

fn nested(levels: usize) -> Attribute {
    let mut inner = vec![Attribute::from_bool(CKA_SENSITIVE, true)];
    for _ in 0..levels {
        inner = vec![
            Attribute::from_bool(CKA_EXTRACTABLE, false),
            Attribute::from_attrs(CKA_DERIVE_TEMPLATE, inner),
        ];
    }
    Attribute::from_attrs(CKA_WRAP_TEMPLATE, inner)
}

#[test]
fn test_attribute_array_roundtrip() {
    /* empty array */
    let a = Attribute::from_attrs(CKA_UNWRAP_TEMPLATE, Vec::new());
    let raw = ret_or_panic!(codec::encode(&a, &limits()));
    assert_eq!(raw.as_slice(), word(0).as_slice());
    assert_eq!(roundtrip(&a), a);

    /* one and many levels */
    for levels in [0, 1, 6] {
        let a = nested(levels);
        assert_eq!(roundtrip(&a), a);
    }

    /* absent elements are kept as unset entries */
    let a = Attribute::from_attrs(
        CKA_WRAP_TEMPLATE,
        vec![
            Attribute::from_key_type(CKA_KEY_TYPE, CKK_AES),
            Attribute::new(CKA_LABEL),
        ],
    );
    let back = roundtrip(&a);
    let inner = ret_or_panic!(back.to_attrs());
    assert_eq!(inner.len(), 2);
    assert!(!inner[1].is_present());
    assert_eq!(back, a);
}

#[test]
fn test_nesting_limit() {
    let a = nested(3);
    let tight = CodecLimits {
        max_depth: 3,
        ..Default::default()
    };
    let e = codec::encode(&a, &tight).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::MalformedValue);

    let raw = ret_or_panic!(codec::encode(&a, &limits()));
    let e = codec::decode(&raw, &tight).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::MalformedValue);

    let fits = CodecLimits {
        max_depth: 4,
        ..Default::default()
    };
    assert_eq!(ret_or_panic!(codec::decode(&raw, &fits)), a);
}

#[test]
fn test_unknown_types() {
    let vendor = CKA_VENDOR_DEFINED | 0x42;
    assert_eq!(registry::name_of(vendor), "VENDOR_DEFINED[0x80000042]");
    assert_eq!(registry::kind_of(vendor), None);
    assert_eq!(registry::name_of(0x7fff_0000), "[0x7fff0000]");
    assert_eq!(registry::kind_of(0x7fff_0000), None);

    let raw = RawAttr::new(vendor, vec![1, 2, 3]);
    let a = ret_or_panic!(codec::decode(&raw, &limits()));
    assert_eq!(a.kind(), AttrKind::Bytes);
    assert_eq!(a.value(), Some(&AttrValue::Bytes(vec![1, 2, 3])));
    assert_eq!(a.to_string_with_name(), "VENDOR_DEFINED[0x80000042]: 010203");

    /* an explicit kind takes precedence over the registry */
    let raw = RawAttr::new(vendor, word(9));
    let a = ret_or_panic!(codec::decode_as(&raw, AttrKind::Ulong, &limits()));
    assert_eq!(ret_or_panic!(a.to_ulong()), 9);
}
