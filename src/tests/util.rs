// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use super::*;

pub const SESSION: CK_SESSION_HANDLE = 1;

pub fn limits() -> CodecLimits {
    CodecLimits::default()
}

/// The native encoding of a CK_ULONG
pub fn word(w: CK_ULONG) -> Vec<u8> {
    w.to_ne_bytes().to_vec()
}

/// One element of an encoded attribute array
pub fn triple(t: CK_ATTRIBUTE_TYPE, data: &[u8]) -> Vec<u8> {
    let mut v = word(t);
    v.extend_from_slice(&word(data.len() as CK_ULONG));
    v.extend_from_slice(data);
    v
}

pub fn roundtrip(attr: &Attribute) -> Attribute {
    let raw = ret_or_panic!(codec::encode(attr, &limits()));
    ret_or_panic!(codec::decode(&raw, &limits()))
}

/// Loads a template onto the token as the attributes of an object
pub fn store_template(
    tok: &MemoryToken,
    object: CK_OBJECT_HANDLE,
    template: &Template,
) {
    ret_or_panic!(tok.add_object(object));
    for raw in ret_or_panic!(template.build(BuildMode::Create, &limits())) {
        ret_or_panic!(tok.set_raw(object, raw));
    }
}

/// A private key with a sensitive value and a secret component the
/// token refuses to report
pub fn private_key_template() -> Template {
    Template::from(vec![
        Attribute::from_object_class(CKA_CLASS, CKO_PRIVATE_KEY),
        Attribute::from_key_type(CKA_KEY_TYPE, CKK_RSA),
        Attribute::from_string(CKA_LABEL, "Test RSA Key".to_string()),
        Attribute::from_bytes(CKA_ID, vec![0x01, 0x02]),
        Attribute::from_bool(CKA_TOKEN, true),
        Attribute::from_bool(CKA_SENSITIVE, true),
        Attribute::from_bytes(CKA_MODULUS, ret_or_panic!(hex::decode(
            "c0ffee00c0ffee00c0ffee00c0ffee00"
        ))),
        Attribute::from_bytes(CKA_PUBLIC_EXPONENT, vec![0x01, 0x00, 0x01]),
    ])
}

/// Checks that an attribute is in one of the three states a read leaves
/// it in
pub fn assert_read_state(a: &Attribute) {
    if a.is_present() {
        assert_ne!(a.is_sensitive(), a.value().is_some(), "{}", a.name());
    } else {
        assert!(!a.is_sensitive(), "{}", a.name());
        assert!(a.value().is_none(), "{}", a.name());
    }
}
