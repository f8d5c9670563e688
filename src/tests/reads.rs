// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use super::*;

const KEY: CK_OBJECT_HANDLE = 10;

fn key_token() -> MemoryToken {
    let tok = MemoryToken::new();
    store_template(&tok, KEY, &private_key_template());
    ret_or_panic!(tok.set_sensitive(KEY, CKA_PRIVATE_EXPONENT));
    ret_or_panic!(tok.set_error(KEY, CKA_PRIME_1, CKR_ATTRIBUTE_SENSITIVE));
    tok
}

#[test]
fn test_presence_invariant() {
    let tok = key_token();
    let types = [
        CKA_CLASS,
        CKA_LABEL,
        CKA_PRIVATE_EXPONENT,
        CKA_PRIME_1,
        CKA_SUBJECT,
        CKA_MODULUS,
        CKA_VENDOR_DEFINED | 1,
    ];
    let report = ret_or_panic!(read_all_report(
        SESSION,
        KEY,
        &types,
        &tok,
        &ReadPolicy::default()
    ));
    assert_eq!(report.attributes.len(), types.len());
    for (a, t) in report.attributes.iter().zip(types) {
        assert_eq!(a.get_type(), t);
        assert_read_state(a);
    }

    let attrs = &report.attributes;
    assert_eq!(ret_or_panic!(attrs[0].to_code()), CKO_PRIVATE_KEY);
    assert_eq!(ret_or_panic!(attrs[1].to_utf8()), "Test RSA Key");
    assert!(attrs[2].is_sensitive());
    assert_eq!(attrs[2].to_string(), "<Value is sensitive>");
    assert!(!attrs[3].is_present());
    assert!(!attrs[4].is_present());
    assert_eq!(attrs[5].to_bytes().unwrap().len(), 16);
    assert!(!attrs[6].is_present());

    assert_eq!(
        report.failures,
        vec![(CKA_PRIME_1, ReadFailure::Token(CKR_ATTRIBUTE_SENSITIVE))]
    );
    assert_eq!(report.failures[0].1.rv(), CKR_ATTRIBUTE_SENSITIVE);
}

#[test]
fn test_only_readable_values_are_fetched() {
    let tok = key_token();
    ret_or_panic!(read_all(
        SESSION,
        KEY,
        &[CKA_PRIVATE_EXPONENT, CKA_PRIME_1, CKA_ID],
        &tok,
        &ReadPolicy::default()
    ));
    assert_eq!(tok.fetched_types(), vec![CKA_ID]);

    /* nothing readable, no second pass */
    ret_or_panic!(read_all(
        SESSION,
        KEY,
        &[CKA_PRIVATE_EXPONENT, CKA_PRIME_1],
        &tok,
        &ReadPolicy::default()
    ));
    assert_eq!(tok.query_calls(), 2);
    assert_eq!(tok.fetch_calls(), 1);
}

#[test]
fn test_empty_request() {
    let tok = key_token();
    let attrs =
        ret_or_panic!(read_all(SESSION, KEY, &[], &tok, &ReadPolicy::default()));
    assert!(attrs.is_empty());
    assert_eq!(tok.query_calls(), 0);
}

#[test]
fn test_token_failures_abort() {
    let tok = key_token();
    let policy = ReadPolicy::default();

    let e = read_all(CK_INVALID_HANDLE, KEY, &[CKA_CLASS], &tok, &policy)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::TokenCommunication);
    assert_eq!(e.rv(), CKR_SESSION_HANDLE_INVALID);

    let e = read_all(SESSION, KEY + 1, &[CKA_CLASS], &tok, &policy)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::TokenCommunication);
    assert_eq!(e.rv(), CKR_OBJECT_HANDLE_INVALID);

    ret_or_panic!(tok.fail_fetches(Some(CKR_DEVICE_REMOVED)));
    let e = read_all(SESSION, KEY, &[CKA_CLASS], &tok, &policy).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::TokenCommunication);
    assert_eq!(e.rv(), CKR_DEVICE_REMOVED);

    ret_or_panic!(tok.fail_fetches(None));
    ret_or_panic!(tok.fail_queries(Some(CKR_DEVICE_ERROR)));
    let e = read_all(SESSION, KEY, &[CKA_CLASS], &tok, &policy).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::TokenCommunication);
    assert_eq!(e.rv(), CKR_DEVICE_ERROR);

    ret_or_panic!(tok.fail_queries(None));
    let attrs = ret_or_panic!(read_all(SESSION, KEY, &[CKA_CLASS], &tok, &policy));
    assert!(attrs[0].is_present());
}

#[test]
fn test_malformed_values_stay_in_batch() {
    let tok = MemoryToken::new();
    ret_or_panic!(tok.set_value(3, CKA_CLASS, vec![1, 2, 3]));
    ret_or_panic!(tok.set_value(3, CKA_END_DATE, b"2031XX01".to_vec()));
    ret_or_panic!(tok.set_value(3, CKA_ID, vec![7]));
    let report = ret_or_panic!(read_all_report(
        SESSION,
        3,
        &[CKA_CLASS, CKA_END_DATE, CKA_ID],
        &tok,
        &ReadPolicy::default()
    ));
    assert!(!report.attributes[0].is_present());
    assert!(!report.attributes[1].is_present());
    assert_eq!(ret_or_panic!(report.attributes[2].to_bytes()), &vec![7]);
    assert_eq!(report.failures.len(), 2);
    for (_, f) in &report.failures {
        assert!(matches!(f, ReadFailure::Malformed(_)));
        assert_eq!(f.rv(), CKR_ATTRIBUTE_VALUE_INVALID);
    }
}

#[test]
fn test_object_read() {
    let tok = key_token();
    let mut obj = Object::with_types(
        KEY,
        &[CKA_CLASS, CKA_KEY_TYPE, CKA_LABEL, CKA_TOKEN, CKA_PRIVATE_EXPONENT],
    );
    let failures = ret_or_panic!(obj.read_attributes(
        SESSION,
        &tok,
        &ReadPolicy::default()
    ));
    assert!(failures.is_empty());
    assert_eq!(obj.get_class(), Some(CKO_PRIVATE_KEY));
    assert_eq!(ret_or_panic!(obj.get_attr_as_code(CKA_KEY_TYPE)), CKK_RSA);
    assert!(obj.is_token());
    assert!(obj.get_attr(CKA_PRIVATE_EXPONENT).unwrap().is_sensitive());

    /* the sensitive value is a wildcard when searching */
    let search = obj.template(BuildMode::Search);
    let raws = ret_or_panic!(search.build(BuildMode::Search, &limits()));
    assert_eq!(raws.len(), 5);
    assert!(raws[4].is_unset());
    assert_eq!(obj.template(BuildMode::Create).len(), 4);
    assert!(!obj.match_template(&private_key_template()));

    let mut t = private_key_template();
    t.remove(CKA_ID);
    t.remove(CKA_SENSITIVE);
    t.remove(CKA_MODULUS);
    t.remove(CKA_PUBLIC_EXPONENT);
    assert!(obj.match_template(&t));
}

#[test]
fn test_explicit_kind_for_vendor_type() {
    let vendor = CKA_VENDOR_DEFINED | 0x100;
    let tok = MemoryToken::new();
    ret_or_panic!(tok.set_value(4, vendor, word(77)));
    let mut attrs = vec![
        Attribute::new(vendor),
        Attribute::with_kind(vendor, AttrKind::Ulong),
    ];
    let failures = ret_or_panic!(crate::read::read_into(
        SESSION,
        4,
        &mut attrs,
        &tok,
        &ReadPolicy::default()
    ));
    assert!(failures.is_empty());
    assert_eq!(ret_or_panic!(attrs[0].to_bytes()), &word(77));
    assert_eq!(ret_or_panic!(attrs[1].to_ulong()), 77);
}
