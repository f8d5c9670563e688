// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Printable names for the enumerated codes carried by attribute values:
//! object classes, key types, certificate types, hardware feature types and
//! mechanisms. Codes missing from these tables are never an error, they are
//! rendered by numeric value instead.

use crate::pkcs11::vendor::is_vendor_defined;
use crate::pkcs11::*;
use crate::registry::AttrKind;

/// A single enumerator: its value, PKCS#11 constant name and display name
#[derive(Debug, Clone, Copy)]
pub struct CodeName {
    pub code: CK_ULONG,
    pub ck_name: &'static str,
    pub display: &'static str,
}

macro_rules! code_name {
    ($id:expr; $display:expr) => {
        CodeName {
            code: $id,
            ck_name: stringify!($id),
            display: $display,
        }
    };
}

static OBJECT_CLASSES: [CodeName; 10] = [
    code_name!(CKO_DATA; "Data"),
    code_name!(CKO_CERTIFICATE; "Certificate"),
    code_name!(CKO_PUBLIC_KEY; "Public Key"),
    code_name!(CKO_PRIVATE_KEY; "Private Key"),
    code_name!(CKO_SECRET_KEY; "Secret Key"),
    code_name!(CKO_HW_FEATURE; "Hardware Feature"),
    code_name!(CKO_DOMAIN_PARAMETERS; "Domain Parameters"),
    code_name!(CKO_MECHANISM; "Mechanism"),
    code_name!(CKO_OTP_KEY; "OTP Key"),
    code_name!(CKO_PROFILE; "Profile"),
];

static KEY_TYPES: [CodeName; 38] = [
    code_name!(CKK_RSA; "RSA"),
    code_name!(CKK_DSA; "DSA"),
    code_name!(CKK_DH; "DH"),
    code_name!(CKK_EC; "EC"),
    code_name!(CKK_X9_42_DH; "X9.42 DH"),
    code_name!(CKK_KEA; "KEA"),
    code_name!(CKK_GENERIC_SECRET; "Generic Secret"),
    code_name!(CKK_RC2; "RC2"),
    code_name!(CKK_RC4; "RC4"),
    code_name!(CKK_DES; "DES"),
    code_name!(CKK_DES2; "DES2"),
    code_name!(CKK_DES3; "DES3"),
    code_name!(CKK_CAST; "CAST"),
    code_name!(CKK_CAST3; "CAST3"),
    code_name!(CKK_CAST128; "CAST128"),
    code_name!(CKK_RC5; "RC5"),
    code_name!(CKK_IDEA; "IDEA"),
    code_name!(CKK_SKIPJACK; "SKIPJACK"),
    code_name!(CKK_BATON; "BATON"),
    code_name!(CKK_JUNIPER; "JUNIPER"),
    code_name!(CKK_CDMF; "CDMF"),
    code_name!(CKK_AES; "AES"),
    code_name!(CKK_BLOWFISH; "Blowfish"),
    code_name!(CKK_TWOFISH; "Twofish"),
    code_name!(CKK_SECURID; "SecurID"),
    code_name!(CKK_HOTP; "HOTP"),
    code_name!(CKK_ACTI; "ACTI"),
    code_name!(CKK_CAMELLIA; "Camellia"),
    code_name!(CKK_ARIA; "ARIA"),
    code_name!(CKK_GOSTR3410; "GOST R 34.10"),
    code_name!(CKK_GOSTR3411; "GOST R 34.11"),
    code_name!(CKK_GOST28147; "GOST 28147"),
    code_name!(CKK_CHACHA20; "ChaCha20"),
    code_name!(CKK_POLY1305; "Poly1305"),
    code_name!(CKK_AES_XTS; "AES XTS"),
    code_name!(CKK_EC_EDWARDS; "EC Edwards"),
    code_name!(CKK_EC_MONTGOMERY; "EC Montgomery"),
    code_name!(CKK_HKDF; "HKDF"),
];

static CERTIFICATE_TYPES: [CodeName; 3] = [
    code_name!(CKC_X_509; "X.509 Public Key"),
    code_name!(CKC_X_509_ATTR_CERT; "X.509 Attribute"),
    code_name!(CKC_WTLS; "WTLS"),
];

static HW_FEATURE_TYPES: [CodeName; 3] = [
    code_name!(CKH_MONOTONIC_COUNTER; "Monotonic Counter"),
    code_name!(CKH_CLOCK; "Clock"),
    code_name!(CKH_USER_INTERFACE; "User Interface"),
];

static MECHANISMS: [CodeName; 39] = [
    code_name!(CKM_RSA_PKCS_KEY_PAIR_GEN; "RSA PKCS Key Pair Gen"),
    code_name!(CKM_RSA_PKCS; "RSA PKCS"),
    code_name!(CKM_RSA_9796; "RSA 9796"),
    code_name!(CKM_RSA_X_509; "RSA X.509"),
    code_name!(CKM_MD5_RSA_PKCS; "MD5 RSA PKCS"),
    code_name!(CKM_SHA1_RSA_PKCS; "SHA1 RSA PKCS"),
    code_name!(CKM_RSA_PKCS_OAEP; "RSA PKCS OAEP"),
    code_name!(CKM_RSA_PKCS_PSS; "RSA PKCS PSS"),
    code_name!(CKM_SHA1_RSA_PKCS_PSS; "SHA1 RSA PKCS PSS"),
    code_name!(CKM_DSA_KEY_PAIR_GEN; "DSA Key Pair Gen"),
    code_name!(CKM_DSA; "DSA"),
    code_name!(CKM_DSA_SHA1; "DSA SHA1"),
    code_name!(CKM_DH_PKCS_KEY_PAIR_GEN; "DH PKCS Key Pair Gen"),
    code_name!(CKM_DH_PKCS_DERIVE; "DH PKCS Derive"),
    code_name!(CKM_SHA256_RSA_PKCS; "SHA256 RSA PKCS"),
    code_name!(CKM_SHA384_RSA_PKCS; "SHA384 RSA PKCS"),
    code_name!(CKM_SHA512_RSA_PKCS; "SHA512 RSA PKCS"),
    code_name!(CKM_SHA256_RSA_PKCS_PSS; "SHA256 RSA PKCS PSS"),
    code_name!(CKM_DES3_KEY_GEN; "DES3 Key Gen"),
    code_name!(CKM_DES3_ECB; "DES3 ECB"),
    code_name!(CKM_DES3_CBC; "DES3 CBC"),
    code_name!(CKM_SHA_1; "SHA-1"),
    code_name!(CKM_SHA256; "SHA-256"),
    code_name!(CKM_SHA384; "SHA-384"),
    code_name!(CKM_SHA512; "SHA-512"),
    code_name!(CKM_GENERIC_SECRET_KEY_GEN; "Generic Secret Key Gen"),
    code_name!(CKM_EC_KEY_PAIR_GEN; "EC Key Pair Gen"),
    code_name!(CKM_ECDSA; "ECDSA"),
    code_name!(CKM_ECDSA_SHA1; "ECDSA SHA1"),
    code_name!(CKM_ECDSA_SHA256; "ECDSA SHA256"),
    code_name!(CKM_ECDH1_DERIVE; "ECDH1 Derive"),
    code_name!(CKM_AES_KEY_GEN; "AES Key Gen"),
    code_name!(CKM_AES_ECB; "AES ECB"),
    code_name!(CKM_AES_CBC; "AES CBC"),
    code_name!(CKM_AES_CBC_PAD; "AES CBC Pad"),
    code_name!(CKM_AES_GCM; "AES GCM"),
    code_name!(CKM_AES_KEY_WRAP; "AES Key Wrap"),
    code_name!(CKM_AES_KEY_WRAP_PAD; "AES Key Wrap Pad"),
    code_name!(CKM_VENDOR_DEFINED; "Vendor Defined"),
];

/// Returns the enumerator table for kinds that carry a code, None for
/// every other kind
fn table(kind: AttrKind) -> Option<&'static [CodeName]> {
    match kind {
        AttrKind::ObjectClass => Some(&OBJECT_CLASSES),
        AttrKind::KeyType => Some(&KEY_TYPES),
        AttrKind::CertificateType => Some(&CERTIFICATE_TYPES),
        AttrKind::HwFeatureType => Some(&HW_FEATURE_TYPES),
        AttrKind::Mechanism | AttrKind::MechanismArray => Some(&MECHANISMS),
        _ => None,
    }
}

/// Formats a code that has no table entry
pub fn unknown_code_name(code: CK_ULONG) -> String {
    if is_vendor_defined(code) {
        format!("VENDOR_DEFINED[0x{:x}]", code)
    } else {
        format!("[0x{:x}]", code)
    }
}

/// Looks up the enumerator entry of a code for the given kind
pub fn lookup(kind: AttrKind, code: CK_ULONG) -> Option<&'static CodeName> {
    table(kind)?.iter().find(|c| c.code == code)
}

/// Human readable name of a code, mechanisms use their constant name
pub fn display_name(kind: AttrKind, code: CK_ULONG) -> String {
    match lookup(kind, code) {
        Some(c) => match kind {
            AttrKind::Mechanism | AttrKind::MechanismArray => {
                c.ck_name.to_string()
            }
            _ => c.display.to_string(),
        },
        None => unknown_code_name(code),
    }
}

/// Finds a code by its PKCS#11 constant name (`CKO_PUBLIC_KEY`)
pub fn code_by_ck_name(kind: AttrKind, name: &str) -> Option<CK_ULONG> {
    table(kind)?.iter().find(|c| c.ck_name == name).map(|c| c.code)
}
