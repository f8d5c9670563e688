// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This module defines the mapping between PKCS#11 attribute type values,
//! their printable names and the kind of value they carry as described in
//! the [AttrKind] enumeration.
//!
//! The table is static data, the lookup indexes over it are built once on
//! first use and are read-only afterwards, so they can be shared freely
//! between threads.

use std::collections::HashMap;
use std::fmt;

use crate::names::unknown_code_name;
use crate::pkcs11::*;

use bimap::BiHashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The closed set of value representations an attribute can have
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
pub enum AttrKind {
    Bool,
    Ulong,
    Bytes,
    Chars,
    Date,
    ObjectClass,
    KeyType,
    CertificateType,
    HwFeatureType,
    Mechanism,
    MechanismArray,
    AttributeArray,
}

impl AttrKind {
    /// True for the kinds whose value is a single enumerated CK_ULONG code
    pub fn is_code(&self) -> bool {
        matches!(
            self,
            AttrKind::ObjectClass
                | AttrKind::KeyType
                | AttrKind::CertificateType
                | AttrKind::HwFeatureType
                | AttrKind::Mechanism
        )
    }

    /// True for the kinds encoded as a single CK_ULONG
    pub fn is_word(&self) -> bool {
        *self == AttrKind::Ulong || self.is_code()
    }

    /// Finds and return the attribute id and kind from the constant name
    pub fn attr_name_to_id_kind(s: &str) -> Option<(CK_ULONG, AttrKind)> {
        let id = code_by_name(s)?;
        Some((id, kind_of(id)?))
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrKind::Bool => "BooleanAttribute",
            AttrKind::Ulong => "LongAttribute",
            AttrKind::Bytes => "ByteArrayAttribute",
            AttrKind::Chars => "CharArrayAttribute",
            AttrKind::Date => "DateAttribute",
            AttrKind::ObjectClass => "ObjectClassAttribute",
            AttrKind::KeyType => "KeyTypeAttribute",
            AttrKind::CertificateType => "CertificateTypeAttribute",
            AttrKind::HwFeatureType => "HardwareFeatureTypeAttribute",
            AttrKind::Mechanism => "MechanismAttribute",
            AttrKind::MechanismArray => "MechanismArrayAttribute",
            AttrKind::AttributeArray => "AttributeArray",
        };
        f.write_str(name)
    }
}

/// Struct to map a PKCS#11 attribute to a kind and printable names
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Attrmap {
    id: CK_ULONG,
    name: &'static str,
    display: &'static str,
    kind: AttrKind,
}

/// Helper macro to populate the static attributes map
macro_rules! attrmap_element {
    ($id:expr; $display:expr; as $kind:ident) => {
        Attrmap {
            id: $id,
            name: stringify!($id),
            display: $display,
            kind: AttrKind::$kind,
        }
    };
}

/// The main attributes map, list all known attributes
static ATTRMAP: [Attrmap; 107] = [
    attrmap_element!(CKA_CLASS; "Class"; as ObjectClass),
    attrmap_element!(CKA_TOKEN; "Token"; as Bool),
    attrmap_element!(CKA_PRIVATE; "Private"; as Bool),
    attrmap_element!(CKA_LABEL; "Label"; as Chars),
    attrmap_element!(CKA_UNIQUE_ID; "Unique ID"; as Chars),
    attrmap_element!(CKA_APPLICATION; "Application"; as Chars),
    attrmap_element!(CKA_VALUE; "Value"; as Bytes),
    attrmap_element!(CKA_OBJECT_ID; "Object ID"; as Bytes),
    attrmap_element!(CKA_CERTIFICATE_TYPE; "Certificate Type"; as CertificateType),
    attrmap_element!(CKA_ISSUER; "Issuer"; as Bytes),
    attrmap_element!(CKA_SERIAL_NUMBER; "Serial Number"; as Bytes),
    attrmap_element!(CKA_AC_ISSUER; "AC Issuer"; as Bytes),
    attrmap_element!(CKA_OWNER; "Owner"; as Bytes),
    attrmap_element!(CKA_ATTR_TYPES; "Attribute Types"; as Bytes),
    attrmap_element!(CKA_TRUSTED; "Trusted"; as Bool),
    attrmap_element!(CKA_CERTIFICATE_CATEGORY; "Certificate Category"; as Ulong),
    attrmap_element!(CKA_JAVA_MIDP_SECURITY_DOMAIN; "Java MIDP Security Domain"; as Ulong),
    attrmap_element!(CKA_URL; "URL"; as Chars),
    attrmap_element!(CKA_HASH_OF_SUBJECT_PUBLIC_KEY; "Hash Of Subject Public Key"; as Bytes),
    attrmap_element!(CKA_HASH_OF_ISSUER_PUBLIC_KEY; "Hash Of Issuer Public Key"; as Bytes),
    attrmap_element!(CKA_NAME_HASH_ALGORITHM; "Name Hash Algorithm"; as Mechanism),
    attrmap_element!(CKA_CHECK_VALUE; "Check Value"; as Bytes),
    attrmap_element!(CKA_KEY_TYPE; "Key Type"; as KeyType),
    attrmap_element!(CKA_SUBJECT; "Subject"; as Bytes),
    attrmap_element!(CKA_ID; "ID"; as Bytes),
    attrmap_element!(CKA_SENSITIVE; "Sensitive"; as Bool),
    attrmap_element!(CKA_ENCRYPT; "Encrypt"; as Bool),
    attrmap_element!(CKA_DECRYPT; "Decrypt"; as Bool),
    attrmap_element!(CKA_WRAP; "Wrap"; as Bool),
    attrmap_element!(CKA_UNWRAP; "Unwrap"; as Bool),
    attrmap_element!(CKA_SIGN; "Sign"; as Bool),
    attrmap_element!(CKA_SIGN_RECOVER; "Sign Recover"; as Bool),
    attrmap_element!(CKA_VERIFY; "Verify"; as Bool),
    attrmap_element!(CKA_VERIFY_RECOVER; "Verify Recover"; as Bool),
    attrmap_element!(CKA_DERIVE; "Derive"; as Bool),
    attrmap_element!(CKA_START_DATE; "Start Date"; as Date),
    attrmap_element!(CKA_END_DATE; "End Date"; as Date),
    attrmap_element!(CKA_MODULUS; "Modulus"; as Bytes),
    attrmap_element!(CKA_MODULUS_BITS; "Modulus Bits"; as Ulong),
    attrmap_element!(CKA_PUBLIC_EXPONENT; "Public Exponent"; as Bytes),
    attrmap_element!(CKA_PRIVATE_EXPONENT; "Private Exponent"; as Bytes),
    attrmap_element!(CKA_PRIME_1; "Prime 1"; as Bytes),
    attrmap_element!(CKA_PRIME_2; "Prime 2"; as Bytes),
    attrmap_element!(CKA_EXPONENT_1; "Exponent 1"; as Bytes),
    attrmap_element!(CKA_EXPONENT_2; "Exponent 2"; as Bytes),
    attrmap_element!(CKA_COEFFICIENT; "Coefficient"; as Bytes),
    attrmap_element!(CKA_PUBLIC_KEY_INFO; "Public Key Info"; as Bytes),
    attrmap_element!(CKA_PRIME; "Prime"; as Bytes),
    attrmap_element!(CKA_SUBPRIME; "Subprime"; as Bytes),
    attrmap_element!(CKA_BASE; "Base"; as Bytes),
    attrmap_element!(CKA_PRIME_BITS; "Prime Bits"; as Ulong),
    attrmap_element!(CKA_SUBPRIME_BITS; "Subprime Bits"; as Ulong),
    attrmap_element!(CKA_VALUE_BITS; "Value Bits"; as Ulong),
    attrmap_element!(CKA_VALUE_LEN; "Value Length"; as Ulong),
    attrmap_element!(CKA_EXTRACTABLE; "Extractable"; as Bool),
    attrmap_element!(CKA_LOCAL; "Local"; as Bool),
    attrmap_element!(CKA_NEVER_EXTRACTABLE; "Never Extractable"; as Bool),
    attrmap_element!(CKA_ALWAYS_SENSITIVE; "Always Sensitive"; as Bool),
    attrmap_element!(CKA_KEY_GEN_MECHANISM; "Key Generation Mechanism"; as Mechanism),
    attrmap_element!(CKA_MODIFIABLE; "Modifiable"; as Bool),
    attrmap_element!(CKA_COPYABLE; "Copyable"; as Bool),
    attrmap_element!(CKA_DESTROYABLE; "Destroyable"; as Bool),
    attrmap_element!(CKA_EC_PARAMS; "EC Parameters"; as Bytes),
    attrmap_element!(CKA_EC_POINT; "EC Point"; as Bytes),
    attrmap_element!(CKA_SECONDARY_AUTH; "Secondary Authentication"; as Bool),
    attrmap_element!(CKA_AUTH_PIN_FLAGS; "Authentication PIN Flags"; as Ulong),
    attrmap_element!(CKA_ALWAYS_AUTHENTICATE; "Always Authenticate"; as Bool),
    attrmap_element!(CKA_WRAP_WITH_TRUSTED; "Wrap With Trusted"; as Bool),
    attrmap_element!(CKA_OTP_FORMAT; "OTP Format"; as Ulong),
    attrmap_element!(CKA_OTP_LENGTH; "OTP Length"; as Ulong),
    attrmap_element!(CKA_OTP_TIME_INTERVAL; "OTP Time Interval"; as Ulong),
    attrmap_element!(CKA_OTP_USER_FRIENDLY_MODE; "OTP User Friendly Mode"; as Bool),
    attrmap_element!(CKA_OTP_CHALLENGE_REQUIREMENT; "OTP Challenge Requirement"; as Ulong),
    attrmap_element!(CKA_OTP_TIME_REQUIREMENT; "OTP Time Requirement"; as Ulong),
    attrmap_element!(CKA_OTP_COUNTER_REQUIREMENT; "OTP Counter Requirement"; as Ulong),
    attrmap_element!(CKA_OTP_PIN_REQUIREMENT; "OTP PIN Requirement"; as Ulong),
    attrmap_element!(CKA_OTP_USER_IDENTIFIER; "OTP User Identifier"; as Chars),
    attrmap_element!(CKA_OTP_SERVICE_IDENTIFIER; "OTP Service Identifier"; as Chars),
    attrmap_element!(CKA_OTP_SERVICE_LOGO; "OTP Service Logo"; as Bytes),
    attrmap_element!(CKA_OTP_SERVICE_LOGO_TYPE; "OTP Service Logo Type"; as Chars),
    attrmap_element!(CKA_OTP_COUNTER; "OTP Counter"; as Bytes),
    attrmap_element!(CKA_OTP_TIME; "OTP Time"; as Chars),
    attrmap_element!(CKA_GOSTR3410_PARAMS; "GOST R 34.10 Parameters"; as Bytes),
    attrmap_element!(CKA_GOSTR3411_PARAMS; "GOST R 34.11 Parameters"; as Bytes),
    attrmap_element!(CKA_GOST28147_PARAMS; "GOST 28147 Parameters"; as Bytes),
    attrmap_element!(CKA_HW_FEATURE_TYPE; "Hardware Feature Type"; as HwFeatureType),
    attrmap_element!(CKA_RESET_ON_INIT; "Reset on Initialization"; as Bool),
    attrmap_element!(CKA_HAS_RESET; "Has been reset"; as Bool),
    attrmap_element!(CKA_PIXEL_X; "Pixel X"; as Ulong),
    attrmap_element!(CKA_PIXEL_Y; "Pixel Y"; as Ulong),
    attrmap_element!(CKA_RESOLUTION; "Resolution"; as Ulong),
    attrmap_element!(CKA_CHAR_ROWS; "Char Rows"; as Ulong),
    attrmap_element!(CKA_CHAR_COLUMNS; "Char Columns"; as Ulong),
    attrmap_element!(CKA_COLOR; "Color"; as Bool),
    attrmap_element!(CKA_BITS_PER_PIXEL; "Bits per Pixel"; as Ulong),
    attrmap_element!(CKA_CHAR_SETS; "Char Sets"; as Chars),
    attrmap_element!(CKA_ENCODING_METHODS; "Encoding Methods"; as Chars),
    attrmap_element!(CKA_MIME_TYPES; "MIME Types"; as Chars),
    attrmap_element!(CKA_MECHANISM_TYPE; "Mechanism Type"; as Mechanism),
    attrmap_element!(CKA_REQUIRED_CMS_ATTRIBUTES; "Required CMS Attributes"; as Bytes),
    attrmap_element!(CKA_DEFAULT_CMS_ATTRIBUTES; "Default CMS Attributes"; as Bytes),
    attrmap_element!(CKA_SUPPORTED_CMS_ATTRIBUTES; "Supported CMS Attributes"; as Bytes),
    attrmap_element!(CKA_PROFILE_ID; "Profile ID"; as Ulong),
    attrmap_element!(CKA_WRAP_TEMPLATE; "Wrap Template"; as AttributeArray),
    attrmap_element!(CKA_UNWRAP_TEMPLATE; "Unwrap Template"; as AttributeArray),
    attrmap_element!(CKA_DERIVE_TEMPLATE; "Derive Template"; as AttributeArray),
    attrmap_element!(CKA_ALLOWED_MECHANISMS; "Allowed Mechanisms"; as MechanismArray),
];

/// Lookup indexes over [ATTRMAP]
struct Registry {
    by_id: HashMap<CK_ATTRIBUTE_TYPE, &'static Attrmap>,
    ck_names: BiHashMap<CK_ATTRIBUTE_TYPE, &'static str>,
    display_names: BiHashMap<CK_ATTRIBUTE_TYPE, &'static str>,
}

impl Registry {
    fn build() -> Registry {
        let mut reg = Registry {
            by_id: HashMap::with_capacity(ATTRMAP.len()),
            ck_names: BiHashMap::with_capacity(ATTRMAP.len()),
            display_names: BiHashMap::with_capacity(ATTRMAP.len()),
        };
        for a in &ATTRMAP {
            reg.by_id.insert(a.id, a);
            reg.ck_names.insert(a.id, a.name);
            reg.display_names.insert(a.id, a.display);
        }
        log::trace!("attribute registry built with {} types", reg.by_id.len());
        reg
    }
}

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::build);

/// Returns the display name of an attribute type
///
/// Codes with the vendor-defined bit set are rendered as
/// `VENDOR_DEFINED[0x...]` and other unknown codes as `[0x...]`.
pub fn name_of(code: CK_ATTRIBUTE_TYPE) -> String {
    match REGISTRY.by_id.get(&code) {
        Some(a) => a.display.to_string(),
        None => unknown_code_name(code),
    }
}

/// Returns the kind of value an attribute type carries, None for types
/// that are not in the registry
pub fn kind_of(code: CK_ATTRIBUTE_TYPE) -> Option<AttrKind> {
    REGISTRY.by_id.get(&code).map(|a| a.kind)
}

/// Returns the PKCS#11 constant name (eg. `CKA_CLASS`) of a known type
pub fn ck_name_of(code: CK_ATTRIBUTE_TYPE) -> Option<&'static str> {
    REGISTRY.ck_names.get_by_left(&code).copied()
}

/// Finds an attribute type by constant name or by display name
pub fn code_by_name(name: &str) -> Option<CK_ATTRIBUTE_TYPE> {
    match REGISTRY.ck_names.get_by_right(name) {
        Some(id) => Some(*id),
        None => REGISTRY.display_names.get_by_right(name).copied(),
    }
}

/// Returns all known attribute types in ascending order
pub fn known_types() -> Vec<CK_ATTRIBUTE_TYPE> {
    let mut v: Vec<CK_ATTRIBUTE_TYPE> = REGISTRY.by_id.keys().copied().collect();
    v.sort_unstable();
    v
}
