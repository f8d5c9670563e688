// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This module provides the typed [Attribute] representation and the
//! [AttrValue] payloads it can carry.
//!
//! An attribute always knows its type code and the [AttrKind] of value it
//! holds. It starts out absent, binding a value marks it present and not
//! sensitive. Attributes read back from a token may instead be marked
//! sensitive, in which case they are present but carry no value.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::codec::CkDate;
use crate::error::{Error, Result};
use crate::misc::zeromem;
use crate::names;
use crate::pkcs11::*;
use crate::registry::{self, AttrKind};

use bitflags::bitflags;
use itertools::Itertools;
use num_bigint::BigUint;

bitflags! {
    /// State of an attribute with respect to the object it describes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u8 {
        /// The attribute holds a value or is known to exist on the token
        const PRESENT   = 0x01;
        /// The token refused to reveal the value
        const SENSITIVE = 0x02;
    }
}

/// A typed attribute payload, one variant per [AttrKind]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    Bool(bool),
    Ulong(CK_ULONG),
    Bytes(Vec<u8>),
    /// Character data, stored as the raw bytes the token returned
    Chars(Vec<u8>),
    /// `None` is the empty date a token may hold in place of a real one
    Date(Option<CkDate>),
    ObjectClass(CK_OBJECT_CLASS),
    KeyType(CK_KEY_TYPE),
    CertificateType(CK_CERTIFICATE_TYPE),
    HwFeatureType(CK_HW_FEATURE_TYPE),
    Mechanism(CK_MECHANISM_TYPE),
    MechanismArray(Vec<CK_MECHANISM_TYPE>),
    AttributeArray(Vec<Attribute>),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Bool(_) => AttrKind::Bool,
            AttrValue::Ulong(_) => AttrKind::Ulong,
            AttrValue::Bytes(_) => AttrKind::Bytes,
            AttrValue::Chars(_) => AttrKind::Chars,
            AttrValue::Date(_) => AttrKind::Date,
            AttrValue::ObjectClass(_) => AttrKind::ObjectClass,
            AttrValue::KeyType(_) => AttrKind::KeyType,
            AttrValue::CertificateType(_) => AttrKind::CertificateType,
            AttrValue::HwFeatureType(_) => AttrKind::HwFeatureType,
            AttrValue::Mechanism(_) => AttrKind::Mechanism,
            AttrValue::MechanismArray(_) => AttrKind::MechanismArray,
            AttrValue::AttributeArray(_) => AttrKind::AttributeArray,
        }
    }

    /// Builds the value of an enumerated kind from its code
    pub fn from_code(kind: AttrKind, code: CK_ULONG) -> Result<AttrValue> {
        Ok(match kind {
            AttrKind::Ulong => AttrValue::Ulong(code),
            AttrKind::ObjectClass => AttrValue::ObjectClass(code),
            AttrKind::KeyType => AttrValue::KeyType(code),
            AttrKind::CertificateType => AttrValue::CertificateType(code),
            AttrKind::HwFeatureType => AttrValue::HwFeatureType(code),
            AttrKind::Mechanism => AttrValue::Mechanism(code),
            _ => {
                return Err(Error::unsupported(format!(
                    "{} does not hold a CK_ULONG",
                    kind
                )))
            }
        })
    }

    fn zeroize(&mut self) {
        match self {
            AttrValue::Bytes(v) | AttrValue::Chars(v) => {
                zeromem(v.as_mut_slice())
            }
            AttrValue::AttributeArray(a) => {
                for attr in a.iter_mut() {
                    attr.zeroize();
                }
            }
            _ => (),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Ulong(u) => write!(f, "{}", u),
            AttrValue::Bytes(v) => f.write_str(&hex::encode(v)),
            AttrValue::Chars(v) => f.write_str(&String::from_utf8_lossy(v)),
            AttrValue::Date(Some(d)) => write!(f, "{}", d),
            AttrValue::Date(None) => Ok(()),
            AttrValue::ObjectClass(c)
            | AttrValue::KeyType(c)
            | AttrValue::CertificateType(c)
            | AttrValue::HwFeatureType(c)
            | AttrValue::Mechanism(c) => {
                f.write_str(&names::display_name(self.kind(), *c))
            }
            AttrValue::MechanismArray(m) => write!(
                f,
                "[{}]",
                m.iter()
                    .map(|c| names::display_name(AttrKind::Mechanism, *c))
                    .join(", ")
            ),
            AttrValue::AttributeArray(a) => write!(
                f,
                "[{}]",
                a.iter().map(|attr| attr.to_string_with_name()).join(", ")
            ),
        }
    }
}

/// A Rust native, typed attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    ck_type: CK_ATTRIBUTE_TYPE,
    kind: AttrKind,
    flags: AttrFlags,
    value: Option<AttrValue>,
}

impl Attribute {
    /// Creates an absent attribute with the kind the registry assigns to
    /// the type, unknown types are treated as byte sequences
    pub fn new(t: CK_ATTRIBUTE_TYPE) -> Attribute {
        Self::with_kind(t, registry::kind_of(t).unwrap_or(AttrKind::Bytes))
    }

    /// Creates an absent attribute of an explicit kind
    pub fn with_kind(t: CK_ATTRIBUTE_TYPE, kind: AttrKind) -> Attribute {
        Attribute {
            ck_type: t,
            kind: kind,
            flags: AttrFlags::empty(),
            value: None,
        }
    }

    /// Creates a present attribute from any value
    ///
    /// Note: Does not verify that the attribute id type is correct
    pub fn from_value(t: CK_ATTRIBUTE_TYPE, val: AttrValue) -> Attribute {
        Attribute {
            ck_type: t,
            kind: val.kind(),
            flags: AttrFlags::PRESENT,
            value: Some(val),
        }
    }

    pub fn from_bool(t: CK_ATTRIBUTE_TYPE, val: bool) -> Attribute {
        Self::from_value(t, AttrValue::Bool(val))
    }

    pub fn from_ulong(t: CK_ATTRIBUTE_TYPE, val: CK_ULONG) -> Attribute {
        Self::from_value(t, AttrValue::Ulong(val))
    }

    pub fn from_bytes(t: CK_ATTRIBUTE_TYPE, val: Vec<u8>) -> Attribute {
        Self::from_value(t, AttrValue::Bytes(val))
    }

    /// Creates a character sequence attribute from a String
    pub fn from_string(t: CK_ATTRIBUTE_TYPE, val: String) -> Attribute {
        Self::from_value(t, AttrValue::Chars(val.into_bytes()))
    }

    /// Creates a character sequence attribute from raw bytes, no encoding
    /// is enforced
    pub fn from_chars(t: CK_ATTRIBUTE_TYPE, val: Vec<u8>) -> Attribute {
        Self::from_value(t, AttrValue::Chars(val))
    }

    pub fn from_date(t: CK_ATTRIBUTE_TYPE, val: CkDate) -> Attribute {
        Self::from_value(t, AttrValue::Date(Some(val)))
    }

    pub fn from_empty_date(t: CK_ATTRIBUTE_TYPE) -> Attribute {
        Self::from_value(t, AttrValue::Date(None))
    }

    pub fn from_object_class(
        t: CK_ATTRIBUTE_TYPE,
        val: CK_OBJECT_CLASS,
    ) -> Attribute {
        Self::from_value(t, AttrValue::ObjectClass(val))
    }

    pub fn from_key_type(t: CK_ATTRIBUTE_TYPE, val: CK_KEY_TYPE) -> Attribute {
        Self::from_value(t, AttrValue::KeyType(val))
    }

    pub fn from_certificate_type(
        t: CK_ATTRIBUTE_TYPE,
        val: CK_CERTIFICATE_TYPE,
    ) -> Attribute {
        Self::from_value(t, AttrValue::CertificateType(val))
    }

    pub fn from_hw_feature_type(
        t: CK_ATTRIBUTE_TYPE,
        val: CK_HW_FEATURE_TYPE,
    ) -> Attribute {
        Self::from_value(t, AttrValue::HwFeatureType(val))
    }

    pub fn from_mechanism(
        t: CK_ATTRIBUTE_TYPE,
        val: CK_MECHANISM_TYPE,
    ) -> Attribute {
        Self::from_value(t, AttrValue::Mechanism(val))
    }

    pub fn from_mechanisms(
        t: CK_ATTRIBUTE_TYPE,
        val: Vec<CK_MECHANISM_TYPE>,
    ) -> Attribute {
        Self::from_value(t, AttrValue::MechanismArray(val))
    }

    /// Creates an attribute array (a nested template) attribute
    pub fn from_attrs(t: CK_ATTRIBUTE_TYPE, val: Vec<Attribute>) -> Attribute {
        Self::from_value(t, AttrValue::AttributeArray(val))
    }

    /// Creates an attribute holding the code of an enumerated type, the
    /// kind is taken from the registry
    pub fn from_code(t: CK_ATTRIBUTE_TYPE, code: CK_ULONG) -> Result<Attribute> {
        match registry::kind_of(t) {
            Some(kind) => Ok(Self::from_value(t, AttrValue::from_code(kind, code)?)),
            None => Err(Error::unsupported(format!(
                "{} has no registered kind",
                registry::name_of(t)
            ))),
        }
    }

    /// Creates a byte sequence attribute holding the big endian
    /// representation of an unsigned big integer
    pub fn from_biguint(t: CK_ATTRIBUTE_TYPE, val: &BigUint) -> Attribute {
        Self::from_bytes(t, val.to_bytes_be())
    }

    /// Returns the PKCS#11 attribute 'type' which is the attribute ID
    pub fn get_type(&self) -> CK_ATTRIBUTE_TYPE {
        self.ck_type
    }

    pub fn kind(&self) -> AttrKind {
        self.kind
    }

    pub fn flags(&self) -> AttrFlags {
        self.flags
    }

    pub fn is_present(&self) -> bool {
        self.flags.contains(AttrFlags::PRESENT)
    }

    pub fn is_sensitive(&self) -> bool {
        self.flags.contains(AttrFlags::SENSITIVE)
    }

    /// Returns the bound value, None for absent and sensitive attributes
    pub fn value(&self) -> Option<&AttrValue> {
        self.value.as_ref()
    }

    /// Returns the display name of the attribute type
    pub fn name(&self) -> String {
        registry::name_of(self.ck_type)
    }

    /// Binds a value to the attribute
    ///
    /// The value must be of the attribute's kind. On success the attribute
    /// is present and not sensitive.
    pub fn set_value(&mut self, val: AttrValue) -> Result<()> {
        if val.kind() != self.kind {
            return Err(Error::unsupported(format!(
                "{} holds a {}, got a {}",
                self.name(),
                self.kind,
                val.kind()
            )));
        }
        self.value = Some(val);
        self.flags = AttrFlags::PRESENT;
        Ok(())
    }

    /// Marks the attribute as present on the token but not readable
    pub fn set_sensitive(&mut self) {
        if let Some(v) = self.value.as_mut() {
            v.zeroize();
        }
        self.value = None;
        self.flags = AttrFlags::PRESENT | AttrFlags::SENSITIVE;
    }

    /// Returns the attribute to the absent state
    pub fn clear(&mut self) {
        if let Some(v) = self.value.as_mut() {
            v.zeroize();
        }
        self.value = None;
        self.flags = AttrFlags::empty();
    }

    fn get(&self, kind: AttrKind) -> Result<&AttrValue> {
        if self.kind != kind {
            return Err(Error::unsupported(format!(
                "{} is a {}, not a {}",
                self.name(),
                self.kind,
                kind
            )));
        }
        match &self.value {
            Some(v) => Ok(v),
            None => Err(Error::not_found(self.name())),
        }
    }

    /// Returns the value as a boolean
    ///
    /// Returns an UnsupportedValueType error if the attribute is not a
    /// boolean and an AttributeNotFound error if it holds no value
    pub fn to_bool(&self) -> Result<bool> {
        match self.get(AttrKind::Bool)? {
            AttrValue::Bool(b) => Ok(*b),
            _ => Err(CKR_GENERAL_ERROR)?,
        }
    }

    pub fn to_ulong(&self) -> Result<CK_ULONG> {
        match self.get(AttrKind::Ulong)? {
            AttrValue::Ulong(u) => Ok(*u),
            _ => Err(CKR_GENERAL_ERROR)?,
        }
    }

    /// Returns the code held by any of the enumerated kinds
    pub fn to_code(&self) -> Result<CK_ULONG> {
        if !self.kind.is_code() {
            return Err(Error::unsupported(format!(
                "{} is a {}, not an enumerated code",
                self.name(),
                self.kind
            )));
        }
        match self.get(self.kind)? {
            AttrValue::ObjectClass(c)
            | AttrValue::KeyType(c)
            | AttrValue::CertificateType(c)
            | AttrValue::HwFeatureType(c)
            | AttrValue::Mechanism(c) => Ok(*c),
            _ => Err(CKR_GENERAL_ERROR)?,
        }
    }

    pub fn to_bytes(&self) -> Result<&Vec<u8>> {
        match self.get(AttrKind::Bytes)? {
            AttrValue::Bytes(v) => Ok(v),
            _ => Err(CKR_GENERAL_ERROR)?,
        }
    }

    pub fn to_chars(&self) -> Result<&[u8]> {
        match self.get(AttrKind::Chars)? {
            AttrValue::Chars(v) => Ok(v.as_slice()),
            _ => Err(CKR_GENERAL_ERROR)?,
        }
    }

    /// Returns character data as an allocated String
    ///
    /// Returns a CKR_ATTRIBUTE_VALUE_INVALID error if the value is
    /// not valid UTF-8
    pub fn to_utf8(&self) -> Result<String> {
        Ok(String::from_utf8(self.to_chars()?.to_vec())?)
    }

    /// Returns the date, None for the empty date
    pub fn to_date(&self) -> Result<Option<CkDate>> {
        match self.get(AttrKind::Date)? {
            AttrValue::Date(d) => Ok(*d),
            _ => Err(CKR_GENERAL_ERROR)?,
        }
    }

    pub fn to_mechanisms(&self) -> Result<&[CK_MECHANISM_TYPE]> {
        match self.get(AttrKind::MechanismArray)? {
            AttrValue::MechanismArray(m) => Ok(m.as_slice()),
            _ => Err(CKR_GENERAL_ERROR)?,
        }
    }

    pub fn to_attrs(&self) -> Result<&[Attribute]> {
        match self.get(AttrKind::AttributeArray)? {
            AttrValue::AttributeArray(a) => Ok(a.as_slice()),
            _ => Err(CKR_GENERAL_ERROR)?,
        }
    }

    /// Interprets a byte sequence as a big endian unsigned integer
    pub fn to_biguint(&self) -> Result<BigUint> {
        Ok(BigUint::from_bytes_be(self.to_bytes()?))
    }

    /// Zeroizes the internal value, recursing into attribute arrays
    pub fn zeroize(&mut self) {
        if let Some(v) = self.value.as_mut() {
            v.zeroize();
        }
    }

    /// Renders the attribute prefixed by its display name
    pub fn to_string_with_name(&self) -> String {
        format!("{}: {}", self.name(), self)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_present() {
            return f.write_str("<Attribute not present>");
        }
        if self.is_sensitive() {
            return f.write_str("<Value is sensitive>");
        }
        match &self.value {
            Some(v) => fmt::Display::fmt(v, f),
            None => f.write_str("<NULL_PTR>"),
        }
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Attribute) -> bool {
        if self.ck_type != other.ck_type {
            return false;
        }
        if !self.is_present() && !other.is_present() {
            return true;
        }
        self.flags == other.flags && self.value == other.value
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ck_type.hash(state);
        if self.is_present() {
            self.flags.hash(state);
            self.value.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_is_absent() {
        let a = Attribute::new(CKA_LABEL);
        assert!(!a.is_present());
        assert!(!a.is_sensitive());
        assert_eq!(a.kind(), AttrKind::Chars);
        assert_eq!(a.to_string(), "<Attribute not present>");
        assert!(a.to_chars().unwrap_err().attr_not_found());

        let u = Attribute::new(CKA_VENDOR_DEFINED | 1);
        assert_eq!(u.kind(), AttrKind::Bytes);
    }

    #[test]
    fn set_value_marks_present() {
        let mut a = Attribute::new(CKA_PRIVATE_EXPONENT);
        a.set_sensitive();
        assert!(a.is_present());
        assert_eq!(a.to_string(), "<Value is sensitive>");
        a.set_value(AttrValue::Bytes(vec![1, 2])).unwrap();
        assert!(a.is_present());
        assert!(!a.is_sensitive());
        assert_eq!(a.to_string(), "0102");

        let e = a.set_value(AttrValue::Bool(true)).unwrap_err();
        assert_eq!(e.kind(), crate::error::ErrorKind::UnsupportedValueType);
        assert_eq!(a.to_bytes().unwrap(), &vec![1u8, 2]);

        a.clear();
        assert!(!a.is_present());
    }

    #[test]
    fn accessors_check_kind() {
        let a = Attribute::from_bool(CKA_TOKEN, true);
        assert_eq!(a.to_bool().unwrap(), true);
        let e = a.to_ulong().unwrap_err();
        assert_eq!(e.kind(), crate::error::ErrorKind::UnsupportedValueType);
        assert!(a.to_code().is_err());

        let c = Attribute::from_code(CKA_KEY_TYPE, CKK_EC).unwrap();
        assert_eq!(c.kind(), AttrKind::KeyType);
        assert_eq!(c.to_code().unwrap(), CKK_EC);
        assert!(Attribute::from_code(CKA_LABEL, 1).is_err());
    }

    #[test]
    fn rendering() {
        let a = Attribute::from_object_class(CKA_CLASS, CKO_PUBLIC_KEY);
        assert_eq!(a.to_string(), "Public Key");
        assert_eq!(a.to_string_with_name(), "Class: Public Key");

        let d = Attribute::from_date(
            CKA_START_DATE,
            CkDate::new(2001, 9, 1).unwrap(),
        );
        assert_eq!(d.to_string(), "2001-09-01");

        let m = Attribute::from_mechanisms(
            CKA_ALLOWED_MECHANISMS,
            vec![CKM_AES_GCM, CKM_VENDOR_DEFINED | 2],
        );
        assert_eq!(m.to_string(), "[CKM_AES_GCM, VENDOR_DEFINED[0x80000002]]");

        let w = Attribute::from_attrs(
            CKA_WRAP_TEMPLATE,
            vec![
                Attribute::from_bool(CKA_ENCRYPT, true),
                Attribute::new(CKA_LABEL),
            ],
        );
        assert_eq!(
            w.to_string(),
            "[Encrypt: true, Label: <Attribute not present>]"
        );
    }

    #[test]
    fn equality_and_hash() {
        let mut a = Attribute::new(CKA_LABEL);
        let b = Attribute::with_kind(CKA_LABEL, AttrKind::Bytes);
        assert_eq!(a, b);
        assert_ne!(a, Attribute::new(CKA_ID));

        a.set_value(AttrValue::Chars(b"k1".to_vec())).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, Attribute::from_string(CKA_LABEL, "k1".to_string()));

        let mut set = HashSet::new();
        set.insert(Attribute::new(CKA_LABEL));
        assert!(set.contains(&b));
        set.insert(a.clone());
        assert!(set.contains(&a));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn biguint_round_trip() {
        let n = BigUint::from(65537u32);
        let a = Attribute::from_biguint(CKA_PUBLIC_EXPONENT, &n);
        assert_eq!(a.to_bytes().unwrap(), &vec![1u8, 0, 1]);
        assert_eq!(a.to_biguint().unwrap(), n);
    }

    #[test]
    fn zeroize_nested() {
        let mut a = Attribute::from_attrs(
            CKA_UNWRAP_TEMPLATE,
            vec![Attribute::from_bytes(CKA_VALUE, vec![0xaa; 4])],
        );
        a.zeroize();
        let inner = a.to_attrs().unwrap();
        assert_eq!(inner[0].to_bytes().unwrap(), &vec![0u8; 4]);
    }
}
