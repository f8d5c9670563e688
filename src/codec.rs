// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Conversion between raw `(type, length, bytes)` triples and typed
//! attribute values.
//!
//! All functions here are pure: they only look at their arguments and the
//! read-only registry, so they can be called concurrently.

use std::fmt;

use crate::attribute::{AttrValue, Attribute};
use crate::error::{Error, Result};
use crate::misc::{ulong_from_ne, ulong_len, CK_ULONG_SIZE};
use crate::pkcs11::*;
use crate::registry::{self, AttrKind};
use crate::template::BuildMode;

/// Default maximum nesting of attribute arrays
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Length of the `YYYYMMDD` date encoding
const DATE_LEN: usize = 8;

/// The wire representation of one attribute
///
/// A `None` value is an unset triple: it has no buffer and its length is
/// reported as `CK_UNAVAILABLE_INFORMATION`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawAttr {
    pub type_: CK_ATTRIBUTE_TYPE,
    pub value: Option<Vec<u8>>,
}

impl RawAttr {
    pub fn new(type_: CK_ATTRIBUTE_TYPE, value: Vec<u8>) -> RawAttr {
        RawAttr {
            type_: type_,
            value: Some(value),
        }
    }

    pub fn unset(type_: CK_ATTRIBUTE_TYPE) -> RawAttr {
        RawAttr {
            type_: type_,
            value: None,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.value.is_none()
    }

    /// The length field as it appears on the wire
    pub fn len(&self) -> CK_ULONG {
        match &self.value {
            Some(v) => match ulong_len(v.len()) {
                Ok(l) => l,
                Err(_) => CK_UNAVAILABLE_INFORMATION,
            },
            None => CK_UNAVAILABLE_INFORMATION,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.value {
            Some(v) => v.as_slice(),
            None => &[],
        }
    }
}

/// Limits applied while encoding and decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum nesting of attribute arrays, the outermost array counts as 1
    pub max_depth: usize,
    /// Reject character sequences that are not valid UTF-8
    pub strict_chars: bool,
}

impl Default for CodecLimits {
    fn default() -> CodecLimits {
        CodecLimits {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_chars: false,
        }
    }
}

/// A calendar date as carried by `CKA_START_DATE` and `CKA_END_DATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CkDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl CkDate {
    /// Creates a date, checking that every field is within calendar range
    pub fn new(year: u16, month: u8, day: u8) -> Result<CkDate> {
        if year > 9999 || month < 1 || month > 12 || day < 1 || day > 31 {
            return Err(Error::malformed(format!(
                "invalid date {:04}-{:02}-{:02}",
                year, month, day
            )));
        }
        Ok(CkDate {
            year: year,
            month: month,
            day: day,
        })
    }

    /// Parses the `YYYY-MM-DD` form used in rendering and JSON
    pub fn parse(s: &str) -> Result<CkDate> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3
            || parts[0].len() != 4
            || parts[1].len() != 2
            || parts[2].len() != 2
        {
            return Err(Error::malformed(format!("invalid date \"{}\"", s)));
        }
        let bytes = format!("{}{}{}", parts[0], parts[1], parts[2]);
        let d = decode_date(bytes.as_bytes())?;
        CkDate::new(d.year, d.month, d.day)
    }

    /// Encodes the date as the 8 ASCII digits stored by tokens
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
            .into_bytes()
    }

    pub fn to_ck_date(&self) -> CK_DATE {
        let b = self.to_bytes();
        CK_DATE {
            year: [b[0], b[1], b[2], b[3]],
            month: [b[4], b[5]],
            day: [b[6], b[7]],
        }
    }

    pub fn from_ck_date(date: &CK_DATE) -> Result<CkDate> {
        let mut b = Vec::with_capacity(DATE_LEN);
        b.extend_from_slice(&date.year);
        b.extend_from_slice(&date.month);
        b.extend_from_slice(&date.day);
        decode_date(&b)
    }
}

impl fmt::Display for CkDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn decode_date(buf: &[u8]) -> Result<CkDate> {
    if buf.len() != DATE_LEN {
        return Err(Error::malformed(format!(
            "date must be {} bytes, got {}",
            DATE_LEN,
            buf.len()
        )));
    }
    if !buf.iter().all(|b| b.is_ascii_digit()) {
        return Err(Error::malformed(format!(
            "date contains non digit characters: {}",
            hex::encode(buf)
        )));
    }
    let num = |s: &[u8]| -> u16 {
        s.iter().fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'))
    };
    Ok(CkDate {
        year: num(&buf[0..4]),
        month: num(&buf[4..6]) as u8,
        day: num(&buf[6..8]) as u8,
    })
}

fn decode_word(buf: &[u8]) -> Result<CK_ULONG> {
    if buf.len() != CK_ULONG_SIZE {
        return Err(Error::malformed(format!(
            "expected {} bytes for a CK_ULONG, got {}",
            CK_ULONG_SIZE,
            buf.len()
        )));
    }
    ulong_from_ne(buf)
}

fn decode_bool(buf: &[u8]) -> Result<bool> {
    if buf.len() != 1 {
        return Err(Error::malformed(format!(
            "expected 1 byte for a CK_BBOOL, got {}",
            buf.len()
        )));
    }
    Ok(buf[0] != CK_FALSE)
}

fn decode_word_array(buf: &[u8]) -> Result<Vec<CK_ULONG>> {
    if buf.len() % CK_ULONG_SIZE != 0 {
        return Err(Error::malformed(format!(
            "array length {} is not a multiple of {}",
            buf.len(),
            CK_ULONG_SIZE
        )));
    }
    buf.chunks_exact(CK_ULONG_SIZE).map(ulong_from_ne).collect()
}

/// Cursor over an encoded attribute array
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::malformed(format!(
                "attribute array truncated: need {} bytes, {} left",
                n,
                self.remaining()
            )));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn word(&mut self) -> Result<CK_ULONG> {
        ulong_from_ne(self.take(CK_ULONG_SIZE)?)
    }
}

fn check_depth(depth: usize, limits: &CodecLimits) -> Result<()> {
    if depth > limits.max_depth {
        return Err(Error::malformed(format!(
            "attribute arrays nested deeper than {}",
            limits.max_depth
        )));
    }
    Ok(())
}

fn decode_attr_array(
    buf: &[u8],
    limits: &CodecLimits,
    depth: usize,
) -> Result<Vec<Attribute>> {
    check_depth(depth, limits)?;
    let mut rd = Reader { buf: buf, pos: 0 };
    let count = usize::try_from(rd.word()?)
        .map_err(|_| Error::malformed("invalid element count".to_string()))?;
    /* every element carries at least a type and a length word */
    if count > rd.remaining() / (2 * CK_ULONG_SIZE) {
        return Err(Error::malformed(format!(
            "attribute array claims {} elements in {} bytes",
            count,
            buf.len()
        )));
    }
    let mut attrs = Vec::with_capacity(count);
    for _ in 0..count {
        let type_ = rd.word()?;
        let len = rd.word()?;
        if len == CK_UNAVAILABLE_INFORMATION {
            attrs.push(Attribute::new(type_));
            continue;
        }
        let len = usize::try_from(len)
            .map_err(|_| Error::malformed("invalid length".to_string()))?;
        let data = rd.take(len)?;
        let kind = registry::kind_of(type_).unwrap_or(AttrKind::Bytes);
        let value = decode_depth(data, kind, limits, depth)?;
        let mut a = Attribute::with_kind(type_, kind);
        a.set_value(value)?;
        attrs.push(a);
    }
    if rd.remaining() != 0 {
        return Err(Error::malformed(format!(
            "{} trailing bytes after attribute array",
            rd.remaining()
        )));
    }
    Ok(attrs)
}

fn decode_depth(
    buf: &[u8],
    kind: AttrKind,
    limits: &CodecLimits,
    depth: usize,
) -> Result<AttrValue> {
    Ok(match kind {
        AttrKind::Bool => AttrValue::Bool(decode_bool(buf)?),
        AttrKind::Ulong => AttrValue::Ulong(decode_word(buf)?),
        AttrKind::Bytes => AttrValue::Bytes(buf.to_vec()),
        AttrKind::Chars => {
            if limits.strict_chars && std::str::from_utf8(buf).is_err() {
                return Err(Error::malformed(
                    "character sequence is not valid UTF-8".to_string(),
                ));
            }
            AttrValue::Chars(buf.to_vec())
        }
        AttrKind::Date => {
            if buf.is_empty() {
                AttrValue::Date(None)
            } else {
                AttrValue::Date(Some(decode_date(buf)?))
            }
        }
        AttrKind::ObjectClass => AttrValue::ObjectClass(decode_word(buf)?),
        AttrKind::KeyType => AttrValue::KeyType(decode_word(buf)?),
        AttrKind::CertificateType => {
            AttrValue::CertificateType(decode_word(buf)?)
        }
        AttrKind::HwFeatureType => AttrValue::HwFeatureType(decode_word(buf)?),
        AttrKind::Mechanism => AttrValue::Mechanism(decode_word(buf)?),
        AttrKind::MechanismArray => {
            AttrValue::MechanismArray(decode_word_array(buf)?)
        }
        AttrKind::AttributeArray => AttrValue::AttributeArray(
            decode_attr_array(buf, limits, depth + 1)?,
        ),
    })
}

/// Decodes a byte buffer as a value of the given kind
pub fn decode_value(
    buf: &[u8],
    kind: AttrKind,
    limits: &CodecLimits,
) -> Result<AttrValue> {
    decode_depth(buf, kind, limits, 0)
}

/// Decodes a raw triple into an attribute, dispatching on the registry
///
/// Types missing from the registry are decoded as byte sequences. An unset
/// triple yields an absent attribute.
pub fn decode(raw: &RawAttr, limits: &CodecLimits) -> Result<Attribute> {
    let kind = registry::kind_of(raw.type_).unwrap_or(AttrKind::Bytes);
    decode_as(raw, kind, limits)
}

/// Decodes a raw triple into an attribute of an explicit kind
pub fn decode_as(
    raw: &RawAttr,
    kind: AttrKind,
    limits: &CodecLimits,
) -> Result<Attribute> {
    let mut attr = Attribute::with_kind(raw.type_, kind);
    if let Some(buf) = &raw.value {
        attr.set_value(decode_value(buf, kind, limits)?)?;
    }
    Ok(attr)
}

fn push_word(out: &mut Vec<u8>, w: CK_ULONG) {
    out.extend_from_slice(&w.to_ne_bytes());
}

/// Decides how an attribute nested in an array is emitted: `Some(None)` is
/// an unset element, `None` skips it entirely.
fn nested_value(attr: &Attribute, mode: BuildMode) -> Option<Option<&AttrValue>> {
    match attr.value() {
        Some(v) if attr.is_present() => Some(Some(v)),
        _ => match mode {
            BuildMode::Create => None,
            BuildMode::Search => Some(None),
        },
    }
}

fn encode_attr_array(
    attrs: &[Attribute],
    mode: BuildMode,
    limits: &CodecLimits,
    depth: usize,
) -> Result<Vec<u8>> {
    check_depth(depth, limits)?;
    let mut body = Vec::new();
    let mut count: usize = 0;
    for a in attrs {
        let v = match nested_value(a, mode) {
            Some(v) => v,
            None => continue,
        };
        push_word(&mut body, a.get_type());
        match v {
            Some(v) => {
                let data = encode_depth(v, mode, limits, depth)?;
                push_word(&mut body, ulong_len(data.len())?);
                body.extend_from_slice(&data);
            }
            None => push_word(&mut body, CK_UNAVAILABLE_INFORMATION),
        }
        count += 1;
    }
    let mut out = Vec::with_capacity(CK_ULONG_SIZE + body.len());
    push_word(&mut out, ulong_len(count)?);
    out.extend_from_slice(&body);
    Ok(out)
}

fn encode_depth(
    value: &AttrValue,
    mode: BuildMode,
    limits: &CodecLimits,
    depth: usize,
) -> Result<Vec<u8>> {
    Ok(match value {
        AttrValue::Bool(b) => vec![if *b { CK_TRUE } else { CK_FALSE }],
        AttrValue::Ulong(w)
        | AttrValue::ObjectClass(w)
        | AttrValue::KeyType(w)
        | AttrValue::CertificateType(w)
        | AttrValue::HwFeatureType(w)
        | AttrValue::Mechanism(w) => w.to_ne_bytes().to_vec(),
        AttrValue::Bytes(v) | AttrValue::Chars(v) => v.clone(),
        AttrValue::Date(Some(d)) => d.to_bytes(),
        AttrValue::Date(None) => Vec::new(),
        AttrValue::MechanismArray(m) => {
            let mut out = Vec::with_capacity(m.len() * CK_ULONG_SIZE);
            for w in m {
                push_word(&mut out, *w);
            }
            out
        }
        AttrValue::AttributeArray(a) => {
            encode_attr_array(a, mode, limits, depth + 1)?
        }
    })
}

/// Encodes a value into the bytes a token expects
///
/// Absent attributes inside attribute arrays are skipped in `Create` mode
/// and emitted as unset elements in `Search` mode.
pub fn encode_value(
    value: &AttrValue,
    mode: BuildMode,
    limits: &CodecLimits,
) -> Result<Vec<u8>> {
    encode_depth(value, mode, limits, 0)
}

/// Encodes an attribute into a raw triple
///
/// Nested arrays keep their absent elements as unset entries so that the
/// triple decodes back to the same attribute.
pub fn encode(attr: &Attribute, limits: &CodecLimits) -> Result<RawAttr> {
    match attr.value() {
        Some(v) if attr.is_present() => Ok(RawAttr::new(
            attr.get_type(),
            encode_value(v, BuildMode::Search, limits)?,
        )),
        _ => Ok(RawAttr::unset(attr.get_type())),
    }
}
