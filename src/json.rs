// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! JSON descriptions of templates and objects.
//!
//! Attributes are keyed by their PKCS#11 constant name (`CKA_LABEL`), or by
//! a hexadecimal type code (`0x80000001`) for types the registry does not
//! know. Values are mapped according to the attribute kind: booleans,
//! numbers, strings, base64 encoded byte sequences, `YYYY-MM-DD` dates,
//! constant names for enumerated codes, arrays of mechanism names and
//! nested objects for attribute arrays. `null` stands for an attribute
//! without a value, a search wildcard.
//!
//! Two markers cover values that have no plain JSON form: character
//! data that is not valid UTF-8 is written as `{"b64": "<base64>"}`, and
//! a value the token refused to reveal is written as `{"sensitive": true}`.
//! Attributes keep the order in which they appear.

use crate::attribute::{AttrValue, Attribute};
use crate::codec::CkDate;
use crate::error::{Error, Result};
use crate::names;
use crate::object::Object;
use crate::pkcs11::*;
use crate::registry::{self, AttrKind};
use crate::template::Template;

use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_string_pretty, Map, Number, Value};

fn invalid(key: &str, what: &str) -> Error {
    Error::malformed(format!("{}: expected {}", key, what))
}

fn type_key(t: CK_ATTRIBUTE_TYPE) -> String {
    match registry::ck_name_of(t) {
        Some(n) => n.to_string(),
        None => format!("0x{:x}", t),
    }
}

fn key_type(key: &str) -> Result<(CK_ATTRIBUTE_TYPE, AttrKind)> {
    if let Some((id, kind)) = AttrKind::attr_name_to_id_kind(key) {
        return Ok((id, kind));
    }
    match key.strip_prefix("0x") {
        Some(h) => match CK_ULONG::from_str_radix(h, 16) {
            Ok(id) => Ok((id, registry::kind_of(id).unwrap_or(AttrKind::Bytes))),
            Err(_) => Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
        },
        None => Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
    }
}

fn code_to_json(kind: AttrKind, code: CK_ULONG) -> Value {
    match names::lookup(kind, code) {
        Some(c) => Value::String(c.ck_name.to_string()),
        None => Value::Number(Number::from(code)),
    }
}

fn code_from_json(key: &str, kind: AttrKind, val: &Value) -> Result<CK_ULONG> {
    match val {
        Value::String(s) => match names::code_by_ck_name(kind, s) {
            Some(c) => Ok(c),
            None => Err(invalid(key, "a known constant name")),
        },
        Value::Number(n) => match n.as_u64() {
            Some(c) => Ok(CK_ULONG::try_from(c)?),
            None => Err(invalid(key, "an unsigned number")),
        },
        _ => Err(invalid(key, "a constant name or a number")),
    }
}

fn bytes_from_json(key: &str, val: &Value) -> Result<Vec<u8>> {
    match val.as_str() {
        Some(s) => match BASE64.decode(s.as_bytes()) {
            Ok(v) => Ok(v),
            Err(_) => Err(invalid(key, "base64 data")),
        },
        None => Err(invalid(key, "a base64 string")),
    }
}

const B64_MARKER: &str = "b64";
const SENSITIVE_MARKER: &str = "sensitive";

fn marker(name: &str, val: Value) -> Value {
    let mut map = Map::new();
    map.insert(name.to_string(), val);
    Value::Object(map)
}

/// Returns the content of a single key marker object
fn marker_value<'a>(val: &'a Value, name: &str) -> Option<&'a Value> {
    match val.as_object() {
        Some(m) if m.len() == 1 => m.get(name),
        _ => None,
    }
}

fn to_json_value(a: &Attribute) -> Value {
    if a.is_sensitive() {
        return marker(SENSITIVE_MARKER, Value::Bool(true));
    }
    let v = match a.value() {
        Some(v) if a.is_present() => v,
        _ => return Value::Null,
    };
    match v {
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Ulong(l) => Value::Number(Number::from(*l)),
        AttrValue::Bytes(b) => Value::String(BASE64.encode(b)),
        AttrValue::Chars(c) => match std::str::from_utf8(c) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => marker(B64_MARKER, Value::String(BASE64.encode(c))),
        },
        AttrValue::Date(Some(d)) => Value::String(d.to_string()),
        AttrValue::Date(None) => Value::String(String::new()),
        AttrValue::ObjectClass(c)
        | AttrValue::KeyType(c)
        | AttrValue::CertificateType(c)
        | AttrValue::HwFeatureType(c)
        | AttrValue::Mechanism(c) => code_to_json(v.kind(), *c),
        AttrValue::MechanismArray(m) => Value::Array(
            m.iter()
                .map(|c| code_to_json(AttrKind::Mechanism, *c))
                .collect(),
        ),
        AttrValue::AttributeArray(attrs) => Value::Object(to_json_map(attrs)),
    }
}

fn to_json_map(attrs: &[Attribute]) -> Map<String, Value> {
    let mut map = Map::new();
    for a in attrs {
        map.insert(type_key(a.get_type()), to_json_value(a));
    }
    map
}

fn from_json_value(key: &str, val: &Value) -> Result<Attribute> {
    let (id, kind) = key_type(key)?;
    if val.is_null() {
        return Ok(Attribute::with_kind(id, kind));
    }
    if let Some(s) = marker_value(val, SENSITIVE_MARKER) {
        if s.as_bool() != Some(true) {
            return Err(invalid(key, "a sensitive marker set to true"));
        }
        let mut a = Attribute::with_kind(id, kind);
        a.set_sensitive();
        return Ok(a);
    }
    let value = match kind {
        AttrKind::Bool => match val.as_bool() {
            Some(b) => AttrValue::Bool(b),
            None => return Err(invalid(key, "a boolean")),
        },
        AttrKind::Ulong => match val.as_u64() {
            Some(n) => AttrValue::Ulong(CK_ULONG::try_from(n)?),
            None => return Err(invalid(key, "an unsigned number")),
        },
        AttrKind::Bytes => AttrValue::Bytes(bytes_from_json(key, val)?),
        AttrKind::Chars => match (val.as_str(), marker_value(val, B64_MARKER)) {
            (Some(s), _) => AttrValue::Chars(s.as_bytes().to_vec()),
            (None, Some(b)) => AttrValue::Chars(bytes_from_json(key, b)?),
            (None, None) => return Err(invalid(key, "a string")),
        },
        AttrKind::Date => match val.as_str() {
            Some("") => AttrValue::Date(None),
            Some(s) => AttrValue::Date(Some(CkDate::parse(s)?)),
            None => return Err(invalid(key, "a YYYY-MM-DD date")),
        },
        AttrKind::ObjectClass
        | AttrKind::KeyType
        | AttrKind::CertificateType
        | AttrKind::HwFeatureType
        | AttrKind::Mechanism => {
            AttrValue::from_code(kind, code_from_json(key, kind, val)?)?
        }
        AttrKind::MechanismArray => match val.as_array() {
            Some(a) => AttrValue::MechanismArray(
                a.iter()
                    .map(|m| code_from_json(key, AttrKind::Mechanism, m))
                    .collect::<Result<Vec<CK_ULONG>>>()?,
            ),
            None => return Err(invalid(key, "an array of mechanisms")),
        },
        AttrKind::AttributeArray => match val.as_object() {
            Some(m) => AttrValue::AttributeArray(from_json_map(m)?),
            None => return Err(invalid(key, "an object")),
        },
    };
    Ok(Attribute::from_value(id, value))
}

fn from_json_map(map: &Map<String, Value>) -> Result<Vec<Attribute>> {
    map.iter().map(|(k, v)| from_json_value(k, v)).collect()
}

/// A template as a JSON object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonTemplate {
    attributes: Map<String, Value>,
}

impl JsonTemplate {
    pub fn from_template(t: &Template) -> JsonTemplate {
        JsonTemplate {
            attributes: to_json_map(t.as_slice()),
        }
    }

    pub fn from_object(o: &Object) -> JsonTemplate {
        JsonTemplate {
            attributes: to_json_map(o.get_attributes()),
        }
    }

    /// Converts the description into a template, attributes come in
    /// the order they appear in the JSON object
    pub fn to_template(&self) -> Result<Template> {
        Ok(Template::from(from_json_map(&self.attributes)?))
    }

    pub fn from_json(s: &str) -> Result<JsonTemplate> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(to_string_pretty(self)?)
    }

    pub fn load(filename: &str) -> Result<JsonTemplate> {
        let f = std::fs::File::open(filename)?;
        Ok(from_reader::<std::fs::File, JsonTemplate>(f)?)
    }
}

/// A list of object descriptions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonObjects {
    objects: Vec<JsonTemplate>,
}

impl JsonObjects {
    pub fn load(filename: &str) -> Result<JsonObjects> {
        let f = std::fs::File::open(filename)?;
        Ok(from_reader::<std::fs::File, JsonObjects>(f)?)
    }

    pub fn from_objects(objs: &[Object]) -> JsonObjects {
        JsonObjects {
            objects: objs.iter().map(JsonTemplate::from_object).collect(),
        }
    }

    /// Converts every description into an object, handles are left as
    /// CK_INVALID_HANDLE
    pub fn to_objects(&self) -> Result<Vec<Object>> {
        self.objects
            .iter()
            .map(|jt| {
                Ok(Object::from_template(CK_INVALID_HANDLE, jt.to_template()?))
            })
            .collect()
    }

    pub fn save(&self, filename: &str) -> Result<()> {
        let jstr = to_string_pretty(&self)?;
        std::fs::write(filename, jstr)?;
        Ok(())
    }
}
