// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Ordered attribute templates and their serialization into raw triples
//! for object creation and object search.

use crate::attribute::{AttrValue, Attribute};
use crate::codec::{self, CodecLimits, RawAttr};
use crate::error::{Error, Result};
use crate::pkcs11::*;
use crate::registry;

use serde::{Deserialize, Serialize};

/// The operation a template is serialized for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildMode {
    /// Only present attributes are emitted
    Create,
    /// Absent attributes are emitted as unset wildcards
    Search,
}

/// An ordered sequence of attributes for one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    attrs: Vec<Attribute>,
}

impl Template {
    pub fn new() -> Template {
        Template { attrs: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Template {
        Template {
            attrs: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attrs.iter()
    }

    pub fn as_slice(&self) -> &[Attribute] {
        self.attrs.as_slice()
    }

    /// Appends an attribute, or replaces the one of the same type in place
    pub fn set(&mut self, attr: Attribute) {
        match self
            .attrs
            .iter()
            .position(|a| a.get_type() == attr.get_type())
        {
            Some(idx) => self.attrs[idx] = attr,
            None => self.attrs.push(attr),
        }
    }

    pub fn get(&self, t: CK_ATTRIBUTE_TYPE) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.get_type() == t)
    }

    pub fn get_mut(&mut self, t: CK_ATTRIBUTE_TYPE) -> Option<&mut Attribute> {
        self.attrs.iter_mut().find(|a| a.get_type() == t)
    }

    pub fn remove(&mut self, t: CK_ATTRIBUTE_TYPE) -> Option<Attribute> {
        let idx = self.attrs.iter().position(|a| a.get_type() == t)?;
        Some(self.attrs.remove(idx))
    }

    /// Serializes the template, see [build]
    pub fn build(
        &self,
        mode: BuildMode,
        limits: &CodecLimits,
    ) -> Result<Vec<RawAttr>> {
        build(&self.attrs, mode, limits)
    }

    pub fn zeroize(&mut self) {
        for a in self.attrs.iter_mut() {
            a.zeroize();
        }
    }
}

impl From<Vec<Attribute>> for Template {
    fn from(attrs: Vec<Attribute>) -> Template {
        Template { attrs: attrs }
    }
}

impl FromIterator<Attribute> for Template {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Template {
        Template {
            attrs: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Template {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.into_iter()
    }
}

impl<'a> IntoIterator for &'a Template {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

/// Whether the attribute carries a value that can be sent to a token
///
/// Sensitive attributes never carry one and are treated as absent.
pub(crate) fn has_value(attr: &Attribute) -> bool {
    attr.is_present() && attr.value().is_some()
}

/// Checks the attribute, and any nested template it carries, against the
/// kinds the registry assigns to their types
pub(crate) fn check_kinds(attr: &Attribute, mode: BuildMode) -> Result<()> {
    if let Some(kind) = registry::kind_of(attr.get_type()) {
        if kind != attr.kind() {
            log::warn!(
                "template attribute {} holds a {}, expected a {}",
                attr.name(),
                attr.kind(),
                kind
            );
            return Err(Error::template(format!(
                "{} must be a {}, not a {}",
                attr.name(),
                kind,
                attr.kind()
            )));
        }
    }
    if let Some(AttrValue::AttributeArray(inner)) = attr.value() {
        for a in inner {
            if has_value(a) || mode == BuildMode::Search {
                check_kinds(a, mode)?;
            }
        }
    }
    Ok(())
}

/// Serializes attributes into the raw triples a token call consumes
///
/// In `Create` mode only attributes with a value are emitted, in `Search`
/// mode absent and sensitive attributes become unset wildcards. Nested
/// attribute arrays are serialized with the same mode. The output keeps the
/// input order and is the same for the same input.
pub fn build(
    attrs: &[Attribute],
    mode: BuildMode,
    limits: &CodecLimits,
) -> Result<Vec<RawAttr>> {
    let mut out = Vec::with_capacity(attrs.len());
    for attr in attrs {
        if has_value(attr) {
            check_kinds(attr, mode)?;
            if let Some(v) = attr.value() {
                let data = codec::encode_value(v, mode, limits)?;
                out.push(RawAttr::new(attr.get_type(), data));
            }
        } else if mode == BuildMode::Search {
            check_kinds(attr, mode)?;
            out.push(RawAttr::unset(attr.get_type()));
        }
    }
    log::trace!("built {} triples from {} attributes", out.len(), attrs.len());
    Ok(out)
}
