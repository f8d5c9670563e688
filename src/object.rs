// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This module defines [Object], the attribute table of one token object
//! as seen from the host side: a handle plus the attributes read from, or
//! destined to, the token.

use std::fmt;

use crate::attribute::Attribute;
use crate::error::{Error, Result};
use crate::pkcs11::*;
use crate::read::{read_into, ReadFailure, ReadPolicy};
use crate::template::{has_value, BuildMode, Template};
use crate::token::TokenAccess;

/// Helper macro that generates methods to check specific boolean
/// attributes on objects
macro_rules! create_bool_checker {
    (make $name:ident; from $id:expr; def $def:expr) => {
        #[doc = concat!("Returns the value of [", stringify!($id), "] as a boolean")]
        pub fn $name(&self) -> bool {
            match self.get_attr($id) {
                Some(a) => a.to_bool().unwrap_or($def),
                None => $def,
            }
        }
    };
}

/// Helper macro that generates methods to retrieve attributes
/// values of a specific type from objects
macro_rules! attr_as_type {
    (make $name:ident; with $r:ty; via $conv:ident) => {
        #[doc = concat!("Returns the value of the attribute as a `", stringify!($r), "`")]
        pub fn $name(&self, t: CK_ATTRIBUTE_TYPE) -> Result<$r> {
            match self.get_attr(t) {
                Some(attr) => attr.$conv(),
                None => Err(Error::not_found(crate::registry::name_of(t))),
            }
        }
    };
}

/// The attributes of one token object
///
/// Attributes keep the order in which they were first added.
#[derive(Debug, Clone, Default)]
pub struct Object {
    /// The object handle value
    ///
    /// CK_INVALID_HANDLE on objects not yet created on a token
    handle: CK_OBJECT_HANDLE,
    attributes: Vec<Attribute>,
    /// Zeroize every attribute value when the object is dropped
    zeroize: bool,
}

impl Drop for Object {
    fn drop(&mut self) {
        if self.zeroize {
            for a in self.attributes.iter_mut() {
                a.zeroize()
            }
        }
    }
}

impl Object {
    /// Creates a new empty Object
    pub fn new(handle: CK_OBJECT_HANDLE) -> Object {
        Object {
            handle: handle,
            attributes: Vec::new(),
            zeroize: false,
        }
    }

    /// Creates an object with absent attributes of the given types, ready
    /// to be filled by [Object::read_attributes]
    pub fn with_types(
        handle: CK_OBJECT_HANDLE,
        types: &[CK_ATTRIBUTE_TYPE],
    ) -> Object {
        let mut obj = Object::new(handle);
        for t in types {
            obj.set_attr(Attribute::new(*t));
        }
        obj
    }

    /// Creates an object from the attributes of a template
    pub fn from_template(handle: CK_OBJECT_HANDLE, template: Template) -> Object {
        let mut obj = Object::new(handle);
        for a in template {
            obj.set_attr(a);
        }
        obj
    }

    /// Set zeroization for the whole object, this is done when
    /// the object is dropped via the Drop trait and memory is freed.
    pub fn set_zeroize(&mut self) {
        self.zeroize = true;
    }

    pub fn set_handle(&mut self, h: CK_OBJECT_HANDLE) {
        self.handle = h;
    }

    pub fn get_handle(&self) -> CK_OBJECT_HANDLE {
        self.handle
    }

    /// Gets the object class, if known
    pub fn get_class(&self) -> Option<CK_OBJECT_CLASS> {
        self.get_attr(CKA_CLASS).and_then(|a| a.to_code().ok())
    }

    create_bool_checker! {make is_token; from CKA_TOKEN; def false}
    create_bool_checker! {make is_private; from CKA_PRIVATE; def true}
    create_bool_checker! {make is_modifiable; from CKA_MODIFIABLE; def true}
    create_bool_checker! {make is_extractable; from CKA_EXTRACTABLE; def false}

    /// Get an attribute from the object by attribute id
    pub fn get_attr(&self, ck_type: CK_ATTRIBUTE_TYPE) -> Option<&Attribute> {
        self.attributes.iter().find(|r| r.get_type() == ck_type)
    }

    pub fn get_attr_mut(
        &mut self,
        ck_type: CK_ATTRIBUTE_TYPE,
    ) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|r| r.get_type() == ck_type)
    }

    /// Sets or Replaces an attribute on the object
    pub fn set_attr(&mut self, a: Attribute) {
        let atype = a.get_type();
        match self.attributes.iter().position(|r| r.get_type() == atype) {
            Some(idx) => self.attributes[idx] = a,
            None => self.attributes.push(a),
        }
    }

    /// Deletes an attribute from the object by attribute id
    pub fn del_attr(&mut self, ck_type: CK_ATTRIBUTE_TYPE) {
        self.attributes.retain(|a| a.get_type() != ck_type);
    }

    /// Gets a reference to the internal vector of object attributes
    pub fn get_attributes(&self) -> &Vec<Attribute> {
        &self.attributes
    }

    attr_as_type! {make get_attr_as_bool; with bool; via to_bool}
    attr_as_type! {make get_attr_as_ulong; with CK_ULONG; via to_ulong}
    attr_as_type! {make get_attr_as_code; with CK_ULONG; via to_code}
    attr_as_type! {make get_attr_as_string; with String; via to_utf8}
    attr_as_type! {make get_attr_as_bytes; with &Vec<u8>; via to_bytes}

    /// Reads every attribute of the object from the token
    ///
    /// The attributes keep their kind, so types unknown to the registry can
    /// be read as something other than byte sequences by adding them with
    /// [Attribute::with_kind] first.
    pub fn read_attributes(
        &mut self,
        session: CK_SESSION_HANDLE,
        token: &dyn TokenAccess,
        policy: &ReadPolicy,
    ) -> Result<Vec<(CK_ATTRIBUTE_TYPE, ReadFailure)>> {
        read_into(session, self.handle, &mut self.attributes, token, policy)
    }

    /// Returns the attributes as a template for the given operation
    ///
    /// For `Create` only attributes holding a value are included, for
    /// `Search` all of them are, so absent ones become wildcards.
    pub fn template(&self, mode: BuildMode) -> Template {
        self.attributes
            .iter()
            .filter(|a| mode == BuildMode::Search || has_value(a))
            .cloned()
            .collect()
    }

    /// Checks that every attribute of the template holding a value is
    /// present on the object with the same value
    pub fn match_template(&self, template: &Template) -> bool {
        template
            .iter()
            .filter(|a| has_value(a))
            .all(|t| match self.get_attr(t.get_type()) {
                Some(a) => a == t,
                None => false,
            })
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object handle: {}", self.handle)?;
        for a in &self.attributes {
            write!(f, "\n  {}", a.to_string_with_name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_and_keeps_order() {
        let mut o = Object::new(5);
        o.set_attr(Attribute::from_object_class(CKA_CLASS, CKO_DATA));
        o.set_attr(Attribute::from_string(CKA_LABEL, "one".to_string()));
        o.set_attr(Attribute::from_string(CKA_LABEL, "two".to_string()));
        assert_eq!(o.get_attributes().len(), 2);
        assert_eq!(o.get_attr_as_string(CKA_LABEL).unwrap(), "two");
        assert_eq!(o.get_class(), Some(CKO_DATA));
        assert!(o.get_attr_as_bool(CKA_TOKEN).unwrap_err().attr_not_found());
        assert!(!o.is_token());
        assert!(o.is_private());
        o.del_attr(CKA_LABEL);
        assert!(o.get_attr(CKA_LABEL).is_none());
    }

    #[test]
    fn display_lists_attributes() {
        let mut o = Object::new(3);
        o.set_attr(Attribute::from_object_class(CKA_CLASS, CKO_SECRET_KEY));
        o.set_attr(Attribute::new(CKA_VALUE));
        assert_eq!(
            o.to_string(),
            "Object handle: 3\n  Class: Secret Key\n  Value: <Attribute not present>"
        );
    }

    #[test]
    fn template_modes_and_matching() {
        let mut o = Object::with_types(1, &[CKA_CLASS, CKA_ID]);
        o.set_attr(Attribute::from_object_class(CKA_CLASS, CKO_CERTIFICATE));
        assert_eq!(o.template(BuildMode::Create).len(), 1);
        assert_eq!(o.template(BuildMode::Search).len(), 2);

        let t = Template::from(vec![
            Attribute::from_object_class(CKA_CLASS, CKO_CERTIFICATE),
            Attribute::new(CKA_LABEL),
        ]);
        assert!(o.match_template(&t));
        let t = Template::from(vec![Attribute::from_object_class(
            CKA_CLASS,
            CKO_PUBLIC_KEY,
        )]);
        assert!(!o.match_template(&t));
    }
}
