// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! The C view of a template: a contiguous `CK_ATTRIBUTE` array that can be
//! handed to a native `C_CreateObject` or `C_FindObjectsInit` call.

use crate::attribute::{AttrValue, Attribute};
use crate::codec::{self, CodecLimits, RawAttr};
use crate::error::{Error, Result};
use crate::misc::{sizeof, void_ptr, zeromem};
use crate::pkcs11::*;
use crate::registry::{self, AttrKind};
use crate::template::{check_kinds, has_value, BuildMode, Template};

/// Helper object to represent managed arrays of CK_ATTRIBUTEs
///
/// All the memory the `pValue` pointers refer to is owned by this object,
/// either as byte buffers or as child arrays for nested templates, and
/// stays valid and unmoved until it is dropped.
#[derive(Debug)]
pub struct CkAttrs {
    /// Storage for owned byte buffers backing the values.
    v: Vec<Vec<u8>>,
    /// Child arrays backing nested attribute arrays.
    children: Vec<CkAttrs>,
    /// The actual `CK_ATTRIBUTE` array.
    p: Vec<CK_ATTRIBUTE>,
    pub zeroize: bool,
}

impl Drop for CkAttrs {
    fn drop(&mut self) {
        if self.zeroize {
            while let Some(mut elem) = self.v.pop() {
                zeromem(elem.as_mut_slice());
            }
        }
    }
}

impl CkAttrs {
    /// Creates a new empty managed array of CK_ATTRIBUTEs
    pub fn new() -> CkAttrs {
        Self::with_capacity(0)
    }

    /// Creates a new empty managed array of CK_ATTRIBUTEs
    /// with the specified capacity
    pub fn with_capacity(capacity: usize) -> CkAttrs {
        CkAttrs {
            v: Vec::new(),
            children: Vec::new(),
            p: Vec::with_capacity(capacity),
            zeroize: false,
        }
    }

    /// Builds the array for a template in the given mode
    ///
    /// The same attributes are emitted as by [Template::build]. Nested
    /// attribute arrays point to child `CK_ATTRIBUTE` arrays and search
    /// wildcards have a NULL `pValue`.
    pub fn from_template(
        template: &Template,
        mode: BuildMode,
        limits: &CodecLimits,
    ) -> Result<CkAttrs> {
        let mut ca = CkAttrs::with_capacity(template.len());
        ca.add_attrs(template.as_slice(), mode, limits, 0)?;
        Ok(ca)
    }

    fn add_attrs(
        &mut self,
        attrs: &[Attribute],
        mode: BuildMode,
        limits: &CodecLimits,
        depth: usize,
    ) -> Result<()> {
        for attr in attrs {
            if !has_value(attr) {
                if mode == BuildMode::Search {
                    check_kinds(attr, mode)?;
                    self.add_unset(attr.get_type());
                }
                continue;
            }
            check_kinds(attr, mode)?;
            match attr.value() {
                Some(AttrValue::AttributeArray(inner)) => {
                    if depth + 1 > limits.max_depth {
                        return Err(Error::malformed(format!(
                            "attribute arrays nested deeper than {}",
                            limits.max_depth
                        )));
                    }
                    let mut child = CkAttrs::with_capacity(inner.len());
                    child.zeroize = self.zeroize;
                    child.add_attrs(inner, mode, limits, depth + 1)?;
                    self.add_child(attr.get_type(), child)?;
                }
                Some(v) => {
                    let data = codec::encode_value(v, mode, limits)?;
                    self.add_vec(attr.get_type(), data)?;
                }
                None => (),
            }
        }
        Ok(())
    }

    /// Add a new attribute to the array, the value is a vector of bytes
    ///
    /// The vector ownership is transferred to the array
    pub fn add_vec(
        &mut self,
        typ: CK_ATTRIBUTE_TYPE,
        val: Vec<u8>,
    ) -> Result<()> {
        self.v.push(val);
        match self.v.last() {
            Some(r) => {
                self.p.push(CK_ATTRIBUTE {
                    type_: typ,
                    pValue: void_ptr!(r.as_ptr()),
                    ulValueLen: CK_ULONG::try_from(r.len())?,
                });
                Ok(())
            }
            None => Err(CKR_GENERAL_ERROR)?,
        }
    }

    /// Add a new attribute to the array, the value is a CK_ULONG
    pub fn add_owned_ulong(
        &mut self,
        typ: CK_ATTRIBUTE_TYPE,
        val: CK_ULONG,
    ) -> Result<()> {
        self.add_vec(typ, val.to_ne_bytes().to_vec())
    }

    /// Adds a wildcard entry with no value buffer
    pub fn add_unset(&mut self, typ: CK_ATTRIBUTE_TYPE) {
        self.p.push(CK_ATTRIBUTE {
            type_: typ,
            pValue: std::ptr::null_mut(),
            ulValueLen: CK_UNAVAILABLE_INFORMATION,
        });
    }

    fn add_child(&mut self, typ: CK_ATTRIBUTE_TYPE, child: CkAttrs) -> Result<()> {
        let len = CK_ULONG::try_from(child.len())? * sizeof!(CK_ATTRIBUTE);
        let ptr = if child.is_empty() {
            std::ptr::null_mut()
        } else {
            void_ptr!(child.as_ptr())
        };
        self.children.push(child);
        self.p.push(CK_ATTRIBUTE {
            type_: typ,
            pValue: ptr,
            ulValueLen: len,
        });
        Ok(())
    }

    /// Returns the number of elements in the array
    pub fn len(&self) -> usize {
        self.p.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p.is_empty()
    }

    /// Returns a pointer to the array of CK_ATTRIBUTEs
    pub fn as_ptr(&self) -> *const CK_ATTRIBUTE {
        self.p.as_ptr()
    }

    /// Returns a mutable pointer to the array of CK_ATTRIBUTEs
    pub fn as_mut_ptr(&mut self) -> *mut CK_ATTRIBUTE {
        self.p.as_mut_ptr()
    }

    /// Returns a reference to the internal CK_ATTRIBUTEs array
    pub fn as_slice(&self) -> &[CK_ATTRIBUTE] {
        self.p.as_slice()
    }

    /// Finds an attribute by attribute id and return a reference to it
    /// if present, None if not found
    pub fn find_attr(&self, typ: CK_ATTRIBUTE_TYPE) -> Option<&CK_ATTRIBUTE> {
        self.p.iter().find(|a| a.type_ == typ)
    }

    /// Converts every element back into a typed attribute
    pub fn to_attributes(&self, limits: &CodecLimits) -> Result<Vec<Attribute>> {
        /* every pValue points into buffers owned by self */
        self.p
            .iter()
            .map(|a| unsafe { ck_to_attribute(a, limits) })
            .collect()
    }
}

unsafe fn ck_to_attribute_depth(
    ck: &CK_ATTRIBUTE,
    limits: &CodecLimits,
    depth: usize,
) -> Result<Attribute> {
    let kind = registry::kind_of(ck.type_).unwrap_or(AttrKind::Bytes);
    if ck.ulValueLen == CK_UNAVAILABLE_INFORMATION {
        return Ok(Attribute::with_kind(ck.type_, kind));
    }
    let len = usize::try_from(ck.ulValueLen)?;
    if ck.pValue.is_null() {
        if len != 0 {
            return Err(CKR_ARGUMENTS_BAD)?;
        }
    }
    if kind == AttrKind::AttributeArray {
        if depth + 1 > limits.max_depth {
            return Err(Error::malformed(format!(
                "attribute arrays nested deeper than {}",
                limits.max_depth
            )));
        }
        let size = std::mem::size_of::<CK_ATTRIBUTE>();
        if len % size != 0 {
            return Err(Error::malformed(format!(
                "{} bytes is not an array of CK_ATTRIBUTE",
                len
            )));
        }
        let elems: &[CK_ATTRIBUTE] = if len == 0 {
            &[]
        } else {
            unsafe {
                std::slice::from_raw_parts(
                    ck.pValue as *const CK_ATTRIBUTE,
                    len / size,
                )
            }
        };
        let inner = elems
            .iter()
            .map(|e| unsafe { ck_to_attribute_depth(e, limits, depth + 1) })
            .collect::<Result<Vec<Attribute>>>()?;
        return Ok(Attribute::from_attrs(ck.type_, inner));
    }
    let buf: &[u8] = if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ck.pValue as *const u8, len) }
    };
    codec::decode_as(&RawAttr::new(ck.type_, buf.to_vec()), kind, limits)
}

/// Converts a `CK_ATTRIBUTE` into a typed attribute
///
/// A length of `CK_UNAVAILABLE_INFORMATION` yields an absent attribute,
/// nested attribute arrays are followed through their child arrays.
///
/// # Safety
///
/// Unless `ulValueLen` is zero or `CK_UNAVAILABLE_INFORMATION`, `pValue`
/// must point to `ulValueLen` readable bytes. For attribute arrays those
/// bytes must be valid `CK_ATTRIBUTE` elements that satisfy the same
/// requirement, recursively.
pub unsafe fn ck_to_attribute(
    ck: &CK_ATTRIBUTE,
    limits: &CodecLimits,
) -> Result<Attribute> {
    unsafe { ck_to_attribute_depth(ck, limits, 0) }
}
