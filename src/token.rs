// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This module defines the interface to the token collaborator: the thin
//! layer that performs the actual attribute value calls against a
//! PKCS#11 module on behalf of the read protocol.

use std::fmt::Debug;

use crate::error::Result;
use crate::pkcs11::*;

pub mod memory;

/// First pass result for one attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthOutcome {
    /// The value exists and needs this many bytes
    Length(CK_ULONG),
    /// The object has no such attribute
    NotPresent,
    /// The value exists but can not be revealed
    Sensitive,
    /// The token reported an error for this attribute only
    Error(CK_RV),
}

impl LengthOutcome {
    /// Maps the per-attribute result of a `C_GetAttributeValue` length
    /// query to an outcome
    ///
    /// `rv` is the return value of the whole call, it disambiguates the
    /// `CK_UNAVAILABLE_INFORMATION` length a token reports for both
    /// invalid and sensitive attributes.
    pub fn from_ck_attribute(attr: &CK_ATTRIBUTE, rv: CK_RV) -> LengthOutcome {
        if attr.ulValueLen != CK_UNAVAILABLE_INFORMATION {
            return LengthOutcome::Length(attr.ulValueLen);
        }
        match rv {
            CKR_ATTRIBUTE_SENSITIVE => LengthOutcome::Sensitive,
            CKR_OK | CKR_ATTRIBUTE_TYPE_INVALID => LengthOutcome::NotPresent,
            _ => LengthOutcome::Error(rv),
        }
    }
}

/// Second pass request: an attribute type and the buffer size offered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub type_: CK_ATTRIBUTE_TYPE,
    pub len: CK_ULONG,
}

/// Second pass result for one attribute type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Value(Vec<u8>),
    /// The offered buffer is too small, the value now needs this many bytes
    TooSmall(CK_ULONG),
    NotPresent,
    Sensitive,
}

/// Access to the attribute values of token objects
///
/// Both calls return one outcome per input element, in input order. An
/// `Err` means the call as a whole failed (lost session, removed device)
/// and aborts the read.
pub trait TokenAccess: Debug {
    fn query_lengths(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
        types: &[CK_ATTRIBUTE_TYPE],
    ) -> Result<Vec<LengthOutcome>>;

    fn fetch_values(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
        requests: &[FetchRequest],
    ) -> Result<Vec<FetchOutcome>>;
}
