// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! PKCS#11 interface definitions
//!
//! The base types, the `CK_ATTRIBUTE` and `CK_DATE` structures and all
//! `CKA_/CKO_/CKK_/CKC_/CKH_/CKM_/CKR_` constants come from the
//! `cryptoki-sys` bindings and are re-exported here so the rest of the
//! crate can simply `use crate::pkcs11::*`.

pub use cryptoki_sys::*;

pub mod vendor;

// this is wrongly converted on 32b architecture to too large value
// which can not be represented in CK_ULONG.
pub const CK_UNAVAILABLE_INFORMATION: CK_ULONG = CK_ULONG::MAX;
