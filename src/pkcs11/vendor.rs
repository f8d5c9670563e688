// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Helpers for the vendor-defined ranges of the PKCS#11 code spaces

use crate::pkcs11::*;

/// Returns true when the code carries the vendor-defined bit
///
/// Attribute types, object classes, key types, certificate types,
/// hardware feature types and mechanisms all share the same bit.
pub fn is_vendor_defined(code: CK_ULONG) -> bool {
    code & CKA_VENDOR_DEFINED != 0
}
