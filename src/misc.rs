// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

/* misc utilities that do not really belong in any module */

use crate::error::Result;
use crate::pkcs11::*;

pub const CK_ULONG_SIZE: usize = std::mem::size_of::<CK_ULONG>();

macro_rules! void_ptr {
    ($ptr:expr) => {
        $ptr as *const _ as CK_VOID_PTR
    };
}
pub(crate) use void_ptr;

macro_rules! sizeof {
    ($type:ty) => {
        CK_ULONG::try_from(std::mem::size_of::<$type>()).unwrap()
    };
}
pub(crate) use sizeof;

/// Overwrites a buffer with zeros in a way the optimizer can not elide
pub fn zeromem(mem: &mut [u8]) {
    for b in mem.iter_mut() {
        unsafe { std::ptr::write_volatile(b, 0) };
    }
    std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
}

/// Reads one native endian CK_ULONG from the start of a slice
pub fn ulong_from_ne(buf: &[u8]) -> Result<CK_ULONG> {
    if buf.len() < CK_ULONG_SIZE {
        return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
    }
    Ok(CK_ULONG::from_ne_bytes(buf[..CK_ULONG_SIZE].try_into()?))
}

/// Converts a byte length into a CK_ULONG
pub fn ulong_len(len: usize) -> Result<CK_ULONG> {
    Ok(CK_ULONG::try_from(len)?)
}
