// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This is p11attr
//!
//! The attribute marshaling layer of a PKCS#11 client: typed attribute
//! values, the codec between them and the raw (type, length, bytes)
//! triples a token speaks, template building for object creation and
//! search, and the two-pass protocol used to read attribute values back
//! from a token.

pub mod pkcs11;

pub mod error;

#[cfg(feature = "logger")]
pub mod log;

pub mod config;

/* Helper code */
mod misc;

pub mod names;
pub mod registry;

pub mod attribute;
pub mod codec;

pub mod ckattrs;
pub mod template;

pub mod read;
pub mod token;

pub mod json;
pub mod object;

pub use attribute::{AttrFlags, AttrValue, Attribute};
pub use codec::{CkDate, CodecLimits, RawAttr};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use read::{read_all, read_all_report, ReadFailure, ReadPolicy, ReadReport};
pub use registry::AttrKind;
pub use template::{build, BuildMode, Template};
pub use token::{FetchOutcome, FetchRequest, LengthOutcome, TokenAccess};

#[cfg(test)]
mod tests;
