// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

use crate::attribute::{AttrValue, Attribute};
use crate::codec::{self, CkDate, CodecLimits, RawAttr};
use crate::error::ErrorKind;
use crate::object::Object;
use crate::pkcs11::*;
use crate::read::{read_all, read_all_report, ReadFailure, ReadPolicy};
use crate::registry::{self, AttrKind};
use crate::template::{build, BuildMode, Template};
use crate::token::memory::MemoryToken;

macro_rules! ret_or_panic {
    ($ret:expr) => {
        match $ret {
            Ok(r) => r,
            Err(e) => panic!("{e}"),
        }
    };
}

mod util;
use util::*;

mod attrs;
mod reads;
