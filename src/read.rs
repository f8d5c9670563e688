// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! The two-pass attribute read protocol.
//!
//! The first pass asks the token for the length of every requested value,
//! the second fetches the values into exactly sized buffers. Values whose
//! size changes between the passes are retried one at a time, up to a
//! configurable number of times.

use std::fmt;

use crate::attribute::Attribute;
use crate::codec::{self, CodecLimits};
use crate::error::{Error, Result};
use crate::pkcs11::*;
use crate::token::{FetchOutcome, FetchRequest, LengthOutcome, TokenAccess};

/// Default number of single attribute retries after a size change
pub const DEFAULT_READ_RETRIES: usize = 1;

/// Tunables of the read protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    /// How many times a value that outgrew its buffer is fetched again
    pub max_retries: usize,
    pub limits: CodecLimits,
}

impl Default for ReadPolicy {
    fn default() -> ReadPolicy {
        ReadPolicy {
            max_retries: DEFAULT_READ_RETRIES,
            limits: CodecLimits::default(),
        }
    }
}

/// Why an attribute ended up absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFailure {
    /// The token reported this code for the attribute in the first pass
    Token(CK_RV),
    /// The value kept changing size, the last size seen is recorded
    Drift(CK_ULONG),
    /// The value could not be decoded as the attribute's kind
    Malformed(String),
}

impl ReadFailure {
    pub fn rv(&self) -> CK_RV {
        match self {
            ReadFailure::Token(rv) => *rv,
            ReadFailure::Drift(_) => CKR_BUFFER_TOO_SMALL,
            ReadFailure::Malformed(_) => CKR_ATTRIBUTE_VALUE_INVALID,
        }
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadFailure::Token(rv) => write!(f, "token error 0x{:x}", rv),
            ReadFailure::Drift(len) => {
                write!(f, "value size kept changing (last {} bytes)", len)
            }
            ReadFailure::Malformed(msg) => write!(f, "malformed value: {}", msg),
        }
    }
}

/// Result of a batch read with per-attribute diagnostics
#[derive(Debug, Clone)]
pub struct ReadReport {
    pub attributes: Vec<Attribute>,
    pub failures: Vec<(CK_ATTRIBUTE_TYPE, ReadFailure)>,
}

fn check_count(expected: usize, got: usize, call: &str) -> Result<()> {
    if expected != got {
        return Err(Error::token(
            CKR_GENERAL_ERROR,
            format!("{} returned {} results for {} types", call, got, expected),
        ));
    }
    Ok(())
}

/// Decodes a fetched buffer into the attribute, a failure leaves the
/// attribute absent and is returned
fn store(
    attr: &mut Attribute,
    buf: &[u8],
    limits: &CodecLimits,
) -> Option<ReadFailure> {
    match codec::decode_value(buf, attr.kind(), limits) {
        Ok(v) => match attr.set_value(v) {
            Ok(()) => None,
            Err(e) => {
                attr.clear();
                Some(ReadFailure::Malformed(e.to_string()))
            }
        },
        Err(e) => {
            attr.clear();
            Some(ReadFailure::Malformed(e.to_string()))
        }
    }
}

/// Fetches one attribute again after its value outgrew the buffer
fn retry(
    session: CK_SESSION_HANDLE,
    object: CK_OBJECT_HANDLE,
    attr: &mut Attribute,
    mut needed: CK_ULONG,
    token: &dyn TokenAccess,
    policy: &ReadPolicy,
) -> Result<Option<ReadFailure>> {
    for attempt in 0..policy.max_retries {
        log::debug!(
            "{}: value grew to {} bytes, retry {}",
            attr.name(),
            needed,
            attempt + 1
        );
        let req = [FetchRequest {
            type_: attr.get_type(),
            len: needed,
        }];
        let mut out = token.fetch_values(session, object, &req)?;
        check_count(1, out.len(), "fetch_values")?;
        match out.remove(0) {
            FetchOutcome::Value(v) => {
                return Ok(store(attr, &v, &policy.limits));
            }
            FetchOutcome::TooSmall(n) => needed = n,
            FetchOutcome::NotPresent => {
                attr.clear();
                return Ok(None);
            }
            FetchOutcome::Sensitive => {
                attr.set_sensitive();
                return Ok(None);
            }
        }
    }
    attr.clear();
    Ok(Some(ReadFailure::Drift(needed)))
}

/// Populates attributes in place from a token object
///
/// Each attribute is decoded as its own kind. On return every attribute is
/// either present with a value, present and sensitive, or absent. The
/// failures that made an attribute absent are returned, errors of the
/// token calls themselves abort the read.
pub fn read_into(
    session: CK_SESSION_HANDLE,
    object: CK_OBJECT_HANDLE,
    attrs: &mut [Attribute],
    token: &dyn TokenAccess,
    policy: &ReadPolicy,
) -> Result<Vec<(CK_ATTRIBUTE_TYPE, ReadFailure)>> {
    let mut failures = Vec::new();
    if attrs.is_empty() {
        return Ok(failures);
    }

    let types: Vec<CK_ATTRIBUTE_TYPE> =
        attrs.iter().map(|a| a.get_type()).collect();
    let lengths = token.query_lengths(session, object, &types)?;
    check_count(types.len(), lengths.len(), "query_lengths")?;

    let mut pending: Vec<usize> = Vec::new();
    let mut requests: Vec<FetchRequest> = Vec::new();
    for (idx, outcome) in lengths.into_iter().enumerate() {
        let attr = &mut attrs[idx];
        match outcome {
            LengthOutcome::Length(CK_UNAVAILABLE_INFORMATION)
            | LengthOutcome::NotPresent => attr.clear(),
            LengthOutcome::Length(0) => {
                if let Some(f) = store(attr, &[], &policy.limits) {
                    failures.push((attr.get_type(), f));
                }
            }
            LengthOutcome::Length(n) => {
                pending.push(idx);
                requests.push(FetchRequest {
                    type_: attr.get_type(),
                    len: n,
                });
            }
            LengthOutcome::Sensitive => attr.set_sensitive(),
            LengthOutcome::Error(rv) => {
                attr.clear();
                failures.push((attr.get_type(), ReadFailure::Token(rv)));
            }
        }
    }

    if !requests.is_empty() {
        let values = token.fetch_values(session, object, &requests)?;
        check_count(requests.len(), values.len(), "fetch_values")?;
        for (idx, outcome) in pending.into_iter().zip(values) {
            let attr = &mut attrs[idx];
            let failure = match outcome {
                FetchOutcome::Value(v) => store(attr, &v, &policy.limits),
                FetchOutcome::TooSmall(needed) => {
                    retry(session, object, attr, needed, token, policy)?
                }
                FetchOutcome::NotPresent => {
                    attr.clear();
                    None
                }
                FetchOutcome::Sensitive => {
                    attr.set_sensitive();
                    None
                }
            };
            if let Some(f) = failure {
                failures.push((attr.get_type(), f));
            }
        }
    }

    for (t, f) in &failures {
        log::warn!(
            "object {}: attribute {} not read: {}",
            object,
            crate::registry::name_of(*t),
            f
        );
    }
    Ok(failures)
}

/// Reads the requested attribute types of an object, reporting why any
/// attribute ended up absent
pub fn read_all_report(
    session: CK_SESSION_HANDLE,
    object: CK_OBJECT_HANDLE,
    types: &[CK_ATTRIBUTE_TYPE],
    token: &dyn TokenAccess,
    policy: &ReadPolicy,
) -> Result<ReadReport> {
    let mut attributes: Vec<Attribute> =
        types.iter().map(|t| Attribute::new(*t)).collect();
    let failures =
        read_into(session, object, &mut attributes, token, policy)?;
    Ok(ReadReport {
        attributes: attributes,
        failures: failures,
    })
}

/// Reads the requested attribute types of an object
///
/// Attributes are returned in request order and decoded according to the
/// registry, unknown types as byte sequences.
pub fn read_all(
    session: CK_SESSION_HANDLE,
    object: CK_OBJECT_HANDLE,
    types: &[CK_ATTRIBUTE_TYPE],
    token: &dyn TokenAccess,
    policy: &ReadPolicy,
) -> Result<Vec<Attribute>> {
    Ok(read_all_report(session, object, types, token, policy)?.attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::memory::MemoryToken;

    #[test]
    fn zero_length_needs_no_fetch() {
        let tok = MemoryToken::new();
        tok.set_value(2, CKA_LABEL, Vec::new()).unwrap();
        tok.set_value(2, CKA_START_DATE, Vec::new()).unwrap();
        let attrs = read_all(
            1,
            2,
            &[CKA_LABEL, CKA_START_DATE],
            &tok,
            &ReadPolicy::default(),
        )
        .unwrap();
        assert_eq!(tok.fetch_calls(), 0);
        assert_eq!(attrs[0].to_chars().unwrap(), b"");
        assert_eq!(attrs[1].to_date().unwrap(), None);
    }

    #[test]
    fn malformed_value_is_reported() {
        let tok = MemoryToken::new();
        tok.set_value(2, CKA_TOKEN, vec![1, 1]).unwrap();
        tok.set_value(2, CKA_PRIVATE, vec![1]).unwrap();
        let r = read_all_report(
            1,
            2,
            &[CKA_TOKEN, CKA_PRIVATE],
            &tok,
            &ReadPolicy::default(),
        )
        .unwrap();
        assert!(!r.attributes[0].is_present());
        assert!(r.attributes[1].to_bool().unwrap());
        assert_eq!(r.failures.len(), 1);
        assert_eq!(r.failures[0].0, CKA_TOKEN);
        assert_eq!(r.failures[0].1.rv(), CKR_ATTRIBUTE_VALUE_INVALID);
    }

    #[test]
    fn retries_are_configurable() {
        let tok = MemoryToken::new();
        tok.set_value(2, CKA_VALUE, vec![0; 4]).unwrap();
        tok.push_drift(2, CKA_VALUE, vec![0; 8]).unwrap();
        tok.push_drift(2, CKA_VALUE, vec![0; 12]).unwrap();
        let policy = ReadPolicy {
            max_retries: 2,
            ..Default::default()
        };
        let attrs = read_all(1, 2, &[CKA_VALUE], &tok, &policy).unwrap();
        assert_eq!(attrs[0].to_bytes().unwrap().len(), 12);
        assert_eq!(tok.fetch_calls(), 3);

        let policy = ReadPolicy {
            max_retries: 0,
            ..Default::default()
        };
        tok.push_drift(2, CKA_VALUE, vec![0; 16]).unwrap();
        let r =
            read_all_report(1, 2, &[CKA_VALUE], &tok, &policy).unwrap();
        assert!(!r.attributes[0].is_present());
        assert_eq!(r.failures, vec![(CKA_VALUE, ReadFailure::Drift(16))]);
    }
}
