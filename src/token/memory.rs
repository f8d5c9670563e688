// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! An in-memory token that serves attribute values from a table.
//!
//! Beyond plain storage it can be programmed to misbehave the way real
//! tokens do: values that change size between the two read passes,
//! sensitive values, per-attribute errors and failing calls. It also keeps
//! count of the calls it receives.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::codec::RawAttr;
use crate::error::{Error, Result};
use crate::misc::ulong_len;
use crate::pkcs11::*;
use crate::token::{FetchOutcome, FetchRequest, LengthOutcome, TokenAccess};

#[derive(Debug, Clone)]
enum Stored {
    Value(Vec<u8>),
    Sensitive,
    Error(CK_RV),
}

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<CK_OBJECT_HANDLE, BTreeMap<CK_ATTRIBUTE_TYPE, Stored>>,
    /* values that replace the stored one, one per fetch of the type */
    drift: HashMap<(CK_OBJECT_HANDLE, CK_ATTRIBUTE_TYPE), VecDeque<Vec<u8>>>,
    query_failure: Option<CK_RV>,
    fetch_failure: Option<CK_RV>,
    query_calls: usize,
    fetch_calls: usize,
    fetched: Vec<FetchRequest>,
}

#[derive(Debug, Default)]
pub struct MemoryToken {
    inner: Mutex<Inner>,
}

impl MemoryToken {
    pub fn new() -> MemoryToken {
        MemoryToken::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        match self.inner.lock() {
            Ok(g) => Ok(g),
            Err(_) => Err(Error::token(
                CKR_GENERAL_ERROR,
                "memory token lock poisoned".to_string(),
            )),
        }
    }

    fn stored(
        &self,
        object: CK_OBJECT_HANDLE,
        type_: CK_ATTRIBUTE_TYPE,
        s: Stored,
    ) -> Result<()> {
        self.lock()?
            .objects
            .entry(object)
            .or_default()
            .insert(type_, s);
        Ok(())
    }

    /// Creates an empty object, it is an error to read unknown handles
    pub fn add_object(&self, object: CK_OBJECT_HANDLE) -> Result<()> {
        self.lock()?.objects.entry(object).or_default();
        Ok(())
    }

    /// Stores an attribute value, unset triples are ignored
    pub fn set_raw(&self, object: CK_OBJECT_HANDLE, raw: RawAttr) -> Result<()> {
        match raw.value {
            Some(v) => self.stored(object, raw.type_, Stored::Value(v)),
            None => self.add_object(object),
        }
    }

    pub fn set_value(
        &self,
        object: CK_OBJECT_HANDLE,
        type_: CK_ATTRIBUTE_TYPE,
        value: Vec<u8>,
    ) -> Result<()> {
        self.stored(object, type_, Stored::Value(value))
    }

    pub fn set_sensitive(
        &self,
        object: CK_OBJECT_HANDLE,
        type_: CK_ATTRIBUTE_TYPE,
    ) -> Result<()> {
        self.stored(object, type_, Stored::Sensitive)
    }

    /// Makes the length query of one attribute report an error code
    pub fn set_error(
        &self,
        object: CK_OBJECT_HANDLE,
        type_: CK_ATTRIBUTE_TYPE,
        rv: CK_RV,
    ) -> Result<()> {
        self.stored(object, type_, Stored::Error(rv))
    }

    /// Queues a new value that replaces the stored one at the next fetch
    /// of the attribute, after the lengths have been reported
    pub fn push_drift(
        &self,
        object: CK_OBJECT_HANDLE,
        type_: CK_ATTRIBUTE_TYPE,
        value: Vec<u8>,
    ) -> Result<()> {
        self.lock()?
            .drift
            .entry((object, type_))
            .or_default()
            .push_back(value);
        Ok(())
    }

    /// Makes every following length query fail as a whole
    pub fn fail_queries(&self, rv: Option<CK_RV>) -> Result<()> {
        self.lock()?.query_failure = rv;
        Ok(())
    }

    /// Makes every following fetch fail as a whole
    pub fn fail_fetches(&self, rv: Option<CK_RV>) -> Result<()> {
        self.lock()?.fetch_failure = rv;
        Ok(())
    }

    pub fn query_calls(&self) -> usize {
        self.lock().map(|i| i.query_calls).unwrap_or(0)
    }

    pub fn fetch_calls(&self) -> usize {
        self.lock().map(|i| i.fetch_calls).unwrap_or(0)
    }

    /// All fetch requests received so far, in request order
    pub fn fetch_requests(&self) -> Vec<FetchRequest> {
        self.lock().map(|i| i.fetched.clone()).unwrap_or_default()
    }

    /// The attribute types of [MemoryToken::fetch_requests]
    pub fn fetched_types(&self) -> Vec<CK_ATTRIBUTE_TYPE> {
        self.fetch_requests().iter().map(|r| r.type_).collect()
    }
}

impl TokenAccess for MemoryToken {
    fn query_lengths(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
        types: &[CK_ATTRIBUTE_TYPE],
    ) -> Result<Vec<LengthOutcome>> {
        let mut inner = self.lock()?;
        inner.query_calls += 1;
        if session == CK_INVALID_HANDLE {
            return Err(Error::token(
                CKR_SESSION_HANDLE_INVALID,
                "invalid session".to_string(),
            ));
        }
        if let Some(rv) = inner.query_failure {
            return Err(Error::token(rv, "length query failed".to_string()));
        }
        let obj = match inner.objects.get(&object) {
            Some(o) => o,
            None => {
                return Err(Error::token(
                    CKR_OBJECT_HANDLE_INVALID,
                    format!("no object {}", object),
                ))
            }
        };
        let mut out = Vec::with_capacity(types.len());
        for t in types {
            out.push(match obj.get(t) {
                Some(Stored::Value(v)) => LengthOutcome::Length(ulong_len(v.len())?),
                Some(Stored::Sensitive) => LengthOutcome::Sensitive,
                Some(Stored::Error(rv)) => LengthOutcome::Error(*rv),
                None => LengthOutcome::NotPresent,
            });
        }
        Ok(out)
    }

    fn fetch_values(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
        requests: &[FetchRequest],
    ) -> Result<Vec<FetchOutcome>> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        inner.fetch_calls += 1;
        if session == CK_INVALID_HANDLE {
            return Err(Error::token(
                CKR_SESSION_HANDLE_INVALID,
                "invalid session".to_string(),
            ));
        }
        if let Some(rv) = inner.fetch_failure {
            return Err(Error::token(rv, "value fetch failed".to_string()));
        }
        let obj = match inner.objects.get_mut(&object) {
            Some(o) => o,
            None => {
                return Err(Error::token(
                    CKR_OBJECT_HANDLE_INVALID,
                    format!("no object {}", object),
                ))
            }
        };
        let mut out = Vec::with_capacity(requests.len());
        for r in requests {
            inner.fetched.push(*r);
            if let Some(q) = inner.drift.get_mut(&(object, r.type_)) {
                if let Some(v) = q.pop_front() {
                    obj.insert(r.type_, Stored::Value(v));
                }
            }
            out.push(match obj.get(&r.type_) {
                Some(Stored::Value(v)) => {
                    let needed = ulong_len(v.len())?;
                    if needed > r.len {
                        FetchOutcome::TooSmall(needed)
                    } else {
                        FetchOutcome::Value(v.clone())
                    }
                }
                Some(Stored::Sensitive) => FetchOutcome::Sensitive,
                Some(Stored::Error(_)) | None => FetchOutcome::NotPresent,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_applies_on_fetch() {
        let tok = MemoryToken::new();
        tok.set_value(1, CKA_VALUE, vec![0; 4]).unwrap();
        tok.push_drift(1, CKA_VALUE, vec![0; 8]).unwrap();
        let l = tok.query_lengths(1, 1, &[CKA_VALUE, CKA_LABEL]).unwrap();
        assert_eq!(l, vec![LengthOutcome::Length(4), LengthOutcome::NotPresent]);
        let req = [FetchRequest {
            type_: CKA_VALUE,
            len: 4,
        }];
        let f = tok.fetch_values(1, 1, &req).unwrap();
        assert_eq!(f, vec![FetchOutcome::TooSmall(8)]);
        let req = [FetchRequest {
            type_: CKA_VALUE,
            len: 8,
        }];
        let f = tok.fetch_values(1, 1, &req).unwrap();
        assert_eq!(f, vec![FetchOutcome::Value(vec![0; 8])]);
        assert_eq!(tok.query_calls(), 1);
        assert_eq!(tok.fetch_calls(), 2);
        assert_eq!(tok.fetched_types(), vec![CKA_VALUE, CKA_VALUE]);
    }

    #[test]
    fn hard_failures() {
        let tok = MemoryToken::new();
        tok.add_object(7).unwrap();
        let e = tok.query_lengths(1, 8, &[CKA_CLASS]).unwrap_err();
        assert_eq!(e.rv(), CKR_OBJECT_HANDLE_INVALID);
        let e = tok
            .query_lengths(CK_INVALID_HANDLE, 7, &[CKA_CLASS])
            .unwrap_err();
        assert_eq!(e.rv(), CKR_SESSION_HANDLE_INVALID);
        tok.fail_queries(Some(CKR_DEVICE_REMOVED)).unwrap();
        let e = tok.query_lengths(1, 7, &[CKA_CLASS]).unwrap_err();
        assert_eq!(e.rv(), CKR_DEVICE_REMOVED);
    }
}
