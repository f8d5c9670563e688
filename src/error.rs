// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! Error type shared by the whole crate.
//!
//! Every error carries a [ErrorKind] that tells callers which class of
//! failure happened, plus the PKCS#11 return value that best describes it
//! so that a facade sitting on top of this layer can hand a `CK_RV` back
//! to its own callers without further mapping.

use std::error;
use std::fmt;

use crate::pkcs11::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    origin: Option<Box<dyn error::Error + Send + Sync>>,
    errmsg: Option<String>,
    ckrv: CK_RV,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /* A Cryptoki-style error, see ckrv Error field */
    CkError,
    /* The attribute was not found, see errmsg */
    AttributeNotFound,
    /* A raw value is inconsistent with its attribute kind */
    MalformedValue,
    /* A template contains an attribute of the wrong kind */
    TemplateError,
    /* The token collaborator failed */
    TokenCommunication,
    /* A value of the wrong kind was assigned to an attribute */
    UnsupportedValueType,
    /* The configuration could not be loaded */
    Config,
    /* Other error, see origin */
    Nested,
}

impl Error {
    pub fn ck_rv(ckrv: CK_RV) -> Error {
        Error {
            kind: ErrorKind::CkError,
            origin: None,
            errmsg: None,
            ckrv: ckrv,
        }
    }

    pub fn ck_rv_from_error<E>(ckrv: CK_RV, error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::CkError,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: ckrv,
        }
    }

    pub fn not_found(errmsg: String) -> Error {
        Error {
            kind: ErrorKind::AttributeNotFound,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: CKR_GENERAL_ERROR,
        }
    }

    /// A raw triple could not be decoded as the kind it claims to be
    pub fn malformed(errmsg: String) -> Error {
        Error {
            kind: ErrorKind::MalformedValue,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: CKR_ATTRIBUTE_VALUE_INVALID,
        }
    }

    pub fn template(errmsg: String) -> Error {
        Error {
            kind: ErrorKind::TemplateError,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: CKR_TEMPLATE_INCONSISTENT,
        }
    }

    /// The token collaborator reported a failure of the call itself
    ///
    /// The return value reported by the token is preserved, `CKR_OK` is
    /// replaced with `CKR_DEVICE_ERROR` as it can not describe a failure.
    pub fn token(ckrv: CK_RV, errmsg: String) -> Error {
        Error {
            kind: ErrorKind::TokenCommunication,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: if ckrv == CKR_OK { CKR_DEVICE_ERROR } else { ckrv },
        }
    }

    pub fn unsupported(errmsg: String) -> Error {
        Error {
            kind: ErrorKind::UnsupportedValueType,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: CKR_ATTRIBUTE_TYPE_INVALID,
        }
    }

    pub fn config_error<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::Config,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: CKR_ARGUMENTS_BAD,
        }
    }

    pub fn other_error<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::Nested,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: CKR_GENERAL_ERROR,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn attr_not_found(&self) -> bool {
        self.kind == ErrorKind::AttributeNotFound
    }

    pub fn rv(&self) -> CK_RV {
        self.ckrv
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = match self.kind {
            ErrorKind::CkError => {
                if let Some(ref e) = self.errmsg {
                    return write!(f, "{}", e);
                }
                if let Some(ref o) = self.origin {
                    return write!(f, "0x{:x}: {}", self.ckrv, o);
                }
                return match self.ckrv {
                    CKR_GENERAL_ERROR => write!(f, "CKR_GENERAL_ERROR"),
                    CKR_ATTRIBUTE_TYPE_INVALID => {
                        write!(f, "CKR_ATTRIBUTE_TYPE_INVALID")
                    }
                    CKR_ATTRIBUTE_VALUE_INVALID => {
                        write!(f, "CKR_ATTRIBUTE_VALUE_INVALID")
                    }
                    _ => write!(f, "CK_RV 0x{:x}", self.ckrv),
                };
            }
            ErrorKind::AttributeNotFound => "attribute not found",
            ErrorKind::MalformedValue => "malformed value",
            ErrorKind::TemplateError => "template error",
            ErrorKind::TokenCommunication => "token communication error",
            ErrorKind::UnsupportedValueType => "unsupported value type",
            ErrorKind::Config => "configuration error",
            ErrorKind::Nested => match self.origin {
                Some(ref o) => return o.fmt(f),
                None => "unknown error",
            },
        };
        match (&self.errmsg, &self.origin) {
            (Some(e), _) => write!(f, "{}: {}", prefix, e),
            (None, Some(o)) => write!(f, "{}: {}", prefix, o),
            (None, None) => write!(f, "{}", prefix),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.origin {
            Some(ref o) => Some(o.as_ref()),
            None => None,
        }
    }
}

impl From<CK_RV> for Error {
    fn from(error: CK_RV) -> Error {
        Error::ck_rv(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::other_error(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::other_error(error)
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Error {
        Error::config_error(error)
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(error: std::num::TryFromIntError) -> Error {
        Error::other_error(error)
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(error: std::array::TryFromSliceError) -> Error {
        Error::ck_rv_from_error(CKR_ATTRIBUTE_VALUE_INVALID, error)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(error: std::string::FromUtf8Error) -> Error {
        Error::ck_rv_from_error(CKR_ATTRIBUTE_VALUE_INVALID, error)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(error: std::convert::Infallible) -> Error {
        Error::other_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensitive() -> Result<()> {
        Err(CKR_ATTRIBUTE_SENSITIVE)?
    }

    #[test]
    fn rv_conversion() {
        let e = sensitive().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::CkError);
        assert_eq!(e.rv(), CKR_ATTRIBUTE_SENSITIVE);
    }

    #[test]
    fn token_error_never_ok() {
        let e = Error::token(CKR_OK, "lost".to_string());
        assert_eq!(e.kind(), ErrorKind::TokenCommunication);
        assert_eq!(e.rv(), CKR_DEVICE_ERROR);
        assert_eq!(e.to_string(), "token communication error: lost");
    }
}
