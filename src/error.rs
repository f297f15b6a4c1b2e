use std::fmt;

use crate::address::ParseAddressError;

/// A result type hardwired to use [`Error`] as its error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type used throughout this library.
#[derive(Debug)]
pub struct Error {
    inner: ErrorKind,
}

impl Error {
    pub(crate) fn from(e: impl Into<ErrorKind>) -> Self {
        Self { inner: e.into() }
    }

    pub(crate) fn no_active_device() -> Self {
        Self {
            inner: ErrorKind::NoActiveDevice,
        }
    }

    pub(crate) fn timeout(what: impl Into<String>) -> Self {
        Self {
            inner: ErrorKind::Timeout(what.into()),
        }
    }

    pub(crate) fn unsupported_action(action: &str) -> Self {
        Self {
            inner: ErrorKind::UnsupportedAction(action.to_string()),
        }
    }

    /// Wraps this error with a message describing the operation that failed.
    pub(crate) fn context(self, context: impl Into<String>) -> Self {
        Self {
            inner: ErrorKind::Context(context.into(), Box::new(self)),
        }
    }

    /// Returns `true` if no connected device was found to be playing media.
    pub fn is_no_active_device(&self) -> bool {
        matches!(self.root(), ErrorKind::NoActiveDevice)
    }

    /// Returns `true` if an operation gave up after its bounded wait elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), ErrorKind::Timeout(_))
    }

    /// Returns `true` if a media action was rejected before being dispatched.
    pub fn is_unsupported_action(&self) -> bool {
        matches!(self.root(), ErrorKind::UnsupportedAction(_))
    }

    fn root(&self) -> &ErrorKind {
        match &self.inner {
            ErrorKind::Context(_, source) => source.root(),
            kind => kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ErrorKind::Zbus(e) => e.fmt(f),
            ErrorKind::Fdo(e) => e.fmt(f),
            ErrorKind::ParseAddressError(e) => e.fmt(f),
            ErrorKind::Json(e) => e.fmt(f),
            ErrorKind::NoActiveDevice => f.write_str("no active device"),
            ErrorKind::Timeout(what) => write!(f, "{} timed out", what),
            ErrorKind::UnsupportedAction(a) => write!(f, "unsupported media action '{}'", a),
            ErrorKind::Context(context, source) => write!(f, "{}: {}", context, source),
            ErrorKind::Other(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.inner {
            ErrorKind::Zbus(e) => Some(e),
            ErrorKind::Fdo(e) => Some(e),
            ErrorKind::ParseAddressError(e) => Some(e),
            ErrorKind::Json(e) => Some(e),
            ErrorKind::Context(_, source) => Some(&**source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Zbus(zbus::Error),
    Fdo(zbus::fdo::Error),
    ParseAddressError(ParseAddressError),
    Json(serde_json::Error),
    NoActiveDevice,
    Timeout(String),
    UnsupportedAction(String),
    Context(String, Box<Error>),
    Other(String),
}

impl From<zbus::Error> for ErrorKind {
    fn from(value: zbus::Error) -> Self {
        Self::Zbus(value)
    }
}

impl From<zbus::fdo::Error> for ErrorKind {
    fn from(value: zbus::fdo::Error) -> Self {
        Self::Fdo(value)
    }
}

impl From<zbus::names::Error> for ErrorKind {
    fn from(value: zbus::names::Error) -> Self {
        Self::Zbus(zbus::Error::from(value))
    }
}

impl From<ParseAddressError> for ErrorKind {
    fn from(value: ParseAddressError) -> Self {
        Self::ParseAddressError(value)
    }
}

impl From<serde_json::Error> for ErrorKind {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<String> for ErrorKind {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}

impl From<&str> for ErrorKind {
    fn from(value: &str) -> Self {
        Self::Other(value.to_string())
    }
}
