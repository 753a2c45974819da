//! Error types for the reconciler crate.

use std::fmt;

use thiserror::Error;

use crate::types::ResourceKind;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classified error kinds reported to the host layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedIdentifier,
    InvalidPolicyId,
    InvalidVersion,
    InvalidName,
    MissingAttribute,
    ClientInitializationFailed,
    NotFound,
    RemoteFailure,
    Cancelled,
    ReplacementRequired,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Reconciler error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A declared value failed local validation. No RPC was attempted.
    #[error(transparent)]
    Validation(#[from] rode_core::Error),

    /// The client gateway could not construct the client. Sticky.
    #[error("client initialization failed: {reason}")]
    ClientInitializationFailed { reason: String },

    /// The resource does not exist where it must (e.g. right after create).
    #[error("{kind} '{id}' not found")]
    NotFound { kind: ResourceKind, id: String },

    /// Any other RPC failure, unchanged.
    #[error(transparent)]
    Remote(rode_client::Error),

    /// The caller cancelled the operation or its deadline passed.
    #[error("{kind} operation cancelled: {reason}")]
    Cancelled { kind: ResourceKind, reason: String },

    /// The change touches immutable attributes; delete and create instead.
    #[error("changing {attributes:?} on {kind} requires replacement")]
    ReplacementRequired {
        kind: ResourceKind,
        attributes: Vec<&'static str>,
    },
}

impl Error {
    /// Create a not found error.
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a replacement required error.
    #[must_use]
    pub const fn replacement_required(kind: ResourceKind, attributes: Vec<&'static str>) -> Self {
        Self::ReplacementRequired { kind, attributes }
    }

    /// Convert a client error raised while operating on `kind`.
    #[must_use]
    pub fn from_client(kind: ResourceKind, err: rode_client::Error) -> Self {
        match err {
            rode_client::Error::InitializationFailed { reason } => {
                Self::ClientInitializationFailed { reason }
            }
            rode_client::Error::Cancelled | rode_client::Error::DeadlineExceeded { .. } => {
                Self::Cancelled {
                    kind,
                    reason: err.to_string(),
                }
            }
            other => Self::Remote(other),
        }
    }

    /// The classified kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(rode_core::Error::MalformedIdentifier { .. }) => {
                ErrorKind::MalformedIdentifier
            }
            Self::Validation(rode_core::Error::InvalidPolicyId { .. }) => {
                ErrorKind::InvalidPolicyId
            }
            Self::Validation(rode_core::Error::InvalidVersion { .. }) => ErrorKind::InvalidVersion,
            Self::Validation(rode_core::Error::InvalidName { .. }) => ErrorKind::InvalidName,
            Self::Validation(rode_core::Error::MissingAttribute { .. }) => {
                ErrorKind::MissingAttribute
            }
            Self::ClientInitializationFailed { .. } => ErrorKind::ClientInitializationFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Remote(err) if err.is_not_found() => ErrorKind::NotFound,
            Self::Remote(_) => ErrorKind::RemoteFailure,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::ReplacementRequired { .. } => ErrorKind::ReplacementRequired,
        }
    }

    /// The underlying RPC failure, if this error came from the remote service.
    #[must_use]
    pub const fn remote(&self) -> Option<&rode_client::Error> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}
