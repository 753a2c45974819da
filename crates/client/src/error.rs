//! Error types for the client crate.
//!
//! Every failure carries a canonical RPC [`Code`]; callers classify on the
//! code, never on the message text.

use std::fmt;

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Canonical RPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    /// Map the integer carried in a status body to a code.
    #[must_use]
    pub const fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// Derive a code from an HTTP status when no status body is available.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Ok,
            400 => Self::InvalidArgument,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            409 => Self::AlreadyExists,
            429 => Self::ResourceExhausted,
            499 => Self::Cancelled,
            501 => Self::Unimplemented,
            503 => Self::Unavailable,
            504 => Self::DeadlineExceeded,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Cancelled => "Canceled",
            Self::Unknown => "Unknown",
            Self::InvalidArgument => "InvalidArgument",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::PermissionDenied => "PermissionDenied",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::FailedPrecondition => "FailedPrecondition",
            Self::Aborted => "Aborted",
            Self::OutOfRange => "OutOfRange",
            Self::Unimplemented => "Unimplemented",
            Self::Internal => "Internal",
            Self::Unavailable => "Unavailable",
            Self::DataLoss => "DataLoss",
            Self::Unauthenticated => "Unauthenticated",
        };
        f.write_str(name)
    }
}

/// Errors that can occur talking to the remote service.
///
/// `Clone` so a cached initialization failure can be handed to every caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The remote call failed with a status.
    #[error("rpc error: code = {code} desc = {message}")]
    Rpc { code: Code, message: String },

    /// The client configuration is unusable.
    #[error("invalid client configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The client could not be constructed.
    #[error("client initialization failed: {reason}")]
    InitializationFailed { reason: String },

    /// The service answered with something that could not be decoded.
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline elapsed.
    #[error("deadline exceeded after {timeout_ms}ms")]
    DeadlineExceeded { timeout_ms: u64 },
}

impl Error {
    /// Create an RPC status error.
    pub fn rpc(code: Code, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    /// Create an `InvalidArgument` status for a request rejected before sending.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::rpc(Code::InvalidArgument, message)
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an initialization failure.
    pub fn initialization_failed(reason: impl Into<String>) -> Self {
        Self::InitializationFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create a deadline exceeded error.
    pub const fn deadline_exceeded(timeout_ms: u64) -> Self {
        Self::DeadlineExceeded { timeout_ms }
    }

    /// The canonical code for this failure.
    #[must_use]
    pub const fn code(&self) -> Code {
        match self {
            Self::Rpc { code, .. } => *code,
            Self::InvalidConfig { .. } => Code::InvalidArgument,
            Self::InitializationFailed { .. } => Code::Unavailable,
            Self::InvalidResponse { .. } => Code::Internal,
            Self::Cancelled => Code::Cancelled,
            Self::DeadlineExceeded { .. } => Code::DeadlineExceeded,
        }
    }

    /// Check whether the remote object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code() == Code::NotFound
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::invalid_response(err.to_string())
        } else if err.is_timeout() {
            Self::rpc(Code::DeadlineExceeded, err.to_string())
        } else if let Some(status) = err.status() {
            Self::rpc(Code::from_http_status(status.as_u16()), err.to_string())
        } else {
            Self::rpc(Code::Unavailable, err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_config(format!("invalid url: {err}"))
    }
}
