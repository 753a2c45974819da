//! Local validation errors.
//!
//! Everything in this module is raised before any network access: a value
//! that fails here never reaches the remote service.

use thiserror::Error;

/// Result type for identifier and validation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error for declared identifiers and names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("malformed identifier '{value}': {reason}")]
    MalformedIdentifier { value: String, reason: String },

    #[error("invalid policy id '{value}': {reason}")]
    InvalidPolicyId { value: String, reason: String },

    #[error("invalid policy version in '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    #[error(
        "'{name}' does not match naming restrictions: policy group names may only contain \
         lowercase alphanumeric strings, hyphens, or underscores"
    )]
    InvalidName { name: String },

    #[error("{attribute} must not be empty")]
    MissingAttribute { attribute: String },
}

impl Error {
    /// Create a malformed identifier error.
    pub fn malformed_identifier(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid policy id error.
    pub fn invalid_policy_id(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPolicyId {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid version error.
    pub fn invalid_version(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Create a missing required attribute error.
    pub fn missing_attribute(attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute: attribute.into(),
        }
    }
}
