//! Wire model for the remote policy service.
//!
//! Server-assigned fields are optional so the same types serve as request
//! bodies (fields omitted) and responses (fields populated).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named bucket of policies evaluated together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

impl PolicyGroup {
    /// Create a request body for a policy group.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}

/// A named, versioned container for one Rego document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub current_version: u32,
    /// The current version. Omitted from update requests that only touch metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

/// One immutable snapshot of a policy's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEntity {
    /// Composite `<policyId>.<version>` id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: u32,
    #[serde(default)]
    pub message: String,
    pub rego_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl PolicyEntity {
    /// Create a version submission.
    pub fn new(message: impl Into<String>, rego_content: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rego_content: rego_content.into(),
            ..Self::default()
        }
    }
}

/// Binding of a policy version to a policy group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAssignment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub policy_version_id: String,
    pub policy_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl PolicyAssignment {
    /// Create a request body for an assignment.
    pub fn new(policy_version_id: impl Into<String>, policy_group: impl Into<String>) -> Self {
        Self {
            policy_version_id: policy_version_id.into(),
            policy_group: policy_group.into(),
            ..Self::default()
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}
