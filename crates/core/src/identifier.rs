//! Identifier codec.
//!
//! Parsing and formatting for the composite identifiers that tie resources
//! together:
//!
//! - policy version ids: `<policyId>.<version>`
//! - policy group names: `^[a-z0-9_-]+$`
//! - policy import ids: a bare hyphenated UUID
//! - policy assignment import ids: `policies/<policyId>/assignments/<policyGroupName>`
//!
//! All functions here are pure, so they can run during plan-time validation
//! before a client exists.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Error, Result};

const HYPHENATED_UUID_LEN: usize = 36;
const ASSIGNMENT_ID_FORMAT: &str =
    "policy assignment ids should be of the form: policies/$policyId/assignments/$policyGroupName";

static POLICY_GROUP_NAME: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+$"));

/// A policy id paired with one of its versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolicyVersionId {
    policy_id: Uuid,
    version: u32,
}

impl PolicyVersionId {
    /// Create a policy version id from its parts.
    #[must_use]
    pub const fn new(policy_id: Uuid, version: u32) -> Self {
        Self { policy_id, version }
    }

    /// The policy this version belongs to.
    #[must_use]
    pub const fn policy_id(&self) -> Uuid {
        self.policy_id
    }

    /// The numeric version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for PolicyVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.policy_id.hyphenated(), self.version)
    }
}

impl FromStr for PolicyVersionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_policy_version_id(s)
    }
}

impl Serialize for PolicyVersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PolicyVersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_policy_version_id(&raw).map_err(serde::de::Error::custom)
    }
}

/// Format a policy version id from server-assigned parts.
#[must_use]
pub fn format_policy_version_id(policy_id: &str, version: u32) -> String {
    format!("{policy_id}.{version}")
}

/// Parse `<policyId>.<version>`.
///
/// # Errors
///
/// - `MalformedIdentifier` unless there are exactly two `.`-delimited segments
/// - `InvalidPolicyId` if the first segment is not a hyphenated UUID
/// - `InvalidVersion` if the second segment is not a non-negative integer
pub fn parse_policy_version_id(raw: &str) -> Result<PolicyVersionId> {
    let (policy_id, version) = match raw.split('.').collect::<Vec<_>>().as_slice() {
        [policy_id, version] => (*policy_id, *version),
        _ => {
            return Err(Error::malformed_identifier(
                raw,
                "policy version id does not match format <policyId>.<version>",
            ));
        }
    };

    let policy_id = parse_policy_id(policy_id)?;
    let version = version
        .parse::<u32>()
        .map_err(|e| Error::invalid_version(raw, e.to_string()))?;

    Ok(PolicyVersionId::new(policy_id, version))
}

/// Parse a policy id, accepting only the hyphenated UUID form.
///
/// # Errors
///
/// Returns `InvalidPolicyId` for anything else.
pub fn parse_policy_id(raw: &str) -> Result<Uuid> {
    if raw.len() != HYPHENATED_UUID_LEN {
        return Err(Error::invalid_policy_id(
            raw,
            format!("expected {HYPHENATED_UUID_LEN} characters, got {}", raw.len()),
        ));
    }

    Uuid::parse_str(raw).map_err(|e| Error::invalid_policy_id(raw, e.to_string()))
}

/// Validate a policy group name against `^[a-z0-9_-]+$`.
///
/// # Errors
///
/// Returns `InvalidName` if the name is empty or contains anything else.
pub fn validate_policy_group_name(name: &str) -> Result<()> {
    match POLICY_GROUP_NAME.as_ref() {
        Ok(pattern) if pattern.is_match(name) => Ok(()),
        _ => Err(Error::invalid_name(name)),
    }
}

/// Parsed form of `policies/<policyId>/assignments/<policyGroupName>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssignmentId {
    policy_id: Uuid,
    policy_group: String,
}

impl AssignmentId {
    /// The policy side of the assignment.
    #[must_use]
    pub const fn policy_id(&self) -> Uuid {
        self.policy_id
    }

    /// The policy group side of the assignment.
    #[must_use]
    pub fn policy_group(&self) -> &str {
        &self.policy_group
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "policies/{}/assignments/{}",
            self.policy_id.hyphenated(),
            self.policy_group
        )
    }
}

impl FromStr for AssignmentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_assignment_id(s)
    }
}

/// Parse an assignment import id.
///
/// # Errors
///
/// - `MalformedIdentifier` unless there are exactly four `/`-delimited segments
///   with `policies` and `assignments` in positions 0 and 2
/// - `InvalidPolicyId` if segment 1 is not a hyphenated UUID
/// - `InvalidName` if segment 3 is not a valid policy group name
pub fn parse_assignment_id(raw: &str) -> Result<AssignmentId> {
    let (policy_id, policy_group) = match raw.split('/').collect::<Vec<_>>().as_slice() {
        ["policies", policy_id, "assignments", policy_group] => (*policy_id, *policy_group),
        _ => return Err(Error::malformed_identifier(raw, ASSIGNMENT_ID_FORMAT)),
    };

    let policy_id = parse_policy_id(policy_id)?;
    validate_policy_group_name(policy_group)?;

    Ok(AssignmentId {
        policy_id,
        policy_group: policy_group.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    #[test]
    fn test_policy_group_name_pattern_compiles() {
        assert!(POLICY_GROUP_NAME.is_ok());
    }

    #[test]
    fn test_policy_group_name_edges() {
        for valid in ["team-a", "team_a", "tf-acc-abc123", "0", "-_-"] {
            assert_eq!(validate_policy_group_name(valid), Ok(()), "{valid}");
        }
        for invalid in ["", "Team-A", "team a", "team.a", "../policies", "team-a\n", "ünïcode"] {
            assert_eq!(
                validate_policy_group_name(invalid),
                Err(Error::invalid_name(invalid)),
                "{invalid:?}"
            );
        }
    }

    #[test]
    fn test_parse_policy_version_id() -> Result<()> {
        let id = parse_policy_version_id(&format!("{POLICY_ID}.3"))?;
        assert_eq!(id.policy_id().hyphenated().to_string(), POLICY_ID);
        assert_eq!(id.version(), 3);
        Ok(())
    }

    #[test]
    fn test_format_policy_version_id() {
        assert_eq!(
            format_policy_version_id(POLICY_ID, 12),
            format!("{POLICY_ID}.12")
        );
    }

    #[test]
    fn test_display_matches_format() -> Result<()> {
        let raw = format!("{POLICY_ID}.7");
        let id: PolicyVersionId = raw.parse()?;
        assert_eq!(id.to_string(), raw);
        Ok(())
    }

    #[test]
    fn test_version_id_without_version_is_malformed() {
        let result = parse_policy_version_id(POLICY_ID);
        assert!(matches!(result, Err(Error::MalformedIdentifier { .. })));
    }

    #[test]
    fn test_version_id_with_extra_segment_is_malformed() {
        let result = parse_policy_version_id(&format!("{POLICY_ID}.1.2"));
        assert!(matches!(result, Err(Error::MalformedIdentifier { .. })));
    }

    #[test]
    fn test_version_id_with_bad_uuid() {
        let result = parse_policy_version_id("not-a-uuid.1");
        assert!(matches!(result, Err(Error::InvalidPolicyId { .. })));
    }

    #[test]
    fn test_version_id_rejects_simple_uuid_form() {
        let result = parse_policy_version_id("3fa85f6457174562b3fc2c963f66afa6.1");
        assert!(matches!(result, Err(Error::InvalidPolicyId { .. })));
    }

    #[test]
    fn test_version_id_with_bad_version() {
        for version in ["", "abc", "-1", "1.5e3"] {
            let result = parse_policy_version_id(&format!("{POLICY_ID}.{version}"));
            assert!(
                matches!(
                    result,
                    Err(Error::InvalidVersion { .. } | Error::MalformedIdentifier { .. })
                ),
                "version {version:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_version_zero_is_accepted() -> Result<()> {
        let id = parse_policy_version_id(&format!("{POLICY_ID}.0"))?;
        assert_eq!(id.version(), 0);
        Ok(())
    }

    #[test]
    fn test_policy_group_names() {
        assert!(validate_policy_group_name("tf-acc-abc123").is_ok());
        assert!(validate_policy_group_name("team_a").is_ok());
        assert!(matches!(
            validate_policy_group_name("Has-Upper!"),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            validate_policy_group_name(""),
            Err(Error::InvalidName { .. })
        ));
        assert!(validate_policy_group_name("team a").is_err());
    }

    #[test]
    fn test_parse_assignment_id() -> Result<()> {
        let id = parse_assignment_id(&format!("policies/{POLICY_ID}/assignments/team-a"))?;
        assert_eq!(id.policy_id().hyphenated().to_string(), POLICY_ID);
        assert_eq!(id.policy_group(), "team-a");
        assert_eq!(
            id.to_string(),
            format!("policies/{POLICY_ID}/assignments/team-a")
        );
        Ok(())
    }

    #[test]
    fn test_assignment_id_bad_policy_id() {
        let result = parse_assignment_id("policies/not-a-uuid/assignments/team-a");
        assert!(matches!(result, Err(Error::InvalidPolicyId { .. })));
    }

    #[test]
    fn test_assignment_id_bad_group_name() {
        let result = parse_assignment_id(&format!("policies/{POLICY_ID}/assignments/TEAM-A"));
        assert!(matches!(result, Err(Error::InvalidName { .. })));
    }

    #[test]
    fn test_assignment_id_wrong_shape() {
        for raw in [
            format!("policy/{POLICY_ID}/assignments/team-a"),
            format!("policies/{POLICY_ID}/assignment/team-a"),
            format!("policies/{POLICY_ID}/assignments"),
            format!("policies/{POLICY_ID}/assignments/team-a/extra"),
            String::new(),
        ] {
            let result = parse_assignment_id(&raw);
            assert!(
                matches!(result, Err(Error::MalformedIdentifier { .. })),
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_policy_version_id_serde() -> std::result::Result<(), serde_json::Error> {
        let raw = format!("\"{POLICY_ID}.4\"");
        let id: PolicyVersionId = serde_json::from_str(&raw)?;
        assert_eq!(id.version(), 4);
        assert_eq!(serde_json::to_string(&id)?, raw);

        let bad: std::result::Result<PolicyVersionId, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
        Ok(())
    }
}
