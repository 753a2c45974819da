//! Resource manifests.
//!
//! A manifest declares resources as TOML arrays of tables:
//!
//! ```toml
//! [[policy_group]]
//! name = "team-a"
//! description = "Team A policies"
//!
//! [[policy]]
//! name = "require-signature"
//! rego_content = "package sig"
//!
//! [[policy_assignment]]
//! policy_version_id = "3fa85f64-5717-4562-b3fc-2c963f66afa6.1"
//! policy_group = "team-a"
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use rode_reconciler::{
    PolicyAssignmentConfig, PolicyConfig, PolicyGroupConfig, Reconciler, ResourceKind,
};
use serde::Deserialize;

use crate::commands::Reconcilers;

/// Declared resources, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, rename = "policy_group")]
    pub policy_groups: Vec<PolicyGroupConfig>,
    #[serde(default, rename = "policy")]
    pub policies: Vec<PolicyConfig>,
    #[serde(default, rename = "policy_assignment")]
    pub policy_assignments: Vec<PolicyAssignmentConfig>,
}

/// One problem found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: ResourceKind,
    /// Position within the kind's table array, from 0.
    pub index: usize,
    pub label: String,
    pub problem: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] '{}': {}",
            self.kind, self.index, self.label, self.problem
        )
    }
}

impl Manifest {
    /// Parse a manifest from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed TOML or unknown fields.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid manifest")
    }

    /// Load a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Total number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policy_groups.len() + self.policies.len() + self.policy_assignments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate every resource and report all problems. Makes no RPC.
    #[must_use]
    pub fn validate(&self, reconcilers: &Reconcilers) -> Vec<Finding> {
        let mut findings = Vec::new();

        let mut group_names = HashSet::new();
        for (index, group) in self.policy_groups.iter().enumerate() {
            let mut report = |problem: String| {
                findings.push(Finding {
                    kind: ResourceKind::PolicyGroup,
                    index,
                    label: group.name.clone(),
                    problem,
                });
            };
            if let Err(err) = reconcilers.groups.validate(group) {
                report(err.to_string());
            }
            if !group_names.insert(group.name.as_str()) {
                report("declared more than once".to_string());
            }
        }

        for (index, policy) in self.policies.iter().enumerate() {
            let mut report = |problem: String| {
                findings.push(Finding {
                    kind: ResourceKind::Policy,
                    index,
                    label: policy.name.clone(),
                    problem,
                });
            };
            if let Err(err) = reconcilers.policies.validate(policy) {
                report(err.to_string());
            }
        }

        let mut bindings = HashSet::new();
        for (index, assignment) in self.policy_assignments.iter().enumerate() {
            let label = format!("{} -> {}", assignment.policy_version_id, assignment.policy_group);
            let mut report = |problem: String| {
                findings.push(Finding {
                    kind: ResourceKind::PolicyAssignment,
                    index,
                    label: label.clone(),
                    problem,
                });
            };
            if let Err(err) = reconcilers.assignments.validate(assignment) {
                report(err.to_string());
            } else if !bindings.insert((&assignment.policy_version_id, &assignment.policy_group)) {
                report("declared more than once".to_string());
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    #[test]
    fn test_parses_all_tables() -> Result<()> {
        let manifest = Manifest::from_toml(&format!(
            r#"
            [[policy_group]]
            name = "team-a"

            [[policy]]
            name = "p"
            message = "first"
            rego_content = "package p"

            [[policy_assignment]]
            policy_version_id = "{POLICY_ID}.1"
            policy_group = "team-a"
            "#
        ))?;

        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.policy_groups.first().map(|g| g.description.as_str()), Some(""));
        assert_eq!(
            manifest.policies.first().and_then(|p| p.message.as_deref()),
            Some("first")
        );
        Ok(())
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = Manifest::from_toml(
            r#"
            [[policy_group]]
            name = "team-a"
            colour = "blue"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_manifest_is_valid() -> Result<()> {
        let manifest = Manifest::from_toml("")?;
        assert!(manifest.is_empty());
        assert!(manifest.validate(&Reconcilers::offline()).is_empty());
        Ok(())
    }
}
