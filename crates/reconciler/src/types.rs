//! Core types for the reconciler.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three resource kinds managed against the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    PolicyGroup,
    Policy,
    PolicyAssignment,
}

impl ResourceKind {
    /// Every kind, in dependency order (groups and policies before assignments).
    pub const ALL: [Self; 3] = [Self::PolicyGroup, Self::Policy, Self::PolicyAssignment];

    /// The declared-configuration name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyGroup => "policy_group",
            Self::Policy => "policy",
            Self::PolicyAssignment => "policy_assignment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource kind '{0}' (expected one of: policy_group, policy, policy_assignment)")]
pub struct UnknownResourceKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownResourceKind(s.to_string()))
    }
}

/// What reconciling one resource will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Remote state already matches.
    NoOp,
    /// The resource is absent and must be created.
    Create,
    /// Mutable attributes differ and can be changed in place.
    Update {
        /// Declared attributes that differ.
        changed: Vec<&'static str>,
        /// Computed attributes that become unknown until apply.
        recomputed: Vec<&'static str>,
    },
    /// Immutable attributes differ; delete then create.
    Replace { forced_by: Vec<&'static str> },
    /// The resource is no longer declared.
    Delete,
}

impl ReconcileAction {
    /// Whether applying this action makes no remote call.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }

    /// Get a description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::NoOp => "no changes".to_string(),
            Self::Create => "create".to_string(),
            Self::Update {
                changed,
                recomputed,
            } if recomputed.is_empty() => format!("update in place ({})", changed.iter().join(", ")),
            Self::Update {
                changed,
                recomputed,
            } => format!(
                "update in place ({}); known after apply: {}",
                changed.iter().join(", "),
                recomputed.iter().join(", ")
            ),
            Self::Replace { forced_by } => {
                format!("replace (forced by {})", forced_by.iter().join(", "))
            }
            Self::Delete => "delete".to_string(),
        }
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Result of reconciling one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileResult<S> {
    /// The action that was applied.
    pub action: ReconcileAction,
    /// State after the action; `None` when the resource is absent.
    pub state: Option<S>,
}

impl<S> ReconcileResult<S> {
    /// Create a new reconcile result.
    pub const fn new(action: ReconcileAction, state: Option<S>) -> Self {
        Self { action, state }
    }

    /// Whether nothing had to change.
    pub const fn converged(&self) -> bool {
        self.action.is_noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_round_trips_through_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_resource_kind() {
        let err = "policy-group".parse::<ResourceKind>();
        assert_eq!(err, Err(UnknownResourceKind("policy-group".to_string())));
    }

    #[test]
    fn test_reconcile_action_description() {
        let action = ReconcileAction::Update {
            changed: vec!["rego_content"],
            recomputed: vec!["current_version", "policy_version_id"],
        };
        assert_eq!(
            action.description(),
            "update in place (rego_content); known after apply: current_version, policy_version_id"
        );

        let action = ReconcileAction::Replace {
            forced_by: vec!["name"],
        };
        assert!(action.description().contains("replace"));
        assert!(action.description().contains("name"));
    }

    #[test]
    fn test_converged_only_for_noop() {
        assert!(ReconcileResult::<()>::new(ReconcileAction::NoOp, None).converged());
        assert!(!ReconcileResult::<()>::new(ReconcileAction::Delete, None).converged());
    }
}
