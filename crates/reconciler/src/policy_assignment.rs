//! Policy assignment reconciler.

use std::sync::Arc;

use async_trait::async_trait;
use rode_client::{CallContext, ClientGateway};
use rode_core::{
    PolicyAssignment, format_optional_timestamp, parse_assignment_id, parse_policy_version_id,
    validate_policy_group_name,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::{classify_delete, classify_read};
use crate::error::{Error, Result};
use crate::reconciler::{Reconciler, acquire};
use crate::types::{ReconcileAction, ResourceKind};

const KIND: ResourceKind = ResourceKind::PolicyAssignment;

/// Declared attributes of a policy assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyAssignmentConfig {
    /// `<policyId>.<version>` of the assigned policy version.
    pub policy_version_id: String,
    /// Immutable name of the target group.
    pub policy_group: String,
}

impl PolicyAssignmentConfig {
    pub fn new(policy_version_id: impl Into<String>, policy_group: impl Into<String>) -> Self {
        Self {
            policy_version_id: policy_version_id.into(),
            policy_group: policy_group.into(),
        }
    }
}

/// Persisted state of a policy assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAssignmentState {
    /// `policies/<policyId>/assignments/<group>`.
    pub id: String,
    pub policy_version_id: String,
    pub policy_group: String,
    pub created: String,
    pub updated: String,
}

impl From<PolicyAssignment> for PolicyAssignmentState {
    fn from(assignment: PolicyAssignment) -> Self {
        Self {
            created: format_optional_timestamp(assignment.created.as_ref()),
            updated: format_optional_timestamp(assignment.updated.as_ref()),
            id: assignment.id,
            policy_version_id: assignment.policy_version_id,
            policy_group: assignment.policy_group,
        }
    }
}

/// Compare version ids by value, so UUID letter case does not count as drift.
/// Unparseable ids fall back to exact comparison.
fn same_policy_version(prior: &str, desired: &str) -> bool {
    match (parse_policy_version_id(prior), parse_policy_version_id(desired)) {
        (Ok(prior), Ok(desired)) => prior == desired,
        _ => prior == desired,
    }
}

/// Reconciles policy assignments.
#[derive(Debug, Clone)]
pub struct PolicyAssignmentReconciler {
    gateway: Arc<ClientGateway>,
}

impl PolicyAssignmentReconciler {
    pub const fn new(gateway: Arc<ClientGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Reconciler for PolicyAssignmentReconciler {
    type Config = PolicyAssignmentConfig;
    type State = PolicyAssignmentState;

    fn kind(&self) -> ResourceKind {
        KIND
    }

    fn validate(&self, config: &PolicyAssignmentConfig) -> Result<()> {
        parse_policy_version_id(&config.policy_version_id)?;
        validate_policy_group_name(&config.policy_group)?;
        Ok(())
    }

    fn id_of(&self, state: &PolicyAssignmentState) -> String {
        state.id.clone()
    }

    fn diff(&self, prior: &PolicyAssignmentState, desired: &PolicyAssignmentConfig) -> ReconcileAction {
        if prior.policy_group != desired.policy_group {
            return ReconcileAction::Replace {
                forced_by: vec!["policy_group"],
            };
        }
        if !same_policy_version(&prior.policy_version_id, &desired.policy_version_id) {
            return ReconcileAction::Update {
                changed: vec!["policy_version_id"],
                recomputed: Vec::new(),
            };
        }
        ReconcileAction::NoOp
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        parse_assignment_id(id)?;
        Ok(())
    }

    async fn create(
        &self,
        ctx: &CallContext,
        config: &PolicyAssignmentConfig,
    ) -> Result<PolicyAssignmentState> {
        self.validate(config)?;
        let client = acquire(&self.gateway, KIND)?;

        let request = PolicyAssignment::new(&config.policy_version_id, &config.policy_group);
        debug!(request = ?request, "Calling CreatePolicyAssignment RPC");
        let created = ctx
            .run(client.create_policy_assignment(&request))
            .await
            .map_err(|e| Error::from_client(KIND, e))?;

        if created.id.is_empty() {
            return Err(Error::Remote(rode_client::Error::invalid_response(
                "created policy assignment has no id",
            )));
        }
        info!(id = %created.id, "Created policy assignment");

        self.read(ctx, &created.id)
            .await?
            .ok_or_else(|| Error::not_found(KIND, &created.id))
    }

    async fn read(&self, ctx: &CallContext, id: &str) -> Result<Option<PolicyAssignmentState>> {
        self.validate_id(id)?;
        let client = acquire(&self.gateway, KIND)?;

        debug!(id, "Calling GetPolicyAssignment RPC");
        let outcome = ctx.run(client.get_policy_assignment(id)).await;
        Ok(classify_read(KIND, id, outcome)?.map(PolicyAssignmentState::from))
    }

    async fn update(
        &self,
        ctx: &CallContext,
        prior: &PolicyAssignmentState,
        config: &PolicyAssignmentConfig,
    ) -> Result<PolicyAssignmentState> {
        self.validate(config)?;
        self.ensure_updatable(prior, config)?;
        let client = acquire(&self.gateway, KIND)?;

        let request = PolicyAssignment {
            id: prior.id.clone(),
            ..PolicyAssignment::new(&config.policy_version_id, &prior.policy_group)
        };
        debug!(request = ?request, "Calling UpdatePolicyAssignment RPC");
        ctx.run(client.update_policy_assignment(&request))
            .await
            .map_err(|e| Error::from_client(KIND, e))?;
        info!(id = %prior.id, policy_version_id = %config.policy_version_id, "Updated policy assignment");

        self.read(ctx, &prior.id)
            .await?
            .ok_or_else(|| Error::not_found(KIND, &prior.id))
    }

    async fn delete(&self, ctx: &CallContext, id: &str) -> Result<()> {
        self.validate_id(id)?;
        let client = acquire(&self.gateway, KIND)?;

        debug!(id, "Calling DeletePolicyAssignment RPC");
        let outcome = ctx.run(client.delete_policy_assignment(id)).await;
        classify_delete(KIND, id, outcome)
    }
}
