//! Policy group reconciler.

use std::sync::Arc;

use async_trait::async_trait;
use rode_client::{CallContext, ClientGateway};
use rode_core::{PolicyGroup, format_optional_timestamp, validate_policy_group_name};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::{classify_delete, classify_read};
use crate::error::{Error, Result};
use crate::reconciler::{Reconciler, acquire};
use crate::types::{ReconcileAction, ResourceKind};

const KIND: ResourceKind = ResourceKind::PolicyGroup;

/// Declared attributes of a policy group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyGroupConfig {
    /// Unique, immutable name.
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl PolicyGroupConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Persisted state of a policy group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyGroupState {
    pub name: String,
    pub description: String,
    pub created: String,
    pub updated: String,
    pub deleted: bool,
}

impl From<PolicyGroup> for PolicyGroupState {
    fn from(group: PolicyGroup) -> Self {
        Self {
            created: format_optional_timestamp(group.created.as_ref()),
            updated: format_optional_timestamp(group.updated.as_ref()),
            name: group.name,
            description: group.description,
            deleted: group.deleted,
        }
    }
}

/// Reconciles policy groups, addressed by name.
#[derive(Debug, Clone)]
pub struct PolicyGroupReconciler {
    gateway: Arc<ClientGateway>,
}

impl PolicyGroupReconciler {
    pub const fn new(gateway: Arc<ClientGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Reconciler for PolicyGroupReconciler {
    type Config = PolicyGroupConfig;
    type State = PolicyGroupState;

    fn kind(&self) -> ResourceKind {
        KIND
    }

    fn validate(&self, config: &PolicyGroupConfig) -> Result<()> {
        Ok(validate_policy_group_name(&config.name)?)
    }

    fn id_of(&self, state: &PolicyGroupState) -> String {
        state.name.clone()
    }

    fn diff(&self, prior: &PolicyGroupState, desired: &PolicyGroupConfig) -> ReconcileAction {
        if prior.name != desired.name {
            return ReconcileAction::Replace {
                forced_by: vec!["name"],
            };
        }
        if prior.description != desired.description {
            return ReconcileAction::Update {
                changed: vec!["description"],
                recomputed: Vec::new(),
            };
        }
        ReconcileAction::NoOp
    }

    fn validate_id(&self, name: &str) -> Result<()> {
        Ok(validate_policy_group_name(name)?)
    }

    async fn create(&self, ctx: &CallContext, config: &PolicyGroupConfig) -> Result<PolicyGroupState> {
        self.validate(config)?;
        let client = acquire(&self.gateway, KIND)?;

        let request = PolicyGroup::new(&config.name, &config.description);
        debug!(request = ?request, "Calling CreatePolicyGroup RPC");
        let created = ctx
            .run(client.create_policy_group(&request))
            .await
            .map_err(|e| Error::from_client(KIND, e))?;
        info!(name = %created.name, "Created policy group");

        self.read(ctx, &created.name)
            .await?
            .ok_or_else(|| Error::not_found(KIND, &created.name))
    }

    async fn read(&self, ctx: &CallContext, name: &str) -> Result<Option<PolicyGroupState>> {
        self.validate_id(name)?;
        let client = acquire(&self.gateway, KIND)?;

        debug!(name, "Calling GetPolicyGroup RPC");
        let outcome = ctx.run(client.get_policy_group(name)).await;
        match classify_read(KIND, name, outcome)? {
            Some(group) if group.deleted => {
                warn!(name, "Policy group has been deleted remotely");
                Ok(None)
            }
            found => Ok(found.map(PolicyGroupState::from)),
        }
    }

    async fn update(
        &self,
        ctx: &CallContext,
        prior: &PolicyGroupState,
        config: &PolicyGroupConfig,
    ) -> Result<PolicyGroupState> {
        self.ensure_updatable(prior, config)?;
        let client = acquire(&self.gateway, KIND)?;

        let request = PolicyGroup::new(&prior.name, &config.description);
        debug!(request = ?request, "Calling UpdatePolicyGroup RPC");
        ctx.run(client.update_policy_group(&request))
            .await
            .map_err(|e| Error::from_client(KIND, e))?;
        info!(name = %prior.name, "Updated policy group");

        self.read(ctx, &prior.name)
            .await?
            .ok_or_else(|| Error::not_found(KIND, &prior.name))
    }

    async fn delete(&self, ctx: &CallContext, name: &str) -> Result<()> {
        self.validate_id(name)?;
        let client = acquire(&self.gateway, KIND)?;

        debug!(name, "Calling DeletePolicyGroup RPC");
        let outcome = ctx.run(client.delete_policy_group(name)).await;
        classify_delete(KIND, name, outcome)
    }
}
