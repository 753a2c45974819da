//! Policy reconciler.
//!
//! A policy's Rego content is versioned server-side. Changing the content
//! submits a new version, which bumps `current_version` and yields a new
//! `policy_version_id`. Assignments that reference the old version id keep
//! pointing at it until they are re-declared.

use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use rode_client::{CallContext, ClientGateway};
use rode_core::{
    Policy, PolicyEntity, format_optional_timestamp, format_policy_version_id, parse_policy_id,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::{classify_delete, classify_read};
use crate::error::{Error, Result};
use crate::reconciler::{Reconciler, acquire};
use crate::types::{ReconcileAction, ResourceKind};

const KIND: ResourceKind = ResourceKind::Policy;

/// Declared attributes of a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Changelog entry for the version created by this declaration.
    #[serde(default)]
    pub message: Option<String>,
    pub rego_content: String,
}

impl PolicyConfig {
    pub fn new(name: impl Into<String>, rego_content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rego_content: rego_content.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Persisted state of a policy and its current version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyState {
    pub id: String,
    pub name: String,
    pub description: String,
    pub current_version: u32,
    /// `<id>.<current_version>`, the id assignments reference.
    pub policy_version_id: String,
    pub message: String,
    pub rego_content: String,
    pub created: String,
    pub updated: String,
    pub deleted: bool,
}

impl From<Policy> for PolicyState {
    fn from(policy: Policy) -> Self {
        let entity = policy.policy.unwrap_or_default();
        let policy_version_id = if !entity.id.is_empty() {
            entity.id
        } else if policy.current_version > 0 {
            format_policy_version_id(&policy.id, policy.current_version)
        } else {
            String::new()
        };

        Self {
            created: format_optional_timestamp(policy.created.as_ref()),
            updated: format_optional_timestamp(policy.updated.as_ref()),
            id: policy.id,
            name: policy.name,
            description: policy.description,
            current_version: policy.current_version,
            policy_version_id,
            message: entity.message,
            rego_content: entity.rego_content,
            deleted: policy.deleted,
        }
    }
}

/// Reconciles policies, addressed by their server-assigned UUID.
#[derive(Debug, Clone)]
pub struct PolicyReconciler {
    gateway: Arc<ClientGateway>,
}

impl PolicyReconciler {
    pub const fn new(gateway: Arc<ClientGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Reconciler for PolicyReconciler {
    type Config = PolicyConfig;
    type State = PolicyState;

    fn kind(&self) -> ResourceKind {
        KIND
    }

    fn validate(&self, config: &PolicyConfig) -> Result<()> {
        [("name", &config.name), ("rego_content", &config.rego_content)]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map_or(Ok(()), |(attribute, _)| {
                Err(rode_core::Error::missing_attribute(attribute).into())
            })
    }

    fn id_of(&self, state: &PolicyState) -> String {
        state.id.clone()
    }

    fn diff(&self, prior: &PolicyState, desired: &PolicyConfig) -> ReconcileAction {
        let content_changed = prior.rego_content != desired.rego_content;
        // The message belongs to a version, so it only counts with new content.
        let message_changed = content_changed
            && desired
                .message
                .as_ref()
                .is_some_and(|message| *message != prior.message);

        let changed = [
            ("name", prior.name != desired.name),
            ("description", prior.description != desired.description),
            ("message", message_changed),
            ("rego_content", content_changed),
        ]
        .into_iter()
        .filter_map(|(attribute, differs)| differs.then_some(attribute))
        .collect_vec();

        if changed.is_empty() {
            return ReconcileAction::NoOp;
        }

        let recomputed = if content_changed {
            vec!["current_version", "policy_version_id"]
        } else {
            Vec::new()
        };
        ReconcileAction::Update {
            changed,
            recomputed,
        }
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        parse_policy_id(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &CallContext, config: &PolicyConfig) -> Result<PolicyState> {
        self.validate(config)?;
        let client = acquire(&self.gateway, KIND)?;

        let request = Policy {
            name: config.name.clone(),
            description: config.description.clone(),
            policy: Some(PolicyEntity::new(
                config.message.clone().unwrap_or_default(),
                &config.rego_content,
            )),
            ..Policy::default()
        };
        debug!(request = ?request, "Calling CreatePolicy RPC");
        let created = ctx
            .run(client.create_policy(&request))
            .await
            .map_err(|e| Error::from_client(KIND, e))?;

        if created.id.is_empty() {
            return Err(Error::Remote(rode_client::Error::invalid_response(
                "created policy has no id",
            )));
        }
        info!(id = %created.id, version = created.current_version, "Created policy");

        self.read(ctx, &created.id)
            .await?
            .ok_or_else(|| Error::not_found(KIND, &created.id))
    }

    async fn read(&self, ctx: &CallContext, id: &str) -> Result<Option<PolicyState>> {
        self.validate_id(id)?;
        let client = acquire(&self.gateway, KIND)?;

        debug!(id, "Calling GetPolicy RPC");
        let outcome = ctx.run(client.get_policy(id)).await;
        match classify_read(KIND, id, outcome)? {
            Some(policy) if policy.deleted => {
                warn!(id, "Policy has been deleted remotely");
                Ok(None)
            }
            found => Ok(found.map(PolicyState::from)),
        }
    }

    async fn update(
        &self,
        ctx: &CallContext,
        prior: &PolicyState,
        config: &PolicyConfig,
    ) -> Result<PolicyState> {
        self.ensure_updatable(prior, config)?;
        let client = acquire(&self.gateway, KIND)?;

        let new_version = prior.rego_content != config.rego_content;
        let request = Policy {
            id: prior.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            policy: new_version.then(|| {
                PolicyEntity::new(
                    config.message.clone().unwrap_or_default(),
                    &config.rego_content,
                )
            }),
            ..Policy::default()
        };
        debug!(request = ?request, new_version, "Calling UpdatePolicy RPC");
        let updated = ctx
            .run(client.update_policy(&request))
            .await
            .map_err(|e| Error::from_client(KIND, e))?;
        info!(id = %prior.id, version = updated.current_version, "Updated policy");

        self.read(ctx, &prior.id)
            .await?
            .ok_or_else(|| Error::not_found(KIND, &prior.id))
    }

    async fn delete(&self, ctx: &CallContext, id: &str) -> Result<()> {
        self.validate_id(id)?;
        let client = acquire(&self.gateway, KIND)?;

        debug!(id, "Calling DeletePolicy RPC");
        let outcome = ctx.run(client.delete_policy(id)).await;
        classify_delete(KIND, id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rode_client::{ClientConfig, HttpConnector};

    const POLICY_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn reconciler() -> PolicyReconciler {
        PolicyReconciler::new(ClientGateway::lazy(
            ClientConfig::new("localhost:50051"),
            Arc::new(HttpConnector),
        ))
    }

    fn state() -> PolicyState {
        PolicyState {
            id: POLICY_ID.to_string(),
            name: "p".to_string(),
            current_version: 1,
            policy_version_id: format!("{POLICY_ID}.1"),
            message: "init".to_string(),
            rego_content: "package p".to_string(),
            ..PolicyState::default()
        }
    }

    #[test]
    fn test_content_change_recomputes_version() {
        let desired = PolicyConfig::new("p", "package p\ndefault allow = true");
        let action = reconciler().diff(&state(), &desired);
        assert_eq!(
            action,
            ReconcileAction::Update {
                changed: vec!["rego_content"],
                recomputed: vec!["current_version", "policy_version_id"],
            }
        );
    }

    #[test]
    fn test_metadata_change_keeps_version() {
        let desired = PolicyConfig::new("p", "package p").with_description("new");
        let action = reconciler().diff(&state(), &desired);
        assert_eq!(
            action,
            ReconcileAction::Update {
                changed: vec!["description"],
                recomputed: vec![],
            }
        );
    }

    #[test]
    fn test_message_alone_is_not_a_change() {
        let desired = PolicyConfig::new("p", "package p").with_message("other");
        assert!(reconciler().diff(&state(), &desired).is_noop());
    }

    #[test]
    fn test_state_from_policy_falls_back_to_formatted_version_id() {
        let policy = Policy {
            id: POLICY_ID.to_string(),
            name: "p".to_string(),
            current_version: 4,
            policy: Some(PolicyEntity::new("m", "package p")),
            ..Policy::default()
        };
        let state = PolicyState::from(policy);
        assert_eq!(state.policy_version_id, format!("{POLICY_ID}.4"));
        assert_eq!(state.rego_content, "package p");
        assert_eq!(state.created, "");
    }

    #[test]
    fn test_import_requires_uuid() {
        let reconciler = reconciler();
        assert_eq!(reconciler.import(POLICY_ID).ok(), Some(POLICY_ID.to_string()));
        assert_eq!(
            reconciler.import("not-a-uuid").map_err(|e| e.kind()),
            Err(ErrorKind::InvalidPolicyId)
        );
    }
}
