//! In-memory stand-in for the Rode policy service.
//!
//! Stores entities in hash maps, records every RPC by name, and can be told
//! to fail or stall specific RPCs.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rode_client::{ClientConfig, ClientGateway, Code, Connector, Error, Result, RodeApi};
use rode_core::{
    Policy, PolicyAssignment, PolicyEntity, PolicyGroup, format_policy_version_id,
    parse_policy_version_id,
};
use uuid::Uuid;

pub const POLICY_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Fixed server clock: 2021-06-01T12:00:00.1234Z.
pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_622_548_800, 123_400_000).unwrap_or_default()
}

/// `t0` as the reconcilers format it.
pub const T0: &str = "2021-06-01T12:00:00.1234Z";

#[derive(Default)]
struct Inner {
    groups: HashMap<String, PolicyGroup>,
    policies: HashMap<String, Policy>,
    assignments: HashMap<String, PolicyAssignment>,
    calls: Vec<String>,
    requests: Vec<serde_json::Value>,
    failures: HashMap<&'static str, Error>,
    delay: Option<Duration>,
}

/// Fake remote API.
#[derive(Default)]
pub struct FakeRode {
    inner: Mutex<Inner>,
}

impl FakeRode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call to `rpc` fail with `err`.
    pub fn fail(&self, rpc: &'static str, err: Error) {
        self.lock().failures.insert(rpc, err);
    }

    /// Hold every call open for `delay` before answering.
    pub fn stall(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// RPC names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of calls made to `rpc`.
    pub fn count(&self, rpc: &str) -> usize {
        self.lock().calls.iter().filter(|call| *call == rpc).count()
    }

    /// Request bodies of create and update calls, in call order.
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.lock().requests.clone()
    }

    pub fn group(&self, name: &str) -> Option<PolicyGroup> {
        self.lock().groups.get(name).cloned()
    }

    pub fn policy(&self, id: &str) -> Option<Policy> {
        self.lock().policies.get(id).cloned()
    }

    pub fn assignment(&self, id: &str) -> Option<PolicyAssignment> {
        self.lock().assignments.get(id).cloned()
    }

    /// Soft-delete a group behind the reconciler's back.
    pub fn tombstone_group(&self, name: &str) {
        if let Some(group) = self.lock().groups.get_mut(name) {
            group.deleted = true;
        }
    }

    /// Soft-delete a policy behind the reconciler's back.
    pub fn tombstone_policy(&self, id: &str) {
        if let Some(policy) = self.lock().policies.get_mut(id) {
            policy.deleted = true;
        }
    }

    /// Hard-delete an assignment behind the reconciler's back.
    pub fn remove_assignment(&self, id: &str) {
        self.lock().assignments.remove(id);
    }

    /// Seed an existing policy at `version`.
    pub fn seed_policy(&self, id: &str, name: &str, rego_content: &str, version: u32) {
        let policy = Policy {
            id: id.to_string(),
            name: name.to_string(),
            current_version: version,
            policy: Some(entity(id, version, "seeded", rego_content)),
            created: Some(t0()),
            updated: Some(t0()),
            ..Policy::default()
        };
        self.lock().policies.insert(id.to_string(), policy);
    }

    async fn enter(&self, rpc: &'static str, body: Option<serde_json::Value>) -> Result<()> {
        let (delay, failure) = {
            let mut inner = self.lock();
            inner.calls.push(rpc.to_string());
            inner.requests.extend(body);
            (inner.delay, inner.failures.get(rpc).cloned())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        failure.map_or(Ok(()), Err)
    }
}

fn entity(policy_id: &str, version: u32, message: &str, rego_content: &str) -> PolicyEntity {
    PolicyEntity {
        id: format_policy_version_id(policy_id, version),
        version,
        message: message.to_string(),
        rego_content: rego_content.to_string(),
        created: Some(t0()),
    }
}

fn not_found(what: &str) -> Error {
    Error::rpc(Code::NotFound, format!("{what} not found"))
}

fn body<T: serde::Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

#[async_trait]
impl RodeApi for FakeRode {
    async fn create_policy_group(&self, group: &PolicyGroup) -> Result<PolicyGroup> {
        self.enter("CreatePolicyGroup", body(group)).await?;
        let mut inner = self.lock();
        if inner.groups.get(&group.name).is_some_and(|g| !g.deleted) {
            return Err(Error::rpc(Code::AlreadyExists, "policy group already exists"));
        }
        let stored = PolicyGroup {
            created: Some(t0()),
            updated: Some(t0()),
            ..group.clone()
        };
        inner.groups.insert(group.name.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_policy_group(&self, name: &str) -> Result<PolicyGroup> {
        self.enter("GetPolicyGroup", None).await?;
        self.lock().groups.get(name).cloned().ok_or_else(|| not_found(name))
    }

    async fn update_policy_group(&self, group: &PolicyGroup) -> Result<PolicyGroup> {
        self.enter("UpdatePolicyGroup", body(group)).await?;
        let mut inner = self.lock();
        let stored = inner
            .groups
            .get_mut(&group.name)
            .ok_or_else(|| not_found(&group.name))?;
        stored.description.clone_from(&group.description);
        Ok(stored.clone())
    }

    async fn delete_policy_group(&self, name: &str) -> Result<()> {
        self.enter("DeletePolicyGroup", None).await?;
        self.lock()
            .groups
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn create_policy(&self, policy: &Policy) -> Result<Policy> {
        self.enter("CreatePolicy", body(policy)).await?;
        let id = Uuid::new_v4().to_string();
        let submitted = policy.policy.clone().unwrap_or_default();
        let stored = Policy {
            id: id.clone(),
            current_version: 1,
            policy: Some(entity(&id, 1, &submitted.message, &submitted.rego_content)),
            created: Some(t0()),
            updated: Some(t0()),
            ..policy.clone()
        };
        self.lock().policies.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_policy(&self, id: &str) -> Result<Policy> {
        self.enter("GetPolicy", None).await?;
        self.lock().policies.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn update_policy(&self, policy: &Policy) -> Result<Policy> {
        self.enter("UpdatePolicy", body(policy)).await?;
        let mut inner = self.lock();
        let stored = inner
            .policies
            .get_mut(&policy.id)
            .ok_or_else(|| not_found(&policy.id))?;

        stored.name.clone_from(&policy.name);
        stored.description.clone_from(&policy.description);
        if let Some(submitted) = &policy.policy {
            let version = stored.current_version.saturating_add(1);
            stored.current_version = version;
            stored.policy = Some(entity(
                &policy.id,
                version,
                &submitted.message,
                &submitted.rego_content,
            ));
        }
        Ok(stored.clone())
    }

    async fn delete_policy(&self, id: &str) -> Result<()> {
        self.enter("DeletePolicy", None).await?;
        self.lock()
            .policies
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    async fn create_policy_assignment(
        &self,
        assignment: &PolicyAssignment,
    ) -> Result<PolicyAssignment> {
        self.enter("CreatePolicyAssignment", body(assignment)).await?;
        let version_id = parse_policy_version_id(&assignment.policy_version_id)
            .map_err(|e| Error::rpc(Code::InvalidArgument, e.to_string()))?;
        let id = format!(
            "policies/{}/assignments/{}",
            version_id.policy_id(),
            assignment.policy_group
        );
        let stored = PolicyAssignment {
            id: id.clone(),
            created: Some(t0()),
            updated: Some(t0()),
            ..assignment.clone()
        };
        self.lock().assignments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_policy_assignment(&self, id: &str) -> Result<PolicyAssignment> {
        self.enter("GetPolicyAssignment", None).await?;
        self.lock()
            .assignments
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn update_policy_assignment(
        &self,
        assignment: &PolicyAssignment,
    ) -> Result<PolicyAssignment> {
        self.enter("UpdatePolicyAssignment", body(assignment)).await?;
        let mut inner = self.lock();
        let stored = inner
            .assignments
            .get_mut(&assignment.id)
            .ok_or_else(|| not_found(&assignment.id))?;
        stored
            .policy_version_id
            .clone_from(&assignment.policy_version_id);
        Ok(stored.clone())
    }

    async fn delete_policy_assignment(&self, id: &str) -> Result<()> {
        self.enter("DeletePolicyAssignment", None).await?;
        self.lock()
            .assignments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}

/// Hands out the shared fake.
pub struct FakeConnector(pub Arc<FakeRode>);

impl Connector for FakeConnector {
    fn connect(&self, _config: &ClientConfig) -> Result<Arc<dyn RodeApi>> {
        Ok(Arc::clone(&self.0) as Arc<dyn RodeApi>)
    }
}

/// Always refuses to build a client.
pub struct RefusingConnector;

impl Connector for RefusingConnector {
    fn connect(&self, _config: &ClientConfig) -> Result<Arc<dyn RodeApi>> {
        Err(Error::initialization_failed("dial tcp: connection refused"))
    }
}

/// A lazy gateway backed by `fake`.
pub fn gateway(fake: &Arc<FakeRode>) -> Arc<ClientGateway> {
    ClientGateway::lazy(
        ClientConfig::new("rode.test:443"),
        Arc::new(FakeConnector(Arc::clone(fake))),
    )
}
