//! The remote RPC surface consumed by the reconcilers.

use async_trait::async_trait;
use rode_core::{Policy, PolicyAssignment, PolicyGroup};

use crate::error::Result;

/// Create/Get/Update/Delete calls for each entity type.
///
/// Implemented by [`crate::HttpRodeClient`] in production and by in-memory
/// fakes in tests.
#[async_trait]
pub trait RodeApi: Send + Sync {
    async fn create_policy_group(&self, group: &PolicyGroup) -> Result<PolicyGroup>;
    async fn get_policy_group(&self, name: &str) -> Result<PolicyGroup>;
    async fn update_policy_group(&self, group: &PolicyGroup) -> Result<PolicyGroup>;
    async fn delete_policy_group(&self, name: &str) -> Result<()>;

    async fn create_policy(&self, policy: &Policy) -> Result<Policy>;
    async fn get_policy(&self, id: &str) -> Result<Policy>;
    /// Update a policy. A populated `policy` entity submits a new version.
    async fn update_policy(&self, policy: &Policy) -> Result<Policy>;
    async fn delete_policy(&self, id: &str) -> Result<()>;

    async fn create_policy_assignment(
        &self,
        assignment: &PolicyAssignment,
    ) -> Result<PolicyAssignment>;
    async fn get_policy_assignment(&self, id: &str) -> Result<PolicyAssignment>;
    async fn update_policy_assignment(
        &self,
        assignment: &PolicyAssignment,
    ) -> Result<PolicyAssignment>;
    async fn delete_policy_assignment(&self, id: &str) -> Result<()>;
}
