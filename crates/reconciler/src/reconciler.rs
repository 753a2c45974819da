//! The reconciler contract and the single-resource convergence driver.

use std::sync::Arc;

use async_trait::async_trait;
use rode_client::{CallContext, ClientGateway, RodeApi};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{ReconcileAction, ReconcileResult, ResourceKind};

/// Lifecycle of one resource kind against the remote service.
///
/// `Config` is what the operator declares; `State` is what the host persists
/// after each operation, including server-computed attributes.
#[async_trait]
pub trait Reconciler: Send + Sync {
    type Config: Send + Sync;
    type State: Clone + Send + Sync;

    /// The kind this reconciler manages.
    fn kind(&self) -> ResourceKind;

    /// Validate declared attributes. Never touches the network.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed names or identifiers.
    fn validate(&self, config: &Self::Config) -> Result<()>;

    /// The identifier `read`, `update` and `delete` address the resource by.
    fn id_of(&self, state: &Self::State) -> String;

    /// Compare an existing resource with its declaration.
    fn diff(&self, prior: &Self::State, desired: &Self::Config) -> ReconcileAction;

    /// Check that `id` addresses a resource of this kind. `read` and
    /// `delete` run this before touching the gateway.
    ///
    /// # Errors
    ///
    /// Returns a validation error for identifiers in the wrong format.
    fn validate_id(&self, id: &str) -> Result<()>;

    /// Validate an import identifier and return it in canonical form.
    ///
    /// # Errors
    ///
    /// Returns a validation error for identifiers in the wrong format.
    fn import(&self, id: &str) -> Result<String> {
        self.validate_id(id)?;
        Ok(id.to_string())
    }

    /// Create the resource and return its refreshed state.
    async fn create(&self, ctx: &CallContext, config: &Self::Config) -> Result<Self::State>;

    /// Fetch the resource. `None` means it no longer exists.
    async fn read(&self, ctx: &CallContext, id: &str) -> Result<Option<Self::State>>;

    /// Change mutable attributes in place and return the refreshed state.
    async fn update(
        &self,
        ctx: &CallContext,
        prior: &Self::State,
        config: &Self::Config,
    ) -> Result<Self::State>;

    /// Delete the resource. Deleting something already gone succeeds.
    async fn delete(&self, ctx: &CallContext, id: &str) -> Result<()>;

    /// Decide what reconciling `prior` towards `desired` requires.
    fn plan(&self, prior: Option<&Self::State>, desired: Option<&Self::Config>) -> ReconcileAction {
        match (prior, desired) {
            (None, None) => ReconcileAction::NoOp,
            (None, Some(_)) => ReconcileAction::Create,
            (Some(_), None) => ReconcileAction::Delete,
            (Some(prior), Some(desired)) => self.diff(prior, desired),
        }
    }

    /// Fail if moving `prior` to `desired` cannot happen in place.
    ///
    /// # Errors
    ///
    /// Returns `ReplacementRequired` naming the immutable attributes.
    fn ensure_updatable(&self, prior: &Self::State, desired: &Self::Config) -> Result<()> {
        match self.diff(prior, desired) {
            ReconcileAction::Replace { forced_by } => {
                Err(Error::replacement_required(self.kind(), forced_by))
            }
            _ => Ok(()),
        }
    }
}

/// Fetch the shared client for an operation on `kind`.
pub(crate) fn acquire(gateway: &ClientGateway, kind: ResourceKind) -> Result<Arc<dyn RodeApi>> {
    gateway.client().map_err(|e| Error::from_client(kind, e))
}

/// Bring one resource from `prior` to `desired`.
///
/// The prior state is refreshed with a read first, so a resource deleted out
/// of band is recreated rather than updated. `desired = None` deletes.
///
/// # Errors
///
/// Returns validation errors before any RPC and remote failures unchanged.
pub async fn converge<R>(
    reconciler: &R,
    ctx: &CallContext,
    prior: Option<&R::State>,
    desired: Option<&R::Config>,
) -> Result<ReconcileResult<R::State>>
where
    R: Reconciler + ?Sized,
{
    let kind = reconciler.kind();

    if let Some(config) = desired {
        reconciler.validate(config)?;
    }

    let current = match prior {
        Some(state) => {
            let id = reconciler.id_of(state);
            let current = reconciler.read(ctx, &id).await?;
            if current.is_none() {
                warn!(%kind, id = %id, "Resource was removed outside of this provider");
            }
            current
        }
        None => None,
    };

    let action = reconciler.plan(current.as_ref(), desired);
    info!(%kind, action = %action, "Reconciling");

    let state = match (&action, current, desired) {
        (ReconcileAction::Create, _, Some(config)) => Some(reconciler.create(ctx, config).await?),
        (ReconcileAction::Update { .. }, Some(current), Some(config)) => {
            Some(reconciler.update(ctx, &current, config).await?)
        }
        (ReconcileAction::Replace { .. }, Some(current), Some(config)) => {
            reconciler.delete(ctx, &reconciler.id_of(&current)).await?;
            Some(reconciler.create(ctx, config).await?)
        }
        (ReconcileAction::Delete, Some(current), _) => {
            reconciler.delete(ctx, &reconciler.id_of(&current)).await?;
            None
        }
        (_, current, _) => current,
    };

    debug!(%kind, present = state.is_some(), "Reconciled");
    Ok(ReconcileResult::new(action, state))
}
