//! Reconciliation of declared Rode resources against the remote service.
//!
//! Each resource kind has a [`Reconciler`] that maps declared attributes to
//! Create/Get/Update/Delete RPCs and maps responses back to persisted state.
//!
//! # Key Concepts
//!
//! ## Drift
//!
//! A read that finds nothing, or finds an entity flagged `deleted`, reports
//! the resource as absent. [`converge`] then recreates it instead of failing.
//!
//! ## Actions
//!
//! - `NoOp` - remote state already matches
//! - `Create` - the resource is absent
//! - `Update` - mutable attributes changed
//! - `Replace` - an immutable attribute changed (delete, then create)
//! - `Delete` - the resource is no longer declared
//!
//! # Example
//!
//! ```ignore
//! use rode_client::{CallContext, ClientGateway, HttpConnector};
//! use rode_reconciler::{PolicyGroupConfig, PolicyGroupReconciler, converge};
//!
//! let gateway = ClientGateway::lazy(config, Arc::new(HttpConnector));
//! let groups = PolicyGroupReconciler::new(gateway);
//!
//! let desired = PolicyGroupConfig::new("team-a", "desc");
//! let result = converge(&groups, &CallContext::background(), None, Some(&desired)).await?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod classify;
pub mod error;
pub mod policy;
pub mod policy_assignment;
pub mod policy_group;
pub mod reconciler;
pub mod types;

pub use classify::{is_benign_delete_error, is_benign_read_error};
pub use error::{Error, ErrorKind, Result};
pub use policy::{PolicyConfig, PolicyReconciler, PolicyState};
pub use policy_assignment::{
    PolicyAssignmentConfig, PolicyAssignmentReconciler, PolicyAssignmentState,
};
pub use policy_group::{PolicyGroupConfig, PolicyGroupReconciler, PolicyGroupState};
pub use reconciler::{Reconciler, converge};
pub use types::{ReconcileAction, ReconcileResult, ResourceKind, UnknownResourceKind};
