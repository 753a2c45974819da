#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # rode-core
//!
//! Shared building blocks for managing Rode policy resources:
//!
//! - [`identifier`]: the identifier codec (policy version ids, policy group
//!   names, import ids)
//! - [`model`]: the wire model exchanged with the remote service
//! - [`timestamp`]: RFC3339 formatting for persisted state
//!
//! Nothing in this crate performs I/O.

pub mod error;
pub mod identifier;
pub mod model;
pub mod timestamp;

pub use error::{Error, Result};
pub use identifier::{
    AssignmentId, PolicyVersionId, format_policy_version_id, parse_assignment_id,
    parse_policy_id, parse_policy_version_id, validate_policy_group_name,
};
pub use model::{Policy, PolicyAssignment, PolicyEntity, PolicyGroup};
pub use timestamp::{format_optional_timestamp, format_timestamp};
