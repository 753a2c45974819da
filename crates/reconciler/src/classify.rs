//! Decides whether a remote failure means "already gone".
//!
//! Classification looks only at the structured [`Code`] carried by the
//! failure. Messages are never inspected.

use rode_client::Code;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::ResourceKind;

/// A delete that fails with `NotFound` already achieved its goal.
#[must_use]
pub fn is_benign_delete_error(err: &rode_client::Error) -> bool {
    err.code() == Code::NotFound
}

/// A read that fails with `NotFound` means the resource does not exist.
#[must_use]
pub fn is_benign_read_error(err: &rode_client::Error) -> bool {
    err.code() == Code::NotFound
}

/// Turn a read outcome into "present", "absent" or a classified error.
///
/// # Errors
///
/// Returns every failure except `NotFound`, classified for `kind`.
pub fn classify_read<T>(
    kind: ResourceKind,
    id: &str,
    outcome: rode_client::Result<T>,
) -> Result<Option<T>> {
    match outcome {
        Ok(found) => Ok(Some(found)),
        Err(err) if is_benign_read_error(&err) => {
            warn!(%kind, id, "Resource not found remotely, treating as absent");
            Ok(None)
        }
        Err(err) => Err(Error::from_client(kind, err)),
    }
}

/// Turn a delete outcome into success or a classified error.
///
/// # Errors
///
/// Returns every failure except `NotFound`, classified for `kind`.
pub fn classify_delete(kind: ResourceKind, id: &str, outcome: rode_client::Result<()>) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(err) if is_benign_delete_error(&err) => {
            debug!(%kind, id, "Resource already deleted");
            Ok(())
        }
        Err(err) => Err(Error::from_client(kind, err)),
    }
}
