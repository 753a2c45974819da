//! CLI command handlers.
//!
//! All commands follow functional patterns:
//! - Zero unwraps, zero panics
//! - `Result<T, Error>` for all operations
//! - Remote calls carry the caller's `CallContext`

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rode_client::{CallContext, ClientConfig, ClientGateway, HttpConnector, ProviderSettings};
use rode_reconciler::{
    PolicyAssignmentReconciler, PolicyGroupReconciler, PolicyReconciler, Reconciler, ResourceKind,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::Commands;
use crate::manifest::Manifest;

/// One reconciler per resource kind, sharing a single gateway.
#[derive(Debug, Clone)]
pub struct Reconcilers {
    pub groups: PolicyGroupReconciler,
    pub policies: PolicyReconciler,
    pub assignments: PolicyAssignmentReconciler,
}

impl Reconcilers {
    pub fn new(gateway: &Arc<ClientGateway>) -> Self {
        Self {
            groups: PolicyGroupReconciler::new(Arc::clone(gateway)),
            policies: PolicyReconciler::new(Arc::clone(gateway)),
            assignments: PolicyAssignmentReconciler::new(Arc::clone(gateway)),
        }
    }

    /// Reconcilers for validation only. Their lazy gateway is never dialled.
    pub fn offline() -> Self {
        Self::new(&ClientGateway::lazy(
            ClientConfig::new("localhost"),
            Arc::new(HttpConnector),
        ))
    }
}

/// Load provider settings from an optional file, then apply `RODE_*` overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a variable is malformed.
pub fn load_settings(config: Option<&Path>) -> Result<ProviderSettings> {
    let settings = match config {
        Some(path) => ProviderSettings::from_file(path)
            .with_context(|| format!("Failed to load provider settings from {}", path.display()))?,
        None => ProviderSettings::default(),
    };
    settings
        .with_env()
        .context("Invalid RODE_* environment override")
}

/// Execute a CLI command.
///
/// This is the main command dispatcher that routes to the appropriate handler.
///
/// # Errors
///
/// Returns the first failure of the command.
pub async fn execute_command(
    command: Commands,
    config: Option<PathBuf>,
    ctx: &CallContext,
) -> Result<()> {
    match command {
        Commands::Validate { manifest } => cmd_validate(&manifest),
        Commands::Import { kind, id } => {
            let reconcilers = connect(config.as_deref())?;
            cmd_import(&reconcilers, ctx, kind, &id).await
        }
        Commands::Get { kind, id } => {
            let reconcilers = connect(config.as_deref())?;
            cmd_get(&reconcilers, ctx, kind, &id).await
        }
        Commands::Delete { kind, id } => {
            let reconcilers = connect(config.as_deref())?;
            cmd_delete(&reconcilers, ctx, kind, &id).await
        }
    }
}

fn connect(config: Option<&Path>) -> Result<Reconcilers> {
    let settings = load_settings(config)?;
    let gateway = ClientGateway::from_settings(&settings, Arc::new(HttpConnector))
        .context("Failed to configure the Rode client")?;
    debug!(gateway = ?gateway, "Client gateway ready");
    Ok(Reconcilers::new(&gateway))
}

/// Validate a manifest offline.
fn cmd_validate(path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    info!(resources = manifest.len(), "Validating manifest");

    let findings = manifest.validate(&Reconcilers::offline());
    if findings.is_empty() {
        println!("{}: {} resource(s) valid", path.display(), manifest.len());
        return Ok(());
    }

    for finding in &findings {
        eprintln!("{finding}");
    }
    bail!("{} problem(s) found in {}", findings.len(), path.display())
}

/// Validate an import identifier, read the resource and print its state.
async fn cmd_import(
    reconcilers: &Reconcilers,
    ctx: &CallContext,
    kind: ResourceKind,
    id: &str,
) -> Result<()> {
    match kind {
        ResourceKind::PolicyGroup => import(&reconcilers.groups, ctx, id).await,
        ResourceKind::Policy => import(&reconcilers.policies, ctx, id).await,
        ResourceKind::PolicyAssignment => import(&reconcilers.assignments, ctx, id).await,
    }
}

/// Print the state of a resource, or report that it does not exist.
async fn cmd_get(
    reconcilers: &Reconcilers,
    ctx: &CallContext,
    kind: ResourceKind,
    id: &str,
) -> Result<()> {
    match kind {
        ResourceKind::PolicyGroup => get(&reconcilers.groups, ctx, id).await,
        ResourceKind::Policy => get(&reconcilers.policies, ctx, id).await,
        ResourceKind::PolicyAssignment => get(&reconcilers.assignments, ctx, id).await,
    }
}

/// Delete a resource.
async fn cmd_delete(
    reconcilers: &Reconcilers,
    ctx: &CallContext,
    kind: ResourceKind,
    id: &str,
) -> Result<()> {
    match kind {
        ResourceKind::PolicyGroup => reconcilers.groups.delete(ctx, id).await?,
        ResourceKind::Policy => reconcilers.policies.delete(ctx, id).await?,
        ResourceKind::PolicyAssignment => reconcilers.assignments.delete(ctx, id).await?,
    }
    println!("{kind} '{id}' deleted");
    Ok(())
}

async fn import<R>(reconciler: &R, ctx: &CallContext, id: &str) -> Result<()>
where
    R: Reconciler,
    R::State: Serialize,
{
    let kind = reconciler.kind();
    let id = reconciler.import(id)?;
    let Some(state) = reconciler.read(ctx, &id).await? else {
        bail!("Cannot import non-existent remote object: {kind} '{id}'");
    };
    info!(%kind, id = %id, "Imported");
    print_json(&state)
}

async fn get<R>(reconciler: &R, ctx: &CallContext, id: &str) -> Result<()>
where
    R: Reconciler,
    R::State: Serialize,
{
    match reconciler.read(ctx, id).await? {
        Some(state) => print_json(&state),
        None => {
            println!("{} '{id}' does not exist", reconciler.kind());
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize state")?;
    println!("{json}");
    Ok(())
}
