//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rode_reconciler::ResourceKind;

/// Rode provider - declarative policy management
#[derive(Parser, Debug)]
#[command(name = "rode-provider")]
#[command(version)]
#[command(about = "Reconcile Rode policy groups, policies and policy assignments")]
#[command(
    long_about = "Validates declared Rode resources offline and reads, imports or deletes them on a Rode server. Provider settings come from a TOML file overlaid by RODE_* environment variables."
)]
pub struct Cli {
    /// Provider settings file (TOML with a [provider] table)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Abort remote calls after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a resource manifest without contacting the server
    Validate {
        /// Manifest file with [[policy_group]], [[policy]] and [[policy_assignment]] tables
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Adopt an existing remote resource and print its state
    Import {
        /// Resource kind (policy_group, policy, policy_assignment)
        kind: ResourceKind,

        /// Group name, policy UUID, or policies/<uuid>/assignments/<group>
        id: String,
    },

    /// Print the current state of a remote resource
    Get {
        /// Resource kind (policy_group, policy, policy_assignment)
        kind: ResourceKind,

        /// Resource identifier
        id: String,
    },

    /// Delete a remote resource (already deleted counts as success)
    Delete {
        /// Resource kind (policy_group, policy, policy_assignment)
        kind: ResourceKind,

        /// Resource identifier
        id: String,
    },
}
