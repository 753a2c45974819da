#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # rode-provider
//!
//! Command-line host for the Rode reconcilers: validates resource manifests
//! offline and reads, imports or deletes resources on a Rode server.
//!
//! The reconciliation logic itself lives in `rode-reconciler`; this crate
//! only wires settings, cancellation and output around it.

pub mod cli;
pub mod commands;
pub mod manifest;

pub use rode_client;
pub use rode_reconciler;
