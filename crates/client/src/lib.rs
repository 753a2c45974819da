#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # rode-client
//!
//! Client side of the Rode policy service.
//!
//! ## Features
//!
//! - [`RodeApi`]: the Create/Get/Update/Delete surface per entity type
//! - [`HttpRodeClient`]: JSON-gateway implementation with basic or OIDC
//!   client-credentials auth
//! - [`ClientGateway`]: at-most-once, optionally lazy client construction
//!   with sticky failure
//! - [`CallContext`]: cancellation and deadlines for individual calls
//!
//! ## Example
//!
//! ```ignore
//! use rode_client::{CallContext, ClientGateway, HttpConnector, ProviderSettings};
//!
//! let settings = ProviderSettings::from_file(path)?.with_env()?;
//! let gateway = ClientGateway::from_settings(&settings, Arc::new(HttpConnector))?;
//!
//! let ctx = CallContext::with_timeout(Duration::from_secs(30));
//! let group = ctx.run(gateway.client()?.get_policy_group("team-a")).await?;
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;

pub use api::RodeApi;
pub use client::{HttpConnector, HttpRodeClient};
pub use config::{ClientConfig, Credentials, OidcConfig, ProviderSettings, Secret, USER_AGENT};
pub use context::{CallContext, CancelHandle};
pub use error::{Code, Error, Result};
pub use gateway::{ClientGateway, Connector, GatewayPhase, InitMode};
