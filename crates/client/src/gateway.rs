//! Remote client gateway.
//!
//! Owns the single client instance shared by every reconciler for the life of
//! the process. Construction happens at most once:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready(client)
//!                              \-> Failed(error)
//! ```
//!
//! Concurrent first callers block on the state lock until the one attempt
//! finishes, then all observe the same outcome. A failed attempt is sticky:
//! every later caller gets the same error until the process restarts.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::api::RodeApi;
use crate::config::{ClientConfig, ProviderSettings};
use crate::error::{Error, Result};

/// Builds a client from a configuration.
pub trait Connector: Send + Sync {
    /// Construct the client. Called at most once per gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    fn connect(&self, config: &ClientConfig) -> Result<Arc<dyn RodeApi>>;
}

/// When the gateway constructs its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// At configuration time.
    Eager,
    /// On the first resource operation that needs the client.
    Lazy,
}

/// Observable gateway state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPhase {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

enum GatewayState {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn RodeApi>),
    Failed(Error),
}

impl GatewayState {
    const fn phase(&self) -> GatewayPhase {
        match self {
            Self::Uninitialized => GatewayPhase::Uninitialized,
            Self::Initializing => GatewayPhase::Initializing,
            Self::Ready(_) => GatewayPhase::Ready,
            Self::Failed(_) => GatewayPhase::Failed,
        }
    }
}

/// Single, lazily constructed client handle.
pub struct ClientGateway {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    state: Mutex<GatewayState>,
    attempts: AtomicUsize,
}

impl fmt::Debug for ClientGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientGateway")
            .field("host", &self.config.host)
            .field("phase", &self.phase())
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}

impl ClientGateway {
    fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            state: Mutex::new(GatewayState::Uninitialized),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Create a gateway that constructs its client on first use.
    pub fn lazy(config: ClientConfig, connector: Arc<dyn Connector>) -> Arc<Self> {
        debug!(host = %config.host, "Delaying Rode client initialization until first use");
        Arc::new(Self::new(config, connector))
    }

    /// Create a gateway and construct its client immediately.
    ///
    /// # Errors
    ///
    /// Returns the initialization failure. The failure is also cached, so the
    /// gateway is not handed out in a half-usable state.
    pub fn eager(config: ClientConfig, connector: Arc<dyn Connector>) -> Result<Arc<Self>> {
        debug!(host = %config.host, "Lazy initialization is disabled, instantiating Rode client immediately");
        let gateway = Arc::new(Self::new(config, connector));
        gateway.client()?;
        Ok(gateway)
    }

    /// Create a gateway in either mode.
    ///
    /// # Errors
    ///
    /// Returns the initialization failure in eager mode.
    pub fn with_mode(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        mode: InitMode,
    ) -> Result<Arc<Self>> {
        match mode {
            InitMode::Eager => Self::eager(config, connector),
            InitMode::Lazy => Ok(Self::lazy(config, connector)),
        }
    }

    /// Create a gateway from resolved provider settings, honoring `lazy_init`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for unusable settings, or the initialization
    /// failure in eager mode.
    pub fn from_settings(
        settings: &ProviderSettings,
        connector: Arc<dyn Connector>,
    ) -> Result<Arc<Self>> {
        let mode = if settings.lazy_init() {
            InitMode::Lazy
        } else {
            InitMode::Eager
        };
        Self::with_mode(settings.client_config()?, connector, mode)
    }

    /// Return the client, constructing it on the first call.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the one construction attempt failed.
    pub fn client(&self) -> Result<Arc<dyn RodeApi>> {
        let mut state = self.lock();

        if let GatewayState::Ready(client) = &*state {
            return Ok(Arc::clone(client));
        }
        if let GatewayState::Failed(err) = &*state {
            return Err(err.clone());
        }
        // Only reachable if a connector panicked mid-attempt.
        if matches!(*state, GatewayState::Initializing) {
            let err = Error::initialization_failed(
                "a previous initialization attempt was interrupted",
            );
            *state = GatewayState::Failed(err.clone());
            return Err(err);
        }

        *state = GatewayState::Initializing;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        info!(host = %self.config.host, "Initializing Rode client");

        match self.connector.connect(&self.config) {
            Ok(client) => {
                *state = GatewayState::Ready(Arc::clone(&client));
                Ok(client)
            }
            Err(err) => {
                let err = match err {
                    Error::InitializationFailed { .. } => err,
                    other => Error::initialization_failed(other.to_string()),
                };
                warn!(host = %self.config.host, error = %err, "Rode client initialization failed");
                *state = GatewayState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> GatewayPhase {
        self.lock().phase()
    }

    /// Number of construction attempts made. Never exceeds one.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The configuration the client is built from.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
