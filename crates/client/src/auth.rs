//! OAuth2 client-credentials token source.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{OidcConfig, Secret};
use crate::error::{Code, Error, Result};

/// Tokens are refreshed this long before they expire.
const EXPIRY_LEEWAY: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug)]
struct CachedToken {
    access_token: Secret,
    /// `None` means the server did not say; reuse until rejected.
    refresh_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.refresh_at.is_none_or(|at| Instant::now() < at)
    }
}

/// Fetches and caches access tokens from the OIDC token endpoint.
#[derive(Debug)]
pub struct TokenSource {
    http: reqwest::Client,
    config: OidcConfig,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// Create a token source. No request is made until a token is needed.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the HTTP client cannot be built.
    pub fn new(config: OidcConfig, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(config.tls_insecure_skip_verify)
            .build()
            .map_err(|e| Error::initialization_failed(format!("token client: {e}")))?;

        Ok(Self {
            http,
            config,
            cached: Mutex::new(None),
        })
    }

    /// Return a valid access token, fetching a new one if needed.
    ///
    /// # Errors
    ///
    /// Returns an `Unauthenticated` RPC error if the token endpoint refuses.
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.expose().to_string());
        }

        let fresh = self.fetch().await?;
        let token = fresh.access_token.expose().to_string();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self) -> Result<CachedToken> {
        debug!(token_url = %self.config.token_url, client_id = %self.config.client_id, "Requesting access token");

        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("client_secret", self.config.client_secret.expose().to_string()),
        ];
        if !self.config.scopes.is_empty() {
            form.push(("scope", self.config.scopes.join(" ")));
        }

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::rpc(Code::Unauthenticated, format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::rpc(
                Code::Unauthenticated,
                format!("token endpoint returned {status}: {body}"),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            Error::rpc(Code::Unauthenticated, format!("invalid token response: {e}"))
        })?;

        let refresh_at = token.expires_in.and_then(|secs| {
            Instant::now().checked_add(Duration::from_secs(secs).saturating_sub(EXPIRY_LEEWAY))
        });

        Ok(CachedToken {
            access_token: Secret::new(token.access_token),
            refresh_at,
        })
    }
}
