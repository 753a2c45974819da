//! Configuration for the Rode client.
//!
//! [`ProviderSettings`] is the declared provider block, loadable from TOML and
//! overlaid with `RODE_*` environment variables. [`ClientConfig`] is the
//! validated result the connector consumes.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("rode-provider/", env!("CARGO_PKG_VERSION"));

/// A string that never shows up in logs.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// OIDC client-credentials parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcConfig {
    pub client_id: String,
    pub client_secret: Secret,
    pub token_url: String,
    pub scopes: Vec<String>,
    /// Skip certificate verification for the token endpoint only.
    pub tls_insecure_skip_verify: bool,
}

/// How the client authenticates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    None,
    Basic {
        username: String,
        password: Secret,
    },
    Oidc(OidcConfig),
}

/// Connection settings for the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Host and port of the Rode instance.
    pub host: String,
    /// Use plain HTTP instead of HTTPS.
    pub disable_transport_security: bool,
    pub credentials: Credentials,
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a config for a host with no credentials.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            disable_transport_security: false,
            credentials: Credentials::None,
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Use plain HTTP.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.disable_transport_security = true;
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Base URL of the service, e.g. `https://rode.example.com:50051/`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the host is empty or does not form a URL.
    pub fn base_url(&self) -> Result<Url> {
        let host = self.host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(Error::invalid_config("host is required"));
        }

        let scheme = if self.disable_transport_security {
            "http"
        } else {
            "https"
        };
        Ok(Url::parse(&format!("{scheme}://{host}/"))?)
    }
}

/// The declared provider block.
///
/// Every field is optional here; [`ProviderSettings::client_config`] decides
/// what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub disable_transport_security: Option<bool>,
    /// Defer client construction until the first resource operation.
    #[serde(default)]
    pub lazy_init: Option<bool>,
    #[serde(default)]
    pub oidc_client_id: Option<String>,
    #[serde(default)]
    pub oidc_client_secret: Option<Secret>,
    #[serde(default)]
    pub oidc_token_url: Option<String>,
    /// Space-delimited scopes.
    #[serde(default)]
    pub oidc_scopes: Option<String>,
    #[serde(default)]
    pub oidc_tls_insecure_skip_verify: Option<bool>,
    #[serde(default)]
    pub basic_username: Option<String>,
    #[serde(default)]
    pub basic_password: Option<Secret>,
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    provider: ProviderSettings,
}

impl ProviderSettings {
    /// Load the `[provider]` table of a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse the `[provider]` table of a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the document is not valid.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<SettingsFile>(content)
            .map(|file| file.provider)
            .map_err(|e| Error::invalid_config(format!("failed to parse provider settings: {e}")))
    }

    /// Overlay values from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a boolean variable cannot be parsed.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`. Present, non-empty values win.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a boolean variable cannot be parsed.
    pub fn with_env_from<F>(self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_bool = |key: &str| get(key).map(|v| parse_bool(key, &v)).transpose();

        Ok(Self {
            host: get("RODE_HOST").or(self.host),
            disable_transport_security: get_bool("RODE_DISABLE_TRANSPORT_SECURITY")?
                .or(self.disable_transport_security),
            lazy_init: get_bool("RODE_LAZY_INIT")?.or(self.lazy_init),
            oidc_client_id: get("RODE_OIDC_CLIENT_ID").or(self.oidc_client_id),
            oidc_client_secret: get("RODE_OIDC_CLIENT_SECRET")
                .map(Secret::new)
                .or(self.oidc_client_secret),
            oidc_token_url: get("RODE_OIDC_TOKEN_URL").or(self.oidc_token_url),
            oidc_scopes: get("RODE_OIDC_SCOPES").or(self.oidc_scopes),
            oidc_tls_insecure_skip_verify: get_bool("RODE_OIDC_TLS_INSECURE_SKIP_VERIFY")?
                .or(self.oidc_tls_insecure_skip_verify),
            basic_username: get("RODE_BASIC_USERNAME").or(self.basic_username),
            basic_password: get("RODE_BASIC_PASSWORD")
                .map(Secret::new)
                .or(self.basic_password),
        })
    }

    /// Whether client construction is deferred.
    #[must_use]
    pub fn lazy_init(&self) -> bool {
        self.lazy_init.unwrap_or(false)
    }

    /// Validate the settings into a client configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the host is missing, when both credential
    /// schemes are set, or when a scheme is only partially filled in.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let host = non_empty(self.host.as_deref())
            .ok_or_else(|| Error::invalid_config("host is required (or set RODE_HOST)"))?;

        let mut config = ClientConfig::new(host).credentials(self.credentials()?);
        config.disable_transport_security = self.disable_transport_security.unwrap_or(false);
        Ok(config)
    }

    fn credentials(&self) -> Result<Credentials> {
        let basic_set = non_empty(self.basic_username.as_deref()).is_some()
            || self.basic_password.as_ref().is_some_and(|p| !p.is_empty());
        let oidc_set = non_empty(self.oidc_client_id.as_deref()).is_some()
            || self.oidc_client_secret.as_ref().is_some_and(|s| !s.is_empty())
            || non_empty(self.oidc_token_url.as_deref()).is_some();

        match (basic_set, oidc_set) {
            (true, true) => Err(Error::invalid_config(
                "basic auth cannot be configured alongside OIDC client credentials",
            )),
            (true, false) => {
                let username = non_empty(self.basic_username.as_deref())
                    .ok_or_else(|| Error::invalid_config("basic_username is required"))?;
                let password = self
                    .basic_password
                    .clone()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| Error::invalid_config("basic_password is required"))?;
                Ok(Credentials::Basic {
                    username: username.to_string(),
                    password,
                })
            }
            (false, true) => {
                let client_id = non_empty(self.oidc_client_id.as_deref())
                    .ok_or_else(|| Error::invalid_config("oidc_client_id is required"))?;
                let client_secret = self
                    .oidc_client_secret
                    .clone()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| Error::invalid_config("oidc_client_secret is required"))?;
                let token_url = non_empty(self.oidc_token_url.as_deref())
                    .ok_or_else(|| Error::invalid_config("oidc_token_url is required"))?;
                let scopes = self
                    .oidc_scopes
                    .as_deref()
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();

                Ok(Credentials::Oidc(OidcConfig {
                    client_id: client_id.to_string(),
                    client_secret,
                    token_url: token_url.to_string(),
                    scopes,
                    tls_insecure_skip_verify: self.oidc_tls_insecure_skip_verify.unwrap_or(false),
                }))
            }
            (false, false) => Ok(Credentials::None),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::invalid_config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_file_reads_provider_table() -> std::result::Result<(), Box<dyn std::error::Error>> {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "[provider]\nhost = \"rode.local:50051\"\nlazy_init = true\nbasic_username = \"u\""
        )?;

        let settings = ProviderSettings::from_file(file.path())?;
        assert_eq!(settings.host.as_deref(), Some("rode.local:50051"));
        assert!(settings.lazy_init());
        assert_eq!(settings.basic_username.as_deref(), Some("u"));

        let missing = ProviderSettings::from_file(&file.path().with_extension("absent"));
        assert!(matches!(missing, Err(Error::InvalidConfig { .. })));
        Ok(())
    }

    #[test]
    fn test_secrets_never_render() -> Result<()> {
        let settings = ProviderSettings::from_toml(
            "[provider]\nbasic_username = \"u\"\nbasic_password = \"hunter2\"\noidc_client_secret = \"s3cr3t\"",
        )?;
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cr3t"));
        assert_eq!(settings.basic_password.as_ref().map(Secret::expose), Some("hunter2"));
        Ok(())
    }

    #[test]
    fn test_host_is_required() {
        let result = ProviderSettings::default().client_config();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_env_overrides_declared_values() -> Result<()> {
        let declared = ProviderSettings {
            host: Some("declared:50051".to_string()),
            lazy_init: Some(false),
            ..ProviderSettings::default()
        };

        let settings = declared.with_env_from(env(&[
            ("RODE_HOST", "env:50051"),
            ("RODE_LAZY_INIT", "true"),
            ("RODE_DISABLE_TRANSPORT_SECURITY", ""),
        ]))?;

        assert_eq!(settings.host.as_deref(), Some("env:50051"));
        assert!(settings.lazy_init());
        assert_eq!(settings.disable_transport_security, None);
        Ok(())
    }

    #[test]
    fn test_declared_values_survive_missing_env() -> Result<()> {
        let declared = ProviderSettings {
            host: Some("declared:50051".to_string()),
            ..ProviderSettings::default()
        };
        let settings = declared.with_env_from(env(&[]))?;
        assert_eq!(settings.host.as_deref(), Some("declared:50051"));
        Ok(())
    }

    #[test]
    fn test_bad_boolean_env() {
        let result = ProviderSettings::default().with_env_from(env(&[("RODE_LAZY_INIT", "maybe")]));
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_conflicting_credentials() {
        let settings = ProviderSettings {
            host: Some("localhost:50051".to_string()),
            basic_username: Some("user".to_string()),
            basic_password: Some(Secret::new("pass")),
            oidc_client_id: Some("client".to_string()),
            ..ProviderSettings::default()
        };
        let result = settings.client_config();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_partial_basic_credentials() {
        let settings = ProviderSettings {
            host: Some("localhost:50051".to_string()),
            basic_username: Some("user".to_string()),
            ..ProviderSettings::default()
        };
        assert!(settings.client_config().is_err());
    }

    #[test]
    fn test_oidc_credentials() -> Result<()> {
        let settings = ProviderSettings {
            host: Some("localhost:50051".to_string()),
            oidc_client_id: Some("client".to_string()),
            oidc_client_secret: Some(Secret::new("secret")),
            oidc_token_url: Some("https://idp.example.com/token".to_string()),
            oidc_scopes: Some("rode  openid".to_string()),
            ..ProviderSettings::default()
        };

        let config = settings.client_config()?;
        match config.credentials {
            Credentials::Oidc(oidc) => {
                assert_eq!(oidc.client_id, "client");
                assert_eq!(oidc.scopes, vec!["rode".to_string(), "openid".to_string()]);
                assert!(!oidc.tls_insecure_skip_verify);
            }
            other => return Err(Error::invalid_config(format!("unexpected {other:?}"))),
        }
        Ok(())
    }

    #[test]
    fn test_base_url_scheme() -> Result<()> {
        let secure = ClientConfig::new("rode.example.com:50051").base_url()?;
        assert_eq!(secure.as_str(), "https://rode.example.com:50051/");

        let plain = ClientConfig::new("localhost:50051").insecure().base_url()?;
        assert_eq!(plain.as_str(), "http://localhost:50051/");
        Ok(())
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    #[test]
    fn test_from_toml() -> Result<()> {
        let settings = ProviderSettings::from_toml(
            r#"
            [provider]
            host = "localhost:50051"
            disable_transport_security = true
            lazy_init = true
            "#,
        )?;
        assert!(settings.lazy_init());
        let config = settings.client_config()?;
        assert!(config.disable_transport_security);
        Ok(())
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let result = ProviderSettings::from_toml("[provider]\nhots = \"typo\"\n");
        assert!(result.is_err());
    }
}
