//! HTTP client for the Rode policy service.
//!
//! Talks to the service's JSON gateway under `/v1alpha1`. Failures are
//! decoded from the gateway's status body (`{"code": 5, "message": ...}`)
//! and fall back to the HTTP status when the body is not a status.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use rode_core::{AssignmentId, Policy, PolicyAssignment, PolicyGroup, parse_assignment_id};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::api::RodeApi;
use crate::auth::TokenSource;
use crate::config::{ClientConfig, Credentials, Secret};
use crate::error::{Code, Error, Result};
use crate::gateway::Connector;

const API_PREFIX: &str = "v1alpha1";

#[derive(Debug)]
enum Auth {
    None,
    Basic { username: String, password: Secret },
    Bearer(TokenSource),
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    code: i32,
    #[serde(default)]
    message: String,
}

/// Client for the Rode policy API.
#[derive(Debug, Clone)]
pub struct HttpRodeClient {
    base_url: Arc<Url>,
    http: reqwest::Client,
    auth: Arc<Auth>,
}

impl HttpRodeClient {
    /// Build a client from a configuration. No request is made.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a bad host and `InitializationFailed` if
    /// the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::initialization_failed(e.to_string()))?;

        let auth = match &config.credentials {
            Credentials::None => Auth::None,
            Credentials::Basic { username, password } => Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            Credentials::Oidc(oidc) => {
                Auth::Bearer(TokenSource::new(oidc.clone(), &config.user_agent)?)
            }
        };

        debug!(base_url = %base_url, "Constructed Rode client");

        Ok(Self {
            base_url: Arc::new(base_url),
            http,
            auth: Arc::new(auth),
        })
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resource URL under the API prefix. Each segment is percent-encoded,
    /// so an identifier can never add or climb path levels.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::clone(&self.base_url);
        url.path_segments_mut()
            .map_err(|()| Error::invalid_config(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .push(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let builder = self.http.request(method, self.url(segments)?);

        Ok(match self.auth.as_ref() {
            Auth::None => builder,
            Auth::Basic { username, password } => {
                builder.basic_auth(username, Some(password.expose()))
            }
            Auth::Bearer(tokens) => builder.bearer_auth(tokens.token().await?),
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            if let Auth::Bearer(tokens) = self.auth.as_ref() {
                tokens.invalidate().await;
            }
        }

        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<StatusBody>(&body) {
            Ok(status_body) => Error::rpc(Code::from_i32(status_body.code), status_body.message),
            Err(_) => Error::rpc(Code::from_http_status(status.as_u16()), body),
        })
    }

    async fn call<B, T>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.request(method, segments).await?;
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::invalid_response(e.to_string()))
    }

    async fn delete(&self, segments: &[&str]) -> Result<()> {
        let builder = self.request(Method::DELETE, segments).await?;
        self.send(builder).await.map(|_| ())
    }
}

/// Split `policies/<policyId>/assignments/<group>` into its parts.
fn assignment_path(id: &str) -> Result<AssignmentId> {
    parse_assignment_id(id).map_err(|e| Error::invalid_argument(e.to_string()))
}

#[async_trait]
impl RodeApi for HttpRodeClient {
    async fn create_policy_group(&self, group: &PolicyGroup) -> Result<PolicyGroup> {
        self.call(Method::POST, &["policy-groups"], Some(group)).await
    }

    async fn get_policy_group(&self, name: &str) -> Result<PolicyGroup> {
        self.call::<(), _>(Method::GET, &["policy-groups", name], None)
            .await
    }

    async fn update_policy_group(&self, group: &PolicyGroup) -> Result<PolicyGroup> {
        self.call(Method::PATCH, &["policy-groups", &group.name], Some(group))
            .await
    }

    async fn delete_policy_group(&self, name: &str) -> Result<()> {
        self.delete(&["policy-groups", name]).await
    }

    async fn create_policy(&self, policy: &Policy) -> Result<Policy> {
        self.call(Method::POST, &["policies"], Some(policy)).await
    }

    async fn get_policy(&self, id: &str) -> Result<Policy> {
        self.call::<(), _>(Method::GET, &["policies", id], None).await
    }

    async fn update_policy(&self, policy: &Policy) -> Result<Policy> {
        self.call(Method::PATCH, &["policies", &policy.id], Some(policy))
            .await
    }

    async fn delete_policy(&self, id: &str) -> Result<()> {
        self.delete(&["policies", id]).await
    }

    async fn create_policy_assignment(
        &self,
        assignment: &PolicyAssignment,
    ) -> Result<PolicyAssignment> {
        self.call(Method::POST, &["policy-assignments"], Some(assignment))
            .await
    }

    async fn get_policy_assignment(&self, id: &str) -> Result<PolicyAssignment> {
        let id = assignment_path(id)?;
        let policy_id = id.policy_id().to_string();
        let segments = ["policies", &policy_id, "assignments", id.policy_group()];
        self.call::<(), _>(Method::GET, &segments, None).await
    }

    async fn update_policy_assignment(
        &self,
        assignment: &PolicyAssignment,
    ) -> Result<PolicyAssignment> {
        let id = assignment_path(&assignment.id)?;
        let policy_id = id.policy_id().to_string();
        let segments = ["policies", &policy_id, "assignments", id.policy_group()];
        self.call(Method::PATCH, &segments, Some(assignment)).await
    }

    async fn delete_policy_assignment(&self, id: &str) -> Result<()> {
        let id = assignment_path(id)?;
        let policy_id = id.policy_id().to_string();
        self.delete(&["policies", &policy_id, "assignments", id.policy_group()])
            .await
    }
}

/// Connector that builds [`HttpRodeClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(&self, config: &ClientConfig) -> Result<Arc<dyn RodeApi>> {
        let client = HttpRodeClient::new(config)?;
        Ok(Arc::new(client))
    }
}
