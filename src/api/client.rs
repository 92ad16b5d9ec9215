//! Management API client with timeout and retry handling.
//!
//! # Responsibilities
//! - Build endpoint URLs from path segments (names are percent-encoded)
//! - Attach basic or bearer credentials per call
//! - Enforce the per-call deadline
//! - Retry idempotent calls on transient failures when enabled

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::{GrafanaConfig, RetryConfig, Secret, TimeoutConfig};
use crate::provision::types::{AccessToken, ProvisionError, ProvisionResult};
use crate::resilience::retries::{is_retryable_status, RetryPolicy};
use crate::resilience::timeouts::with_timeout;

/// Credentials attached to a single call.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Admin basic auth, used for identity management only.
    Basic { user: String, password: Secret },
    /// Service-account bearer token.
    Bearer(Secret),
}

impl Credentials {
    pub fn admin(config: &GrafanaConfig) -> Self {
        Credentials::Basic {
            user: config.admin_user.clone(),
            password: config.admin_password.clone(),
        }
    }

    pub fn bearer(token: &AccessToken) -> Self {
        Credentials::Bearer(token.secret.clone())
    }
}

/// Raw response: status plus body text. Callers decide what the status means.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn decode<T: DeserializeOwned>(&self, operation: &str) -> ProvisionResult<T> {
        serde_json::from_str(&self.body).map_err(|e| ProvisionError::UnexpectedResponse {
            operation: operation.to_string(),
            detail: e.to_string(),
        })
    }
}

/// HTTP client for the dashboard server's management API.
#[derive(Clone)]
pub struct ManagementClient {
    http: Client,
    base_url: Url,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl ManagementClient {
    pub fn new(
        grafana: &GrafanaConfig,
        timeouts: &TimeoutConfig,
        retries: &RetryConfig,
    ) -> ProvisionResult<Self> {
        let base_url = Url::parse(&grafana.url).map_err(|e| {
            ProvisionError::Client(format!("Invalid management API URL '{}': {}", grafana.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ProvisionError::Client(format!(
                "'{}' cannot be used as a base URL",
                grafana.url
            )));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ProvisionError::Client(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            request_timeout: Duration::from_secs(timeouts.request_secs),
            retry: RetryPolicy::from_config(retries),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join `segments` onto the base URL, encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> ProvisionResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProvisionError::Client(format!("'{}' cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get(
        &self,
        segments: &[&str],
        auth: &Credentials,
        operation: &str,
    ) -> ProvisionResult<ApiResponse> {
        self.execute(Method::GET, segments, auth, None, operation).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        auth: &Credentials,
        body: &B,
        operation: &str,
    ) -> ProvisionResult<ApiResponse> {
        let body = to_body(body, operation)?;
        self.execute(Method::POST, segments, auth, Some(body), operation).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        auth: &Credentials,
        body: &B,
        operation: &str,
    ) -> ProvisionResult<ApiResponse> {
        let body = to_body(body, operation)?;
        self.execute(Method::PUT, segments, auth, Some(body), operation).await
    }

    async fn execute(
        &self,
        method: Method,
        segments: &[&str],
        auth: &Credentials,
        body: Option<Value>,
        operation: &str,
    ) -> ProvisionResult<ApiResponse> {
        let url = self.endpoint(segments)?;
        let attempts = self.retry.attempts_for(&method);
        let mut attempt = 0;

        loop {
            let call = self.send_once(method.clone(), url.clone(), auth, body.as_ref(), operation);
            let result = with_timeout(self.request_timeout, operation, call).await;
            attempt += 1;

            let transient = match &result {
                Ok(response) => is_retryable_status(response.status),
                Err(ProvisionError::Transport { .. }) | Err(ProvisionError::Timeout { .. }) => true,
                Err(_) => false,
            };
            if !transient || attempt >= attempts {
                return result;
            }

            let delay = self.retry.delay_for(attempt);
            tracing::warn!(
                operation,
                attempt,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        auth: &Credentials,
        body: Option<&Value>,
        operation: &str,
    ) -> ProvisionResult<ApiResponse> {
        let mut request = self.http.request(method.clone(), url);
        request = match auth {
            Credentials::Basic { user, password } => request.basic_auth(user, Some(password.expose())),
            Credentials::Bearer(token) => request.bearer_auth(token.expose()),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| ProvisionError::Transport {
            operation: operation.to_string(),
            source,
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| ProvisionError::Transport {
            operation: operation.to_string(),
            source,
        })?;

        tracing::debug!(operation, %method, status = status.as_u16(), "Management API responded");
        Ok(ApiResponse { status, body })
    }
}

impl std::fmt::Debug for ManagementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementClient")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout_secs", &self.request_timeout.as_secs())
            .field("retry", &self.retry)
            .finish()
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B, operation: &str) -> ProvisionResult<Value> {
    serde_json::to_value(body).map_err(|e| {
        ProvisionError::Client(format!("Failed to encode request body for {}: {}", operation, e))
    })
}
