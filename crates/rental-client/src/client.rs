//! The authenticated request client
//!
//! Performs one logical request against the backend: attach the bearer token
//! if a session holds one, send once, and on a 401 run the session's
//! single-flight refresh and retry exactly once with the fresh token. The
//! retry's result is final: a second 401 comes back to the caller instead of
//! triggering another refresh, so a logical call can never loop. Every
//! failure surfaces as exactly one [`ApiError`] kind.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, warn};

use rental_auth::{RefreshOutcome, Session};

use crate::error::{ApiError, Result};

/// Default per-call deadline, covering attempt + refresh + retry as one unit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One logical call's inputs beyond method and route.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// JSON body; serialized with the content-type set accordingly
    pub body: Option<Value>,
    /// Extra headers layered over the defaults
    pub headers: Vec<(String, String)>,
    /// Per-call deadline override
    pub timeout: Option<Duration>,
}

/// What one send attempt produced, before any refresh decision.
enum Attempt {
    Done(Option<Value>),
    Unauthorized { message: String },
}

/// Client for the backend's JSON API.
///
/// Holds the HTTP transport, the base URL, and a shared [`Session`]. Cheap
/// to share by reference; all state lives in the session.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
    default_timeout: Duration,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the default per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The session this client authenticates with.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one logical request.
    ///
    /// `route` is relative to the configured base URL and must not carry its
    /// own credentials; authentication is attached here. Returns the parsed
    /// response body, or `None` for 204 and empty replies.
    pub async fn request(
        &self,
        method: Method,
        route: &str,
        opts: RequestOptions,
    ) -> Result<Option<Value>> {
        let deadline = opts.timeout.unwrap_or(self.default_timeout);
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        match tokio::time::timeout(
            deadline,
            self.request_inner(&method, route, &opts, &request_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    request_id = %request_id,
                    method = %method,
                    route,
                    timeout_ms = deadline.as_millis() as u64,
                    "request deadline exceeded"
                );
                Err(ApiError::Timeout { after: deadline })
            }
        }
    }

    pub async fn get(&self, route: &str) -> Result<Option<Value>> {
        self.request(Method::GET, route, RequestOptions::default())
            .await
    }

    pub async fn post(&self, route: &str, body: Value) -> Result<Option<Value>> {
        self.request(
            Method::POST,
            route,
            RequestOptions {
                body: Some(body),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn put(&self, route: &str, body: Value) -> Result<Option<Value>> {
        self.request(
            Method::PUT,
            route,
            RequestOptions {
                body: Some(body),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(&self, route: &str) -> Result<Option<Value>> {
        self.request(Method::DELETE, route, RequestOptions::default())
            .await
    }

    /// Attempt, then at most one refresh and one retry, in that order.
    async fn request_inner(
        &self,
        method: &Method,
        route: &str,
        opts: &RequestOptions,
        request_id: &str,
    ) -> Result<Option<Value>> {
        let token = self.session.access_token().await;

        match self
            .send_once(method, route, opts, token.as_deref(), request_id)
            .await?
        {
            Attempt::Done(value) => Ok(value),
            Attempt::Unauthorized { .. } => {
                let Some(stale) = token else {
                    debug!(request_id, route, "rejected without credentials, nothing to refresh");
                    return Err(ApiError::AuthenticationRequired);
                };

                match self
                    .session
                    .refresh_after_unauthorized(&self.http, &self.base_url, &stale)
                    .await
                {
                    RefreshOutcome::Rotated(fresh) => {
                        debug!(request_id, route, "retrying with refreshed token");
                        match self
                            .send_once(method, route, opts, Some(&fresh), request_id)
                            .await?
                        {
                            Attempt::Done(value) => Ok(value),
                            // The retry's outcome is final; a second 401 is
                            // surfaced as-is rather than refreshed again.
                            Attempt::Unauthorized { message } => Err(ApiError::RequestFailed {
                                status: 401,
                                message,
                            }),
                        }
                    }
                    RefreshOutcome::SessionEnded => Err(ApiError::SessionExpired),
                }
            }
        }
    }

    /// Send the request once and classify the response.
    ///
    /// 401 comes back as [`Attempt::Unauthorized`] for the caller to decide
    /// on refresh; every other failure is mapped to its taxonomy kind here.
    async fn send_once(
        &self,
        method: &Method,
        route: &str,
        opts: &RequestOptions,
        bearer: Option<&str>,
        request_id: &str,
    ) -> Result<Attempt> {
        let url = join_url(&self.base_url, route);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        for (name, value) in &opts.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &opts.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!(request_id, method = %method, route, error = %e, "transport failure");
            ApiError::Transport(format!("request to {route} failed: {e}"))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            let message = failure_message(response).await;
            debug!(request_id, route, "unauthorized");
            return Ok(Attempt::Unauthorized { message });
        }

        if !status.is_success() {
            let message = failure_message(response).await;
            warn!(
                request_id,
                method = %method,
                route,
                status = status.as_u16(),
                message = %message,
                "request failed"
            );
            return Err(ApiError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Attempt::Done(None));
        }

        let bytes = response.bytes().await.map_err(|e| {
            error!(request_id, route, error = %e, "failed to read response body");
            ApiError::Transport(format!("reading response from {route}: {e}"))
        })?;
        if bytes.is_empty() {
            return Ok(Attempt::Done(None));
        }
        let value = serde_json::from_slice::<Value>(&bytes).map_err(|e| {
            error!(request_id, route, error = %e, "response was not valid JSON");
            ApiError::Transport(format!("parsing response from {route}: {e}"))
        })?;
        Ok(Attempt::Done(Some(value)))
    }
}

/// Join the configured base URL and a relative route.
fn join_url(base_url: &str, route: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if route.starts_with('/') {
        format!("{base}{route}")
    } else {
        format!("{base}/{route}")
    }
}

/// Best-effort extraction of the server's failure message.
///
/// The backend reports failures as `{"success":false,"message":"..."}`;
/// older deployments used an `error` field instead. Falls back to the
/// status's canonical reason when neither is present.
async fn failure_message(response: reqwest::Response) -> String {
    let status = response.status();
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    };
    let Ok(bytes) = response.bytes().await else {
        return fallback();
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(body) => body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(fallback),
        Err(_) => fallback(),
    }
}
