//! Retrying HTTP client with uniform backoff semantics.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::Clock;
use serde::de::DeserializeOwned;

use crate::error::GatewayError;

/// Total attempts allowed for one logical call.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay for rate-limit backoff; attempt `n` waits `base * (n + 1)`.
const RATE_LIMIT_BASE: Duration = Duration::from_secs(5);

/// Flat delay before retrying after a transport-level failure.
const TRANSPORT_BACKOFF: Duration = Duration::from_secs(2);

/// HTTP method for an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        };
        write!(f, "{name}")
    }
}

/// Authorization header for an [`ApiRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// No authorization header.
    None,
    /// `Authorization: Bearer <token>` — a subject's own token.
    Bearer(String),
    /// `Authorization: Bot <token>` — the service credential.
    Bot(String),
}

/// Request body for an [`ApiRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// No body.
    None,
    /// JSON body.
    Json(String),
    /// Form-encoded body (token exchange).
    Form(Vec<(String, String)>),
}

/// One HTTP request against the platform API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub auth: Auth,
    pub payload: Payload,
}

impl ApiRequest {
    /// Creates a request with no body and no authorization.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            auth: Auth::None,
            payload: Payload::None,
        }
    }

    /// Sets the authorization header.
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Sets a JSON body from a serializable value.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        // Serializing our own wire structs cannot fail.
        self.payload = Payload::Json(serde_json::to_string(value).unwrap_or_default());
        self
    }

    /// Sets a form-encoded body.
    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.payload = Payload::Form(fields);
        self
    }
}

/// One HTTP response from the platform API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Returns true for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_str(&self.body).map_err(|e| GatewayError::Payload(e.to_string()))
    }
}

/// How [`RestClient::call`] treats non-2xx statuses other than 429.
///
/// 429 and transport failures are always retried up to the budget; this
/// policy only governs the remaining statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Any other non-2xx is terminal (`RemoteRejected`). Used for pure
    /// lookups where a retry has no value.
    Terminal,

    /// Unrecognized statuses are retried up to the budget and the last
    /// response is returned to the caller for interpretation. 400 and
    /// 403 are definitive and never retried. The add-member call needs
    /// this resilience; lookups do not.
    RetryUnrecognized {
        /// Restricts retries to 5xx statuses. Off by default to match
        /// the observed behavior of the platform integration.
        server_errors_only: bool,
    },
}

impl RetryPolicy {
    fn should_retry(&self, status: u16) -> bool {
        match self {
            RetryPolicy::Terminal => false,
            RetryPolicy::RetryUnrecognized { server_errors_only } => {
                if status == 400 || status == 403 {
                    return false;
                }
                if *server_errors_only {
                    (500..600).contains(&status)
                } else {
                    true
                }
            }
        }
    }
}

/// Executes a single HTTP exchange. Implementations carry no retry
/// logic; that belongs to [`RestClient`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs the request once, returning the raw response or a
    /// transport-level failure.
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError>;
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default reqwest client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };

        builder = match &request.auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.header("Authorization", format!("Bearer {token}")),
            Auth::Bot(token) => builder.header("Authorization", format!("Bot {token}")),
        };

        builder = match &request.payload {
            Payload::None => builder,
            Payload::Json(body) => builder
                .header("Content-Type", "application/json")
                .body(body.clone()),
            Payload::Form(fields) => builder.form(fields),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(ApiResponse { status, body })
    }
}

/// Retrying client that wraps a transport and a clock.
///
/// Owns the whole retry budget: up to [`MAX_ATTEMPTS`] attempts per
/// logical call, linear backoff on 429, flat backoff on transport
/// failure. It never interprets the business meaning of 2xx bodies.
#[derive(Debug, Clone)]
pub struct RestClient<T, C> {
    transport: T,
    clock: C,
}

impl<T: HttpTransport, C: Clock> RestClient<T, C> {
    /// Creates a new client over the given transport and clock.
    pub fn new(transport: T, clock: C) -> Self {
        Self { transport, clock }
    }

    /// Issues one logical call with the retry budget applied.
    ///
    /// Returns `Ok` for any 2xx, and for non-retried (or
    /// retry-exhausted) statuses under
    /// [`RetryPolicy::RetryUnrecognized`] so the caller can interpret
    /// them. Returns `Err` on rate-limit or transport exhaustion, and
    /// on any other non-2xx under [`RetryPolicy::Terminal`].
    pub async fn call(
        &self,
        request: &ApiRequest,
        policy: RetryPolicy,
    ) -> Result<ApiResponse, GatewayError> {
        let mut attempt: u32 = 0;
        loop {
            match self.transport.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if response.status == 429 => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        tracing::warn!(
                            method = %request.method,
                            url = %request.url,
                            "rate limit budget exhausted"
                        );
                        return Err(GatewayError::RateLimited {
                            attempts: MAX_ATTEMPTS,
                        });
                    }
                    let delay = RATE_LIMIT_BASE * attempt;
                    tracing::debug!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        url = %request.url,
                        "rate limited, backing off"
                    );
                    self.clock.sleep(delay).await;
                }
                Ok(response) => {
                    attempt += 1;
                    if !policy.should_retry(response.status) || attempt >= MAX_ATTEMPTS {
                        return match policy {
                            RetryPolicy::Terminal => Err(GatewayError::RemoteRejected {
                                status: response.status,
                                body: response.body,
                            }),
                            RetryPolicy::RetryUnrecognized { .. } => Ok(response),
                        };
                    }
                    tracing::debug!(
                        attempt,
                        status = response.status,
                        url = %request.url,
                        "unrecognized status, retrying"
                    );
                    self.clock.sleep(TRANSPORT_BACKOFF).await;
                }
                Err(GatewayError::Transport(reason)) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(GatewayError::Transport(reason));
                    }
                    tracing::debug!(attempt, %reason, url = %request.url, "transport failure, retrying");
                    self.clock.sleep(TRANSPORT_BACKOFF).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

/// Test transport that replays a scripted sequence of outcomes and
/// records every request it sees.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Result<ApiResponse, GatewayError>>>>,
    seen: Arc<Mutex<Vec<ApiRequest>>>,
}

impl ScriptedTransport {
    /// Creates an empty scripted transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with the given status and body.
    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(ApiResponse {
                status,
                body: body.into(),
            }));
    }

    /// Queues a transport-level failure.
    pub fn push_transport_failure(&self, reason: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::Transport(reason.into())));
    }

    /// Returns every request executed so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Returns the number of requests executed so far.
    pub fn request_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        self.seen.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("script exhausted".to_string())))
    }
}
