//! Authenticated fetch: one HTTP exchange against `/v1/<endpoint>`.

use crate::{
    contract::Contract,
    error::{VaultError, VaultResult},
};
use reqwest::{Client, Method, StatusCode, Url, header::CONTENT_TYPE};
use rust_common::PlatformError;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Namespace header.
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";
/// Request token header.
pub const TOKEN_HEADER: &str = "X-Vault-Token";
/// Response-wrapping TTL header.
pub const WRAP_TTL_HEADER: &str = "X-Vault-Wrap-TTL";

/// Request body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// Serialized as JSON before sending
    Json(serde_json::Value),
    /// Sent verbatim
    Raw(String),
}

impl RequestBody {
    /// Serialize any value into a JSON body.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> VaultResult<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| VaultError::Platform(PlatformError::from(e)))
    }

    const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<()> for RequestBody {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

/// Per-call overrides for `read`/`write`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method; defaults to GET for reads and POST for writes
    pub method: Option<Method>,
    /// Ask the service to wrap the response for this long
    pub wrap_ttl: Option<Duration>,
    /// Cancels the request when triggered
    pub signal: Option<CancellationToken>,
}

impl RequestOptions {
    /// Override the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Use the `LIST` method.
    #[must_use]
    pub fn list(mut self) -> Self {
        self.method = Method::from_bytes(b"LIST").ok();
        self
    }

    /// Request a wrapped response.
    #[must_use]
    pub const fn wrap_ttl(mut self, ttl: Duration) -> Self {
        self.wrap_ttl = Some(ttl);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// A single request ready to be sent.
#[derive(Debug)]
pub(crate) struct Request<'a> {
    pub method: Method,
    pub endpoint: &'a str,
    pub token: Option<&'a SecretString>,
    pub body: RequestBody,
    pub wrap_ttl: Option<Duration>,
}

impl<'a> Request<'a> {
    pub(crate) fn new(method: Method, endpoint: &'a str) -> Self {
        Self {
            method,
            endpoint,
            token: None,
            body: RequestBody::Empty,
            wrap_ttl: None,
        }
    }

    pub(crate) const fn token(mut self, token: &'a SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub(crate) fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub(crate) const fn wrap_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.wrap_ttl = ttl;
        self
    }
}

/// Sends requests to one service address under one namespace.
#[derive(Debug, Clone)]
pub(crate) struct Fetcher {
    http: Client,
    address: String,
    namespace: Option<String>,
}

impl Fetcher {
    pub(crate) fn new(http: Client, address: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            http,
            address: address.into(),
            namespace,
        }
    }

    /// Send a request and validate the response against `contract`,
    /// giving up with [`VaultError::Cancelled`] if `signal` fires first.
    pub(crate) async fn fetch<C: Contract>(
        &self,
        contract: &C,
        request: Request<'_>,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<C::Output> {
        let Some(signal) = signal else {
            return self.execute(contract, request).await;
        };
        if signal.is_cancelled() {
            return Err(VaultError::Cancelled);
        }
        tokio::select! {
            biased;
            () = signal.cancelled() => Err(VaultError::Cancelled),
            result = self.execute(contract, request) => result,
        }
    }

    fn url(&self, endpoint: &str) -> VaultResult<Url> {
        let raw = format!("{}/v1/{}", self.address, endpoint.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| {
            VaultError::Platform(PlatformError::invalid_input(format!("invalid URL {raw}: {e}")))
        })
    }

    async fn execute<C: Contract>(&self, contract: &C, request: Request<'_>) -> VaultResult<C::Output> {
        let url = self.url(request.endpoint)?;
        let path = url.path().to_string();
        let method = request.method;

        let mut builder = self.http.request(method.clone(), url);
        if let Some(namespace) = &self.namespace {
            builder = builder.header(NAMESPACE_HEADER, namespace);
        }
        if let Some(token) = request.token {
            builder = builder.header(TOKEN_HEADER, token.expose_secret());
        }
        if let Some(ttl) = request.wrap_ttl {
            builder = builder.header(WRAP_TTL_HEADER, wrap_ttl_secs(ttl).to_string());
        }
        if method != Method::GET && !request.body.is_empty() {
            let bytes = match request.body {
                RequestBody::Json(value) => serde_json::to_vec(&value).map_err(PlatformError::from)?,
                RequestBody::Raw(raw) => raw.into_bytes(),
                RequestBody::Empty => Vec::new(),
            };
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        debug!(%method, path = %path, "Sending Vault request");
        let response = builder.send().await.map_err(PlatformError::from_transport)?;
        let status = response.status();

        if !contract.expects_body() {
            if status == StatusCode::NO_CONTENT {
                return contract
                    .parse(serde_json::Value::Null)
                    .map_err(|message| VaultError::validation(&path, message));
            }
            return Err(http_error(status, path, response).await);
        }
        if !status.is_success() {
            return Err(http_error(status, path, response).await);
        }

        let bytes = response.bytes().await.map_err(PlatformError::from_transport)?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| VaultError::validation(&path, format!("body is not JSON: {e}")))?;
        contract
            .parse(body)
            .map_err(|message| VaultError::validation(&path, message))
    }
}

/// Wrap TTL in whole seconds, rounded up and never zero, since a zero TTL
/// asks the service not to wrap at all.
fn wrap_ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

async fn http_error(status: StatusCode, path: String, response: reqwest::Response) -> VaultError {
    let body = response
        .bytes()
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok());
    debug!(%status, path = %path, "Vault request failed");
    VaultError::http(status, path, body)
}
