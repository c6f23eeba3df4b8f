//! Response wrapping: wrapped writes and single-use unwrap.

use crate::{
    contract::{Contract, Json},
    error::{VaultError, VaultResult},
    fetch::{Request, RequestBody, RequestOptions},
    responses::{Data, TokenRequest, WrappedResponse, WrappingLookup},
    session::{Session, token_create_endpoint},
};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

impl Session {
    /// Write with a wrap TTL and return the wrapping envelope instead of
    /// the payload.
    ///
    /// # Errors
    ///
    /// Same as [`Session::write`].
    pub async fn write_wrapped(
        &self,
        endpoint: &str,
        body: impl Into<RequestBody>,
        wrap_ttl: Duration,
        options: RequestOptions,
    ) -> VaultResult<WrappedResponse> {
        self.write(
            &Json::<WrappedResponse>::new(),
            endpoint,
            body,
            options.wrap_ttl(wrap_ttl),
        )
        .await
    }

    /// Create a child token delivered inside a wrapping envelope.
    ///
    /// # Errors
    ///
    /// Same as [`Session::issue_token`].
    pub async fn issue_wrapped_token(
        &self,
        role: Option<&str>,
        request: &TokenRequest,
        wrap_ttl: Duration,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<WrappedResponse> {
        let mut options = RequestOptions::default();
        options.signal = signal.cloned();
        self.write_wrapped(
            &token_create_endpoint(role),
            RequestBody::json(request)?,
            wrap_ttl,
            options,
        )
        .await
    }

    /// Look up a wrapping token without consuming it.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthenticated`] before login, otherwise any request error.
    #[instrument(skip_all)]
    pub async fn lookup_wrapping(
        &self,
        wrapping_token: &SecretString,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<WrappingLookup> {
        let inner = self.inner();
        let token = inner.current_token().await?;
        let request = Request::new(Method::POST, "sys/wrapping/lookup")
            .token(&token)
            .body(json!({ "token": wrapping_token.expose_secret() }).into());
        let lookup = inner
            .fetcher
            .fetch(&Json::<Data<WrappingLookup>>::new(), request, signal)
            .await?;
        Ok(lookup.data)
    }

    /// Exchange a wrapping token for the payload it wraps.
    ///
    /// With `expected_creation_path`, the envelope is looked up first and
    /// must have been created at exactly that path, otherwise
    /// [`VaultError::CreationPathMismatch`] is returned and the token is
    /// left unconsumed. Neither call is retried: the token is single-use.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthenticated`] before login,
    /// [`VaultError::CreationPathMismatch`], or any request/validation error.
    #[instrument(skip(self, contract, wrapping_token, signal))]
    pub async fn unwrap<C: Contract>(
        &self,
        contract: &C,
        wrapping_token: &SecretString,
        expected_creation_path: Option<&str>,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<C::Output> {
        let inner = self.inner();
        inner.current_token().await?;

        if let Some(expected) = expected_creation_path {
            let lookup = self.lookup_wrapping(wrapping_token, signal).await?;
            if lookup.creation_path != expected {
                warn!(
                    expected,
                    actual = %lookup.creation_path,
                    "Wrapping token created at unexpected path"
                );
                return Err(VaultError::CreationPathMismatch {
                    expected: expected.to_string(),
                    actual: lookup.creation_path,
                });
            }
            debug!("Wrapping creation path verified");
        }

        let request = Request::new(Method::POST, "sys/wrapping/unwrap").token(wrapping_token);
        inner.fetcher.fetch(contract, request, signal).await
    }
}
