//! Authenticated session: token state plus every request routed through it.

use crate::{
    auth,
    config::SessionConfig,
    contract::{Contract, Json, NoContent},
    error::{VaultError, VaultResult},
    fetch::{Fetcher, Request, RequestBody, RequestOptions},
    renewal::{RenewalState, Scheduler},
    responses::{AuthResponse, IssuedToken, Lease, LookupResponse, Renewal, TokenRequest},
};
use reqwest::{Client, Method};
use rust_common::build_http_client;
use secrecy::SecretString;
use serde_json::json;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Options for [`Session::logout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutOptions {
    /// Propagate a failed revocation instead of logging it
    pub revoke_hard_fail: bool,
}

/// Mutable token state. Present token means logged in.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub token: Option<SecretString>,
    pub accessor: Option<String>,
    pub lease_duration: u64,
    pub renewable: bool,
    pub revocable: bool,
}

impl SessionState {
    fn from_login(token: SecretString, lease: &Lease) -> Self {
        Self {
            token: Some(token),
            accessor: lease.accessor.clone(),
            lease_duration: lease.lease_duration,
            renewable: lease.renewable,
            revocable: lease.is_revocable(),
        }
    }

    fn apply_renewal(&mut self, renewal: &Renewal) {
        if !renewal.accessor.is_empty() {
            self.accessor = Some(renewal.accessor.clone());
        }
        self.lease_duration = renewal.lease_duration;
    }
}

/// Shared between the session handle and its renewal task.
pub(crate) struct Inner {
    pub config: SessionConfig,
    pub fetcher: Fetcher,
    pub state: RwLock<SessionState>,
    pub renewal: Scheduler,
}

impl Inner {
    pub(crate) async fn current_token(&self) -> VaultResult<SecretString> {
        self.state
            .read()
            .await
            .token
            .clone()
            .ok_or(VaultError::Unauthenticated)
    }

    pub(crate) async fn lookup_with(
        &self,
        token: &SecretString,
        accessor: Option<&str>,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<LookupResponse> {
        let request = match accessor {
            None => Request::new(Method::GET, "auth/token/lookup-self"),
            Some(accessor) => Request::new(Method::POST, "auth/token/lookup-accessor")
                .body(json!({ "accessor": accessor }).into()),
        };
        self.fetcher
            .fetch(&Json::<LookupResponse>::new(), request.token(token), signal)
            .await
    }

    pub(crate) async fn renew_with(
        &self,
        token: &SecretString,
        accessor: Option<&str>,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<Renewal> {
        let request = match accessor {
            None => Request::new(Method::POST, "auth/token/renew-self"),
            Some(accessor) => Request::new(Method::POST, "auth/token/renew-accessor")
                .body(json!({ "accessor": accessor }).into()),
        };
        let response = self
            .fetcher
            .fetch(&Json::<AuthResponse>::new(), request.token(token), signal)
            .await?;
        Ok(Renewal {
            accessor: response.auth.accessor,
            lease_duration: response.auth.lease_duration,
        })
    }

    /// Store a self-renewal result unless the session was logged out or
    /// the caller's guard was cancelled in the meantime.
    pub(crate) async fn commit_renewal(&self, renewal: &Renewal, guard: Option<&CancellationToken>) -> bool {
        let mut state = self.state.write().await;
        if state.token.is_none() || guard.is_some_and(CancellationToken::is_cancelled) {
            return false;
        }
        state.apply_renewal(renewal);
        true
    }
}

/// An authenticated session against a Vault server.
///
/// Created with credentials, it holds no token until [`Session::login`]
/// succeeds. Every other operation fails with
/// [`VaultError::Unauthenticated`] before touching the network while no
/// token is held. Dropping the session cancels its renewal task.
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Create a session with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: SessionConfig) -> VaultResult<Self> {
        let http = build_http_client(&config.http).map_err(rust_common::PlatformError::from)?;
        Ok(Self::with_client(config, http))
    }

    /// Create a session on an existing HTTP client.
    #[must_use]
    pub fn with_client(config: SessionConfig, http: Client) -> Self {
        let fetcher = Fetcher::new(http, config.address.clone(), config.namespace_header());
        Self {
            inner: Arc::new(Inner {
                config,
                fetcher,
                state: RwLock::new(SessionState::default()),
                renewal: Scheduler::default(),
            }),
        }
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Exchange the configured credentials for a token.
    ///
    /// Token, accessor, lease and revocability are replaced together on
    /// success; a failed login leaves the previous state untouched. When
    /// the new lease is renewable, has an accessor and a positive
    /// duration, and auto-renew is on, the renewal scheduler is armed.
    ///
    /// # Errors
    ///
    /// Any error from the credential exchange.
    #[instrument(skip(self), fields(kind = %self.inner.config.credentials.kind()))]
    pub async fn login(&self) -> VaultResult<Lease> {
        let (token, lease) = auth::authenticate(&self.inner).await?;

        self.inner.renewal.disarm();
        *self.inner.state.write().await = SessionState::from_login(token, &lease);
        info!(
            lease_secs = lease.lease_duration,
            renewable = lease.renewable,
            token_type = lease.token_type.as_deref().unwrap_or("unknown"),
            "Logged in to Vault"
        );

        if self.inner.config.auto_renew && lease.is_schedulable() {
            self.arm(lease.lease_duration);
        }
        Ok(lease)
    }

    /// Disarm renewal, optionally revoke the token, and clear the session.
    ///
    /// Revocation happens only when the credentials ask for it and the
    /// token is a service token. A failed revocation is logged and
    /// swallowed unless `revoke_hard_fail` is set; the session is cleared
    /// either way. Calling this before login is a no-op.
    ///
    /// # Errors
    ///
    /// The revocation error, when `revoke_hard_fail` is set.
    #[instrument(skip(self))]
    pub async fn logout(&self, options: LogoutOptions) -> VaultResult<()> {
        self.inner.renewal.disarm();

        let (token, revocable) = {
            let state = self.inner.state.read().await;
            (state.token.clone(), state.revocable)
        };
        let Some(token) = token else {
            debug!("Logout without an active token");
            return Ok(());
        };

        let mut result = Ok(());
        if self.inner.config.credentials.revoke_on_logout && revocable {
            let request = Request::new(Method::POST, "auth/token/revoke-self").token(&token);
            match self.inner.fetcher.fetch(&NoContent, request, None).await {
                Ok(()) => info!("Revoked Vault token"),
                Err(e) if options.revoke_hard_fail => result = Err(e),
                Err(e) => warn!(error = %e, "Token revocation failed, continuing logout"),
            }
        }

        *self.inner.state.write().await = SessionState::default();
        info!("Logged out of Vault");
        result
    }

    /// Look up the session token, or another token by accessor.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthenticated`] before login, otherwise any request error.
    #[instrument(skip(self, signal))]
    pub async fn lookup(
        &self,
        accessor: Option<&str>,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<LookupResponse> {
        let token = self.inner.current_token().await?;
        self.inner.lookup_with(&token, accessor, signal).await
    }

    /// Renew the session token, or another token by accessor.
    ///
    /// A self-renewal stores the new accessor and lease duration in the
    /// session; renewing by accessor leaves the session untouched.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthenticated`] before login, otherwise any request error.
    #[instrument(skip(self, signal))]
    pub async fn renew_token(
        &self,
        accessor: Option<&str>,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<Renewal> {
        let token = self.inner.current_token().await?;
        let renewal = self.inner.renew_with(&token, accessor, signal).await?;
        if accessor.is_none() {
            self.inner.commit_renewal(&renewal, None).await;
        }
        Ok(renewal)
    }

    /// Create a child token, optionally against a token role.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthenticated`] before login, otherwise any request error.
    #[instrument(skip(self, request, signal))]
    pub async fn issue_token(
        &self,
        role: Option<&str>,
        request: &TokenRequest,
        signal: Option<&CancellationToken>,
    ) -> VaultResult<IssuedToken> {
        let token = self.inner.current_token().await?;
        let endpoint = token_create_endpoint(role);
        let request = Request::new(Method::POST, &endpoint)
            .token(&token)
            .body(RequestBody::json(request)?);
        let response = self
            .inner
            .fetcher
            .fetch(&Json::<AuthResponse>::new(), request, signal)
            .await?;
        Ok(IssuedToken {
            client_token: response.auth.client_token,
            accessor: response.auth.accessor,
            lease_duration: response.auth.lease_duration,
        })
    }

    /// Authenticated read. Defaults to GET.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthenticated`] before login, [`VaultError::Cancelled`]
    /// when the signal fires, otherwise any request or validation error.
    #[instrument(skip(self, contract, options))]
    pub async fn read<C: Contract>(
        &self,
        contract: &C,
        endpoint: &str,
        options: RequestOptions,
    ) -> VaultResult<C::Output> {
        self.send(contract, endpoint, Method::GET, RequestBody::Empty, options)
            .await
    }

    /// Authenticated write. Defaults to POST.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthenticated`] before login, [`VaultError::Cancelled`]
    /// when the signal fires, otherwise any request or validation error.
    #[instrument(skip(self, contract, body, options))]
    pub async fn write<C: Contract>(
        &self,
        contract: &C,
        endpoint: &str,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> VaultResult<C::Output> {
        self.send(contract, endpoint, Method::POST, body.into(), options)
            .await
    }

    async fn send<C: Contract>(
        &self,
        contract: &C,
        endpoint: &str,
        default_method: Method,
        body: RequestBody,
        options: RequestOptions,
    ) -> VaultResult<C::Output> {
        let token = self.inner.current_token().await?;
        let request = Request::new(options.method.unwrap_or(default_method), endpoint)
            .token(&token)
            .body(body)
            .wrap_ttl(options.wrap_ttl);
        self.inner
            .fetcher
            .fetch(contract, request, options.signal.as_ref())
            .await
    }

    /// Arm the renewal scheduler from the current lease.
    ///
    /// Returns `false` when there is nothing to renew: no token, a
    /// non-renewable token, no accessor, or a zero lease.
    pub async fn start_renewal(&self) -> bool {
        let lease_duration = {
            let state = self.inner.state.read().await;
            let schedulable = state.token.is_some()
                && state.renewable
                && state.accessor.is_some()
                && state.lease_duration > 0;
            if !schedulable {
                return false;
            }
            state.lease_duration
        };
        self.arm(lease_duration);
        true
    }

    /// Disarm the renewal scheduler, keeping the session logged in.
    pub fn stop_renewal(&self) {
        self.inner.renewal.disarm();
    }

    /// Current scheduler state.
    #[must_use]
    pub fn renewal_state(&self) -> RenewalState {
        self.inner.renewal.state()
    }

    /// Whether a token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.token.is_some()
    }

    /// The session token.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner.state.read().await.token.clone()
    }

    /// Accessor of the session token, when known.
    pub async fn accessor(&self) -> Option<String> {
        self.inner.state.read().await.accessor.clone()
    }

    /// Lease duration in seconds at the last login or renewal.
    pub async fn lease_duration(&self) -> u64 {
        self.inner.state.read().await.lease_duration
    }

    /// Whether the token can be revoked (service tokens only).
    pub async fn is_revocable(&self) -> bool {
        self.inner.state.read().await.revocable
    }

    pub(crate) fn inner(&self) -> &Inner {
        &self.inner
    }

    fn arm(&self, lease_duration: u64) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.renewal.arm(weak, lease_duration);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.renewal.disarm();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.inner.config.address)
            .field("kind", &self.inner.config.credentials.kind())
            .field("renewal", &self.inner.renewal.state())
            .finish_non_exhaustive()
    }
}

pub(crate) fn token_create_endpoint(role: Option<&str>) -> String {
    match role {
        Some(role) => format!("auth/token/create/{role}"),
        None => "auth/token/create".to_string(),
    }
}
