//! Credential exchange, one strategy per credential kind.

use crate::{
    config::AuthMethod,
    contract::Json,
    error::VaultResult,
    fetch::{Request, RequestBody},
    responses::{AuthResponse, Lease},
    session::Inner,
};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct AppRoleLogin<'a> {
    role_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_id: Option<&'a str>,
}

/// Exchange the session's credentials for a token and its lease.
///
/// Nothing is written to the session here; the caller commits the result.
pub(crate) async fn authenticate(inner: &Inner) -> VaultResult<(SecretString, Lease)> {
    match &inner.config.credentials.method {
        AuthMethod::Token { token } => {
            debug!("Looking up provided token");
            let lookup = inner.lookup_with(token, None, None).await?;
            Ok((token.clone(), Lease::from(&lookup.data)))
        }
        AuthMethod::AppRole {
            mountpoint,
            role_id,
            secret_id,
        } => {
            debug!(mountpoint = %mountpoint, "Logging in with AppRole");
            let endpoint = format!("{mountpoint}/login");
            let body = RequestBody::json(&AppRoleLogin {
                role_id,
                secret_id: secret_id.as_ref().map(|s| s.expose_secret()),
            })?;
            let response = inner
                .fetcher
                .fetch(
                    &Json::<AuthResponse>::new(),
                    Request::new(Method::POST, &endpoint).body(body),
                    None,
                )
                .await?;
            let lease = Lease::from(&response.auth);
            Ok((response.auth.client_token, lease))
        }
    }
}
