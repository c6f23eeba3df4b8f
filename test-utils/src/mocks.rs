//! Mock Vault server for testing.
//!
//! Wraps a wiremock [`MockServer`] with helpers that mount canned
//! responses on the token, AppRole and wrapping endpoints.

use crate::fixtures::AuthFixture;
use wiremock::{
    Mock, MockServer, Request, ResponseTemplate,
    matchers::{header, method, path},
};

/// Token header the mock expects on authenticated calls.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// Mock Vault server.
pub struct MockVault {
    server: MockServer,
}

impl MockVault {
    /// Start a new mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base address of the server.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Underlying wiremock server, for custom mocks.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// Mount `response` for `http_method` on `/v1/<endpoint>`.
    pub async fn mount(&self, http_method: &str, endpoint: &str, response: ResponseTemplate) {
        Mock::given(method(http_method))
            .and(path(format!("/v1/{endpoint}")))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Mount `response` to be served only once, ahead of later mounts.
    pub async fn mount_once(&self, http_method: &str, endpoint: &str, response: ResponseTemplate) {
        Mock::given(method(http_method))
            .and(path(format!("/v1/{endpoint}")))
            .respond_with(response)
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// AppRole login on `mount` returning `auth`.
    pub async fn mount_approle_login(&self, mount: &str, auth: &AuthFixture) {
        self.mount(
            "POST",
            &format!("{mount}/login"),
            ResponseTemplate::new(200).set_body_json(auth.auth_body()),
        )
        .await;
    }

    /// `lookup-self` answering only for `auth.client_token`.
    pub async fn mount_lookup_self(&self, auth: &AuthFixture) {
        Mock::given(method("GET"))
            .and(path("/v1/auth/token/lookup-self"))
            .and(header(TOKEN_HEADER, auth.client_token.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth.lookup_body()))
            .mount(&self.server)
            .await;
    }

    /// `renew-self` responding with `response`.
    pub async fn mount_renew_self(&self, response: ResponseTemplate) {
        self.mount("POST", "auth/token/renew-self", response).await;
    }

    /// `revoke-self` responding with `status`.
    pub async fn mount_revoke_self(&self, status: u16) {
        self.mount("POST", "auth/token/revoke-self", ResponseTemplate::new(status))
            .await;
    }

    /// All requests received so far.
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Requests received for `http_method` on `/v1/<endpoint>`.
    pub async fn requests_to(&self, http_method: &str, endpoint: &str) -> Vec<Request> {
        let expected = format!("/v1/{endpoint}");
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == expected)
            .collect()
    }

    /// Number of requests received for `http_method` on `/v1/<endpoint>`.
    pub async fn count(&self, http_method: &str, endpoint: &str) -> usize {
        self.requests_to(http_method, endpoint).await.len()
    }
}
