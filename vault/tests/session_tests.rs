//! Session behaviour against a mock Vault server.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use test_utils::{MockVault, fixtures::{AuthFixture, error_body}};
use vault_session::{
    CancellationToken, Credentials, Json, LogoutOptions, NoContent, RenewalState, RequestOptions,
    Session, SessionConfig, TokenRequest, VaultError,
};
use wiremock::ResponseTemplate;

const SESSION_TOKEN: &str = "hvs.session-token";

fn approle_session(vault: &MockVault, revoke_on_logout: bool) -> Session {
    let credentials = Credentials::approle("role-1", Some("secret-1".to_string()))
        .with_revoke_on_logout(revoke_on_logout);
    Session::new(SessionConfig::new(vault.uri(), credentials)).unwrap()
}

async fn logged_in(vault: &MockVault) -> Session {
    vault
        .mount_approle_login("auth/approle", &AuthFixture::service(3600))
        .await;
    let session = approle_session(vault, false);
    session.login().await.unwrap();
    session
}

fn header<'a>(request: &'a wiremock::Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_approle_login_arms_renewal() {
    let vault = MockVault::start().await;
    vault
        .mount_approle_login("auth/approle", &AuthFixture::service(3600))
        .await;
    let session = approle_session(&vault, false);

    let lease = session.login().await.unwrap();

    assert_eq!(lease.lease_duration, 3600);
    assert!(session.is_authenticated().await);
    assert!(session.is_revocable().await);
    assert_eq!(session.accessor().await.as_deref(), Some("accessor-1"));
    assert_eq!(
        session.renewal_state(),
        RenewalState::Armed {
            delay: Duration::from_secs(2880)
        }
    );

    let logins = vault.requests_to("POST", "auth/approle/login").await;
    assert_eq!(logins.len(), 1);
    let body: Value = serde_json::from_slice(&logins[0].body).unwrap();
    assert_eq!(body, json!({ "role_id": "role-1", "secret_id": "secret-1" }));
    assert!(header(&logins[0], "X-Vault-Token").is_none());
}

#[tokio::test]
async fn test_approle_login_without_secret_id_on_custom_mount() {
    let vault = MockVault::start().await;
    vault
        .mount_approle_login("auth/ci", &AuthFixture::service(60))
        .await;
    let credentials = Credentials::approle("role-1", None).with_mountpoint("auth/ci");
    let session = Session::new(SessionConfig::new(vault.uri(), credentials)).unwrap();

    session.login().await.unwrap();

    let logins = vault.requests_to("POST", "auth/ci/login").await;
    let body: Value = serde_json::from_slice(&logins[0].body).unwrap();
    assert_eq!(body, json!({ "role_id": "role-1" }));
}

#[tokio::test]
async fn test_token_login_non_renewable_never_arms() {
    let vault = MockVault::start().await;
    let fixture = AuthFixture::service(3600)
        .with_token("hvs.static")
        .with_renewable(false);
    vault.mount_lookup_self(&fixture).await;
    let session =
        Session::new(SessionConfig::new(vault.uri(), Credentials::token("hvs.static"))).unwrap();

    let lease = session.login().await.unwrap();

    assert!(!lease.renewable);
    assert_eq!(session.lease_duration().await, 3600);
    assert_eq!(session.accessor().await.as_deref(), Some("accessor-1"));
    assert_eq!(session.renewal_state(), RenewalState::Idle);
}

#[tokio::test]
async fn test_login_sends_namespace_with_trailing_slash() {
    let vault = MockVault::start().await;
    vault
        .mount_approle_login("auth/approle", &AuthFixture::service(3600))
        .await;
    let config = SessionConfig::new(vault.uri(), Credentials::approle("role-1", None))
        .with_namespace("team-a");
    let session = Session::new(config).unwrap();

    session.login().await.unwrap();

    let logins = vault.requests_to("POST", "auth/approle/login").await;
    assert_eq!(header(&logins[0], "X-Vault-Namespace"), Some("team-a/"));
}

#[tokio::test]
async fn test_blank_namespace_sends_no_header() {
    let vault = MockVault::start().await;
    vault
        .mount_approle_login("auth/approle", &AuthFixture::service(3600))
        .await;
    let config = SessionConfig::new(vault.uri(), Credentials::approle("role-1", None))
        .with_namespace("/");
    let session = Session::new(config).unwrap();

    session.login().await.unwrap();

    let logins = vault.requests_to("POST", "auth/approle/login").await;
    assert!(header(&logins[0], "X-Vault-Namespace").is_none());
}

#[tokio::test]
async fn test_unreachable_server_is_retryable_platform_error() {
    let config = SessionConfig::new("http://127.0.0.1:1", Credentials::approle("role-1", None));
    let session = Session::new(config).unwrap();

    let err = session.login().await.unwrap_err();

    assert!(
        matches!(err, VaultError::Platform(rust_common::PlatformError::Unavailable(_))),
        "unexpected error: {err:?}"
    );
    assert!(err.is_retryable());
    assert!(!session.is_authenticated().await);
}

#[tokio::test]
async fn test_failed_login_keeps_previous_state() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;

    vault.server().reset().await;
    vault
        .mount(
            "POST",
            "auth/approle/login",
            ResponseTemplate::new(400).set_body_json(error_body(&["invalid secret id"])),
        )
        .await;

    let err = session.login().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.service_errors(), vec!["invalid secret id"]);
    assert!(session.is_authenticated().await);
    assert_eq!(session.lease_duration().await, 3600);
    assert_eq!(session.accessor().await.as_deref(), Some("accessor-1"));
}

#[tokio::test]
async fn test_operations_before_login_never_hit_network() {
    let vault = MockVault::start().await;
    let session = approle_session(&vault, true);

    let err = session
        .read(&Json::<Value>::new(), "secret/data/app", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Unauthenticated));
    assert!(matches!(
        session.lookup(None, None).await,
        Err(VaultError::Unauthenticated)
    ));
    assert!(matches!(
        session.issue_token(None, &TokenRequest::default(), None).await,
        Err(VaultError::Unauthenticated)
    ));

    assert!(vault.requests().await.is_empty());
}

#[tokio::test]
async fn test_read_attaches_token_without_content_type() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount(
            "GET",
            "secret/data/app",
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "data": { "password": "p" } } })),
        )
        .await;

    let body: Value = session
        .read(&Json::new(), "secret/data/app", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(body["data"]["data"]["password"], "p");
    let reads = vault.requests_to("GET", "secret/data/app").await;
    assert_eq!(header(&reads[0], "X-Vault-Token"), Some(SESSION_TOKEN));
    assert!(header(&reads[0], "Content-Type").is_none());
}

#[tokio::test]
async fn test_write_serializes_json_body() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount("POST", "secret/data/app", ResponseTemplate::new(200).set_body_json(json!({ "data": { "version": 2 } })))
        .await;

    let body: Value = session
        .write(
            &Json::new(),
            "secret/data/app",
            json!({ "data": { "password": "p" } }),
            RequestOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(body["data"]["version"], 2);
    let writes = vault.requests_to("POST", "secret/data/app").await;
    assert_eq!(header(&writes[0], "Content-Type"), Some("application/json"));
    let sent: Value = serde_json::from_slice(&writes[0].body).unwrap();
    assert_eq!(sent, json!({ "data": { "password": "p" } }));
}

#[tokio::test]
async fn test_write_sends_raw_body_verbatim_and_honours_method() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount("PUT", "sys/policy/app", ResponseTemplate::new(204))
        .await;

    let raw = r#"{"policy":"path \"secret/*\" { capabilities = [\"read\"] }"}"#.to_string();
    session
        .write(
            &NoContent,
            "sys/policy/app",
            raw.clone(),
            RequestOptions::default().method(reqwest::Method::PUT),
        )
        .await
        .unwrap();

    let writes = vault.requests_to("PUT", "sys/policy/app").await;
    assert_eq!(writes[0].body, raw.into_bytes());
}

#[tokio::test]
async fn test_list_method() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount("LIST", "secret/metadata", ResponseTemplate::new(200).set_body_json(json!({ "data": { "keys": ["a", "b"] } })))
        .await;

    let body: Value = session
        .read(&Json::new(), "secret/metadata", RequestOptions::default().list())
        .await
        .unwrap();

    assert_eq!(body["data"]["keys"], json!(["a", "b"]));
}

#[tokio::test]
async fn test_no_content_requires_204() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount("POST", "secret/plain", ResponseTemplate::new(200).set_body_json(json!({})))
        .await;
    vault
        .mount("DELETE", "secret/plain", ResponseTemplate::new(204))
        .await;

    let err = session
        .write(&NoContent, "secret/plain", json!({ "a": 1 }), RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::OK));

    session
        .read(
            &NoContent,
            "secret/plain",
            RequestOptions::default().method(reqwest::Method::DELETE),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_http_error_carries_status_path_and_body() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount("GET", "secret/missing", ResponseTemplate::new(404).set_body_json(error_body(&[])))
        .await;

    let err = session
        .read(&Json::<Value>::new(), "secret/missing", RequestOptions::default())
        .await
        .unwrap_err();

    let VaultError::Http { status, path, body } = err else {
        panic!("expected HTTP error, got {err:?}");
    };
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(path, "/v1/secret/missing");
    assert_eq!(body, Some(json!({ "errors": [] })));
}

#[tokio::test]
async fn test_contract_mismatch_is_validation_error() {
    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Creds {
        username: String,
    }

    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount("GET", "database/creds/app", ResponseTemplate::new(200).set_body_json(json!({ "user": "x" })))
        .await;

    let err = session
        .read(&Json::<Creds>::new(), "database/creds/app", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, VaultError::Validation { path, .. } if path == "/v1/database/creds/app"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_cancelled_signal_fails_without_request() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    let signal = CancellationToken::new();
    signal.cancel();

    let err = session
        .write(
            &NoContent,
            "secret/data/app",
            json!({}),
            RequestOptions::default().signal(signal),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::Cancelled));
    assert_eq!(vault.count("POST", "secret/data/app").await, 0);
}

#[tokio::test]
async fn test_cancel_mid_flight_leaves_state_untouched() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount_renew_self(
            ResponseTemplate::new(200)
                .set_body_json(AuthFixture::service(9999).auth_body())
                .set_delay(Duration::from_secs(5)),
        )
        .await;

    let signal = CancellationToken::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = session.renew_token(None, Some(&signal)).await.unwrap_err();

    assert!(matches!(err, VaultError::Cancelled));
    assert_eq!(session.lease_duration().await, 3600);
}

#[tokio::test]
async fn test_lookup_self_and_by_accessor() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount_lookup_self(&AuthFixture::service(1800))
        .await;
    vault
        .mount(
            "POST",
            "auth/token/lookup-accessor",
            ResponseTemplate::new(200).set_body_json(AuthFixture::batch(60).lookup_body()),
        )
        .await;

    let own = session.lookup(None, None).await.unwrap();
    assert_eq!(own.data.ttl, 1800);
    assert_eq!(own.data.token_type.as_deref(), Some("service"));

    let other = session.lookup(Some("other-accessor"), None).await.unwrap();
    assert_eq!(other.data.token_type.as_deref(), Some("batch"));
    let lookups = vault.requests_to("POST", "auth/token/lookup-accessor").await;
    let body: Value = serde_json::from_slice(&lookups[0].body).unwrap();
    assert_eq!(body, json!({ "accessor": "other-accessor" }));
}

#[tokio::test]
async fn test_renew_self_updates_session() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount_renew_self(
            ResponseTemplate::new(200)
                .set_body_json(AuthFixture::service(7200).with_accessor("accessor-2").auth_body()),
        )
        .await;

    let renewal = session.renew_token(None, None).await.unwrap();

    assert_eq!(renewal.lease_duration, 7200);
    assert_eq!(session.lease_duration().await, 7200);
    assert_eq!(session.accessor().await.as_deref(), Some("accessor-2"));
}

#[tokio::test]
async fn test_renew_by_accessor_leaves_session_alone() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount(
            "POST",
            "auth/token/renew-accessor",
            ResponseTemplate::new(200)
                .set_body_json(AuthFixture::service(60).with_token("").with_accessor("child").auth_body()),
        )
        .await;

    let renewal = session.renew_token(Some("child"), None).await.unwrap();

    assert_eq!(renewal.accessor, "child");
    assert_eq!(session.lease_duration().await, 3600);
    assert_eq!(session.accessor().await.as_deref(), Some("accessor-1"));
}

#[tokio::test]
async fn test_issue_token_for_role() {
    let vault = MockVault::start().await;
    let session = logged_in(&vault).await;
    vault
        .mount(
            "POST",
            "auth/token/create/ci",
            ResponseTemplate::new(200)
                .set_body_json(AuthFixture::service(600).with_token("hvs.child").with_accessor("child-acc").auth_body()),
        )
        .await;

    let request = TokenRequest {
        policies: vec!["deploy".to_string()],
        ttl: Some("10m".to_string()),
        ..Default::default()
    };
    let issued = session.issue_token(Some("ci"), &request, None).await.unwrap();

    assert_eq!(secrecy::ExposeSecret::expose_secret(&issued.client_token), "hvs.child");
    assert_eq!(issued.accessor, "child-acc");
    assert_eq!(issued.lease_duration, 600);
    let creates = vault.requests_to("POST", "auth/token/create/ci").await;
    let body: Value = serde_json::from_slice(&creates[0].body).unwrap();
    assert_eq!(body, json!({ "policies": ["deploy"], "ttl": "10m" }));
}

#[tokio::test]
async fn test_logout_revokes_service_token_once() {
    let vault = MockVault::start().await;
    vault
        .mount_approle_login("auth/approle", &AuthFixture::service(3600))
        .await;
    vault.mount_revoke_self(204).await;
    let session = approle_session(&vault, true);
    session.login().await.unwrap();

    session.logout(LogoutOptions::default()).await.unwrap();

    assert_eq!(vault.count("POST", "auth/token/revoke-self").await, 1);
    assert!(!session.is_authenticated().await);
    assert_eq!(session.renewal_state(), RenewalState::Idle);

    session.logout(LogoutOptions::default()).await.unwrap();
    assert_eq!(vault.count("POST", "auth/token/revoke-self").await, 1);
}

#[tokio::test]
async fn test_logout_skips_revocation_for_batch_token() {
    let vault = MockVault::start().await;
    vault
        .mount_approle_login("auth/approle", &AuthFixture::batch(600))
        .await;
    vault.mount_revoke_self(204).await;
    let session = approle_session(&vault, true);
    session.login().await.unwrap();
    assert!(!session.is_revocable().await);

    session.logout(LogoutOptions::default()).await.unwrap();

    assert_eq!(vault.count("POST", "auth/token/revoke-self").await, 0);
    assert!(!session.is_authenticated().await);
}

#[tokio::test]
async fn test_logout_revocation_failure_policy() {
    let vault = MockVault::start().await;
    vault
        .mount_approle_login("auth/approle", &AuthFixture::service(3600))
        .await;
    vault.mount_revoke_self(500).await;

    let soft = approle_session(&vault, true);
    soft.login().await.unwrap();
    soft.logout(LogoutOptions::default()).await.unwrap();
    assert!(!soft.is_authenticated().await);

    let hard = approle_session(&vault, true);
    hard.login().await.unwrap();
    let err = hard
        .logout(LogoutOptions {
            revoke_hard_fail: true,
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(!hard.is_authenticated().await);
}
