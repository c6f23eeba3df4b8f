//! JSON bodies as the Vault API returns them.

use serde_json::{Value, json};

/// Fixed timestamp used in wrapping fixtures.
pub const CREATION_TIME: &str = "2024-05-01T10:00:00.123456789Z";

/// Lease fields of an `auth` block.
#[derive(Debug, Clone)]
pub struct AuthFixture {
    /// Issued token
    pub client_token: String,
    /// Token accessor
    pub accessor: String,
    /// Lease duration in seconds
    pub lease_duration: u64,
    /// Whether the lease is renewable
    pub renewable: bool,
    /// `service` or `batch`
    pub token_type: String,
}

impl AuthFixture {
    /// A renewable service token with the given lease.
    #[must_use]
    pub fn service(lease_duration: u64) -> Self {
        Self {
            client_token: "hvs.session-token".to_string(),
            accessor: "accessor-1".to_string(),
            lease_duration,
            renewable: true,
            token_type: "service".to_string(),
        }
    }

    /// A non-renewable batch token without accessor.
    #[must_use]
    pub fn batch(lease_duration: u64) -> Self {
        Self {
            client_token: "hvb.batch-token".to_string(),
            accessor: String::new(),
            lease_duration,
            renewable: false,
            token_type: "batch".to_string(),
        }
    }

    /// Override the token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.client_token = token.into();
        self
    }

    /// Override the accessor.
    #[must_use]
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self
    }

    /// Override renewability.
    #[must_use]
    pub const fn with_renewable(mut self, renewable: bool) -> Self {
        self.renewable = renewable;
        self
    }

    /// Login/renew/create response body.
    #[must_use]
    pub fn auth_body(&self) -> Value {
        json!({
            "request_id": "req-1",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 0,
            "data": null,
            "wrap_info": null,
            "auth": {
                "client_token": self.client_token,
                "accessor": self.accessor,
                "policies": ["default"],
                "token_policies": ["default"],
                "lease_duration": self.lease_duration,
                "renewable": self.renewable,
                "token_type": self.token_type,
            }
        })
    }

    /// `lookup-self` response body for the same token.
    #[must_use]
    pub fn lookup_body(&self) -> Value {
        json!({
            "request_id": "req-2",
            "data": {
                "accessor": self.accessor,
                "display_name": "token",
                "policies": ["default"],
                "renewable": self.renewable,
                "ttl": self.lease_duration,
                "type": self.token_type,
            }
        })
    }
}

/// Response body of a write made with a wrap TTL.
#[must_use]
pub fn wrapped_body(wrapping_token: &str, creation_path: &str, ttl: u64) -> Value {
    json!({
        "request_id": "",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "wrap_info": {
            "token": wrapping_token,
            "accessor": "wrap-accessor",
            "ttl": ttl,
            "creation_time": CREATION_TIME,
            "creation_path": creation_path,
            "wrapped_accessor": "",
        }
    })
}

/// `sys/wrapping/lookup` response body.
#[must_use]
pub fn wrapping_lookup_body(creation_path: &str) -> Value {
    json!({
        "request_id": "req-3",
        "data": {
            "creation_path": creation_path,
            "creation_time": CREATION_TIME,
            "creation_ttl": 30,
        }
    })
}

/// Standard Vault error body.
#[must_use]
pub fn error_body(messages: &[&str]) -> Value {
    json!({ "errors": messages })
}
