//! Wire types for the token, AppRole and wrapping endpoints.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Token type that can be tracked and revoked through its accessor.
pub const SERVICE_TOKEN_TYPE: &str = "service";

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Generic `{ "data": ... }` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Data<T> {
    /// Payload
    pub data: T,
}

/// Login, renew and token-create response.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    /// Auth block
    pub auth: AuthData,
}

/// Token material returned in an `auth` block.
#[derive(Debug, Deserialize)]
pub struct AuthData {
    /// The issued token; empty when renewing by accessor
    #[serde(default = "empty_secret", deserialize_with = "secret")]
    pub client_token: SecretString,
    /// Token accessor
    #[serde(default)]
    pub accessor: String,
    /// Attached policies
    #[serde(default)]
    pub policies: Vec<String>,
    /// Lease duration in seconds
    #[serde(default)]
    pub lease_duration: u64,
    /// Whether the lease can be renewed
    #[serde(default)]
    pub renewable: bool,
    /// `service` or `batch`
    #[serde(default)]
    pub token_type: Option<String>,
}

/// `data` block of a token lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenLookup {
    /// Token accessor; empty for batch tokens
    #[serde(default)]
    pub accessor: String,
    /// Whether the token is renewable
    #[serde(default)]
    pub renewable: bool,
    /// Remaining time to live in seconds
    #[serde(default)]
    pub ttl: u64,
    /// `service` or `batch`
    #[serde(rename = "type", default)]
    pub token_type: Option<String>,
    /// Attached policies
    #[serde(default)]
    pub policies: Vec<String>,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Lookup response.
pub type LookupResponse = Data<TokenLookup>;

/// Lease metadata produced by every login, renew and issue call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Token accessor, absent when the service returned none
    pub accessor: Option<String>,
    /// Remaining validity in seconds; 0 means non-leased
    pub lease_duration: u64,
    /// Whether the lease can be renewed
    pub renewable: bool,
    /// `service` or `batch`
    pub token_type: Option<String>,
}

impl Lease {
    /// Only service tokens can be revoked and looked up by accessor.
    #[must_use]
    pub fn is_revocable(&self) -> bool {
        self.token_type.as_deref() == Some(SERVICE_TOKEN_TYPE)
    }

    /// Whether the renewal scheduler has anything to do with this lease.
    #[must_use]
    pub const fn is_schedulable(&self) -> bool {
        self.renewable && self.accessor.is_some() && self.lease_duration > 0
    }
}

impl From<&AuthData> for Lease {
    fn from(auth: &AuthData) -> Self {
        Self {
            accessor: non_empty(&auth.accessor),
            lease_duration: auth.lease_duration,
            renewable: auth.renewable,
            token_type: auth.token_type.clone(),
        }
    }
}

impl From<&TokenLookup> for Lease {
    fn from(lookup: &TokenLookup) -> Self {
        Self {
            accessor: non_empty(&lookup.accessor),
            lease_duration: lookup.ttl,
            renewable: lookup.renewable,
            token_type: lookup.token_type.clone(),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Result of a token renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renewal {
    /// Accessor of the renewed token
    pub accessor: String,
    /// New lease duration in seconds
    pub lease_duration: u64,
}

/// A newly issued child token.
#[derive(Debug)]
pub struct IssuedToken {
    /// The token itself
    pub client_token: SecretString,
    /// Its accessor
    pub accessor: String,
    /// Lease duration in seconds
    pub lease_duration: u64,
}

/// Options for `auth/token/create`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenRequest {
    /// Policies to attach
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
    /// Initial TTL, e.g. `1h`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    /// Hard upper bound on the TTL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit_max_ttl: Option<String>,
    /// Whether the token may be renewed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewable: Option<bool>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Maximum number of uses; 0 is unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_uses: Option<u32>,
    /// Create an orphan token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_parent: Option<bool>,
    /// Arbitrary metadata
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
}

/// Response-wrapping envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WrapInfo {
    /// Single-use wrapping token
    #[serde(deserialize_with = "secret")]
    pub token: SecretString,
    /// Accessor of the wrapping token
    #[serde(default)]
    pub accessor: String,
    /// Seconds until the wrapping token expires
    pub ttl: u64,
    /// When the envelope was created
    pub creation_time: DateTime<Utc>,
    /// Endpoint that produced the wrapped response
    pub creation_path: String,
    /// Accessor of the wrapped token, when a token was wrapped
    #[serde(default)]
    pub wrapped_accessor: Option<String>,
}

/// Response to a write made with a wrap TTL.
#[derive(Debug, Clone, Deserialize)]
pub struct WrappedResponse {
    /// Request id
    #[serde(default)]
    pub request_id: String,
    /// Lease id, usually empty
    #[serde(default)]
    pub lease_id: String,
    /// Lease duration in seconds
    #[serde(default)]
    pub lease_duration: u64,
    /// Whether the lease is renewable
    #[serde(default)]
    pub renewable: bool,
    /// The envelope
    pub wrap_info: WrapInfo,
}

/// `data` block of `sys/wrapping/lookup`.
#[derive(Debug, Clone, Deserialize)]
pub struct WrappingLookup {
    /// Endpoint that produced the wrapped response
    pub creation_path: String,
    /// When the envelope was created
    pub creation_time: DateTime<Utc>,
    /// Original TTL in seconds
    pub creation_ttl: u64,
}
