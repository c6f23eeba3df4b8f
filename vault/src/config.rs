//! Session configuration and credentials.

use crate::error::{VaultError, VaultResult};
use rust_common::HttpConfig;
use secrecy::SecretString;
use std::{fmt, str::FromStr};

/// Mountpoint of the token auth backend.
pub const TOKEN_MOUNTPOINT: &str = "auth/token";

/// Default AppRole mountpoint.
pub const DEFAULT_APPROLE_MOUNTPOINT: &str = "auth/approle";

/// Credential kind tag, as spelled in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Pre-issued token
    Token,
    /// Role identifier plus optional secret identifier
    AppRole,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => f.write_str("token"),
            Self::AppRole => f.write_str("approle"),
        }
    }
}

impl FromStr for CredentialKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "approle" => Ok(Self::AppRole),
            other => Err(VaultError::UnsupportedCredentialKind(other.to_string())),
        }
    }
}

/// How the session proves its identity at login.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// A pre-issued token, always under [`TOKEN_MOUNTPOINT`].
    Token {
        /// The token itself
        token: SecretString,
    },
    /// AppRole role/secret pair.
    AppRole {
        /// Mountpoint, e.g. `auth/approle`
        mountpoint: String,
        /// Role identifier
        role_id: String,
        /// Secret identifier; absent for secret-less bindings
        secret_id: Option<SecretString>,
    },
}

impl AuthMethod {
    /// Kind tag of this method.
    #[must_use]
    pub const fn kind(&self) -> CredentialKind {
        match self {
            Self::Token { .. } => CredentialKind::Token,
            Self::AppRole { .. } => CredentialKind::AppRole,
        }
    }

    /// Mountpoint the login goes through.
    #[must_use]
    pub fn mountpoint(&self) -> &str {
        match self {
            Self::Token { .. } => TOKEN_MOUNTPOINT,
            Self::AppRole { mountpoint, .. } => mountpoint,
        }
    }
}

/// Long-lived credentials exchanged for a session token.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Login method and its secrets
    pub method: AuthMethod,
    /// Revoke the session token on logout
    pub revoke_on_logout: bool,
}

impl Credentials {
    /// Token credentials.
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            method: AuthMethod::Token {
                token: SecretString::from(token.into()),
            },
            revoke_on_logout: false,
        }
    }

    /// AppRole credentials on the default mountpoint.
    #[must_use]
    pub fn approle(role_id: impl Into<String>, secret_id: Option<String>) -> Self {
        Self {
            method: AuthMethod::AppRole {
                mountpoint: DEFAULT_APPROLE_MOUNTPOINT.to_string(),
                role_id: role_id.into(),
                secret_id: secret_id.map(SecretString::from),
            },
            revoke_on_logout: false,
        }
    }

    /// Override the AppRole mountpoint. Token credentials ignore this.
    #[must_use]
    pub fn with_mountpoint(mut self, mount: impl Into<String>) -> Self {
        if let AuthMethod::AppRole { mountpoint, .. } = &mut self.method {
            *mountpoint = mount.into().trim_matches('/').to_string();
        }
        self
    }

    /// Set whether logout revokes the token.
    #[must_use]
    pub const fn with_revoke_on_logout(mut self, revoke: bool) -> Self {
        self.revoke_on_logout = revoke;
        self
    }

    /// Kind tag of these credentials.
    #[must_use]
    pub const fn kind(&self) -> CredentialKind {
        self.method.kind()
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Service address, e.g. `https://vault.example.com:8200`
    pub address: String,
    /// Namespace sent as `X-Vault-Namespace`
    pub namespace: Option<String>,
    /// Credentials used at login
    pub credentials: Credentials,
    /// Arm the renewal scheduler automatically after login
    pub auto_renew: bool,
    /// HTTP client settings
    pub http: HttpConfig,
}

impl SessionConfig {
    /// Create a configuration with automatic renewal enabled.
    #[must_use]
    pub fn new(address: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            address: address.into().trim_end_matches('/').to_string(),
            namespace: None,
            credentials,
            auto_renew: true,
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`SessionConfig::from_lookup`].
    pub fn from_env() -> VaultResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// Reads `VAULT_ADDR`, `VAULT_NAMESPACE`, `VAULT_AUTH_METHOD`,
    /// `VAULT_TOKEN`, `VAULT_ROLE_ID`, `VAULT_SECRET_ID`, `VAULT_AUTH_MOUNT`,
    /// `VAULT_AUTO_RENEW`, `VAULT_REVOKE_ON_LOGOUT` and `VAULT_SKIP_VERIFY`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] for missing or malformed values
    /// and [`VaultError::UnsupportedCredentialKind`] for an unknown
    /// `VAULT_AUTH_METHOD`.
    pub fn from_lookup<F>(lookup: F) -> VaultResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| VaultError::InvalidConfig(format!("{key} is not set")))
        };

        let address = require("VAULT_ADDR")?;
        let kind = match get("VAULT_AUTH_METHOD") {
            Some(kind) => kind.parse()?,
            None if get("VAULT_ROLE_ID").is_some() => CredentialKind::AppRole,
            None => CredentialKind::Token,
        };

        let credentials = match kind {
            CredentialKind::Token => Credentials::token(require("VAULT_TOKEN")?),
            CredentialKind::AppRole => {
                let creds = Credentials::approle(require("VAULT_ROLE_ID")?, get("VAULT_SECRET_ID"));
                match get("VAULT_AUTH_MOUNT") {
                    Some(mount) => creds.with_mountpoint(mount),
                    None => creds,
                }
            }
        };
        let credentials = credentials
            .with_revoke_on_logout(parse_flag("VAULT_REVOKE_ON_LOGOUT", get("VAULT_REVOKE_ON_LOGOUT"), false)?);

        let skip_verify = parse_flag("VAULT_SKIP_VERIFY", get("VAULT_SKIP_VERIFY"), false)?;
        let mut config = Self::new(address, credentials)
            .with_auto_renew(parse_flag("VAULT_AUTO_RENEW", get("VAULT_AUTO_RENEW"), true)?);
        config.http = config.http.with_accept_invalid_certs(skip_verify);
        if let Some(namespace) = get("VAULT_NAMESPACE") {
            config = config.with_namespace(namespace);
        }
        Ok(config)
    }

    /// Set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Enable or disable automatic renewal after login.
    #[must_use]
    pub const fn with_auto_renew(mut self, auto_renew: bool) -> Self {
        self.auto_renew = auto_renew;
        self
    }

    /// Replace the HTTP client settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Namespace header value, always with a trailing slash. A blank
    /// namespace (or a bare `/`) sends no header.
    #[must_use]
    pub fn namespace_header(&self) -> Option<String> {
        self.namespace
            .as_deref()
            .map(|ns| ns.trim().trim_matches('/'))
            .filter(|ns| !ns.is_empty())
            .map(|ns| format!("{ns}/"))
    }
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> VaultResult<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(VaultError::InvalidConfig(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}
