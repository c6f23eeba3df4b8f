//! Authenticated Vault sessions with automatic token renewal.
//!
//! A [`Session`] exchanges long-lived credentials (a static token or an
//! AppRole pair) for a leased token, keeps the lease alive in the
//! background, and routes authenticated reads, writes and response
//! unwrapping through one request path.
//!
//! ```no_run
//! use vault_session::{Credentials, Json, LogoutOptions, RequestOptions, Session, SessionConfig};
//!
//! # async fn example() -> vault_session::VaultResult<()> {
//! let config = SessionConfig::new(
//!     "https://vault.example.com:8200",
//!     Credentials::approle("my-role", Some("my-secret".to_string())),
//! );
//! let session = Session::new(config)?;
//! session.login().await?;
//!
//! let secret: serde_json::Value = session
//!     .read(&Json::<serde_json::Value>::new(), "secret/data/app", RequestOptions::default())
//!     .await?;
//! # let _ = secret;
//!
//! session.logout(LogoutOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth;
pub mod config;
pub mod contract;
pub mod error;
pub mod fetch;
pub mod renewal;
pub mod responses;
pub mod session;
mod wrapping;

pub use config::{AuthMethod, CredentialKind, Credentials, SessionConfig};
pub use contract::{Contract, FnContract, Json, NoContent};
pub use error::{VaultError, VaultResult};
pub use fetch::{RequestBody, RequestOptions};
pub use renewal::{MAX_RENEWAL_DELAY, RenewalState, renewal_delay};
pub use responses::{
    IssuedToken, Lease, LookupResponse, Renewal, TokenRequest, WrapInfo, WrappedResponse,
    WrappingLookup,
};
pub use session::{LogoutOptions, Session};
pub use tokio_util::sync::CancellationToken;
