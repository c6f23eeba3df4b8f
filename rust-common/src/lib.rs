//! Cross-cutting concerns shared by the vault-session crates.
//!
//! This crate provides:
//! - Transport error types with retryability classification
//! - HTTP client configuration and building
//! - Tracing subscriber setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod tracing_config;

pub use error::PlatformError;
pub use http::{HttpConfig, build_http_client};
pub use tracing_config::{TracingConfig, init_tracing, try_init_tracing};
