//! Shared test utilities for the vault-session crates.
//!
//! This crate provides:
//! - Proptest generators for tokens, accessors and leases
//! - A wiremock-backed mock Vault server
//! - JSON fixtures for the token, AppRole and wrapping endpoints

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::MockVault;
