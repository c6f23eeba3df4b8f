//! Typed response contracts.
//!
//! A contract describes what a response body must look like. The session
//! is generic over any [`Contract`]; [`Json`] covers every serde type and
//! [`NoContent`] marks calls that must answer `204 No Content`.

use serde::de::DeserializeOwned;
use std::{fmt, marker::PhantomData};

/// Expected shape of a response body.
pub trait Contract {
    /// Value produced from a valid body.
    type Output;

    /// Whether a body is expected at all. When `false`, only HTTP 204 is
    /// accepted as success.
    fn expects_body(&self) -> bool {
        true
    }

    /// Validate a JSON body and produce the typed value.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the mismatch.
    fn parse(&self, body: serde_json::Value) -> Result<Self::Output, String>;
}

/// Contract backed by a serde `Deserialize` implementation.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    /// Create the contract.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Json<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Json<T> {}

impl<T> fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Json<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> Contract for Json<T> {
    type Output = T;

    fn parse(&self, body: serde_json::Value) -> Result<T, String> {
        serde_json::from_value(body).map_err(|e| e.to_string())
    }
}

/// Contract for calls that return no body.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl Contract for NoContent {
    type Output = ();

    fn expects_body(&self) -> bool {
        false
    }

    fn parse(&self, _body: serde_json::Value) -> Result<(), String> {
        Ok(())
    }
}

/// Contract built from a closure, for ad-hoc validation.
pub struct FnContract<F>(F);

impl<F> FnContract<F> {
    /// Wrap a validation function.
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, T> Contract for FnContract<F>
where
    F: Fn(serde_json::Value) -> Result<T, String>,
{
    type Output = T;

    fn parse(&self, body: serde_json::Value) -> Result<T, String> {
        (self.0)(body)
    }
}
