//! Typed endpoint surface over the request client
//!
//! Thin wrappers: build the route, move the payload through `request()`,
//! unwrap the response envelope. No business rules live here; ownership
//! and visibility are the backend's call, and a 403 comes back to the
//! caller as an ordinary failed request.

pub mod auth;
pub mod books;
pub mod users;

use serde_json::Value;
use tracing::error;

use crate::error::{ApiError, Result};

/// Pull the typed payload out of a response.
///
/// The backend wraps payloads as `{"success":true,"data":...}`; a body
/// without a `data` key is deserialized directly, which keeps the surface
/// working against deployments that answer bare.
pub(crate) fn payload<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    route: &str,
) -> Result<T> {
    let mut value = value.ok_or_else(|| {
        error!(route, "expected a response body, got none");
        ApiError::Transport(format!("empty response from {route}"))
    })?;
    if let Some(data) = value.get_mut("data") {
        value = data.take();
    }
    serde_json::from_value(value).map_err(|e| {
        error!(route, error = %e, "unexpected response shape");
        ApiError::Transport(format!("unexpected response shape from {route}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_unwraps_envelope() {
        let value = Some(json!({ "success": true, "data": { "id": "b1" } }));
        let out: serde_json::Value = payload(value, "/books/b1").unwrap();
        assert_eq!(out["id"], "b1");
    }

    #[test]
    fn payload_accepts_bare_bodies() {
        let value = Some(json!({ "id": "b1" }));
        let out: serde_json::Value = payload(value, "/books/b1").unwrap();
        assert_eq!(out["id"], "b1");
    }

    #[test]
    fn missing_body_is_a_transport_error() {
        let result: Result<serde_json::Value> = payload(None, "/books");
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[test]
    fn wrong_shape_is_a_transport_error() {
        let value = Some(json!({ "data": "just a string" }));
        let result: Result<Vec<String>> = payload(value, "/books");
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }
}
