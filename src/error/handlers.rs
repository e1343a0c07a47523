//! Standardized classification of registry failures

use crate::error::SyncError;
use reqwest::StatusCode;
use serde_json::Value;

/// Maps HTTP statuses and registry error payloads onto failure kinds
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Classify a non-success response status
    pub fn handle_registry_error(status: StatusCode, error_text: &str, operation: &str) -> SyncError {
        let detail = Self::trim_body(error_text);
        match status.as_u16() {
            404 => SyncError::NotFound(format!("{} returned 404: {}", operation, detail)),
            408 | 504 => SyncError::Transient(format!("{} timed out (status {})", operation, status)),
            429 => SyncError::Transient(format!("Rate limited during {}: {}", operation, detail)),
            502 | 503 => SyncError::Transient(format!(
                "Registry unavailable for {} (status {}): {}",
                operation, status, detail
            )),
            401 => SyncError::Api(format!("Unauthorized to perform {}: {}", operation, detail)),
            403 => SyncError::Api(format!(
                "Forbidden: insufficient permissions for {}: {}",
                operation, detail
            )),
            500 => SyncError::Api(format!("Registry server error during {}: {}", operation, detail)),
            _ => SyncError::Api(format!("{} failed (status {}): {}", operation, status, detail)),
        }
    }

    /// Inspect a decoded body for an `errors` field.
    ///
    /// Registries report unknown names, manifests and blobs with `*_UNKNOWN`
    /// codes; a payload made only of those is a not-found condition.
    pub fn handle_error_payload(body: &Value, operation: &str) -> Option<SyncError> {
        let errors = body.get("errors")?;
        let codes: Vec<&str> = errors
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("code").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        let message = if codes.is_empty() {
            format!("{} returned an error payload: {}", operation, errors)
        } else {
            format!("{} returned errors: {}", operation, codes.join(", "))
        };

        if !codes.is_empty() && codes.iter().all(|code| code.ends_with("_UNKNOWN")) {
            Some(SyncError::NotFound(message))
        } else {
            Some(SyncError::Api(message))
        }
    }

    fn trim_body(text: &str) -> &str {
        let text = text.trim();
        match text.char_indices().nth(200) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }
}

/// Network error categorization
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Transport level failures are transient; decoding and builder
    /// failures are reported as API errors.
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> SyncError {
        if error.is_timeout() {
            SyncError::Transient(format!("{} timeout: {}", context, error))
        } else if error.is_connect() {
            SyncError::Transient(format!("Connection error during {}: {}", context, error))
        } else if error.is_request() || error.is_body() {
            SyncError::Transient(format!("{} network error: {}", context, error))
        } else if error.is_decode() {
            SyncError::Api(format!("Malformed response during {}: {}", context, error))
        } else if let Some(status) = error.status() {
            HttpErrorHandler::handle_registry_error(status, &error.to_string(), context)
        } else {
            SyncError::Api(format!("{} failed: {}", context, error))
        }
    }
}
