//! Registry operations module
//!
//! Each group of Docker Registry v2 endpoints lives in its own operations
//! type; [`crate::registry::RegistryClient`] composes them.

pub mod blob_operations;
pub mod catalog_operations;
pub mod manifest_operations;

pub use blob_operations::BlobOperations;
pub use catalog_operations::CatalogOperations;
pub use manifest_operations::ManifestOperations;

use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{Result, SyncError};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Send a request, mapping transport failures onto failure kinds
pub(crate) async fn send(request: RequestBuilder, operation: &str) -> Result<Response> {
    request
        .send()
        .await
        .map_err(|e| NetworkErrorHandler::handle_network_error(&e, operation))
}

/// Turn a non-success response into an error, consuming its body
pub(crate) async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    Err(HttpErrorHandler::handle_registry_error(status, &error_text, operation))
}

/// Decode a JSON body, treating an `errors` field as a failure
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    let response = ensure_success(response, operation).await?;
    let body = response
        .bytes()
        .await
        .map_err(|e| NetworkErrorHandler::handle_network_error(&e, operation))?;

    let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        SyncError::Api(format!("Failed to parse {} response: {}", operation, e))
    })?;
    if let Some(err) = HttpErrorHandler::handle_error_payload(&value, operation) {
        return Err(err);
    }

    serde_json::from_value(value)
        .map_err(|e| SyncError::Api(format!("Unexpected {} response: {}", operation, e)))
}
