//! Unified error handling with Sentry integration.
//!
//! Provides a unified `CartError` type for every remote and storage failure in
//! the cart subsystem. Local precondition violations (non-numeric product ids,
//! quantities below 1) are not errors; they surface as skipped outcomes.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised by cart stores and the backend client.
#[derive(Debug, Error)]
pub enum CartError {
    /// Network or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    ///
    /// `message` is the backend's own `{"message": ...}` text, if it sent one.
    #[error("Backend error: {status} - {}", .message.as_deref().unwrap_or("no message"))]
    Backend {
        status: u16,
        message: Option<String>,
    },

    /// Backend rate limited the request.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response or stored value could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Client was built with an unusable base URL or token.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl CartError {
    /// Build a backend error from a status code and raw response body.
    ///
    /// Keeps the backend's `{"message": ...}` field when present. Other bodies
    /// (HTML error pages, plain text) are left to the caller's logs.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(str::to_owned));
        Self::Backend { status, message }
    }

    /// Message suitable for showing to the shopper.
    ///
    /// Backend-provided messages are passed through; everything else falls
    /// back to the operation's generic message.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Backend {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Capture this error to Sentry and log it.
    ///
    /// Client-side 4xx responses are logged at warn level only.
    pub fn report(&self, operation: &str) {
        match self {
            Self::Backend { status, .. } if *status < 500 => {
                tracing::warn!(error = %self, operation, "Cart operation rejected");
            }
            _ => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    operation,
                    sentry_event_id = %event_id,
                    "Cart operation failed"
                );
            }
        }
    }
}

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
