//! `reqwest` implementation of the shop REST API.

use std::sync::Arc;

use adroit_core::{ProductId, Size};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::types::{AddItemRequest, CartViewResponse, UpdateItemRequest};
use super::{CartApi, CatalogApi, CatalogProduct, RemoteCartItem};
use crate::config::StorefrontConfig;
use crate::error::CartError;

/// Characters of a response body kept in logs.
const LOG_BODY_CHARS: usize = 500;

/// Client for the shop REST API.
///
/// Cheap to clone; clones share the connection pool. A client without a token
/// can only read the catalog - cart endpoints require [`Self::with_token`].
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
    token: Option<SecretString>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new client from configuration.
    ///
    /// Picks up `auth_token` from the configuration when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, CartError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_base_url.clone(),
            }),
            token: config.auth_token.clone(),
        })
    }

    /// A client sharing this one's connection pool, authenticated with `token`.
    #[must_use]
    pub fn with_token(&self, token: SecretString) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            token: Some(token),
        }
    }

    /// A client sharing this one's connection pool, without credentials.
    #[must_use]
    pub fn anonymous(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            token: None,
        }
    }

    /// Whether requests carry a bearer token.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> Result<Url, CartError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| CartError::InvalidConfig(format!("cannot build URL for {path}: {e}")))
    }

    /// Send a request and return the body of a successful response.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, CartError> {
        let mut request = self
            .inner
            .client
            .request(method.clone(), self.url(path)?)
            .header("Accept", "application/json");

        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CartError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                %method,
                path,
                status = %status,
                body = %response_text.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(CartError::from_response(status.as_u16(), &response_text));
        }

        debug!(%method, path, status = %status, "Backend request succeeded");
        Ok(response_text)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CartError> {
        let text = self.send(Method::GET, path, None).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %text.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Failed to parse backend response"
            );
            CartError::Parse(e)
        })
    }
}

#[async_trait]
impl CartApi for BackendClient {
    #[instrument(skip(self))]
    async fn view_cart(&self) -> Result<Vec<RemoteCartItem>, CartError> {
        let response: CartViewResponse = self.get_json("cart/view").await?;
        Ok(response.into_items())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
        size: &Size,
    ) -> Result<(), CartError> {
        let body = AddItemRequest {
            quantity,
            size: size.to_string(),
        };
        self.send(
            Method::POST,
            &format!("cart/{product_id}/add"),
            Some(serde_json::to_value(body)?),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn update_item(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        let body = UpdateItemRequest { quantity };
        self.send(
            Method::PUT,
            &format!("cart/{product_id}/update"),
            Some(serde_json::to_value(body)?),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_item(&self, product_id: ProductId) -> Result<(), CartError> {
        self.send(Method::DELETE, &format!("cart/{product_id}/remove"), None)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for BackendClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<CatalogProduct>, CartError> {
        self.get_json("products").await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn get_product(&self, product_id: ProductId) -> Result<CatalogProduct, CartError> {
        self.get_json(&format!("products/{product_id}")).await
    }
}
