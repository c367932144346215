//! Shop REST API client.
//!
//! # Architecture
//!
//! - The backend owns account carts - NO local authority, the client only
//!   mirrors what `cart/view` returns
//! - Plain JSON over `reqwest`, bearer token when the shopper is signed in
//! - Catalog listing cached in memory via `moka` (see [`CatalogCache`])
//!
//! # Endpoints
//!
//! - `GET cart/view`
//! - `POST cart/{id}/add` `{quantity, size}`
//! - `PUT cart/{id}/update` `{quantity}`
//! - `DELETE cart/{id}/remove`
//! - `GET products`, `GET products/{id}`
//!
//! The [`CartApi`] and [`CatalogApi`] traits are the seams the cart stores
//! depend on, so stores can be exercised against in-memory fakes.

mod catalog;
mod client;
pub mod types;

use std::sync::Arc;

use adroit_core::{ProductId, Size};
use async_trait::async_trait;

pub use catalog::CatalogCache;
pub use client::BackendClient;
pub use types::{CatalogProduct, RemoteCartItem};

use crate::error::CartError;

/// Account cart operations on the backend.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the authenticated shopper's cart.
    async fn view_cart(&self) -> Result<Vec<RemoteCartItem>, CartError>;

    /// Add a quantity of a product in a size.
    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
        size: &Size,
    ) -> Result<(), CartError>;

    /// Set the quantity of a product.
    async fn update_item(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError>;

    /// Remove a product from the cart.
    async fn remove_item(&self, product_id: ProductId) -> Result<(), CartError>;
}

/// Product catalog reads.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// List every product.
    async fn list_products(&self) -> Result<Vec<CatalogProduct>, CartError>;

    /// Fetch one product.
    async fn get_product(&self, product_id: ProductId) -> Result<CatalogProduct, CartError>;
}

/// Blanket implementation so `Arc<A>` can be passed where a `CartApi` is expected.
#[async_trait]
impl<A: CartApi + ?Sized> CartApi for Arc<A> {
    async fn view_cart(&self) -> Result<Vec<RemoteCartItem>, CartError> {
        (**self).view_cart().await
    }

    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
        size: &Size,
    ) -> Result<(), CartError> {
        (**self).add_item(product_id, quantity, size).await
    }

    async fn update_item(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        (**self).update_item(product_id, quantity).await
    }

    async fn remove_item(&self, product_id: ProductId) -> Result<(), CartError> {
        (**self).remove_item(product_id).await
    }
}
