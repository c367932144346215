//! Account cart owned by the backend.

use std::sync::Arc;

use adroit_core::{Cart, CartLine, ProductId};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::instrument;

use super::{CartMode, CartRepository, ClearReport, LineOutcome, distinct_products};
use crate::api::{CartApi, RemoteCartItem};
use crate::error::CartError;
use crate::storage::{self, KeyValueStorage, keys};

/// Account cart repository over a [`CartApi`].
///
/// Optionally keeps a snapshot of the last fetched cart in local storage so a
/// new session can show something before its first round-trip.
#[derive(Clone)]
pub struct RemoteCartStore {
    api: Arc<dyn CartApi>,
    snapshot: Option<Arc<dyn KeyValueStorage>>,
}

impl RemoteCartStore {
    /// Create a store over `api`.
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>) -> Self {
        Self {
            api,
            snapshot: None,
        }
    }

    /// Write every successful fetch to [`keys::CACHED_CART`].
    #[must_use]
    pub fn with_snapshot(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.snapshot = Some(storage);
        self
    }

    /// The last snapshot written by [`CartRepository::fetch`], or an empty cart.
    #[must_use]
    pub fn cached(&self) -> Cart {
        let Some(storage) = &self.snapshot else {
            return Cart::new();
        };
        match storage::read_json::<Cart>(storage.as_ref(), keys::CACHED_CART) {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached cart");
                Cart::new()
            }
        }
    }
}

/// Convert backend items, dropping those whose product cannot be identified.
pub(crate) fn lines_from_items(items: Vec<RemoteCartItem>) -> Cart {
    items
        .into_iter()
        .filter_map(|item| {
            let raw = item.product_id.clone();
            CartLine::try_from(item)
                .inspect_err(|e| {
                    tracing::warn!(product_id = %raw, error = %e, "Skipping unrecognised cart item");
                })
                .ok()
        })
        .collect()
}

#[async_trait]
impl CartRepository for RemoteCartStore {
    fn mode(&self) -> CartMode {
        CartMode::Account
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Cart, CartError> {
        let cart = lines_from_items(self.api.view_cart().await?);

        if let Some(storage) = &self.snapshot
            && let Err(e) = storage::write_json(storage.as_ref(), keys::CACHED_CART, &cart)
        {
            tracing::warn!(error = %e, "Failed to write cart snapshot");
        }

        Ok(cart)
    }

    #[instrument(skip(self, line), fields(product_id = %line.product_id, size = %line.size))]
    async fn add(&self, line: CartLine) -> Result<(), CartError> {
        self.api
            .add_item(line.product_id, line.quantity, &line.size)
            .await
    }

    #[instrument(skip(self))]
    async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.api.update_item(product_id, quantity).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, product_id: ProductId) -> Result<(), CartError> {
        self.api.remove_item(product_id).await
    }

    #[instrument(skip(self, cart), fields(lines = cart.count()))]
    async fn clear(&self, cart: &Cart) -> ClearReport {
        // One DELETE per product, all in flight at once, no ordering
        let removals = distinct_products(cart).into_iter().map(|id| async move {
            match self.api.remove_item(id).await {
                Ok(()) => LineOutcome::ok(id),
                Err(e) => {
                    e.report("cart.clear");
                    LineOutcome::failed(id, &e)
                }
            }
        });
        ClearReport {
            outcomes: join_all(removals).await,
        }
    }
}
