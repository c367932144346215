//! Guest cart persisted in local storage.
//!
//! Stored under [`keys::GUEST_CART`] as a JSON array of
//! `{id, product_id, quantity, size, productname, pro_price, images}`, the
//! same shape a browser storefront keeps in `localStorage`.

use std::sync::Arc;

use adroit_core::{Cart, CartLine, Price, ProductId, ProductRef, Size};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{CartMode, CartRepository, ClearReport, LineOutcome, distinct_products};
use crate::api::CatalogCache;
use crate::api::types::lenient_quantity;
use crate::error::CartError;
use crate::storage::{self, KeyValueStorage, StorageError, keys};

/// One stored guest line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GuestLineRecord {
    /// Mirror of `product_id`, kept for readers of the stored format.
    #[serde(default, skip_deserializing)]
    id: Option<ProductId>,
    #[serde(default)]
    product_id: Option<ProductRef>,
    #[serde(default, deserialize_with = "lenient_quantity")]
    quantity: Option<u32>,
    #[serde(default)]
    size: Size,
    #[serde(default)]
    productname: Option<String>,
    #[serde(default)]
    pro_price: Price,
    #[serde(default)]
    images: serde_json::Value,
}

impl From<&CartLine> for GuestLineRecord {
    fn from(line: &CartLine) -> Self {
        Self {
            id: Some(line.product_id),
            product_id: Some(ProductRef::from(line.product_id)),
            quantity: Some(line.quantity),
            size: line.size.clone(),
            productname: line.name.clone(),
            pro_price: line.unit_price,
            images: line.images.clone(),
        }
    }
}

impl GuestLineRecord {
    fn into_line(self) -> Option<CartLine> {
        let Some(product_ref) = self.product_id else {
            tracing::warn!("Dropping guest cart line without product id");
            return None;
        };
        let product_id = match product_ref.resolve() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping guest cart line with bad product id");
                return None;
            }
        };
        let Some(quantity) = self.quantity.filter(|q| *q > 0) else {
            tracing::warn!(%product_id, "Dropping guest cart line without quantity");
            return None;
        };
        let mut line = CartLine::new(product_id, self.size, quantity)
            .with_unit_price(self.pro_price)
            .with_images(self.images);
        line.name = self.productname;
        Some(line)
    }
}

/// Guest cart repository over a [`KeyValueStorage`].
#[derive(Clone)]
pub struct LocalCartStore {
    storage: Arc<dyn KeyValueStorage>,
    catalog: Option<CatalogCache>,
}

impl LocalCartStore {
    /// Create a store over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            catalog: None,
        }
    }

    /// Refresh display fields from the catalog whenever the cart is fetched.
    #[must_use]
    pub fn with_catalog(mut self, catalog: CatalogCache) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Read the stored cart exactly as persisted.
    ///
    /// A missing or unreadable value is an empty cart. Records are decoded
    /// one at a time; a record that does not decode is dropped on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn load(&self) -> Result<Cart, StorageError> {
        let records: Vec<serde_json::Value> =
            storage::read_json(self.storage.as_ref(), keys::GUEST_CART)?.unwrap_or_default();
        Ok(records
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<GuestLineRecord>(value) {
                Ok(record) => record.into_line(),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unreadable guest cart line");
                    None
                }
            })
            .collect())
    }

    /// Persist the whole cart.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the storage write fails.
    pub fn save(&self, cart: &Cart) -> Result<(), StorageError> {
        let records: Vec<GuestLineRecord> = cart.iter().map(GuestLineRecord::from).collect();
        storage::write_json(self.storage.as_ref(), keys::GUEST_CART, &records)
    }

    /// Delete the stored cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub fn discard(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::GUEST_CART)
    }
}

#[async_trait]
impl CartRepository for LocalCartStore {
    fn mode(&self) -> CartMode {
        CartMode::Guest
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Cart, CartError> {
        let cart = self.load()?;
        match &self.catalog {
            Some(catalog) => Ok(Cart::from_lines(catalog.enrich(cart.into_lines()).await)),
            None => Ok(cart),
        }
    }

    #[instrument(skip(self, line), fields(product_id = %line.product_id, size = %line.size))]
    async fn add(&self, line: CartLine) -> Result<(), CartError> {
        let mut cart = self.load()?;
        cart.add_or_increment(line);
        self.save(&cart)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        let mut cart = self.load()?;
        if cart.set_quantity(product_id, quantity) {
            self.save(&cart)?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, product_id: ProductId) -> Result<(), CartError> {
        let mut cart = self.load()?;
        if cart.remove_product(product_id) > 0 {
            self.save(&cart)?;
        }
        Ok(())
    }

    #[instrument(skip(self, cart), fields(lines = cart.count()))]
    async fn clear(&self, cart: &Cart) -> ClearReport {
        let result = self.discard().map_err(CartError::from);
        let outcomes = distinct_products(cart)
            .into_iter()
            .map(|id| match &result {
                Ok(()) => LineOutcome::ok(id),
                Err(e) => LineOutcome::failed(id, e),
            })
            .collect();
        ClearReport { outcomes }
    }
}
