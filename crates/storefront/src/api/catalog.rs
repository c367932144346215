//! Cached catalog reads.
//!
//! Guest carts carry display fields captured at add time; the catalog is used
//! to refresh them (name, price, images) whenever the guest cart is viewed.
//! Listings are cached with `moka` so repeated views don't refetch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use adroit_core::{CartLine, ProductId};
use moka::future::Cache;
use tracing::{debug, instrument};

use super::{CatalogApi, CatalogProduct};
use crate::error::CartError;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<HashMap<ProductId, CatalogProduct>>),
    Product(Box<CatalogProduct>),
}

/// Catalog reader with an in-memory TTL cache.
#[derive(Clone)]
pub struct CatalogCache {
    api: Arc<dyn CatalogApi>,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogCache {
    /// Wrap a catalog API with a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(api: Arc<dyn CatalogApi>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1000).time_to_live(ttl).build();
        Self { api, cache }
    }

    /// All products keyed by catalog ID.
    ///
    /// Products whose ID cannot be normalized are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing is not cached and the request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<HashMap<ProductId, CatalogProduct>>, CartError> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&CacheKey::Products).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let products: HashMap<_, _> = self
            .api
            .list_products()
            .await?
            .into_iter()
            .filter_map(|p| p.id.normalize().ok().map(|id| (id, p)))
            .collect();
        let products = Arc::new(products);

        self.cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// One product by catalog ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not cached and the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn product(&self, product_id: ProductId) -> Result<CatalogProduct, CartError> {
        let key = CacheKey::Product(product_id);
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product = self.api.get_product(product_id).await?;
        self.cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Refresh display fields of guest lines from the catalog.
    ///
    /// Lines for products missing from the catalog keep their stored fields.
    /// If the catalog cannot be read at all, the lines are returned unchanged.
    pub async fn enrich(&self, lines: Vec<CartLine>) -> Vec<CartLine> {
        if lines.is_empty() {
            return lines;
        }

        let products = match self.products().await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(error = %e, "Catalog unavailable, showing stored cart details");
                return lines;
            }
        };

        lines
            .into_iter()
            .map(|mut line| {
                if let Some(product) = products.get(&line.product_id) {
                    line.name.clone_from(&product.productname);
                    line.unit_price = product.pro_price;
                    line.images = product.images.clone();
                }
                line
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use adroit_core::{Price, ProductRef, Size};
    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct CountingCatalog {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CatalogApi for CountingCatalog {
        async fn list_products(&self) -> Result<Vec<CatalogProduct>, CartError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CartError::Backend {
                    status: 503,
                    message: Some("down".to_string()),
                });
            }
            Ok(vec![
                CatalogProduct {
                    id: ProductRef::Number(7),
                    productname: Some("Motion Detector".to_string()),
                    pro_price: "49.90".parse().unwrap(),
                    images: serde_json::json!(["/img/pir.jpg"]),
                },
                CatalogProduct {
                    id: ProductRef::Text("PRO008".to_string()),
                    productname: Some("Siren".to_string()),
                    pro_price: "20".parse().unwrap(),
                    images: serde_json::Value::Null,
                },
            ])
        }

        async fn get_product(&self, product_id: ProductId) -> Result<CatalogProduct, CartError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CatalogProduct {
                id: ProductRef::from(product_id),
                productname: Some("Keypad".to_string()),
                pro_price: Price::ZERO,
                images: serde_json::Value::Null,
            })
        }
    }

    fn cache(api: Arc<CountingCatalog>) -> CatalogCache {
        CatalogCache::new(api, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_listing_is_cached() {
        let api = Arc::new(CountingCatalog::default());
        let catalog = cache(Arc::clone(&api));

        let first = catalog.products().await.unwrap();
        let second = catalog.products().await.unwrap();

        assert_eq!(first.len(), 2);
        assert!(second.contains_key(&ProductId::new(8)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_product_is_cached() {
        let api = Arc::new(CountingCatalog::default());
        let catalog = cache(Arc::clone(&api));

        catalog.product(ProductId::new(3)).await.unwrap();
        let product = catalog.product(ProductId::new(3)).await.unwrap();

        assert_eq!(product.productname.as_deref(), Some("Keypad"));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enrich_overrides_display_fields() {
        let catalog = cache(Arc::new(CountingCatalog::default()));
        let stale = CartLine::new(ProductId::new(7), Size::default(), 2)
            .with_name("Old name")
            .with_unit_price("1".parse().unwrap());
        let unknown = CartLine::new(ProductId::new(99), Size::default(), 1).with_name("Kept");

        let lines = catalog.enrich(vec![stale, unknown]).await;

        assert_eq!(lines[0].name.as_deref(), Some("Motion Detector"));
        assert_eq!(lines[0].unit_price.format(), "49.90");
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[1].name.as_deref(), Some("Kept"));
    }

    #[tokio::test]
    async fn test_enrich_keeps_lines_when_catalog_fails() {
        let api = Arc::new(CountingCatalog {
            fail: true,
            ..Default::default()
        });
        let catalog = cache(api);
        let line = CartLine::new(ProductId::new(7), Size::default(), 1).with_name("Stored");

        let lines = catalog.enrich(vec![line.clone()]).await;
        assert_eq!(lines, vec![line]);
    }
}
