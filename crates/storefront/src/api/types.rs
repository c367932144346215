//! Wire types for the shop REST API.
//!
//! These mirror the backend's JSON exactly (`productname`, `pro_price`,
//! `pro_quantity`, ...) and are converted into the clean [`CartLine`] model at
//! the boundary.

use adroit_core::{CartLine, Price, ProductRef, ProductRefError, Size};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Cart
// =============================================================================

/// A cart item as returned by `GET cart/view`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCartItem {
    /// Product reference; sometimes a catalog code such as `PRO007`.
    pub product_id: ProductRef,
    /// Quantity as stored in the cart table.
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: Option<u32>,
    /// Quantity as some endpoints report it; wins over `quantity` when set.
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub pro_quantity: Option<u32>,
    /// Size variant.
    #[serde(default)]
    pub size: Size,
    /// Product display name.
    #[serde(default)]
    pub productname: Option<String>,
    /// Unit price.
    #[serde(default)]
    pub pro_price: Price,
    /// Image reference.
    #[serde(default)]
    pub images: serde_json::Value,
    /// Legacy single image URL, used when `images` is missing.
    #[serde(default)]
    pub imgurl: Option<String>,
}

impl RemoteCartItem {
    /// Effective quantity of the item: the first positive of `pro_quantity`
    /// and `quantity`, else 1.
    #[must_use]
    pub fn effective_quantity(&self) -> u32 {
        self.pro_quantity
            .filter(|q| *q > 0)
            .or_else(|| self.quantity.filter(|q| *q > 0))
            .unwrap_or(1)
    }
}

impl TryFrom<RemoteCartItem> for CartLine {
    type Error = ProductRefError;

    fn try_from(item: RemoteCartItem) -> Result<Self, Self::Error> {
        let product_id = item.product_id.normalize()?;
        let quantity = item.effective_quantity();
        let images = match (item.images, item.imgurl) {
            (serde_json::Value::Null, Some(url)) => serde_json::Value::String(url),
            (images, _) => images,
        };
        let mut line = Self::new(product_id, item.size, quantity)
            .with_unit_price(item.pro_price)
            .with_images(images);
        line.name = item.productname;
        Ok(line)
    }
}

/// `GET cart/view` body: either a bare array or wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CartViewResponse {
    Items(Vec<RemoteCartItem>),
    Wrapped { data: Vec<RemoteCartItem> },
}

impl CartViewResponse {
    pub(crate) fn into_items(self) -> Vec<RemoteCartItem> {
        match self {
            Self::Items(items) | Self::Wrapped { data: items } => items,
        }
    }
}

/// Body of `POST cart/{id}/add`.
#[derive(Debug, Clone, Serialize)]
pub struct AddItemRequest {
    pub quantity: u32,
    pub size: String,
}

/// Body of `PUT cart/{id}/update`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product as returned by `GET products` and `GET products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Catalog ID.
    pub id: ProductRef,
    /// Display name.
    #[serde(default)]
    pub productname: Option<String>,
    /// Unit price.
    #[serde(default)]
    pub pro_price: Price,
    /// Image reference.
    #[serde(default)]
    pub images: serde_json::Value,
}

/// Accept quantities sent as numbers or numeric strings.
pub(crate) fn lenient_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|q| u32::try_from(q).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use adroit_core::ProductId;

    #[test]
    fn test_remote_item_with_catalog_code() {
        let item: RemoteCartItem = serde_json::from_str(
            r#"{"product_id":"PRO007","quantity":2,"size":null,"productname":"Door Sensor","pro_price":"19.50"}"#,
        )
        .unwrap();
        let line = CartLine::try_from(item).unwrap();

        assert_eq!(line.product_id, ProductId::new(7));
        assert_eq!(line.size, Size::default());
        assert_eq!(line.quantity, 2);
        assert_eq!(line.name.as_deref(), Some("Door Sensor"));
        assert_eq!(line.unit_price.format(), "19.50");
    }

    #[test]
    fn test_pro_quantity_wins() {
        let item: RemoteCartItem =
            serde_json::from_str(r#"{"product_id":3,"quantity":1,"pro_quantity":"4"}"#).unwrap();
        assert_eq!(item.effective_quantity(), 4);
    }

    #[test]
    fn test_zero_quantity_reads_as_one() {
        let item: RemoteCartItem =
            serde_json::from_str(r#"{"product_id":3,"quantity":0,"pro_quantity":null}"#).unwrap();
        assert_eq!(item.effective_quantity(), 1);

        let item: RemoteCartItem =
            serde_json::from_str(r#"{"product_id":3,"quantity":2,"pro_quantity":"0"}"#).unwrap();
        assert_eq!(item.effective_quantity(), 2);
        assert_eq!(CartLine::try_from(item).unwrap().quantity, 2);
    }

    #[test]
    fn test_imgurl_fallback() {
        let item: RemoteCartItem =
            serde_json::from_str(r#"{"product_id":3,"quantity":1,"imgurl":"/img/a.jpg"}"#).unwrap();
        let line = CartLine::try_from(item).unwrap();
        assert_eq!(line.images, serde_json::json!("/img/a.jpg"));
    }

    #[test]
    fn test_unresolvable_product_is_rejected() {
        let item: RemoteCartItem =
            serde_json::from_str(r#"{"product_id":"bundle-a","quantity":1}"#).unwrap();
        assert!(CartLine::try_from(item).is_err());
    }

    #[test]
    fn test_view_response_shapes() {
        let bare: CartViewResponse =
            serde_json::from_str(r#"[{"product_id":1,"quantity":1}]"#).unwrap();
        assert_eq!(bare.into_items().len(), 1);

        let wrapped: CartViewResponse =
            serde_json::from_str(r#"{"data":[{"product_id":1,"quantity":1}]}"#).unwrap();
        assert_eq!(wrapped.into_items().len(), 1);
    }

    #[test]
    fn test_add_request_body() {
        let body = AddItemRequest {
            quantity: 2,
            size: "M".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"quantity": 2, "size": "M"})
        );
    }
}
