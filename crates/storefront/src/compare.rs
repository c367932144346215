//! Product comparison list.
//!
//! Kept under [`keys::COMPARE_ITEMS`] with only the fields a comparison table
//! needs. Products are unique by id; `7`, `"7"` and `"PRO007"` are the same
//! product.

use std::sync::Arc;

use adroit_core::{Price, ProductRef};
use serde::{Deserialize, Serialize};

use crate::api::CatalogProduct;
use crate::storage::{self, KeyValueStorage, StorageError, keys};

/// One product in the comparison list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareItem {
    pub id: ProductRef,
    #[serde(default)]
    pub productname: Option<String>,
    #[serde(default)]
    pub pro_price: Price,
    #[serde(default = "no_images")]
    pub images: serde_json::Value,
}

fn same_product(a: &ProductRef, b: &ProductRef) -> bool {
    match (a.normalize(), b.normalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn no_images() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

impl From<&CatalogProduct> for CompareItem {
    fn from(product: &CatalogProduct) -> Self {
        Self {
            id: product.id.clone(),
            productname: product.productname.clone(),
            pro_price: product.pro_price,
            images: match &product.images {
                serde_json::Value::Null => no_images(),
                images => images.clone(),
            },
        }
    }
}

/// Comparison list over a [`KeyValueStorage`].
#[derive(Clone)]
pub struct CompareList {
    storage: Arc<dyn KeyValueStorage>,
}

impl CompareList {
    /// Create a list over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Products in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn items(&self) -> Result<Vec<CompareItem>, StorageError> {
        Ok(storage::read_json(self.storage.as_ref(), keys::COMPARE_ITEMS)?.unwrap_or_default())
    }

    /// Add a product unless one with the same id is already listed.
    ///
    /// Returns whether the list changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read or write fails.
    pub fn add(&self, item: CompareItem) -> Result<bool, StorageError> {
        let mut items = self.items()?;
        if items.iter().any(|i| same_product(&i.id, &item.id)) {
            return Ok(false);
        }
        items.push(item);
        self.save(&items)?;
        Ok(true)
    }

    /// Remove a product.
    ///
    /// Returns whether the list changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read or write fails.
    pub fn remove(&self, id: &ProductRef) -> Result<bool, StorageError> {
        let mut items = self.items()?;
        let before = items.len();
        items.retain(|i| !same_product(&i.id, id));
        if items.len() == before {
            return Ok(false);
        }
        self.save(&items)?;
        Ok(true)
    }

    /// Empty the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.save(&[])
    }

    fn save(&self, items: &[CompareItem]) -> Result<(), StorageError> {
        storage::write_json(self.storage.as_ref(), keys::COMPARE_ITEMS, items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn item(id: &str, name: &str) -> CompareItem {
        CompareItem {
            id: ProductRef::from(id),
            productname: Some(name.to_string()),
            pro_price: "19.99".parse().unwrap(),
            images: no_images(),
        }
    }

    fn list() -> (Arc<MemoryStorage>, CompareList) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), CompareList::new(storage))
    }

    #[test]
    fn test_add_ignores_duplicate_ids() {
        let (_, list) = list();
        assert!(list.add(item("1", "Siren")).unwrap());
        assert!(list.add(item("2", "Keypad")).unwrap());
        assert!(!list.add(item("1", "Siren v2")).unwrap());
        assert!(!list.add(item("PRO001", "Siren v3")).unwrap());

        let items = list.items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].productname.as_deref(), Some("Siren"));
    }

    #[test]
    fn test_remove_and_clear() {
        let (_, list) = list();
        list.add(item("1", "Siren")).unwrap();
        list.add(item("2", "Keypad")).unwrap();

        assert!(list.remove(&ProductRef::from(1_i64)).unwrap());
        assert!(!list.remove(&ProductRef::from("1")).unwrap());
        assert_eq!(list.items().unwrap().len(), 1);

        list.clear().unwrap();
        assert!(list.items().unwrap().is_empty());
    }

    #[test]
    fn test_stores_minimal_fields() {
        let (storage, list) = list();
        let product: CatalogProduct = serde_json::from_value(serde_json::json!({
            "id": 4,
            "productname": "Motion Sensor",
            "pro_price": "45.00",
            "description": "Not kept",
        }))
        .unwrap();
        list.add(CompareItem::from(&product)).unwrap();

        let raw = storage.get(keys::COMPARE_ITEMS).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "id": 4,
                "productname": "Motion Sensor",
                "pro_price": "45.00",
                "images": [],
            }])
        );
    }
}
