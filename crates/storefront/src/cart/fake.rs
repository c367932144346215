//! In-memory `CartApi` used by unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use adroit_core::{Price, ProductId, ProductRef, Size};
use async_trait::async_trait;

use crate::api::{CartApi, RemoteCartItem};
use crate::error::CartError;

/// Backend stand-in with switchable failures.
#[derive(Default)]
pub(crate) struct FakeCartApi {
    items: Mutex<Vec<RemoteCartItem>>,
    calls: Mutex<Vec<String>>,
    failing_adds: Mutex<HashSet<ProductId>>,
    failing_removes: Mutex<HashSet<ProductId>>,
    fail_view: AtomicBool,
    fail_update: AtomicBool,
    failure_body: Mutex<Option<(u16, String)>>,
}

fn server_error() -> CartError {
    CartError::Backend {
        status: 500,
        message: Some("Server Error".to_string()),
    }
}

impl FakeCartApi {
    pub(crate) fn with_items(items: Vec<RemoteCartItem>) -> Self {
        let api = Self::default();
        *api.items.lock().unwrap_or_else(PoisonError::into_inner) = items;
        api
    }

    pub(crate) fn item(product_id: &str, size: &str, quantity: u32) -> RemoteCartItem {
        RemoteCartItem {
            product_id: ProductRef::from(product_id),
            quantity: Some(quantity),
            pro_quantity: None,
            size: Size::new(size),
            productname: Some(format!("Product {product_id}")),
            pro_price: Price::from(10),
            images: serde_json::Value::Null,
            imgurl: None,
        }
    }

    pub(crate) fn fail_add_of(&self, product_id: ProductId) {
        self.failing_adds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id);
    }

    pub(crate) fn fail_remove_of(&self, product_id: ProductId) {
        self.failing_removes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id);
    }

    /// Answer every injected failure with this raw response instead.
    pub(crate) fn set_failure_body(&self, status: u16, body: &str) {
        *self
            .failure_body
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((status, body.to_string()));
    }

    fn unavailable(&self) -> CartError {
        self.failure_body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or_else(server_error, |(status, body)| {
                CartError::from_response(*status, body)
            })
    }

    pub(crate) fn set_fail_view(&self, fail: bool) {
        self.fail_view.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Calls made so far, e.g. `"add 7 M x2"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn quantity_of(&self, product_id: ProductId, size: &str) -> Option<u32> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|i| i.product_id.normalize() == Ok(product_id) && i.size.as_str() == size)
            .map(RemoteCartItem::effective_quantity)
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl CartApi for FakeCartApi {
    async fn view_cart(&self) -> Result<Vec<RemoteCartItem>, CartError> {
        self.record("view".to_string());
        if self.fail_view.load(Ordering::SeqCst) {
            return Err(self.unavailable());
        }
        Ok(self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
        size: &Size,
    ) -> Result<(), CartError> {
        self.record(format!("add {product_id} {size} x{quantity}"));
        if self
            .failing_adds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&product_id)
        {
            return Err(self.unavailable());
        }

        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = items
            .iter_mut()
            .find(|i| i.product_id.normalize() == Ok(product_id) && &i.size == size)
        {
            existing.quantity = Some(existing.effective_quantity() + quantity);
        } else {
            let mut item = Self::item(&product_id.to_string(), size.as_str(), quantity);
            item.product_id = ProductRef::from(product_id);
            items.push(item);
        }
        Ok(())
    }

    async fn update_item(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        self.record(format!("update {product_id} x{quantity}"));
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(self.unavailable());
        }

        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = items
            .iter_mut()
            .find(|i| i.product_id.normalize() == Ok(product_id))
        {
            existing.quantity = Some(quantity);
            existing.pro_quantity = None;
        }
        Ok(())
    }

    async fn remove_item(&self, product_id: ProductId) -> Result<(), CartError> {
        self.record(format!("remove {product_id}"));
        if self
            .failing_removes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&product_id)
        {
            return Err(self.unavailable());
        }

        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|i| i.product_id.normalize() != Ok(product_id));
        Ok(())
    }
}
