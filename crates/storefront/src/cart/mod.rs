//! Cart stores, facade and guest-to-account reconciliation.
//!
//! # Architecture
//!
//! - [`CartRepository`] is the one persistence seam, with two implementations:
//!   [`LocalCartStore`] (guest cart in local storage) and [`RemoteCartStore`]
//!   (account cart on the backend)
//! - A repository is chosen once when a session starts; nothing downstream
//!   branches on login state
//! - [`CartFacade`] owns the visible cart state and applies optimistic
//!   updates with an explicit compensation step
//! - [`CartReconciler`] moves guest lines into the account cart at login

mod facade;
mod local;
mod reconcile;
mod remote;

#[cfg(test)]
pub(crate) mod fake;

use adroit_core::{Cart, CartLine, ProductId};
use async_trait::async_trait;

pub use facade::{CartFacade, CartOutcome, CartState, ProductInput, SkipReason};
pub use local::LocalCartStore;
pub use reconcile::{CartReconciler, MergePhase, MergeReport};
pub use remote::RemoteCartStore;

use crate::error::CartError;

/// Which kind of cart a repository holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMode {
    /// Unauthenticated shopper, cart in local storage.
    Guest,
    /// Signed-in shopper, cart owned by the backend.
    Account,
}

/// Persistence for one shopper's cart.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Which kind of cart this is.
    fn mode(&self) -> CartMode;

    /// Authoritative read of the whole cart.
    async fn fetch(&self) -> Result<Cart, CartError>;

    /// Add a line, incrementing the quantity of an existing key.
    async fn add(&self, line: CartLine) -> Result<(), CartError>;

    /// Set the quantity of a product's line.
    async fn update_quantity(&self, product_id: ProductId, quantity: u32)
    -> Result<(), CartError>;

    /// Remove a product.
    async fn remove(&self, product_id: ProductId) -> Result<(), CartError>;

    /// Remove everything in `cart`, reporting each product separately.
    async fn clear(&self, cart: &Cart) -> ClearReport;
}

/// Result of clearing one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    /// Product that was removed.
    pub product_id: ProductId,
    /// Failure message, `None` on success.
    pub error: Option<String>,
}

impl LineOutcome {
    /// Successful removal.
    #[must_use]
    pub const fn ok(product_id: ProductId) -> Self {
        Self {
            product_id,
            error: None,
        }
    }

    /// Failed removal.
    #[must_use]
    pub fn failed(product_id: ProductId, error: &CartError) -> Self {
        Self {
            product_id,
            error: Some(error.to_string()),
        }
    }
}

/// Per-product outcome of clearing a cart.
///
/// Clearing is best-effort: each removal succeeds or fails on its own and
/// nothing is rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub outcomes: Vec<LineOutcome>,
}

impl ClearReport {
    /// Products removed successfully.
    pub fn succeeded(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_none())
            .map(|o| o.product_id)
    }

    /// Products that failed to be removed.
    pub fn failed(&self) -> impl Iterator<Item = &LineOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }

    /// Whether every removal succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.error.is_none())
    }
}

/// Distinct product IDs of a cart, in line order.
fn distinct_products(cart: &Cart) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = Vec::with_capacity(cart.count());
    for line in cart {
        if !ids.contains(&line.product_id) {
            ids.push(line.product_id);
        }
    }
    ids
}
