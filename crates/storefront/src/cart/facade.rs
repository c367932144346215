//! The one cart API the rest of the application uses.
//!
//! `CartFacade` owns the visible cart state (`lines`, `is_loading`, `error`)
//! and a repository chosen when the session started. Callers never branch on
//! login state.
//!
//! # Optimistic updates
//!
//! `update_quantity` and `remove` change the visible state first, then write
//! through the repository. If the write fails, [`CartFacade::compensate`]
//! replaces the tentative state with a fresh authoritative read. `add` is
//! never optimistic: on failure the visible state is left exactly as it was.

use adroit_core::{Cart, CartLine, Price, ProductId, ProductRef, ProductRefError, Size};
use tracing::instrument;

use super::{CartMode, CartRepository, ClearReport};
use crate::error::{CartError, add_breadcrumb};

const LOAD_FAILED: &str = "Failed to load cart";
const ADD_FAILED: &str = "Failed to add item to cart";
const UPDATE_FAILED: &str = "Failed to update quantity";
const REMOVE_FAILED: &str = "Failed to remove item";

/// A product being added to the cart.
///
/// Display fields are only stored for guest carts; account carts get them
/// back from the backend.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub product: ProductRef,
    pub name: Option<String>,
    pub unit_price: Price,
    pub images: serde_json::Value,
}

impl ProductInput {
    /// A product known only by reference.
    #[must_use]
    pub fn id(product: impl Into<ProductRef>) -> Self {
        Self {
            product: product.into(),
            name: None,
            unit_price: Price::ZERO,
            images: serde_json::Value::Null,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the unit price.
    #[must_use]
    pub const fn with_unit_price(mut self, unit_price: Price) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// Set the image reference.
    #[must_use]
    pub fn with_images(mut self, images: serde_json::Value) -> Self {
        self.images = images;
        self
    }
}

/// Why a cart operation did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The product reference is not a numeric catalog id.
    InvalidProduct(ProductRefError),
    /// Adding zero items.
    ZeroQuantity,
    /// The resulting quantity would be below 1 (or overflow).
    QuantityOutOfRange,
    /// The product is not in the visible cart.
    NotInCart,
}

/// Outcome of a cart mutation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOutcome {
    /// The change was made.
    Applied,
    /// A local precondition did not hold; nothing changed.
    Skipped(SkipReason),
}

/// Visible cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Lines currently shown.
    pub lines: Cart,
    /// Whether an authoritative read is in progress.
    pub is_loading: bool,
    /// Last user-visible error.
    pub error: Option<String>,
}

/// Cart facade over one repository.
pub struct CartFacade {
    repo: Box<dyn CartRepository>,
    state: CartState,
}

impl CartFacade {
    /// Create a facade with an empty visible cart.
    #[must_use]
    pub fn new(repo: Box<dyn CartRepository>) -> Self {
        Self::with_lines(repo, Cart::new())
    }

    /// Create a facade showing `lines` until the first refresh.
    #[must_use]
    pub fn with_lines(repo: Box<dyn CartRepository>, lines: Cart) -> Self {
        Self {
            repo,
            state: CartState {
                lines,
                is_loading: false,
                error: None,
            },
        }
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    /// Guest or account cart.
    #[must_use]
    pub fn mode(&self) -> CartMode {
        self.repo.mode()
    }

    /// Full visible state.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Visible cart lines.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.state.lines
    }

    /// Number of distinct lines (not the sum of quantities).
    #[must_use]
    pub fn count(&self) -> usize {
        self.state.lines.count()
    }

    /// Σ(unit price × quantity).
    #[must_use]
    pub fn total(&self) -> Price {
        self.state.lines.total()
    }

    /// Cart total formatted with two decimals.
    #[must_use]
    pub fn total_display(&self) -> String {
        self.state.lines.total_display()
    }

    /// Whether an authoritative read is in progress.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    /// Last user-visible error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.state.error = Some(message);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replace the visible cart with an authoritative read.
    ///
    /// On failure the previous lines stay visible and `error` is set.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    #[instrument(skip(self), fields(mode = ?self.mode()))]
    pub async fn refresh(&mut self) -> Result<(), CartError> {
        self.state.is_loading = true;
        let result = self.repo.fetch().await;
        self.state.is_loading = false;

        match result {
            Ok(cart) => {
                self.state.lines = cart;
                self.state.error = None;
                Ok(())
            }
            Err(e) => {
                e.report("cart.refresh");
                self.state.error = Some(e.user_message(LOAD_FAILED));
                Err(e)
            }
        }
    }

    /// Add `quantity` of a product in `size`.
    ///
    /// Skips without error if the product is not a numeric catalog id or the
    /// quantity is zero. Otherwise writes through the repository and refreshes.
    ///
    /// # Errors
    ///
    /// Returns the repository error; the visible cart is left untouched.
    #[instrument(skip(self, product), fields(product = %product.product, mode = ?self.mode()))]
    pub async fn add(
        &mut self,
        product: ProductInput,
        quantity: u32,
        size: Size,
    ) -> Result<CartOutcome, CartError> {
        let product_id = match product.product.resolve() {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring add for non-catalog product");
                return Ok(CartOutcome::Skipped(SkipReason::InvalidProduct(e)));
            }
        };
        if quantity == 0 {
            return Ok(CartOutcome::Skipped(SkipReason::ZeroQuantity));
        }

        let id = product_id.to_string();
        add_breadcrumb("cart", "Add to cart", Some(&[("product_id", id.as_str())]));

        let mut line = CartLine::new(product_id, size, quantity)
            .with_unit_price(product.unit_price)
            .with_images(product.images);
        line.name = product.name;

        if let Err(e) = self.repo.add(line).await {
            e.report("cart.add");
            self.state.error = Some(e.user_message(ADD_FAILED));
            return Err(e);
        }

        // The write went through; a failed read only leaves the view stale
        let _ = self.refresh().await;
        Ok(CartOutcome::Applied)
    }

    /// Change a product's quantity by `delta`.
    ///
    /// Skips if the product is not visible or the result would be below 1.
    ///
    /// # Errors
    ///
    /// Returns the repository error after compensating.
    #[instrument(skip(self), fields(mode = ?self.mode()))]
    pub async fn update_quantity(
        &mut self,
        product_id: ProductId,
        delta: i64,
    ) -> Result<CartOutcome, CartError> {
        let Some(current) = self.state.lines.line(product_id).map(|l| l.quantity) else {
            return Ok(CartOutcome::Skipped(SkipReason::NotInCart));
        };
        let Some(new_quantity) = i64::from(current)
            .checked_add(delta)
            .filter(|q| *q >= 1)
            .and_then(|q| u32::try_from(q).ok())
        else {
            return Ok(CartOutcome::Skipped(SkipReason::QuantityOutOfRange));
        };

        // Tentative state
        self.state.lines.set_quantity(product_id, new_quantity);

        if let Err(e) = self.repo.update_quantity(product_id, new_quantity).await {
            e.report("cart.update_quantity");
            self.compensate().await;
            self.state.error = Some(e.user_message(UPDATE_FAILED));
            return Err(e);
        }

        Ok(CartOutcome::Applied)
    }

    /// Remove every line of a product.
    ///
    /// # Errors
    ///
    /// Returns the repository error after compensating.
    #[instrument(skip(self), fields(mode = ?self.mode()))]
    pub async fn remove(&mut self, product_id: ProductId) -> Result<CartOutcome, CartError> {
        let id = product_id.to_string();
        add_breadcrumb("cart", "Remove from cart", Some(&[("product_id", id.as_str())]));

        // Tentative state
        self.state.lines.remove_product(product_id);

        if let Err(e) = self.repo.remove(product_id).await {
            e.report("cart.remove");
            self.compensate().await;
            self.state.error = Some(e.user_message(REMOVE_FAILED));
            return Err(e);
        }

        Ok(CartOutcome::Applied)
    }

    /// Remove everything.
    ///
    /// The visible cart is emptied whatever the individual outcomes; the
    /// report says which products the repository failed to remove.
    #[instrument(skip(self), fields(mode = ?self.mode(), lines = self.count()))]
    pub async fn clear(&mut self) -> ClearReport {
        add_breadcrumb("cart", "Clear cart", None);

        let report = self.repo.clear(&self.state.lines).await;
        self.state.lines.clear();

        if !report.is_complete() {
            tracing::warn!(
                failed = report.failed().count(),
                "Some cart lines could not be removed"
            );
        }
        report
    }

    /// Replace tentative state with a fresh authoritative read.
    ///
    /// Called after a failed write that was already applied to the visible
    /// cart. If the read fails too, the tentative state stays and the read
    /// error is logged.
    #[instrument(skip(self))]
    pub async fn compensate(&mut self) {
        match self.repo.fetch().await {
            Ok(cart) => self.state.lines = cart,
            Err(e) => e.report("cart.compensate"),
        }
    }
}
