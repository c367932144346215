//! Cart model shared by the guest and account stores.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s keyed by
//! `(product_id, size)`. There is never more than one line per key: adding a
//! line whose key already exists bumps that line's quantity instead.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::size::Size;

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: Size,
}

impl LineKey {
    /// Create a line key.
    #[must_use]
    pub const fn new(product_id: ProductId, size: Size) -> Self {
        Self { product_id, size }
    }
}

/// One product/size/quantity entry within a cart.
///
/// Display fields (`name`, `unit_price`, `images`) are carried on the line
/// because guest carts have no catalog to join against offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog product ID.
    pub product_id: ProductId,
    /// Size variant.
    #[serde(default)]
    pub size: Size,
    /// Quantity, always at least 1.
    pub quantity: u32,
    /// Product display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Unit price.
    #[serde(default)]
    pub unit_price: Price,
    /// Image reference exactly as the backend sent it.
    #[serde(default)]
    pub images: serde_json::Value,
}

impl CartLine {
    /// Create a line with no display details.
    #[must_use]
    pub fn new(product_id: ProductId, size: Size, quantity: u32) -> Self {
        Self {
            product_id,
            size,
            quantity,
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

    /// The line's identity.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.size.clone())
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// An ordered collection of cart lines, at most one per [`LineKey`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from lines, folding duplicate keys together.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add_or_increment(line);
        }
        cart
    }

    /// All lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines (not the sum of quantities).
    #[must_use]
    pub fn count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Σ(unit price × quantity).
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Cart total formatted with two decimals.
    #[must_use]
    pub fn total_display(&self) -> String {
        self.total().format()
    }

    /// The set of line keys.
    #[must_use]
    pub fn keys(&self) -> HashSet<LineKey> {
        self.lines.iter().map(CartLine::key).collect()
    }

    /// First line for a product, in any size.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Line with an exact key.
    #[must_use]
    pub fn line_by_key(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|l| l.product_id == key.product_id && l.size == key.size)
    }

    /// Insert a line, or add its quantity to the existing line with the same key.
    ///
    /// Returns the resulting quantity of that key.
    pub fn add_or_increment(&mut self, line: CartLine) -> u32 {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id && l.size == line.size)
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            return existing.quantity;
        }
        let quantity = line.quantity;
        self.lines.push(line);
        quantity
    }

    /// Set the quantity of the first line for a product.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove every line for a product, in all sizes.
    ///
    /// Returns the number of lines removed.
    pub fn remove_product(&mut self, product_id: ProductId) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        before - self.lines.len()
    }

    /// Remove all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Iterate over lines.
    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.lines.iter()
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        Self::from_lines(iter)
    }
}
