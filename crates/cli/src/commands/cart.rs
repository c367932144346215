//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! adroit-cli cart show
//! adroit-cli cart add 7 -q 2 -s L
//! adroit-cli cart update 7 -- -1
//! adroit-cli cart remove 7
//! adroit-cli cart clear
//! ```

use adroit_core::{Price, ProductRef, Size};
use adroit_storefront::ShopSession;
use adroit_storefront::cart::{CartOutcome, ProductInput};

use super::{CliError, product_id};

/// Print every line and the total.
pub fn show(session: &ShopSession) {
    let cart = session.cart();

    if let Some(error) = cart.error() {
        tracing::warn!("Cart may be stale: {error}");
    }
    if cart.cart().is_empty() {
        tracing::info!("Cart is empty ({:?})", cart.mode());
        return;
    }

    for line in cart.cart() {
        tracing::info!(
            "{} x{} [{}] {} @ {} = {}",
            line.product_id,
            line.quantity,
            line.size,
            line.name.as_deref().unwrap_or("-"),
            line.unit_price.format(),
            line.line_total().format(),
        );
    }
    tracing::info!(
        "{} line(s), total {} ({:?})",
        cart.count(),
        cart.total_display(),
        cart.mode()
    );
}

/// Add a product.
pub async fn add(
    session: &mut ShopSession,
    product: String,
    quantity: u32,
    size: &str,
    name: Option<String>,
    price: Option<String>,
) -> Result<(), CliError> {
    let mut input = ProductInput::id(ProductRef::from(product));
    if let Some(name) = name {
        input = input.with_name(name);
    }
    if let Some(price) = price {
        let unit_price: Price = price.parse().map_err(|_| CliError::InvalidPrice(price))?;
        input = input.with_unit_price(unit_price);
    }

    let outcome = session
        .cart_mut()
        .add(input, quantity, Size::new(size))
        .await?;
    report(outcome);
    show(session);
    Ok(())
}

/// Change a product's quantity by `delta`.
pub async fn update(session: &mut ShopSession, product: &str, delta: i64) -> Result<(), CliError> {
    let outcome = session
        .cart_mut()
        .update_quantity(product_id(product)?, delta)
        .await?;
    report(outcome);
    show(session);
    Ok(())
}

/// Remove a product.
pub async fn remove(session: &mut ShopSession, product: &str) -> Result<(), CliError> {
    let outcome = session.cart_mut().remove(product_id(product)?).await?;
    report(outcome);
    show(session);
    Ok(())
}

/// Remove everything, listing products that could not be removed.
pub async fn clear(session: &mut ShopSession) {
    let report = session.cart_mut().clear().await;

    for failure in report.failed() {
        tracing::warn!(
            "Could not remove {}: {}",
            failure.product_id,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
    tracing::info!("Cleared {} product(s)", report.succeeded().count());
}

fn report(outcome: CartOutcome) {
    match outcome {
        CartOutcome::Applied => tracing::info!("Cart updated"),
        CartOutcome::Skipped(reason) => tracing::info!("Nothing changed: {reason:?}"),
    }
}
