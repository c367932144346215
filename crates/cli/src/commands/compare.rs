//! Comparison list commands.
//!
//! # Usage
//!
//! ```bash
//! adroit-cli compare add 4
//! adroit-cli compare list
//! adroit-cli compare remove 4
//! adroit-cli compare clear
//! ```

use adroit_core::ProductRef;
use adroit_storefront::ShopSession;
use adroit_storefront::compare::CompareItem;

use super::{CliError, product_id};

/// Look a product up in the catalog and add it.
pub async fn add(session: &ShopSession, product: &str) -> Result<(), CliError> {
    let product = session.catalog().product(product_id(product)?).await?;

    if session.compare().add(CompareItem::from(&product))? {
        tracing::info!("Added {} to comparison", product.id);
    } else {
        tracing::info!("{} is already in the comparison", product.id);
    }
    Ok(())
}

/// Remove a product.
pub fn remove(session: &ShopSession, product: String) -> Result<(), CliError> {
    let id = ProductRef::from(product);
    if session.compare().remove(&id)? {
        tracing::info!("Removed {id} from comparison");
    } else {
        tracing::info!("{id} is not in the comparison");
    }
    Ok(())
}

/// Print every product.
pub fn list(session: &ShopSession) -> Result<(), CliError> {
    let items = session.compare().items()?;
    if items.is_empty() {
        tracing::info!("Comparison list is empty");
    }
    for item in &items {
        tracing::info!(
            "{} {} @ {}",
            item.id,
            item.productname.as_deref().unwrap_or("-"),
            item.pro_price.format()
        );
    }
    Ok(())
}

/// Remove every product.
pub fn clear(session: &ShopSession) -> Result<(), CliError> {
    session.compare().clear()?;
    tracing::info!("Comparison list cleared");
    Ok(())
}
