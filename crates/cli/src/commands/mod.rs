//! CLI command implementations.

pub mod cart;
pub mod compare;
pub mod session;

use adroit_core::{ProductId, ProductRef, ProductRefError};
use adroit_storefront::config::ConfigError;
use adroit_storefront::error::CartError;
use adroit_storefront::storage::StorageError;
use thiserror::Error;

/// Errors that can end a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cart or backend operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Local storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Argument is not a catalog product ID.
    #[error("Invalid product {0}: {1}")]
    InvalidProduct(String, ProductRefError),

    /// Price argument could not be parsed.
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}

/// Parse a product argument as a catalog product ID.
fn product_id(raw: &str) -> Result<ProductId, CliError> {
    ProductRef::from(raw)
        .resolve()
        .map_err(|e| CliError::InvalidProduct(raw.to_owned(), e))
}
