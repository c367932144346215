//! Core types for Adroit Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product_ref;
pub mod size;

pub use cart::{Cart, CartLine, LineKey};
pub use id::*;
pub use price::Price;
pub use product_ref::{CATALOG_CODE_PREFIX, ProductRef, ProductRefError};
pub use size::Size;
