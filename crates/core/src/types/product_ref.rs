//! Product references as they arrive from callers and from the backend.
//!
//! The backend and the UI pass product identifiers around loosely: sometimes a
//! JSON number, sometimes a numeric string, sometimes a display catalog code
//! such as `PRO007`. Cart operations only ever accept a numeric catalog id, so
//! everything goes through [`ProductRef`] before touching a cart.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Prefix the backend uses for display catalog codes (e.g. `PRO007`).
pub const CATALOG_CODE_PREFIX: &str = "PRO";

/// Errors that can occur when resolving a [`ProductRef`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductRefError {
    /// The reference is empty or whitespace.
    #[error("product reference cannot be empty")]
    Empty,
    /// The reference is a display catalog code, not a catalog id.
    #[error("'{0}' is a catalog code, not a numeric product id")]
    CatalogCode(String),
    /// The reference is not numeric.
    #[error("'{0}' is not a numeric product id")]
    NotNumeric(String),
    /// The numeric value is zero, negative, or too large.
    #[error("product id {0} is out of range")]
    OutOfRange(i64),
}

/// A raw product reference: a JSON number or a string.
///
/// ```
/// use adroit_core::{ProductId, ProductRef};
///
/// assert_eq!(ProductRef::from("7").resolve(), Ok(ProductId::new(7)));
/// assert!(ProductRef::from("PRO007").resolve().is_err());
/// assert_eq!(ProductRef::from("PRO007").normalize(), Ok(ProductId::new(7)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    /// A JSON number.
    Number(i64),
    /// A string, either numeric or a catalog code.
    Text(String),
}

impl ProductRef {
    /// Resolve to a catalog id, rejecting catalog codes.
    ///
    /// This is the strict check applied before adding to a cart, so a display
    /// SKU can never be sent to the backend as if it were an id.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is empty, a catalog code, not
    /// numeric, or outside the positive `i32` range.
    pub fn resolve(&self) -> Result<ProductId, ProductRefError> {
        match self {
            Self::Number(n) => to_product_id(*n),
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Err(ProductRefError::Empty);
                }
                if s.starts_with(CATALOG_CODE_PREFIX) {
                    return Err(ProductRefError::CatalogCode(s.to_owned()));
                }
                parse_numeric(s)
            }
        }
    }

    /// Resolve to a catalog id, stripping a catalog-code prefix first.
    ///
    /// Used on data coming back from the backend, where cart items may carry
    /// `PRO007` instead of `7`.
    ///
    /// # Errors
    ///
    /// Returns an error if what remains after stripping the prefix is not a
    /// positive numeric id.
    pub fn normalize(&self) -> Result<ProductId, ProductRefError> {
        match self {
            Self::Number(n) => to_product_id(*n),
            Self::Text(s) => {
                let s = s.trim();
                let digits = s.strip_prefix(CATALOG_CODE_PREFIX).unwrap_or(s);
                if digits.is_empty() {
                    return Err(ProductRefError::Empty);
                }
                parse_numeric(digits)
            }
        }
    }
}

fn parse_numeric(s: &str) -> Result<ProductId, ProductRefError> {
    let n = s
        .parse::<i64>()
        .map_err(|_| ProductRefError::NotNumeric(s.to_owned()))?;
    to_product_id(n)
}

fn to_product_id(n: i64) -> Result<ProductId, ProductRefError> {
    match i32::try_from(n) {
        Ok(id) if id > 0 => Ok(ProductId::new(id)),
        _ => Err(ProductRefError::OutOfRange(n)),
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ProductRef {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for ProductRef {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ProductRef {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<ProductId> for ProductRef {
    fn from(id: ProductId) -> Self {
        Self::Number(i64::from(id.as_i32()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_numeric_string() {
        assert_eq!(ProductRef::from("12").resolve(), Ok(ProductId::new(12)));
        assert_eq!(ProductRef::from(" 12 ").resolve(), Ok(ProductId::new(12)));
    }

    #[test]
    fn test_resolve_number() {
        assert_eq!(ProductRef::from(7_i64).resolve(), Ok(ProductId::new(7)));
    }

    #[test]
    fn test_resolve_rejects_catalog_code() {
        assert_eq!(
            ProductRef::from("PRO007").resolve(),
            Err(ProductRefError::CatalogCode("PRO007".to_string()))
        );
    }

    #[test]
    fn test_resolve_rejects_text() {
        assert!(matches!(
            ProductRef::from("alarm-panel").resolve(),
            Err(ProductRefError::NotNumeric(_))
        ));
        assert_eq!(ProductRef::from("").resolve(), Err(ProductRefError::Empty));
    }

    #[test]
    fn test_resolve_rejects_out_of_range() {
        assert_eq!(
            ProductRef::from(0_i64).resolve(),
            Err(ProductRefError::OutOfRange(0))
        );
        assert_eq!(
            ProductRef::from("-3").resolve(),
            Err(ProductRefError::OutOfRange(-3))
        );
        assert!(ProductRef::from(i64::MAX).resolve().is_err());
    }

    #[test]
    fn test_normalize_strips_catalog_prefix() {
        assert_eq!(ProductRef::from("PRO007").normalize(), Ok(ProductId::new(7)));
        assert_eq!(ProductRef::from("PRO12").normalize(), Ok(ProductId::new(12)));
        assert_eq!(ProductRef::from("12").normalize(), Ok(ProductId::new(12)));
    }

    #[test]
    fn test_normalize_rejects_bare_prefix() {
        assert_eq!(ProductRef::from("PRO").normalize(), Err(ProductRefError::Empty));
        assert!(ProductRef::from("PROX").normalize().is_err());
    }

    #[test]
    fn test_deserialize_untagged() {
        let n: ProductRef = serde_json::from_str("7").unwrap();
        assert_eq!(n, ProductRef::Number(7));
        let s: ProductRef = serde_json::from_str("\"PRO007\"").unwrap();
        assert_eq!(s, ProductRef::Text("PRO007".to_string()));
    }
}
