//! Product size variant.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A product size variant (e.g. `"M"`, `"XL"`).
///
/// Sizes are part of a cart line's identity. A missing or empty size means
/// the default, `"M"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Size(String);

impl Size {
    /// The size used when none is given.
    pub const DEFAULT: &'static str = "M";

    /// Create a size, falling back to the default for empty input.
    #[must_use]
    pub fn new(size: &str) -> Self {
        let size = size.trim();
        if size.is_empty() {
            Self::default()
        } else {
            Self(size.to_owned())
        }
    }

    /// Returns the size as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Size {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Size {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Option<&str>> for Size {
    fn from(s: Option<&str>) -> Self {
        s.map_or_else(Self::default, Self::new)
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from(raw.as_deref()))
    }
}
