// src/model/product.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite product identity. No single id column is trustworthy across
/// the extracts, so every join and aggregation keys on this triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductKey {
    pub brand: String,
    pub description: String,
    pub size: String,
}

impl ProductKey {
    pub fn new(
        brand: impl Into<String>,
        description: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            brand: brand.into(),
            description: description.into(),
            size: size.into(),
        }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} ({})", self.brand, self.description, self.size)
    }
}

/// Implemented by every row type that carries the product triple.
pub trait Keyed {
    fn product_key(&self) -> ProductKey;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_order_by_brand_then_description_then_size() {
        let mut keys = vec![
            ProductKey::new("58", "Gekkeikan Black & Gold Sake", "750mL"),
            ProductKey::new("1004", "Jim Beam w/2 Rocks Glasses", "750mL"),
            ProductKey::new("58", "Gekkeikan Black & Gold Sake", "1.5L"),
        ];
        keys.sort();
        assert_eq!(keys[0].brand, "1004");
        assert_eq!(keys[1].size, "1.5L");
        assert_eq!(keys[2].size, "750mL");
    }
}
