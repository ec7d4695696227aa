//! Seed product configuration loading from config.toml
//!
//! The products listed here are written into the catalog only when the store
//! holds no usable catalog: on first boot, or after the stored bytes were
//! rejected. When no config file exists the built-in list is used.

use crate::{
    core::{catalog::ProductDraft, money::Money},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Products to seed, in display order
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// Configuration for a single seed product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Display name, cut to 29 bytes
    pub name: String,
    /// Unit price, e.g. 2.50
    pub price: f64,
    /// Whether the deposit unit is charged on top
    #[serde(default)]
    pub has_deposit: bool,
}

impl ProductConfig {
    /// Validates the entry into a catalog draft.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the product if its price or name is invalid.
    pub fn to_draft(&self) -> Result<ProductDraft> {
        let price = Money::from_decimal(self.price).map_err(|_| Error::Config {
            message: format!("Invalid price {} for product '{}'", self.price, self.name),
        })?;
        ProductDraft::new(&self.name, price, self.has_deposit).map_err(|e| Error::Config {
            message: format!("Invalid product '{}': {e}", self.name),
        })
    }
}

/// The list the register ships with.
#[must_use]
pub fn builtin_products() -> Vec<ProductDraft> {
    [
        ("Brezel", 200, false),
        ("Fanta", 250, true),
        ("Cola", 250, true),
        ("Spezi", 300, true),
        ("Apfelschorle", 300, true),
        ("Ensinger Medium", 200, true),
        ("Ensinger Still", 200, true),
        ("Bier", 300, true),
        ("Sekt", 300, true),
    ]
    .into_iter()
    .filter_map(|(name, cents, has_deposit)| {
        ProductDraft::new(name, Money::from_cents(cents), has_deposit).ok()
    })
    .collect()
}

/// Parses seed products from TOML text.
pub fn parse_products(contents: &str) -> Result<Vec<ProductDraft>> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse products config: {e}"),
    })?;
    config.products.iter().map(ProductConfig::to_draft).collect()
}

/// Loads seed products from `path`, falling back to [`builtin_products`] when
/// the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read, is not valid TOML,
/// or lists a product with an empty name or an invalid price.
pub fn load_seed_products<P: AsRef<Path>>(path: P) -> Result<Vec<ProductDraft>> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No products config at {path:?}, using built-in products");
            return Ok(builtin_products());
        }
        Err(e) => {
            return Err(Error::Config {
                message: format!("Failed to read products config {path:?}: {e}"),
            });
        }
    };

    let products = parse_products(&contents)?;
    debug!("Loaded {} seed products from {path:?}", products.len());
    Ok(products)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_products_config() -> Result<()> {
        let toml_str = r#"
            [[products]]
            name = "Waffel"
            price = 1.5

            [[products]]
            name = "Apfelsaft"
            price = 2.25
            has_deposit = true
        "#;

        let products = parse_products(toml_str)?;
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name(), "Waffel");
        assert_eq!(products[0].price(), Money::from_cents(150));
        assert!(!products[0].has_deposit());
        assert_eq!(products[1].price(), Money::from_cents(225));
        assert!(products[1].has_deposit());
        Ok(())
    }

    #[test]
    fn test_parse_rejects_negative_price() {
        let toml_str = r#"
            [[products]]
            name = "Gift"
            price = -1.0
        "#;
        assert!(matches!(
            parse_products(toml_str).unwrap_err(),
            Error::Config { .. }
        ));
    }

    #[test]
    fn test_parse_rejects_blank_name() {
        let toml_str = r#"
            [[products]]
            name = "  "
            price = 1.0
        "#;
        assert!(parse_products(toml_str).is_err());
    }

    #[test]
    fn test_missing_file_uses_builtin() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let products = load_seed_products(dir.path().join("config.toml"))?;
        assert_eq!(products, builtin_products());
        Ok(())
    }

    #[test]
    fn test_builtin_products() {
        let products = builtin_products();
        assert_eq!(products.len(), 9);
        assert_eq!(products[0].name(), "Brezel");
        assert!(!products[0].has_deposit());
        assert!(products[1..].iter().all(ProductDraft::has_deposit));
    }
}
