//! Cart state - per-product quantities of the transaction in progress.
//!
//! Quantities live on the catalog entries and are never persisted; a reload
//! from storage, a clear or a submitted sale zeroes them.

use crate::{
    core::catalog::ProductCatalog,
    errors::{Error, Result},
};

/// A positive number of units to add to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// # Errors
    /// Returns [`Error::InvalidQuantity`] unless `quantity` is in `1..=u32::MAX`.
    pub fn new(quantity: i64) -> Result<Self> {
        u32::try_from(quantity)
            .ok()
            .filter(|&q| q > 0)
            .map(Self)
            .ok_or(Error::InvalidQuantity { quantity })
    }

    /// Number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl ProductCatalog {
    /// Adds `quantity` units of the product at `index`. There is no upper bound;
    /// the count saturates rather than wrapping. Returns the new cart quantity.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] for a missing slot.
    pub fn add_quantity(&mut self, index: usize, quantity: Quantity) -> Result<u32> {
        let product = self.slot_mut(index)?;
        product.cart_quantity = product.cart_quantity.saturating_add(quantity.get());
        Ok(product.cart_quantity)
    }

    /// Takes one unit of the product at `index` out of the cart.
    /// Already at zero is a no-op, not an error. Returns the new cart quantity.
    pub fn remove_one(&mut self, index: usize) -> Result<u32> {
        let product = self.slot_mut(index)?;
        product.cart_quantity = product.cart_quantity.saturating_sub(1);
        Ok(product.cart_quantity)
    }

    /// Empties the cart.
    pub fn clear_all(&mut self) {
        for product in self.products_mut() {
            product.cart_quantity = 0;
        }
    }

    /// Total units across the cart.
    #[must_use]
    pub fn cart_items(&self) -> u64 {
        self.products()
            .iter()
            .map(|p| u64::from(p.cart_quantity))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::brezel_and_fanta;

    #[test]
    fn test_quantity_must_be_positive() {
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
        assert!(matches!(
            Quantity::new(0).unwrap_err(),
            Error::InvalidQuantity { quantity: 0 }
        ));
        assert!(Quantity::new(-2).is_err());
        assert!(Quantity::new(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_add_quantity_accumulates() -> Result<()> {
        let mut catalog = brezel_and_fanta();
        catalog.add_quantity(0, Quantity::new(2)?)?;
        assert_eq!(catalog.add_quantity(0, Quantity::new(3)?)?, 5);
        assert_eq!(catalog.cart_items(), 5);
        Ok(())
    }

    #[test]
    fn test_add_quantity_has_no_upper_bound() -> Result<()> {
        let mut catalog = brezel_and_fanta();
        catalog.add_quantity(1, Quantity::new(i64::from(u32::MAX))?)?;
        assert_eq!(catalog.add_quantity(1, Quantity::ONE)?, u32::MAX);
        Ok(())
    }

    #[test]
    fn test_add_quantity_rejects_bad_index() {
        let mut catalog = brezel_and_fanta();
        assert!(matches!(
            catalog.add_quantity(2, Quantity::ONE).unwrap_err(),
            Error::IndexOutOfRange { index: 2, len: 2 }
        ));
    }

    #[test]
    fn test_remove_one_floors_at_zero() -> Result<()> {
        let mut catalog = brezel_and_fanta();
        catalog.add_quantity(0, Quantity::ONE)?;

        assert_eq!(catalog.remove_one(0)?, 0);
        assert_eq!(catalog.remove_one(0)?, 0);
        assert_eq!(catalog.remove_one(1)?, 0);
        assert!(catalog.remove_one(5).is_err());
        Ok(())
    }

    #[test]
    fn test_clear_all() -> Result<()> {
        let mut catalog = brezel_and_fanta();
        catalog.add_quantity(0, Quantity::new(2)?)?;
        catalog.add_quantity(1, Quantity::new(4)?)?;

        catalog.clear_all();
        assert_eq!(catalog.cart_items(), 0);
        assert_eq!(catalog.total().cents(), 0);
        Ok(())
    }
}
