//! Read-only views handed to the presentation layer.

use crate::core::{
    catalog::{DEPOSIT_UNIT, Product, ProductCatalog},
    ledger::{SalesLedger, SalesRow},
    money::Money,
};

/// One catalog slot as the sale and admin pages see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Slot index, as used by the cart and admin requests
    pub index: usize,
    /// Product name
    pub name: String,
    /// Unit price without deposit
    pub price: Money,
    /// Whether a deposit is charged per unit
    pub has_deposit: bool,
    /// Units in the cart
    pub quantity: u32,
}

/// Catalog plus cart at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    /// One line per catalog slot
    pub lines: Vec<CartLine>,
    /// Amount due, deposit included
    pub total: Money,
    /// Deposit share of `total`
    pub deposit_total: Money,
    /// Deposit charged per unit
    pub deposit_unit: Money,
    /// Products that can still be added to the catalog
    pub capacity_left: usize,
}

impl CartSnapshot {
    /// Captures `catalog` with its cart, given the catalog capacity.
    #[must_use]
    pub fn of(catalog: &ProductCatalog, capacity: usize) -> Self {
        Self {
            lines: catalog
                .products()
                .iter()
                .enumerate()
                .map(|(index, product)| CartLine::of(index, product))
                .collect(),
            total: catalog.total(),
            deposit_total: catalog.deposit_total(),
            deposit_unit: DEPOSIT_UNIT,
            capacity_left: capacity.saturating_sub(catalog.len()),
        }
    }
}

impl CartLine {
    fn of(index: usize, product: &Product) -> Self {
        Self {
            index,
            name: product.name.clone(),
            price: product.price,
            has_deposit: product.has_deposit,
            quantity: product.cart_quantity,
        }
    }
}

/// Cumulative sales at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesReport {
    /// One row per product, in catalog order
    pub rows: Vec<SalesRow>,
}

impl SalesReport {
    /// Captures the counts of every product in `catalog`.
    #[must_use]
    pub fn of(ledger: &SalesLedger, catalog: &ProductCatalog) -> Self {
        Self {
            rows: ledger.rows(catalog),
        }
    }

    /// Units sold across all products.
    #[must_use]
    pub fn total_sold(&self) -> u64 {
        self.rows.iter().map(|r| u64::from(r.sold)).sum()
    }
}
