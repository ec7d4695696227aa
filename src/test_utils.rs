//! Shared test utilities for `CashRegister`.
//!
//! Helpers for building drafts, catalogs and shops backed by an in-memory store.

#![allow(clippy::expect_used)]

use crate::{
    core::{catalog::ProductCatalog, catalog::ProductDraft, money::Money, shop::Shop},
    errors::Result,
    storage::{MemoryStore, layout::STORE_SIZE},
};

/// A validated draft; fixture names are expected to be valid.
pub fn draft(name: &str, cents: u64, has_deposit: bool) -> ProductDraft {
    ProductDraft::new(name, Money::from_cents(cents), has_deposit).expect("valid fixture name")
}

/// Brezel at 2.00 without deposit, Fanta at 2.50 with deposit.
pub fn brezel_and_fanta_drafts() -> Vec<ProductDraft> {
    vec![draft("Brezel", 200, false), draft("Fanta", 250, true)]
}

/// A catalog holding [`brezel_and_fanta_drafts`], with ids 1 and 2.
pub fn brezel_and_fanta() -> ProductCatalog {
    let mut catalog = ProductCatalog::new();
    catalog.seed_defaults(&brezel_and_fanta_drafts());
    catalog
}

/// Boots a shop on an erased in-memory store, seeding it with `drafts`.
pub fn shop_with(drafts: &[ProductDraft]) -> Result<Shop<MemoryStore>> {
    let (shop, _) = Shop::boot(MemoryStore::erased(STORE_SIZE), drafts)?;
    Ok(shop)
}
