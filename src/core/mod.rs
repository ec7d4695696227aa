//! Core register logic - framework-agnostic catalog, cart, ledger and state ownership.

/// Transient per-product cart quantities
pub mod cart;
/// Bounded, ordered product catalog and its persisted records
pub mod catalog;
/// Cumulative sales counts keyed by product id
pub mod ledger;
/// Fixed-point money
pub mod money;
/// State owner tying catalog, ledger and store together
pub mod shop;
/// Read-only views for the presentation layer
pub mod snapshot;
