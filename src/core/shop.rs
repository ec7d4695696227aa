//! The register's state owner.
//!
//! `Shop` owns the store, the catalog (with its embedded cart) and the sales
//! ledger. It is built once at boot and handed to the dispatcher; nothing else
//! holds a reference to this state. Every mutation that touches durable data
//! persists the affected regions and commits before it returns.

use crate::{
    core::{
        cart::Quantity,
        catalog::{CatalogLoad, Product, ProductCatalog, ProductDraft, ProductId},
        ledger::{LedgerLoad, SalesLedger},
        money::Money,
        snapshot::{CartSnapshot, SalesReport},
    },
    errors::Result,
    storage::{PersistentStore, layout::MAX_PRODUCTS},
};
use tracing::{debug, info, instrument, warn};

/// Why the catalog was seeded instead of loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedReason {
    /// The catalog region was blank.
    Uninitialized,
    /// The catalog region was rejected, with the reason.
    Corrupt(String),
}

/// Where the catalog came from at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootSource {
    /// Loaded from the store.
    Stored,
    /// Replaced by the seed list.
    Seeded(SeedReason),
}

/// What [`Shop::boot`] found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    /// Where the catalog came from
    pub source: BootSource,
    /// Catalog length after boot
    pub products: usize,
    /// Set when the ledger region was blank or rejected and had to be zeroed.
    pub ledger_reset: Option<String>,
}

/// Edit of an existing slot from the admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEdit {
    /// Slot being edited
    pub index: usize,
    /// New name, validated before anything is applied
    pub name: String,
    /// `None` keeps the current price.
    pub price: Option<Money>,
    /// New deposit flag
    pub has_deposit: bool,
}

/// One admin save: any number of slot edits plus at most one new product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEdit {
    /// Edits of existing slots
    pub slots: Vec<SlotEdit>,
    /// Product to add after the edits
    pub append: Option<ProductDraft>,
}

/// Result of [`Shop::apply_edit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// Slots that were rewritten
    pub updated: usize,
    /// Id of the added product, if any
    pub appended: Option<ProductId>,
    /// The new product was dropped because the catalog is full.
    pub append_dropped: bool,
}

/// Owns the store, the catalog with its cart, and the sales ledger.
#[derive(Debug)]
pub struct Shop<S: PersistentStore> {
    store: S,
    catalog: ProductCatalog,
    ledger: SalesLedger,
}

impl<S: PersistentStore> Shop<S> {
    /// Loads catalog and ledger from `store`, seeding `defaults` when the
    /// catalog region is blank or fails validation.
    ///
    /// # Errors
    /// Returns a storage error if the store cannot be read or the seeded
    /// regions cannot be committed.
    #[instrument(skip_all)]
    pub fn boot(mut store: S, defaults: &[ProductDraft]) -> Result<(Self, BootReport)> {
        let (mut catalog, load) = ProductCatalog::load(&store)?;

        let reason = match load {
            CatalogLoad::Loaded => None,
            CatalogLoad::Uninitialized => {
                info!("Store is blank, seeding {} default products", defaults.len());
                Some(SeedReason::Uninitialized)
            }
            CatalogLoad::Corrupt(why) => {
                warn!("Stored catalog rejected ({why}), seeding default products");
                Some(SeedReason::Corrupt(why))
            }
        };

        if let Some(reason) = reason {
            catalog.seed_defaults(defaults);
            let ledger = SalesLedger::zeroed(&catalog);
            catalog.persist(&mut store)?;
            ledger.persist(&mut store, &catalog)?;
            store.commit()?;

            let report = BootReport {
                source: BootSource::Seeded(reason),
                products: catalog.len(),
                ledger_reset: None,
            };
            return Ok((
                Self {
                    store,
                    catalog,
                    ledger,
                },
                report,
            ));
        }

        let (ledger, ledger_load) = SalesLedger::load(&store, &catalog)?;
        let ledger_reset = match ledger_load {
            LedgerLoad::Loaded => None,
            LedgerLoad::Uninitialized => Some("ledger region blank".to_string()),
            LedgerLoad::Corrupt(why) => Some(why),
        };
        if let Some(why) = &ledger_reset {
            warn!("Sales ledger unusable ({why}), starting from zero");
            ledger.persist(&mut store, &catalog)?;
            store.commit()?;
        }

        info!("Loaded {} products from store", catalog.len());
        let report = BootReport {
            source: BootSource::Stored,
            products: catalog.len(),
            ledger_reset,
        };
        Ok((
            Self {
                store,
                catalog,
                ledger,
            },
            report,
        ))
    }

    /// Catalog with the current cart.
    #[must_use]
    pub const fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Cumulative sales counts.
    #[must_use]
    pub const fn ledger(&self) -> &SalesLedger {
        &self.ledger
    }

    /// Backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Gives the store back, e.g. to boot again after a restart.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    // --- cart ---

    /// Adds `quantity` units of the product at slot `index`. Does not commit.
    ///
    /// # Errors
    /// Returns [`IndexOutOfRange`](crate::errors::Error::IndexOutOfRange) or
    /// [`InvalidQuantity`](crate::errors::Error::InvalidQuantity); the cart is
    /// unchanged either way.
    pub fn add_to_cart(&mut self, index: i64, quantity: i64) -> Result<u32> {
        let slot = self.catalog.resolve(index)?;
        let quantity = Quantity::new(quantity)?;
        let now = self.catalog.add_quantity(slot, quantity)?;
        debug!(slot, added = quantity.get(), now, "Cart quantity increased");
        Ok(now)
    }

    /// Takes one unit of the product at slot `index` out of the cart, stopping
    /// at zero. Does not commit.
    ///
    /// # Errors
    /// Returns [`IndexOutOfRange`](crate::errors::Error::IndexOutOfRange) for a missing slot.
    pub fn remove_from_cart(&mut self, index: i64) -> Result<u32> {
        let slot = self.catalog.resolve(index)?;
        let now = self.catalog.remove_one(slot)?;
        debug!(slot, now, "Cart quantity decreased");
        Ok(now)
    }

    /// Empties the cart. Does not commit.
    pub fn clear_cart(&mut self) {
        let dropped = self.catalog.cart_items();
        self.catalog.clear_all();
        debug!(dropped, "Cart cleared");
    }

    // --- ledger ---

    /// Finalizes the sale in the cart. Returns the number of units sold.
    ///
    /// # Errors
    /// Returns a storage error if the ledger cannot be committed.
    pub fn submit(&mut self) -> Result<u64> {
        let total = self.catalog.total();
        let moved = self.ledger.accumulate(&mut self.catalog);
        self.ledger.persist(&mut self.store, &self.catalog)?;
        self.store.commit()?;
        info!(units = moved, %total, "Sale recorded");
        Ok(moved)
    }

    /// Zeroes every sales count.
    ///
    /// # Errors
    /// Returns a storage error if the ledger cannot be committed.
    pub fn reset_sales(&mut self) -> Result<()> {
        self.ledger.reset();
        self.ledger.persist(&mut self.store, &self.catalog)?;
        self.store.commit()?;
        info!("Sales counts reset");
        Ok(())
    }

    // --- catalog ---

    /// Adds a product at the end of the catalog and commits.
    ///
    /// # Errors
    /// Returns [`CapacityExceeded`](crate::errors::Error::CapacityExceeded) on a
    /// full catalog, or a storage error from the commit.
    pub fn append_product(&mut self, draft: ProductDraft) -> Result<ProductId> {
        let id = self.catalog.append(draft)?;
        self.ledger.track(id);
        self.persist_all()?;
        info!(id = id.0, "Product added");
        Ok(id)
    }

    /// Rewrites the product at slot `index` and commits.
    ///
    /// # Errors
    /// Returns [`IndexOutOfRange`](crate::errors::Error::IndexOutOfRange) for a
    /// missing slot, or a storage error from the commit.
    pub fn update_product(&mut self, index: i64, draft: ProductDraft) -> Result<()> {
        let slot = self.catalog.resolve(index)?;
        self.catalog.update_at(slot, draft)?;
        self.catalog.persist(&mut self.store)?;
        self.store.commit()?;
        info!(slot, "Product updated");
        Ok(())
    }

    /// Removes a product and its sales count, keeping the ledger in step with
    /// the shortened catalog.
    ///
    /// # Errors
    /// Returns [`IndexOutOfRange`](crate::errors::Error::IndexOutOfRange) for a
    /// missing slot, or a storage error from the commit.
    pub fn delete_product(&mut self, index: i64) -> Result<Product> {
        let slot = self.catalog.resolve(index)?;
        let removed = self.catalog.delete_at(slot)?;
        let sold = self.ledger.remove(removed.id).unwrap_or(0);
        self.persist_all()?;
        info!(slot, name = %removed.name, sold, "Product deleted");
        Ok(removed)
    }

    /// Applies an admin save. Edits for slots that no longer exist are ignored;
    /// a new product that does not fit is dropped with a warning while the slot
    /// edits still apply.
    ///
    /// # Errors
    /// Returns [`InvalidName`](crate::errors::Error::InvalidName) if any edited name is invalid, in which
    /// case nothing is applied, or a storage error from the commit.
    pub fn apply_edit(&mut self, edit: CatalogEdit) -> Result<EditOutcome> {
        let mut drafts = Vec::with_capacity(edit.slots.len());
        for slot in edit.slots {
            let Some(current) = self.catalog.get(slot.index) else {
                debug!(index = slot.index, "Ignoring edit for missing slot");
                continue;
            };
            let price = slot.price.unwrap_or(current.price);
            drafts.push((
                slot.index,
                ProductDraft::new(&slot.name, price, slot.has_deposit)?,
            ));
        }

        let mut outcome = EditOutcome::default();
        for (index, draft) in drafts {
            self.catalog.update_at(index, draft)?;
            outcome.updated += 1;
        }

        if let Some(draft) = edit.append {
            if self.catalog.is_full() {
                warn!(
                    "Catalog full ({} products), new product dropped",
                    self.catalog.len()
                );
                outcome.append_dropped = true;
            } else {
                let id = self.catalog.append(draft)?;
                self.ledger.track(id);
                outcome.appended = Some(id);
            }
        }

        self.persist_all()?;
        info!(
            updated = outcome.updated,
            appended = outcome.appended.is_some(),
            "Catalog saved"
        );
        Ok(outcome)
    }

    // --- views ---

    /// Read-only view of catalog and cart.
    #[must_use]
    pub fn cart_snapshot(&self) -> CartSnapshot {
        CartSnapshot::of(&self.catalog, MAX_PRODUCTS)
    }

    /// Read-only view of the sales counts.
    #[must_use]
    pub fn sales_report(&self) -> SalesReport {
        SalesReport::of(&self.ledger, &self.catalog)
    }

    /// Sales counts as CSV, header `Product,Sold`.
    #[must_use]
    pub fn export_csv(&self) -> String {
        self.ledger.export_csv(&self.catalog)
    }

    fn persist_all(&mut self) -> Result<()> {
        self.catalog.persist(&mut self.store)?;
        self.ledger.persist(&mut self.store, &self.catalog)?;
        self.store.commit()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        config::products::builtin_products,
        errors::Error,
        storage::{
            MemoryStore,
            layout::{CATALOG_OFFSET, STORE_SIZE},
        },
        test_utils::{brezel_and_fanta_drafts, draft, shop_with},
    };

    #[test]
    fn test_boot_on_blank_store_seeds_defaults() -> Result<()> {
        let (shop, report) = Shop::boot(MemoryStore::erased(STORE_SIZE), &builtin_products())?;

        assert_eq!(
            report.source,
            BootSource::Seeded(SeedReason::Uninitialized)
        );
        assert_eq!(shop.catalog().len(), 9);
        assert_eq!(shop.ledger().counts_in(shop.catalog()), vec![0; 9]);
        assert_eq!(shop.store().commits(), 1);
        Ok(())
    }

    #[test]
    fn test_boot_with_length_byte_255_seeds_nine_defaults() -> Result<()> {
        let mut store = MemoryStore::zeroed(STORE_SIZE);
        store.write_byte(CATALOG_OFFSET, 255)?;

        let (shop, report) = Shop::boot(store, &builtin_products())?;
        assert!(matches!(report.source, BootSource::Seeded(_)));
        assert_eq!(shop.catalog().len(), 9);
        assert!(shop.ledger().counts_in(shop.catalog()).iter().all(|&c| c == 0));
        Ok(())
    }

    #[test]
    fn test_boot_on_garbage_reports_corruption() -> Result<()> {
        let mut store = MemoryStore::zeroed(STORE_SIZE);
        store.write_byte(CATALOG_OFFSET, 30)?;

        let (_, report) = Shop::boot(store, &builtin_products())?;
        assert!(matches!(
            report.source,
            BootSource::Seeded(SeedReason::Corrupt(_))
        ));
        Ok(())
    }

    #[test]
    fn test_reboot_restores_catalog_and_sales() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        shop.add_to_cart(0, 2)?;
        shop.add_to_cart(1, 1)?;
        shop.submit()?;
        shop.add_to_cart(1, 3)?;

        let (rebooted, report) = Shop::boot(shop.into_store(), &builtin_products())?;
        assert_eq!(report.source, BootSource::Stored);
        assert_eq!(report.ledger_reset, None);
        assert_eq!(rebooted.catalog().len(), 2);
        assert_eq!(rebooted.ledger().counts_in(rebooted.catalog()), vec![2, 1]);
        assert_eq!(rebooted.catalog().cart_items(), 0);
        Ok(())
    }

    #[test]
    fn test_brezel_fanta_sale() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        shop.add_to_cart(0, 2)?;
        shop.add_to_cart(1, 1)?;

        let snapshot = shop.cart_snapshot();
        assert_eq!(snapshot.total, Money::from_cents(750));
        assert_eq!(snapshot.deposit_total, Money::from_cents(100));

        let commits = shop.store().commits();
        assert_eq!(shop.submit()?, 3);
        assert_eq!(shop.store().commits(), commits + 1);
        assert_eq!(shop.ledger().counts_in(shop.catalog()), vec![2, 1]);
        assert_eq!(shop.catalog().cart_items(), 0);
        Ok(())
    }

    #[test]
    fn test_cart_changes_do_not_commit() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        let commits = shop.store().commits();

        shop.add_to_cart(0, 1)?;
        shop.remove_from_cart(0)?;
        shop.remove_from_cart(0)?;
        shop.clear_cart();

        assert_eq!(shop.store().commits(), commits);
        Ok(())
    }

    #[test]
    fn test_add_to_cart_validation() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        assert!(matches!(
            shop.add_to_cart(5, 1).unwrap_err(),
            Error::IndexOutOfRange { index: 5, len: 2 }
        ));
        assert!(matches!(
            shop.add_to_cart(0, 0).unwrap_err(),
            Error::InvalidQuantity { quantity: 0 }
        ));
        assert_eq!(shop.catalog().cart_items(), 0);
        Ok(())
    }

    #[test]
    fn test_reset_sales_persists_zeroes() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        shop.add_to_cart(0, 4)?;
        shop.submit()?;
        shop.reset_sales()?;

        let (rebooted, _) = Shop::boot(shop.into_store(), &[])?;
        assert_eq!(rebooted.ledger().counts_in(rebooted.catalog()), vec![0, 0]);
        Ok(())
    }

    #[test]
    fn test_delete_keeps_ledger_in_step() -> Result<()> {
        let mut shop = shop_with(&[
            draft("Brezel", 200, false),
            draft("Fanta", 250, true),
            draft("Cola", 250, true),
        ])?;
        shop.add_to_cart(0, 1)?;
        shop.add_to_cart(1, 2)?;
        shop.add_to_cart(2, 3)?;
        shop.submit()?;

        let removed = shop.delete_product(1)?;
        assert_eq!(removed.name, "Fanta");
        assert_eq!(shop.catalog().len(), 2);
        assert_eq!(shop.ledger().counts_in(shop.catalog()), vec![1, 3]);

        let (rebooted, _) = Shop::boot(shop.into_store(), &[])?;
        let names: Vec<&str> = rebooted
            .catalog()
            .products()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Brezel", "Cola"]);
        assert_eq!(rebooted.ledger().counts_in(rebooted.catalog()), vec![1, 3]);
        Ok(())
    }

    #[test]
    fn test_delete_rejects_bad_index_without_commit() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        let commits = shop.store().commits();
        assert!(shop.delete_product(-1).is_err());
        assert!(shop.delete_product(2).is_err());
        assert_eq!(shop.store().commits(), commits);
        assert_eq!(shop.catalog().len(), 2);
        Ok(())
    }

    #[test]
    fn test_append_and_update_persist() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        shop.append_product(draft("Cola", 250, true))?;
        shop.update_product(0, draft("Brezel XL", 300, false))?;

        let (rebooted, _) = Shop::boot(shop.into_store(), &[])?;
        assert_eq!(rebooted.catalog().len(), 3);
        assert_eq!(rebooted.catalog().products()[0].name, "Brezel XL");
        assert_eq!(rebooted.catalog().products()[2].name, "Cola");
        Ok(())
    }

    #[test]
    fn test_apply_edit_updates_and_appends() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        shop.add_to_cart(1, 2)?;

        let outcome = shop.apply_edit(CatalogEdit {
            slots: vec![
                SlotEdit {
                    index: 1,
                    name: "Fanta Zero".to_string(),
                    price: None,
                    has_deposit: false,
                },
                SlotEdit {
                    index: 7,
                    name: "Ghost".to_string(),
                    price: Some(Money::from_cents(1)),
                    has_deposit: false,
                },
            ],
            append: Some(draft("Sekt", 300, true)),
        })?;

        assert_eq!(outcome.updated, 1);
        assert!(outcome.appended.is_some());
        let fanta = &shop.catalog().products()[1];
        assert_eq!(fanta.name, "Fanta Zero");
        assert_eq!(fanta.price, Money::from_cents(250));
        assert!(!fanta.has_deposit);
        assert_eq!(fanta.cart_quantity, 2);
        assert_eq!(shop.catalog().len(), 3);
        Ok(())
    }

    #[test]
    fn test_apply_edit_drops_append_when_full() -> Result<()> {
        let drafts: Vec<ProductDraft> = (0..MAX_PRODUCTS)
            .map(|i| draft(&format!("Item {i}"), 100, false))
            .collect();
        let mut shop = shop_with(&drafts)?;

        let outcome = shop.apply_edit(CatalogEdit {
            slots: vec![SlotEdit {
                index: 0,
                name: "First".to_string(),
                price: Some(Money::from_cents(50)),
                has_deposit: true,
            }],
            append: Some(draft("Overflow", 100, false)),
        })?;

        assert!(outcome.append_dropped);
        assert_eq!(outcome.updated, 1);
        assert_eq!(shop.catalog().len(), MAX_PRODUCTS);
        assert_eq!(shop.catalog().products()[0].name, "First");
        Ok(())
    }

    #[test]
    fn test_apply_edit_with_control_character_changes_nothing() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        let commits = shop.store().commits();

        let result = shop.apply_edit(CatalogEdit {
            slots: vec![
                SlotEdit {
                    index: 1,
                    name: "Fanta Zero".to_string(),
                    price: None,
                    has_deposit: true,
                },
                SlotEdit {
                    index: 0,
                    name: "Kaffee\0Kuchen".to_string(),
                    price: None,
                    has_deposit: false,
                },
            ],
            append: None,
        });

        assert!(matches!(result.unwrap_err(), Error::InvalidName));
        assert_eq!(shop.store().commits(), commits);
        assert_eq!(shop.catalog().products()[1].name, "Fanta");

        let (rebooted, _) = Shop::boot(shop.into_store(), &[])?;
        assert_eq!(rebooted.catalog().products()[0].name, "Brezel");
        Ok(())
    }

    #[test]
    fn test_catalog_is_identical_after_reboot() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        shop.append_product(ProductDraft::new(
            &"ä".repeat(20),
            Money::from_cents(120),
            true,
        )?)?;
        shop.update_product(
            0,
            ProductDraft::new(
                "  Laugenbrezel mit Butter und Salz  ",
                Money::from_cents(260),
                false,
            )?,
        )?;
        let before: Vec<(ProductId, String, Money, bool)> = shop
            .catalog()
            .products()
            .iter()
            .map(|p| (p.id, p.name.clone(), p.price, p.has_deposit))
            .collect();

        let (rebooted, _) = Shop::boot(shop.into_store(), &[])?;
        let after: Vec<(ProductId, String, Money, bool)> = rebooted
            .catalog()
            .products()
            .iter()
            .map(|p| (p.id, p.name.clone(), p.price, p.has_deposit))
            .collect();
        assert_eq!(after, before);
        Ok(())
    }

    #[test]
    fn test_boot_zeroes_corrupt_ledger_but_keeps_catalog() -> Result<()> {
        let mut shop = shop_with(&brezel_and_fanta_drafts())?;
        shop.add_to_cart(0, 2)?;
        shop.submit()?;
        let mut store = shop.into_store();
        store.write_byte(crate::storage::layout::LEDGER_ENTRIES_OFFSET + 4, 0x7F)?;

        let (rebooted, report) = Shop::boot(store, &[])?;
        assert_eq!(report.source, BootSource::Stored);
        assert!(report.ledger_reset.is_some());
        assert_eq!(rebooted.catalog().len(), 2);
        assert_eq!(rebooted.ledger().counts_in(rebooted.catalog()), vec![0, 0]);
        Ok(())
    }
}
