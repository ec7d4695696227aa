//! Sales ledger - cumulative sold counts per product.
//!
//! Counts are keyed by [`ProductId`] and written to the store in catalog order,
//! one entry per catalog slot. Only the running totals survive; individual
//! sales are not recorded.

use crate::{
    core::catalog::{ProductCatalog, ProductId},
    errors::Result,
    storage::{
        PersistentStore, Record,
        layout::{
            LAYOUT_VERSION, LEDGER_ENTRIES_OFFSET, LEDGER_ENTRY_SIZE, LEDGER_OFFSET, LedgerHeader,
            RegionState, read_u32, region_checksum,
        },
    },
};
use std::collections::BTreeMap;

/// Persisted `(id, sold)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LedgerEntry {
    id: u32,
    sold: u32,
}

impl Record for LedgerEntry {
    const SIZE: usize = LEDGER_ENTRY_SIZE;

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.sold.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            id: read_u32(buf, 0),
            sold: read_u32(buf, 4),
        }
    }
}

/// How [`SalesLedger::load`] found the ledger region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLoad {
    /// Valid ledger read from the store.
    Loaded,
    /// Blank region.
    Uninitialized,
    /// Rejected region, with the reason.
    Corrupt(String),
}

/// One line of the sales overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRow {
    /// Product name
    pub name: String,
    /// Units sold since the last reset
    pub sold: u32,
}

/// Cumulative units sold per product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesLedger {
    counts: BTreeMap<ProductId, u32>,
}

impl SalesLedger {
    /// A ledger with a zero count for every product in `catalog`.
    #[must_use]
    pub fn zeroed(catalog: &ProductCatalog) -> Self {
        Self {
            counts: catalog.products().iter().map(|p| (p.id, 0)).collect(),
        }
    }

    /// Reads the ledger region and aligns it with `catalog`: counts for ids no
    /// longer in the catalog are dropped, products without a count start at 0.
    /// An unreadable region yields an all-zero ledger.
    ///
    /// # Errors
    /// Returns a storage error only if the region cannot be read at all.
    pub fn load<S: PersistentStore>(
        store: &S,
        catalog: &ProductCatalog,
    ) -> Result<(Self, LedgerLoad)> {
        let header: LedgerHeader = store.read_record(LEDGER_OFFSET)?;
        let outcome = match header.state() {
            RegionState::Plausible => None,
            RegionState::Uninitialized => Some(LedgerLoad::Uninitialized),
            RegionState::LengthOutOfRange(len) => Some(LedgerLoad::Corrupt(format!(
                "ledger length byte {len} out of range"
            ))),
            RegionState::VersionMismatch(version) => Some(LedgerLoad::Corrupt(format!(
                "ledger layout version {version} unsupported"
            ))),
        };
        if let Some(outcome) = outcome {
            return Ok((Self::zeroed(catalog), outcome));
        }

        let mut payload = vec![0u8; usize::from(header.len) * LedgerEntry::SIZE];
        store.read_bytes(LEDGER_ENTRIES_OFFSET, &mut payload)?;
        if checksum(header.len, &payload) != header.checksum {
            return Ok((
                Self::zeroed(catalog),
                LedgerLoad::Corrupt("ledger checksum mismatch".to_string()),
            ));
        }

        let stored: BTreeMap<ProductId, u32> = payload
            .chunks_exact(LedgerEntry::SIZE)
            .map(LedgerEntry::decode)
            .map(|entry| (ProductId(entry.id), entry.sold))
            .collect();

        let counts = catalog
            .products()
            .iter()
            .map(|p| (p.id, stored.get(&p.id).copied().unwrap_or(0)))
            .collect();

        Ok((Self { counts }, LedgerLoad::Loaded))
    }

    /// Writes one entry per catalog slot, in slot order. Does not commit.
    ///
    /// # Errors
    /// Returns a storage error if the entries do not fit the region.
    pub fn persist<S: PersistentStore>(
        &self,
        store: &mut S,
        catalog: &ProductCatalog,
    ) -> Result<()> {
        let mut payload = vec![0u8; catalog.len() * LedgerEntry::SIZE];
        for (product, chunk) in catalog
            .products()
            .iter()
            .zip(payload.chunks_exact_mut(LedgerEntry::SIZE))
        {
            LedgerEntry {
                id: product.id.0,
                sold: self.sold(product.id),
            }
            .encode(chunk);
        }

        let len = u8::try_from(catalog.len()).unwrap_or(u8::MAX);
        let header = LedgerHeader {
            len,
            version: LAYOUT_VERSION,
            checksum: checksum(len, &payload),
        };
        store.write_record(LEDGER_OFFSET, &header)?;
        store.write_bytes(LEDGER_ENTRIES_OFFSET, &payload)
    }

    /// Finalizes a sale: moves every cart quantity into the running counts and
    /// empties the cart. Returns the number of units moved.
    pub fn accumulate(&mut self, catalog: &mut ProductCatalog) -> u64 {
        let mut moved = 0u64;
        for product in catalog.products_mut() {
            if product.cart_quantity > 0 {
                let count = self.counts.entry(product.id).or_insert(0);
                *count = count.saturating_add(product.cart_quantity);
                moved += u64::from(product.cart_quantity);
            }
            product.cart_quantity = 0;
        }
        moved
    }

    /// Zeroes every count.
    pub fn reset(&mut self) {
        for count in self.counts.values_mut() {
            *count = 0;
        }
    }

    /// Drops the count of a product that left the catalog.
    pub fn remove(&mut self, id: ProductId) -> Option<u32> {
        self.counts.remove(&id)
    }

    /// Starts tracking a product that joined the catalog.
    pub fn track(&mut self, id: ProductId) {
        self.counts.entry(id).or_insert(0);
    }

    /// Units sold of `id`, 0 if unknown.
    #[must_use]
    pub fn sold(&self, id: ProductId) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Counts in catalog slot order.
    #[must_use]
    pub fn counts_in(&self, catalog: &ProductCatalog) -> Vec<u32> {
        catalog.products().iter().map(|p| self.sold(p.id)).collect()
    }

    /// Sales overview rows in catalog slot order.
    #[must_use]
    pub fn rows(&self, catalog: &ProductCatalog) -> Vec<SalesRow> {
        catalog
            .products()
            .iter()
            .map(|p| SalesRow {
                name: p.name.clone(),
                sold: self.sold(p.id),
            })
            .collect()
    }

    /// Sales overview as CSV with a header line.
    #[must_use]
    pub fn export_csv(&self, catalog: &ProductCatalog) -> String {
        let mut csv = String::from("Product,Sold\n");
        for row in self.rows(catalog) {
            csv.push_str(&format!("{},{}\n", csv_field(&row.name), row.sold));
        }
        csv
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn checksum(len: u8, payload: &[u8]) -> u32 {
    region_checksum(&[len, LAYOUT_VERSION], payload)
}
