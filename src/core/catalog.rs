//! Product catalog - the bounded, ordered list of sellable products.
//!
//! Slot order is what the sale and admin pages show and what form fields are
//! keyed by. Sales counts are keyed by [`ProductId`] instead, so editing or
//! deleting slots never shifts counts onto the wrong product.

use crate::{
    core::money::Money,
    errors::{Error, Result},
    storage::{
        PersistentStore, Record,
        layout::{
            CATALOG_OFFSET, CATALOG_RECORDS_OFFSET, CatalogHeader, LAYOUT_VERSION, MAX_PRODUCTS,
            PRODUCT_RECORD_SIZE, RegionState, read_u32, region_checksum,
        },
    },
};
use tracing::debug;

/// Longest stored product name in bytes (the record reserves one more for the terminator).
pub const NAME_LIMIT: usize = 29;

/// Surcharge added per unit of a deposit-bearing product.
pub const DEPOSIT_UNIT: Money = Money::from_cents(100);

/// Stable identity of a product, independent of its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductId(pub u32);

/// A sellable product plus its transient cart quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Stable identity used by the sales ledger
    pub id: ProductId,
    /// Normalized display name
    pub name: String,
    /// Unit price without deposit
    pub price: Money,
    /// Whether [`DEPOSIT_UNIT`] is charged per unit
    pub has_deposit: bool,
    /// Units in the current transaction; never persisted.
    pub cart_quantity: u32,
}

impl Product {
    /// Cart quantity times unit price, deposit excluded.
    #[must_use]
    pub const fn line_price(&self) -> Money {
        self.price.times(self.cart_quantity)
    }

    /// Cart quantity times the deposit unit, zero for products without deposit.
    #[must_use]
    pub const fn line_deposit(&self) -> Money {
        if self.has_deposit {
            DEPOSIT_UNIT.times(self.cart_quantity)
        } else {
            Money::ZERO
        }
    }
}

/// Validated product fields, as entered by an operator or a seed list.
///
/// Only [`ProductDraft::new`] builds one, so every name reaching the catalog
/// already fits a product record unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    name: String,
    price: Money,
    has_deposit: bool,
}

impl ProductDraft {
    /// Validates `name` through [`normalize_name`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidName`] if the name is empty after trimming or
    /// contains control characters.
    pub fn new(name: &str, price: Money, has_deposit: bool) -> Result<Self> {
        Ok(Self {
            name: normalize_name(name)?,
            price,
            has_deposit,
        })
    }

    /// Normalized name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit price without deposit.
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// Whether the deposit unit is charged on top.
    #[must_use]
    pub const fn has_deposit(&self) -> bool {
        self.has_deposit
    }
}

/// Trims a product name and cuts it to [`NAME_LIMIT`] bytes on a char boundary.
///
/// # Errors
/// Returns [`Error::InvalidName`] if nothing is left after trimming, or if the
/// name contains a control character. A NUL would end the stored name early.
pub fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
        return Err(Error::InvalidName);
    }

    let mut end = trimmed.len().min(NAME_LIMIT);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    Ok(trimmed[..end].trim_end().to_string())
}

/// How [`ProductCatalog::load`] found the catalog region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLoad {
    /// Valid catalog read from the store.
    Loaded,
    /// Blank region; the caller should seed defaults.
    Uninitialized,
    /// Bytes present but not trustworthy; the caller should seed defaults and warn.
    Corrupt(String),
}

/// Persisted form of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProductRecord {
    id: u32,
    name: String,
    price_cents: u32,
    has_deposit: bool,
}

impl Record for ProductRecord {
    const SIZE: usize = PRODUCT_RECORD_SIZE;

    // [id u32][name 30 bytes, NUL padded][price cents u32][deposit u8][pad u8]
    fn encode(&self, buf: &mut [u8]) {
        buf.fill(0);
        buf[0..4].copy_from_slice(&self.id.to_le_bytes());
        let name = self.name.as_bytes();
        let len = name.len().min(NAME_LIMIT);
        buf[4..4 + len].copy_from_slice(&name[..len]);
        buf[34..38].copy_from_slice(&self.price_cents.to_le_bytes());
        buf[38] = u8::from(self.has_deposit);
    }

    fn decode(buf: &[u8]) -> Self {
        let name_bytes = &buf[4..34];
        let end = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name_bytes.len());
        Self {
            id: read_u32(buf, 0),
            name: String::from_utf8_lossy(&name_bytes[..end]).into_owned(),
            price_cents: read_u32(buf, 34),
            has_deposit: buf[38] != 0,
        }
    }
}

impl From<&Product> for ProductRecord {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.0,
            name: product.name.clone(),
            price_cents: u32::try_from(product.price.cents()).unwrap_or(u32::MAX),
            has_deposit: product.has_deposit,
        }
    }
}

impl From<ProductRecord> for Product {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: ProductId(record.id),
            name: record.name,
            price: Money::from_cents(u64::from(record.price_cents)),
            has_deposit: record.has_deposit,
            cart_quantity: 0,
        }
    }
}

/// Ordered, bounded product list with an id allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCatalog {
    products: Vec<Product>,
    next_id: u32,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductCatalog {
    /// An empty catalog whose first product gets id 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            products: Vec::new(),
            next_id: 1,
        }
    }

    /// Reads the catalog region. Anything that is not a valid, checksummed
    /// catalog yields an empty catalog and tells the caller why.
    ///
    /// # Errors
    /// Returns a storage error only if the region cannot be read at all.
    pub fn load<S: PersistentStore>(store: &S) -> Result<(Self, CatalogLoad)> {
        let header: CatalogHeader = store.read_record(CATALOG_OFFSET)?;
        match header.state() {
            RegionState::Plausible => {}
            RegionState::Uninitialized => return Ok((Self::new(), CatalogLoad::Uninitialized)),
            RegionState::LengthOutOfRange(len) => {
                return Ok((
                    Self::new(),
                    CatalogLoad::Corrupt(format!("catalog length byte {len} out of range")),
                ));
            }
            RegionState::VersionMismatch(version) => {
                return Ok((
                    Self::new(),
                    CatalogLoad::Corrupt(format!("catalog layout version {version} unsupported")),
                ));
            }
        }

        let len = usize::from(header.len);
        let mut payload = vec![0u8; len * ProductRecord::SIZE];
        store.read_bytes(CATALOG_RECORDS_OFFSET, &mut payload)?;

        if checksum(&header, &payload) != header.checksum {
            return Ok((
                Self::new(),
                CatalogLoad::Corrupt("catalog checksum mismatch".to_string()),
            ));
        }

        let products: Vec<Product> = payload
            .chunks_exact(ProductRecord::SIZE)
            .map(|chunk| Product::from(ProductRecord::decode(chunk)))
            .collect();

        // An id allocator behind an existing id would hand out duplicates.
        let highest = products.iter().map(|p| p.id.0).max().unwrap_or(0);
        let next_id = header.next_id.max(highest.saturating_add(1));

        debug!("Loaded {} products from store", products.len());
        Ok((Self { products, next_id }, CatalogLoad::Loaded))
    }

    /// Writes header and records. Does not commit.
    ///
    /// # Errors
    /// Returns a storage error if the records do not fit the region.
    pub fn persist<S: PersistentStore>(&self, store: &mut S) -> Result<()> {
        let mut payload = vec![0u8; self.products.len() * ProductRecord::SIZE];
        for (product, chunk) in self
            .products
            .iter()
            .zip(payload.chunks_exact_mut(ProductRecord::SIZE))
        {
            ProductRecord::from(product).encode(chunk);
        }

        let mut header = CatalogHeader {
            len: u8::try_from(self.products.len()).unwrap_or(u8::MAX),
            version: LAYOUT_VERSION,
            next_id: self.next_id,
            checksum: 0,
        };
        header.checksum = checksum(&header, &payload);

        store.write_record(CATALOG_OFFSET, &header)?;
        store.write_bytes(CATALOG_RECORDS_OFFSET, &payload)
    }

    /// Replaces the catalog wholesale with `drafts`, capped at [`MAX_PRODUCTS`].
    pub fn seed_defaults(&mut self, drafts: &[ProductDraft]) {
        self.products.clear();
        for draft in drafts.iter().take(MAX_PRODUCTS) {
            let id = self.allocate_id();
            self.products.push(new_product(id, draft.clone()));
        }
    }

    /// Appends a product with an empty cart.
    ///
    /// # Errors
    /// Returns [`Error::CapacityExceeded`] if the catalog is full.
    pub fn append(&mut self, draft: ProductDraft) -> Result<ProductId> {
        if self.is_full() {
            return Err(Error::CapacityExceeded {
                capacity: MAX_PRODUCTS,
            });
        }
        let id = self.allocate_id();
        self.products.push(new_product(id, draft));
        Ok(id)
    }

    /// Overwrites name, price and deposit flag in place; the cart quantity is kept.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] for a missing slot.
    pub fn update_at(&mut self, index: usize, draft: ProductDraft) -> Result<()> {
        let product = self.slot_mut(index)?;
        product.name = draft.name;
        product.price = draft.price;
        product.has_deposit = draft.has_deposit;
        Ok(())
    }

    /// Removes the product at `index`, shifting later slots left by one.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] for a missing slot.
    pub fn delete_at(&mut self, index: usize) -> Result<Product> {
        self.check_index(index)?;
        Ok(self.products.remove(index))
    }

    /// Converts a caller-supplied index into a valid slot.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] for negative or too large indices.
    pub fn resolve(&self, index: i64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.products.len())
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.products.len(),
            })
    }

    /// Everything in the cart, deposit included.
    #[must_use]
    pub fn total(&self) -> Money {
        self.products
            .iter()
            .map(|p| p.line_price() + p.line_deposit())
            .sum()
    }

    /// The deposit share of [`total`](Self::total).
    #[must_use]
    pub fn deposit_total(&self) -> Money {
        self.products.iter().map(Product::line_deposit).sum()
    }

    /// Products in slot order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub(crate) fn products_mut(&mut self) -> &mut [Product] {
        &mut self.products
    }

    /// The product at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Product> {
        self.products.get(index)
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether there are no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Whether another product would exceed [`MAX_PRODUCTS`].
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.products.len() >= MAX_PRODUCTS
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Result<&mut Product> {
        self.check_index(index)?;
        Ok(&mut self.products[index])
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.products.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len: self.products.len(),
            })
        }
    }

    fn allocate_id(&mut self) -> ProductId {
        let id = ProductId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }
}

fn new_product(id: ProductId, draft: ProductDraft) -> Product {
    Product {
        id,
        name: draft.name,
        price: draft.price,
        has_deposit: draft.has_deposit,
        cart_quantity: 0,
    }
}

fn checksum(header: &CatalogHeader, payload: &[u8]) -> u32 {
    let mut prefix = [0u8; 6];
    prefix[0] = header.len;
    prefix[1] = header.version;
    prefix[2..6].copy_from_slice(&header.next_id.to_le_bytes());
    region_checksum(&prefix, payload)
}
