//! On-image layout of the catalog and ledger regions.
//!
//! ```text
//! 0     catalog header  [len u8][version u8][reserved u16][next_id u32][crc32 u32][pad u32]
//! 16    product records, MAX_PRODUCTS x ProductRecord::SIZE
//! 1000  ledger header   [len u8][version u8][reserved u16][crc32 u32]
//! 1008  ledger entries, MAX_PRODUCTS x LedgerEntry::SIZE
//! ```
//!
//! Offsets and record sizes must stay stable across releases; any change to
//! them bumps [`LAYOUT_VERSION`] so older images are rejected and reseeded.

use super::Record;

/// Size of the whole non-volatile region.
pub const STORE_SIZE: usize = 4096;
/// Upper bound on catalog length.
pub const MAX_PRODUCTS: usize = 20;
/// Bumped whenever a header or record format changes.
pub const LAYOUT_VERSION: u8 = 1;

/// Start of the catalog header.
pub const CATALOG_OFFSET: usize = 0;
/// First product record, right after the catalog header.
pub const CATALOG_RECORDS_OFFSET: usize = CATALOG_OFFSET + CatalogHeader::SIZE;
/// Width of one product record.
pub const PRODUCT_RECORD_SIZE: usize = 40;

/// Start of the ledger header.
pub const LEDGER_OFFSET: usize = 1000;
/// First ledger entry, right after the ledger header.
pub const LEDGER_ENTRIES_OFFSET: usize = LEDGER_OFFSET + LedgerHeader::SIZE;
/// Width of one `(id, sold)` ledger entry.
pub const LEDGER_ENTRY_SIZE: usize = 8;

const _: () = assert!(CATALOG_RECORDS_OFFSET + MAX_PRODUCTS * PRODUCT_RECORD_SIZE <= LEDGER_OFFSET);
const _: () = assert!(LEDGER_ENTRIES_OFFSET + MAX_PRODUCTS * LEDGER_ENTRY_SIZE <= STORE_SIZE);
const _: () = assert!(MAX_PRODUCTS < 0xFF);

/// What a region header says about the bytes behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// Length byte is 0 or 0xFF: nothing was ever written here.
    Uninitialized,
    /// Length byte is outside `1..=MAX_PRODUCTS`.
    LengthOutOfRange(u8),
    /// Written by a different layout version.
    VersionMismatch(u8),
    /// Length and version are plausible; the checksum still has to match.
    Plausible,
}

fn classify(len: u8, version: u8) -> RegionState {
    match len {
        0 | 0xFF => RegionState::Uninitialized,
        n if usize::from(n) > MAX_PRODUCTS => RegionState::LengthOutOfRange(n),
        _ if version != LAYOUT_VERSION => RegionState::VersionMismatch(version),
        _ => RegionState::Plausible,
    }
}

/// Header in front of the product records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogHeader {
    /// Number of product records that follow.
    pub len: u8,
    /// [`LAYOUT_VERSION`] at write time.
    pub version: u8,
    /// Next product id to hand out.
    pub next_id: u32,
    /// CRC-32 over `len`, `version`, `next_id` and the records.
    pub checksum: u32,
}

impl CatalogHeader {
    /// Classifies the region from `len` and `version` alone.
    #[must_use]
    pub fn state(&self) -> RegionState {
        classify(self.len, self.version)
    }
}

impl Record for CatalogHeader {
    const SIZE: usize = 16;

    fn encode(&self, buf: &mut [u8]) {
        buf.fill(0);
        buf[0] = self.len;
        buf[1] = self.version;
        buf[4..8].copy_from_slice(&self.next_id.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            len: buf[0],
            version: buf[1],
            next_id: read_u32(buf, 4),
            checksum: read_u32(buf, 8),
        }
    }
}

/// Header in front of the ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerHeader {
    /// Number of entries that follow.
    pub len: u8,
    /// [`LAYOUT_VERSION`] at write time.
    pub version: u8,
    /// CRC-32 over `len`, `version` and the entries.
    pub checksum: u32,
}

impl LedgerHeader {
    /// Classifies the region from `len` and `version` alone.
    #[must_use]
    pub fn state(&self) -> RegionState {
        classify(self.len, self.version)
    }
}

impl Record for LedgerHeader {
    const SIZE: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        buf.fill(0);
        buf[0] = self.len;
        buf[1] = self.version;
        buf[4..8].copy_from_slice(&self.checksum.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            len: buf[0],
            version: buf[1],
            checksum: read_u32(buf, 4),
        }
    }
}

/// CRC-32 over the header fields that describe the payload plus the payload itself.
#[must_use]
pub fn region_checksum(prefix: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(prefix);
    hasher.update(payload);
    hasher.finalize()
}

pub(crate) fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lengths_are_uninitialized() {
        assert_eq!(classify(0, 0), RegionState::Uninitialized);
        assert_eq!(classify(0xFF, 0xFF), RegionState::Uninitialized);
    }

    #[test]
    fn test_out_of_range_length() {
        assert_eq!(classify(21, LAYOUT_VERSION), RegionState::LengthOutOfRange(21));
        assert_eq!(classify(20, LAYOUT_VERSION), RegionState::Plausible);
    }

    #[test]
    fn test_version_mismatch() {
        assert_eq!(classify(3, 0), RegionState::VersionMismatch(0));
    }

    #[test]
    fn test_catalog_header_encoding() {
        let header = CatalogHeader {
            len: 9,
            version: LAYOUT_VERSION,
            next_id: 0x0102_0304,
            checksum: 0xDEAD_BEEF,
        };
        let mut buf = [0xAAu8; CatalogHeader::SIZE];
        header.encode(&mut buf);
        assert_eq!(buf[0], 9);
        assert_eq!(buf[2], 0);
        assert_eq!(&buf[4..8], &[4, 3, 2, 1]);
        assert_eq!(&buf[12..], &[0, 0, 0, 0]);
        assert_eq!(CatalogHeader::decode(&buf), header);
    }

    #[test]
    fn test_checksum_covers_prefix_and_payload() {
        let base = region_checksum(&[1, 2], &[3, 4]);
        assert_ne!(base, region_checksum(&[1, 3], &[3, 4]));
        assert_ne!(base, region_checksum(&[1, 2], &[3, 5]));
    }
}
