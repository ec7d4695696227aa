//! Persistent store - a fixed-size, byte-addressable non-volatile region.
//!
//! The register keeps its catalog and sales ledger in one small image, read and
//! written at fixed byte offsets. Writes are buffered until [`PersistentStore::commit`],
//! which must not return before everything written since the previous commit is
//! durable. Handlers only answer a caller after the commit returns, so an
//! observed success always implies durability.

/// Image file backed store used by the binary
pub mod file;
/// Byte offsets, header formats and checksums of the persisted regions
pub mod layout;
/// In-memory store for tests and diagnostics
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::errors::{Error, Result};

/// A value with a fixed-width little-endian encoding inside the store.
pub trait Record: Sized {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Writes the record into `buf`, which is exactly `SIZE` bytes long.
    fn encode(&self, buf: &mut [u8]);

    /// Reads the record back from `buf`, which is exactly `SIZE` bytes long.
    fn decode(buf: &[u8]) -> Self;
}

/// Storage contract shared by the on-disk image and the in-memory store.
pub trait PersistentStore {
    /// Total size of the region in bytes.
    fn capacity(&self) -> usize;

    /// Fills `buf` from the region starting at `offset`.
    fn read_bytes(&self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Buffers `data` at `offset`; not durable until [`commit`](Self::commit).
    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<()>;

    /// Blocks until every write since the last commit is durable.
    fn commit(&mut self) -> Result<()>;

    /// Reads the single byte at `offset`.
    fn read_byte(&self, offset: usize) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_bytes(offset, &mut buf)?;
        Ok(buf[0])
    }

    /// Buffers a single byte at `offset`.
    fn write_byte(&mut self, offset: usize, value: u8) -> Result<()> {
        self.write_bytes(offset, &[value])
    }

    /// Decodes a `T` from the `T::SIZE` bytes at `offset`.
    fn read_record<T: Record>(&self, offset: usize) -> Result<T> {
        let mut buf = vec![0u8; T::SIZE];
        self.read_bytes(offset, &mut buf)?;
        Ok(T::decode(&buf))
    }

    /// Buffers the encoding of `value` at `offset`.
    fn write_record<T: Record>(&mut self, offset: usize, value: &T) -> Result<()> {
        let mut buf = vec![0u8; T::SIZE];
        value.encode(&mut buf);
        self.write_bytes(offset, &buf)
    }
}

/// Validates that `len` bytes at `offset` fit into a region of `capacity` bytes.
pub(crate) fn check_bounds(offset: usize, len: usize, capacity: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(Error::StoreOutOfBounds {
            offset,
            len,
            capacity,
        }),
    }
}
