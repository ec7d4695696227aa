use super::{PersistentStore, check_bounds};
use crate::errors::Result;

/// Volatile store with the same contract as the image file.
///
/// Writes land directly in the buffer; `commit` only counts, which lets tests
/// assert that a mutation was committed before the caller saw the reply.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    bytes: Vec<u8>,
    commits: usize,
}

impl MemoryStore {
    /// A region in the erased state (every byte `0xFF`), like fresh flash.
    #[must_use]
    pub fn erased(capacity: usize) -> Self {
        Self {
            bytes: vec![0xFF; capacity],
            commits: 0,
        }
    }

    /// A region filled with zeros.
    #[must_use]
    pub fn zeroed(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            commits: 0,
        }
    }

    /// Number of commits performed so far.
    #[must_use]
    pub const fn commits(&self) -> usize {
        self.commits
    }
}

impl PersistentStore for MemoryStore {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read_bytes(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        check_bounds(offset, buf.len(), self.bytes.len())?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        check_bounds(offset, data.len(), self.bytes.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}
