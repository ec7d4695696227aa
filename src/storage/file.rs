use super::{PersistentStore, check_bounds};
use crate::errors::Result;
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Fixed-size image file mirrored in memory.
///
/// Reads and writes hit the mirror. `commit` writes the whole image to a
/// sibling temp file, syncs it and renames it over the image, so a power cut
/// leaves either the previous or the new image on disk, never a torn mix.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    bytes: Vec<u8>,
    dirty: bool,
}

impl FileStore {
    /// Opens the image at `path`, or starts from an erased region when the file
    /// is missing or has the wrong size. Nothing is written until the first commit.
    #[instrument]
    pub fn open(path: &Path, capacity: usize) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) if bytes.len() == capacity => {
                debug!("Loaded {} byte store image", bytes.len());
                bytes
            }
            Ok(bytes) => {
                warn!(
                    "Store image has {} bytes, expected {}; starting erased",
                    bytes.len(),
                    capacity
                );
                vec![0xFF; capacity]
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store image yet; starting erased");
                vec![0xFF; capacity]
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            dirty: false,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PersistentStore for FileStore {
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
        self.dirty = true;
        Ok(())
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp)?;
            file.write_all(&self.bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        // Persist the rename itself; not every platform lets a directory be opened.
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty())
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }

        self.dirty = false;
        debug!("Committed {} byte store image", self.bytes.len());
        Ok(())
    }
}
