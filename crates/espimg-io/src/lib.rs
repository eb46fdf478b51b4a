//! Sector-addressed I/O (C1): a random-access writer over an output file in
//! units of 512-byte sectors, with a scratch buffer and an LBA origin for
//! partition-relative addressing (§4.1).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

pub const SECTOR_SIZE: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sector index {0} out of range for a {1}-sector scratch buffer")]
    ScratchOutOfRange(usize, usize),
}

pub type Result<T> = std::result::Result<T, IoError>;

/// Read access to 512-byte sectors, independent of how they're backed.
pub trait SectorReader {
    fn read_sector(&mut self, lba: u64, buffer: &mut [u8; SECTOR_SIZE]) -> Result<()>;
}

/// Write access to 512-byte sectors. See [`SectorWriter`] for the concrete
/// file-backed implementation used by the rest of `espimg`.
pub trait SectorWrite: SectorReader {
    fn write_sector(&mut self, lba: u64, buffer: &[u8; SECTOR_SIZE]) -> Result<()>;
}

/// Owns an open file and a growable scratch buffer; every write is aligned
/// to a sector. Once any write fails, the writer enters a sticky "not good"
/// state and all subsequent writes silently no-op (§4.1 contract) — callers
/// must check [`SectorWriter::is_good`] after a batch of writes, which is
/// exactly what [`SectorWriter::finish`] does.
pub struct SectorWriter {
    file: File,
    origin_bytes: u64,
    scratch: Vec<u8>,
    good: bool,
}

impl SectorWriter {
    pub fn new(file: File) -> Self {
        Self {
            file,
            origin_bytes: 0,
            scratch: vec![0u8; SECTOR_SIZE],
            good: true,
        }
    }

    pub fn is_good(&self) -> bool {
        self.good
    }

    /// Fails the whole batch if any prior write failed; otherwise a no-op.
    pub fn finish(&self) -> Result<()> {
        if self.good {
            Ok(())
        } else {
            Err(IoError::Io(std::io::Error::other(
                "sector writer entered a sticky error state",
            )))
        }
    }

    /// Establishes the origin for subsequent partition-relative addressing.
    pub fn set_origin(&mut self, absolute_lba: u64) {
        self.origin_bytes = absolute_lba * SECTOR_SIZE as u64;
    }

    /// Returns a zeroed `n`-sector scratch buffer, growing the backing
    /// allocation as needed but never shrinking it.
    pub fn scratch(&mut self, n: usize) -> &mut [u8] {
        let needed = n * SECTOR_SIZE;
        if self.scratch.len() < needed {
            self.scratch.resize(needed, 0);
        }
        self.scratch[..needed].fill(0);
        &mut self.scratch[..needed]
    }

    /// Returns the current scratch buffer without clearing it, for staged
    /// writers that fill it across multiple calls before flushing.
    pub fn scratch_mut(&mut self, n: usize) -> &mut [u8] {
        let needed = n * SECTOR_SIZE;
        if self.scratch.len() < needed {
            self.scratch.resize(needed, 0);
        }
        &mut self.scratch[..needed]
    }

    fn write_at(&mut self, absolute_lba: u64, bytes: &[u8]) {
        if !self.good {
            return;
        }
        let offset = self.origin_bytes + absolute_lba * SECTOR_SIZE as u64;
        let result = self
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(bytes));
        if result.is_err() {
            self.good = false;
        }
    }

    /// Writes the current scratch sector to `origin + lba`.
    pub fn write_sector_at(&mut self, lba: u64) {
        let bytes = self.scratch[..SECTOR_SIZE].to_vec();
        self.write_at(lba, &bytes);
    }

    /// Writes the first `n` sectors of the scratch buffer to `origin + lba`.
    pub fn write_sectors_at(&mut self, lba: u64, n: usize) {
        let len = n * SECTOR_SIZE;
        let bytes = self.scratch[..len.min(self.scratch.len())].to_vec();
        self.write_at(lba, &bytes);
    }

    /// Writes `n` sectors starting at `src_offset` (in sectors) within the
    /// scratch buffer to `origin + lba`.
    pub fn write_sector_range(&mut self, lba: u64, src_offset: usize, n: usize) {
        let start = src_offset * SECTOR_SIZE;
        let end = start + n * SECTOR_SIZE;
        let bytes = self.scratch[start..end].to_vec();
        self.write_at(lba, &bytes);
    }

    /// Writes a single sector of raw bytes directly, bypassing the scratch
    /// buffer. Used by the FAT formatter, which streams many distinct
    /// sector-sized buffers (directory entries, file data) rather than
    /// staging everything through one shared scratch region.
    pub fn write_raw_sector(&mut self, lba: u64, bytes: &[u8; SECTOR_SIZE]) {
        self.write_at(lba, bytes);
    }

    /// Zero-fills `total_sectors` sectors starting at LBA 0 of the current
    /// origin (§4.7 step 3).
    pub fn zero_fill(&mut self, total_sectors: u64) {
        let zero = [0u8; SECTOR_SIZE];
        for lba in 0..total_sectors {
            self.write_raw_sector(lba, &zero);
            if !self.good {
                break;
            }
        }
    }

    pub fn last_lba(&self) -> Result<u64> {
        let len = self.file.metadata()?.len();
        Ok(len / SECTOR_SIZE as u64 - 1)
    }

    pub fn size_bytes(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

impl SectorReader for SectorWriter {
    fn read_sector(&mut self, lba: u64, buffer: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        let offset = self.origin_bytes + lba * SECTOR_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buffer)?;
        Ok(())
    }
}

impl SectorWrite for SectorWriter {
    fn write_sector(&mut self, lba: u64, buffer: &[u8; SECTOR_SIZE]) -> Result<()> {
        self.write_raw_sector(lba, buffer);
        self.finish()
    }
}
