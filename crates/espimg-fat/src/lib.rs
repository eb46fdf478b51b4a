//! The FAT16/FAT32 formatter (C6): boot sector geometry, FAT table
//! construction, and directory/file emission over a partition-relative
//! sector writer.

pub mod boot_sector;
pub mod directory;
pub mod fat_table;
pub mod format;
pub mod fs_info;

pub use format::create_fat_partition;

#[derive(Debug, thiserror::Error)]
pub enum FatError {
    #[error(transparent)]
    Io(#[from] espimg_io::IoError),
    #[error(transparent)]
    InvalidShortName(#[from] espimg_common::fatstr::ShortNameError),
    #[error("precondition failed: {0}")]
    FailedPrecondition(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("ran out of free clusters: {0}")]
    ResourceExhausted(String),
    #[error("directory {0:?} has more entries than fit in one cluster")]
    DirectoryTooLarge(String),
}

pub type Result<T> = std::result::Result<T, FatError>;
