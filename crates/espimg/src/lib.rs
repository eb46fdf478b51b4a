//! Image orchestrator (C7, §4.7): opens/truncates the output file, zero-fills
//! it, invokes the GPT engine, then the FAT formatter over the partition
//! window it returns.

pub mod orchestrator;
pub mod sizing;

pub use orchestrator::{write_image, ImageSource, ImageSpec};

use espimg_common::status::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    SectorIo(#[from] espimg_io::IoError),
    #[error(transparent)]
    Part(#[from] espimg_part::PartError),
    #[error(transparent)]
    Fat(#[from] espimg_fat::FatError),
    #[error(transparent)]
    Fs(#[from] espimg_fs::FsError),
    #[error("{0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps this error onto the coarse status family (§7).
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Io { .. } => StatusCode::NotFound,
            Error::SectorIo(_) => StatusCode::Internal,
            Error::InvalidArgument(_) => StatusCode::InvalidArgument,
            Error::Part(espimg_part::PartError::DiskTooSmall { .. }) => {
                StatusCode::FailedPrecondition
            }
            Error::Part(_) => StatusCode::Internal,
            Error::Fat(espimg_fat::FatError::FailedPrecondition(_)) => {
                StatusCode::FailedPrecondition
            }
            Error::Fat(espimg_fat::FatError::InvalidShortName(_)) => StatusCode::InvalidArgument,
            Error::Fat(espimg_fat::FatError::Internal(_)) => StatusCode::Internal,
            Error::Fat(_) => StatusCode::ResourceExhausted,
            Error::Fs(_) => StatusCode::Unavailable,
        }
    }
}
