//! Top-level emission: file sizing, the canonical `EFI/BOOT/BOOTX64.EFI`
//! single-file layout or a host directory tree, GPT, then FAT (§4.7).

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use espimg_common::guid::RandGuidSource;
use espimg_common::options::Options;
use espimg_fs::Tree;
use espimg_io::SectorWriter;

use crate::sizing::target_size_bytes;
use crate::{Error, Result};

/// Where the emitted filesystem's content comes from.
pub enum ImageSource {
    /// Populate `EFI/BOOT/BOOTX64.EFI` from a single host file (§6.7 `-b`).
    SingleBoot(PathBuf),
    /// Populate the tree by traversing a host directory (§6.7 `-d`).
    Directory(PathBuf),
    /// An empty root directory (used by tests and tooling).
    Empty,
}

pub struct ImageSpec {
    pub output_path: PathBuf,
    pub source: ImageSource,
    pub options: Options,
}

/// Builds the logical FS tree for `source` (§4.7 step 1 groundwork).
fn build_tree(source: &ImageSource, options: &Options) -> Result<Tree> {
    let mut tree = Tree::new(options.preserve_case);
    match source {
        ImageSource::Empty => {}
        ImageSource::Directory(path) => {
            tree.create_from_source(path)?;
        }
        ImageSource::SingleBoot(path) => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !file_name.eq_ignore_ascii_case("BOOTX64.EFI") {
                return Err(Error::InvalidArgument(format!(
                    "-b payload must be named BOOTX64.EFI, got {file_name:?}"
                )));
            }
            let data = std::fs::read(path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            let efi = tree.create_directory(tree.root(), "EFI")?;
            let boot = tree.create_directory(efi, "BOOT")?;
            tree.create_file(boot, "BOOTX64.EFI", data)?;
        }
    }
    Ok(tree)
}

/// Opens the output file per `reformat`/size semantics (§4.7 step 2).
fn open_output_file(path: &Path, target_bytes: u64, reformat: bool) -> Result<(File, bool)> {
    if reformat {
        if let Ok(existing) = std::fs::metadata(path) {
            if existing.len() >= target_bytes {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(path)
                    .map_err(|source| Error::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                return Ok((file, true));
            }
        }
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
    file.set_len(target_bytes).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((file, false))
}

/// Runs the full pipeline for `spec` (§4.7).
pub fn write_image(spec: &ImageSpec) -> Result<()> {
    let mut tree = build_tree(&spec.source, &spec.options)?;
    let target_bytes = target_size_bytes(tree.aggregate_size());
    let total_sectors = target_bytes / espimg_io::SECTOR_SIZE as u64;

    let (file, reused) = open_output_file(&spec.output_path, target_bytes, spec.options.reformat)?;
    let mut writer = SectorWriter::new(file);

    if !reused {
        tracing::debug!(sectors = total_sectors, "zero-filling image");
        writer.zero_fill(total_sectors);
    }

    let mut guids = RandGuidSource::new();
    let window = espimg_part::write_gpt(&mut writer, &mut guids)?;

    writer.set_origin(window.first_usable_lba);
    tracing::debug!(sectors = window.sectors(), "formatting ESP");
    espimg_fat::create_fat_partition(&mut writer, window.sectors(), &mut tree, &spec.options)?;

    writer.set_origin(0);
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_produces_minimum_size_bootable_image() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("disk.img");
        let spec = ImageSpec {
            output_path: output_path.clone(),
            source: ImageSource::Empty,
            options: Options::default(),
        };
        write_image(&spec).unwrap();

        let metadata = std::fs::metadata(&output_path).unwrap();
        assert_eq!(metadata.len(), crate::sizing::MIN_IMAGE_BYTES);

        let bytes = std::fs::read(&output_path).unwrap();
        assert_eq!(&bytes[510..512], &[0x55, 0xAA]);
        assert_eq!(bytes[446 + 4], 0xEE);
    }

    #[test]
    fn single_boot_file_rejects_mismatched_name() {
        let dir = tempfile::tempdir().unwrap();
        let bad_path = dir.path().join("not-boot.efi");
        std::fs::write(&bad_path, [0u8; 4]).unwrap();
        let spec = ImageSpec {
            output_path: dir.path().join("disk.img"),
            source: ImageSource::SingleBoot(bad_path),
            options: Options::default(),
        };
        assert!(matches!(write_image(&spec), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn single_boot_file_populates_canonical_layout() {
        let dir = tempfile::tempdir().unwrap();
        let boot_path = dir.path().join("BOOTX64.EFI");
        std::fs::write(&boot_path, [0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        let output_path = dir.path().join("disk.img");
        let spec = ImageSpec {
            output_path: output_path.clone(),
            source: ImageSource::SingleBoot(boot_path),
            options: Options::default(),
        };
        write_image(&spec).unwrap();
        assert!(std::fs::metadata(&output_path).unwrap().len() >= crate::sizing::MIN_IMAGE_BYTES);
    }

    #[test]
    fn reformat_reuses_existing_large_enough_file() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("disk.img");
        std::fs::write(&output_path, vec![0x7Eu8; crate::sizing::MIN_IMAGE_BYTES as usize]).unwrap();

        let mut options = Options::default();
        options.reformat = true;
        let spec = ImageSpec {
            output_path: output_path.clone(),
            source: ImageSource::Empty,
            options,
        };
        write_image(&spec).unwrap();

        let bytes = std::fs::read(&output_path).unwrap();
        assert_eq!(bytes.len(), crate::sizing::MIN_IMAGE_BYTES as usize);
        assert_eq!(&bytes[510..512], &[0x55, 0xAA]);

        let header: espimg_common::gpt::GptHeader =
            *bytemuck::from_bytes(&bytes[512..512 + 92]);
        assert_eq!(header.compute_crc32(), header.header_crc32.get());

        let last_sector_offset = bytes.len() - espimg_io::SECTOR_SIZE;
        let backup: espimg_common::gpt::GptHeader =
            *bytemuck::from_bytes(&bytes[last_sector_offset..last_sector_offset + 92]);
        assert_eq!(backup.compute_crc32(), backup.header_crc32.get());
    }
}
