//! The GPT layout engine (C5, §4.5): protective MBR, primary GPT header and
//! partition array, and their backup copies at the tail of the disk.

use bytemuck::bytes_of;
use espimg_common::crc::crc32;
use espimg_common::gpt::{FixedUtf16Name, GptHeader, GptPartitionEntry, GPT_ATTR_REQUIRED};
use espimg_common::guid::{Guid, GuidSource};
use espimg_common::mbr::MbrPartitionRecord;
use espimg_io::{IoError, SectorWriter, SECTOR_SIZE};

pub const RESERVED_HEADER_AND_ARRAY_SECTORS: u64 = 34;

#[derive(Debug, thiserror::Error)]
pub enum PartError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("disk is too small to hold a GPT layout: need at least {needed} sectors, have {have}")]
    DiskTooSmall { needed: u64, have: u64 },
    #[error("sector writer entered a sticky error state during GPT emission")]
    WriterNotGood,
}

pub type Result<T> = std::result::Result<T, PartError>;

/// The partition-relative window the FAT formatter writes into, returned by
/// [`write_gpt`].
#[derive(Debug, Clone, Copy)]
pub struct PartitionWindow {
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
}

impl PartitionWindow {
    pub fn sectors(&self) -> u64 {
        self.last_usable_lba - self.first_usable_lba
    }
}

/// Writes the protective MBR, primary GPT, and backup GPT to `writer`
/// (expected to have `set_origin(0)` already, i.e. operating on the whole
/// disk), and returns the usable LBA window for the EFI System Partition.
pub fn write_gpt(
    writer: &mut SectorWriter,
    guids: &mut dyn GuidSource,
) -> Result<PartitionWindow> {
    let last_lba = writer.last_lba()?;
    if last_lba < 2 * RESERVED_HEADER_AND_ARRAY_SECTORS {
        return Err(PartError::DiskTooSmall {
            needed: 2 * RESERVED_HEADER_AND_ARRAY_SECTORS,
            have: last_lba + 1,
        });
    }
    let total_sectors = last_lba + 1;

    tracing::debug!(total_sectors, "writing GPT layout");
    write_protective_mbr(writer, total_sectors);

    let disk_guid = guids.next_guid();
    let partition_guid = guids.next_guid();

    let mut entry = GptPartitionEntry::default();
    entry.type_guid = Guid::EFI_SYSTEM_PARTITION;
    entry.unique_partition_guid = partition_guid;
    entry.starting_lba = RESERVED_HEADER_AND_ARRAY_SECTORS.into();
    entry.ending_lba = (last_lba - RESERVED_HEADER_AND_ARRAY_SECTORS).into();
    entry.attributes = GPT_ATTR_REQUIRED.into();
    entry.partition_name = FixedUtf16Name::from_ascii("EFI BOOT");

    let partition_array_crc32 = crc32(bytes_of(&entry));

    let mut primary = GptHeader::default();
    primary.my_lba = 1u64.into();
    primary.alternate_lba = last_lba.into();
    primary.first_usable_lba = RESERVED_HEADER_AND_ARRAY_SECTORS.into();
    primary.last_usable_lba = (last_lba - RESERVED_HEADER_AND_ARRAY_SECTORS).into();
    primary.partition_entry_lba = 2u64.into();
    primary.partition_entry_count = 1u32.into();
    primary.disk_guid = disk_guid;
    primary.partition_array_crc32 = partition_array_crc32.into();
    primary.header_crc32 = primary.compute_crc32().into();

    {
        let scratch = writer.scratch_mut(2);
        scratch[..SECTOR_SIZE].copy_from_slice(&pad_to_sector(bytes_of(&primary)));
        scratch[SECTOR_SIZE..SECTOR_SIZE * 2].copy_from_slice(&pad_to_sector(bytes_of(&entry)));
    }
    writer.write_sectors_at(1, 2);

    let mut backup = primary;
    backup.my_lba = last_lba.into();
    backup.alternate_lba = 1u64.into();
    backup.partition_entry_lba = (last_lba - 32).into();
    backup.header_crc32 = 0u32.into();
    backup.header_crc32 = backup.compute_crc32().into();

    {
        let scratch = writer.scratch_mut(2);
        scratch[..SECTOR_SIZE].copy_from_slice(&pad_to_sector(bytes_of(&backup)));
        scratch[SECTOR_SIZE..SECTOR_SIZE * 2].copy_from_slice(&pad_to_sector(bytes_of(&entry)));
    }
    writer.write_sector_range(last_lba - 32, 1, 1);
    writer.write_sector_range(last_lba, 0, 1);

    writer.finish().map_err(|_| PartError::WriterNotGood)?;

    Ok(PartitionWindow {
        first_usable_lba: RESERVED_HEADER_AND_ARRAY_SECTORS,
        last_usable_lba: last_lba - RESERVED_HEADER_AND_ARRAY_SECTORS,
    })
}

fn write_protective_mbr(writer: &mut SectorWriter, total_sectors: u64) {
    let record = MbrPartitionRecord::protective(total_sectors);
    let scratch = writer.scratch(1);
    scratch[espimg_common::mbr::MBR_PARTITION_RECORD_OFFSET
        ..espimg_common::mbr::MBR_PARTITION_RECORD_OFFSET + core::mem::size_of::<MbrPartitionRecord>()]
        .copy_from_slice(bytes_of(&record));
    scratch[espimg_common::mbr::MBR_SIGNATURE_OFFSET..espimg_common::mbr::MBR_SIGNATURE_OFFSET + 2]
        .copy_from_slice(&espimg_common::mbr::MBR_BOOT_SIGNATURE);
    writer.write_sector_at(0);
}

fn pad_to_sector(bytes: &[u8]) -> Vec<u8> {
    let mut sector = vec![0u8; SECTOR_SIZE];
    sector[..bytes.len()].copy_from_slice(bytes);
    sector
}

#[cfg(test)]
mod tests {
    use super::*;
    use espimg_common::endian::Endian;
    use espimg_common::guid::FixedGuidSource;

    fn make_disk(sectors: u64) -> SectorWriter {
        let file = tempfile::tempfile().unwrap();
        file.set_len(sectors * SECTOR_SIZE as u64).unwrap();
        SectorWriter::new(file)
    }

    #[test]
    fn mbr_has_protective_signature() {
        let total_sectors = 1024;
        let mut writer = make_disk(total_sectors);
        let mut guids = FixedGuidSource::new(Guid::from_bytes([1; 16]), 7);
        write_gpt(&mut writer, &mut guids).unwrap();

        let mut sector0 = [0u8; SECTOR_SIZE];
        writer.read_sector(0, &mut sector0).unwrap();
        assert_eq!(&sector0[510..512], &[0x55, 0xAA]);
        assert_eq!(sector0[446 + 4], 0xEE);
    }

    #[test]
    fn primary_header_matches_invariants() {
        let total_sectors = 2048;
        let mut writer = make_disk(total_sectors);
        let mut guids = FixedGuidSource::new(Guid::from_bytes([2; 16]), 9);
        let window = write_gpt(&mut writer, &mut guids).unwrap();
        assert_eq!(window.first_usable_lba, 34);
        assert_eq!(window.last_usable_lba, total_sectors - 1 - 34);

        let mut sector1 = [0u8; SECTOR_SIZE];
        writer.read_sector(1, &mut sector1).unwrap();
        let header: GptHeader = *bytemuck::from_bytes(&sector1[..92]);
        assert_eq!(&header.signature, b"EFI PART");
        assert_eq!(header.header_size.get(), 92);
        assert_eq!(header.my_lba.get(), 1);
        assert_eq!(header.alternate_lba.get(), total_sectors - 1);
        assert_eq!(header.first_usable_lba.get(), 34);
        assert_eq!(header.last_usable_lba.get(), total_sectors - 1 - 34);
        assert_eq!(header.partition_entry_count.get(), 1);
        assert_eq!(header.partition_entry_size.get(), 128);
        assert_eq!(header.partition_entry_lba.get(), 2);
    }

    #[test]
    fn header_crc32_verifies_with_field_zeroed() {
        let total_sectors = 2048;
        let mut writer = make_disk(total_sectors);
        let mut guids = FixedGuidSource::new(Guid::from_bytes([3; 16]), 1);
        write_gpt(&mut writer, &mut guids).unwrap();

        let mut sector1 = [0u8; SECTOR_SIZE];
        writer.read_sector(1, &mut sector1).unwrap();
        let header: GptHeader = *bytemuck::from_bytes(&sector1[..92]);
        assert_eq!(header.compute_crc32(), header.header_crc32.get());

        let mut last = [0u8; SECTOR_SIZE];
        writer.read_sector(total_sectors - 1, &mut last).unwrap();
        let backup: GptHeader = *bytemuck::from_bytes(&last[..92]);
        assert_eq!(backup.compute_crc32(), backup.header_crc32.get());
    }

    #[test]
    fn partition_array_crc32_matches_entry_bytes() {
        let total_sectors = 2048;
        let mut writer = make_disk(total_sectors);
        let mut guids = FixedGuidSource::new(Guid::from_bytes([4; 16]), 1);
        write_gpt(&mut writer, &mut guids).unwrap();

        let mut sector2 = [0u8; SECTOR_SIZE];
        writer.read_sector(2, &mut sector2).unwrap();
        let entry: GptPartitionEntry = *bytemuck::from_bytes(&sector2[..128]);

        let mut sector1 = [0u8; SECTOR_SIZE];
        writer.read_sector(1, &mut sector1).unwrap();
        let header: GptHeader = *bytemuck::from_bytes(&sector1[..92]);
        assert_eq!(crc32(bytes_of(&entry)), header.partition_array_crc32.get());
    }

    #[test]
    fn primary_and_backup_arrays_match() {
        let total_sectors = 2048;
        let mut writer = make_disk(total_sectors);
        let mut guids = FixedGuidSource::new(Guid::from_bytes([5; 16]), 1);
        write_gpt(&mut writer, &mut guids).unwrap();

        let mut primary_entry = [0u8; SECTOR_SIZE];
        writer.read_sector(2, &mut primary_entry).unwrap();
        let mut backup_entry = [0u8; SECTOR_SIZE];
        writer
            .read_sector(total_sectors - 32, &mut backup_entry)
            .unwrap();
        assert_eq!(&primary_entry[..128], &backup_entry[..128]);

        let mut last = [0u8; SECTOR_SIZE];
        writer.read_sector(total_sectors - 1, &mut last).unwrap();
        let backup_header: GptHeader = *bytemuck::from_bytes(&last[..92]);
        assert_eq!(backup_header.my_lba.get(), total_sectors - 1);
        assert_eq!(backup_header.alternate_lba.get(), 1);
        assert_eq!(backup_header.partition_entry_lba.get(), total_sectors - 32);
    }

    #[test]
    fn rejects_disks_too_small_for_both_gpt_copies() {
        let mut writer = make_disk(40);
        let mut guids = FixedGuidSource::new(Guid::ZERO, 0);
        assert!(matches!(
            write_gpt(&mut writer, &mut guids),
            Err(PartError::DiskTooSmall { .. })
        ));
    }
}
