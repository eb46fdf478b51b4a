//! The FAT boot sector: common BPB, the FAT16/FAT32 extended BPBs, and the
//! geometry computation that picks between them (§4.6.1).

use espimg_common::fatstr::FatStr;
use espimg_common::number::{U16, U32, LE};

pub const SECTOR_SIZE: usize = 512;
pub const OEM_NAME: &str = "jOSX 64 ";
pub const MEDIA_DESCRIPTOR: u8 = 0xF8;
pub const JUMP: [u8; 3] = [0xE9, 0x00, 0x00];
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Bytes 11..36 of the boot sector, common to FAT16 and FAT32.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BootSectorCommon {
    pub jump: [u8; 3],
    pub oem_name: FatStr<8>,
    pub bytes_per_sector: U16<LE>,
    pub sectors_per_cluster: u8,
    pub reserved_sector_count: U16<LE>,
    pub fat_count: u8,
    pub root_entry_count: U16<LE>,
    pub total_sectors_16: U16<LE>,
    pub media_type: u8,
    pub sectors_per_fat_16: U16<LE>,
    pub sectors_per_track: U16<LE>,
    pub num_heads: U16<LE>,
    pub hidden_sector_count: U32<LE>,
    pub total_sectors_32: U32<LE>,
}

static_assertions::const_assert_eq!(core::mem::size_of::<BootSectorCommon>(), 36);

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BpbExtended16 {
    pub drive_number: u8,
    pub reserved1: u8,
    pub ext_boot_signature: u8,
    pub volume_id: U32<LE>,
    pub volume_label: FatStr<11>,
    pub fs_type: FatStr<8>,
}

static_assertions::const_assert_eq!(core::mem::size_of::<BpbExtended16>(), 26);

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BpbExtended32 {
    pub sectors_per_fat_32: U32<LE>,
    pub ext_flags: U16<LE>,
    pub version: U16<LE>,
    pub root_cluster: U32<LE>,
    pub fs_info_sector: U16<LE>,
    pub backup_boot_sector: U16<LE>,
    pub reserved: [u8; 12],
    pub drive_number: u8,
    pub reserved1: u8,
    pub ext_boot_signature: u8,
    pub volume_id: U32<LE>,
    pub volume_label: FatStr<11>,
    pub fs_type: FatStr<8>,
}

static_assertions::const_assert_eq!(core::mem::size_of::<BpbExtended32>(), 54);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatKind {
    Fat16,
    Fat32,
}

/// Computed BPB geometry for a partition of `total_sectors` (§4.6.1).
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub kind: FatKind,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entry_count: u16,
    pub root_dir_sectors: u16,
    pub sectors_per_fat: u32,
    pub num_heads: u16,
    pub sectors_per_track: u16,
    pub total_sectors: u64,
    pub first_data_lba: u64,
}

impl Geometry {
    pub fn compute(total_sectors: u64) -> Self {
        let partition_bytes = total_sectors * SECTOR_SIZE as u64;
        let kind = if partition_bytes < 0x2000_0000 {
            FatKind::Fat16
        } else {
            FatKind::Fat32
        };

        let num_heads: u16 = if partition_bytes <= 0x1F80_0000 {
            16
        } else if partition_bytes <= 0x3F00_0000 {
            32
        } else if partition_bytes <= 0x7E00_0000 {
            64
        } else if partition_bytes <= 0xFC00_0000 {
            128
        } else {
            255
        };

        let sectors_per_cluster: u8 = match kind {
            FatKind::Fat16 => {
                if total_sectors <= 262144 {
                    4
                } else if total_sectors <= 524288 {
                    8
                } else {
                    16
                }
            }
            FatKind::Fat32 => {
                if total_sectors <= 16_777_216 {
                    8
                } else if total_sectors <= 33_554_432 {
                    16
                } else if total_sectors <= 67_108_864 {
                    32
                } else {
                    64
                }
            }
        };

        let (reserved_sectors, root_entry_count) = match kind {
            FatKind::Fat16 => (1u16, 512u16),
            FatKind::Fat32 => (32u16, 0u16),
        };
        let root_dir_sectors =
            ((root_entry_count as u32 * 32).div_ceil(SECTOR_SIZE as u32)) as u16;

        let num_fats = 2u8;
        let tmp1 = total_sectors - (reserved_sectors as u64 + root_dir_sectors as u64);
        let mut tmp2 = 256u64 * sectors_per_cluster as u64 + num_fats as u64;
        if kind == FatKind::Fat32 {
            tmp2 /= 2;
        }
        let sectors_per_fat = tmp1.div_ceil(tmp2) as u32;

        let first_data_lba = reserved_sectors as u64
            + num_fats as u64 * sectors_per_fat as u64
            + root_dir_sectors as u64;

        Self {
            kind,
            bytes_per_sector: SECTOR_SIZE as u16,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entry_count,
            root_dir_sectors,
            sectors_per_fat,
            num_heads,
            sectors_per_track: 63,
            total_sectors,
            first_data_lba,
        }
    }

    pub fn bytes_per_cluster(&self) -> u64 {
        self.bytes_per_sector as u64 * self.sectors_per_cluster as u64
    }

    pub fn cluster_to_lba(&self, cluster: u32) -> u64 {
        self.first_data_lba + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }

    pub fn total_data_clusters(&self) -> u64 {
        (self.total_sectors - self.first_data_lba) / self.sectors_per_cluster as u64
    }
}

/// Serializes the full 512-byte boot sector for `geometry`, labeling the
/// volume with `volume_label` (already 11-byte space-padded).
pub fn build_boot_sector(geometry: &Geometry, volume_label: FatStr<11>, volume_id: u32) -> [u8; SECTOR_SIZE] {
    let (total_sectors_16, total_sectors_32) = if geometry.total_sectors < 0x1000 {
        (geometry.total_sectors as u16, 0u32)
    } else {
        (0u16, geometry.total_sectors as u32)
    };

    let common = BootSectorCommon {
        jump: JUMP,
        oem_name: FatStr::from_str_padded(OEM_NAME, false),
        bytes_per_sector: U16::new(geometry.bytes_per_sector),
        sectors_per_cluster: geometry.sectors_per_cluster,
        reserved_sector_count: U16::new(geometry.reserved_sectors),
        fat_count: geometry.num_fats,
        root_entry_count: U16::new(geometry.root_entry_count),
        total_sectors_16: U16::new(total_sectors_16),
        media_type: MEDIA_DESCRIPTOR,
        sectors_per_fat_16: U16::new(match geometry.kind {
            FatKind::Fat16 => geometry.sectors_per_fat as u16,
            FatKind::Fat32 => 0,
        }),
        sectors_per_track: U16::new(geometry.sectors_per_track),
        num_heads: U16::new(geometry.num_heads),
        hidden_sector_count: U32::new(0),
        total_sectors_32: U32::new(total_sectors_32),
    };

    let mut sector = [0u8; SECTOR_SIZE];
    sector[..36].copy_from_slice(bytemuck::bytes_of(&common));

    match geometry.kind {
        FatKind::Fat16 => {
            let ext = BpbExtended16 {
                drive_number: 0x80,
                reserved1: 0,
                ext_boot_signature: 0x29,
                volume_id: U32::new(volume_id),
                volume_label,
                fs_type: FatStr::from_str_padded("FAT16   ", false),
            };
            sector[36..36 + 26].copy_from_slice(bytemuck::bytes_of(&ext));
        }
        FatKind::Fat32 => {
            let ext = BpbExtended32 {
                sectors_per_fat_32: U32::new(geometry.sectors_per_fat),
                ext_flags: U16::new(0),
                version: U16::new(0),
                root_cluster: U32::new(2),
                fs_info_sector: U16::new(1),
                backup_boot_sector: U16::new(0),
                reserved: [0; 12],
                drive_number: 0x80,
                reserved1: 0,
                ext_boot_signature: 0x29,
                volume_id: U32::new(volume_id),
                volume_label,
                fs_type: FatStr::from_str_padded("FAT32   ", false),
            };
            sector[36..36 + 54].copy_from_slice(bytemuck::bytes_of(&ext));
        }
    }

    sector[SECTOR_SIZE - 2..].copy_from_slice(&BOOT_SIGNATURE);
    sector
}
