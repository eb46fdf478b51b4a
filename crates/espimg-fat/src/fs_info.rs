//! FAT32 FSInfo sector (§4.6.5): free-cluster hints, written once at
//! `information_sector` (LBA 1 of the partition).

use espimg_common::number::{U32, LE};

use crate::boot_sector::SECTOR_SIZE;

pub const LEAD_SIGNATURE: u32 = 0x4161_5252;
pub const STRUCT_SIGNATURE: u32 = 0x6141_7272;
pub const TRAIL_SIGNATURE: u32 = 0xAA55_0000;

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FsInfoSector {
    pub lead_signature: U32<LE>,
    pub reserved1: [u8; 480],
    pub struct_signature: U32<LE>,
    pub free_count: U32<LE>,
    pub next_free: U32<LE>,
    pub reserved2: [u8; 12],
    pub trail_signature: U32<LE>,
}

static_assertions::const_assert_eq!(core::mem::size_of::<FsInfoSector>(), 512);

/// Free/next-free are left zero rather than computed: they are hints, not
/// structural fields, and filling them correctly needs a second tree pass
/// this formatter has no other reason to make (§9 Decision 5).
pub fn build_fs_info_sector() -> [u8; SECTOR_SIZE] {
    let info = FsInfoSector {
        lead_signature: U32::new(LEAD_SIGNATURE),
        reserved1: [0; 480],
        struct_signature: U32::new(STRUCT_SIGNATURE),
        free_count: U32::new(0),
        next_free: U32::new(0),
        reserved2: [0; 12],
        trail_signature: U32::new(TRAIL_SIGNATURE),
    };
    let mut sector = [0u8; SECTOR_SIZE];
    sector.copy_from_slice(bytemuck::bytes_of(&info));
    sector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_are_in_expected_positions() {
        let sector = build_fs_info_sector();
        assert_eq!(&sector[0..4], &LEAD_SIGNATURE.to_le_bytes());
        assert_eq!(&sector[484..488], &STRUCT_SIGNATURE.to_le_bytes());
        assert_eq!(&sector[508..512], &TRAIL_SIGNATURE.to_le_bytes());
    }
}
