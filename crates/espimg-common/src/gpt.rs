//! GPT on-disk structures (header and partition entry), bit-exact per the
//! published GPT layout. Every LBA-valued field is 8 bytes wide; a `U32`
//! here would silently truncate `last_usable_lba`/`partition_entry_lba` on
//! any disk over 4 billion sectors (2 TiB at 512-byte sectors).

use crate::endian::LittleEndian;
use crate::guid::Guid;
use crate::number::{U32, U64};

pub const GPT_SIGNATURE: [u8; 8] = *b"EFI PART";
pub const GPT_REVISION: u32 = 0x0001_0000;
pub const GPT_HEADER_SIZE: u32 = 92;
pub const GPT_PARTITION_ENTRY_SIZE: u32 = 128;

type LE = LittleEndian;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GptHeader {
    pub signature: [u8; 8],
    pub revision: U32<LE>,
    pub header_size: U32<LE>,
    pub header_crc32: U32<LE>,
    pub reserved: U32<LE>,
    pub my_lba: U64<LE>,
    pub alternate_lba: U64<LE>,
    pub first_usable_lba: U64<LE>,
    pub last_usable_lba: U64<LE>,
    pub disk_guid: Guid,
    pub partition_entry_lba: U64<LE>,
    pub partition_entry_count: U32<LE>,
    pub partition_entry_size: U32<LE>,
    pub partition_array_crc32: U32<LE>,
}

static_assertions::const_assert_eq!(core::mem::size_of::<GptHeader>(), 92);

impl Default for GptHeader {
    fn default() -> Self {
        Self {
            signature: GPT_SIGNATURE,
            revision: U32::new(GPT_REVISION),
            header_size: U32::new(GPT_HEADER_SIZE),
            header_crc32: U32::new(0),
            reserved: U32::new(0),
            my_lba: U64::new(0),
            alternate_lba: U64::new(0),
            first_usable_lba: U64::new(0),
            last_usable_lba: U64::new(0),
            disk_guid: Guid::ZERO,
            partition_entry_lba: U64::new(0),
            partition_entry_count: U32::new(0),
            partition_entry_size: U32::new(GPT_PARTITION_ENTRY_SIZE),
            partition_array_crc32: U32::new(0),
        }
    }
}

impl GptHeader {
    /// Computes `crc32` over `self` with `header_crc32` treated as zero,
    /// without mutating `self`.
    pub fn compute_crc32(&self) -> u32 {
        let mut copy = *self;
        copy.header_crc32 = U32::new(0);
        crate::crc::crc32(bytemuck::bytes_of(&copy))
    }
}

/// UTF-16LE partition name, `N` code units wide (36 for GPT: 72 bytes).
/// `from_ascii` writes one trailing space after the name, then zero-fills
/// the rest.
#[repr(transparent)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FixedUtf16Name<const N: usize> {
    units: [U16LE; N],
}

type U16LE = crate::number::U16<LittleEndian>;

impl<const N: usize> FixedUtf16Name<N> {
    pub fn from_ascii(name: &str) -> Self {
        let mut units = [U16LE::new(0); N];
        let len = name.len();
        for (i, slot) in units.iter_mut().enumerate() {
            let value = match i.cmp(&len) {
                core::cmp::Ordering::Less => name.as_bytes()[i] as u16,
                core::cmp::Ordering::Equal => b' ' as u16,
                core::cmp::Ordering::Greater => 0,
            };
            *slot = U16LE::new(value);
        }
        Self { units }
    }
}

impl<const N: usize> Default for FixedUtf16Name<N> {
    fn default() -> Self {
        Self {
            units: [U16LE::new(0); N],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GptPartitionEntry {
    pub type_guid: Guid,
    pub unique_partition_guid: Guid,
    pub starting_lba: U64<LE>,
    pub ending_lba: U64<LE>,
    pub attributes: U64<LE>,
    pub partition_name: FixedUtf16Name<36>,
}

static_assertions::const_assert_eq!(core::mem::size_of::<GptPartitionEntry>(), 128);

impl Default for GptPartitionEntry {
    fn default() -> Self {
        Self {
            type_guid: Guid::ZERO,
            unique_partition_guid: Guid::ZERO,
            starting_lba: U64::new(0),
            ending_lba: U64::new(0),
            attributes: U64::new(0),
            partition_name: FixedUtf16Name::default(),
        }
    }
}

/// Required, no-auto-mount attribute bit (bit 0), per §4.5 step 3.
pub const GPT_ATTR_REQUIRED: u64 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_matches_spec() {
        assert_eq!(core::mem::size_of::<GptHeader>(), 92);
    }

    #[test]
    fn entry_size_matches_spec() {
        assert_eq!(core::mem::size_of::<GptPartitionEntry>(), 128);
    }

    #[test]
    fn crc32_is_computed_with_field_zeroed() {
        let mut header = GptHeader::default();
        header.my_lba = U64::new(1);
        header.header_crc32 = U32::new(0xdead_beef);
        let crc_with_garbage = header.compute_crc32();
        header.header_crc32 = U32::new(0);
        let crc_with_zero = header.compute_crc32();
        assert_eq!(crc_with_garbage, crc_with_zero);
    }

    #[test]
    fn partition_name_pads_one_space_then_zeros() {
        let name = FixedUtf16Name::<36>::from_ascii("EFI BOOT");
        let bytes = bytemuck::bytes_of(&name);
        // "EFI BOOT" is 8 ASCII chars: code units 0..8 hold it, unit 8 is a
        // single 0x0020 pad, and everything after is zero.
        for (i, ch) in "EFI BOOT".chars().enumerate() {
            assert_eq!(&bytes[i * 2..i * 2 + 2], &(ch as u16).to_le_bytes());
        }
        assert_eq!(&bytes[8 * 2..8 * 2 + 2], &0x0020u16.to_le_bytes());
        assert!(bytes[9 * 2..].iter().all(|&b| b == 0));
    }
}
