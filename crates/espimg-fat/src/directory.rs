//! The 32-byte FAT directory entry (§6.6) and the short-name/attribute/
//! timestamp fields it's built from.

use espimg_common::fatstr::{compose_short_name, FatStr, ShortNameError};
use espimg_common::number::{U16, U32, LE};
use espimg_common::options::FatTimestamp;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        const LONG_NAME = 0x0F;
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirEntry {
    pub short_name: [u8; 11],
    pub attrib: u8,
    pub reserved: u8,
    pub creation_time_tenth: u8,
    pub creation_time: U16<LE>,
    pub creation_date: U16<LE>,
    pub last_access_date: U16<LE>,
    pub first_cluster_hi: U16<LE>,
    pub write_time: U16<LE>,
    pub write_date: U16<LE>,
    pub first_cluster_lo: U16<LE>,
    pub size: U32<LE>,
}

static_assertions::const_assert_eq!(core::mem::size_of::<DirEntry>(), 32);

impl DirEntry {
    fn stamped(short_name: [u8; 11], attrib: FileAttributes, cluster: u32, size: u32, timestamp: FatTimestamp) -> Self {
        Self {
            short_name,
            attrib: attrib.bits(),
            reserved: 0,
            creation_time_tenth: 0,
            creation_time: U16::new(timestamp.time),
            creation_date: U16::new(timestamp.date),
            last_access_date: U16::new(timestamp.date),
            first_cluster_hi: U16::new((cluster >> 16) as u16),
            write_time: U16::new(timestamp.time),
            write_date: U16::new(timestamp.date),
            first_cluster_lo: U16::new(cluster as u16),
            size: U32::new(size),
        }
    }

    /// The volume-label entry, root directory's first entry (§4.6.1, §8.8).
    pub fn volume_label(label: &str, timestamp: FatTimestamp) -> Self {
        let padded = FatStr::<11>::from_str_padded(label, true);
        Self::stamped(*padded.as_bytes(), FileAttributes::VOLUME_ID, 0, 0, timestamp)
    }

    /// `.` entry pointing to `cluster` (itself).
    pub fn dot(cluster: u32, timestamp: FatTimestamp) -> Self {
        let mut name = [FatStr::<11>::SPACE; 11];
        name[0] = b'.';
        Self::stamped(name, FileAttributes::DIRECTORY, cluster, 0, timestamp)
    }

    /// `..` entry pointing to `parent_cluster` (0 if the parent is the root).
    pub fn dot_dot(parent_cluster: u32, timestamp: FatTimestamp) -> Self {
        let mut name = [FatStr::<11>::SPACE; 11];
        name[0] = b'.';
        name[1] = b'.';
        Self::stamped(name, FileAttributes::DIRECTORY, parent_cluster, 0, timestamp)
    }

    /// An entry for a child directory or file, short-name composed from
    /// `name` (§9 Decision 4: rejects rather than truncates).
    pub fn for_child(
        name: &str,
        preserve_case: bool,
        is_directory: bool,
        cluster: u32,
        size: u32,
        timestamp: FatTimestamp,
    ) -> Result<Self, ShortNameError> {
        let short = compose_short_name(name, preserve_case)?;
        let attrib = if is_directory {
            FileAttributes::DIRECTORY
        } else {
            FileAttributes::ARCHIVE
        };
        Ok(Self::stamped(short.to_field_bytes(), attrib, cluster, size, timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_label_has_volume_id_attribute_and_padded_name() {
        let entry = DirEntry::volume_label("NOLABEL", FatTimestamp::default());
        assert_eq!(entry.attrib, FileAttributes::VOLUME_ID.bits());
        assert_eq!(&entry.short_name, b"NOLABEL    ");
    }

    #[test]
    fn dot_and_dot_dot_have_directory_attribute() {
        let dot = DirEntry::dot(5, FatTimestamp::default());
        let dot_dot = DirEntry::dot_dot(0, FatTimestamp::default());
        assert_eq!(&dot.short_name, b".          ");
        assert_eq!(&dot_dot.short_name, b"..         ");
        assert_eq!(dot.attrib, FileAttributes::DIRECTORY.bits());
        assert_eq!(dot_dot.attrib, FileAttributes::DIRECTORY.bits());
        assert_eq!(dot.first_cluster_lo.get(), 5);
        assert_eq!(dot_dot.first_cluster_lo.get(), 0);
    }

    #[test]
    fn file_entry_rejects_bad_short_name() {
        let result = DirEntry::for_child("a.b.c", false, false, 4, 0, FatTimestamp::default());
        assert!(result.is_err());
    }
}
