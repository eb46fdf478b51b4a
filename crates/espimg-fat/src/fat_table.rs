//! The File Allocation Table: a single generalized table-writer driven by one
//! depth-first walk of the FS tree, over either entry width (§4.6.3, §9
//! Decision 2 — this is what closes the FAT32-reusing-FAT16-width bug).

use espimg_fs::{Node, NodeId, Tree};

use crate::boot_sector::SECTOR_SIZE;
use crate::FatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntryWidth {
    Bits16,
    Bits32,
}

impl FatEntryWidth {
    pub fn bytes(self) -> usize {
        match self {
            FatEntryWidth::Bits16 => 2,
            FatEntryWidth::Bits32 => 4,
        }
    }

    pub fn eoc(self) -> u32 {
        match self {
            FatEntryWidth::Bits16 => 0xFFF8,
            FatEntryWidth::Bits32 => 0x0FFF_FFF8,
        }
    }

    fn reserved_entry_zero(self, media_descriptor: u8) -> u32 {
        match self {
            FatEntryWidth::Bits16 => 0xFF00 | media_descriptor as u32,
            FatEntryWidth::Bits32 => 0x0FFF_FF00 | media_descriptor as u32,
        }
    }
}

/// Walks `tree` depth-first, assigning a start cluster to every directory
/// and file and recording the next-cluster chain for each, then returns the
/// logical (pre-serialization) FAT entry array including the two reserved
/// entries. `root_is_clustered` is true for FAT32 (root occupies cluster 2)
/// and false for FAT16 (root is a fixed, unclustered region).
pub fn build_fat_table(
    tree: &mut Tree,
    bytes_per_cluster: u64,
    width: FatEntryWidth,
    media_descriptor: u8,
    root_is_clustered: bool,
    total_data_clusters: u64,
) -> Result<Vec<u32>, FatError> {
    let mut entries = vec![0u32; 2];
    entries[0] = width.reserved_entry_zero(media_descriptor);
    entries[1] = width.eoc();
    let mut next_free_cluster: u32 = 2;

    let ensure_len = |entries: &mut Vec<u32>, needed: usize| {
        if entries.len() < needed {
            entries.resize(needed, 0);
        }
    };

    for id in tree.walk() {
        if id == tree.root() && !root_is_clustered {
            continue;
        }
        if (next_free_cluster as u64) > total_data_clusters + 1 {
            return Err(FatError::ResourceExhausted(
                "no free cluster remaining during FAT emission".to_string(),
            ));
        }

        match tree.get(id) {
            Node::Directory(_) => {
                let cluster = next_free_cluster;
                ensure_len(&mut entries, cluster as usize + 1);
                entries[cluster as usize] = width.eoc();
                tree.set_start_cluster(id, cluster);
                next_free_cluster += 1;
            }
            Node::File(file) => {
                let size = file.size() as u64;
                if size == 0 {
                    // Empty files own no cluster; first_cluster stays 0.
                    continue;
                }
                let num_clusters = size.div_ceil(bytes_per_cluster) as u32;
                if next_free_cluster as u64 + num_clusters as u64 > total_data_clusters + 2 {
                    return Err(FatError::ResourceExhausted(format!(
                        "file needs {num_clusters} clusters but only {} remain",
                        total_data_clusters + 2 - next_free_cluster as u64
                    )));
                }
                let start = next_free_cluster;
                ensure_len(&mut entries, (start + num_clusters) as usize);
                for i in 0..num_clusters {
                    let cluster = start + i;
                    entries[cluster as usize] = if i + 1 < num_clusters {
                        cluster + 1
                    } else {
                        width.eoc()
                    };
                }
                tree.set_start_cluster(id, start);
                next_free_cluster += num_clusters;
            }
        }
    }

    Ok(entries)
}

/// Returns the start cluster the walk assigned to `id`, or `0` for an empty
/// file that never consumed a cluster.
pub fn start_cluster_of(tree: &Tree, id: NodeId) -> u32 {
    match tree.get(id) {
        Node::Directory(d) => d.start_cluster.unwrap_or(0),
        Node::File(f) => f.start_cluster.unwrap_or(0),
    }
}

/// Serializes the logical FAT entry array into `sectors_per_fat` sectors'
/// worth of bytes at `width`, truncating/zero-padding as needed.
pub fn serialize_fat(entries: &[u32], width: FatEntryWidth, sectors_per_fat: u32) -> Vec<u8> {
    let total_bytes = sectors_per_fat as usize * SECTOR_SIZE;
    let mut buf = vec![0u8; total_bytes];
    for (i, &entry) in entries.iter().enumerate() {
        let offset = i * width.bytes();
        if offset + width.bytes() > buf.len() {
            break;
        }
        match width {
            FatEntryWidth::Bits16 => {
                buf[offset..offset + 2].copy_from_slice(&(entry as u16).to_le_bytes());
            }
            FatEntryWidth::Bits32 => {
                let masked = entry & 0x0FFF_FFFF;
                buf[offset..offset + 4].copy_from_slice(&masked.to_le_bytes());
            }
        }
    }
    buf
}

/// Writes `fat_bytes` identically to both FAT copies (§9 Decision 1), each
/// `sectors_per_fat` sectors long, starting at `reserved_sectors`.
pub fn write_fat_tables(
    writer: &mut espimg_io::SectorWriter,
    fat_bytes: &[u8],
    reserved_sectors: u16,
    sectors_per_fat: u32,
    num_fats: u8,
) {
    for copy in 0..num_fats as u64 {
        let copy_start_lba = reserved_sectors as u64 + copy * sectors_per_fat as u64;
        for sector_idx in 0..sectors_per_fat as u64 {
            let offset = sector_idx as usize * SECTOR_SIZE;
            let mut sector = [0u8; SECTOR_SIZE];
            if offset < fat_bytes.len() {
                let end = (offset + SECTOR_SIZE).min(fat_bytes.len());
                sector[..end - offset].copy_from_slice(&fat_bytes[offset..end]);
            }
            writer.write_raw_sector(copy_start_lba + sector_idx, &sector);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use espimg_fs::Tree;

    #[test]
    fn reserved_entries_carry_media_descriptor_and_eoc() {
        let mut tree = Tree::new(false);
        let entries =
            build_fat_table(&mut tree, 2048, FatEntryWidth::Bits16, 0xF8, false, 1024).unwrap();
        assert_eq!(entries[0], 0xFFF8);
        assert_eq!(entries[1], 0xFFF8);
    }

    #[test]
    fn nested_directories_allocate_depth_first() {
        let mut tree = Tree::new(false);
        let a = tree.create_directory(tree.root(), "A").unwrap();
        let b = tree.create_directory(a, "B").unwrap();
        let c = tree.create_directory(b, "C").unwrap();
        let file = tree.create_file(c, "FILE.BIN", vec![0x42]).unwrap();

        build_fat_table(&mut tree, 512, FatEntryWidth::Bits16, 0xF8, false, 1024).unwrap();

        assert_eq!(start_cluster_of(&tree, a), 2);
        assert_eq!(start_cluster_of(&tree, b), 3);
        assert_eq!(start_cluster_of(&tree, c), 4);
        assert_eq!(start_cluster_of(&tree, file), 5);
    }

    #[test]
    fn nested_directories_allocate_depth_first_under_fat32_width() {
        let mut tree = Tree::new(false);
        let a = tree.create_directory(tree.root(), "A").unwrap();
        let b = tree.create_directory(a, "B").unwrap();
        let c = tree.create_directory(b, "C").unwrap();
        let file = tree.create_file(c, "FILE.BIN", vec![0x42]).unwrap();

        // FAT32's root occupies cluster 2, shifting every other allocation up by one.
        build_fat_table(&mut tree, 512, FatEntryWidth::Bits32, 0xF8, true, 1024).unwrap();

        assert_eq!(start_cluster_of(&tree, tree.root()), 2);
        assert_eq!(start_cluster_of(&tree, a), 3);
        assert_eq!(start_cluster_of(&tree, b), 4);
        assert_eq!(start_cluster_of(&tree, c), 5);
        assert_eq!(start_cluster_of(&tree, file), 6);
    }

    #[test]
    fn file_spanning_two_clusters_chains_then_terminates() {
        let mut tree = Tree::new(false);
        let efi = tree.create_directory(tree.root(), "EFI").unwrap();
        let boot = tree.create_directory(efi, "BOOT").unwrap();
        let file = tree
            .create_file(boot, "BOOTX64.EFI", vec![0xAB; 513])
            .unwrap();

        let entries = build_fat_table(&mut tree, 512, FatEntryWidth::Bits16, 0xF8, false, 1024)
            .unwrap();
        let start = start_cluster_of(&tree, file);
        assert_eq!(entries[start as usize], start + 1);
        assert_eq!(entries[(start + 1) as usize], 0xFFF8);
    }

    #[test]
    fn serialized_fat32_entries_mask_upper_nibble() {
        let mut entries = vec![0u32; 4];
        entries[2] = 0xFFFF_FFFF;
        let bytes = serialize_fat(&entries, FatEntryWidth::Bits32, 1);
        assert_eq!(&bytes[8..12], &[0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn both_fat_copies_are_written_identically() {
        let file = tempfile::tempfile().unwrap();
        file.set_len(SECTOR_SIZE as u64 * 16).unwrap();
        let mut writer = espimg_io::SectorWriter::new(file);
        let entries = vec![0xFFF8u32, 0xFFF8, 5, 0xFFF8];
        let bytes = serialize_fat(&entries, FatEntryWidth::Bits16, 2);
        write_fat_tables(&mut writer, &bytes, 1, 2, 2);

        use espimg_io::SectorReader;
        let mut first = [0u8; SECTOR_SIZE];
        let mut second = [0u8; SECTOR_SIZE];
        writer.read_sector(1, &mut first).unwrap();
        writer.read_sector(3, &mut second).unwrap();
        assert_eq!(first, second);
    }
}
