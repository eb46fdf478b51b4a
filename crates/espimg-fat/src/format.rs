//! Top-level FAT partition emission (§4.6.2–§4.6.6): geometry, FAT tables,
//! directory/file emission, and the FAT32 FSInfo sector, in that order.

use espimg_common::fatstr::FatStr;
use espimg_common::options::Options;
use espimg_fs::{Node, NodeId, Tree};
use espimg_io::SectorWriter;

use crate::boot_sector::{build_boot_sector, FatKind, Geometry, SECTOR_SIZE};
use crate::directory::DirEntry;
use crate::fat_table::{build_fat_table, serialize_fat, start_cluster_of, write_fat_tables, FatEntryWidth};
use crate::fs_info::build_fs_info_sector;
use crate::FatError;

pub type Result<T> = std::result::Result<T, FatError>;

/// Formats `writer` (already `set_origin`'d to the partition's first usable
/// LBA) as a FAT16 or FAT32 volume of `partition_sectors` sectors, populated
/// from `tree` (§4.7 step 5).
pub fn create_fat_partition(
    writer: &mut SectorWriter,
    partition_sectors: u64,
    tree: &mut Tree,
    options: &Options,
) -> Result<()> {
    if !writer.is_good() {
        return Err(FatError::FailedPrecondition(
            "sector writer is not in a good state".to_string(),
        ));
    }
    if partition_sectors == 0 {
        return Err(FatError::FailedPrecondition(
            "cannot format a zero-sector partition".to_string(),
        ));
    }

    let geometry = Geometry::compute(partition_sectors);
    tracing::debug!(kind = ?geometry.kind, sectors = partition_sectors, "selected FAT type");

    let root_is_clustered = geometry.kind == FatKind::Fat32;
    let width = match geometry.kind {
        FatKind::Fat16 => FatEntryWidth::Bits16,
        FatKind::Fat32 => FatEntryWidth::Bits32,
    };

    let entries = build_fat_table(
        tree,
        geometry.bytes_per_cluster(),
        width,
        crate::boot_sector::MEDIA_DESCRIPTOR,
        root_is_clustered,
        geometry.total_data_clusters(),
    )?;

    let volume_label = FatStr::<11>::from_str_padded(&options.label, !options.preserve_case);
    let boot_sector = build_boot_sector(&geometry, volume_label, 1);
    writer.write_raw_sector(0, &boot_sector);

    if geometry.kind == FatKind::Fat32 {
        let fs_info = build_fs_info_sector();
        writer.write_raw_sector(1, &fs_info);
    }

    let fat_bytes = serialize_fat(&entries, width, geometry.sectors_per_fat);
    write_fat_tables(
        writer,
        &fat_bytes,
        geometry.reserved_sectors,
        geometry.sectors_per_fat,
        geometry.num_fats,
    );

    let root_dir_lba = if root_is_clustered {
        geometry.cluster_to_lba(2)
    } else {
        geometry.reserved_sectors as u64 + geometry.num_fats as u64 * geometry.sectors_per_fat as u64
    };

    emit_directory(writer, &geometry, tree, tree.root(), true, root_dir_lba, options, 0)?;

    for id in tree.walk() {
        if id == tree.root() {
            continue;
        }
        if let Node::Directory(_) = tree.get(id) {
            let cluster = start_cluster_of(tree, id);
            let lba = geometry.cluster_to_lba(cluster);
            let parent = tree.get(id).parent();
            let parent_cluster = if parent == tree.root() {
                0
            } else {
                start_cluster_of(tree, parent)
            };
            emit_directory(writer, &geometry, tree, id, false, lba, options, parent_cluster)?;
        } else if let Node::File(file) = tree.get(id) {
            let start = start_cluster_of(tree, id);
            if start == 0 {
                continue;
            }
            emit_file(writer, &geometry, file.data.as_slice(), start);
        }
    }

    writer
        .finish()
        .map_err(|_| FatError::Internal("boot sector or data write failed".to_string()))?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn emit_directory(
    writer: &mut SectorWriter,
    geometry: &Geometry,
    tree: &Tree,
    id: NodeId,
    is_root: bool,
    region_lba: u64,
    options: &Options,
    parent_cluster: u32,
) -> Result<()> {
    let dir = tree.get(id).as_dir().expect("directory node");
    tracing::trace!(name = %dir.name, cluster = start_cluster_of(tree, id), is_root, "emitting directory");
    let region_sectors = if is_root && geometry.kind == FatKind::Fat16 {
        geometry.root_dir_sectors as u64
    } else {
        geometry.sectors_per_cluster as u64
    };
    let capacity_entries = region_sectors as usize * SECTOR_SIZE / 32;

    let mut raw_entries: Vec<DirEntry> = Vec::with_capacity(capacity_entries);

    if is_root {
        raw_entries.push(DirEntry::volume_label(&options.label, options.timestamp));
    } else {
        let own_cluster = start_cluster_of(tree, id);
        raw_entries.push(DirEntry::dot(own_cluster, options.timestamp));
        raw_entries.push(DirEntry::dot_dot(parent_cluster, options.timestamp));
    }

    for (name, child_id) in &dir.children {
        let child = tree.get(*child_id);
        let cluster = start_cluster_of(tree, *child_id);
        let (is_directory, size) = match child {
            Node::Directory(_) => (true, 0),
            Node::File(f) => (false, f.size()),
        };
        let entry = DirEntry::for_child(
            name,
            options.preserve_case,
            is_directory,
            cluster,
            size,
            options.timestamp,
        )?;
        raw_entries.push(entry);
    }

    if raw_entries.len() > capacity_entries {
        return Err(FatError::DirectoryTooLarge(dir.name.clone()));
    }

    let mut bytes = vec![0u8; region_sectors as usize * SECTOR_SIZE];
    for (i, entry) in raw_entries.iter().enumerate() {
        let offset = i * 32;
        bytes[offset..offset + 32].copy_from_slice(bytemuck::bytes_of(entry));
    }

    for sector_idx in 0..region_sectors {
        let offset = sector_idx as usize * SECTOR_SIZE;
        let mut sector = [0u8; SECTOR_SIZE];
        sector.copy_from_slice(&bytes[offset..offset + SECTOR_SIZE]);
        writer.write_raw_sector(region_lba + sector_idx, &sector);
    }

    Ok(())
}

fn emit_file(writer: &mut SectorWriter, geometry: &Geometry, data: &[u8], start_cluster: u32) {
    let bytes_per_cluster = geometry.bytes_per_cluster();
    let num_clusters = (data.len() as u64).div_ceil(bytes_per_cluster).max(1);
    let start_lba = geometry.cluster_to_lba(start_cluster);
    let sectors_per_cluster = geometry.sectors_per_cluster as u64;
    let total_sectors = num_clusters * sectors_per_cluster;

    for sector_idx in 0..total_sectors {
        let offset = sector_idx as usize * SECTOR_SIZE;
        let mut sector = [0u8; SECTOR_SIZE];
        if offset < data.len() {
            let end = (offset + SECTOR_SIZE).min(data.len());
            sector[..end - offset].copy_from_slice(&data[offset..end]);
        }
        writer.write_raw_sector(start_lba + sector_idx, &sector);
    }
}
