use serde::Serialize;

use super::boot_sector::{BootSector, BOOT_SECTOR_SIZE};

/// Byte offsets of every region of a mounted FAT16 volume.
///
/// Pure arithmetic over the boot sector and the partition start; no I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub boot_sector_offset: u64,
    pub fat_region_offset: u64,
    pub root_dir_offset: u64,
    pub data_region_offset: u64,
    sector_size: u64,
    sectors_per_cluster: u64,
    root_dir_entries: u16,
    cluster_count: u64,
}

impl Layout {
    pub fn new(boot_sector: &BootSector, partition_start_sector: u32) -> Self {
        let sector_size = boot_sector.sector_size as u64;
        let reserved = boot_sector.reserved_sectors as u64;
        let fat_sectors =
            boot_sector.fat_size_sectors as u64 * boot_sector.number_of_fats as u64;

        let boot_sector_offset = partition_start_sector as u64 * BOOT_SECTOR_SIZE;
        let fat_region_offset = boot_sector_offset + reserved * sector_size;
        let root_dir_offset = boot_sector_offset + (reserved + fat_sectors) * sector_size;
        let data_region_offset =
            root_dir_offset + boot_sector.root_dir_sectors() * sector_size;

        Self {
            boot_sector_offset,
            fat_region_offset,
            root_dir_offset,
            data_region_offset,
            sector_size,
            sectors_per_cluster: boot_sector.sectors_per_cluster as u64,
            root_dir_entries: boot_sector.root_dir_entries,
            cluster_count: boot_sector.data_cluster_count(),
        }
    }

    /// Absolute offset of the first byte of `cluster`; `None` for 0 and 1.
    pub fn cluster_to_offset(&self, cluster: u16) -> Option<u64> {
        if cluster < 2 {
            return None;
        }
        Some(self.data_region_offset + (cluster as u64 - 2) * self.cluster_size())
    }

    /// Bytes per cluster.
    pub fn cluster_size(&self) -> u64 {
        self.sectors_per_cluster * self.sector_size
    }

    pub fn sector_size(&self) -> u64 {
        self.sector_size
    }

    pub fn root_dir_entries(&self) -> u16 {
        self.root_dir_entries
    }

    /// Size in bytes of the records of the fixed root directory.
    pub fn root_dir_size(&self) -> u64 {
        self.root_dir_entries as u64 * 32
    }

    /// Data clusters on the volume, as computed from the BPB totals.
    pub fn cluster_count(&self) -> u64 {
        self.cluster_count
    }
}
