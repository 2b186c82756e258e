use std::io::{Read, Seek};

use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use serde::Serialize;

use crate::error::{Fat16Error, Result};
use crate::image::DiskImage;

/// The boot sector is always addressed in 512-byte units; `sector_size`
/// lives inside the structure being located.
pub const BOOT_SECTOR_SIZE: u64 = 512;

/// FAT16 needs at least this many data clusters (fewer means FAT12).
const FAT16_MIN_CLUSTERS: u64 = 4085;
/// FAT16 supports fewer than this many data clusters (more means FAT32).
const FAT16_MAX_CLUSTERS: u64 = 65525;

/// Decoded BIOS Parameter Block of a FAT16 volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootSector {
    pub jump: [u8; 3],
    pub oem_name: String,
    pub sector_size: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub number_of_fats: u8,
    pub root_dir_entries: u16,
    /// 16-bit total, or the 32-bit field when the short one is zero.
    pub total_sectors: u32,
    pub media_descriptor: u8,
    pub fat_size_sectors: u16,
    pub sectors_per_track: u16,
    pub number_of_heads: u16,
    pub hidden_sectors: u32,
    pub drive_number: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: Option<String>,
    pub fs_type: String,
}

impl BootSector {
    /// Read the boot sector of the partition starting at `partition_start_sector`.
    pub fn read<R: Read + Seek>(
        disk: &mut DiskImage<R>,
        partition_start_sector: u32,
    ) -> Result<Self> {
        let mut raw = [0u8; BOOT_SECTOR_SIZE as usize];
        disk.read_at(partition_start_sector as u64 * BOOT_SECTOR_SIZE, &mut raw)?;
        Self::parse(&raw)
    }

    /// Decode and validate a 512-byte boot sector.
    pub fn parse(bpb: &[u8; 512]) -> Result<Self> {
        let jump = [bpb[0], bpb[1], bpb[2]];
        if jump[0] != 0xEB && jump[0] != 0xE9 {
            warn!("boot sector has unusual jump instruction {:02X?}", jump);
        }

        let sector_size = LittleEndian::read_u16(&bpb[11..13]);
        if sector_size == 0 || !sector_size.is_power_of_two() {
            return Err(Fat16Error::MalformedGeometry(format!(
                "bytes per sector must be a power of two, got {sector_size}"
            )));
        }

        let sectors_per_cluster = bpb[13];
        if sectors_per_cluster == 0 || !sectors_per_cluster.is_power_of_two() {
            return Err(Fat16Error::MalformedGeometry(format!(
                "sectors per cluster must be a power of two, got {sectors_per_cluster}"
            )));
        }

        let number_of_fats = bpb[16];
        if number_of_fats == 0 {
            return Err(Fat16Error::MalformedGeometry(
                "number of FATs is 0".into(),
            ));
        }

        let fat_size_sectors = LittleEndian::read_u16(&bpb[22..24]);
        if fat_size_sectors == 0 {
            return Err(Fat16Error::Unsupported(
                "16-bit FAT size is zero (FAT32 layout)".into(),
            ));
        }

        let total_16 = LittleEndian::read_u16(&bpb[19..21]);
        let total_sectors = if total_16 != 0 {
            total_16 as u32
        } else {
            LittleEndian::read_u32(&bpb[32..36])
        };

        let boot_sector = Self {
            jump,
            oem_name: ascii_field(&bpb[3..11]),
            sector_size,
            sectors_per_cluster,
            reserved_sectors: LittleEndian::read_u16(&bpb[14..16]),
            number_of_fats,
            root_dir_entries: LittleEndian::read_u16(&bpb[17..19]),
            total_sectors,
            media_descriptor: bpb[21],
            fat_size_sectors,
            sectors_per_track: LittleEndian::read_u16(&bpb[24..26]),
            number_of_heads: LittleEndian::read_u16(&bpb[26..28]),
            hidden_sectors: LittleEndian::read_u32(&bpb[28..32]),
            drive_number: bpb[36],
            boot_signature: bpb[38],
            volume_id: LittleEndian::read_u32(&bpb[39..43]),
            volume_label: volume_label(&bpb[43..54]),
            fs_type: ascii_field(&bpb[54..62]),
        };

        let clusters = boot_sector.data_cluster_count();
        if !(FAT16_MIN_CLUSTERS..FAT16_MAX_CLUSTERS).contains(&clusters) {
            warn!(
                "{clusters} data clusters is outside the FAT16 range; reading as FAT16 anyway"
            );
        }

        Ok(boot_sector)
    }

    /// Bytes per cluster.
    pub fn cluster_size(&self) -> u64 {
        self.sector_size as u64 * self.sectors_per_cluster as u64
    }

    /// Sectors taken by the fixed root directory region (rounded up).
    pub fn root_dir_sectors(&self) -> u64 {
        (self.root_dir_entries as u64 * 32).div_ceil(self.sector_size as u64)
    }

    /// Number of clusters in the data region.
    pub fn data_cluster_count(&self) -> u64 {
        let metadata_sectors = self.reserved_sectors as u64
            + self.number_of_fats as u64 * self.fat_size_sectors as u64
            + self.root_dir_sectors();
        (self.total_sectors as u64).saturating_sub(metadata_sectors)
            / self.sectors_per_cluster as u64
    }
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

fn volume_label(bytes: &[u8]) -> Option<String> {
    let label = ascii_field(bytes);
    if label.is_empty() || label == "NO NAME" {
        None
    } else {
        Some(label)
    }
}
