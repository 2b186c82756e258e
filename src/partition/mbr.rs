use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use serde::Serialize;
use std::io::{Read, Seek};

use crate::error::{Fat16Error, Result};
use crate::image::DiskImage;

const MBR_SIGNATURE: u16 = 0xAA55;
pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;
pub const PARTITION_ENTRY_SIZE: usize = 16;

/// Partition type ids that carry a FAT16 volume (plain, LBA and hidden variants).
const FAT16_TYPES: [u8; 6] = [0x04, 0x06, 0x0E, 0x14, 0x16, 0x1E];

/// CHS (Cylinder-Head-Sector) address extracted from MBR partition entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChsAddress {
    pub head: u8,
    pub sector: u8,    // bits 0-5 only
    pub cylinder: u16, // 10 bits: 2 high bits from sector byte + cylinder byte
}

impl ChsAddress {
    fn parse(bytes: &[u8]) -> Self {
        Self {
            head: bytes[0],
            sector: bytes[1] & 0x3F,
            cylinder: ((bytes[1] as u16 & 0xC0) << 2) | bytes[2] as u16,
        }
    }
}

/// A single MBR partition table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionEntry {
    pub boot_flag: u8,
    pub partition_type: u8,
    pub start_sector: u32,
    pub length_sectors: u32,
    pub chs_start: ChsAddress,
    pub chs_end: ChsAddress,
}

impl PartitionEntry {
    /// Decode one 16-byte descriptor.
    pub fn parse(data: &[u8; PARTITION_ENTRY_SIZE]) -> Self {
        Self {
            boot_flag: data[0],
            chs_start: ChsAddress::parse(&data[1..4]),
            partition_type: data[4],
            chs_end: ChsAddress::parse(&data[5..8]),
            start_sector: LittleEndian::read_u32(&data[8..12]),
            length_sectors: LittleEndian::read_u32(&data[12..16]),
        }
    }

    pub fn is_bootable(&self) -> bool {
        self.boot_flag == 0x80
    }

    pub fn is_empty(&self) -> bool {
        self.partition_type == 0x00 && self.start_sector == 0 && self.length_sectors == 0
    }

    pub fn is_fat16(&self) -> bool {
        FAT16_TYPES.contains(&self.partition_type)
    }

    pub fn size_bytes(&self) -> u64 {
        self.length_sectors as u64 * 512
    }

    pub fn partition_type_name(&self) -> &'static str {
        match self.partition_type {
            0x00 => "Empty",
            0x01 => "FAT12",
            0x04 => "FAT16 (<32MB)",
            0x05 => "Extended",
            0x06 => "FAT16 (>32MB)",
            0x07 => "NTFS/HPFS/exFAT",
            0x0B => "FAT32 (CHS)",
            0x0C => "FAT32 (LBA)",
            0x0E => "FAT16 (LBA)",
            0x0F => "Extended (LBA)",
            0x11 => "Hidden FAT12",
            0x14 => "Hidden FAT16 (<32MB)",
            0x16 => "Hidden FAT16 (>32MB)",
            0x1B => "Hidden FAT32 (CHS)",
            0x1C => "Hidden FAT32 (LBA)",
            0x1E => "Hidden FAT16 (LBA)",
            0x82 => "Linux swap",
            0x83 => "Linux",
            0xEE => "GPT Protective",
            0xEF => "EFI System",
            _ => "Unknown",
        }
    }
}

/// Parsed MBR (Master Boot Record).
#[derive(Debug, Clone, Serialize)]
pub struct Mbr {
    pub disk_signature: u32,
    pub entries: [PartitionEntry; 4],
}

impl Mbr {
    /// Read and decode sector 0 of the image.
    pub fn read<R: Read + Seek>(disk: &mut DiskImage<R>) -> Result<Self> {
        let sector = disk
            .read_sector(0)
            .map_err(|e| Fat16Error::InvalidMbr(format!("cannot read first sector: {e}")))?;
        Self::parse(&sector)
    }

    /// Parse an MBR from exactly 512 bytes.
    pub fn parse(data: &[u8; 512]) -> Result<Self> {
        let signature = LittleEndian::read_u16(&data[510..512]);
        if signature != MBR_SIGNATURE {
            return Err(Fat16Error::InvalidMbr(format!(
                "invalid boot signature: expected 0xAA55, got {signature:#06X}"
            )));
        }

        let disk_signature = LittleEndian::read_u32(&data[440..444]);

        let entries = std::array::from_fn(|i| {
            let offset = PARTITION_TABLE_OFFSET + i * PARTITION_ENTRY_SIZE;
            let mut raw = [0u8; PARTITION_ENTRY_SIZE];
            raw.copy_from_slice(&data[offset..offset + PARTITION_ENTRY_SIZE]);
            PartitionEntry::parse(&raw)
        });

        Ok(Self {
            disk_signature,
            entries,
        })
    }

    /// Return only non-empty partition entries, with their table index.
    pub fn active_entries(&self) -> Vec<(usize, &PartitionEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_empty())
            .collect()
    }

    /// Choose the partition to mount.
    ///
    /// An explicit index is honoured as long as the slot is in use, whatever
    /// its type byte. Otherwise the first entry typed as FAT16 wins, falling
    /// back to the first slot in use; the boot sector decides from there.
    pub fn select_fat16(&self, index: Option<usize>) -> Result<(usize, &PartitionEntry)> {
        match index {
            Some(i) => {
                let entry = self.entries.get(i).ok_or_else(|| {
                    Fat16Error::NoFat16Partition(format!("partition index {i} out of range (0-3)"))
                })?;
                if entry.is_empty() {
                    return Err(Fat16Error::NoFat16Partition(format!(
                        "partition {i} is empty"
                    )));
                }
                Ok((i, entry))
            }
            None => {
                if let Some(found) = self
                    .entries
                    .iter()
                    .enumerate()
                    .find(|(_, e)| e.is_fat16() && e.start_sector != 0)
                {
                    return Ok(found);
                }
                let (i, entry) = self
                    .entries
                    .iter()
                    .enumerate()
                    .find(|(_, e)| !e.is_empty())
                    .ok_or_else(|| {
                        Fat16Error::NoFat16Partition("partition table has no entries".into())
                    })?;
                warn!(
                    "no FAT16 type id in the partition table, trying partition {i} ({})",
                    entry.partition_type_name()
                );
                Ok((i, entry))
            }
        }
    }
}
