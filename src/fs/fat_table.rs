use std::io::{Read, Seek};

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::error::{Fat16Error, Result};
use crate::image::DiskImage;

/// Classification of one FAT16 entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatLink {
    Next(u16),
    EndOfChain,
    Free,
    Reserved,
    Bad,
}

impl FatLink {
    pub fn from_raw(value: u16) -> Self {
        match value {
            0x0000 => FatLink::Free,
            0x0001 => FatLink::Reserved,
            0x0002..=0xFFEF => FatLink::Next(value),
            0xFFF0..=0xFFF6 => FatLink::Reserved,
            0xFFF7 => FatLink::Bad,
            0xFFF8..=0xFFFF => FatLink::EndOfChain,
        }
    }
}

/// Why a cluster chain walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd {
    EndOfChain,
    Free,
    Reserved,
    Bad,
    /// The chain pointed back at a cluster it had already produced.
    Loop,
}

/// In-memory copy of the first FAT of the volume.
#[derive(Debug, Clone)]
pub struct FatTable {
    entries: Vec<u16>,
}

impl FatTable {
    /// Read `fat_size_sectors * sector_size` bytes at `fat_region_offset` in
    /// one block. Mirror copies are ignored.
    pub fn load<R: Read + Seek>(
        disk: &mut DiskImage<R>,
        fat_region_offset: u64,
        fat_size_sectors: u16,
        sector_size: u16,
    ) -> Result<Self> {
        let len = fat_size_sectors as usize * sector_size as usize;
        let raw = disk.read_vec(fat_region_offset, len)?;
        let table = Self::from_bytes(&raw);
        debug!(
            "loaded FAT: {} entries from offset {fat_region_offset:#X}",
            table.len()
        );
        Ok(table)
    }

    pub fn from_bytes(raw: &[u8]) -> Self {
        let entries = raw.chunks_exact(2).map(LittleEndian::read_u16).collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw 16-bit value stored for `cluster`.
    pub fn raw(&self, cluster: u16) -> Option<u16> {
        self.entries.get(cluster as usize).copied()
    }

    /// Resolve the link stored for `cluster`.
    pub fn next(&self, cluster: u16) -> Result<FatLink> {
        self.raw(cluster).map(FatLink::from_raw).ok_or_else(|| {
            Fat16Error::InvalidData(format!(
                "cluster {cluster} is beyond the FAT ({} entries)",
                self.entries.len()
            ))
        })
    }

    /// Walk the chain starting at `start`.
    pub fn chain(&self, start: u16) -> ClusterChain<'_> {
        ClusterChain {
            fat: self,
            next: Some(start),
            seen: vec![false; self.entries.len()],
            end: None,
        }
    }

    /// Count of clusters marked free (clusters 0 and 1 excluded).
    pub fn free_clusters(&self) -> usize {
        self.entries
            .iter()
            .skip(2)
            .filter(|&&v| FatLink::from_raw(v) == FatLink::Free)
            .count()
    }
}

/// Iterator over the cluster numbers of one chain.
///
/// Yields the start cluster first, then each `Next` link. A cluster whose link
/// is end-of-chain is still yielded; iteration stops after it. Any other
/// non-`Next` link also stops the walk, as does a link back to a cluster the
/// chain already produced. Each cluster is yielded at most once. `end()`
/// reports why.
pub struct ClusterChain<'a> {
    fat: &'a FatTable,
    next: Option<u16>,
    seen: Vec<bool>,
    end: Option<ChainEnd>,
}

impl ClusterChain<'_> {
    /// Reason the chain stopped; `None` while clusters remain.
    pub fn end(&self) -> Option<ChainEnd> {
        self.end
    }
}

impl Iterator for ClusterChain<'_> {
    type Item = Result<u16>;

    fn next(&mut self) -> Option<Self::Item> {
        let cluster = self.next.take()?;

        if cluster < 2 {
            self.end = Some(ChainEnd::Reserved);
            return None;
        }
        if self.seen.get(cluster as usize).copied().unwrap_or(false) {
            debug!("cluster chain revisits cluster {cluster}");
            self.end = Some(ChainEnd::Loop);
            return None;
        }

        match self.fat.next(cluster) {
            Ok(link) => {
                match link {
                    FatLink::Next(n) => self.next = Some(n),
                    FatLink::EndOfChain => self.end = Some(ChainEnd::EndOfChain),
                    FatLink::Free => self.end = Some(ChainEnd::Free),
                    FatLink::Reserved => self.end = Some(ChainEnd::Reserved),
                    FatLink::Bad => self.end = Some(ChainEnd::Bad),
                }
                // `next` succeeded, so the index is inside the table.
                self.seen[cluster as usize] = true;
                Some(Ok(cluster))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
