use std::collections::HashSet;
use std::io::{Read, Seek, Write};

use log::{debug, info, warn};

use super::boot_sector::BootSector;
use super::dir_entry::DirectoryEntry;
use super::fat_table::{ChainEnd, FatTable};
use super::layout::Layout;
use super::listing::{self, DirectoryListing, DirectoryLocation, ListingSummary};
use crate::error::{Fat16Error, Result};
use crate::image::DiskImage;
use crate::partition::{Mbr, PartitionEntry};

/// Everything derived from the image at mount time.
///
/// The disk handle is the only part that changes (its seek position), which
/// is why reads take `&mut self`.
pub struct Volume<R> {
    disk: DiskImage<R>,
    mbr: Mbr,
    partition_index: usize,
    boot_sector: BootSector,
    layout: Layout,
    fat: FatTable,
}

impl<R: Read + Seek> Volume<R> {
    /// Read the partition table, pick the FAT16 partition (or the one at
    /// `partition_index`), decode its boot sector and load the first FAT.
    pub fn mount(mut disk: DiskImage<R>, partition_index: Option<usize>) -> Result<Self> {
        let mbr = Mbr::read(&mut disk)?;
        let (index, partition) = mbr.select_fat16(partition_index)?;
        let start = partition.start_sector;
        info!(
            "mounting partition {index} ({}) at sector {start}",
            partition.partition_type_name()
        );

        let boot_sector = BootSector::read(&mut disk, start)?;
        let layout = Layout::new(&boot_sector, start);
        let fat = FatTable::load(
            &mut disk,
            layout.fat_region_offset,
            boot_sector.fat_size_sectors,
            boot_sector.sector_size,
        )?;
        debug!("volume layout: {layout:?}");

        Ok(Self {
            disk,
            mbr,
            partition_index: index,
            boot_sector,
            layout,
            fat,
        })
    }

    pub fn mbr(&self) -> &Mbr {
        &self.mbr
    }

    pub fn partition_index(&self) -> usize {
        self.partition_index
    }

    pub fn partition(&self) -> &PartitionEntry {
        &self.mbr.entries[self.partition_index]
    }

    pub fn boot_sector(&self) -> &BootSector {
        &self.boot_sector
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fat(&self) -> &FatTable {
        &self.fat
    }

    /// Read the listing stored at `location`.
    pub fn load_directory(&mut self, location: DirectoryLocation) -> Result<DirectoryListing> {
        match location {
            DirectoryLocation::Root => listing::load_root(
                &mut self.disk,
                &self.layout,
                self.boot_sector.root_dir_entries,
            ),
            DirectoryLocation::Cluster(cluster) => {
                listing::load_subdirectory(&mut self.disk, &self.fat, &self.layout, cluster)
            }
        }
    }

    /// Stream a file's content into `sink`, cluster by cluster.
    ///
    /// Stops after `file_size` bytes or at the end of the chain, whichever
    /// comes first; the latter is reported as truncation.
    pub fn read_entry(
        &mut self,
        entry: &DirectoryEntry,
        sink: &mut dyn Write,
    ) -> Result<ReadOutcome> {
        let declared = entry.file_size as u64;
        if declared == 0 {
            return Ok(ReadOutcome::Complete { bytes: 0 });
        }

        let cluster_size = self.layout.cluster_size();
        let mut buf = vec![0u8; cluster_size as usize];
        let mut delivered = 0u64;
        let mut chain = self.fat.chain(entry.starting_cluster);

        for cluster in chain.by_ref() {
            let cluster = cluster?;
            let offset = self.layout.cluster_to_offset(cluster).ok_or_else(|| {
                Fat16Error::InvalidData(format!("file chain entered cluster {cluster}"))
            })?;
            let take = (declared - delivered).min(cluster_size) as usize;
            self.disk.read_at(offset, &mut buf[..take])?;
            sink.write_all(&buf[..take])?;
            delivered += take as u64;
            if delivered == declared {
                break;
            }
        }
        sink.flush()?;

        if delivered < declared {
            let end = chain.end().unwrap_or(ChainEnd::Reserved);
            warn!(
                "{}: chain ended ({end:?}) after {delivered} of {declared} bytes",
                entry.name()
            );
            return Ok(ReadOutcome::Truncated {
                delivered,
                declared,
            });
        }
        Ok(ReadOutcome::Complete { bytes: delivered })
    }

    pub fn into_disk(self) -> DiskImage<R> {
        self.disk
    }
}

/// Result of a change-directory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDirectory {
    Changed,
    NotFound,
    NotADirectory,
}

/// Result of a file read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Complete { bytes: u64 },
    /// The cluster chain ran out before `declared` bytes were delivered.
    Truncated { delivered: u64, declared: u64 },
    NotFound,
    IsDirectory,
}

/// A mounted volume plus the one current directory.
pub struct Navigator<R> {
    volume: Volume<R>,
    current: DirectoryListing,
    path: Vec<String>,
}

impl<R: Read + Seek> Navigator<R> {
    /// Start at the root directory.
    pub fn new(mut volume: Volume<R>) -> Result<Self> {
        let current = volume.load_directory(DirectoryLocation::Root)?;
        Ok(Self {
            volume,
            current,
            path: Vec::new(),
        })
    }

    pub fn volume(&self) -> &Volume<R> {
        &self.volume
    }

    pub fn current(&self) -> &DirectoryListing {
        &self.current
    }

    /// Display path of the current directory, e.g. `/ADR1/SUB`.
    pub fn path(&self) -> String {
        format!("/{}", self.path.join("/"))
    }

    /// Replace the current listing with the directory called `name`.
    ///
    /// Unknown names and files leave the current directory as it was.
    pub fn change_directory(&mut self, name: &str) -> Result<ChangeDirectory> {
        if name == "." {
            return Ok(ChangeDirectory::Changed);
        }

        let Some(entry) = self.current.find_by_name(name) else {
            return Ok(ChangeDirectory::NotFound);
        };
        if !entry.is_directory() || entry.is_volume_label() {
            return Ok(ChangeDirectory::NotADirectory);
        }

        let location = DirectoryLocation::from_cluster(entry.starting_cluster);
        self.current = self.volume.load_directory(location)?;

        if location == DirectoryLocation::Root {
            self.path.clear();
        } else if name == ".." {
            self.path.pop();
        } else {
            self.path.push(name.to_string());
        }
        debug!("changed directory to {}", self.path());
        Ok(ChangeDirectory::Changed)
    }

    /// Files, subdirectories and totals of the current directory.
    pub fn list(&self) -> ListingSummary<'_> {
        self.current.summary()
    }

    /// Extract the file `name` of the current directory into `sink`.
    pub fn read_file(&mut self, name: &str, sink: &mut dyn Write) -> Result<ReadOutcome> {
        let Some(entry) = self.current.find_by_name(name) else {
            return Ok(ReadOutcome::NotFound);
        };
        if entry.is_directory() || entry.is_volume_label() {
            return Ok(ReadOutcome::IsDirectory);
        }
        let entry = entry.clone();
        self.volume.read_entry(&entry, sink)
    }

    /// Depth-first, pre-order walk from the current directory.
    ///
    /// `visitor` sees each directory's path and listing before any of its
    /// subdirectories. The walk keeps its own stack of frames, so the
    /// current directory is the same before and after.
    pub fn recursive_walk<F>(&mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&str, &DirectoryListing),
    {
        let mut visited = HashSet::new();
        visited.insert(self.current.location);

        let mut stack: Vec<(DirectoryLocation, String)> = Vec::new();
        let start_path = self.path();
        visitor(&start_path, &self.current);
        visit_children(&self.current, &start_path, &mut visited, &mut stack);

        while let Some((location, path)) = stack.pop() {
            let listing = self.volume.load_directory(location)?;
            visitor(&path, &listing);
            visit_children(&listing, &path, &mut visited, &mut stack);
        }
        Ok(())
    }

    pub fn into_volume(self) -> Volume<R> {
        self.volume
    }
}

/// Push the subdirectories of `listing` so they pop in listing order.
fn visit_children(
    listing: &DirectoryListing,
    path: &str,
    visited: &mut HashSet<DirectoryLocation>,
    stack: &mut Vec<(DirectoryLocation, String)>,
) {
    let mut children = Vec::new();
    for child in listing.child_directories() {
        let location = DirectoryLocation::from_cluster(child.starting_cluster);
        if !visited.insert(location) {
            warn!("{path}: {} points at an already visited directory", child.name());
            continue;
        }
        let child_path = if path == "/" {
            format!("/{}", child.name())
        } else {
            format!("{path}/{}", child.name())
        };
        children.push((location, child_path));
    }
    stack.extend(children.into_iter().rev());
}
