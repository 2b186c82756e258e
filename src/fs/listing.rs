use std::io::{Read, Seek};

use log::{debug, warn};

use super::dir_entry::{DirectoryEntry, RawRecord, DIR_ENTRY_SIZE};
use super::fat_table::{ChainEnd, FatTable};
use super::layout::Layout;
use crate::error::{Fat16Error, Result};
use crate::image::DiskImage;

/// Where a listing was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryLocation {
    /// The fixed root directory region.
    Root,
    /// A directory whose chain starts at this cluster.
    Cluster(u16),
}

impl DirectoryLocation {
    /// Map a directory entry's starting cluster to a location; cluster 0 is
    /// how ".." entries refer to the root.
    pub fn from_cluster(cluster: u16) -> Self {
        if cluster == 0 {
            DirectoryLocation::Root
        } else {
            DirectoryLocation::Cluster(cluster)
        }
    }
}

/// The decoded records of one directory, in on-disk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    pub location: DirectoryLocation,
    pub entries: Vec<DirectoryEntry>,
}

/// Files and subdirectories of a listing with aggregate counts.
#[derive(Debug, Clone)]
pub struct ListingSummary<'a> {
    pub files: Vec<&'a DirectoryEntry>,
    pub directories: Vec<&'a DirectoryEntry>,
    pub file_count: usize,
    /// Sum of `file_size` over files only.
    pub total_file_bytes: u64,
    pub directory_count: usize,
    /// Name carried by a volume-label record, if the directory has one.
    pub volume_label: Option<String>,
}

impl DirectoryListing {
    pub fn is_root(&self) -> bool {
        self.location == DirectoryLocation::Root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DirectoryEntry> {
        self.entries.iter()
    }

    /// Exact, case-sensitive match on the formatted 8.3 name.
    pub fn find_by_name(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// The ".." record, present in every directory but the root.
    pub fn parent_entry(&self) -> Option<&DirectoryEntry> {
        self.entries
            .iter()
            .find(|e| e.is_directory() && e.name() == "..")
    }

    /// Subdirectories other than "." and "..".
    pub fn child_directories(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_directory() && !e.is_volume_label() && !e.is_dot_entry())
    }

    /// Split into files and subdirectories.
    ///
    /// Volume-label records belong to neither side; their name is reported
    /// separately.
    pub fn summary(&self) -> ListingSummary<'_> {
        let mut files = Vec::new();
        let mut directories = Vec::new();
        let mut volume_label = None;

        for entry in &self.entries {
            if entry.is_volume_label() {
                if volume_label.is_none() {
                    volume_label = Some(label_text(entry));
                }
            } else if entry.is_directory() {
                directories.push(entry);
            } else {
                files.push(entry);
            }
        }

        ListingSummary {
            file_count: files.len(),
            total_file_bytes: files.iter().map(|e| e.file_size as u64).sum(),
            directory_count: directories.len(),
            files,
            directories,
            volume_label,
        }
    }
}

/// A volume label uses all 11 name bytes without a dot.
fn label_text(entry: &DirectoryEntry) -> String {
    let mut raw = entry.filename.to_vec();
    raw.extend_from_slice(&entry.extension);
    String::from_utf8_lossy(&raw).trim_end().to_string()
}

/// Decode consecutive records into `out`. Returns `true` once the end marker
/// is seen; deleted records are skipped.
fn scan_records(data: &[u8], out: &mut Vec<DirectoryEntry>) -> bool {
    for record in data.chunks_exact(DIR_ENTRY_SIZE) {
        match DirectoryEntry::decode(record) {
            RawRecord::End => return true,
            RawRecord::Deleted => continue,
            RawRecord::Entry(entry) => out.push(entry),
        }
    }
    false
}

/// Read the fixed root directory region.
pub fn load_root<R: Read + Seek>(
    disk: &mut DiskImage<R>,
    layout: &Layout,
    root_dir_entries: u16,
) -> Result<DirectoryListing> {
    let size = root_dir_entries as usize * DIR_ENTRY_SIZE;
    let data = disk.read_vec(layout.root_dir_offset, size)?;

    let mut entries = Vec::new();
    scan_records(&data, &mut entries);
    debug!("root directory: {} entries", entries.len());

    Ok(DirectoryListing {
        location: DirectoryLocation::Root,
        entries,
    })
}

/// Read a directory stored as a cluster chain.
///
/// Records are decoded across clusters in chain order until the end marker
/// or the last cluster of the chain. Cluster 0 means the root.
pub fn load_subdirectory<R: Read + Seek>(
    disk: &mut DiskImage<R>,
    fat: &FatTable,
    layout: &Layout,
    starting_cluster: u16,
) -> Result<DirectoryListing> {
    if starting_cluster == 0 {
        return load_root(disk, layout, layout.root_dir_entries());
    }

    let cluster_size = layout.cluster_size() as usize;
    let mut entries = Vec::new();
    let mut chain = fat.chain(starting_cluster);
    let mut reached_end_marker = false;

    for cluster in chain.by_ref() {
        let cluster = cluster?;
        let offset = layout.cluster_to_offset(cluster).ok_or_else(|| {
            Fat16Error::InvalidData(format!("directory chain entered cluster {cluster}"))
        })?;
        let data = disk.read_vec(offset, cluster_size)?;
        if scan_records(&data, &mut entries) {
            reached_end_marker = true;
            break;
        }
    }

    if !reached_end_marker {
        match chain.end() {
            Some(ChainEnd::EndOfChain) | None => {}
            Some(end) => warn!(
                "directory at cluster {starting_cluster}: chain stopped early ({end:?})"
            ),
        }
    }
    debug!(
        "directory at cluster {starting_cluster}: {} entries",
        entries.len()
    );

    Ok(DirectoryListing {
        location: DirectoryLocation::Cluster(starting_cluster),
        entries,
    })
}
