pub mod boot_sector;
pub mod dir_entry;
pub mod fat_table;
pub mod layout;
pub mod listing;
pub mod navigator;

use std::path::Path;

pub use boot_sector::BootSector;
pub use dir_entry::{format_name, DirectoryEntry, FatTimestamp};
pub use fat_table::{ChainEnd, FatLink, FatTable};
pub use layout::Layout;
pub use listing::{DirectoryListing, DirectoryLocation, ListingSummary};
pub use navigator::{ChangeDirectory, Navigator, ReadOutcome, Volume};

use crate::error::Result;
use crate::image::DiskImage;

/// Open an image file on the host and start browsing at the root of its
/// FAT16 partition.
///
/// `partition_index` forces a partition table slot; `None` picks the first
/// entry typed as FAT16.
pub fn open_image(
    path: impl AsRef<Path>,
    partition_index: Option<usize>,
) -> Result<Navigator<std::io::BufReader<std::fs::File>>> {
    let disk = DiskImage::open(path)?;
    let volume = Volume::mount(disk, partition_index)?;
    Navigator::new(volume)
}
