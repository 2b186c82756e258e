//! Read-only FAT16 browser for raw MBR disk images.
//!
//! [`fs::Volume::mount`] reads the partition table, boot sector and first
//! FAT; [`fs::Navigator`] keeps the current directory and offers chdir,
//! listing, file extraction and a recursive walk.

pub mod config;
pub mod error;
pub mod fs;
pub mod image;
pub mod logging;
pub mod partition;
pub mod shell;

pub use error::{Fat16Error, Result};
