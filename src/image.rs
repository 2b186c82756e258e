use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;

/// Blocking random-access reader over a raw disk image.
///
/// Every read is a seek followed by `read_exact`, so a short read surfaces as
/// `ErrorKind::UnexpectedEof`. The pair is not atomic; callers get exclusive
/// access through `&mut self`.
pub struct DiskImage<R> {
    reader: R,
    len: u64,
}

impl DiskImage<BufReader<File>> {
    /// Open an image file on the host for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> DiskImage<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self { reader, len })
    }

    /// Size of the backing store in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fill `buf` with the bytes starting at absolute `offset`.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.reader.read_exact(buf)?;
        Ok(())
    }

    /// Read `len` bytes at `offset` into a fresh buffer.
    pub fn read_vec(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Read one 512-byte sector addressed by its LBA.
    pub fn read_sector(&mut self, lba: u64) -> Result<[u8; 512]> {
        let mut sector = [0u8; 512];
        self.read_at(lba * 512, &mut sector)?;
        Ok(sector)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fat16Error;
    use std::io::Cursor;

    #[test]
    fn test_read_at_offset() {
        let data: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        let mut image = DiskImage::new(Cursor::new(data)).unwrap();
        assert_eq!(image.len(), 2048);

        let mut buf = [0u8; 4];
        image.read_at(510, &mut buf).unwrap();
        assert_eq!(buf, [254, 255, 0, 1]);

        let sector = image.read_sector(1).unwrap();
        assert_eq!(sector[0], 0);
        assert_eq!(sector[511], 255);
    }

    #[test]
    fn test_short_read_is_io_error() {
        let mut image = DiskImage::new(Cursor::new(vec![0u8; 100])).unwrap();
        let err = image.read_vec(90, 20).unwrap_err();
        match err {
            Fat16Error::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
