//! Synthetic FAT16 disk images for the end-to-end tests.
//!
//! Geometry: 512-byte sectors, one sector per cluster, one reserved sector,
//! two FAT copies of one sector each, a 16-entry root directory and
//! `data_clusters` clusters of data, all behind an MBR whose first entry
//! points at `start_sector`.

#![allow(dead_code)]

use std::collections::BTreeMap;

pub const SECTOR: usize = 512;
pub const EOC: u16 = 0xFFFF;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_VOLUME_LABEL: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

/// One 32-byte directory record.
pub fn record(name: &str, ext: &str, attributes: u8, cluster: u16, size: u32) -> [u8; 32] {
    let mut out = [b' '; 32];
    out[..8].copy_from_slice(format!("{name:<8}").as_bytes());
    out[8..11].copy_from_slice(format!("{ext:<3}").as_bytes());
    out[11] = attributes;
    out[12..22].fill(0);
    // 2021-06-15 10:20:30
    let time: u16 = (10 << 11) | (20 << 5) | 15;
    let date: u16 = (41 << 9) | (6 << 5) | 15;
    out[22..24].copy_from_slice(&time.to_le_bytes());
    out[24..26].copy_from_slice(&date.to_le_bytes());
    out[26..28].copy_from_slice(&cluster.to_le_bytes());
    out[28..32].copy_from_slice(&size.to_le_bytes());
    out
}

pub fn deleted(mut rec: [u8; 32]) -> [u8; 32] {
    rec[0] = 0xE5;
    rec
}

/// Deterministic file content.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u32 * 31 + seed as u32 * 7 + (i as u32 >> 8)) as u8)
        .collect()
}

pub struct ImageBuilder {
    pub start_sector: u32,
    pub partition_type: u8,
    pub sectors_per_cluster: u8,
    pub data_clusters: u16,
    fat: Vec<u16>,
    mirror_fat: Option<Vec<u16>>,
    root: Vec<[u8; 32]>,
    clusters: BTreeMap<u16, Vec<u8>>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        let mut fat = vec![0u16; SECTOR / 2];
        fat[0] = 0xFFF8;
        fat[1] = 0xFFFF;
        Self {
            start_sector: 1,
            partition_type: 0x06,
            sectors_per_cluster: 1,
            data_clusters: 32,
            fat,
            mirror_fat: None,
            root: Vec::new(),
            clusters: BTreeMap::new(),
        }
    }

    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster as usize * SECTOR
    }

    pub fn link(&mut self, cluster: u16, value: u16) -> &mut Self {
        self.fat[cluster as usize] = value;
        self
    }

    /// Link `clusters` in order, terminating the last one.
    pub fn chain(&mut self, clusters: &[u16]) -> &mut Self {
        for pair in clusters.windows(2) {
            self.link(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.link(last, EOC);
        }
        self
    }

    /// Give the second FAT copy its own content.
    pub fn mirror_fat(&mut self, fat: Vec<u16>) -> &mut Self {
        self.mirror_fat = Some(fat);
        self
    }

    pub fn root_record(&mut self, rec: [u8; 32]) -> &mut Self {
        self.root.push(rec);
        self
    }

    /// Raw bytes placed at the start of `cluster`.
    pub fn cluster_data(&mut self, cluster: u16, data: &[u8]) -> &mut Self {
        self.clusters.insert(cluster, data.to_vec());
        self
    }

    /// Spread `content` over `clusters` in order.
    pub fn file_content(&mut self, clusters: &[u16], content: &[u8]) -> &mut Self {
        let size = self.cluster_size();
        for (cluster, chunk) in clusters.iter().zip(content.chunks(size)) {
            self.cluster_data(*cluster, chunk);
        }
        self
    }

    /// Lay directory records over `clusters`, continuing across cluster
    /// boundaries.
    pub fn directory(&mut self, clusters: &[u16], records: &[[u8; 32]]) -> &mut Self {
        let bytes: Vec<u8> = records.iter().flatten().copied().collect();
        self.file_content(clusters, &bytes)
    }

    pub fn reserved_sectors(&self) -> usize {
        1
    }

    pub fn fat_offset(&self) -> usize {
        (self.start_sector as usize + self.reserved_sectors()) * SECTOR
    }

    pub fn root_offset(&self) -> usize {
        self.fat_offset() + 2 * SECTOR
    }

    pub fn data_offset(&self) -> usize {
        self.root_offset() + SECTOR
    }

    pub fn cluster_offset(&self, cluster: u16) -> usize {
        self.data_offset() + (cluster as usize - 2) * self.cluster_size()
    }

    pub fn build(&self) -> Vec<u8> {
        let volume_sectors = self.reserved_sectors()
            + 2
            + 1
            + self.data_clusters as usize * self.sectors_per_cluster as usize;
        let total = (self.start_sector as usize + volume_sectors) * SECTOR;
        let mut img = vec![0u8; total];

        // MBR
        let pt = 0x1BE;
        img[pt] = 0x80;
        img[pt + 4] = self.partition_type;
        img[pt + 8..pt + 12].copy_from_slice(&self.start_sector.to_le_bytes());
        img[pt + 12..pt + 16].copy_from_slice(&(volume_sectors as u32).to_le_bytes());
        img[510] = 0x55;
        img[511] = 0xAA;

        // Boot sector
        let bs = self.start_sector as usize * SECTOR;
        img[bs..bs + 3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        img[bs + 3..bs + 11].copy_from_slice(b"MKFS.FAT");
        img[bs + 11..bs + 13].copy_from_slice(&(SECTOR as u16).to_le_bytes());
        img[bs + 13] = self.sectors_per_cluster;
        img[bs + 14..bs + 16].copy_from_slice(&(self.reserved_sectors() as u16).to_le_bytes());
        img[bs + 16] = 2;
        img[bs + 17..bs + 19].copy_from_slice(&16u16.to_le_bytes());
        img[bs + 19..bs + 21].copy_from_slice(&(volume_sectors as u16).to_le_bytes());
        img[bs + 21] = 0xF8;
        img[bs + 22..bs + 24].copy_from_slice(&1u16.to_le_bytes());
        img[bs + 38] = 0x29;
        img[bs + 43..bs + 54].copy_from_slice(b"TESTVOL    ");
        img[bs + 54..bs + 62].copy_from_slice(b"FAT16   ");
        img[bs + 510] = 0x55;
        img[bs + 511] = 0xAA;

        // FAT copies
        let first = self.fat_offset();
        let mirror = self.mirror_fat.as_ref().unwrap_or(&self.fat);
        for (copy, table) in [(first, &self.fat), (first + SECTOR, mirror)] {
            for (i, v) in table.iter().enumerate() {
                img[copy + i * 2..copy + i * 2 + 2].copy_from_slice(&v.to_le_bytes());
            }
        }

        // Root directory
        let root = self.root_offset();
        for (i, rec) in self.root.iter().enumerate() {
            img[root + i * 32..root + i * 32 + 32].copy_from_slice(rec);
        }

        for (&cluster, data) in &self.clusters {
            let off = self.cluster_offset(cluster);
            img[off..off + data.len()].copy_from_slice(data);
        }

        img
    }
}

pub const TEST_TXT_LEN: usize = 100;
pub const ABSTRAKT_LEN: usize = 3 * SECTOR;
pub const BROKEN_DECLARED: u32 = 2000;
pub const NOTE_TEXT: &[u8] = b"notes from ADR1\n";
pub const DEEP_TEXT: &[u8] = b"DEEP!";

/// The volume most tests browse:
///
/// ```text
/// /            TESTVOL (label), TEST.TXT, [deleted OLD.TXT], ABSTRAKT.TXT (3 clusters),
///              ADR1/, BROKEN.BIN (declares 2000 B, chain holds 1024), EMPTY.TXT,
///              [end marker], GHOST.TXT
/// /ADR1        ., .., NOTE.TXT, SUB/, F00..F11, LAST.TXT (second cluster)
/// /ADR1/SUB    ., .., DEEP.TXT, S00..S12 (fills one cluster, no end marker)
/// ```
pub fn standard_image() -> Vec<u8> {
    let mut b = ImageBuilder::new();

    b.root_record(record("TESTVOL", "", ATTR_VOLUME_LABEL, 0, 0))
        .root_record(record("TEST", "TXT", ATTR_ARCHIVE, 2, TEST_TXT_LEN as u32))
        .root_record(deleted(record("OLD", "TXT", ATTR_ARCHIVE, 20, 10)))
        .root_record(record("ABSTRAKT", "TXT", ATTR_ARCHIVE | ATTR_READ_ONLY, 3, ABSTRAKT_LEN as u32))
        .root_record(record("ADR1", "", ATTR_DIRECTORY, 6, 0))
        .root_record(record("BROKEN", "BIN", ATTR_ARCHIVE, 7, BROKEN_DECLARED))
        .root_record(record("EMPTY", "TXT", ATTR_ARCHIVE, 0, 0))
        .root_record([0u8; 32])
        .root_record(record("GHOST", "TXT", ATTR_ARCHIVE, 21, 10));

    b.chain(&[2]).file_content(&[2], &pattern(TEST_TXT_LEN, 1));
    b.chain(&[3, 4, 5]).file_content(&[3, 4, 5], &pattern(ABSTRAKT_LEN, 2));
    b.chain(&[7, 8]).file_content(&[7, 8], &pattern(2 * SECTOR, 3));

    let mut adr1 = vec![
        record(".", "", ATTR_DIRECTORY, 6, 0),
        record("..", "", ATTR_DIRECTORY, 0, 0),
        record("NOTE", "TXT", ATTR_ARCHIVE, 10, NOTE_TEXT.len() as u32),
        record("SUB", "", ATTR_DIRECTORY, 11, 0),
    ];
    for i in 0..12 {
        adr1.push(record(&format!("F{i:02}"), "DAT", ATTR_ARCHIVE, 0, 0));
    }
    adr1.push(record("LAST", "TXT", ATTR_ARCHIVE, 0, 0));
    adr1.push([0u8; 32]);
    adr1.push(record("JUNK", "TXT", ATTR_ARCHIVE, 0, 0));
    b.chain(&[6, 9]).directory(&[6, 9], &adr1);
    b.chain(&[10]).file_content(&[10], NOTE_TEXT);

    let mut sub = vec![
        record(".", "", ATTR_DIRECTORY, 11, 0),
        record("..", "", ATTR_DIRECTORY, 6, 0),
        record("DEEP", "TXT", ATTR_ARCHIVE, 12, DEEP_TEXT.len() as u32),
    ];
    for i in 0..13 {
        sub.push(record(&format!("S{i:02}"), "", ATTR_ARCHIVE, 0, 0));
    }
    b.chain(&[11]).directory(&[11], &sub);
    b.chain(&[12]).file_content(&[12], DEEP_TEXT);

    b.build()
}
