use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};

pub const DIR_ENTRY_SIZE: usize = 32;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_LABEL: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

/// First name byte marking the end of a directory.
const END_MARKER: u8 = 0x00;
/// First name byte marking a deleted record.
const DELETED_MARKER: u8 = 0xE5;
/// Stored in place of a leading 0xE5 name character.
const KANJI_ESCAPE: u8 = 0x05;

/// Result of looking at one 32-byte directory slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    /// No valid entries follow.
    End,
    Deleted,
    Entry(DirectoryEntry),
}

/// A decoded 8.3 directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub filename: [u8; 8],
    pub extension: [u8; 3],
    pub attributes: u8,
    pub modify_time: u16,
    pub modify_date: u16,
    pub starting_cluster: u16,
    pub file_size: u32,
}

impl DirectoryEntry {
    /// Classify and decode one 32-byte record.
    pub fn decode(record: &[u8]) -> RawRecord {
        debug_assert_eq!(record.len(), DIR_ENTRY_SIZE);
        match record[0] {
            END_MARKER => return RawRecord::End,
            DELETED_MARKER => return RawRecord::Deleted,
            _ => {}
        }

        let mut filename = [0u8; 8];
        filename.copy_from_slice(&record[0..8]);
        let mut extension = [0u8; 3];
        extension.copy_from_slice(&record[8..11]);

        RawRecord::Entry(Self {
            filename,
            extension,
            attributes: record[11],
            modify_time: LittleEndian::read_u16(&record[22..24]),
            modify_date: LittleEndian::read_u16(&record[24..26]),
            starting_cluster: LittleEndian::read_u16(&record[26..28]),
            file_size: LittleEndian::read_u32(&record[28..32]),
        })
    }

    /// Encode back into the on-disk 32-byte form. Reserved bytes are zero.
    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut out = [0u8; DIR_ENTRY_SIZE];
        out[0..8].copy_from_slice(&self.filename);
        out[8..11].copy_from_slice(&self.extension);
        out[11] = self.attributes;
        LittleEndian::write_u16(&mut out[22..24], self.modify_time);
        LittleEndian::write_u16(&mut out[24..26], self.modify_date);
        LittleEndian::write_u16(&mut out[26..28], self.starting_cluster);
        LittleEndian::write_u32(&mut out[28..32], self.file_size);
        out
    }

    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes & ATTR_VOLUME_LABEL != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.attributes & ATTR_READ_ONLY != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.attributes & ATTR_HIDDEN != 0
    }

    pub fn is_system(&self) -> bool {
        self.attributes & ATTR_SYSTEM != 0
    }

    pub fn is_archive(&self) -> bool {
        self.attributes & ATTR_ARCHIVE != 0
    }

    /// "." or "..".
    pub fn is_dot_entry(&self) -> bool {
        self.filename[0] == b'.'
    }

    /// Reconstructed 8.3 name.
    pub fn name(&self) -> String {
        format_name(self)
    }

    pub fn modified(&self) -> FatTimestamp {
        FatTimestamp {
            date: self.modify_date,
            time: self.modify_time,
        }
    }
}

/// Build the display name of an entry.
///
/// Trailing spaces of the base name are trimmed. Files get `.` and the
/// extension; directories (including "." and "..") never do. Bytes above
/// 0x7F are decoded as CP437.
pub fn format_name(entry: &DirectoryEntry) -> String {
    let mut name_bytes = entry.filename;
    if name_bytes[0] == KANJI_ESCAPE {
        name_bytes[0] = DELETED_MARKER;
    }
    let base = decode_oem_string(&name_bytes);
    let base = base.trim_end_matches(' ');

    if entry.is_directory() {
        return base.to_string();
    }

    let ext = decode_oem_string(&entry.extension);
    let ext = ext.trim_end_matches(' ');
    if ext.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{ext}")
    }
}

/// Decode a byte slice from OEM codepage (CP437) to a UTF-8 String.
fn decode_oem_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| cp437_to_char(b)).collect()
}

fn cp437_to_char(b: u8) -> char {
    if b < 0x80 {
        b as char
    } else {
        CP437_HIGH[b as usize - 0x80]
    }
}

/// CP437 to Unicode mapping for bytes 0x80-0xFF.
#[rustfmt::skip]
const CP437_HIGH: [char; 128] = [
    'Ç','ü','é','â','ä','à','å','ç', 'ê','ë','è','ï','î','ì','Ä','Å',
    'É','æ','Æ','ô','ö','ò','û','ù', 'ÿ','Ö','Ü','¢','£','¥','₧','ƒ',
    'á','í','ó','ú','ñ','Ñ','ª','º', '¿','⌐','¬','½','¼','¡','«','»',
    '░','▒','▓','│','┤','╡','╢','╖', '╕','╣','║','╗','╝','╜','╛','┐',
    '└','┴','┬','├','─','┼','╞','╟', '╚','╔','╩','╦','╠','═','╬','╧',
    '╨','╤','╥','╙','╘','╒','╓','╫', '╪','┘','┌','█','▄','▌','▐','▀',
    'α','ß','Γ','π','Σ','σ','µ','τ', 'Φ','Θ','Ω','δ','∞','φ','ε','∩',
    '≡','±','≥','≤','⌠','⌡','÷','≈', '°','∙','·','√','ⁿ','²','■','\u{00A0}',
];

/// Packed FAT modification date and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatTimestamp {
    pub date: u16,
    pub time: u16,
}

impl FatTimestamp {
    /// Encode a calendar time. `None` for years the 7-bit field cannot hold
    /// (before 1980 or after 2107).
    pub fn pack(
        year: u16,
        month: u16,
        day: u16,
        hour: u16,
        minute: u16,
        second: u16,
    ) -> Option<Self> {
        let years = year.checked_sub(1980).filter(|&y| y <= 0x7F)?;
        Some(Self {
            date: (years << 9) | ((month & 0x0F) << 5) | (day & 0x1F),
            time: ((hour & 0x1F) << 11) | ((minute & 0x3F) << 5) | ((second / 2) & 0x1F),
        })
    }

    pub fn year(&self) -> u16 {
        ((self.date >> 9) & 0x7F) + 1980
    }

    pub fn month(&self) -> u16 {
        (self.date >> 5) & 0x0F
    }

    pub fn day(&self) -> u16 {
        self.date & 0x1F
    }

    pub fn hour(&self) -> u16 {
        (self.time >> 11) & 0x1F
    }

    pub fn minute(&self) -> u16 {
        (self.time >> 5) & 0x3F
    }

    /// Seconds, stored in 2-second units.
    pub fn second(&self) -> u16 {
        (self.time & 0x1F) * 2
    }

    /// `None` when the date is zero or the fields do not form a real date.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        if self.date == 0 {
            return None;
        }
        NaiveDate::from_ymd_opt(self.year() as i32, self.month() as u32, self.day() as u32)?
            .and_hms_opt(self.hour() as u32, self.minute() as u32, self.second() as u32)
    }
}
