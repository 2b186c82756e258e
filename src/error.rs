use thiserror::Error;

#[derive(Error, Debug)]
pub enum Fat16Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid MBR: {0}")]
    InvalidMbr(String),

    #[error("No FAT16 partition found: {0}")]
    NoFat16Partition(String),

    #[error("Malformed volume geometry: {0}")]
    MalformedGeometry(String),

    #[error("Unsupported volume: {0}")]
    Unsupported(String),

    #[error("Invalid filesystem data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Fat16Error>;
