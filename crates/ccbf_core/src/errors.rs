use thiserror::Error;

#[derive(Debug, Error)]
pub enum CcbfError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persist: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Corrupt filter: {0}")]
    CorruptFormat(String),

    #[error("Unsupported filter format (magic {magic:02x?}, version {version})")]
    UnsupportedFormat { magic: [u8; 4], version: u16 },
}

impl CcbfError {
    /// Maps a short read while decoding to `CorruptFormat`; every other IO error stays `Io`.
    pub(crate) fn from_read(e: std::io::Error, what: &str) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CcbfError::CorruptFormat(format!("truncated {what}"))
        } else {
            CcbfError::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, CcbfError>;
