/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// File open/read error.
    #[error("{0}: {1}")]
    File(std::path::PathBuf, std::io::Error),

    #[error("os error: {0}")]
    Os(#[from] nix::Error),

    #[error(transparent)]
    Elf(#[from] goblin::error::Error),

    /// The auxiliary vector ended before the entry-point tag.
    #[error("missing auxv value")]
    MissingAuxv,
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::File(_, ref io) => std::io::Error::new(io.kind(), e.to_string()),
            Error::Os(errno) => std::io::Error::from_raw_os_error(errno as i32),
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
