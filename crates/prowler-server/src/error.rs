/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The liveness probe failed; the peer is something else.
    #[error("{0} is not a prowler server")]
    NotProwlerServer(String),

    #[error("empty arguments")]
    EmptyArguments,

    /// The server answered with a failure envelope.
    #[error("{msg}")]
    Remote { status: u16, msg: String },
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
