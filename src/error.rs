//! Error handling for MPQ archive parsing.

use thiserror::Error;

/// Result type alias for MPQ operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the MPQ core.
///
/// `MalformedArchive` and `UnsupportedCodec` abort the current read.
/// `UnimplementedCodec` is downgradable to a warning (see
/// [`crate::archive::OpenOptions::permissive`]) that returns best-effort
/// bytes instead of failing. `ExternalCodecFailure` always downgrades to
/// a warning and a passthrough of the raw sector, regardless of
/// `permissive` — the implode adapter has no hard-error mode. `NotFound`
/// is not a variant here: a filename that does not resolve is a normal
/// `Ok(None)`, not an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O failure reading the archive's byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad magic, truncated read, out-of-range offset, or a region whose
    /// length is not a multiple of 4 where the cipher requires it.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    /// A codec tag byte that is not one of the recognized values.
    #[error("unsupported codec tag: {0:#04x}")]
    UnsupportedCodec(u8),

    /// A recognized codec tag with no decoder wired in for this build.
    #[error("codec not implemented: {0:#04x}")]
    UnimplementedCodec(u8),

    /// The external PKWare-implode adapter exited non-zero or produced no
    /// output. Carries the decoder's stderr, if any.
    #[error("external codec failed: {0}")]
    ExternalCodecFailure(String),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedArchive(msg.into())
    }
}

impl<I: std::fmt::Debug> From<nom::Err<nom::error::Error<I>>> for Error {
    fn from(err: nom::Err<nom::error::Error<I>>) -> Self {
        Error::MalformedArchive(format!("{err:?}"))
    }
}
