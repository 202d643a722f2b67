//! All error types used in this crate

use crate::encoding::DecoderKind;

/// Any error produced while attaching or running a body decoder.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Something is not supported by this build
    #[error("unsupported: {0}")]
    Unsupported(#[from] UnsupportedError),

    /// I/O-related error, e.g. while peeking at a deflate stream
    #[error("io: {0}")]
    IO(#[from] std::io::Error),

    /// A decoder could not be set up, or rejected the start of the stream.
    ///
    /// This is the error recorded by a lazy decoder: once it is returned,
    /// every subsequent read returns it again.
    #[error("{decoder} decompression error: {msg}")]
    Decompression {
        /// The decoder that failed
        decoder: DecoderKind,
        /// Additional information
        msg: String,
    },
}

impl Error {
    /// Create a new error indicating that the given decoder is not enabled.
    pub fn decoder_not_enabled(decoder: DecoderKind) -> Self {
        Self::Unsupported(UnsupportedError::DecoderNotEnabled(decoder))
    }
}

/// Some part of the content-coding landscape is not supported by this build.
#[derive(Debug, thiserror::Error)]
pub enum UnsupportedError {
    /// The decoder exists, but its cargo feature was not enabled.
    #[error("decoder supported, but not enabled in this build: {0}")]
    DecoderNotEnabled(DecoderKind),
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::IO(e) => e,
            e => std::io::Error::other(e),
        }
    }
}
