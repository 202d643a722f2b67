//! Content-coding tokens and the decoders they map to.

use std::{fmt, str::FromStr};

/// A `Content-Encoding` token this crate knows how to undo.
///
/// Tokens are matched exactly: no case folding, no aliases like `x-gzip`,
/// and no comma-separated lists of stacked codings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    /// [GZIP (RFC 1952)](https://www.rfc-editor.org/rfc/rfc1952)
    Gzip,

    /// [Brotli (RFC 7932)](https://www.rfc-editor.org/rfc/rfc7932)
    Brotli,

    /// Either [zlib (RFC 1950)](https://www.rfc-editor.org/rfc/rfc1950) or
    /// [raw DEFLATE (RFC 1951)](https://www.rfc-editor.org/rfc/rfc1951),
    /// servers send both.
    Deflate,

    /// [zstd (RFC 8878)](https://www.rfc-editor.org/rfc/rfc8878)
    Zstd,
}

impl ContentEncoding {
    const GZIP: &'static str = "gzip";
    const BROTLI: &'static str = "br";
    const DEFLATE: &'static str = "deflate";
    const ZSTD: &'static str = "zstd";

    /// Maps a header value to an encoding, `None` if it isn't one we handle.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            Self::GZIP => Some(Self::Gzip),
            Self::BROTLI => Some(Self::Brotli),
            Self::DEFLATE => Some(Self::Deflate),
            Self::ZSTD => Some(Self::Zstd),
            _ => None,
        }
    }

    /// The token as it appears in a `Content-Encoding` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => Self::GZIP,
            Self::Brotli => Self::BROTLI,
            Self::Deflate => Self::DEFLATE,
            Self::Zstd => Self::ZSTD,
        }
    }

    /// Whether the decoder(s) for this encoding were compiled in.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Gzip => cfg!(feature = "gzip"),
            Self::Brotli => cfg!(feature = "brotli"),
            Self::Deflate => cfg!(feature = "deflate"),
            Self::Zstd => cfg!(feature = "zstd"),
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a string that isn't a recognized content-coding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized content-coding: {0:?}")]
pub struct UnrecognizedEncoding(pub String);

impl FromStr for ContentEncoding {
    type Err = UnrecognizedEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| UnrecognizedEncoding(s.to_owned()))
    }
}

/// The concrete decoder attached to a body.
///
/// `deflate` maps to two of them, see [DeflateFlavor].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderKind {
    /// gzip, possibly made of several members
    Gzip,
    /// brotli
    Brotli,
    /// DEFLATE with a zlib header and adler-32 trailer
    Zlib,
    /// DEFLATE without any framing
    RawDeflate,
    /// zstd, possibly made of several frames
    Zstd,
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gzip => "gzip",
            Self::Brotli => "brotli",
            Self::Zlib => "zlib",
            Self::RawDeflate => "raw deflate",
            Self::Zstd => "zstd",
        })
    }
}

/// What the first two bytes of a `deflate` body look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeflateFlavor {
    /// A zlib header written by one of the standard compression levels
    Zlib,
    /// Starts with the zlib method byte, but not a known level byte: raw DEFLATE
    Raw,
    /// Doesn't look like either, leave the bytes alone
    Unknown,
}

impl DeflateFlavor {
    /// CM = 8 (deflate), CINFO = 7 (32K window)
    const ZLIB_METHOD_DEFLATE: u8 = 0x78;

    /// FLG bytes for CMF 0x78: fastest, fast, default and best levels.
    /// Each makes `0x78 << 8 | flg` a multiple of 31.
    const ZLIB_LEVELS: [u8; 4] = [0x01, 0x5e, 0x9c, 0xda];

    /// Classifies a stream by its first two bytes.
    pub fn sniff(prefix: [u8; 2]) -> Self {
        let [cmf, flg] = prefix;
        if cmf != Self::ZLIB_METHOD_DEFLATE {
            Self::Unknown
        } else if Self::ZLIB_LEVELS.contains(&flg) {
            Self::Zlib
        } else {
            Self::Raw
        }
    }

    /// The decoder to attach for this flavor, if any.
    pub fn decoder(&self) -> Option<DecoderKind> {
        match self {
            Self::Zlib => Some(DecoderKind::Zlib),
            Self::Raw => Some(DecoderKind::RawDeflate),
            Self::Unknown => None,
        }
    }
}
