#![warn(missing_docs)]

//! decompress-body undoes the `Content-Encoding` of an HTTP response body,
//! lazily, as the body is read.
//!
//! Given a response (anything implementing [ResponseParts], or the bundled
//! [Response]), [DecompressBody::decompress_body] looks at the declared
//! encoding and, if it is one of `gzip`, `br`, `deflate` or `zstd`, swaps the
//! body for one that decodes it. The decoder itself is only built on the first
//! read, so attaching it is free.
//!
//! ```
//! use std::io::{Read, Write};
//! use decompress_body::{Body, DecompressBody, DecoderKind, Response};
//!
//! let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
//! gz.write_all(b"hello world").unwrap();
//!
//! let mut res = Response::new(
//!     [("Content-Encoding", "gzip")].into_iter().collect(),
//!     Body::from(gz.finish().unwrap()),
//! );
//! assert_eq!(res.decompress_body().unwrap(), Some(DecoderKind::Gzip));
//! assert_eq!(res.content_length, -1);
//!
//! let mut text = String::new();
//! res.body.read_to_string(&mut text).unwrap();
//! assert_eq!(text, "hello world");
//! ```
//!
//! Each codec sits behind a cargo feature of the same name (`gzip`,
//! `deflate`, `brotli`, `zstd`), all enabled by default. Encodings whose
//! codec is compiled out are left alone, like unknown ones.

mod body;
mod decoder;
mod decompress;
mod encoding;
mod response;

pub mod error;

pub use body::{Body, BodyReader};
pub use decoder::LazyDecoder;
pub use decompress::DecompressBody;
pub use encoding::{ContentEncoding, DecoderKind, DeflateFlavor, UnrecognizedEncoding};
pub use error::Error;
pub use response::{Headers, Response, ResponseParts, CONTENT_ENCODING, CONTENT_LENGTH};
