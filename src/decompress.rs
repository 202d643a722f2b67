//! Attaching a decoder to a response according to its `Content-Encoding`.

use std::io::{self, Read};

use tracing::debug;

use crate::{
    body::Body,
    decoder::LazyDecoder,
    encoding::{ContentEncoding, DecoderKind, DeflateFlavor},
    error::Error,
    response::{ResponseParts, CONTENT_ENCODING, CONTENT_LENGTH},
};

/// A trait for transparently decompressing a response body.
///
/// Implemented for everything that implements [ResponseParts].
pub trait DecompressBody {
    /// Swaps the body for one that decodes the declared `Content-Encoding`.
    ///
    /// Returns the decoder that was attached, or `None` when the response
    /// was left alone: unknown or missing encoding, a codec not compiled in,
    /// or a `deflate` body that is too short or doesn't look like DEFLATE.
    ///
    /// When a decoder is attached, `Content-Encoding` and `Content-Length`
    /// are removed, the body is marked uncompressed and its length becomes
    /// unknown (`-1`).
    ///
    /// Only `deflate` does any I/O here: two bytes are read to tell zlib from
    /// raw DEFLATE, and put back in front of the body. If reading them fails
    /// with anything but a premature EOF, the error is returned and the body
    /// is otherwise left as it was.
    fn decompress_body(&mut self) -> Result<Option<DecoderKind>, Error>;
}

impl<T> DecompressBody for T
where
    T: ResponseParts,
{
    fn decompress_body(&mut self) -> Result<Option<DecoderKind>, Error> {
        let encoding = match self.header(CONTENT_ENCODING) {
            Some(value) => match ContentEncoding::from_token(value) {
                Some(encoding) => encoding,
                None => {
                    debug!(content_encoding = %value, "not a content-coding we decode, leaving body alone");
                    return Ok(None);
                }
            },
            None => return Ok(None),
        };

        if !encoding.is_enabled() {
            debug!(%encoding, "decoder not enabled in this build, leaving body alone");
            return Ok(None);
        }

        let kind = match encoding {
            ContentEncoding::Gzip => DecoderKind::Gzip,
            ContentEncoding::Brotli => DecoderKind::Brotli,
            ContentEncoding::Zstd => DecoderKind::Zstd,
            ContentEncoding::Deflate => match sniff_deflate(self.body_mut())? {
                Some(kind) => kind,
                None => return Ok(None),
            },
        };

        debug!(%encoding, decoder = %kind, "attaching decoder");
        let body = self.body_mut();
        let source = std::mem::take(body);
        *body = Body::new(LazyDecoder::new(kind, source));

        self.remove_header(CONTENT_ENCODING);
        self.remove_header(CONTENT_LENGTH);
        self.set_uncompressed(true);
        self.set_content_length(-1);

        Ok(Some(kind))
    }
}

/// Reads the first two bytes of `body` to pick between zlib and raw DEFLATE,
/// then puts them back in front of it.
fn sniff_deflate(body: &mut Body) -> Result<Option<DecoderKind>, Error> {
    let mut prefix = [0u8; 2];
    let (filled, res) = read_prefix(body, &mut prefix);
    unread(body, prefix[..filled].to_vec());

    if let Err(e) = res {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            debug!(%filled, "deflate body shorter than its header, leaving it alone");
            return Ok(None);
        }
        debug!(%filled, %e, "could not peek at deflate body");
        return Err(Error::IO(e));
    }

    let flavor = DeflateFlavor::sniff(prefix);
    if flavor == DeflateFlavor::Unknown {
        debug!(prefix = ?prefix, "deflate body doesn't start like zlib or DEFLATE, passing it through");
    }
    Ok(flavor.decoder())
}

/// Like [Read::read_exact], but reports how many bytes made it into `buf`
/// even when it fails, so none of them get lost.
fn read_prefix(rd: &mut impl Read, buf: &mut [u8]) -> (usize, io::Result<()>) {
    let mut filled = 0;
    while filled < buf.len() {
        match rd.read(&mut buf[filled..]) {
            Ok(0) => return (filled, Err(io::ErrorKind::UnexpectedEof.into())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (filled, Err(e)),
        }
    }
    (filled, Ok(()))
}

fn unread(body: &mut Body, head: Vec<u8>) {
    if head.is_empty() {
        return;
    }
    let rest = std::mem::take(body);
    *body = Body::new(io::Cursor::new(head).chain(rest));
}
