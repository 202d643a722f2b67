//! Lazily-constructed streaming decoders.
//!
//! A [LazyDecoder] takes ownership of a body and only sets up the actual
//! decompressor when it is first read from, so attaching one to a response
//! costs no I/O and cannot fail.

#[cfg(feature = "gzip")]
mod gzip_dec;

#[cfg(feature = "brotli")]
mod brotli_dec;

#[cfg(feature = "deflate")]
mod deflate_dec;

#[cfg(feature = "zstd")]
mod zstd_dec;

use std::{fmt, io};

use cfg_if::cfg_if;
use tracing::trace;

use crate::{body::BodyReader, encoding::DecoderKind, error::Error};

/// A decompressor reading from an inner reader.
pub(crate) trait Decoder<R>: io::Read + Send
where
    R: io::Read,
{
    /// Moves the inner reader out of this decoder.
    /// self is boxed because decoders are typically used as trait objects.
    fn into_inner(self: Box<Self>) -> R;

    /// Returns a mutable reference to the inner reader.
    fn get_mut(&mut self) -> &mut R;
}

/// Builds the decoder for `kind` on top of `source`. On failure, `source` is
/// handed back so it can still be closed.
fn get_decoder<R>(kind: DecoderKind, source: R) -> Result<Box<dyn Decoder<R>>, (R, io::Error)>
where
    R: io::Read + Send + 'static,
{
    let decoder: Box<dyn Decoder<R>> = match kind {
        DecoderKind::Gzip => {
            cfg_if! {
                if #[cfg(feature = "gzip")] {
                    Box::new(gzip_dec::mk_decoder(source))
                } else {
                    return Err((source, Error::decoder_not_enabled(kind).into()));
                }
            }
        }
        DecoderKind::Brotli => {
            cfg_if! {
                if #[cfg(feature = "brotli")] {
                    Box::new(brotli_dec::mk_decoder(source))
                } else {
                    return Err((source, Error::decoder_not_enabled(kind).into()));
                }
            }
        }
        DecoderKind::Zlib => {
            cfg_if! {
                if #[cfg(feature = "deflate")] {
                    Box::new(deflate_dec::mk_zlib_decoder(source))
                } else {
                    return Err((source, Error::decoder_not_enabled(kind).into()));
                }
            }
        }
        DecoderKind::RawDeflate => {
            cfg_if! {
                if #[cfg(feature = "deflate")] {
                    Box::new(deflate_dec::mk_raw_decoder(source))
                } else {
                    return Err((source, Error::decoder_not_enabled(kind).into()));
                }
            }
        }
        DecoderKind::Zstd => {
            cfg_if! {
                if #[cfg(feature = "zstd")] {
                    Box::new(zstd_dec::mk_decoder(source)?)
                } else {
                    return Err((source, Error::decoder_not_enabled(kind).into()));
                }
            }
        }
    };

    Ok(decoder)
}

/// gzip and zstd bodies with no bytes at all decode to nothing: HEAD, 204
/// and 304 responses routinely keep the `Content-Encoding` of the resource.
fn accepts_empty_body(kind: DecoderKind) -> bool {
    matches!(kind, DecoderKind::Gzip | DecoderKind::Zstd)
}

/// The source as seen by a decoder. Remembers whether a read of the source
/// itself failed, and whether it ran dry before handing out any byte, so a
/// failing first read can be blamed on the transport or on the codec.
pub(crate) struct SourceReader<R> {
    inner: R,
    bytes_read: u64,
    eof: bool,
    failed: bool,
}

impl<R> SourceReader<R>
where
    R: io::Read,
{
    fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
            eof: false,
            failed: false,
        }
    }

    fn into_inner(self) -> R {
        self.inner
    }

    /// Whether a read failed since the last call.
    fn take_failed(&mut self) -> bool {
        std::mem::take(&mut self.failed)
    }

    /// Whether the source ended without producing a single byte.
    fn was_empty(&self) -> bool {
        self.eof && self.bytes_read == 0
    }
}

impl<R> io::Read for SourceReader<R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.eof = true;
                Ok(0)
            }
            Ok(n) => {
                self.bytes_read += n as u64;
                Ok(n)
            }
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }
}

/// The first error a decoder ran into, replayed on every later read.
struct StickyError {
    kind: io::ErrorKind,
    msg: String,
}

impl StickyError {
    fn new(err: &io::Error) -> Self {
        Self {
            kind: err.kind(),
            msg: err.to_string(),
        }
    }

    fn to_io(&self, decoder: DecoderKind) -> io::Error {
        io::Error::new(
            self.kind,
            Error::Decompression {
                decoder,
                msg: self.msg.clone(),
            },
        )
    }
}

type BoxedDecoder<R> = Box<dyn Decoder<SourceReader<R>>>;

enum State<R>
where
    R: io::Read,
{
    /// Nothing was read yet, the decoder doesn't exist
    Pending { source: R },
    /// The decoder exists but hasn't produced a successful read yet
    Building { decoder: BoxedDecoder<R> },
    /// The decoder produced its first bytes
    Ready { decoder: BoxedDecoder<R> },
    /// The body was empty and the codec is fine with that
    Empty { source: R },
    /// Setting up the decoder failed, the source is only kept for closing
    Failed { source: R, error: StickyError },
    Transition,
}

impl<R> Default for State<R>
where
    R: io::Read,
{
    fn default() -> Self {
        Self::Transition
    }
}

/// Decompresses a source stream, building the decoder on first read.
///
/// Building the decoder covers both creating it and reading through it until
/// the first success, which is where header and frame-descriptor problems
/// show up. If the codec fails there, that error is returned from this read
/// and every read after it, without trying again. Errors raised by the source
/// itself (a timeout, `WouldBlock`...) are returned as-is and the next read
/// picks up where it left off. Errors after the first successful read are
/// passed through as-is.
///
/// An empty gzip or zstd source reads as an empty body.
///
/// [LazyDecoder::close] always closes the source, whatever state the decoder
/// is in.
pub struct LazyDecoder<R>
where
    R: io::Read,
{
    kind: DecoderKind,
    state: State<R>,
}

impl<R> LazyDecoder<R>
where
    R: io::Read + Send + 'static,
{
    /// Wraps `source`. This does not read anything.
    pub fn new(kind: DecoderKind, source: R) -> Self {
        Self {
            kind,
            state: State::Pending { source },
        }
    }

    /// The decoder that is (or will be) used.
    pub fn kind(&self) -> DecoderKind {
        self.kind
    }

    /// Whether the decoder was built and read from successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    fn fail(&mut self, source: R, err: io::Error) -> io::Error {
        trace!(decoder = %self.kind, %err, "decoder failed on first read, error is now sticky");
        let error = StickyError::new(&err);
        let err = error.to_io(self.kind);
        self.state = State::Failed { source, error };
        err
    }
}

impl<R> LazyDecoder<R>
where
    R: BodyReader + 'static,
{
    /// Closes the source stream, dropping the decoder if there is one.
    pub fn close(self) -> io::Result<()> {
        let source = match self.state {
            State::Pending { source } | State::Empty { source } | State::Failed { source, .. } => {
                source
            }
            State::Building { decoder } | State::Ready { decoder } => {
                decoder.into_inner().into_inner()
            }
            State::Transition => unreachable!(),
        };
        trace!(decoder = %self.kind, "closing source");
        Box::new(source).close()
    }
}

impl<R> io::Read for LazyDecoder<R>
where
    R: io::Read + Send + 'static,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.state {
            State::Ready { ref mut decoder } => return decoder.read(buf),
            State::Failed { ref error, .. } => return Err(error.to_io(self.kind)),
            State::Empty { .. } => return Ok(0),
            State::Pending { .. } | State::Building { .. } if buf.is_empty() => return Ok(0),
            State::Pending { .. } | State::Building { .. } => {}
            State::Transition => unreachable!(),
        }

        let mut decoder = match std::mem::take(&mut self.state) {
            State::Pending { source } => {
                trace!(decoder = %self.kind, "first read, building decoder");
                match get_decoder(self.kind, SourceReader::new(source)) {
                    Ok(decoder) => decoder,
                    Err((source, err)) => return Err(self.fail(source.into_inner(), err)),
                }
            }
            State::Building { decoder } => decoder,
            _ => unreachable!(),
        };

        decoder.get_mut().take_failed();
        match decoder.read(buf) {
            Ok(n) => {
                trace!(decoder = %self.kind, %n, "decoder ready");
                self.state = State::Ready { decoder };
                Ok(n)
            }
            Err(err) if decoder.get_mut().take_failed() => {
                trace!(decoder = %self.kind, %err, "source failed before the decoder got going, passing it through");
                self.state = State::Building { decoder };
                Err(err)
            }
            Err(_) if accepts_empty_body(self.kind) && decoder.get_mut().was_empty() => {
                trace!(decoder = %self.kind, "empty body");
                self.state = State::Empty {
                    source: decoder.into_inner().into_inner(),
                };
                Ok(0)
            }
            Err(err) => Err(self.fail(decoder.into_inner().into_inner(), err)),
        }
    }
}

impl<R> BodyReader for LazyDecoder<R>
where
    R: BodyReader + 'static,
{
    fn close(self: Box<Self>) -> io::Result<()> {
        LazyDecoder::close(*self)
    }
}

impl<R> fmt::Debug for LazyDecoder<R>
where
    R: io::Read,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Pending { .. } => "pending",
            State::Building { .. } => "building",
            State::Ready { .. } => "ready",
            State::Empty { .. } => "empty",
            State::Failed { .. } => "failed",
            State::Transition => "transition",
        };
        f.debug_struct("LazyDecoder")
            .field("kind", &self.kind)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use std::{
        io::{Read, Write},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    #[derive(Clone, Default)]
    struct Counters {
        bytes_read: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    struct CountingBody {
        inner: io::Cursor<Vec<u8>>,
        counters: Counters,
    }

    impl Read for CountingBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.counters.bytes_read.fetch_add(n, Ordering::SeqCst);
            Ok(n)
        }
    }

    impl BodyReader for CountingBody {
        fn close(self: Box<Self>) -> io::Result<()> {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting(bytes: Vec<u8>) -> (CountingBody, Counters) {
        let counters = Counters::default();
        let body = CountingBody {
            inner: io::Cursor::new(bytes),
            counters: counters.clone(),
        };
        (body, counters)
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test_log::test]
    fn nothing_is_read_before_first_read() {
        let (body, counters) = counting(gzip(b"hello"));
        let mut dec = LazyDecoder::new(DecoderKind::Gzip, body);
        assert_eq!(counters.bytes_read.load(Ordering::SeqCst), 0);
        assert!(!dec.is_ready());

        // an empty buffer doesn't count as a first read
        assert_eq!(dec.read(&mut []).unwrap(), 0);
        assert_eq!(counters.bytes_read.load(Ordering::SeqCst), 0);

        let mut out = Vec::new();
        dec.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
        assert!(dec.is_ready());
        assert!(counters.bytes_read.load(Ordering::SeqCst) > 0);
    }

    #[test_log::test]
    fn construction_error_is_sticky() {
        let (body, counters) = counting(b"definitely not gzip".to_vec());
        let mut dec = LazyDecoder::new(DecoderKind::Gzip, body);

        let mut buf = [0u8; 64];
        let first = dec.read(&mut buf).unwrap_err();
        let read_after_first = counters.bytes_read.load(Ordering::SeqCst);

        let second = dec.read(&mut buf).unwrap_err();
        assert_eq!(first.kind(), second.kind());
        assert_eq!(first.to_string(), second.to_string());
        assert!(first.to_string().starts_with("gzip decompression error"));

        // no retry: the source isn't touched again
        assert_eq!(counters.bytes_read.load(Ordering::SeqCst), read_after_first);

        dec.close().unwrap();
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[test_log::test]
    fn close_reaches_source_in_every_state() {
        // pending
        let (body, counters) = counting(gzip(b"abc"));
        LazyDecoder::new(DecoderKind::Gzip, body).close().unwrap();
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.bytes_read.load(Ordering::SeqCst), 0);

        // ready
        let (body, counters) = counting(gzip(b"abc"));
        let mut dec = LazyDecoder::new(DecoderKind::Gzip, body);
        let mut buf = [0u8; 1];
        dec.read_exact(&mut buf).unwrap();
        assert!(dec.is_ready());
        dec.close().unwrap();
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

        // boxed, as part of a body
        let (body, counters) = counting(gzip(b"abc"));
        let body = Body::new(LazyDecoder::new(DecoderKind::Gzip, body));
        body.close().unwrap();
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    fn noise(len: usize) -> Vec<u8> {
        let mut x = 0x2545_f491_u32;
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect()
    }

    #[test_log::test]
    fn mid_stream_errors_are_not_sticky() {
        let mut compressed = gzip(&noise(64 * 1024));
        // keep the header, drop the end of the stream
        compressed.truncate(compressed.len() / 2);
        let (body, _counters) = counting(compressed);
        let mut dec = LazyDecoder::new(DecoderKind::Gzip, body);

        let mut buf = [0u8; 16];
        dec.read_exact(&mut buf).unwrap();
        assert!(dec.is_ready());

        let mut rest = Vec::new();
        let err = dec.read_to_end(&mut rest).unwrap_err();
        assert!(!err.to_string().starts_with("gzip decompression error"));
    }

    #[test_log::test]
    fn kind_is_known_before_anything_is_read() {
        let (body, counters) = counting(Vec::new());
        let dec = LazyDecoder::new(DecoderKind::Zstd, body);
        assert_eq!(dec.kind(), DecoderKind::Zstd);
        assert_eq!(format!("{dec:?}"), r#"LazyDecoder { kind: Zstd, state: "pending" }"#);
        assert_eq!(counters.bytes_read.load(Ordering::SeqCst), 0);
    }

    /// Fails with `WouldBlock` once, the first time it is read from.
    struct NotYetBody {
        inner: io::Cursor<Vec<u8>>,
        blocked: bool,
    }

    impl Read for NotYetBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.blocked {
                self.blocked = true;
                return Err(io::ErrorKind::WouldBlock.into());
            }
            self.inner.read(buf)
        }
    }

    #[test_log::test]
    fn source_errors_before_first_output_are_not_sticky() {
        let mut enc = brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22);
        enc.write_all(b"hello brotli").unwrap();
        let compressed = enc.into_inner();

        let body = NotYetBody {
            inner: io::Cursor::new(compressed),
            blocked: false,
        };
        let mut dec = LazyDecoder::new(DecoderKind::Brotli, body);

        let mut buf = [0u8; 64];
        let err = dec.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert!(err.get_ref().is_none(), "source error was relabelled: {err}");
        assert!(!dec.is_ready());
        assert_eq!(format!("{dec:?}"), r#"LazyDecoder { kind: Brotli, state: "building" }"#);

        let mut out = Vec::new();
        dec.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello brotli");
        assert!(dec.is_ready());
    }

    #[test_log::test]
    fn empty_source_is_an_empty_body() {
        for kind in [DecoderKind::Gzip, DecoderKind::Zstd] {
            let (body, counters) = counting(Vec::new());
            let mut dec = LazyDecoder::new(kind, body);

            let mut out = Vec::new();
            assert_eq!(dec.read_to_end(&mut out).unwrap(), 0, "{kind}");
            assert_eq!(dec.read(&mut [0u8; 8]).unwrap(), 0, "{kind}");
            assert_eq!(
                format!("{dec:?}"),
                format!("LazyDecoder {{ kind: {kind:?}, state: \"empty\" }}")
            );

            dec.close().unwrap();
            assert_eq!(counters.closes.load(Ordering::SeqCst), 1, "{kind}");
        }
    }

    #[test_log::test]
    fn empty_brotli_source_is_an_error() {
        let (body, _counters) = counting(Vec::new());
        let mut dec = LazyDecoder::new(DecoderKind::Brotli, body);
        let err = dec.read(&mut [0u8; 8]).unwrap_err();
        assert!(err.to_string().starts_with("brotli decompression error"));
    }

    #[cfg(not(feature = "zstd"))]
    #[test_log::test]
    fn disabled_decoder_is_a_sticky_error() {
        let (body, counters) = counting(b"whatever".to_vec());
        let mut dec = LazyDecoder::new(DecoderKind::Zstd, body);

        let first = dec.read(&mut [0u8; 8]).unwrap_err();
        let second = dec.read(&mut [0u8; 8]).unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
        assert!(first.to_string().contains("not enabled in this build"));
        assert_eq!(counters.bytes_read.load(Ordering::SeqCst), 0);
    }
}
