use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use crate::decoder::Decoder;

impl<R> Decoder<R> for ZlibDecoder<R>
where
    R: Read + Send,
{
    fn into_inner(self: Box<Self>) -> R {
        Self::into_inner(*self)
    }

    fn get_mut(&mut self) -> &mut R {
        Self::get_mut(self)
    }
}

impl<R> Decoder<R> for DeflateDecoder<R>
where
    R: Read + Send,
{
    fn into_inner(self: Box<Self>) -> R {
        Self::into_inner(*self)
    }

    fn get_mut(&mut self) -> &mut R {
        Self::get_mut(self)
    }
}

/// Expects the 2-byte zlib header, validates it, and checks the adler-32
/// trailer at the end.
pub(crate) fn mk_zlib_decoder<R>(r: R) -> impl Decoder<R>
where
    R: Read + Send,
{
    tracing::trace!("Creating ZlibDecoder");
    ZlibDecoder::new(r)
}

/// Inflates from the very first byte, there is no framing to skip.
pub(crate) fn mk_raw_decoder<R>(r: R) -> impl Decoder<R>
where
    R: Read + Send,
{
    tracing::trace!("Creating DeflateDecoder");
    DeflateDecoder::new(r)
}
