use std::io::{self, BufReader, Read};

use zstd::stream::{raw::Decoder as RawDecoder, zio::Reader};

use crate::decoder::Decoder;

type ZstdReader<R> = Reader<BufReader<R>, RawDecoder<'static>>;

impl<R> Decoder<R> for ZstdReader<R>
where
    R: Read + Send,
{
    fn into_inner(self: Box<Self>) -> R {
        Self::into_inner(*self).into_inner()
    }

    fn get_mut(&mut self) -> &mut R {
        self.reader_mut().get_mut()
    }
}

/// Allocating the decompression context can fail. The context is created
/// before `r` is moved into the reader, so `r` comes back with the error.
pub(crate) fn mk_decoder<R>(r: R) -> Result<impl Decoder<R>, (R, io::Error)>
where
    R: Read + Send,
{
    tracing::trace!("Creating zstd Decoder");
    match RawDecoder::new() {
        Ok(operation) => Ok(Reader::new(BufReader::new(r), operation)),
        Err(e) => Err((r, e)),
    }
}
