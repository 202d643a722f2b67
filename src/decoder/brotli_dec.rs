use std::io::Read;

use brotli::Decompressor;

use crate::decoder::Decoder;

/// Size of the compressed-input buffer the decompressor reads into
const BUFFER_SIZE: usize = 4096;

impl<R> Decoder<R> for Decompressor<R>
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

pub(crate) fn mk_decoder<R>(r: R) -> impl Decoder<R>
where
    R: Read + Send,
{
    tracing::trace!(buffer_size = BUFFER_SIZE, "Creating brotli Decompressor");
    Decompressor::new(r, BUFFER_SIZE)
}
