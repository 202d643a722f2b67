use std::io::Read;

use flate2::read::MultiGzDecoder;

use crate::decoder::Decoder;

impl<R> Decoder<R> for MultiGzDecoder<R>
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

/// HTTP allows a gzip body to be several concatenated members, decode them
/// all rather than stopping after the first.
pub(crate) fn mk_decoder<R>(r: R) -> impl Decoder<R>
where
    R: Read + Send,
{
    tracing::trace!("Creating MultiGzDecoder");
    MultiGzDecoder::new(r)
}
