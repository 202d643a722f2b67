//! Response body handles.

use std::{fmt, io};

/// A readable byte stream that must be closed explicitly when the consumer is
/// done with it, e.g. to hand a connection back to a pool.
pub trait BodyReader: io::Read + Send {
    /// Releases the stream. `self` is boxed because bodies are typically
    /// used as trait objects.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// The body of a response, as handed over by the transport.
///
/// Wraps any [BodyReader]. Dropping a `Body` without calling [Body::close]
/// releases memory but skips whatever the underlying stream does on close.
pub struct Body {
    inner: Box<dyn BodyReader>,
}

impl Body {
    /// Wraps a closable stream.
    pub fn new<B>(inner: B) -> Self
    where
        B: BodyReader + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Wraps a plain reader, closing it is a no-op.
    pub fn from_reader<R>(rd: R) -> Self
    where
        R: io::Read + Send + 'static,
    {
        Self::new(NoClose(rd))
    }

    /// A body with no bytes in it.
    pub fn empty() -> Self {
        Self::from_reader(io::empty())
    }

    /// Closes the underlying stream.
    pub fn close(self) -> io::Result<()> {
        self.inner.close()
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl io::Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BodyReader for Body {
    fn close(self: Box<Self>) -> io::Result<()> {
        Body::close(*self)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_reader(io::Cursor::new(bytes))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from_reader(bytes)
    }
}

struct NoClose<R>(R);

impl<R> io::Read for NoClose<R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R> BodyReader for NoClose<R>
where
    R: io::Read + Send,
{
    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

/// Bytes already pulled off a body, put back in front of the rest of it.
/// Closing it closes the rest.
impl<B> BodyReader for io::Chain<io::Cursor<Vec<u8>>, B>
where
    B: BodyReader,
{
    fn close(self: Box<Self>) -> io::Result<()> {
        let (_head, rest) = self.into_inner();
        Box::new(rest).close()
    }
}
