use futures_util::io::AsyncRead;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A reader carrying the name of the thing it reads, typically a file path.
///
/// [`Form::add_named_file`](crate::Form::add_named_file) uses the name's last
/// path element as the part's filename.
///
/// # Examples
///
/// ```
/// use formpart::Named;
///
/// let image = Named::new("shots/cat.png", &b"\x89PNG\r\n\x1a\n"[..]);
/// assert_eq!(image.name(), "shots/cat.png");
/// assert_eq!(image.into_inner().len(), 8);
/// ```
#[derive(Debug)]
pub struct Named<R> {
    name: String,
    inner: R,
}

impl<R> Named<R> {
    /// Wraps `inner`, naming it `name`.
    pub fn new<N: Into<String>>(name: N, inner: R) -> Self {
        Named {
            name: name.into(),
            inner,
        }
    }

    /// The name given at construction, possibly including a path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drops the name and returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Named<R> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}
