use std::io::{Read, Write, Result};

/// IO source which replays some already read bytes first.
#[derive(Debug)]
pub struct Rewind<IO> {
    pre: Vec<u8>,
    pos: usize,
    io: IO,
}

impl<IO> Rewind<IO> {
    #[inline]
    pub fn new(pre: Vec<u8>, io: IO) -> Self { Self { pre, pos: 0, io } }

    #[inline]
    pub fn get_ref(&self) -> &IO { &self.io }

    #[inline]
    pub fn get_mut(&mut self) -> &mut IO { &mut self.io }

    /// Number of replayed bytes not consumed yet.
    #[inline]
    pub fn remaining(&self) -> usize { self.pre.len() - self.pos }

    #[inline]
    fn read_pre(&mut self, buf: &mut [u8]) -> usize {
        let n = std::cmp::min(buf.len(), self.remaining());
        buf[..n].copy_from_slice(&self.pre[self.pos..self.pos + n]);
        self.consume_pre(n);
        n
    }

    #[inline]
    fn consume_pre(&mut self, n: usize) {
        self.pos += n;
        if self.remaining() == 0 {
            // release the memory
            self.pre = Vec::new();
            self.pos = 0;
        }
    }
}

impl<IO: Read> Read for Rewind<IO> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining() > 0 {
            return Ok(self.read_pre(buf));
        }
        self.io.read(buf)
    }
}

impl<IO: Write> Write for Rewind<IO> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> Result<usize> { self.io.write(buf) }

    #[inline]
    fn flush(&mut self) -> Result<()> { self.io.flush() }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "async")] {
        use std::pin::Pin;
        use std::task::{Context, Poll};
        use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

        impl<IO: AsyncRead + Unpin> AsyncRead for Rewind<IO> {
            fn poll_read(
                self: Pin<&mut Self>,
                cx: &mut Context<'_>,
                buf: &mut ReadBuf<'_>,
            ) -> Poll<Result<()>> {
                let this = self.get_mut();
                if this.remaining() > 0 {
                    let n = std::cmp::min(buf.remaining(), this.remaining());
                    buf.put_slice(&this.pre[this.pos..this.pos + n]);
                    this.consume_pre(n);
                    return Poll::Ready(Ok(()));
                }
                Pin::new(&mut this.io).poll_read(cx, buf)
            }
        }

        impl<IO: AsyncWrite + Unpin> AsyncWrite for Rewind<IO> {
            fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize>> {
                Pin::new(&mut self.get_mut().io).poll_write(cx, buf)
            }

            fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
                Pin::new(&mut self.get_mut().io).poll_flush(cx)
            }

            fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
                Pin::new(&mut self.get_mut().io).poll_shutdown(cx)
            }
        }
    }
}
