//! # Frame Reader
//!
//! Buffered exact-length reads over a byte stream, and the `u32` little
//! endian length-prefixed framing built on top of them.
//!
//! The buffer starts at [`INITIAL_CAPACITY`] bytes. When a read needs more
//! room than is left after the unread tail, the tail is first moved to the
//! front of the buffer; only if that is still not enough does the buffer
//! grow, to twice its size or twice the requested length, whichever is
//! larger.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Initial buffer size.
pub const INITIAL_CAPACITY: usize = 1024;

/// Size of the length prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Framing failures.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Underlying stream failed or ended early.
    #[error("frame i/o: {0}")]
    Io(#[from] io::Error),

    /// Length prefix of zero.
    #[error("empty frame")]
    Empty,

    /// Length prefix above the caller's limit.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    TooLarge {
        /// Announced length.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },
}

/// Buffering reader guaranteeing exact-length reads.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: vec![0; INITIAL_CAPACITY],
            start: 0,
            end: 0,
        }
    }

    /// Current buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read from the stream but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.end - self.start
    }

    /// Read exactly `n` bytes, retrying the underlying stream as needed.
    pub async fn read_exact(&mut self, n: usize) -> io::Result<&[u8]> {
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
        while self.buffered() < n {
            self.make_room(n);
            let read = self.inner.read(&mut self.buf[self.end..]).await?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed with {} of {} bytes", self.buffered(), n),
                ));
            }
            self.end += read;
        }
        let begin = self.start;
        self.start += n;
        Ok(&self.buf[begin..begin + n])
    }

    /// Read one length-prefixed frame of at most `max` bytes.
    ///
    /// The limit is checked before the body is read.
    pub async fn read_frame(&mut self, max: usize) -> Result<Vec<u8>, FrameError> {
        let header = self.read_exact(LENGTH_PREFIX_LEN).await?;
        let mut len_bytes = [0u8; LENGTH_PREFIX_LEN];
        len_bytes.copy_from_slice(header);
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len == 0 {
            return Err(FrameError::Empty);
        }
        if len > max {
            return Err(FrameError::TooLarge { len, max });
        }
        Ok(self.read_exact(len).await?.to_vec())
    }

    /// Ensure `n` bytes fit after `start`.
    fn make_room(&mut self, n: usize) {
        if self.buf.len() - self.start >= n && self.end < self.buf.len() {
            return;
        }
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        if self.buf.len() < n || self.end == self.buf.len() {
            let grown = (self.buf.len() * 2).max(n * 2);
            self.buf.resize(grown, 0);
        }
    }

    /// Give back the stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Write one length-prefixed frame and flush.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> io::Result<()> {
    let len = u32::try_from(body.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds u32 length"))?;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_LEN + body.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(body);
    writer.write_all(&frame).await?;
    writer.flush().await
}
