use std::fmt;
use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

/// Size of each socket read.
pub const CHUNK_SIZE: usize = 1024;

#[derive(Debug)]
pub enum ReadError {
    /// No bytes arrived within the idle timeout.
    Timeout,
    /// The peer reset or aborted the connection.
    ConnectionReset,
    /// The head grew past the configured limit without terminating.
    HeadTooLarge,
    Io(io::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Timeout => f.write_str("read timed out"),
            ReadError::ConnectionReset => f.write_str("connection reset by peer"),
            ReadError::HeadTooLarge => f.write_str("request head too large"),
            ReadError::Io(e) => write!(f, "read failed: {}", e),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => ReadError::ConnectionReset,
            io::ErrorKind::TimedOut => ReadError::Timeout,
            _ => ReadError::Io(e),
        }
    }
}

/// Accumulates socket reads until a full request head is available.
pub struct RequestReader {
    buffer: BytesMut,
    read_timeout: Duration,
    max_head_bytes: usize,
}

impl RequestReader {
    pub fn new(read_timeout: Duration, max_head_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(CHUNK_SIZE),
            read_timeout,
            max_head_bytes,
        }
    }

    /// Reads until the head terminator shows up or the peer stops sending.
    ///
    /// Returns `Ok(None)` if the peer closed the connection before sending
    /// anything. A peer that closes mid-head yields whatever was received and
    /// leaves the verdict to the parser.
    pub async fn read<R>(&mut self, stream: &mut R) -> Result<Option<Bytes>, ReadError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let mut temp = [0u8; CHUNK_SIZE];
            let n = timeout(self.read_timeout, stream.read(&mut temp))
                .await
                .map_err(|_| ReadError::Timeout)??;

            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take()));
            }

            // A terminator may straddle two reads.
            let scan_from = self.buffer.len().saturating_sub(3);
            self.buffer.extend_from_slice(&temp[..n]);

            if find_head_end(&self.buffer[scan_from..]).is_some() {
                return Ok(Some(self.take()));
            }

            if self.buffer.len() > self.max_head_bytes {
                return Err(ReadError::HeadTooLarge);
            }
        }
    }

    fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}

/// Position just past the blank line that ends a head, if there is one.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4);
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_crlf_and_bare_lf_terminators() {
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\n\r\n"), Some(18));
        assert_eq!(find_head_end(b"GET / HTTP/1.1\n\n"), Some(16));
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\nHost: a\r\n"), None);
    }
}
