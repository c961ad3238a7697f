use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{Body, Response};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Status line, headers and the blank separator line.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes one response and closes the write side of the stream.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
    body: Body,
}

impl ResponseWriter {
    /// Prepares `response` for writing. With `include_body` unset (HEAD) the
    /// headers still announce the full length but no body bytes follow.
    pub fn new(response: Response, include_body: bool) -> Self {
        let mut buffer = serialize_head(&response);
        let body = match response.body {
            Body::Bytes(bytes) if include_body => {
                buffer.extend_from_slice(&bytes);
                Body::Empty
            }
            body @ Body::File { .. } if include_body => body,
            _ => Body::Empty,
        };

        Self {
            buffer,
            written: 0,
            body,
        }
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        if let Body::File { file, len } = &mut self.body {
            let expected = *len;
            let copied = tokio::io::copy(&mut file.take(expected), stream).await?;
            if copied != expected {
                anyhow::bail!("file shrank while sending: {} of {} bytes", copied, expected);
            }
        }

        stream.flush().await?;
        stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::{ResponseBuilder, StatusCode};

    #[test]
    fn head_ends_with_blank_line() {
        let resp = ResponseBuilder::new(StatusCode::NotFound).build();
        let head = String::from_utf8(serialize_head(&resp)).unwrap();

        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(head.ends_with("Connection: close\r\n\r\n"));
    }
}
