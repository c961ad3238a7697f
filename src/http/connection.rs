use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::files::{ResolveError, resolve};
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::reader::{ReadError, RequestReader};
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;

/// Serves exactly one request on a stream, then closes it.
pub struct Connection<S> {
    stream: S,
    config: Arc<ServerConfig>,
    reader: RequestReader,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Parsing(Bytes),
    Resolving(Request),
    Responding(ResponseWriter),
    Erroring(ConnectionError),
    Closed,
}

/// Failures that end a connection before a regular response exists.
#[derive(Debug)]
pub enum ConnectionError {
    Read(ReadError),
    Parse(ParseError),
}

impl ConnectionError {
    /// Status of the best-effort reply, or `None` when the socket is not
    /// worth writing to.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ConnectionError::Read(ReadError::Timeout) => Some(StatusCode::RequestTimeout),
            ConnectionError::Read(ReadError::HeadTooLarge) => Some(StatusCode::BadRequest),
            ConnectionError::Read(_) => None,
            ConnectionError::Parse(_) => Some(StatusCode::BadRequest),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Read(e) => fmt::Display::fmt(e, f),
            ConnectionError::Parse(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: Arc<ServerConfig>) -> Self {
        let reader = RequestReader::new(config.read_timeout(), config.max_head_bytes);
        Self {
            stream,
            config,
            reader,
            state: ConnectionState::Reading,
        }
    }

    /// Drives the connection to `Closed`.
    ///
    /// Request-level problems become HTTP error responses. Only a failure to
    /// write a response is returned, since by then nothing else can be sent.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Reading => match self.reader.read(&mut self.stream).await {
                    Ok(Some(buf)) => ConnectionState::Parsing(buf),
                    Ok(None) => {
                        debug!("Peer closed before sending a request");
                        ConnectionState::Closed
                    }
                    Err(e) => ConnectionState::Erroring(ConnectionError::Read(e)),
                },

                ConnectionState::Parsing(buf) => match parse_http_request(&buf) {
                    Ok(req) if req.method.is_supported() => ConnectionState::Resolving(req),
                    Ok(req) => {
                        info!(method = %req.method, path = %req.target, status = 405, "Unsupported method");
                        ConnectionState::Responding(ResponseWriter::new(
                            Response::method_not_allowed(),
                            true,
                        ))
                    }
                    Err(e) => ConnectionState::Erroring(ConnectionError::Parse(e)),
                },

                ConnectionState::Resolving(req) => {
                    let response = respond(&req, &self.config).await;
                    info!(
                        method = %req.method,
                        path = %req.target,
                        status = response.status.as_u16(),
                        "Request served"
                    );
                    ConnectionState::Responding(ResponseWriter::new(response, !req.is_head()))
                }

                ConnectionState::Responding(mut writer) => {
                    writer.write_to_stream(&mut self.stream).await?;
                    ConnectionState::Closed
                }

                ConnectionState::Erroring(err) => {
                    self.fail(err).await;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    async fn fail(&mut self, err: ConnectionError) {
        match &err {
            ConnectionError::Read(ReadError::Timeout) => warn!("Client timed out: {}", err),
            ConnectionError::Read(_) => debug!("Dropping connection: {}", err),
            ConnectionError::Parse(_) => info!("Rejecting request: {}", err),
        }

        let Some(status) = err.status() else {
            return;
        };

        let mut writer = ResponseWriter::new(Response::error(status), true);
        if let Err(e) = writer.write_to_stream(&mut self.stream).await {
            debug!("Could not deliver {} response: {}", status.as_u16(), e);
        }
    }
}

/// Builds the response for a GET or HEAD request.
///
/// HEAD gets the same response as GET; the writer is what leaves the body out.
pub async fn respond(req: &Request, config: &ServerConfig) -> Response {
    if !req.method.is_supported() {
        return Response::method_not_allowed();
    }

    let resolved = match resolve(&req.target, config).await {
        Ok(resolved) => resolved,
        Err(ResolveError::Forbidden) => {
            warn!(path = %req.target, "Rejected path outside document root");
            return Response::error(StatusCode::Forbidden);
        }
        Err(ResolveError::PermissionDenied) => return Response::error(StatusCode::Forbidden),
        Err(e @ ResolveError::Io(_)) => {
            error!(path = %req.target, "Cannot resolve: {}", e);
            return Response::error(StatusCode::InternalServerError);
        }
    };

    if !resolved.is_servable() {
        return Response::error(StatusCode::NotFound);
    }

    match File::open(&resolved.filesystem_path).await {
        Ok(file) => {
            // Length of the handle actually streamed, not of the earlier stat.
            let len = match file.metadata().await {
                Ok(meta) => meta.len(),
                Err(_) => resolved.size,
            };
            Response::file(file, len, resolved.content_type)
        }
        Err(e) => match e.kind() {
            io::ErrorKind::PermissionDenied => Response::error(StatusCode::Forbidden),
            io::ErrorKind::NotFound => Response::error(StatusCode::NotFound),
            _ => {
                error!(path = %resolved.filesystem_path.display(), "Cannot open file: {}", e);
                Response::error(StatusCode::InternalServerError)
            }
        },
    }
}
