use std::fmt;

use crate::http::request::{Headers, Method, Request};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace was received.
    Empty,
    /// The first line is not `<METHOD> <TARGET> <VERSION>`.
    MalformedRequestLine,
    /// A GET or HEAD target is neither origin-form (`/path`) nor absolute-form.
    InvalidTarget,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => f.write_str("empty request"),
            ParseError::MalformedRequestLine => f.write_str("malformed request line"),
            ParseError::InvalidTarget => f.write_str("invalid request target"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses a complete request head.
///
/// Lines end in `\r\n`, bare `\n` is tolerated. Header lines without a colon
/// are skipped instead of failing the request. Anything after the first blank
/// line is ignored.
pub fn parse_http_request(buf: &[u8]) -> Result<Request, ParseError> {
    let text = String::from_utf8_lossy(buf);
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .skip_while(|line| line.trim().is_empty());

    let request_line = lines.next().ok_or(ParseError::Empty)?;
    let (method, target, version) = parse_request_line(request_line)?;

    let mut headers = Headers::new();
    for line in lines.take_while(|line| !line.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        headers.insert(name, value.trim());
    }

    Ok(Request {
        method,
        target,
        version: version.to_string(),
        headers,
    })
}

fn parse_request_line(line: &str) -> Result<(Method, String, &str), ParseError> {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::MalformedRequestLine);
    };

    let method = Method::from_token(method);
    // Unsupported methods are answered with 405 whatever they target, so
    // their target is kept as received.
    let target = match origin_form(target) {
        Ok(target) => target,
        Err(_) if !method.is_supported() => target.to_string(),
        Err(e) => return Err(e),
    };

    Ok((method, target, version))
}

/// Reduces a target to its `/path?query` part.
fn origin_form(target: &str) -> Result<String, ParseError> {
    if target.starts_with('/') {
        return Ok(target.to_string());
    }

    let lower = target.to_ascii_lowercase();
    let rest = ["http://", "https://"]
        .iter()
        .find(|scheme| lower.starts_with(*scheme))
        .map(|scheme| &target[scheme.len()..])
        .ok_or(ParseError::InvalidTarget)?;

    match rest.find(['/', '?']) {
        Some(i) if rest[i..].starts_with('/') => Ok(rest[i..].to_string()),
        Some(i) => Ok(format!("/{}", &rest[i..])),
        None => Ok("/".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let parsed = parse_http_request(req).unwrap();

        assert_eq!(parsed.target, "/");
        assert_eq!(parsed.headers.get("host").unwrap(), "example.com");
    }

    #[test]
    fn absolute_form_is_reduced_to_path() {
        assert_eq!(origin_form("http://localhost:9999/a/b.css").unwrap(), "/a/b.css");
        assert_eq!(origin_form("HTTP://example.com").unwrap(), "/");
        assert_eq!(origin_form("http://example.com?x=1").unwrap(), "/?x=1");
        assert_eq!(origin_form("*"), Err(ParseError::InvalidTarget));
    }
}
