use crate::{
    errors::FramingError,
    http::types::{self, Headers, Method, RequestLine, StatusCode, Version},
    limits::ConnLimits,
};
use memchr::memmem;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// A framed HTTP/1.1 request.
///
/// Produced by [`Request::parse`] from the bytes of a single read, or built
/// by hand (e.g. in tests or by a proxy) with [`Request::new`].
///
/// # Accepted input
///
/// #### General designations
/// - `SP`: ASCII space (0x20), exactly one between start-line tokens
/// - `CRLF`: `"\r\n"`. A bare `LF` is accepted only when the message holds
///   no `CRLF` at all.
///
/// ## First line
/// ```text
/// [METHOD] SP [TARGET] SP HTTP/1.1 CRLF
/// ```
/// - `[METHOD]`: `GET` or `POST`, anything else is `501 Not Implemented`
/// - `[TARGET]`: opaque, must not contain whitespace
///
/// ## Header
/// ```text
/// [NAME]:[VALUE] CRLF
/// ```
/// The name is kept as received (case-sensitive) and must not contain a
/// space. The value may contain colons and is trimmed of surrounding spaces.
///
/// ## Body
/// The body is the single line that follows the first blank line which
/// is itself followed by a non-blank line. A body requires a
/// `Content-Length` header (`411 Length Required` otherwise); its value is
/// not used to size the body.
///
/// **Not supported**: `Transfer-Encoding: chunked`, multi-line bodies,
/// bodies larger than one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    line: RequestLine,
    headers: Headers,
    body: Option<String>,
}

// Public API
impl Request {
    #[inline]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            line: RequestLine::new(method, target),
            headers: Headers::new(),
            body: None,
        }
    }

    #[inline]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[inline]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[inline]
    pub fn request_line(&self) -> &RequestLine {
        &self.line
    }

    #[inline]
    pub const fn method(&self) -> Method {
        self.line.method
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.line.target
    }

    #[inline]
    pub const fn version(&self) -> Version {
        self.line.version
    }

    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-sensitive header lookup.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    #[inline]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Serializes the request back to its wire form.
    pub fn to_wire(&self) -> Vec<u8> {
        types::serialize_message(
            &self.line,
            &self.headers,
            self.body.as_deref().map(str::as_bytes),
        )
    }
}

// Framing
impl Request {
    /// Frames a raw buffer into a request.
    ///
    /// `buffer` may carry NUL padding on either side, as left by reading
    /// into a zeroed buffer larger than the message.
    pub fn parse(buffer: &[u8]) -> Result<Self, FramingError> {
        let bytes = trim_padding(buffer);
        let message = simdutf8::basic::from_utf8(bytes)
            .map_err(|_| FramingError::bad_request("request is not valid UTF-8"))?;

        let lines = split_lines(message);
        let [start_line, rest @ ..] = lines.as_slice() else {
            return Err(FramingError::bad_request("request is not an HTTP message"));
        };
        if rest.is_empty() {
            return Err(FramingError::bad_request("request is not an HTTP message"));
        }

        let line = parse_request_line(start_line)?;

        let body_index = find_body_index(rest);
        let headers = parse_headers(&rest[..body_index.unwrap_or(rest.len())])?;

        let body = match body_index {
            Some(index) => Some(parse_body(&headers, rest[index])?),
            None => None,
        };

        Ok(Request {
            line,
            headers,
            body,
        })
    }
}

#[inline]
fn trim_padding(buffer: &[u8]) -> &[u8] {
    let start = buffer
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(buffer.len());
    let end = buffer.iter().rposition(|b| *b != 0).map_or(start, |i| i + 1);

    &buffer[start..end]
}

fn split_lines(message: &str) -> Vec<&str> {
    let lines = split_on(message, b"\r\n");
    if lines.len() == 1 {
        return split_on(message, b"\n");
    }
    lines
}

fn split_on<'a>(message: &'a str, separator: &[u8]) -> Vec<&'a str> {
    let mut lines = Vec::new();
    let mut start = 0;

    // Separators are ASCII, so every cut lands on a char boundary
    for pos in memmem::find_iter(message.as_bytes(), separator) {
        lines.push(&message[start..pos]);
        start = pos + separator.len();
    }
    lines.push(&message[start..]);

    lines
}

// The body starts at the first non-blank line directly after a blank line.
// A blank line with nothing (or only blank lines) after it is not a boundary.
#[inline]
fn find_body_index(lines: &[&str]) -> Option<usize> {
    lines
        .windows(2)
        .position(|pair| pair[0].is_empty() && !pair[1].is_empty())
        .map(|i| i + 1)
}

// request-line = method SP request-target SP HTTP-version
fn parse_request_line(line: &str) -> Result<RequestLine, FramingError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = tokens.as_slice() else {
        return Err(FramingError::bad_request(
            "request line not parseable, expected: method SP request-target SP HTTP-version",
        ));
    };

    let method = Method::from_token(method).ok_or_else(|| {
        FramingError::new(
            StatusCode::NotImplemented,
            format!("method not implemented: {method}"),
        )
    })?;

    if target.chars().any(char::is_whitespace) {
        return Err(FramingError::bad_request(
            "request target must not contain whitespace",
        ));
    }

    let version = parse_version(version)?;

    Ok(RequestLine {
        method,
        target: (*target).to_owned(),
        version,
    })
}

fn parse_version(token: &str) -> Result<Version, FramingError> {
    let parts: Vec<&str> = token.split('/').collect();
    let [protocol, number] = parts.as_slice() else {
        return Err(FramingError::bad_request("malformed HTTP version"));
    };

    if *protocol != Version::PROTOCOL {
        return Err(FramingError::bad_request("not an HTTP protocol"));
    }
    if *number != Version::NUMBER {
        return Err(FramingError::bad_request("HTTP version unsupported"));
    }

    Ok(Version::Http11)
}

fn parse_headers(lines: &[&str]) -> Result<Headers, FramingError> {
    let mut headers = Headers::new();

    for line in lines.iter().copied().filter(|line| !line.is_empty()) {
        let (name, value) = line.split_once(':').unwrap_or((line, ""));

        // RFC 9112, Section 5.1: no whitespace between field name and colon
        if name.contains(' ') {
            return Err(FramingError::bad_request(
                "whitespace between field name and colon is not allowed",
            ));
        }

        headers.insert(name, value.trim_matches(' '));
    }

    Ok(headers)
}

fn parse_body(headers: &Headers, line: &str) -> Result<String, FramingError> {
    // Transfer-Encoding is not considered
    match headers.get("Content-Length") {
        Some(value) if !value.is_empty() => Ok(line.to_owned()),
        _ => Err(FramingError::new(
            StatusCode::LengthRequired,
            "missing Content-Length header",
        )),
    }
}

//

/// Fixed-size read buffer owned by one connection.
#[derive(Debug)]
pub(crate) struct Parser {
    len: usize,
    buffer: Box<[u8]>,
}

impl Parser {
    #[inline]
    pub(crate) fn new(limits: &ConnLimits) -> Self {
        Parser {
            len: 0,
            buffer: vec![0; limits.read_buffer_size].into_boxed_slice(),
        }
    }

    /// Performs exactly one read. Short reads are not retried.
    #[inline]
    pub(crate) async fn fill_buffer<R>(&mut self, stream: &mut R) -> Result<usize, io::Error>
    where
        R: AsyncRead + Unpin,
    {
        let n = stream.read(&mut self.buffer).await?;
        self.len = n;
        Ok(n)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Frames the whole buffer, padding included.
    #[inline]
    pub(crate) fn frame(&self) -> Result<Request, FramingError> {
        Request::parse(&self.buffer)
    }
}
