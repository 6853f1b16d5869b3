#![allow(rustdoc::bare_urls)]

//! Core HTTP protocol types: method, version, status catalogue and headers

use std::fmt;

// METHOD

/// HTTP request methods accepted by the framer
///
/// The set is closed. Any other token in the method position is answered
/// with [`StatusCode::NotImplemented`].
///
/// # References
///
/// - [RFC 9110, Section 9](https://datatracker.ietf.org/doc/html/rfc9110#section-9)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method - transfer a current representation of the target resource
    /// [[RFC9110, Section 9.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.1)]
    Get,
    /// POST method - perform resource-specific processing on the request payload
    /// [[RFC9110, Section 9.3.3](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.3)]
    Post,
}

impl Method {
    #[inline]
    pub(crate) fn from_token(src: &str) -> Option<Self> {
        match src {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }

    /// Returns the method as it appears on the wire.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// VERSION

/// HTTP protocol version
///
/// Only `HTTP/1.1` is spoken. The enum exists so that the version stays a
/// typed value rather than a free string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Version {
    /// HTTP/1.1 - [RFC 9112](https://datatracker.ietf.org/doc/html/rfc9112)
    #[default]
    Http11,
}

impl Version {
    pub(crate) const PROTOCOL: &'static str = "HTTP";
    pub(crate) const NUMBER: &'static str = "1.1";

    /// Returns the version as it appears on the wire (`HTTP/1.1`).
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:literal, $str:expr);
    )+) => {
        /// HTTP status codes
        ///
        /// The catalogue is closed: every status the framer, the connection
        /// or a handler can emit is listed here, and each code maps to
        /// exactly one reason phrase.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name = $num,
        )+ }

        impl StatusCode {
            /// Looks up a numeric code in the catalogue.
            #[inline]
            pub const fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $( $num => Some(StatusCode::$name), )+
                    _ => None,
                }
            }

            /// Returns the reason phrase (e.g. `"Not Found"`).
            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self { $(
                    StatusCode::$name => $str,
                )+ }
            }
        }
    }
}

set_status_codes! {
    /// [[RFC9110, Section 15.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.1)]
    Ok = (200, "OK");
    /// [[RFC9110, Section 15.3.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.2)]
    Created = (201, "Created");

    /// [[RFC9110, Section 15.5.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.1)]
    BadRequest = (400, "Bad Request");
    /// [[RFC9110, Section 15.5.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.5)]
    NotFound = (404, "Not Found");
    /// [[RFC9110, Section 15.5.12](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.12)]
    LengthRequired = (411, "Length Required");

    /// [[RFC9110, Section 15.6.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.1)]
    InternalServerError = (500, "Internal Server Error");
    /// [[RFC9110, Section 15.6.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.2)]
    NotImplemented = (501, "Not Implemented");
}

impl StatusCode {
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

// START LINES

/// `method SP request-target SP HTTP-version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) version: Version,
}

impl RequestLine {
    #[inline]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            version: Version::Http11,
        }
    }

    #[inline]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Raw request-target, exactly as received.
    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    pub const fn version(&self) -> Version {
        self.version
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.target, self.version)
    }
}

/// `HTTP-version SP status-code SP reason-phrase`
///
/// The reason phrase is always derived from the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine {
    pub(crate) version: Version,
    pub(crate) status: StatusCode,
}

impl StatusLine {
    #[inline]
    pub const fn new(status: StatusCode) -> Self {
        Self {
            version: Version::Http11,
            status,
        }
    }

    #[inline]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub const fn reason(&self) -> &'static str {
        self.status.reason()
    }

    #[inline]
    pub const fn version(&self) -> Version {
        self.version
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.version, self.status)
    }
}

// HEADERS

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Header map with case-sensitive names and one value per name.
///
/// Inserting an existing name replaces its value in place, so iteration
/// order (and therefore serialization) is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<Header>);

impl Headers {
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());

        match self.0.iter_mut().find(|h| h.name == name) {
            Some(header) => header.value = value,
            None => self.0.push(Header { name, value }),
        }
    }

    /// Exact (case-sensitive) lookup.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    // `name: value` lines joined by CRLF, no trailing CRLF
    pub(crate) fn write_to(&self, buffer: &mut Vec<u8>) {
        for (i, header) in self.0.iter().enumerate() {
            if i > 0 {
                buffer.extend_from_slice(b"\r\n");
            }
            buffer.extend_from_slice(header.name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(header.value.as_bytes());
        }
    }
}

// Shared wire shape of requests and responses:
// with body:    start CRLF headers CRLF CRLF body CRLF
// without body: start CRLF headers CRLF
pub(crate) fn serialize_message(
    start_line: &dyn fmt::Display,
    headers: &Headers,
    body: Option<&[u8]>,
) -> Vec<u8> {
    let mut buffer = start_line.to_string().into_bytes();
    buffer.extend_from_slice(b"\r\n");
    headers.write_to(&mut buffer);
    buffer.extend_from_slice(b"\r\n");

    if let Some(body) = body {
        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(body);
        buffer.extend_from_slice(b"\r\n");
    }

    buffer
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_catalogue() {
        #[rustfmt::skip]
        let cases = [
            (200, Some((StatusCode::Ok,                  "OK"))),
            (201, Some((StatusCode::Created,             "Created"))),
            (400, Some((StatusCode::BadRequest,          "Bad Request"))),
            (404, Some((StatusCode::NotFound,            "Not Found"))),
            (411, Some((StatusCode::LengthRequired,      "Length Required"))),
            (500, Some((StatusCode::InternalServerError, "Internal Server Error"))),
            (501, Some((StatusCode::NotImplemented,      "Not Implemented"))),

            (0,   None),
            (204, None),
            (418, None),
            (503, None),
        ];

        for (code, expected) in cases {
            let status = StatusCode::from_u16(code);
            assert_eq!(status.map(|s| (s, s.reason())), expected);

            if let Some(status) = status {
                assert_eq!(status.as_u16(), code);
            }
        }
    }

    #[test]
    fn method_tokens() {
        assert_eq!(Method::from_token("GET"), Some(Method::Get));
        assert_eq!(Method::from_token("POST"), Some(Method::Post));
        assert_eq!(Method::from_token("get"), None);
        assert_eq!(Method::from_token("PUT"), None);
        assert_eq!(Method::from_token(""), None);
    }

    #[test]
    fn start_lines() {
        let line = RequestLine::new(Method::Post, "/a");
        assert_eq!(line.to_string(), "POST /a HTTP/1.1");

        let line = StatusLine::new(StatusCode::LengthRequired);
        assert_eq!(line.to_string(), "HTTP/1.1 411 Length Required");
        assert_eq!(line.reason(), "Length Required");
    }

    #[test]
    fn headers_replace_in_place() {
        let mut headers = Headers::new();
        headers.insert("Accept", "*/*");
        headers.insert("Host", "localhost");
        headers.insert("Accept", "text/plain");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Accept"), Some("text/plain"));
        assert_eq!(headers.get("accept"), None);

        let mut buffer = Vec::new();
        headers.write_to(&mut buffer);
        assert_eq!(buffer, b"Accept: text/plain\r\nHost: localhost");
    }
}
