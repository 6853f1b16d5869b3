//! HTTP responses and the writer handlers use to send them.

use crate::{
    errors::Error,
    http::types::{self, Headers, StatusCode, StatusLine},
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A complete HTTP response message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    line: StatusLine,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl Response {
    #[inline]
    pub fn new(status: StatusCode) -> Self {
        Self {
            line: StatusLine::new(status),
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
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[inline]
    pub(crate) fn set_body(&mut self, body: Vec<u8>) {
        self.body = Some(body);
    }

    #[inline]
    pub const fn status(&self) -> StatusCode {
        self.line.status
    }

    #[inline]
    pub fn status_line(&self) -> &StatusLine {
        &self.line
    }

    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Serializes the response to its wire form.
    ///
    /// ```text
    /// with body:    STATUS-LINE CRLF HEADERS CRLF CRLF BODY CRLF
    /// without body: STATUS-LINE CRLF HEADERS CRLF
    /// ```
    pub fn to_wire(&self) -> Vec<u8> {
        types::serialize_message(&self.line, &self.headers, self.body.as_deref())
    }
}

/// Response writer bound to the connection that received the request.
///
/// Instances are created by the server and passed to
/// [`Handler::handle`](crate::Handler::handle).
///
/// Every call to [`write`](ResponseWriter::write) sends one complete HTTP
/// message (status line, headers and the given body). Writing is not
/// incremental: calling it twice sends two responses.
///
/// # Examples
/// ```
/// use bare_web::{Handled, Request, ResponseWriter, StatusCode};
/// use tokio::io::AsyncWrite;
///
/// // In your implementation of `Handler`
/// async fn handle<W>(resp: &mut ResponseWriter<'_, W>, _req: &Request) -> Handled
/// where
///     W: AsyncWrite + Unpin + Send,
/// {
///     resp.status(StatusCode::Ok)
///         .header("Content-Type", "text/plain")
///         .write(b"Hello World")
///         .await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ResponseWriter<'a, W> {
    stream: &'a mut W,
    status: Option<StatusCode>,
    headers: Headers,
}

impl<'a, W> ResponseWriter<'a, W>
where
    W: AsyncWrite + Unpin,
{
    #[inline]
    pub(crate) fn new(stream: &'a mut W) -> Self {
        Self {
            stream,
            status: None,
            headers: Headers::new(),
        }
    }

    /// Sets the status from a numeric code.
    ///
    /// Fails with [`Error::UnknownStatus`] if the code is not one of the
    /// catalogued [`StatusCode`]s; the current status is left untouched.
    pub fn write_status_code(&mut self, code: u16) -> Result<(), Error> {
        let status = StatusCode::from_u16(code).ok_or(Error::UnknownStatus(code))?;
        self.status = Some(status);
        Ok(())
    }

    /// Sets the status of the next written response.
    #[inline]
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    /// Status set so far, `None` if no status was ever set.
    #[inline]
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    /// Adds a header to every response written afterwards.
    #[inline]
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Sends a full response carrying `body` and returns the number of
    /// bytes written. Without a status, `200 OK` is used.
    ///
    /// On a transport error a `500 Internal Server Error` carrying the error
    /// text is attempted once, then the original error is returned.
    pub async fn write(&mut self, body: &[u8]) -> Result<usize, Error> {
        let response = Response {
            line: StatusLine::new(self.status.unwrap_or(StatusCode::Ok)),
            headers: self.headers.clone(),
            body: Some(body.to_vec()),
        };
        let wire = response.to_wire();

        if let Err(err) = write_flush(&mut *self.stream, &wire).await {
            tracing::error!(error = %err, "connection write error");

            let fallback = Response::new(StatusCode::InternalServerError).with_body(err.to_string());
            if let Err(fallback_err) = write_flush(&mut *self.stream, &fallback.to_wire()).await {
                tracing::debug!(error = %fallback_err, "fallback 500 not delivered");
            }

            return Err(err.into());
        }

        Ok(wire.len())
    }
}

#[inline]
pub(crate) async fn write_flush<W>(stream: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(bytes).await?;
    stream.flush().await
}
