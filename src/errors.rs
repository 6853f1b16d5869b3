use crate::http::{response::Response, types::StatusCode};
use std::{borrow::Cow, fmt, io};

/// Terminal outcome of framing a request that cannot be served.
///
/// Carries a status from the catalogue and a human-readable message that
/// becomes the body of the error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingError {
    pub status: StatusCode,
    pub message: Cow<'static, str>,
}

impl FramingError {
    #[inline]
    pub(crate) fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[inline]
    pub(crate) fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BadRequest, message)
    }

    /// Builds the response sent to the client for this error.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(self.status);
        response.set_body(self.message.into_owned().into_bytes());
        response
    }
}

impl std::error::Error for FramingError {}
impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

/// Errors returned by handlers, the response writer and the proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("status code {0} is not in the catalogue")]
    UnknownStatus(u16),

    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Free-form failure raised by application handlers.
    #[error("{0}")]
    Handler(String),
}

impl Error {
    #[inline]
    pub fn handler(message: impl Into<String>) -> Self {
        Error::Handler(message.into())
    }
}
