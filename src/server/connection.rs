use crate::{
    http::{
        request::Parser,
        response::{write_flush, ResponseWriter},
        types::StatusCode,
    },
    limits::ConnLimits,
    server::server_impl::Handler,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Lifecycle of one accepted connection:
/// `Accepted -> Read -> Framed -> Dispatched -> Written -> Closed`.
///
/// Exactly one request is served per connection; the stream is shut down
/// and dropped on every path out of [`run`](HttpConnection::run).
pub(crate) struct HttpConnection<H: Handler> {
    handler: Arc<H>,
    conn_limits: ConnLimits,
}

impl<H: Handler> Clone for HttpConnection<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            conn_limits: self.conn_limits.clone(),
        }
    }
}

impl<H: Handler> HttpConnection<H> {
    #[inline]
    pub(crate) fn new(handler: Arc<H>, conn_limits: ConnLimits) -> Self {
        Self {
            handler,
            conn_limits,
        }
    }

    #[tracing::instrument(name = "connection", skip_all, fields(peer = %peer))]
    pub(crate) async fn run<S>(&self, mut stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        tracing::info!("serving");

        self.exchange(&mut stream).await;

        if let Err(err) = stream.shutdown().await {
            tracing::debug!(error = %err, "connection shutdown error");
        }
    }

    async fn exchange<S>(&self, stream: &mut S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        // Read
        let mut parser = Parser::new(&self.conn_limits);
        match parser.fill_buffer(stream).await {
            Ok(0) => tracing::debug!("peer sent nothing before EOF"),
            Ok(_) => tracing::trace!(bytes = parser.len(), "read request"),
            Err(err) => {
                tracing::warn!(error = %err, "connection read error");
                return;
            }
        }

        // Framed
        let request = match parser.frame() {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(
                    status = err.status.as_u16(),
                    message = %err.message,
                    "framing error"
                );

                if let Err(err) = write_flush(stream, &err.into_response().to_wire()).await {
                    tracing::error!(error = %err, "connection write error");
                }
                return;
            }
        };
        tracing::debug!(
            method = %request.method(),
            target = request.target(),
            "framed request"
        );

        // Dispatched
        let mut resp = ResponseWriter::new(stream);
        if let Err(err) = self.handler.handle(&mut resp, &request).await {
            tracing::debug!(error = %err, "handler error");

            if resp.status_code().is_none() {
                resp.status(StatusCode::BadRequest);
            }
            // The writer logs its own transport failures
            let _ = resp.write(err.to_string().as_bytes()).await;
        }
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;
    use crate::{errors::Error, http::request::Request, server::server_impl::Handled};
    use std::{
        io,
        pin::Pin,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Mutex,
        },
        task::{Context, Poll},
    };
    use tokio::io::{duplex, AsyncReadExt, ReadBuf};

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    /// Echoes the target and body, counting invocations.
    #[derive(Default)]
    struct Echo {
        calls: Arc<AtomicUsize>,
    }

    impl Handler for Echo {
        async fn handle<W>(&self, resp: &mut ResponseWriter<'_, W>, req: &Request) -> Handled
        where
            W: AsyncWrite + Unpin + Send,
        {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let body = format!("{} {}", req.target(), req.body().unwrap_or("-"));
            resp.status(StatusCode::Ok).write(body.as_bytes()).await?;
            Ok(())
        }
    }

    /// Always fails, optionally after setting a status.
    struct Failing(Option<StatusCode>);

    impl Handler for Failing {
        async fn handle<W>(&self, resp: &mut ResponseWriter<'_, W>, _: &Request) -> Handled
        where
            W: AsyncWrite + Unpin + Send,
        {
            if let Some(status) = self.0 {
                resp.status(status);
            }
            Err(Error::handler("boom"))
        }
    }

    async fn exchange<H: Handler>(handler: H, input: &[u8]) -> String {
        let connection = HttpConnection::new(Arc::new(handler), ConnLimits::default());
        let (mut client, server) = duplex(16 * 1024);

        client.write_all(input).await.unwrap();
        connection.run(server, peer()).await;

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn serves_framed_request() {
        let handler = Echo::default();
        let calls = handler.calls.clone();

        let out = exchange(
            handler,
            b"POST /items HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc",
        )
        .await;

        assert_eq!(out, "HTTP/1.1 200 OK\r\n\r\n\r\n/items abc\r\n");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn framing_error_skips_handler() {
        #[rustfmt::skip]
        let cases: [(&[u8], &str); 4] = [
            (
                b"PUT / HTTP/1.1\r\n\r\n",
                "HTTP/1.1 501 Not Implemented\r\n\r\n\r\nmethod not implemented: PUT\r\n",
            ),
            (
                b"GET / HTTP/2.0\r\n\r\n",
                "HTTP/1.1 400 Bad Request\r\n\r\n\r\nHTTP version unsupported\r\n",
            ),
            (
                b"POST / HTTP/1.1\r\nA: 1\r\n\r\nbody",
                "HTTP/1.1 411 Length Required\r\n\r\n\r\nmissing Content-Length header\r\n",
            ),
            (
                b"hello",
                "HTTP/1.1 400 Bad Request\r\n\r\n\r\nrequest is not an HTTP message\r\n",
            ),
        ];

        for (input, expected) in cases {
            let handler = Echo::default();
            let calls = handler.calls.clone();

            assert_eq!(exchange(handler, input).await, expected);
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn handler_error_defaults_to_400() {
        let out = exchange(Failing(None), b"GET / HTTP/1.1\r\n\r\n").await;
        assert_eq!(out, "HTTP/1.1 400 Bad Request\r\n\r\n\r\nboom\r\n");
    }

    #[tokio::test]
    async fn handler_error_keeps_status() {
        let out = exchange(Failing(Some(StatusCode::NotFound)), b"GET / HTTP/1.1\r\n\r\n").await;
        assert_eq!(out, "HTTP/1.1 404 Not Found\r\n\r\n\r\nboom\r\n");
    }

    #[tokio::test]
    async fn eof_is_answered_with_400() {
        let handler = Echo::default();
        let calls = handler.calls.clone();
        let connection = HttpConnection::new(Arc::new(handler), ConnLimits::default());
        let (mut client, server) = duplex(1024);

        client.shutdown().await.unwrap();
        connection.run(server, peer()).await;

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Read always fails; writes and shutdown are recorded.
    #[derive(Default)]
    struct BrokenRead {
        written: Arc<Mutex<Vec<u8>>>,
        closed: Arc<AtomicBool>,
    }

    impl AsyncRead for BrokenRead {
        fn poll_read(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    impl AsyncWrite for BrokenRead {
        fn poll_write(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.closed.store(true, Ordering::SeqCst);
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn read_error_closes_silently() {
        let handler = Echo::default();
        let calls = handler.calls.clone();
        let connection = HttpConnection::new(Arc::new(handler), ConnLimits::default());

        let stream = BrokenRead::default();
        let (written, closed) = (stream.written.clone(), stream.closed.clone());

        connection.run(stream, peer()).await;

        assert!(written.lock().unwrap().is_empty());
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
