use crate::{
    errors::Error,
    http::{request::Request, response::ResponseWriter},
    limits::ConnLimits,
    server::connection::HttpConnection,
};
use std::{future::Future, sync::Arc};
use tokio::{io::AsyncWrite, net::TcpListener};

/// Outcome of [`Handler::handle`].
///
/// On `Err`, the server writes the error text as the response body. The
/// status is `400 Bad Request` unless the handler already set one.
pub type Handled = Result<(), Error>;

/// A trait for handling framed HTTP requests.
///
/// This is the single extension point of the server: the framer and the
/// connection lifecycle stay the same whatever the handler does. The
/// reverse proxy is itself a handler ([`ReverseProxy`](crate::ReverseProxy)).
///
/// # Examples
///
/// ```
/// use bare_web::{Error, Handled, Handler, Request, ResponseWriter, StatusCode};
/// use tokio::io::AsyncWrite;
///
/// struct MyHandler;
///
/// impl Handler for MyHandler {
///     async fn handle<W>(&self, resp: &mut ResponseWriter<'_, W>, req: &Request) -> Handled
///     where
///         W: AsyncWrite + Unpin + Send,
///     {
///         if req.target() != "/echo" {
///             resp.status(StatusCode::NotFound);
///             return Err(Error::handler("nothing here"));
///         }
///
///         resp.status(StatusCode::Ok)
///             .write(req.body().unwrap_or_default().as_bytes())
///             .await?;
///         Ok(())
///     }
/// }
/// ```
pub trait Handler
where
    Self: Sync + Send + 'static,
{
    /// Processes a framed request and writes the response.
    ///
    /// # Parameters
    ///
    /// - `resp`: writer bound to the client connection
    /// - `req`: the framed request
    ///
    /// # Errors
    ///
    /// Returning `Err` makes the server send the error text back to the
    /// client (see [`Handled`]).
    fn handle<W>(
        &self,
        resp: &mut ResponseWriter<'_, W>,
        req: &Request,
    ) -> impl Future<Output = Handled> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

/// An HTTP server accepting connections on one listener.
///
/// Every accepted connection gets its own task. Tasks share nothing but the
/// read-only handler.
///
/// # Examples
///
/// ```no_run
/// # bare_web::impt_default_handler!{ MyHandler }
/// use bare_web::{bind, limits::ServerLimits, Server};
///
/// #[tokio::main]
/// async fn main() {
///     let listener = bind("127.0.0.1:8080".parse().unwrap(), &ServerLimits::default()).unwrap();
///
///     Server::builder()
///         .listener(listener)
///         .handler(MyHandler)
///         .build()
///         .launch()
///         .await
/// }
/// ```
pub struct Server<H: Handler> {
    listener: TcpListener,
    connection: HttpConnection<H>,
}

impl<H: Handler> Server<H> {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder<H> {
        ServerBuilder {
            listener: None,
            handler: None,
            connection_limits: None,
        }
    }

    /// Starts accepting connections. Never returns.
    ///
    /// A failed `accept` is logged and the loop goes on; the loop never
    /// waits on a connection.
    pub async fn launch(self) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "listening");
        }

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(error = %err, "listener accept error");
                    continue;
                }
            };

            let connection = self.connection.clone();
            tokio::spawn(async move {
                connection.run(stream, peer).await;
            });
        }
    }
}

//

/// Builder for configuring and creating [`Server`] instances.
pub struct ServerBuilder<H: Handler> {
    listener: Option<TcpListener>,
    handler: Option<H>,
    connection_limits: Option<ConnLimits>,
}

impl<H: Handler> ServerBuilder<H> {
    /// Sets the TCP listener that the server will use to accept connections.
    ///
    /// **This is a required component.** See [`bind`](crate::bind) for an
    /// IPv4 listener with the configured socket options.
    #[inline]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the handler invoked for every framed request.
    ///
    /// **This is a required component.**
    #[inline]
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Configures per-connection limits.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # bare_web::impt_default_handler!{ MyHandler }
    /// # #[tokio::main]
    /// # async fn main() {
    /// use bare_web::{limits::ConnLimits, Server};
    /// use tokio::net::TcpListener;
    ///
    /// let server = Server::builder()
    ///     .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
    ///     .handler(MyHandler)
    ///     .connection_limits(ConnLimits {
    ///         read_buffer_size: 16 * 1024,
    ///         ..ConnLimits::default() // Required line
    ///     })
    ///     .build();
    /// # }
    /// ```
    #[inline]
    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = Some(limits);
        self
    }

    /// Builds the server.
    ///
    /// # Panics
    ///
    /// If [`listener`](Self::listener) or [`handler`](Self::handler) was
    /// never called.
    #[track_caller]
    pub fn build(self) -> Server<H> {
        let listener = self
            .listener
            .expect("The `listener` method must be called to create");
        let handler = self
            .handler
            .expect("The `handler` method must be called to create");

        Server {
            listener,
            connection: HttpConnection::new(
                Arc::new(handler),
                self.connection_limits.unwrap_or_default(),
            ),
        }
    }
}
