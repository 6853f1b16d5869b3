//! Path-routing reverse proxy.
//!
//! The proxy is an ordinary [`Handler`]: it looks the request-target up in a
//! static [`RouteTable`], re-serializes the framed request to the backend
//! over a fresh TCP connection and relays the backend reply body.
//!
//! # Relay format
//!
//! The backend reply is read line by line until the backend closes. The
//! first three lines are dropped and the rest are concatenated without
//! separators. This matches the wire shape of a response from this crate
//! carrying at most one header:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n          <- dropped
//! Content-Type: text/plain\r\n <- dropped (or the empty header block)
//! \r\n                         <- dropped
//! body\r\n                     <- relayed
//! ```
//!
//! The backend status code and headers are **not** relayed: the client sees
//! the proxy's own `200 OK` with the backend body.

use crate::{
    config::ProxyConfig,
    errors::Error,
    http::{request::Request, response::ResponseWriter, types::StatusCode},
    server::server_impl::{Handled, Handler},
};
use std::{io, net::SocketAddr};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
};

/// Lines of a backend reply that precede the relayed body.
const SKIPPED_REPLY_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub target: String,
    pub backend: SocketAddr,
}

/// Ordered, exact-match mapping from request-target to backend address.
///
/// Immutable once handed to a [`ReverseProxy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. The first route registered for a target wins.
    #[inline]
    pub fn route(mut self, target: impl Into<String>, backend: SocketAddr) -> Self {
        self.routes.push(Route {
            target: target.into(),
            backend,
        });
        self
    }

    /// Builds the table from the `[[proxy.routes]]` entries, in file order.
    pub fn from_config(config: &ProxyConfig) -> Self {
        config
            .routes
            .iter()
            .map(|route| (route.target.as_str(), route.backend))
            .collect()
    }

    /// Exact, case-sensitive match on the raw request-target.
    #[inline]
    pub fn lookup(&self, target: &str) -> Option<SocketAddr> {
        self.routes
            .iter()
            .find(|route| route.target == target)
            .map(|route| route.backend)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<T: Into<String>> FromIterator<(T, SocketAddr)> for RouteTable {
    fn from_iter<I: IntoIterator<Item = (T, SocketAddr)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(RouteTable::new(), |table, (target, backend)| {
                table.route(target, backend)
            })
    }
}

/// Forwards requests to backends selected by request-target.
///
/// # Examples
///
/// ```no_run
/// use bare_web::{bind, limits::ServerLimits, ReverseProxy, RouteTable, Server};
///
/// #[tokio::main]
/// async fn main() {
///     let routes = RouteTable::new()
///         .route("/a", "127.0.0.1:3000".parse().unwrap())
///         .route("/b", "127.0.0.1:4000".parse().unwrap());
///
///     Server::builder()
///         .listener(bind("0.0.0.0:6000".parse().unwrap(), &ServerLimits::default()).unwrap())
///         .handler(ReverseProxy::new(routes))
///         .build()
///         .launch()
///         .await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    routes: RouteTable,
}

impl ReverseProxy {
    #[inline]
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    #[inline]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

impl Handler for ReverseProxy {
    #[tracing::instrument(name = "proxy", skip_all, fields(target = req.target()))]
    async fn handle<W>(&self, resp: &mut ResponseWriter<'_, W>, req: &Request) -> Handled
    where
        W: AsyncWrite + Unpin + Send,
    {
        let Some(backend) = self.routes.lookup(req.target()) else {
            resp.status(StatusCode::NotFound);
            return Err(Error::PathNotFound(req.target().to_owned()));
        };

        let mut upstream = TcpStream::connect(backend).await.map_err(|err| {
            tracing::warn!(%backend, error = %err, "backend dial error");
            err
        })?;
        tracing::debug!(%backend, "forwarding");

        let relayed = forward(&mut upstream, req).await;
        if let Err(err) = upstream.shutdown().await {
            tracing::debug!(%backend, error = %err, "backend shutdown error");
        }
        drop(upstream);

        let body = relayed?;
        resp.write(body.as_bytes()).await?;
        Ok(())
    }
}

// Sends the whole request, then collects the reply body until the backend closes.
async fn forward<S>(upstream: &mut S, req: &Request) -> io::Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    upstream.write_all(&req.to_wire()).await?;
    upstream.flush().await?;

    let mut lines = BufReader::new(upstream).lines();
    let mut body = String::new();
    let mut seen = 0;

    while let Some(line) = lines.next_line().await? {
        if seen >= SKIPPED_REPLY_LINES {
            body.push_str(&line);
        }
        seen += 1;
    }

    Ok(body)
}

#[cfg(test)]
mod route_tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn exact_lookup() {
        let table = RouteTable::new()
            .route("/a", addr(3000))
            .route("/b", addr(4000))
            .route("/a", addr(9999));

        #[rustfmt::skip]
        let cases = [
            ("/a",   Some(addr(3000))),
            ("/b",   Some(addr(4000))),
            ("/A",   None),
            ("/a/",  None),
            ("/ab",  None),
            ("/a?x", None),
            ("",     None),
        ];

        for (target, expected) in cases {
            assert_eq!(table.lookup(target), expected, "{target:?}");
        }
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn from_pairs() {
        let table: RouteTable = [("/a", addr(3000)), ("/c", addr(5000))].into_iter().collect();

        let targets: Vec<_> = table.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, ["/a", "/c"]);
    }

    #[test]
    fn from_default_config() {
        let table = RouteTable::from_config(&ProxyConfig::default());

        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup("/a"), Some(addr(3000)));
        assert_eq!(table.lookup("/b"), Some(addr(4000)));
        assert_eq!(table.lookup("/c"), Some(addr(5000)));
        assert_eq!(table.lookup("/d"), None);
    }
}
