//! bare_web - minimal HTTP/1.1 server and path-routing reverse proxy
//!
//! HTTP messages are framed directly on raw TCP byte streams: one read per
//! connection, one response, then the connection is closed. The framer
//! validates the request line, headers and body presence and answers
//! malformed input with a status-coded error response without ever
//! invoking the application handler.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1** only, `GET` and `POST` only
//! - One request per connection (no keep-alive, no pipelining)
//! - Bodies are accepted only with a `Content-Length` header, whose value
//!   is never checked against the body
//!
//! # Examples
//!
//! Quick start:
//! ```no_run
//! use bare_web::{bind, limits::ServerLimits, Handled, Handler, Request, ResponseWriter, Server};
//! use tokio::io::AsyncWrite;
//!
//! struct MyHandler;
//!
//! impl Handler for MyHandler {
//!     async fn handle<W>(&self, resp: &mut ResponseWriter<'_, W>, _: &Request) -> Handled
//!     where
//!         W: AsyncWrite + Unpin + Send,
//!     {
//!         resp.write(b"Hello World!").await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     Server::builder()
//!         .listener(bind("127.0.0.1:8080".parse().unwrap(), &ServerLimits::default()).unwrap())
//!         .handler(MyHandler)
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```
//! Reverse proxy routing `/a` and `/b` to two local backends:
//! ```no_run
//! use bare_web::{bind, limits::ServerLimits, ReverseProxy, RouteTable, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let routes = RouteTable::new()
//!         .route("/a", "127.0.0.1:3000".parse().unwrap())
//!         .route("/b", "127.0.0.1:4000".parse().unwrap());
//!
//!     Server::builder()
//!         .listener(bind("0.0.0.0:6000".parse().unwrap(), &ServerLimits::default()).unwrap())
//!         .handler(ReverseProxy::new(routes))
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```
//!
//! # Framing errors
//!
//! | Condition                               | Status |
//! |-----------------------------------------|--------|
//! | not UTF-8, fewer than two lines         | 400    |
//! | request line not three tokens           | 400    |
//! | method other than `GET`/`POST`          | 501    |
//! | bad version syntax or not `HTTP/1.1`    | 400    |
//! | whitespace in a header name             | 400    |
//! | body without `Content-Length`           | 411    |

pub(crate) mod http {
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
    pub(crate) mod socket;
}
pub mod config;
pub(crate) mod errors;
pub mod limits;
pub(crate) mod proxy;

pub use crate::{
    config::{Config, ConfigError},
    errors::{Error, FramingError},
    http::{
        request::Request,
        response::{Response, ResponseWriter},
        types::{Header, Headers, Method, RequestLine, StatusCode, StatusLine, Version},
    },
    proxy::{ReverseProxy, Route, RouteTable},
    server::{
        server_impl::{Handled, Handler, Server, ServerBuilder},
        socket::bind,
    },
};

#[doc(hidden)]
#[macro_export]
macro_rules! impt_default_handler {
    ($name:ident) => {
        use bare_web::{Handled, Handler, Request, ResponseWriter};
        use tokio::io::AsyncWrite;
        struct $name;

        impl Handler for $name {
            async fn handle<W>(&self, resp: &mut ResponseWriter<'_, W>, _: &Request) -> Handled
            where
                W: AsyncWrite + Unpin + Send,
            {
                resp.write(b"Hello world!").await?;
                Ok(())
            }
        }
    };
}
