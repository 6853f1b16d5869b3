//! Listener and connection limits
//!
//! # Memory Consumption
//!
//! Each active connection owns exactly one zeroed read buffer of
//! [`ConnLimits::read_buffer_size`] bytes plus the response it builds.
//! Nothing is pooled or shared between connections.
//!
//! # Examples
//!
//! ```no_run
//! # bare_web::impt_default_handler!{MyHandler}
//! use bare_web::{Server, limits::{ConnLimits, ServerLimits}};
//!
//! #[tokio::main]
//! async fn main() {
//!     let limits = ServerLimits {
//!         backlog: 2048,
//!         ..ServerLimits::default()
//!     };
//!
//!     Server::builder()
//!         .listener(bare_web::bind("127.0.0.1:8080".parse().unwrap(), &limits).unwrap())
//!         .handler(MyHandler)
//!         .connection_limits(ConnLimits {
//!             read_buffer_size: 8 * 1024,
//!             ..ConnLimits::default()
//!         })
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

use serde::Deserialize;

/// Socket options applied when binding a listener with [`bind`](crate::bind).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerLimits {
    /// Length of the pending-connection queue passed to `listen(2)` (default: `1024`).
    pub backlog: i32,

    /// Sets `SO_REUSEADDR` before binding (default: `true`).
    ///
    /// Lets a restarted process rebind a port whose previous connections
    /// are still in `TIME_WAIT`.
    pub reuse_address: bool,

    #[doc(hidden)]
    #[allow(dead_code)]
    #[serde(skip)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            backlog: 1024,
            reuse_address: true,

            _priv: (),
        }
    }
}

/// Per-connection limits.
///
/// # Single read
///
/// A connection performs exactly one read of at most `read_buffer_size`
/// bytes. Anything the client sends beyond that is never seen, and a
/// request split across several TCP segments is framed from the first
/// segment only.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnLimits {
    /// Size of the zeroed buffer the request is read into (default: `4096`).
    pub read_buffer_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    #[serde(skip)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline]
    fn default() -> Self {
        Self {
            read_buffer_size: 4096,

            _priv: (),
        }
    }
}
