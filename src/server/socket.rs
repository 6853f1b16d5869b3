use crate::limits::ServerLimits;
use socket2::{Domain, Protocol, Socket, Type};
use std::{io, net::SocketAddr};
use tokio::net::TcpListener;

/// Binds a non-blocking IPv4 TCP listener with the given socket options.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// `InvalidInput` for an IPv6 address, otherwise any error from
/// `socket(2)`, `bind(2)` or `listen(2)`.
pub fn bind(addr: SocketAddr, limits: &ServerLimits) -> io::Result<TcpListener> {
    if !addr.is_ipv4() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("only IPv4 listeners are supported, got {addr}"),
        ));
    }

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(limits.reuse_address)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(limits.backlog)?;

    TcpListener::from_std(socket.into())
}
