use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tracing::info;

/// Binds a blocking listening socket on `addr` with the given accept backlog.
pub fn bind(addr: &str, backlog: i32) -> Result<TcpListener> {
    let address = addr
        .to_socket_addrs()
        .with_context(|| format!("resolving {addr}"))?
        .next()
        .with_context(|| format!("{addr} did not resolve to an address"))?;

    let listener = bind_socket(address, backlog).with_context(|| format!("binding {address}"))?;
    info!(addr = %listener.local_addr()?, backlog, "Listening");
    Ok(listener)
}

fn bind_socket(address: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&address.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}

/// Shuts the listening socket down so that blocked `accept` calls return.
pub fn close(listener: &TcpListener) -> io::Result<()> {
    SockRef::from(listener).shutdown(std::net::Shutdown::Both)
}
