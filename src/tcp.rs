//! The TCP listening socket
//!
//! IPv4 only: IPv6 is reserved but explicitly out of scope (see
//! `SPEC_FULL.md` §1), so this refuses to bind an `AF_INET6` socket rather
//! than silently dual-stacking like the teacher's listener does.

use std::net::{Ipv4Addr, SocketAddrV4, TcpListener as StdListener};

use async_std::net::TcpListener;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

/// Backlog of pending connections the OS queues once all connection slots
/// are occupied.
pub const LISTEN_BACKLOG: i32 = 5;

/// Bind a non-blocking IPv4 TCP listener on `port`, with `SO_REUSEADDR`
/// set and a fixed listen backlog.
pub fn bind(port: u16) -> std::io::Result<TcpListener> {
	let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
	socket.set_reuse_address(true)?;
	socket.set_nonblocking(true)?;
	socket.bind(&SockAddr::from(SocketAddrV4::new(
		Ipv4Addr::UNSPECIFIED,
		port,
	)))?;
	socket.listen(LISTEN_BACKLOG)?;

	Ok(TcpListener::from(StdListener::from(socket)))
}
