//! A non-blocking, address-reuse UDP endpoint (§4.5). Built directly on
//! `libc` rather than `std::net::UdpSocket::bind`, because `std` offers no
//! way to set `SO_REUSEADDR` before bind; the raw socket setup mirrors the
//! original's own `socket_init`.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::os::fd::FromRawFd;

use tracing::{instrument, trace};

use crate::error::IpcError;
use crate::resolve::resolve_udp_port;

/// How an [`Endpoint`] is bound (§10.3). The name/port choice is mutually
/// exclusive at call sites (`bind_name` vs. `bind_port`); this struct
/// exists so callers configuring an endpoint ahead of time have one plain
/// value to build and pass, rather than threading separate arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Symbolic service name to resolve via [`resolve_udp_port`]. Takes
    /// precedence over `port` when set.
    pub name: Option<String>,
    /// Port to bind directly, used when `name` is `None`.
    pub port: u16,
    /// Whether to set `SO_REUSEADDR` before binding. The spec's wire
    /// endpoints always want this; `false` exists for callers that need
    /// exclusive ownership of a port for testing.
    pub reuse_address: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { name: None, port: 0, reuse_address: true }
    }
}

impl EndpointConfig {
    pub fn for_name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn for_port(port: u16) -> Self {
        Self { port, ..Self::default() }
    }
}

pub struct Endpoint {
    socket: UdpSocket,
}

impl Endpoint {
    /// Binds to the port a symbolic service `name` resolves to (§4.5
    /// tiers 1–3), with address reuse enabled.
    #[instrument(skip(name), fields(name = %name))]
    pub fn bind_name(name: &str) -> Result<Self, IpcError> {
        let port = resolve_udp_port(name).ok_or_else(|| IpcError::NameLookupFailed(name.to_string()))?;
        Self::bind_port(port)
    }

    /// Binds directly to a port number, skipping name resolution, with
    /// address reuse enabled.
    #[instrument]
    pub fn bind_port(port: u16) -> Result<Self, IpcError> {
        Self::bind(&EndpointConfig::for_port(port))
    }

    /// Binds according to an explicit [`EndpointConfig`] (§10.3), resolving
    /// `config.name` when present and falling back to `config.port`.
    #[instrument(skip(config), fields(name = ?config.name, port = config.port, reuse_address = config.reuse_address))]
    pub fn bind(config: &EndpointConfig) -> Result<Self, IpcError> {
        let port = match &config.name {
            Some(name) => resolve_udp_port(name).ok_or_else(|| IpcError::NameLookupFailed(name.clone()))?,
            None => config.port,
        };
        let socket = new_nonblocking_socket(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port), config.reuse_address)?;
        tracing::info!(port, "endpoint bound");
        Ok(Self { socket })
    }

    /// Opens an ephemeral endpoint bound to port 0, for the blocking
    /// `request_reply` helper.
    pub fn ephemeral() -> Result<Self, IpcError> {
        Self::bind_port(0)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    #[instrument(skip(self, payload), fields(len = payload.len()))]
    pub fn send(&self, dst: SocketAddr, payload: &[u8]) -> Result<usize, IpcError> {
        let n = self.socket.send_to(payload, dst).map_err(IpcError::from)?;
        trace!(dst = %dst, bytes = n, "sent datagram");
        Ok(n)
    }

    /// Non-blocking read. Returns `Ok(None)` for `EWOULDBLOCK`.
    #[instrument(skip(self, buf), fields(cap = buf.len()))]
    pub fn recv(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, IpcError> {
        match self.socket.recv_from(buf) {
            Ok((n, src)) => {
                trace!(src = %src, bytes = n, "received datagram");
                Ok(Some((n, src)))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn raw(&self) -> &UdpSocket {
        &self.socket
    }
}

fn new_nonblocking_socket(bind_addr: SocketAddrV4, reuse_address: bool) -> io::Result<UdpSocket> {
    // SAFETY: each libc call below is checked for failure before the next
    // is made; the fd is closed on any error path and handed to
    // `UdpSocket::from_raw_fd` (which takes ownership) only on success.
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        if reuse_address {
            let reuse: libc::c_int = 1;
            let ret = libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                &reuse as *const _ as *const libc::c_void,
                std::mem::size_of_val(&reuse) as libc::socklen_t,
            );
            if ret != 0 {
                let err = io::Error::last_os_error();
                libc::close(fd);
                return Err(err);
            }
        }

        let mut sockaddr: libc::sockaddr_in = std::mem::zeroed();
        sockaddr.sin_family = libc::AF_INET as libc::sa_family_t;
        sockaddr.sin_port = bind_addr.port().to_be();
        sockaddr.sin_addr.s_addr = u32::from_ne_bytes(bind_addr.ip().octets());

        let ret = libc::bind(
            fd,
            &sockaddr as *const libc::sockaddr_in as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if ret != 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        let socket = UdpSocket::from_raw_fd(fd);
        socket.set_nonblocking(true)?;
        Ok(socket)
    }
}
