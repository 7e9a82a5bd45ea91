use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::os::fd::AsRawFd;
use std::sync::Arc;

use crate::error::Result;
use crate::net::tcp::TcpStream;
use crate::reactor::readiness::Readable;
use crate::reactor::{Reactor, Source};
use crate::runtime::context;

/// An asynchronous TCP listener.
///
/// The listening socket is switched to non-blocking mode and registered
/// with the reactor of the current runtime; [`accept`](Self::accept)
/// parks the task in the socket's read slot whenever the backlog is
/// empty.
///
/// # Panics
///
/// [`bind`](Self::bind) panics if called outside of a running runtime.
pub struct TcpListener {
    inner: std::net::TcpListener,
    source: Arc<Source>,
    reactor: Arc<Reactor>,
}

impl TcpListener {
    /// Binds to `addr` and registers the socket with the reactor.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let inner = std::net::TcpListener::bind(addr)?;
        inner.set_nonblocking(true)?;

        let reactor = context::current().reactor;
        let source = reactor.insert_io(inner.as_raw_fd())?;

        Ok(Self {
            inner,
            source,
            reactor,
        })
    }

    /// Accepts one connection, suspending until a peer arrives.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        loop {
            match self.inner.accept() {
                Ok((stream, addr)) => {
                    let stream = TcpStream::from_std(stream)?;
                    return Ok((stream, addr));
                }

                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    Readable::new(&self.reactor, &self.source).await?;
                }

                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}

                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }
}

impl Drop for TcpListener {
    fn drop(&mut self) {
        let _ = self.reactor.remove_io(&self.source);
    }
}
