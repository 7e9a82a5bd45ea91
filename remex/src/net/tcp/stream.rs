use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
use std::os::fd::AsRawFd;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::reactor::readiness::{Readable, Writable};
use crate::reactor::{Reactor, Source};
use crate::runtime::context;
use crate::runtime::executor::spawn_blocking;

/// An asynchronous TCP stream.
///
/// The socket is non-blocking and registered with the reactor. Every
/// operation first tries the syscall; on `WouldBlock` the task parks in
/// the matching readiness slot and retries once the reactor wakes it.
/// `EINTR` retries immediately.
///
/// At most one task may wait for each direction at a time; a second
/// concurrent reader (or writer) observes [`Error::Busy`].
pub struct TcpStream {
    inner: std::net::TcpStream,
    source: Arc<Source>,
    reactor: Arc<Reactor>,
}

impl TcpStream {
    /// Connects to `addr`.
    ///
    /// Address resolution and the connect itself run on the blocking
    /// pool, so the reactor keeps turning while the handshake is in
    /// flight; the established socket is then registered non-blocking.
    pub async fn connect<A>(addr: A) -> Result<Self>
    where
        A: ToSocketAddrs + Send + 'static,
    {
        let stream = spawn_blocking(move || std::net::TcpStream::connect(addr)).await?;
        Self::from_std(stream)
    }

    /// Registers an already connected socket with the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a running runtime.
    pub fn from_std(stream: std::net::TcpStream) -> Result<Self> {
        stream.set_nonblocking(true)?;

        let reactor = context::current().reactor;
        let source = reactor.insert_io(stream.as_raw_fd())?;

        Ok(Self {
            inner: stream,
            source,
            reactor,
        })
    }

    /// Reads into `buf`, suspending until the socket is readable.
    ///
    /// Resolves to the number of bytes read; `0` means the peer closed
    /// its half of the connection.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match (&self.inner).read(buf) {
                Ok(n) => return Ok(n),

                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    Readable::new(&self.reactor, &self.source).await?;
                }

                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}

                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Writes from `buf`, suspending until the socket is writable.
    /// Resolves to the number of bytes written, which may be short.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        loop {
            match (&self.inner).write(buf) {
                Ok(n) => return Ok(n),

                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    Writable::new(&self.reactor, &self.source).await?;
                }

                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}

                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Writes the whole buffer.
    ///
    /// # Errors
    ///
    /// Returns `WriteZero` if a write makes no progress.
    pub async fn write_all(&self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            let n = self.write(buf).await?;

            if n == 0 {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "write returned zero bytes",
                )));
            }

            buf = &buf[n..];
        }

        Ok(())
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.peer_addr()?)
    }

    /// Shuts down the read, write, or both halves of the connection.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        Ok(self.inner.shutdown(how)?)
    }
}

impl Drop for TcpStream {
    fn drop(&mut self) {
        let _ = self.reactor.remove_io(&self.source);
    }
}
