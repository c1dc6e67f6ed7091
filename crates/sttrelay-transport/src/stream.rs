use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// A connected blocking stream: implements Read + Write.
///
/// Used by command-line clients talking to a running relay.
pub struct RelayStream {
    inner: RelayStreamInner,
}

enum RelayStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl RelayStream {
    /// Connect to an endpoint (blocking).
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        let connect_err = |source| TransportError::Connect {
            endpoint: endpoint.to_string(),
            source,
        };

        let inner = match endpoint {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.trim_matches(['[', ']']), *port))
                    .map_err(connect_err)?;
                stream.set_nodelay(true).map_err(connect_err)?;
                RelayStreamInner::Tcp(stream)
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => RelayStreamInner::Unix(
                std::os::unix::net::UnixStream::connect(path).map_err(connect_err)?,
            ),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(connect_err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix sockets are not available on this platform",
                )))
            }
        };

        debug!(%endpoint, "connected");
        Ok(Self { inner })
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            RelayStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            RelayStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            RelayStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            RelayStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            RelayStreamInner::Tcp(stream) => RelayStreamInner::Tcp(stream.try_clone()?),
            #[cfg(unix)]
            RelayStreamInner::Unix(stream) => RelayStreamInner::Unix(stream.try_clone()?),
        };
        Ok(Self { inner })
    }
}

impl Read for RelayStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            RelayStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            RelayStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for RelayStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            RelayStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            RelayStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            RelayStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            RelayStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl std::fmt::Debug for RelayStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            RelayStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            RelayStreamInner::Unix(_) => "unix",
        };
        f.debug_struct("RelayStream").field("type", &kind).finish()
    }
}
