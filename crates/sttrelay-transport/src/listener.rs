use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// An accepted async connection.
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

/// Accepts connections on a bound endpoint.
#[derive(Debug)]
pub struct Listener {
    inner: ListenerInner,
}

#[derive(Debug)]
enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: tokio::net::UnixListener,
        guard: crate::uds::SocketFileGuard,
    },
}

impl Listener {
    /// Bind to an endpoint. Must be called from within a tokio runtime.
    pub async fn bind(endpoint: &Endpoint) -> Result<Self> {
        let bind_err = |source| TransportError::Bind {
            endpoint: endpoint.to_string(),
            source,
        };

        let inner = match endpoint {
            Endpoint::Tcp { host, port } => {
                let listener = TcpListener::bind((host.trim_matches(['[', ']']), *port))
                    .await
                    .map_err(bind_err)?;
                ListenerInner::Tcp(listener)
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                crate::uds::prepare_socket_path(path)?;
                let listener = tokio::net::UnixListener::bind(path).map_err(bind_err)?;
                let guard =
                    crate::uds::SocketFileGuard::new(path, crate::uds::DEFAULT_SOCKET_MODE)?;
                ListenerInner::Unix { listener, guard }
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(bind_err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix sockets are not available on this platform",
                )))
            }
        };

        let listener = Self { inner };
        info!(endpoint = %listener.local_endpoint()?, "listening");
        Ok(listener)
    }

    /// Accept the next connection, returning it with a printable peer label.
    pub async fn accept(&self) -> Result<(Connection, String)> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, addr) = listener.accept().await.map_err(TransportError::Accept)?;
                if let Err(err) = stream.set_nodelay(true) {
                    tracing::debug!(error = %err, "failed to set TCP_NODELAY");
                }
                Ok((Connection::Tcp(stream), addr.to_string()))
            }
            #[cfg(unix)]
            ListenerInner::Unix { listener, guard } => {
                let (stream, _addr) = listener.accept().await.map_err(TransportError::Accept)?;
                Ok((
                    Connection::Unix(stream),
                    format!("unix:{}", guard.path().display()),
                ))
            }
        }
    }

    /// The actual bound endpoint (resolves port 0 for TCP).
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let addr = listener.local_addr()?;
                Ok(tcp_endpoint(addr))
            }
            #[cfg(unix)]
            ListenerInner::Unix { guard, .. } => Ok(Endpoint::unix(guard.path())),
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

fn tcp_endpoint(addr: std::net::SocketAddr) -> Endpoint {
    let host = match addr.ip() {
        std::net::IpAddr::V6(ip) => format!("[{ip}]"),
        ip => ip.to_string(),
    };
    Endpoint::tcp(host, addr.port())
}
