use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Default Wyoming ASR port.
pub const DEFAULT_PORT: u16 = 10200;

/// A listen or connect address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `tcp://host:port`
    Tcp { host: String, port: u16 },
    /// `unix:///path/to/socket`
    Unix(PathBuf),
}

impl Endpoint {
    /// Build a TCP endpoint from a host and port.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Build a Unix socket endpoint.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix(path.into())
    }

    /// `host:port` string suitable for `ToSocketAddrs`; `None` for Unix endpoints.
    pub fn socket_addr(&self) -> Option<String> {
        match self {
            Self::Tcp { host, port } => Some(format!("{host}:{port}")),
            Self::Unix(_) => None,
        }
    }

    /// Short transport name for diagnostics.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp { .. } => "tcp",
            Self::Unix(_) => "unix",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| invalid("expected scheme://address"))?;

        match scheme {
            "tcp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("expected host:port"))?;
                if host.is_empty() {
                    return Err(invalid("host must not be empty"));
                }
                let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
                Ok(Self::tcp(host, port))
            }
            "unix" => {
                if rest.is_empty() {
                    return Err(invalid("socket path must not be empty"));
                }
                Ok(Self::unix(rest))
            }
            other => Err(invalid(&format!("unsupported scheme {other:?}"))),
        }
    }
}
