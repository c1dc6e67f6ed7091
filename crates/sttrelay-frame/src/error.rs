/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header does not start with `wyoming`.
    #[error("invalid frame magic (expected \"wyoming\")")]
    InvalidMagic,

    /// The header carries a protocol version other than 1.
    #[error("unsupported protocol version {0} (expected 1)")]
    UnsupportedVersion(u8),

    /// The JSON body is not valid UTF-8 JSON.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The JSON body is valid but not a top-level object.
    #[error("JSON body is not an object")]
    NotAnObject,

    /// The JSON body has no string `type` field.
    #[error("event has no string \"type\" field")]
    MissingType,

    /// A known event type carries data of the wrong shape.
    #[error("invalid data for {event_type:?} event: {reason}")]
    InvalidData { event_type: String, reason: String },

    /// A frame section exceeds the configured maximum size.
    #[error("{section} too large ({size} bytes, max {max})")]
    PayloadTooLarge {
        section: &'static str,
        size: usize,
        max: usize,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the peer went away rather than sending something malformed.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::ConnectionClosed => true,
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// True for malformed input that must close the connection.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
