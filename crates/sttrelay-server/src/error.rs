/// Errors that end a connection or stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding or accepting failed.
    #[error("transport error: {0}")]
    Transport(#[from] sttrelay_transport::TransportError),

    /// The client sent something that is not a valid frame, or the
    /// connection failed in a way other than a plain disconnect.
    #[error("frame error: {0}")]
    Frame(#[from] sttrelay_frame::FrameError),
}

impl ServerError {
    /// True when the client broke the protocol.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Frame(err) if err.is_protocol_error())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
