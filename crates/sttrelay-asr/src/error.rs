/// Errors raised while assembling or encoding audio.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Sample width (bytes per sample) outside 1..=4.
    #[error("unsupported sample width {0} bytes (expected 1-4)")]
    UnsupportedWidth(u16),

    /// Zero channels or a zero sample rate.
    #[error("invalid audio format: {0}")]
    InvalidFormat(String),

    /// The WAV encoder failed.
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    /// Staging the WAV file failed.
    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the transcription backend.
///
/// The relay turns every one of these into an empty transcript; they exist so
/// the cause can be logged.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The utterance could not be turned into a WAV upload.
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Network failure, timeout, or an unreadable response body.
    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("transcription backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response JSON has no `text` field.
    #[error("transcription response has no \"text\" field")]
    MissingText,

    /// The backend worker did not produce a result.
    #[error("transcription worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;
