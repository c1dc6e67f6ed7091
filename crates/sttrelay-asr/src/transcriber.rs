use std::sync::Arc;

use crate::audio::Utterance;
use crate::error::BackendError;

/// A blocking speech-to-text backend.
///
/// Implementations may block for the length of a network round trip; async
/// callers must run them on a blocking thread.
pub trait Transcriber: Send + Sync {
    /// Recognize `utterance` spoken in `language` (a short code like `de`).
    fn transcribe(&self, utterance: &Utterance, language: &str) -> Result<String, BackendError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

pub type SharedTranscriber = Arc<dyn Transcriber>;
