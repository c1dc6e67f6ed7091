use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::audio::Utterance;
use crate::error::AudioError;

/// An utterance written to a temporary WAV file.
///
/// The file lives exactly as long as this value. Removal failures on drop
/// are logged and otherwise ignored.
#[derive(Debug)]
pub struct StagedWav {
    file: Option<NamedTempFile>,
}

impl StagedWav {
    /// Encode `utterance` into a fresh `sttrelay-*.wav` temp file.
    pub fn write(utterance: &Utterance) -> Result<Self, AudioError> {
        let mut file = tempfile::Builder::new()
            .prefix("sttrelay-")
            .suffix(".wav")
            .tempfile()?;
        utterance.write_wav(file.as_file_mut())?;
        file.as_file_mut().flush()?;
        debug!(path = %file.path().display(), bytes = utterance.pcm.len(), "staged utterance");
        Ok(Self { file: Some(file) })
    }

    pub fn path(&self) -> &Path {
        match &self.file {
            Some(file) => file.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for StagedWav {
    fn drop(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        let path = file.path().to_path_buf();
        if let Err(e) = file.close() {
            warn!(path = %path.display(), error = %e, "failed to remove staged WAV");
        }
    }
}
