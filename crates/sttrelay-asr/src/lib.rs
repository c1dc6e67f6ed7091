//! Speech-to-text backend side of the relay.
//!
//! - [`audio`]: per-connection PCM accumulation and WAV wrapping
//! - [`staging`]: scoped temp-file staging of an utterance
//! - [`transcriber`]: the blocking backend trait
//! - [`elevenlabs`]: ElevenLabs Scribe over HTTP multipart
//! - [`catalog`]: the `info` advertised to clients

pub mod audio;
pub mod catalog;
pub mod elevenlabs;
pub mod error;
pub mod staging;
pub mod transcriber;

pub use audio::{to_wav_container, AudioAssembler, AudioFormat, Utterance};
pub use catalog::{describe_info, SUPPORTED_LANGUAGES};
pub use elevenlabs::{
    ElevenLabsConfig, ElevenLabsTranscriber, DEFAULT_API_URL, DEFAULT_MODEL_ID, DEFAULT_TIMEOUT,
};
pub use error::{AudioError, BackendError};
pub use staging::StagedWav;
pub use transcriber::{SharedTranscriber, Transcriber};
