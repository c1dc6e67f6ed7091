//! Wyoming speech-to-text relay backed by ElevenLabs Scribe.
//!
//! Home Assistant (or any Wyoming client) streams PCM audio to the relay; the
//! relay wraps each utterance in a WAV file, sends it to the ElevenLabs API
//! and answers with the transcript.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP and Unix socket endpoints
//! - [`frame`]: Wyoming framing and typed messages
//! - [`asr`]: utterance assembly and the transcription backend
//! - [`server`]: per-connection state machine and accept loop

/// Re-export transport types.
pub mod transport {
    pub use sttrelay_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sttrelay_frame::*;
}

/// Re-export backend types.
pub mod asr {
    pub use sttrelay_asr::*;
}

/// Re-export server types.
pub mod server {
    pub use sttrelay_server::*;
}
