use sttrelay_frame::{AsrModel, AsrProgram, Attribution, Info};

/// Languages the ElevenLabs Scribe model is advertised with.
pub const SUPPORTED_LANGUAGES: &[&str] = &["de", "en", "es", "fr", "it", "ja", "pt", "nl"];

pub const PROGRAM_NAME: &str = "elevenlabs_wyoming";
pub const ATTRIBUTION_NAME: &str = "ElevenLabs Scribe";
pub const ATTRIBUTION_URL: &str = "https://elevenlabs.io/speech-to-text";

/// The `info` answered to every `describe`.
pub fn describe_info(model_id: &str) -> Info {
    Info {
        asr: vec![AsrProgram {
            name: PROGRAM_NAME.to_string(),
            attribution: Some(Attribution {
                name: ATTRIBUTION_NAME.to_string(),
                url: ATTRIBUTION_URL.to_string(),
            }),
            models: vec![AsrModel {
                id: model_id.to_string(),
                name: ATTRIBUTION_NAME.to_string(),
                languages: SUPPORTED_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            }],
        }],
    }
}
