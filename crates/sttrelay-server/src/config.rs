use sttrelay_asr::{describe_info, DEFAULT_MODEL_ID};
use sttrelay_frame::{FrameConfig, Info};

/// Language used when the client does not pick one.
pub const DEFAULT_LANGUAGE: &str = "de";

/// Immutable settings shared by every connection.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Language for an utterance without a preceding `transcribe`. Restored
    /// after every finished utterance.
    pub default_language: String,
    /// Answer to `describe`.
    pub info: Info,
    /// Frame size limits.
    pub frame: FrameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::for_model(DEFAULT_MODEL_ID)
    }
}

impl ServerConfig {
    /// Config advertising the given backend model id.
    pub fn for_model(model_id: &str) -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            info: describe_info(model_id),
            frame: FrameConfig::default(),
        }
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend() {
        let config = ServerConfig::default();
        assert_eq!(config.default_language, "de");
        assert_eq!(config.info.asr[0].models[0].id, "scribe_v1");
    }

    #[test]
    fn builder_overrides() {
        let config = ServerConfig::for_model("scribe_v2").with_default_language("en");
        assert_eq!(config.default_language, "en");
        assert_eq!(config.info.asr[0].models[0].id, "scribe_v2");
    }
}
