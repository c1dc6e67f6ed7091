use std::fmt;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::audio::Utterance;
use crate::error::{AudioError, BackendError, Result};
use crate::staging::StagedWav;
use crate::transcriber::Transcriber;

pub const DEFAULT_API_URL: &str = "https://api.elevenlabs.io/v1/speech-to-text";
pub const DEFAULT_MODEL_ID: &str = "scribe_v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const API_KEY_HEADER: &str = "xi-api-key";
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for the ElevenLabs speech-to-text API.
#[derive(Clone)]
pub struct ElevenLabsConfig {
    pub api_url: String,
    pub api_key: String,
    pub model_id: String,
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SpeechToTextResponse {
    text: Option<String>,
}

/// Transcribes utterances with ElevenLabs Scribe.
///
/// Uses the blocking `reqwest` client: construct, call and drop it outside
/// any async runtime context.
#[derive(Debug)]
pub struct ElevenLabsTranscriber {
    client: Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsTranscriber {
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }
}

impl Transcriber for ElevenLabsTranscriber {
    fn transcribe(&self, utterance: &Utterance, language: &str) -> Result<String> {
        let staged = StagedWav::write(utterance)?;
        let file = Part::file(staged.path())
            .map_err(AudioError::from)?
            .mime_str("audio/wav")?;
        let form = Form::new()
            .part("file", file)
            .text("model_id", self.config.model_id.clone())
            .text("language_code", language.to_string());

        debug!(
            url = %self.config.api_url,
            model_id = %self.config.model_id,
            language,
            bytes = utterance.pcm.len(),
            "sending utterance to ElevenLabs"
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .multipart(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let parsed: SpeechToTextResponse = response.json()?;
        parsed.text.ok_or(BackendError::MissingText)
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn body_has(needle: &'static [u8]) -> impl Fn(&Request) -> bool + Send + Sync {
        move |request: &Request| request.body.windows(needle.len()).any(|w| w == needle)
    }

    fn utterance() -> Utterance {
        Utterance::new(vec![0u8; 3200], AudioFormat::default())
    }

    fn config_for(server: &MockServer) -> ElevenLabsConfig {
        ElevenLabsConfig {
            api_url: format!("{}/v1/speech-to-text", server.uri()),
            api_key: "test-key".to_string(),
            timeout: Some(Duration::from_secs(5)),
            ..ElevenLabsConfig::default()
        }
    }

    /// The blocking client must not run on an async worker thread.
    async fn run_blocking(config: ElevenLabsConfig, language: &'static str) -> Result<String> {
        tokio::task::spawn_blocking(move || {
            let transcriber = ElevenLabsTranscriber::new(config)?;
            transcriber.transcribe(&utterance(), language)
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn posts_multipart_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/speech-to-text"))
            .and(header("xi-api-key", "test-key"))
            .and(body_has(b"name=\"model_id\""))
            .and(body_has(b"scribe_v1"))
            .and(body_has(b"name=\"language_code\""))
            .and(body_has(b"name=\"file\""))
            .and(body_has(b"audio/wav"))
            .and(body_has(b"RIFF"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "language_code": "en",
                "text": "hello world"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = run_blocking(config_for(&server), "en").await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = run_blocking(config_for(&server), "de").await.unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_text_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "words": [] })),
            )
            .mount(&server)
            .await;

        let err = run_blocking(config_for(&server), "de").await.unwrap_err();
        assert!(matches!(err, BackendError::MissingText));
    }

    #[test]
    fn unreachable_backend_is_an_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transcriber = ElevenLabsTranscriber::new(ElevenLabsConfig {
            api_url: format!("http://127.0.0.1:{port}/v1/speech-to-text"),
            timeout: Some(Duration::from_secs(5)),
            ..ElevenLabsConfig::default()
        })
        .unwrap();

        let err = transcriber.transcribe(&utterance(), "de").unwrap_err();
        assert!(matches!(err, BackendError::Request(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ElevenLabsConfig {
            api_key: "sk-secret".to_string(),
            ..ElevenLabsConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("äää", 3), "ä...");
    }
}
