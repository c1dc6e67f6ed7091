use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FrameError, Result};
use crate::event::Event;

/// Client asks for server capabilities.
pub const DESCRIBE: &str = "describe";
/// Server capabilities.
pub const INFO: &str = "info";
/// Client selects transcription options for the next utterance.
pub const TRANSCRIBE: &str = "transcribe";
/// Raw PCM audio; the samples travel as the binary payload.
pub const AUDIO_CHUNK: &str = "audio-chunk";
/// End of the current utterance.
pub const AUDIO_STOP: &str = "audio-stop";
/// Recognized text.
pub const TRANSCRIPT: &str = "transcript";

/// Attribution shown for an ASR program or model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// One recognition model and its languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsrModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// One ASR program advertised in `info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsrProgram {
    pub name: String,
    #[serde(default)]
    pub attribution: Option<Attribution>,
    #[serde(default)]
    pub models: Vec<AsrModel>,
}

/// Data of an `info` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub asr: Vec<AsrProgram>,
}

/// Data of a `transcribe` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcribe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Data of a `transcript` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,
}

/// Data of an `audio-chunk` event.
///
/// `audio` is never part of the JSON body; it is carried as the frame's
/// binary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    #[serde(default = "default_rate")]
    pub rate: u32,
    /// Bytes per sample.
    #[serde(default = "default_width")]
    pub width: u16,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(skip)]
    pub audio: Bytes,
}

fn default_rate() -> u32 {
    16_000
}

fn default_width() -> u16 {
    2
}

fn default_channels() -> u16 {
    1
}

/// A typed protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Describe,
    Info(Info),
    Transcribe(Transcribe),
    AudioChunk(AudioChunk),
    AudioStop,
    Transcript(Transcript),
    /// Any event type outside the known set, kept verbatim.
    Unknown {
        event_type: String,
        data: Map<String, Value>,
    },
}

impl Message {
    /// Wire name of this message's event type.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Describe => DESCRIBE,
            Self::Info(_) => INFO,
            Self::Transcribe(_) => TRANSCRIBE,
            Self::AudioChunk(_) => AUDIO_CHUNK,
            Self::AudioStop => AUDIO_STOP,
            Self::Transcript(_) => TRANSCRIPT,
            Self::Unknown { event_type, .. } => event_type.as_str(),
        }
    }

    /// Convenience constructor for a transcript.
    pub fn transcript(text: impl Into<String>) -> Self {
        Self::Transcript(Transcript { text: text.into() })
    }

    /// Interpret a generic event as a typed message.
    ///
    /// Malformed `transcribe` or `audio-chunk` data is an error. Malformed
    /// `info` or `transcript` data falls back to [`Message::Unknown`].
    pub fn from_event(event: Event) -> Result<Self> {
        let Event {
            event_type,
            data,
            payload,
        } = event;

        let message = match event_type.as_str() {
            DESCRIBE => Self::Describe,
            AUDIO_STOP => Self::AudioStop,
            INFO => match parse_data(&event_type, data.clone()) {
                Ok(info) => Self::Info(info),
                Err(_) => Self::Unknown { event_type, data },
            },
            TRANSCRIPT => match parse_data(&event_type, data.clone()) {
                Ok(transcript) => Self::Transcript(transcript),
                Err(_) => Self::Unknown { event_type, data },
            },
            TRANSCRIBE => Self::Transcribe(parse_data(&event_type, data)?),
            AUDIO_CHUNK => {
                let mut chunk: AudioChunk = parse_data(&event_type, data)?;
                chunk.audio = payload.unwrap_or_default();
                Self::AudioChunk(chunk)
            }
            _ => Self::Unknown { event_type, data },
        };
        Ok(message)
    }

    /// Convert into a generic event ready for framing.
    pub fn into_event(self) -> Result<Event> {
        let event_type = self.event_type().to_string();
        let event = match self {
            Self::Describe | Self::AudioStop => Event::new(event_type, Map::new()),
            Self::Info(info) => Event::new(event_type, to_data(&info)?),
            Self::Transcribe(transcribe) => Event::new(event_type, to_data(&transcribe)?),
            Self::Transcript(transcript) => Event::new(event_type, to_data(&transcript)?),
            Self::AudioChunk(chunk) => {
                Event::new(event_type, to_data(&chunk)?).with_payload(chunk.audio)
            }
            Self::Unknown { data, .. } => Event::new(event_type, data),
        };
        Ok(event)
    }
}

fn parse_data<T: DeserializeOwned>(event_type: &str, data: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(data)).map_err(|err| FrameError::InvalidData {
        event_type: event_type.to_string(),
        reason: err.to_string(),
    })
}

fn to_data<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value).map_err(FrameError::InvalidJson)? {
        Value::Object(map) => Ok(map),
        _ => Err(FrameError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn roundtrip(message: Message) -> Message {
        let frame = message.into_event().unwrap().to_frame().unwrap();
        Message::from_event(Event::from_frame(frame).unwrap()).unwrap()
    }

    fn sample_info() -> Info {
        Info {
            asr: vec![AsrProgram {
                name: "elevenlabs_wyoming".to_string(),
                attribution: Some(Attribution {
                    name: "ElevenLabs Scribe".to_string(),
                    url: "https://elevenlabs.io/speech-to-text".to_string(),
                }),
                models: vec![AsrModel {
                    id: "scribe_v1".to_string(),
                    name: "ElevenLabs Scribe".to_string(),
                    languages: vec!["de".to_string(), "en".to_string()],
                }],
            }],
        }
    }

    #[test]
    fn every_message_type_roundtrips() {
        let messages = vec![
            Message::Describe,
            Message::Info(sample_info()),
            Message::Transcribe(Transcribe {
                language: Some("en".to_string()),
            }),
            Message::Transcribe(Transcribe::default()),
            Message::AudioChunk(AudioChunk {
                rate: 8000,
                width: 1,
                channels: 2,
                audio: Bytes::from_static(b"\x00\x7f\x80\xff"),
            }),
            Message::AudioStop,
            Message::transcript("hallo welt"),
            Message::transcript(""),
        ];

        for message in messages {
            assert_eq!(roundtrip(message.clone()), message);
        }
    }

    #[test]
    fn audio_is_not_serialized_into_json() {
        let event = Message::AudioChunk(AudioChunk {
            rate: 16000,
            width: 2,
            channels: 1,
            audio: Bytes::from_static(b"AABB"),
        })
        .into_event()
        .unwrap();

        assert!(!event.data.contains_key("audio"));
        assert_eq!(event.payload.as_deref(), Some(&b"AABB"[..]));
        let frame = event.to_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"AABB");
    }

    #[test]
    fn audio_chunk_defaults_missing_format_fields() {
        let event = Event::new(AUDIO_CHUNK, Map::new()).with_payload(&b"\x01\x00"[..]);
        let Message::AudioChunk(chunk) = Message::from_event(event).unwrap() else {
            panic!("expected audio chunk");
        };
        assert_eq!((chunk.rate, chunk.width, chunk.channels), (16000, 2, 1));
        assert_eq!(chunk.audio.as_ref(), b"\x01\x00");
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let mut data = Map::new();
        data.insert("name".to_string(), json!("okay_nabu"));
        let message = Message::from_event(Event::new("detect", data.clone())).unwrap();
        assert_eq!(
            message,
            Message::Unknown {
                event_type: "detect".to_string(),
                data
            }
        );
        assert_eq!(message.event_type(), "detect");
    }

    #[test]
    fn wrong_field_types_are_invalid_data() {
        let mut data = Map::new();
        data.insert("rate".to_string(), json!("fast"));
        let err = Message::from_event(Event::new(AUDIO_CHUNK, data)).unwrap_err();
        assert!(matches!(err, FrameError::InvalidData { event_type, .. } if event_type == AUDIO_CHUNK));
    }

    #[test]
    fn malformed_info_and_transcript_become_unknown() {
        let mut data = Map::new();
        data.insert("text".to_string(), Value::Null);
        let message = Message::from_event(Event::new(TRANSCRIPT, data.clone())).unwrap();
        assert_eq!(
            message,
            Message::Unknown {
                event_type: TRANSCRIPT.to_string(),
                data
            }
        );

        let mut data = Map::new();
        data.insert("asr".to_string(), json!([{"name": "x", "models": null}]));
        let message = Message::from_event(Event::new(INFO, data)).unwrap();
        assert!(matches!(message, Message::Unknown { event_type, .. } if event_type == INFO));
    }

    #[test]
    fn transcribe_accepts_null_language() {
        let mut data = Map::new();
        data.insert("language".to_string(), Value::Null);
        let message = Message::from_event(Event::new(TRANSCRIBE, data)).unwrap();
        assert_eq!(message, Message::Transcribe(Transcribe { language: None }));
    }

    #[test]
    fn info_wire_shape() {
        let event = Message::Info(sample_info()).into_event().unwrap();
        let value = Value::Object(event.data);
        assert_eq!(
            value["asr"][0]["attribution"]["url"],
            json!("https://elevenlabs.io/speech-to-text")
        );
        assert_eq!(value["asr"][0]["models"][0]["languages"], json!(["de", "en"]));
    }
}
