use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::Frame;
use crate::error::{FrameError, Result};
use crate::message::{AUDIO_CHUNK, TRANSCRIBE};

/// A decoded frame: event type, JSON data, and the optional binary payload.
///
/// The payload is only kept for `audio-chunk` events; any binary section on
/// other event types is read off the wire and dropped. Non-object `data` is
/// only an error for `transcribe` and `audio-chunk`; other types get an
/// empty map.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub data: Map<String, Value>,
    pub payload: Option<Bytes>,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(event_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            payload: None,
        }
    }

    /// Attach a binary payload.
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Parse the JSON body of a frame.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        let body: Value = serde_json::from_slice(&frame.json).map_err(FrameError::InvalidJson)?;
        let Value::Object(mut body) = body else {
            return Err(FrameError::NotAnObject);
        };

        let event_type = match body.remove("type") {
            Some(Value::String(event_type)) if !event_type.is_empty() => event_type,
            _ => return Err(FrameError::MissingType),
        };

        let data = match body.remove("data") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(data)) => data,
            Some(other) if event_type == TRANSCRIBE || event_type == AUDIO_CHUNK => {
                return Err(FrameError::InvalidData {
                    event_type,
                    reason: format!("\"data\" must be an object, got {}", json_kind(&other)),
                })
            }
            Some(other) => {
                debug!(
                    event_type = %event_type,
                    kind = json_kind(&other),
                    "discarding non-object data"
                );
                Map::new()
            }
        };

        let payload = (event_type == AUDIO_CHUNK).then_some(frame.payload);

        Ok(Self {
            event_type,
            data,
            payload,
        })
    }

    /// Serialize into a frame.
    pub fn to_frame(&self) -> Result<Frame> {
        let mut body = Map::with_capacity(2);
        body.insert("type".to_string(), Value::String(self.event_type.clone()));
        body.insert("data".to_string(), Value::Object(self.data.clone()));
        let json = serde_json::to_vec(&body).map_err(FrameError::InvalidJson)?;

        Ok(Frame::new(json, self.payload.clone().unwrap_or_default()))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
