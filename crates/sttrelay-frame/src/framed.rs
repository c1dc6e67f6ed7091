//! `tokio_util::codec` adapter so async streams can be driven with
//! `FramedRead`/`FramedWrite`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::event::Event;
use crate::message::Message;

/// Decodes typed [`Message`]s and encodes messages or raw events.
#[derive(Debug, Clone)]
pub struct WyomingCodec {
    max_payload_size: usize,
}

impl WyomingCodec {
    pub fn new() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
        }
    }
}

impl Default for WyomingCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WyomingCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        match decode_frame(src, self.max_payload_size)? {
            Some(frame) => Message::from_event(Event::from_frame(frame)?).map(Some),
            None => Ok(None),
        }
    }

    // A clean close between frames ends the stream; a close mid-frame is
    // reported as `ConnectionClosed` instead of tokio-util's generic error.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Event> for WyomingCodec {
    type Error = FrameError;

    fn encode(&mut self, event: Event, dst: &mut BytesMut) -> Result<()> {
        let frame = event.to_frame()?;
        encode_frame(&frame.json, &frame.payload, dst)
    }
}

impl Encoder<Message> for WyomingCodec {
    type Error = FrameError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<()> {
        let event = message.into_event()?;
        Encoder::<Event>::encode(self, event, dst)
    }
}
