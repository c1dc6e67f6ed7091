//! Wyoming protocol framing for the speech-to-text relay.
//!
//! Every frame on the wire is:
//! - The 7 magic bytes `wyoming` and a 1-byte protocol version (always 1)
//! - A 4-byte little-endian JSON body length
//! - A 4-byte little-endian binary payload length
//! - The JSON body `{"type": ..., "data": {...}}`, then the binary payload
//!
//! [`Frame`] is the raw wire unit, [`Event`] the generic type/data/payload
//! view, and [`Message`] the typed sum over the known event types.

pub mod codec;
pub mod error;
pub mod event;
pub mod message;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod framed;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC,
    PROTOCOL_VERSION,
};
pub use error::{FrameError, Result};
pub use event::Event;
pub use message::{
    AsrModel, AsrProgram, Attribution, AudioChunk, Info, Message, Transcribe, Transcript,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use framed::WyomingCodec;
