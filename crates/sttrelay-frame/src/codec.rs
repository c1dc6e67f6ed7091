use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: magic (7) + version (1) + JSON length (4) + payload length (4) = 16 bytes.
pub const HEADER_SIZE: usize = 16;

/// Magic bytes: "wyoming".
pub const MAGIC: [u8; 7] = *b"wyoming";

/// The only protocol version this codec speaks.
pub const PROTOCOL_VERSION: u8 = 1;

/// Default maximum size of each frame section: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// One frame as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// UTF-8 JSON body.
    pub json: Bytes,
    /// Binary payload; empty when the header declares zero bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(json: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        Self {
            json: json.into(),
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + JSON + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.json.len() + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬─────────┬───────────┬─────────────┬────────────┬──────────────┐
/// │ Magic     │ Version │ JSON len  │ Payload len │ JSON body  │ Payload      │
/// │ "wyoming" │ 0x01    │ (4B LE)   │ (4B LE)     │ (JSON len) │ (Payload len)│
/// └───────────┴─────────┴───────────┴─────────────┴────────────┴──────────────┘
/// ```
pub fn encode_frame(json: &[u8], payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    for (section, len) in [("JSON body", json.len()), ("binary payload", payload.len())] {
        if len > u32::MAX as usize {
            return Err(FrameError::PayloadTooLarge {
                section,
                size: len,
                max: u32::MAX as usize,
            });
        }
    }

    dst.reserve(HEADER_SIZE + json.len() + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u8(PROTOCOL_VERSION);
    dst.put_u32_le(json.len() as u32);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(json);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// The header is validated as soon as its 16 bytes are buffered, before any
/// body bytes are waited for. On success, consumes the frame bytes.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..7] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }
    if src[7] != PROTOCOL_VERSION {
        return Err(FrameError::UnsupportedVersion(src[7]));
    }

    let json_len = u32::from_le_bytes([src[8], src[9], src[10], src[11]]) as usize;
    let payload_len = u32::from_le_bytes([src[12], src[13], src[14], src[15]]) as usize;

    if json_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            section: "JSON body",
            size: json_len,
            max: max_payload,
        });
    }
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            section: "binary payload",
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + json_len + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let json = src.split_to(json_len).freeze();
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { json, payload }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum size of the JSON body and of the binary payload. Default: 16 MiB each.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
