use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use sttrelay_transport::RelayStream;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::event::Event;
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally: callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next frame and parse its JSON body.
    pub fn read_event(&mut self) -> Result<Event> {
        Event::from_frame(self.read_frame()?)
    }

    /// Read the next frame as a typed message.
    pub fn read_message(&mut self) -> Result<Message> {
        Message::from_event(self.read_event()?)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<RelayStream> {
    /// Create a frame reader for `RelayStream` and apply read timeout from config.
    pub fn with_config_stream(inner: RelayStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: sttrelay_transport::TransportError) -> FrameError {
    match err {
        sttrelay_transport::TransportError::Io(io)
        | sttrelay_transport::TransportError::Accept(io) => FrameError::Io(io),
        sttrelay_transport::TransportError::Bind { source, .. }
        | sttrelay_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_frame, MAGIC};
    use crate::message::{AudioChunk, Transcribe};

    fn wire(messages: Vec<Message>) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for message in messages {
            let frame = message.into_event().unwrap().to_frame().unwrap();
            encode_frame(&frame.json, &frame.payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_message() {
        let bytes = wire(vec![Message::Describe]);
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_message().unwrap(), Message::Describe);
    }

    #[test]
    fn read_multiple_messages_in_order() {
        let chunk = Message::AudioChunk(AudioChunk {
            rate: 16000,
            width: 2,
            channels: 1,
            audio: bytes::Bytes::from_static(b"AABB"),
        });
        let bytes = wire(vec![
            Message::Transcribe(Transcribe {
                language: Some("fr".to_string()),
            }),
            chunk.clone(),
            Message::AudioStop,
        ]);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(reader.read_message().unwrap(), Message::Transcribe(_)));
        assert_eq!(reader.read_message().unwrap(), chunk);
        assert_eq!(reader.read_message().unwrap(), Message::AudioStop);
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(vec![Message::transcript("slow")]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);
        assert_eq!(reader.read_message().unwrap(), Message::transcript("slow"));
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u8(1);
        partial.put_u32_le(64);
        partial.put_u32_le(0);
        partial.put_slice(b"{\"type\":");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn invalid_magic_in_stream() {
        let mut bytes = wire(vec![Message::Describe]);
        bytes[0] = b'W';
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::InvalidMagic));
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(1);
        buf.put_u32_le(1024);
        buf.put_u32_le(0);

        let cfg = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(buf.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire(vec![Message::AudioStop])),
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_message().unwrap(), Message::AudioStop);
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send_message(Message::Describe).unwrap();
        assert_eq!(reader.read_message().unwrap(), Message::Describe);
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
