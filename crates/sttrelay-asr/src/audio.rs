use std::io::{Cursor, Seek, Write};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use sttrelay_frame::AudioChunk;
use tracing::debug;

use crate::error::AudioError;

/// PCM layout declared by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second.
    pub rate: u32,
    /// Bytes per sample.
    pub width: u16,
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            rate: 16_000,
            width: 2,
            channels: 1,
        }
    }
}

impl AudioFormat {
    pub fn of_chunk(chunk: &AudioChunk) -> Self {
        Self {
            rate: chunk.rate,
            width: chunk.width,
            channels: chunk.channels,
        }
    }

    /// Bytes per sample frame (one sample for every channel).
    pub fn frame_size(&self) -> usize {
        usize::from(self.width) * usize::from(self.channels)
    }

    fn validate(&self) -> Result<(), AudioError> {
        if !(1..=4).contains(&self.width) {
            return Err(AudioError::UnsupportedWidth(self.width));
        }
        if self.channels == 0 {
            return Err(AudioError::InvalidFormat("zero channels".to_string()));
        }
        if self.rate == 0 {
            return Err(AudioError::InvalidFormat("zero sample rate".to_string()));
        }
        Ok(())
    }
}

/// Accumulates one utterance of raw PCM in arrival order.
///
/// The format is last-wins: every `append` overwrites it, so the WAV header
/// describes the final chunk even if earlier chunks declared something else.
#[derive(Debug, Default)]
pub struct AudioAssembler {
    buffer: BytesMut,
    format: AudioFormat,
    chunks: usize,
}

impl AudioAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and adopt its declared format.
    pub fn append(&mut self, pcm: &[u8], format: AudioFormat) {
        if self.chunks > 0 && format != self.format {
            debug!(
                previous = ?self.format,
                current = ?format,
                "audio format changed mid-utterance; using the latest"
            );
        }
        self.buffer.extend_from_slice(pcm);
        self.format = format;
        self.chunks += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of chunks appended since the last reset.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop everything accumulated so far.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.chunks = 0;
    }

    /// Take the accumulated audio and reset in one step.
    ///
    /// Returns `None` when nothing was buffered.
    pub fn finish(&mut self) -> Option<Utterance> {
        let pcm = self.buffer.split().freeze();
        let format = self.format;
        self.reset();
        (!pcm.is_empty()).then_some(Utterance { pcm, format })
    }
}

/// A finalized utterance ready for transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub pcm: Bytes,
    pub format: AudioFormat,
}

impl Utterance {
    pub fn new(pcm: impl Into<Bytes>, format: AudioFormat) -> Self {
        Self {
            pcm: pcm.into(),
            format,
        }
    }

    /// Playback length implied by the declared format.
    pub fn duration(&self) -> Duration {
        let frame_size = self.format.frame_size();
        if frame_size == 0 || self.format.rate == 0 {
            return Duration::ZERO;
        }
        let frames = (self.pcm.len() / frame_size) as f64;
        Duration::from_secs_f64(frames / f64::from(self.format.rate))
    }

    /// Encode as an in-memory WAV file.
    pub fn to_wav(&self) -> Result<Vec<u8>, AudioError> {
        to_wav_container(&self.pcm, self.format)
    }

    /// Encode as WAV into any seekable sink.
    pub fn write_wav<W: Write + Seek>(&self, sink: W) -> Result<(), AudioError> {
        write_wav(&self.pcm, self.format, sink)
    }
}

/// Wrap raw little-endian PCM in a WAV container without converting it.
pub fn to_wav_container(pcm: &[u8], format: AudioFormat) -> Result<Vec<u8>, AudioError> {
    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    write_wav(pcm, format, &mut cursor)?;
    Ok(cursor.into_inner())
}

fn write_wav<W: Write + Seek>(pcm: &[u8], format: AudioFormat, sink: W) -> Result<(), AudioError> {
    format.validate()?;

    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.rate,
        bits_per_sample: format.width * 8,
        sample_format: hound::SampleFormat::Int,
    };

    // A trailing partial sample frame cannot be described by the header.
    let whole = pcm.len() - pcm.len() % format.frame_size();
    let mut writer = hound::WavWriter::new(sink, spec)?;
    for sample in pcm[..whole].chunks_exact(usize::from(format.width)) {
        match sample {
            // 8-bit WAV is unsigned; hound re-biases i8 on write.
            [b] => writer.write_sample((i16::from(*b) - 128) as i8)?,
            [lo, hi] => writer.write_sample(i16::from_le_bytes([*lo, *hi]))?,
            [b0, b1, b2] => writer.write_sample(i32::from_le_bytes([0, *b0, *b1, *b2]) >> 8)?,
            [b0, b1, b2, b3] => writer.write_sample(i32::from_le_bytes([*b0, *b1, *b2, *b3]))?,
            _ => return Err(AudioError::UnsupportedWidth(format.width)),
        }
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_back(wav: Vec<u8>) -> (hound::WavSpec, Vec<i32>) {
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        let samples = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        (spec, samples)
    }

    #[test]
    fn appends_in_arrival_order() {
        let mut assembler = AudioAssembler::new();
        let format = AudioFormat::default();
        assembler.append(b"AA", format);
        assembler.append(b"BB", format);
        assembler.append(b"CC", format);

        assert_eq!(assembler.buffer(), b"AABBCC");
        assert_eq!(assembler.chunks(), 3);
    }

    #[test]
    fn format_is_last_wins() {
        let mut assembler = AudioAssembler::new();
        assembler.append(&[0, 0], AudioFormat { rate: 8000, width: 2, channels: 1 });
        assembler.append(&[0, 0], AudioFormat { rate: 16000, width: 2, channels: 1 });

        let utterance = assembler.finish().unwrap();
        assert_eq!(utterance.format.rate, 16000);
        let (spec, _) = read_back(utterance.to_wav().unwrap());
        assert_eq!(spec.sample_rate, 16000);
    }

    #[test]
    fn finish_resets_buffer() {
        let mut assembler = AudioAssembler::new();
        assembler.append(b"\x01\x00", AudioFormat::default());

        let utterance = assembler.finish().unwrap();
        assert_eq!(utterance.pcm.as_ref(), b"\x01\x00");
        assert!(assembler.is_empty());
        assert_eq!(assembler.chunks(), 0);
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn wav_preserves_16bit_samples() {
        let pcm: Vec<u8> = [0i16, 1000, -1000, i16::MAX, i16::MIN]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let wav = to_wav_container(&pcm, AudioFormat::default()).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert!(wav.ends_with(&pcm));

        let (spec, samples) = read_back(wav);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples, vec![0, 1000, -1000, 32767, -32768]);
    }

    #[test]
    fn wav_preserves_8bit_bytes_verbatim() {
        let pcm = [0u8, 0x80, 0xff, 0x7f];
        let wav = to_wav_container(&pcm, AudioFormat { rate: 8000, width: 1, channels: 2 }).unwrap();
        assert!(wav.ends_with(&pcm));

        let (spec, _) = read_back(wav);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 8);
        assert_eq!(spec.sample_rate, 8000);
    }

    #[test]
    fn wav_preserves_24bit_samples() {
        let pcm = [0x01, 0x00, 0x80, 0xff, 0xff, 0x7f];
        let wav = to_wav_container(&pcm, AudioFormat { rate: 48000, width: 3, channels: 1 }).unwrap();
        assert!(wav.ends_with(&pcm));
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let wav = to_wav_container(&[1, 0, 2], AudioFormat::default()).unwrap();
        let (_, samples) = read_back(wav);
        assert_eq!(samples, vec![1]);
    }

    #[test]
    fn rejects_unusable_formats() {
        let bad_width = AudioFormat { rate: 16000, width: 5, channels: 1 };
        assert!(matches!(
            to_wav_container(&[0; 10], bad_width),
            Err(AudioError::UnsupportedWidth(5))
        ));

        let no_channels = AudioFormat { rate: 16000, width: 2, channels: 0 };
        assert!(matches!(
            to_wav_container(&[0; 4], no_channels),
            Err(AudioError::InvalidFormat(_))
        ));
    }

    #[test]
    fn duration_follows_format() {
        let utterance = Utterance::new(vec![0u8; 32_000], AudioFormat::default());
        assert_eq!(utterance.duration(), Duration::from_secs(1));
    }
}
