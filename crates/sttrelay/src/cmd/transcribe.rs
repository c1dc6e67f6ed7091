use std::path::Path;
use std::time::Instant;

use sttrelay_asr::{AudioFormat, Utterance};
use sttrelay_frame::{AudioChunk, FrameWriter, Message, Transcribe};
use sttrelay_transport::RelayStream;
use tracing::{debug, info};

use crate::cmd::{connect_framed, parse_endpoint, parse_timeout, TranscribeArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_transcript, OutputFormat, TranscriptReport};

pub fn run(args: TranscribeArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.uri)?;
    let timeout = parse_timeout(&args.timeout)?;
    let utterance = read_wav_pcm(&args.file)?;
    let chunk_bytes = chunk_size(utterance.format, args.chunk_ms);
    info!(
        file = %args.file.display(),
        bytes = utterance.pcm.len(),
        rate = utterance.format.rate,
        width = utterance.format.width,
        channels = utterance.format.channels,
        chunk_bytes,
        "streaming audio"
    );

    let started = Instant::now();
    let (mut reader, mut writer) = connect_framed(&endpoint, timeout)?;
    send(
        &mut writer,
        Message::Transcribe(Transcribe {
            language: args.language.clone(),
        }),
    )?;
    let total = utterance.pcm.len();
    let mut offset = 0;
    while offset < total {
        let end = (offset + chunk_bytes).min(total);
        send(
            &mut writer,
            Message::AudioChunk(AudioChunk {
                rate: utterance.format.rate,
                width: utterance.format.width,
                channels: utterance.format.channels,
                audio: utterance.pcm.slice(offset..end),
            }),
        )?;
        offset = end;
    }
    send(&mut writer, Message::AudioStop)?;

    let text = loop {
        match reader
            .read_message()
            .map_err(|err| frame_error("waiting for transcript failed", err))?
        {
            Message::Transcript(transcript) => break transcript.text,
            other => debug!(event_type = other.event_type(), "skipping message"),
        }
    };

    let endpoint = endpoint.to_string();
    let file = args.file.display().to_string();
    print_transcript(
        &TranscriptReport {
            endpoint: &endpoint,
            file: &file,
            language: args.language.as_deref(),
            audio: utterance.duration(),
            elapsed: started.elapsed(),
            text: &text,
        },
        format,
    );
    Ok(SUCCESS)
}

fn send(writer: &mut FrameWriter<RelayStream>, message: Message) -> CliResult<()> {
    writer
        .send_message(message)
        .map_err(|err| frame_error("send failed", err))
}

/// Bytes per chunk for `chunk_ms` of audio, rounded down to whole sample
/// frames and never less than one frame.
fn chunk_size(format: AudioFormat, chunk_ms: u32) -> usize {
    let frame = format.frame_size().max(1);
    let frames = u64::from(format.rate) * u64::from(chunk_ms) / 1000;
    usize::try_from(frames).unwrap_or(usize::MAX / frame).max(1) * frame
}

/// Read an integer PCM WAV file back into raw little-endian samples.
fn read_wav_pcm(path: &Path) -> CliResult<Utterance> {
    let wav_error = |err: hound::Error| match err {
        hound::Error::IoError(err) => io_error(&format!("cannot read {}", path.display()), err),
        other => CliError::new(
            DATA_INVALID,
            format!("{} is not a usable WAV file: {other}", path.display()),
        ),
    };

    let mut reader = hound::WavReader::open(path).map_err(wav_error)?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{}: only integer PCM WAV is supported", path.display()),
        ));
    }
    let width = spec.bits_per_sample.div_ceil(8);
    if !(1..=4).contains(&width) {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "{}: unsupported sample size {} bits",
                path.display(),
                spec.bits_per_sample
            ),
        ));
    }

    let mut pcm = Vec::with_capacity(reader.len() as usize * usize::from(width));
    for sample in reader.samples::<i32>() {
        let sample = sample.map_err(wav_error)?;
        match width {
            // 8-bit WAV is unsigned; hound hands it back centered on zero.
            1 => pcm.push((sample + 128) as u8),
            2 => pcm.extend_from_slice(&(sample as i16).to_le_bytes()),
            3 => pcm.extend_from_slice(&sample.to_le_bytes()[..3]),
            _ => pcm.extend_from_slice(&sample.to_le_bytes()),
        }
    }

    Ok(Utterance::new(
        pcm,
        AudioFormat {
            rate: spec.sample_rate,
            width,
            channels: spec.channels,
        },
    ))
}
