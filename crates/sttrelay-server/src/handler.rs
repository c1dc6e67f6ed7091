use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use sttrelay_asr::{AudioAssembler, AudioFormat, BackendError, SharedTranscriber};
use sttrelay_frame::{AudioChunk, Message, Transcribe, WyomingCodec};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, trace, warn, Instrument, Span};

use crate::config::ServerConfig;
use crate::error::Result;

/// Where a connection is in the utterance cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No audio buffered.
    Idle,
    /// At least one `audio-chunk` received since the last `audio-stop`.
    Accumulating,
}

/// Counters reported when a connection ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub messages: u64,
    pub utterances: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Drives one client connection: decode a message, act on it, reply, repeat.
///
/// Messages are handled strictly in arrival order. A transcription is awaited
/// before the next frame is read, so replies keep the order of the requests.
pub struct ConnectionHandler<S> {
    framed: Framed<S, WyomingCodec>,
    config: Arc<ServerConfig>,
    transcriber: SharedTranscriber,
    span: Span,
    state: State,
    language: String,
    assembler: AudioAssembler,
    stats: ConnectionStats,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// `span` is entered for everything this connection logs, including the
    /// backend call on the blocking pool.
    pub fn new(
        stream: S,
        config: Arc<ServerConfig>,
        transcriber: SharedTranscriber,
        span: Span,
    ) -> Self {
        let codec = WyomingCodec::with_config(&config.frame);
        let language = config.default_language.clone();
        Self {
            framed: Framed::new(stream, codec),
            config,
            transcriber,
            span,
            state: State::Idle,
            language,
            assembler: AudioAssembler::new(),
            stats: ConnectionStats::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Run until the client disconnects or breaks the protocol.
    ///
    /// A disconnect (clean or mid-frame) is `Ok`. Protocol errors are
    /// returned after being logged; the stream is closed either way.
    pub async fn run(mut self) -> Result<ConnectionStats> {
        let span = self.span.clone();
        async move {
            loop {
                let message = match self.framed.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(err)) if err.is_disconnect() => {
                        debug!(error = %err, "client disconnected mid-frame");
                        break;
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "protocol error, closing connection");
                        return Err(err.into());
                    }
                    None => {
                        debug!("client closed connection");
                        break;
                    }
                };

                self.stats.messages += 1;
                if self.dispatch(message).await? == Flow::Stop {
                    break;
                }
            }
            Ok(self.stats)
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&mut self, message: Message) -> Result<Flow> {
        trace!(event_type = message.event_type(), "received");
        match message {
            Message::Describe => {
                let info = self.config.info.clone();
                self.reply(Message::Info(info)).await
            }
            Message::Transcribe(request) => {
                self.select_language(request);
                Ok(Flow::Continue)
            }
            Message::AudioChunk(chunk) => {
                self.accept_chunk(chunk);
                Ok(Flow::Continue)
            }
            Message::AudioStop => self.finish_utterance().await,
            other @ (Message::Info(_) | Message::Transcript(_)) => {
                debug!(
                    event_type = other.event_type(),
                    "ignoring server-to-client message"
                );
                Ok(Flow::Continue)
            }
            Message::Unknown { event_type, .. } => {
                info!(event_type = %event_type, "ignoring unknown message type");
                Ok(Flow::Continue)
            }
        }
    }

    fn select_language(&mut self, request: Transcribe) {
        self.language = match request.language {
            Some(language) if !language.is_empty() => language,
            _ => self.config.default_language.clone(),
        };
        debug!(language = %self.language, "language selected");
    }

    fn accept_chunk(&mut self, chunk: AudioChunk) {
        trace!(
            bytes = chunk.audio.len(),
            rate = chunk.rate,
            width = chunk.width,
            channels = chunk.channels,
            "audio chunk"
        );
        self.assembler
            .append(&chunk.audio, AudioFormat::of_chunk(&chunk));
        self.state = State::Accumulating;
    }

    async fn finish_utterance(&mut self) -> Result<Flow> {
        // Both the buffer and the language are per-utterance.
        let language = std::mem::replace(&mut self.language, self.config.default_language.clone());
        self.state = State::Idle;

        let Some(utterance) = self.assembler.finish() else {
            warn!("audio-stop with empty buffer");
            return self.reply(Message::transcript("")).await;
        };

        debug!(
            bytes = utterance.pcm.len(),
            rate = utterance.format.rate,
            width = utterance.format.width,
            channels = utterance.format.channels,
            language = %language,
            backend = self.transcriber.name(),
            "transcribing utterance"
        );

        let transcriber = Arc::clone(&self.transcriber);
        let span = self.span.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            transcriber.transcribe(&utterance, &language)
        })
        .await;

        let outcome = match joined {
            Ok(result) => result,
            Err(err) => Err(BackendError::Worker(err.to_string())),
        };
        let text = match outcome {
            Ok(text) => {
                debug!(text = %text, "transcription");
                text
            }
            Err(err) => {
                error!(error = %err, "transcription failed, replying with empty text");
                String::new()
            }
        };

        self.stats.utterances += 1;
        self.reply(Message::transcript(text)).await
    }

    async fn reply(&mut self, message: Message) -> Result<Flow> {
        match self.framed.send(message).await {
            Ok(()) => Ok(Flow::Continue),
            Err(err) if err.is_disconnect() => {
                debug!(error = %err, "client gone before reply");
                Ok(Flow::Stop)
            }
            Err(err) => Err(err.into()),
        }
    }
}
