use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use sttrelay_asr::{DEFAULT_API_URL, DEFAULT_MODEL_ID};
use sttrelay_server::DEFAULT_LANGUAGE;
use sttrelay_frame::{FrameConfig, FrameReader, FrameWriter};
use sttrelay_transport::{Endpoint, RelayStream, TransportError, DEFAULT_PORT};

use crate::exit::{frame_error, transport_error, CliError, CliResult, TIMEOUT, USAGE};
use crate::output::OutputFormat;

pub mod describe;
pub mod serve;
pub mod transcribe;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the Wyoming relay server.
    Serve(ServeArgs),
    /// Ask a Wyoming server what it can transcribe.
    Describe(DescribeArgs),
    /// Stream a WAV file to a Wyoming server and print the transcript.
    Transcribe(TranscribeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Describe(args) => describe::run(args, format),
        Command::Transcribe(args) => transcribe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen URI (tcp://host:port or unix:///path/to.sock).
    #[arg(long, conflicts_with_all = ["host", "port"])]
    pub uri: Option<String>,
    /// Listen address when --uri is not given.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    /// Listen port when --uri is not given.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// ElevenLabs API key.
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    pub api_key: String,
    /// ElevenLabs model id.
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,
    /// Language used when a client does not choose one.
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,
    /// Speech-to-text endpoint.
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// Backend request timeout (e.g. 60s, 500ms).
    #[arg(long, default_value = "60s")]
    pub request_timeout: String,
}

impl ServeArgs {
    pub fn endpoint(&self) -> CliResult<Endpoint> {
        match &self.uri {
            Some(uri) => parse_endpoint(uri),
            None => Ok(Endpoint::tcp(self.host.clone(), self.port)),
        }
    }
}

#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Server URI (tcp://host:port or unix:///path/to.sock).
    pub uri: String,
    /// Connect and reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Server URI (tcp://host:port or unix:///path/to.sock).
    pub uri: String,
    /// 8/16/24/32-bit integer PCM WAV file.
    pub file: PathBuf,
    /// Language code sent with the request. Server default when omitted.
    #[arg(long)]
    pub language: Option<String>,
    /// Audio per chunk in milliseconds.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_ms: u32,
    /// Connect and reply timeout (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_endpoint(uri: &str) -> CliResult<Endpoint> {
    uri.parse()
        .map_err(|err: TransportError| CliError::new(USAGE, err.to_string()))
}

/// Connect, retrying while the server is not up yet.
pub(crate) fn connect_with_timeout(endpoint: &Endpoint, timeout: Duration) -> CliResult<RelayStream> {
    let start = Instant::now();
    loop {
        match RelayStream::connect(endpoint) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                if !is_retryable_connect_error(&err) {
                    return Err(transport_error("connect failed", err));
                }
                if start.elapsed() >= timeout {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("connect to {endpoint} timed out after {timeout:?}"),
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

/// Connect and split the stream into a frame reader and writer, both with
/// `timeout` as their I/O timeout.
pub(crate) fn connect_framed(
    endpoint: &Endpoint,
    timeout: Duration,
) -> CliResult<(FrameReader<RelayStream>, FrameWriter<RelayStream>)> {
    let stream = connect_with_timeout(endpoint, timeout)?;
    let config = FrameConfig {
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
        ..FrameConfig::default()
    };
    let write_half = stream
        .try_clone()
        .map_err(|err| transport_error("connect failed", err))?;
    let writer = FrameWriter::with_config_stream(write_half, config.clone())
        .map_err(|err| frame_error("connect failed", err))?;
    let reader = FrameReader::with_config_stream(stream, config)
        .map_err(|err| frame_error("connect failed", err))?;
    Ok((reader, writer))
}

fn is_retryable_connect_error(err: &TransportError) -> bool {
    match err {
        TransportError::Connect { source, .. } => matches!(
            source.kind(),
            std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
        ),
        _ => false,
    }
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub(crate) fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timeout_seconds() {
        assert_eq!(parse_timeout("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout("60").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn parse_timeout_millis() {
        assert_eq!(parse_timeout("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_timeout_invalid() {
        assert_eq!(parse_timeout("0s").unwrap_err().code, USAGE);
        assert_eq!(parse_timeout("").unwrap_err().code, USAGE);
        assert_eq!(parse_timeout("soon").unwrap_err().code, USAGE);
    }

    #[test]
    fn serve_endpoint_from_host_and_port() {
        let args = ServeArgs {
            uri: None,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            api_key: String::new(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: "60s".to_string(),
        };
        assert_eq!(args.endpoint().unwrap(), Endpoint::tcp("0.0.0.0", 10200));
    }

    #[test]
    fn bad_uri_is_a_usage_error() {
        assert_eq!(parse_endpoint("http://x").unwrap_err().code, USAGE);
    }

    #[test]
    fn refused_connection_times_out() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = connect_with_timeout(
            &Endpoint::tcp("127.0.0.1", port),
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert_eq!(err.code, TIMEOUT);
    }
}
