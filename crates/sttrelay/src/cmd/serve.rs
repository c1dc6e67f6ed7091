use std::sync::Arc;

use sttrelay_asr::{ElevenLabsConfig, ElevenLabsTranscriber, SharedTranscriber, Transcriber};
use sttrelay_server::{Server, ServerConfig, ServerError};
use tracing::{info, warn};

use crate::cmd::{parse_timeout, ServeArgs};
use crate::exit::{backend_error, io_error, server_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let endpoint = args.endpoint()?;
    let request_timeout = parse_timeout(&args.request_timeout)?;
    if args.api_key.trim().is_empty() {
        return Err(CliError::new(
            USAGE,
            "an ElevenLabs API key is required (--api-key or ELEVENLABS_API_KEY)",
        ));
    }
    if args.language.trim().is_empty() {
        return Err(CliError::new(USAGE, "--language must not be empty"));
    }

    // The blocking HTTP client owns its own runtime; it has to be built and
    // dropped outside ours.
    let backend = ElevenLabsTranscriber::new(ElevenLabsConfig {
        api_url: args.api_url,
        api_key: args.api_key,
        model_id: args.model_id.clone(),
        timeout: Some(request_timeout),
    })
    .map_err(|err| backend_error("backend setup failed", err))?;
    info!(
        backend = backend.name(),
        config = ?backend.config(),
        "transcription backend ready"
    );
    let transcriber: SharedTranscriber = Arc::new(backend);

    let config = ServerConfig::for_model(&args.model_id).with_default_language(args.language);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let result: Result<(), ServerError> = runtime.block_on(async {
        let server = Server::bind(&endpoint, config, Arc::clone(&transcriber)).await?;
        info!(
            endpoint = %server.local_endpoint()?,
            model_id = %args.model_id,
            "sttrelay serving"
        );
        server.serve(shutdown_signal()).await
    });

    drop(runtime);
    drop(transcriber);

    result.map_err(|err| server_error("server failed", err))?;
    info!("server stopped");
    Ok(SUCCESS)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = terminate.recv() => info!("terminate signal received"),
                }
                return;
            }
            Err(err) => warn!(error = %err, "cannot listen for SIGTERM"),
        }
    }

    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received"),
        Err(err) => {
            warn!(error = %err, "cannot listen for interrupt; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
