use anyhow::{Context, Result};
use clap::Parser;
use mictok::audio::{self, AudioClip};
use mictok::cli::{Cli, Commands, ProviderArg};
use mictok::config::{Config, Provider};
use mictok::pipeline::{Pipeline, PipelineRequest};
use std::io::{IsTerminal, Read};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Some(Commands::Encodings) => {
            for name in mictok::encoding::ENCODING_NAMES {
                println!("{name}");
            }
            Ok(())
        }
        None => run_pipeline(cli).await,
    }
}

/// Route logs to stderr so stdout stays pure JSON.
fn init_logging(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_pipeline(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let clip = read_input(cli.input.as_deref())?;
    let request = build_request(&cli, &config, clip);

    // Ctrl+C aborts the run instead of killing the process mid-write.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let pipeline = Pipeline::new();
    let result = pipeline.run_cancellable(request, cancel).await?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/mictok/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("failed to load {}", path.display()))?
    } else {
        match Config::default_path() {
            Some(path) => Config::load_or_default(&path),
            None => Config::default(),
        }
    };

    Ok(config.with_env_overrides())
}

/// Read the audio clip from a file, or from stdin when piped.
fn read_input(path: Option<&std::path::Path>) -> Result<AudioClip> {
    match path {
        Some(path) => {
            let data =
                std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            let mime = path
                .extension()
                .and_then(|e| e.to_str())
                .map(audio::mime_for_extension)
                .unwrap_or("application/octet-stream");
            Ok(AudioClip::new(data, mime))
        }
        None => {
            if std::io::stdin().is_terminal() {
                anyhow::bail!("no input: pass an audio file or pipe audio bytes to stdin");
            }
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .context("failed to read audio from stdin")?;
            // Piped input carries no filename; assume WAV, the decoder falls
            // back to ffmpeg for anything else.
            Ok(AudioClip::new(data, "audio/wav"))
        }
    }
}

/// Merge CLI flags over the loaded configuration into a pipeline request.
fn build_request(cli: &Cli, config: &Config, clip: AudioClip) -> PipelineRequest {
    let mut effective = config.clone();

    match cli.provider {
        Some(ProviderArg::Local) => effective.transcription.provider = Provider::Local,
        Some(ProviderArg::Remote) => effective.transcription.provider = Provider::Remote,
        None => {}
    }
    if let Some(model) = &cli.model {
        match effective.transcription.provider {
            Provider::Local => effective.transcription.local_model = model.clone(),
            Provider::Remote => effective.transcription.remote_model = model.clone(),
        }
    }
    if let Some(path) = &cli.model_path {
        effective.transcription.model_path = Some(path.clone());
    }
    if let Some(model) = &cli.tokenizer_model {
        effective.tokenizer.model = Some(model.clone());
        effective.tokenizer.encoding = None;
    } else if let Some(encoding) = &cli.encoding {
        effective.tokenizer.encoding = Some(encoding.clone());
        effective.tokenizer.model = None;
    }
    if let Some(url) = &cli.summarizer_url {
        effective.summarizer.url = url.clone();
    }
    if let Some(model) = &cli.summarizer_model {
        effective.summarizer.model = model.clone();
    }

    let mut request = PipelineRequest::new(
        clip,
        effective.provider_config(),
        effective.tokenizer_config(),
    );
    request.remote_timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| effective.remote_timeout());
    if cli.summarize {
        request = request.with_summarization(effective.summarizer_config());
    }
    request
}
