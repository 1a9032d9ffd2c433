//! Command-line entry point.
//!
//! # `narrate`
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (defaults on first run), apply env overrides.
//! 3. Register the voice sample in a local voice library.
//! 4. Submit the narration job and print progress until it settles.
//!
//! # `init-config`
//!
//! Writes a default `settings.toml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use voice_narrator::{
    config::{AppConfig, AppPaths, ENDPOINT_ID_ENV},
    pipeline::{InMemoryJobStore, JobStatus, NarrationService, PipelineSettings, SubmitRequest},
    synthesis::{RemoteSynthesizer, SynthesisParams},
    voice::{FsObjectStore, InMemoryVoiceRepository, VoiceLibrary, VoiceOptions},
};

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "voice-narrator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Narrate long text in a cloned voice via a remote TTS endpoint")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a voice sample and narrate a text file with it
    Narrate {
        /// Reference recording (WAV, 3 s or longer)
        #[arg(long, value_name = "WAV")]
        voice_sample: PathBuf,

        /// UTF-8 text to narrate
        #[arg(long, value_name = "TXT")]
        text_file: PathBuf,

        /// Owner id recorded for the voice
        #[arg(long, default_value_t = 1)]
        owner: i64,

        /// Display name for the voice (defaults to the sample's file stem)
        #[arg(long)]
        name: Option<String>,

        /// JSON speaker embedding sent instead of the reference audio
        #[arg(long, value_name = "JSON")]
        speaker_embedding: Option<PathBuf>,

        #[arg(long)]
        exaggeration: Option<f32>,

        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long)]
        cfg_weight: Option<f32>,
    },

    /// Write a default settings file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file);

    match cli.command {
        Command::InitConfig { force } => init_config(&config_path, force),
        Command::Narrate {
            voice_sample,
            text_file,
            owner,
            name,
            speaker_embedding,
            exaggeration,
            temperature,
            cfg_weight,
        } => {
            let config = load_config(&config_path)?;
            let params = SynthesisParams::resolve(
                &config.synthesis,
                exaggeration,
                temperature,
                cfg_weight,
            );
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to create tokio runtime")?;
            runtime.block_on(narrate(
                config,
                NarrateArgs {
                    voice_sample,
                    text_file,
                    owner,
                    name,
                    speaker_embedding,
                },
                params,
            ))
        }
    }
}

fn load_config(path: &Path) -> Result<AppConfig> {
    let mut config = AppConfig::load_from(path)?;
    config.apply_env_overrides();
    config.validate()?;
    if config.remote.endpoint_id.trim().is_empty() {
        bail!(
            "remote.endpoint_id is not set; add it to {} or set {}",
            path.display(),
            ENDPOINT_ID_ENV
        );
    }
    log::info!("Loaded settings from {}", path.display());
    Ok(config)
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default().save_to(path)?;
    println!("wrote {}", path.display());
    Ok(())
}

struct NarrateArgs {
    voice_sample: PathBuf,
    text_file: PathBuf,
    owner: i64,
    name: Option<String>,
    speaker_embedding: Option<PathBuf>,
}

fn read_embedding(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

async fn narrate(config: AppConfig, args: NarrateArgs, params: SynthesisParams) -> Result<()> {
    let NarrateArgs {
        voice_sample,
        text_file,
        owner,
        name,
        speaker_embedding,
    } = args;

    let sample = std::fs::read(&voice_sample)
        .with_context(|| format!("failed to read {}", voice_sample.display()))?;
    let text = std::fs::read_to_string(&text_file)
        .with_context(|| format!("failed to read {}", text_file.display()))?;
    let speaker_embedding = speaker_embedding.as_deref().map(read_embedding).transpose()?;
    let name = name.unwrap_or_else(|| {
        voice_sample
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "voice".into())
    });

    let store = Arc::new(FsObjectStore::from_config(&config.storage));
    let library = Arc::new(VoiceLibrary::new(
        Arc::new(InMemoryVoiceRepository::new()),
        store.clone(),
        &config.voice,
    ));
    let options = VoiceOptions {
        is_default: true,
        speaker_embedding,
    };
    let voice = library
        .register_with(owner, &name, &sample, options)
        .await
        .context("voice sample rejected")?;

    let service = NarrationService::new(
        Arc::new(InMemoryJobStore::new()),
        library,
        Arc::new(RemoteSynthesizer::from_config(&config.remote)),
        PipelineSettings::from_config(&config),
    );

    let handle = service
        .submit(SubmitRequest {
            text,
            voice_id: voice.voice_id,
            user_id: Some(owner),
            params,
        })
        .await?;
    let job_id = handle.id.clone();
    println!("job {job_id} queued");

    let mut ticker = tokio::time::interval(STATUS_POLL_INTERVAL);
    let mut last_progress = None;
    let view = loop {
        ticker.tick().await;
        let view = service
            .status(&job_id)
            .with_context(|| format!("job {job_id} disappeared"))?;
        if last_progress != Some(view.progress) {
            println!("[{:>3}%] {}", view.progress, view.status);
            last_progress = Some(view.progress);
        }
        if view.status.is_terminal() {
            break view;
        }
    };
    if let Err(e) = handle.wait().await {
        log::warn!("job {} task ended with: {} ({})", job_id, e, e.kind());
    }

    match view.status {
        JobStatus::Completed => {
            let file = store.path_for(&format!("audio/{job_id}.wav"))?;
            println!(
                "done: {} ({:.1}s) written to {}",
                view.audio_url.unwrap_or_default(),
                view.duration_secs.unwrap_or_default(),
                file.display()
            );
            Ok(())
        }
        _ => bail!(
            "narration failed ({}): {}",
            view.error_kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "unknown".into()),
            view.error.unwrap_or_default()
        ),
    }
}
