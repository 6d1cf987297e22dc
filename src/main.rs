use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use voxscribe::{AppState, Config, EngineFactory, SessionController};

#[derive(Parser)]
#[command(name = "voxscribe", version, about = "Live and file speech transcription service")]
struct Cli {
    /// Config file (TOML); the file and every key are optional
    #[arg(long, default_value = "config/voxscribe")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Host the HTTP control surface for a presentation shell
    Serve,
    /// Transcribe one audio file and print the finalized text
    Transcribe {
        /// Audio file (WAV, MP3, M4A, OGG, FLAC, ...)
        file: PathBuf,

        /// Gain override in [0.0, 2.0]
        #[arg(long)]
        gain: Option<f32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    // A missing or unloadable model is fatal here, before any surface is up.
    let engines = build_engine_factory(&cfg)?;

    let controller = Arc::new(SessionController::with_default_sources(
        cfg.session(),
        engines,
    ));

    match cli.command {
        Command::Serve => serve(cfg, controller).await,
        Command::Transcribe { file, gain } => transcribe(controller, file, gain).await,
    }
}

async fn serve(cfg: Config, controller: Arc<SessionController>) -> Result<()> {
    let app = voxscribe::create_router(AppState::new(controller));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);

    info!("{} listening on {}", cfg.service.name, addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn transcribe(
    controller: Arc<SessionController>,
    file: PathBuf,
    gain: Option<f32>,
) -> Result<()> {
    if let Some(gain) = gain {
        controller.set_gain(gain);
    }

    let report = controller.run_file(file).await?;
    for segment in &report.segments {
        println!("{}", segment.text);
    }
    info!("Transcript saved to {}", report.transcript_path);

    Ok(())
}

#[cfg(feature = "vosk")]
fn build_engine_factory(cfg: &Config) -> Result<Arc<dyn EngineFactory>> {
    let factory =
        voxscribe::stt::VoskEngineFactory::load(std::path::Path::new(&cfg.engine.model_path))?;
    Ok(Arc::new(factory))
}

#[cfg(not(feature = "vosk"))]
fn build_engine_factory(_cfg: &Config) -> Result<Arc<dyn EngineFactory>> {
    anyhow::bail!("this build carries no speech engine; rebuild with --features vosk")
}
