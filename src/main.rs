use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::info;

use levelscope::{
    app::{App, Playback},
    config::Settings,
    telemetry, ui,
};

/// Tone played when no file is given.
const DEFAULT_TONE_HZ: f32 = 1_000.0;

#[derive(Parser)]
#[command(name = "levelscope")]
#[command(about = "Real-time spectrum levels of whatever is playing")]
#[command(version = "0.1.0")]
struct Cli {
    /// Audio file to play; a sine test tone is played when omitted
    file: Option<PathBuf>,

    /// Test tone frequency in Hz
    #[arg(long, conflicts_with = "file")]
    tone: Option<f32>,

    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file; defaults to levelscope.log in the temp directory
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&telemetry::log_path(cli.log.as_deref()));

    let settings = Settings::load(cli.config.as_deref())?;
    let playback = match (cli.file, cli.tone) {
        (Some(path), _) => Playback::File(path),
        (None, tone) => Playback::Tone(tone.unwrap_or(DEFAULT_TONE_HZ)),
    };
    info!(?playback, block_size = settings.analyzer.block_size, "starting");

    let app = App::new(&settings, playback)?;
    ui::run(app, Duration::from_millis(settings.display.frame_ms))
}
