//! hand_piano — entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use note_table::PlayMode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hand_piano::app::{run, StopReason};
use hand_piano::config::{PianoConfig, SourceKind, ToneBackend};
use hand_piano::snapshot::SharedState;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to config TOML
    #[arg(long, default_value = "hand_piano.toml")]
    config: PathBuf,

    /// Play mode: single | cooperative (overrides config)
    #[arg(long)]
    mode: Option<PlayMode>,

    /// Enable the note-matching game (overrides config)
    #[arg(long, default_value_t = false)]
    game: bool,

    /// Tone backend (overrides config)
    #[arg(long, value_parser = parse_backend)]
    tone: Option<ToneBackend>,

    /// Read hand landmarks from a JSON-lines file, or `-` for stdin
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Run without the window; requires --input
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Seed for the game's target sequence
    #[arg(long)]
    seed: Option<u64>,

    /// Log every tick
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_backend(s: &str) -> std::result::Result<ToneBackend, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "none"    => Ok(ToneBackend::None),
        "midi"    => Ok(ToneBackend::Midi),
        "speaker" => Ok(ToneBackend::Speaker),
        other     => Err(format!("unknown tone backend '{}' (none | midi | speaker)", other)),
    }
}

impl Args {
    fn apply(&self, config: &mut PianoConfig) {
        if let Some(mode) = self.mode {
            config.engine.mode = mode;
        }
        if self.game {
            config.game.enabled = true;
        }
        if let Some(seed) = self.seed {
            config.game.seed = Some(seed);
        }
        if let Some(backend) = self.tone {
            config.tone.backend = backend;
        }
        if let Some(path) = &self.input {
            config.source.kind = SourceKind::Json;
            config.source.path = Some(path.clone());
        }
        if self.headless {
            config.window.enabled = false;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║          Hand Piano — count fingers, play notes      ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut config = PianoConfig::load_or_default(&args.config);
    args.apply(&mut config);
    info!(
        mode = %config.engine.mode,
        game = config.game.enabled,
        tone = ?config.tone.backend,
        source = ?config.source.kind,
        "starting"
    );

    let shared = Arc::new(SharedState::new());
    let for_ctrlc = Arc::clone(&shared);
    ctrlc::set_handler(move || {
        // A second Ctrl-C gets out of a tick loop blocked on input.  The
        // ordered cleanup never runs, so cut the tone here.
        if for_ctrlc.quit_requested() {
            for_ctrlc.hard_stop();
            std::process::exit(130);
        }
        for_ctrlc.request_quit();
    })
    .context("failed to install Ctrl-C handler")?;

    let reason = run(&config, Arc::clone(&shared)).context("hand piano failed")?;
    let final_score = shared.snapshot().score;

    match &reason {
        StopReason::Quit => info!("quit"),
        StopReason::SourceFailed(e) if !reason.is_error() => info!(reason = %e, "hand source ended"),
        StopReason::SourceFailed(e) => error!(error = %e, "hand source failed"),
    }
    if config.game.enabled {
        println!("\n  Final score: {}\n", final_score);
    }

    if reason.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
