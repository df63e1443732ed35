//! TOML configuration with per-field defaults.
//!
//! A missing file is created with every default commented out; a file that
//! cannot be read or parsed is reported and the defaults are used.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use note_table::PlayMode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PianoError, Result};
use crate::game::ScorePolicy;

// ════════════════════════════════════════════════════════════════════════════
// Sections
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: PlayMode,
    /// Frame rate of the keyboard simulation and of paced file replay.
    #[serde(default = "EngineConfig::default_tick_hz")]
    pub tick_hz: u32,
}

impl EngineConfig {
    fn default_tick_hz() -> u32 {
        30
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: PlayMode::default(),
            tick_hz: Self::default_tick_hz(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Synthetic hands from held keys in the window.
    #[default]
    Keyboard,
    /// JSON landmark frames, one per line.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    /// Landmark feed path; absent or `-` reads stdin.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Hands reported below this confidence are dropped by the feed reader.
    /// 0.0 keeps every hand the detector reported.
    #[serde(default = "SourceConfig::default_min_confidence")]
    pub min_confidence: f32,
    /// Replay a feed file at `tick_hz` instead of as fast as it reads.
    #[serde(default = "SourceConfig::default_paced")]
    pub paced: bool,
}

impl SourceConfig {
    fn default_min_confidence() -> f32 {
        0.0
    }
    fn default_paced() -> bool {
        true
    }

    /// True when the feed comes from stdin.
    pub fn reads_stdin(&self) -> bool {
        match &self.path {
            None => true,
            Some(p) => p.as_os_str() == "-",
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            path: None,
            min_confidence: Self::default_min_confidence(),
            paced: Self::default_paced(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToneBackend {
    /// Commands are logged and discarded.
    #[default]
    None,
    /// Nearest MIDI note plus pitch bend on the first (or named) port.
    Midi,
    /// Square wave on the default audio device (`speaker` feature).
    Speaker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneConfig {
    #[serde(default)]
    pub backend: ToneBackend,
    /// Substring of the MIDI port name to prefer.
    #[serde(default)]
    pub midi_port: Option<String>,
    #[serde(default)]
    pub midi_channel: u8,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            backend: ToneBackend::default(),
            midi_port: None,
            midi_channel: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "GameConfig::default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "GameConfig::default_points")]
    pub points: u32,
    #[serde(default)]
    pub scoring: ScorePolicy,
    /// Fixed seed for a reproducible target sequence.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GameConfig {
    fn default_interval_ms() -> u64 {
        3_000
    }
    fn default_points() -> u32 {
        10
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: Self::default_interval_ms(),
            points: Self::default_points(),
            scoring: ScorePolicy::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Without a window the presenter logs snapshots instead.
    #[serde(default = "WindowConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,
}

impl WindowConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_title() -> String {
        "Hand Piano".to_string()
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            title: Self::default_title(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PianoConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PianoConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub tone: ToneConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

impl PianoConfig {
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => {
                        info!(path = %path.display(), "loaded config");
                        return cfg;
                    }
                    Err(err) => {
                        warn!(path = %path.display(), %err, "failed to parse config, using defaults");
                    }
                },
                Err(err) => {
                    warn!(path = %path.display(), %err, "failed to read config, using defaults");
                }
            }
            return Self::default();
        }

        // File does not exist: write commented defaults and return them.
        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                if let Err(err) = fs::write(path, comment_out(&text)) {
                    warn!(path = %path.display(), %err, "failed to write default config");
                }
            }
            Err(err) => warn!(%err, "failed to serialize default config"),
        }
        default_cfg
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=240).contains(&self.engine.tick_hz) {
            return Err(PianoError::Config(format!(
                "engine.tick_hz must be 1–240, got {}",
                self.engine.tick_hz
            )));
        }
        if !(0.0..=1.0).contains(&self.source.min_confidence) {
            return Err(PianoError::Config(format!(
                "source.min_confidence must be 0.0–1.0, got {}",
                self.source.min_confidence
            )));
        }
        if self.tone.midi_channel > 15 {
            return Err(PianoError::Config(format!(
                "tone.midi_channel must be 0–15, got {}",
                self.tone.midi_channel
            )));
        }
        if self.game.enabled && self.game.interval_ms == 0 {
            return Err(PianoError::Config("game.interval_ms must be > 0".to_string()));
        }
        if !self.window.enabled && self.source.kind == SourceKind::Keyboard {
            return Err(PianoError::Config(
                "the keyboard source needs the window; pass --input for headless runs".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prefix every key line with `# `, leaving section headers live.
fn comment_out(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
            out.push_str("# ");
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "hand_piano_config_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn load_or_default_writes_commented_defaults() {
        let path = unique_path("defaults.toml");
        let _ = fs::remove_file(&path);

        let cfg = PianoConfig::load_or_default(&path);
        assert!(path.exists(), "config file should be created");
        assert_eq!(cfg, PianoConfig::default());
        assert_eq!(cfg.game.interval_ms, 3_000);
        assert_eq!(cfg.game.points, 10);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[engine]"));
        assert!(contents.contains("# mode = \"single\""), "{}", contents);
        assert!(contents.contains("# interval_ms = 3000"), "{}", contents);

        // The commented file parses back to the defaults.
        let reread: PianoConfig = toml::from_str(&contents).unwrap();
        assert_eq!(reread, PianoConfig::default());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_or_default_reads_existing() {
        let path = unique_path("custom.toml");
        let text = r#"
            [engine]
            mode = "cooperative"
            tick_hz = 60

            [tone]
            backend = "midi"
            midi_channel = 3

            [game]
            enabled = true
            scoring = "once-per-target"
            seed = 7
        "#;
        fs::write(&path, text).unwrap();

        let cfg = PianoConfig::load_or_default(&path);
        assert_eq!(cfg.engine.mode, PlayMode::Cooperative);
        assert_eq!(cfg.engine.tick_hz, 60);
        assert_eq!(cfg.tone.backend, ToneBackend::Midi);
        assert_eq!(cfg.tone.midi_channel, 3);
        assert!(cfg.game.enabled);
        assert_eq!(cfg.game.scoring, ScorePolicy::OncePerTarget);
        assert_eq!(cfg.game.seed, Some(7));
        // Untouched fields keep their defaults.
        assert_eq!(cfg.game.interval_ms, 3_000);
        assert_eq!(cfg.source.min_confidence, 0.0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = unique_path("broken.toml");
        fs::write(&path, "[engine\nmode = ").unwrap();
        assert_eq!(PianoConfig::load_or_default(&path), PianoConfig::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = PianoConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.engine.tick_hz = 0;
        assert!(cfg.validate().is_err());
        cfg.engine.tick_hz = 30;

        cfg.tone.midi_channel = 16;
        assert!(cfg.validate().is_err());
        cfg.tone.midi_channel = 0;

        cfg.window.enabled = false;
        assert!(cfg.validate().is_err(), "keyboard source without a window");
        cfg.source.kind = SourceKind::Json;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn stdin_path_detection() {
        let mut src = SourceConfig::default();
        assert!(src.reads_stdin());
        src.path = Some(PathBuf::from("-"));
        assert!(src.reads_stdin());
        src.path = Some(PathBuf::from("hands.jsonl"));
        assert!(!src.reads_stdin());
    }
}
