//! Configuration system for the MIDI generator

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default tempo in beats per minute
pub const DEFAULT_TEMPO_BPM: u32 = 110;
/// MIDI resolution in ticks per quarter note
pub const TICKS_PER_BEAT: u16 = 480;
/// Default General MIDI program (Lead 1, square)
pub const DEFAULT_PROGRAM: u8 = 80;
/// Default note-on velocity
pub const DEFAULT_VELOCITY: u8 = 95;
/// Default syncopated rhythm: dotted quarter, eighth, eighth, dotted quarter
pub const DEFAULT_RHYTHM: [f64; 4] = [1.5, 0.5, 0.5, 1.5];
/// Channel reserved for percussion in General MIDI
pub const DRUM_CHANNEL: u8 = 9;
/// Number of notes in a bar
pub const NOTES_PER_BAR: usize = 4;
/// Minimum number of bars a track file must contain
pub const MIN_BARS: usize = 4;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub midi: MidiConfig,
    pub track_defaults: TrackDefaults,
    pub export: ExportConfig,
}

/// MIDI timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    pub tempo_bpm: u32,
    pub ticks_per_beat: u16,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            ticks_per_beat: TICKS_PER_BEAT,
        }
    }
}

/// Values applied when a track file omits a header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackDefaults {
    pub program: u8,
    pub velocity: u8,
    pub rhythm: [f64; 4],
}

impl Default for TrackDefaults {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM,
            velocity: DEFAULT_VELOCITY,
            rhythm: DEFAULT_RHYTHM,
        }
    }
}

/// Output artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub write_log: bool,
    pub analysis_json: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            write_log: true,
            analysis_json: false,
        }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.midi.tempo_bpm == 0 {
        anyhow::bail!("tempo_bpm must be > 0");
    }
    // Tempo meta events hold 24 bits of microseconds per quarter note
    if 60_000_000 / config.midi.tempo_bpm > 0x00FF_FFFF {
        anyhow::bail!("tempo_bpm {} is too slow to encode", config.midi.tempo_bpm);
    }

    // u15 in the SMF header
    if config.midi.ticks_per_beat == 0 || config.midi.ticks_per_beat > 0x7FFF {
        anyhow::bail!(
            "ticks_per_beat must be in 1..=32767, got {}",
            config.midi.ticks_per_beat
        );
    }

    let defaults = &config.track_defaults;
    if defaults.program > 127 {
        anyhow::bail!("track_defaults.program must be <= 127");
    }
    if defaults.velocity > 127 {
        anyhow::bail!("track_defaults.velocity must be <= 127");
    }
    if defaults.rhythm.iter().any(|v| !v.is_finite() || *v < 0.0) {
        anyhow::bail!("track_defaults.rhythm values must be finite and >= 0");
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
