//! Track description files
//!
//! A track file holds optional `key: value` header lines followed by bars of
//! four note tokens each:
//!
//! ```text
//! name: Lead Synth
//! program: 81
//! rhythm: 1.5, 0.5, 0.5, 1.5
//! C4 E4 G4 B4
//! D4 F#4 A4 C5
//! E4 G#4 B4 D5
//! F4 A4 C5 E5
//! ```

use crate::config::{TrackDefaults, DRUM_CHANNEL, MIN_BARS, NOTES_PER_BAR};
use crate::error::{MidiGenError, Result};
use crate::note::note_to_midi;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Number of MIDI channels
pub const CHANNEL_COUNT: u8 = 16;

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\w+)\s*:\s*(.+)$").expect("static regex"))
}

fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[,\s]+").expect("static regex"))
}

/// Split on commas and whitespace, dropping empty pieces
fn split_values(text: &str) -> Vec<&str> {
    separator_pattern()
        .split(text)
        .filter(|v| !v.is_empty())
        .collect()
}

/// One bar: the tokens as written plus their decoded pitches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub tokens: Vec<String>,
    pub pitches: Vec<u8>,
}

/// A parsed track file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub name: String,
    pub source: PathBuf,
    pub program: u8,
    pub channel: u8,
    pub velocity: u8,
    /// Explicit rhythm from the file, if any
    pub rhythm: Option<[f64; 4]>,
    pub bars: Vec<Bar>,
}

impl TrackDescriptor {
    /// All pitches in bar order
    pub fn pitches(&self) -> Vec<u8> {
        self.bars.iter().flat_map(|b| b.pitches.iter().copied()).collect()
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn note_count(&self) -> usize {
        self.bars.iter().map(|b| b.pitches.len()).sum()
    }

    /// Rhythm used for playback: the file's own, or the default
    pub fn effective_rhythm(&self, defaults: &TrackDefaults) -> [f64; 4] {
        self.rhythm.unwrap_or(defaults.rhythm)
    }
}

fn parse_int_field(value: &str, field: &str, max: u8, context: &str) -> Result<u8> {
    let parsed: i64 = value.parse().map_err(|_| {
        MidiGenError::TrackFormat(format!(
            "{}: {} must be an integer, got '{}'",
            context, field, value
        ))
    })?;
    u8::try_from(parsed)
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| {
            MidiGenError::TrackFormat(format!(
                "{}: {} must be in 0..={}, got {}",
                context, field, max, parsed
            ))
        })
}

/// Parse a `rhythm:` value into four beat durations
pub fn parse_rhythm(value: &str) -> Result<[f64; 4]> {
    let parts = split_values(value);
    if parts.len() != NOTES_PER_BAR {
        return Err(MidiGenError::TrackFormat(format!(
            "Rhythm pattern must have {} values, got {}",
            NOTES_PER_BAR,
            parts.len()
        )));
    }

    let mut rhythm = [0.0; 4];
    for (slot, part) in rhythm.iter_mut().zip(&parts) {
        let beats: f64 = part.parse().map_err(|_| {
            MidiGenError::TrackFormat(format!(
                "Invalid rhythm values. Expected numbers, got: {:?}",
                parts
            ))
        })?;
        if !beats.is_finite() || beats < 0.0 {
            return Err(MidiGenError::TrackFormat(format!(
                "Rhythm values must be non-negative, got {}",
                part
            )));
        }
        *slot = beats;
    }
    Ok(rhythm)
}

/// Parse track text without touching the filesystem.
///
/// `base_name` is used when no `name:` header is present, `source` is only
/// recorded and used in error messages.
pub fn parse_track_str(
    text: &str,
    base_name: &str,
    source: &Path,
    default_channel: u8,
    defaults: &TrackDefaults,
) -> Result<TrackDescriptor> {
    let context = source.display().to_string();
    let mut track = TrackDescriptor {
        name: base_name.to_string(),
        source: source.to_path_buf(),
        program: defaults.program,
        channel: default_channel,
        velocity: defaults.velocity,
        rhythm: None,
        bars: Vec::new(),
    };

    let mut note_lines = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = header_pattern().captures(line) else {
            note_lines.push(line);
            continue;
        };
        let key = caps[1].to_lowercase();
        let value = caps[2].trim();

        match key.as_str() {
            "name" => track.name = value.to_string(),
            "program" => track.program = parse_int_field(value, "program", 127, &context)?,
            "channel" => {
                track.channel = parse_int_field(value, "channel", CHANNEL_COUNT - 1, &context)?
            }
            "velocity" => track.velocity = parse_int_field(value, "velocity", 127, &context)?,
            "rhythm" => {
                track.rhythm = Some(
                    parse_rhythm(value)
                        .map_err(|e| prefix_context(e, &context))?,
                )
            }
            // Unknown headers are treated as note lines
            _ => note_lines.push(line),
        }
    }

    if note_lines.len() < MIN_BARS {
        return Err(MidiGenError::TrackFormat(format!(
            "{}: Expected at least {} bars, got {}",
            context,
            MIN_BARS,
            note_lines.len()
        )));
    }

    for (bar_num, line) in note_lines.iter().enumerate() {
        let tokens = split_values(line);
        if tokens.len() != NOTES_PER_BAR {
            return Err(MidiGenError::TrackFormat(format!(
                "{}, bar {}: Expected {} notes, got {}",
                context,
                bar_num + 1,
                NOTES_PER_BAR,
                tokens.len()
            )));
        }
        let pitches = tokens
            .iter()
            .map(|t| note_to_midi(t))
            .collect::<Result<Vec<_>>>()?;
        track.bars.push(Bar {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            pitches,
        });
    }

    debug!(
        "Parsed track '{}' from {}: {} bars, ch {}, prog {}, vel {}",
        track.name,
        context,
        track.bars.len(),
        track.channel,
        track.program,
        track.velocity
    );

    Ok(track)
}

fn prefix_context(err: MidiGenError, context: &str) -> MidiGenError {
    match err {
        MidiGenError::TrackFormat(msg) => MidiGenError::TrackFormat(format!("{}: {}", context, msg)),
        other => other,
    }
}

/// Read and parse a track file
pub fn parse_track_file<P: AsRef<Path>>(
    path: P,
    default_channel: u8,
    defaults: &TrackDefaults,
) -> Result<TrackDescriptor> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MidiGenError::NotFound(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path)?;
    let base_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    parse_track_str(&text, &base_name, path, default_channel, defaults)
}

/// Resolve channel collisions in input order.
///
/// A track whose channel is already taken moves to the lowest free channel,
/// never the drum channel. Tracks without a collision keep their channel.
/// Fails when a colliding track has no free channel left.
pub fn assign_channels(tracks: &mut [TrackDescriptor]) -> Result<()> {
    let mut used = [false; CHANNEL_COUNT as usize];

    for track in tracks.iter_mut() {
        if used[usize::from(track.channel)] {
            let free = (0..CHANNEL_COUNT).find(|ch| *ch != DRUM_CHANNEL && !used[usize::from(*ch)]);
            match free {
                Some(ch) => {
                    debug!(
                        "Track '{}' moved from channel {} to {}",
                        track.name, track.channel, ch
                    );
                    track.channel = ch;
                }
                None => {
                    return Err(MidiGenError::TrackFormat(format!(
                        "No free MIDI channel for track '{}' (channel {} is taken)",
                        track.name, track.channel
                    )))
                }
            }
        }
        used[usize::from(track.channel)] = true;
    }
    Ok(())
}
