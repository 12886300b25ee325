//! Error types for the MIDI generator

use std::fmt;
use std::path::PathBuf;

/// Custom error type for MIDI generation
#[derive(Debug, Clone)]
pub enum MidiGenError {
    /// E001: Input file does not exist
    NotFound(PathBuf),
    /// E002: Note token is malformed or outside the MIDI pitch range
    InvalidNoteFormat(String),
    /// E003: Track file is malformed (rhythm, bar count, header values)
    TrackFormat(String),
    /// E004: Analysis requested on an empty melody
    EmptyMelody,
    /// E005: Configuration validation failed
    ConfigValidationFailed(String),
    /// E006: File I/O error
    Io(String),
    /// E007: MIDI export error
    MidiExport(String),
    /// E008: Analysis export error
    AnalysisExport(String),
    /// E009: Requested preset does not exist
    UnknownPreset(String),
}

impl MidiGenError {
    /// True for errors caused by malformed track input
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            MidiGenError::InvalidNoteFormat(_) | MidiGenError::TrackFormat(_)
        )
    }
}

impl fmt::Display for MidiGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiGenError::NotFound(path) => {
                write!(f, "E001: File not found: {}", path.display())
            }
            MidiGenError::InvalidNoteFormat(token) => {
                write!(
                    f,
                    "E002: Invalid note format: '{}'. Expected format: C4, D#5, Bb3, etc.",
                    token
                )
            }
            MidiGenError::TrackFormat(msg) => {
                write!(f, "E003: {}", msg)
            }
            MidiGenError::EmptyMelody => {
                write!(f, "E004: Cannot analyze an empty melody")
            }
            MidiGenError::ConfigValidationFailed(msg) => {
                write!(f, "E005: Configuration validation failed - {}", msg)
            }
            MidiGenError::Io(msg) => {
                write!(f, "E006: File I/O error - {}", msg)
            }
            MidiGenError::MidiExport(msg) => {
                write!(f, "E007: MIDI export error - {}", msg)
            }
            MidiGenError::AnalysisExport(msg) => {
                write!(f, "E008: Analysis export error - {}", msg)
            }
            MidiGenError::UnknownPreset(name) => {
                write!(f, "E009: Unknown preset {}", name)
            }
        }
    }
}

impl std::error::Error for MidiGenError {}

impl From<std::io::Error> for MidiGenError {
    fn from(err: std::io::Error) -> Self {
        MidiGenError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MidiGenError {
    fn from(err: serde_json::Error) -> Self {
        MidiGenError::AnalysisExport(format!("JSON serialization error: {}", err))
    }
}

impl From<anyhow::Error> for MidiGenError {
    fn from(err: anyhow::Error) -> Self {
        MidiGenError::ConfigValidationFailed(err.to_string())
    }
}

/// Result type alias for MIDI generation
pub type Result<T> = std::result::Result<T, MidiGenError>;
