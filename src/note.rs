//! Note name codec: "C4", "D#5", "Bb3" to MIDI pitch numbers and back

use crate::error::{MidiGenError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Canonical sharp-spelled pitch class names, indexed by pitch class
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Highest valid MIDI pitch
pub const MAX_PITCH: u8 = 127;

fn note_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Ga-g])([#b]?)(\d)$").expect("static regex"))
}

/// Semitone offset of a natural note letter from C
fn letter_offset(letter: char) -> i32 {
    match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        _ => 11, // B; the pattern admits nothing else
    }
}

/// Convert a note token (e.g. "C4", "D#5", "Bb3") to a MIDI pitch.
///
/// C4 is middle C (60). Tokens whose pitch falls outside 0..=127 (such as
/// "A9") are rejected along with malformed ones.
pub fn note_to_midi(token: &str) -> Result<u8> {
    let token = token.trim();
    let caps = note_pattern()
        .captures(token)
        .ok_or_else(|| MidiGenError::InvalidNoteFormat(token.to_string()))?;

    let letter = caps[1].chars().next().unwrap_or('C');
    let octave: i32 = caps[3]
        .parse()
        .map_err(|_| MidiGenError::InvalidNoteFormat(token.to_string()))?;

    let mut pitch = (octave + 1) * 12 + letter_offset(letter);
    match &caps[2] {
        "#" => pitch += 1,
        "b" => pitch -= 1,
        _ => {}
    }

    u8::try_from(pitch)
        .ok()
        .filter(|p| *p <= MAX_PITCH)
        .ok_or_else(|| MidiGenError::InvalidNoteFormat(token.to_string()))
}

/// Convert a MIDI pitch back to a sharp-spelled note name (60 -> "C4").
///
/// Flats are never produced: 58 is always "A#3", even if it was written "Bb3".
pub fn midi_to_note_name(pitch: u8) -> String {
    let octave = i32::from(pitch / 12) - 1;
    format!("{}{}", pitch_class_name(pitch), octave)
}

/// Canonical name of a pitch's pitch class
pub fn pitch_class_name(pitch: u8) -> &'static str {
    PITCH_CLASS_NAMES[usize::from(pitch % 12)]
}
