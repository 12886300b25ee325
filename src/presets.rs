//! Built-in melodies that render without an input file

use crate::config::MidiConfig;
use crate::error::{MidiGenError, Result};
use crate::midi::{beats_to_ticks, parts_to_midi_bytes, MidiPart, NoteEvent};

/// A note placed on an absolute beat position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub pitch: u8,
    pub start_beats: f64,
    pub duration_beats: f64,
    pub velocity: u8,
}

/// A hardcoded single-track melody
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub track_name: &'static str,
    pub tempo_bpm: u32,
    pub time_signature: Option<(u8, u8)>,
    pub program: u8,
    pub channel: u8,
    pub notes: Vec<ScheduledNote>,
}

impl Preset {
    /// Default output file name
    pub fn file_name(&self) -> String {
        format!("{}.mid", self.name.replace('-', "_"))
    }

    /// Total length in beats
    pub fn length_beats(&self) -> f64 {
        self.notes
            .iter()
            .map(|n| n.start_beats + n.duration_beats)
            .fold(0.0, f64::max)
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }
}

/// Lay (pitch, beats) pairs end to end from `start`, returning the end beat
fn append_phrase(notes: &mut Vec<ScheduledNote>, start: f64, phrase: &[(u8, f64)], velocity: u8) -> f64 {
    let mut beat = start;
    for &(pitch, duration_beats) in phrase {
        notes.push(ScheduledNote {
            pitch,
            start_beats: beat,
            duration_beats,
            velocity,
        });
        beat += duration_beats;
    }
    beat
}

/// Descending four-bar synthwave lead with a syncopated rhythm
fn nightrun() -> Preset {
    let bars: [[u8; 4]; 4] = [
        [65, 64, 65, 62], // F4 E4 F4 D4
        [64, 62, 64, 60], // E4 D4 E4 C4
        [62, 60, 62, 58], // D4 C4 D4 Bb3
        [60, 58, 60, 57], // C4 Bb3 C4 A3
    ];
    let rhythm = [1.5, 0.5, 0.5, 1.5];

    let phrase: Vec<(u8, f64)> = bars
        .iter()
        .flatten()
        .copied()
        .zip(rhythm.iter().copied().cycle())
        .collect();
    let mut notes = Vec::new();
    append_phrase(&mut notes, 0.0, &phrase, 100);

    Preset {
        name: "nightrun",
        description: "Nightrun lead: 4 descending bars at 100 BPM",
        track_name: "Nightrun Lead",
        tempo_bpm: 100,
        time_signature: Some((4, 4)),
        program: 0,
        channel: 0,
        notes,
    }
}

/// Eighth-note arpeggio lead over Cm, Ab, Eb, Bb, played twice
fn melodic_lead() -> Preset {
    #[rustfmt::skip]
    const PHRASE: [u8; 64] = [
        60, 63, 67, 72, 67, 63, 60, 63,
        65, 68, 72, 75, 72, 68, 65, 60,
        68, 72, 75, 80, 75, 72, 68, 65,
        63, 67, 70, 75, 70, 67, 63, 60,
        63, 67, 70, 75, 70, 67, 63, 67,
        65, 68, 72, 77, 72, 68, 65, 60,
        70, 74, 77, 82, 77, 74, 70, 65,
        67, 70, 74, 79, 74, 70, 67, 63,
    ];

    let phrase: Vec<(u8, f64)> = PHRASE
        .iter()
        .chain(PHRASE.iter())
        .map(|p| (*p, 0.5))
        .collect();
    let mut notes = Vec::new();
    let end = append_phrase(&mut notes, 0.0, &phrase, 100);

    // big-note finish: G5 then Bb5
    append_phrase(&mut notes, end, &[(79, 2.0)], 110);
    append_phrase(&mut notes, end + 2.0, &[(82, 2.0)], 100);

    Preset {
        name: "melodic-lead",
        description: "80s melodic lead: 16 bars of eighth notes at 120 BPM",
        track_name: "80s Melodic Lead",
        tempo_bpm: 120,
        time_signature: None,
        program: 0,
        channel: 0,
        notes,
    }
}

/// Driving bass line over Cm, Ab, Eb, Bb with a busier last repeat
fn synth_bass() -> Preset {
    #[rustfmt::skip]
    const PATTERN: [(u8, f64); 20] = [
        // Cm
        (36, 1.0), (43, 0.5), (48, 0.5), (41, 0.5), (36, 0.5),
        // Ab
        (44, 1.0), (51, 0.5), (56, 0.5), (39, 0.5), (44, 0.5),
        // Eb
        (39, 1.0), (46, 0.5), (51, 0.5), (46, 0.5), (39, 0.5),
        // Bb
        (46, 0.75), (53, 0.25), (58, 0.5), (41, 0.5), (34, 1.0),
    ];
    #[rustfmt::skip]
    const VARIATION: [(u8, f64); 9] = [
        (46, 0.25), (53, 0.25), (58, 0.25), (53, 0.25),
        (51, 0.5), (48, 0.5), (46, 0.5), (43, 0.5),
        (36, 2.0),
    ];
    const VELOCITY: u8 = 105;

    let mut notes = Vec::new();
    let mut beat = 0.0;
    for _ in 0..3 {
        beat = append_phrase(&mut notes, beat, &PATTERN, VELOCITY);
    }
    beat = append_phrase(&mut notes, beat, &VARIATION, VELOCITY);

    // C3 on top of the final C2
    append_phrase(&mut notes, beat - 2.0, &[(48, 2.0)], 90);

    Preset {
        name: "synth-bass",
        description: "80s synth bass: 4-bar pattern x3 plus a fill at 118 BPM",
        track_name: "80s Synth Bass",
        tempo_bpm: 118,
        time_signature: None,
        program: 0,
        channel: 0,
        notes,
    }
}

/// All built-in presets
pub fn all_presets() -> Vec<Preset> {
    vec![nightrun(), melodic_lead(), synth_bass()]
}

pub fn preset_names() -> Vec<&'static str> {
    all_presets().iter().map(|p| p.name).collect()
}

/// Look up a preset by name (case-insensitive)
pub fn find_preset(name: &str) -> Result<Preset> {
    all_presets()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            MidiGenError::UnknownPreset(format!(
                "'{}' (available: {})",
                name,
                preset_names().join(", ")
            ))
        })
}

/// Convert a preset to an emission part
pub fn preset_part(preset: &Preset, ticks_per_beat: u16) -> MidiPart {
    let notes = preset
        .notes
        .iter()
        .map(|n| NoteEvent {
            pitch: n.pitch,
            start_tick: beats_to_ticks(n.start_beats, ticks_per_beat),
            duration_ticks: beats_to_ticks(n.duration_beats, ticks_per_beat),
            velocity: n.velocity,
        })
        .collect();

    MidiPart {
        name: preset.track_name.to_string(),
        channel: preset.channel,
        program: preset.program,
        time_signature: preset.time_signature,
        notes,
    }
}

/// Render a preset to MIDI bytes at its own tempo, or `tempo_override`
pub fn render_preset(preset: &Preset, midi: &MidiConfig, tempo_override: Option<u32>) -> Result<Vec<u8>> {
    let part = preset_part(preset, midi.ticks_per_beat);
    parts_to_midi_bytes(
        std::slice::from_ref(&part),
        tempo_override.unwrap_or(preset.tempo_bpm),
        midi.ticks_per_beat,
    )
}
