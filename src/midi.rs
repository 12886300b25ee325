//! MIDI export functionality
//!
//! Tracks become timed note events, which are written as a Format 1 SMF
//! through `midly`. The tempo meta event lives on the first track only.

use crate::config::{MidiConfig, TrackDefaults};
use crate::error::{MidiGenError, Result};
use crate::track::TrackDescriptor;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::Path;
use tracing::info;

/// Largest delta time a track event can carry
const MAX_DELTA: u32 = 0x0FFF_FFFF;
/// Largest tempo value (microseconds per quarter note)
const MAX_TEMPO_USPQ: u32 = 0x00FF_FFFF;

/// A single note ready for emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch: u8,
    pub start_tick: u32,
    pub duration_ticks: u32,
    pub velocity: u8,
}

/// Everything needed to write one MIDI track
#[derive(Debug, Clone, PartialEq)]
pub struct MidiPart {
    pub name: String,
    pub channel: u8,
    pub program: u8,
    /// (numerator, denominator), e.g. (4, 4)
    pub time_signature: Option<(u8, u8)>,
    pub notes: Vec<NoteEvent>,
}

/// Convert a duration in beats to ticks, truncating
pub fn beats_to_ticks(beats: f64, ticks_per_beat: u16) -> u32 {
    (beats * f64::from(ticks_per_beat)) as u32
}

/// Convert BPM to microseconds per quarter note, rounded
pub fn bpm_to_tempo(bpm: u32) -> Result<u32> {
    if bpm == 0 {
        return Err(MidiGenError::MidiExport("tempo must be > 0 BPM".to_string()));
    }
    let uspq = (60_000_000.0 / f64::from(bpm)).round() as u32;
    if uspq > MAX_TEMPO_USPQ {
        return Err(MidiGenError::MidiExport(format!(
            "tempo {} BPM is too slow to encode",
            bpm
        )));
    }
    Ok(uspq)
}

/// Lay out a track's notes back to back, cycling the rhythm once per bar
pub fn track_note_events(
    track: &TrackDescriptor,
    defaults: &TrackDefaults,
    ticks_per_beat: u16,
) -> Vec<NoteEvent> {
    let rhythm = track.effective_rhythm(defaults);
    let mut tick = 0u32;

    track
        .pitches()
        .into_iter()
        .zip(rhythm.iter().cycle())
        .map(|(pitch, beats)| {
            let duration_ticks = beats_to_ticks(*beats, ticks_per_beat);
            let event = NoteEvent {
                pitch,
                start_tick: tick,
                duration_ticks,
                velocity: track.velocity,
            };
            tick = tick.saturating_add(duration_ticks);
            event
        })
        .collect()
}

/// Build the emission part for a parsed track
pub fn track_part(track: &TrackDescriptor, defaults: &TrackDefaults, ticks_per_beat: u16) -> MidiPart {
    MidiPart {
        name: track.name.clone(),
        channel: track.channel,
        program: track.program,
        time_signature: None,
        notes: track_note_events(track, defaults, ticks_per_beat),
    }
}

fn midi_event<'a>(delta: u32, channel: u8, message: MidiMessage) -> TrackEvent<'a> {
    TrackEvent {
        delta: u28::from(delta),
        kind: TrackEventKind::Midi {
            channel: u4::from(channel),
            message,
        },
    }
}

fn meta_event(kind: MetaMessage<'_>) -> TrackEvent<'_> {
    TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(kind),
    }
}

/// Schedule note-on/note-off pairs on absolute ticks and emit them with deltas.
///
/// At equal ticks note-offs come before note-ons, except the off of a
/// zero-length note, which follows its own on directly.
fn note_track_events<'a>(part: &MidiPart) -> Result<Vec<TrackEvent<'a>>> {
    // (tick, rank, sequence, on/off, message)
    let mut scheduled: Vec<(u32, u8, usize, u8, MidiMessage)> =
        Vec::with_capacity(part.notes.len() * 2);
    for (seq, note) in part.notes.iter().enumerate() {
        let end_tick = note.start_tick.checked_add(note.duration_ticks).ok_or_else(|| {
            MidiGenError::MidiExport(format!("note {} in '{}' ends too late", seq + 1, part.name))
        })?;
        scheduled.push((
            note.start_tick,
            1,
            seq,
            0,
            MidiMessage::NoteOn {
                key: u7::from(note.pitch),
                vel: u7::from(note.velocity),
            },
        ));
        // a zero-length off shares its on's rank so nothing lands between them
        let off_rank = if note.duration_ticks == 0 { 1 } else { 0 };
        scheduled.push((
            end_tick,
            off_rank,
            seq,
            1,
            MidiMessage::NoteOff {
                key: u7::from(note.pitch),
                vel: u7::from(0),
            },
        ));
    }
    scheduled.sort_by_key(|(tick, rank, seq, phase, _)| (*tick, *rank, *seq, *phase));

    let mut events = Vec::with_capacity(scheduled.len());
    let mut current_tick = 0u32;
    for (tick, _, _, _, message) in scheduled {
        let delta = tick - current_tick;
        if delta > MAX_DELTA {
            return Err(MidiGenError::MidiExport(format!(
                "gap of {} ticks in '{}' exceeds the MIDI delta limit",
                delta, part.name
            )));
        }
        current_tick = tick;
        events.push(midi_event(delta, part.channel, message));
    }
    Ok(events)
}

/// Build an in-memory SMF from emission parts
pub fn build_smf<'a>(parts: &'a [MidiPart], tempo_bpm: u32, ticks_per_beat: u16) -> Result<Smf<'a>> {
    let tempo_uspq = bpm_to_tempo(tempo_bpm)?;
    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(u15::from(ticks_per_beat)),
    };

    let mut tracks = Vec::with_capacity(parts.len());
    for (index, part) in parts.iter().enumerate() {
        if part.notes.iter().any(|n| n.pitch > 127 || n.velocity > 127) || part.channel > 15 {
            return Err(MidiGenError::MidiExport(format!(
                "track '{}' has values outside the MIDI range",
                part.name
            )));
        }

        let mut events = Vec::new();

        if index == 0 {
            events.push(meta_event(MetaMessage::Tempo(u24::from(tempo_uspq))));
        }

        events.push(meta_event(MetaMessage::TrackName(part.name.as_bytes())));

        if let Some((numerator, denominator)) = part.time_signature {
            // MIDI stores the denominator as a power of two
            let denominator_log2 = denominator.max(1).ilog2() as u8;
            events.push(meta_event(MetaMessage::TimeSignature(
                numerator,
                denominator_log2,
                24, // MIDI clocks per metronome click
                8,  // 32nd notes per quarter note
            )));
        }

        events.push(midi_event(
            0,
            part.channel,
            MidiMessage::ProgramChange {
                program: u7::from(part.program.min(127)),
            },
        ));

        events.extend(note_track_events(part)?);
        events.push(meta_event(MetaMessage::EndOfTrack));
        tracks.push(events);
    }

    Ok(Smf { header, tracks })
}

/// Serialize emission parts to MIDI file bytes
pub fn parts_to_midi_bytes(parts: &[MidiPart], tempo_bpm: u32, ticks_per_beat: u16) -> Result<Vec<u8>> {
    let smf = build_smf(parts, tempo_bpm, ticks_per_beat)?;
    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| MidiGenError::MidiExport(format!("Failed to write MIDI data: {:?}", e)))?;
    Ok(bytes)
}

/// Serialize parsed tracks to MIDI file bytes
pub fn tracks_to_midi_bytes(
    tracks: &[TrackDescriptor],
    tempo_bpm: u32,
    midi: &MidiConfig,
    defaults: &TrackDefaults,
) -> Result<Vec<u8>> {
    let parts: Vec<MidiPart> = tracks
        .iter()
        .map(|t| track_part(t, defaults, midi.ticks_per_beat))
        .collect();
    parts_to_midi_bytes(&parts, tempo_bpm, midi.ticks_per_beat)
}

/// Write MIDI bytes to disk, creating the parent directory if needed
pub fn export_midi(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    info!("Wrote {} bytes of MIDI to {}", bytes.len(), path.display());
    Ok(())
}
