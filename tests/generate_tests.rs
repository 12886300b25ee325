//! End-to-end tests: track files in, MIDI and log files out

use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::fs;
use std::path::{Path, PathBuf};
use synthmidi::config::Config;
use synthmidi::{MidiGenError, MidiGenerator};
use tempfile::TempDir;

const FOUR_BARS: &str = "C4 E4 G4 B4\nD4 F#4 A4 C5\nE4 G#4 B4 D5\nF4 A4 C5 E5\n";
const BASS_BARS: &str = "C2 C2 G2 G2\nD2 D2 A2 A2\nE2 E2 B2 B2\nF2 F2 C3 C3\n";

fn write_track(dir: &Path, file_name: &str, contents: &str) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, contents).unwrap();
    path
}

/// Generator writing into `<dir>/out`
fn generator_in(dir: &Path) -> MidiGenerator {
    let mut config = Config::default();
    config.export.output_dir = dir.join("out");
    MidiGenerator::new(config)
}

fn tempo_events(track: &[midly::TrackEvent]) -> Vec<u32> {
    track
        .iter()
        .filter_map(|e| match e.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
            _ => None,
        })
        .collect()
}

fn channels(track: &[midly::TrackEvent]) -> Vec<u8> {
    let mut seen: Vec<u8> = track
        .iter()
        .filter_map(|e| match e.kind {
            TrackEventKind::Midi { channel, .. } => Some(channel.as_int()),
            _ => None,
        })
        .collect();
    seen.dedup();
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_tracks_keep_declared_channels() {
        let dir = TempDir::new().unwrap();
        let lead = write_track(dir.path(), "lead.txt", &format!("channel: 3\n{}", FOUR_BARS));
        let bass = write_track(
            dir.path(),
            "bass.txt",
            &format!("name: Bass\nprogram: 38\nchannel: 5\n{}", BASS_BARS),
        );

        let generator = generator_in(dir.path());
        let result = generator.generate(&[lead, bass], None, None).unwrap();

        assert_eq!(result.midi_path, dir.path().join("out/lead_multitrack.mid"));
        let bytes = fs::read(&result.midi_path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        assert_eq!(smf.header.format, Format::Parallel);
        assert!(matches!(smf.header.timing, Timing::Metrical(t) if t.as_int() == 480));
        assert_eq!(smf.tracks.len(), 2);
        assert_eq!(tempo_events(&smf.tracks[0]), vec![545_455]);
        assert!(tempo_events(&smf.tracks[1]).is_empty());
        assert_eq!(channels(&smf.tracks[0]), vec![3]);
        assert_eq!(channels(&smf.tracks[1]), vec![5]);
    }

    #[test]
    fn test_colliding_defaults_are_reassigned() {
        let dir = TempDir::new().unwrap();
        let a = write_track(dir.path(), "a.txt", &format!("channel: 1\n{}", FOUR_BARS));
        let b = write_track(dir.path(), "b.txt", FOUR_BARS); // defaults to channel 1

        let result = generator_in(dir.path()).generate(&[a, b], None, None).unwrap();
        let assigned: Vec<u8> = result.tracks.iter().map(|t| t.channel).collect();
        assert_eq!(assigned, vec![1, 0]);
    }

    #[test]
    fn test_event_stream_follows_rhythm() {
        let dir = TempDir::new().unwrap();
        let lead = write_track(dir.path(), "lead.txt", &format!("velocity: 100\n{}", FOUR_BARS));

        let result = generator_in(dir.path())
            .generate(&[lead], Some("song.mid"), Some(120))
            .unwrap();
        let bytes = fs::read(&result.midi_path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let track = &smf.tracks[0];

        assert_eq!(tempo_events(track), vec![500_000]);
        assert!(matches!(
            track[1].kind,
            TrackEventKind::Meta(MetaMessage::TrackName(name)) if name == b"lead"
        ));
        assert!(matches!(
            track[2].kind,
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                ..
            } if program.as_int() == 80
        ));

        let notes: Vec<(u32, MidiMessage)> = track
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. } => {
                        Some((e.delta.as_int(), message))
                    }
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(notes.len(), 32);

        let off_deltas: Vec<u32> = notes.iter().skip(1).step_by(2).map(|(d, _)| *d).collect();
        assert_eq!(&off_deltas[..8], &[720, 240, 240, 720, 720, 240, 240, 720]);
        assert!(notes.iter().step_by(2).all(|(d, _)| *d == 0));
        assert!(matches!(
            notes[0].1,
            MidiMessage::NoteOn { key, vel } if key.as_int() == 60 && vel.as_int() == 100
        ));
        assert!(matches!(
            notes[1].1,
            MidiMessage::NoteOff { key, vel } if key.as_int() == 60 && vel.as_int() == 0
        ));
        assert!(matches!(
            track.last().unwrap().kind,
            TrackEventKind::Meta(MetaMessage::EndOfTrack)
        ));
    }

    #[test]
    fn test_zero_beat_note_closes_before_next_note() {
        let dir = TempDir::new().unwrap();
        let bars = "C4 C4 C4 C4\n".repeat(4);
        let lead = write_track(dir.path(), "lead.txt", &format!("rhythm: 0, 1, 1, 1\n{}", bars));

        let result = generator_in(dir.path()).generate(&[lead], None, Some(120)).unwrap();
        let bytes = fs::read(&result.midi_path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        let stream: Vec<String> = smf.tracks[0]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { .. },
                    ..
                } => Some(format!("on+{}", e.delta.as_int())),
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { .. },
                    ..
                } => Some(format!("off+{}", e.delta.as_int())),
                _ => None,
            })
            .collect();
        assert_eq!(stream.len(), 32);
        assert_eq!(
            &stream[..8],
            &["on+0", "off+0", "on+0", "off+480", "on+0", "off+480", "on+0", "off+480"]
        );
        // every on is directly followed by its own off
        assert!(stream.iter().step_by(2).all(|s| s.starts_with("on")));
    }

    #[test]
    fn test_more_than_sixteen_tracks_rejected() {
        let dir = TempDir::new().unwrap();
        let inputs: Vec<PathBuf> = (0..17)
            .map(|i| write_track(dir.path(), &format!("t{i}.txt"), FOUR_BARS))
            .collect();

        let err = generator_in(dir.path()).generate(&inputs, None, None).unwrap_err();
        assert!(err.is_format_error());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_exhausted_channels_rejected() {
        let dir = TempDir::new().unwrap();
        // sixteen tracks all asking for channel 0 leave nothing for the last one
        let inputs: Vec<PathBuf> = (0..16)
            .map(|i| write_track(dir.path(), &format!("t{i}.txt"), &format!("channel: 0\n{}", FOUR_BARS)))
            .collect();

        let err = generator_in(dir.path()).generate(&inputs, None, None).unwrap_err();
        assert!(matches!(err, MidiGenError::TrackFormat(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_log_written_next_to_midi() {
        let dir = TempDir::new().unwrap();
        let lead = write_track(dir.path(), "lead.txt", FOUR_BARS);
        let bass = write_track(dir.path(), "bass.txt", BASS_BARS);

        let result = generator_in(dir.path())
            .generate(&[lead, bass], Some("night.mid"), None)
            .unwrap();
        let log_path = result.log_path.unwrap();
        assert_eq!(log_path, dir.path().join("out/night.log"));

        let log = fs::read_to_string(log_path).unwrap();
        assert!(log.contains("Output file : night.mid"));
        assert!(log.contains("Tempo       : 110 BPM"));
        assert!(log.contains("Tracks      : 2"));
        assert!(log.contains("--- Track 2: bass ---"));
        assert!(log.contains("  Source    : bass.txt"));
        assert!(log.contains("    Bar 4: F2 F2 C3 C3"));
        assert!(result.analysis_path.is_none());
    }

    #[test]
    fn test_analysis_json_export() {
        let dir = TempDir::new().unwrap();
        let lead = write_track(dir.path(), "lead.txt", FOUR_BARS);

        let mut config = Config::default();
        config.export.output_dir = dir.path().join("out");
        config.export.analysis_json = true;
        let result = MidiGenerator::new(config).generate(&[lead], None, None).unwrap();

        let json_path = result.analysis_path.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["output_file"], "lead.mid");
        assert_eq!(json["tracks"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_track_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let good = write_track(dir.path(), "good.txt", FOUR_BARS);
        let bad = write_track(dir.path(), "bad.txt", &format!("rhythm: 1,1,1\n{}", FOUR_BARS));

        let err = generator_in(dir.path()).generate(&[good, bad], None, None).unwrap_err();
        assert!(err.is_format_error());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_missing_input_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = generator_in(dir.path())
            .generate(&[dir.path().join("missing.txt")], None, None)
            .unwrap_err();
        assert!(matches!(err, MidiGenError::NotFound(_)));
    }

    #[test]
    fn test_preset_rendering() {
        let dir = TempDir::new().unwrap();
        let path = generator_in(dir.path()).render_preset("nightrun", None, None).unwrap();
        assert_eq!(path, dir.path().join("out/nightrun.mid"));

        let bytes = fs::read(&path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 1);
        assert_eq!(tempo_events(&smf.tracks[0]), vec![600_000]);
        assert!(smf.tracks[0].iter().any(|e| matches!(
            e.kind,
            TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8))
        )));
    }

    #[test]
    fn test_unknown_preset() {
        let dir = TempDir::new().unwrap();
        let err = generator_in(dir.path()).render_preset("vaporwave", None, None).unwrap_err();
        assert!(matches!(err, MidiGenError::UnknownPreset(_)));
    }
}
