//! Synthwave MIDI Generator
//!
//! Turns plain-text note descriptions (one file per track) into multi-track
//! MIDI files, and writes a log with the detected key and vibe of the music.

pub mod analysis;
pub mod config;
pub mod error;
pub mod midi;
pub mod note;
pub mod presets;
pub mod report;
pub mod track;

pub use config::Config;
pub use error::{MidiGenError, Result as MidiGenResult};
pub use track::TrackDescriptor;

use std::path::{Path, PathBuf};
use tracing::info;

/// Files produced by one generation run
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub tracks: Vec<TrackDescriptor>,
    pub tempo_bpm: u32,
    pub midi_path: PathBuf,
    pub log_path: Option<PathBuf>,
    pub analysis_path: Option<PathBuf>,
}

/// Main pipeline for text-to-MIDI generation
pub struct MidiGenerator {
    config: Config,
}

impl MidiGenerator {
    /// Create a new generator with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse every input file and resolve channel collisions.
    ///
    /// Each track's default channel is its input index, so at most 16 inputs
    /// are accepted.
    pub fn load_tracks<P: AsRef<Path>>(&self, inputs: &[P]) -> MidiGenResult<Vec<TrackDescriptor>> {
        if inputs.len() > usize::from(track::CHANNEL_COUNT) {
            return Err(MidiGenError::TrackFormat(format!(
                "At most {} tracks fit in a MIDI file, got {}",
                track::CHANNEL_COUNT,
                inputs.len()
            )));
        }

        let mut tracks = Vec::with_capacity(inputs.len());
        for (default_channel, input) in (0..track::CHANNEL_COUNT).zip(inputs) {
            tracks.push(track::parse_track_file(
                input,
                default_channel,
                &self.config.track_defaults,
            )?);
        }
        track::assign_channels(&mut tracks)?;
        Ok(tracks)
    }

    /// Parse inputs, then write the MIDI file and its companion artifacts.
    ///
    /// Nothing is written unless every input parses.
    pub fn generate<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        output_name: Option<&str>,
        tempo_bpm: Option<u32>,
    ) -> MidiGenResult<GenerationOutput> {
        let tracks = self.load_tracks(inputs)?;
        let tempo_bpm = tempo_bpm.unwrap_or(self.config.midi.tempo_bpm);
        let output_name = match output_name {
            Some(name) => name.to_string(),
            None => default_output_name(inputs)?,
        };

        let bytes = midi::tracks_to_midi_bytes(
            &tracks,
            tempo_bpm,
            &self.config.midi,
            &self.config.track_defaults,
        )?;
        // Analysis runs before anything touches the disk
        let analysis = report::build_analysis_report(
            &tracks,
            &output_name,
            tempo_bpm,
            &self.config.track_defaults,
        )?;

        let midi_path = self.config.export.output_dir.join(&output_name);
        midi::export_midi(&midi_path, &bytes)?;

        let log_path = if self.config.export.write_log {
            let path = midi_path.with_extension("log");
            report::write_report(
                &path,
                &tracks,
                &output_name,
                tempo_bpm,
                &self.config.track_defaults,
            )?;
            Some(path)
        } else {
            None
        };

        let analysis_path = if self.config.export.analysis_json {
            let path = midi_path.with_extension("json");
            report::export_analysis_json(&path, &analysis)?;
            Some(path)
        } else {
            None
        };

        info!(
            "Generated {} track(s) at {} BPM into {}",
            tracks.len(),
            tempo_bpm,
            midi_path.display()
        );

        Ok(GenerationOutput {
            tracks,
            tempo_bpm,
            midi_path,
            log_path,
            analysis_path,
        })
    }

    /// Render a built-in preset into the output directory
    pub fn render_preset(
        &self,
        name: &str,
        output_name: Option<&str>,
        tempo_bpm: Option<u32>,
    ) -> MidiGenResult<PathBuf> {
        let preset = presets::find_preset(name)?;
        let bytes = presets::render_preset(&preset, &self.config.midi, tempo_bpm)?;
        let file_name = output_name
            .map(str::to_string)
            .unwrap_or_else(|| preset.file_name());
        let path = self.config.export.output_dir.join(file_name);
        midi::export_midi(&path, &bytes)?;
        Ok(path)
    }
}

/// Output name derived from the first input: `<stem>.mid`, or
/// `<stem>_multitrack.mid` when there are several inputs
pub fn default_output_name<P: AsRef<Path>>(inputs: &[P]) -> MidiGenResult<String> {
    let first = inputs.first().ok_or_else(|| {
        MidiGenError::ConfigValidationFailed("at least one input file is required".to_string())
    })?;
    let stem = first
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    if inputs.len() > 1 {
        Ok(format!("{}_multitrack.mid", stem))
    } else {
        Ok(format!("{}.mid", stem))
    }
}

/// Check that every input file exists before doing any work
pub fn validate_inputs<P: AsRef<Path>>(inputs: &[P]) -> MidiGenResult<()> {
    if inputs.is_empty() {
        return Err(MidiGenError::ConfigValidationFailed(
            "at least one input file is required".to_string(),
        ));
    }
    for input in inputs {
        let path = input.as_ref();
        if !path.is_file() {
            return Err(MidiGenError::NotFound(path.to_path_buf()));
        }
    }
    Ok(())
}
