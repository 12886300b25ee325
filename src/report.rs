//! Text log and JSON analysis output

use crate::analysis::{analyze, detect_scale, MelodyAnalysis, ScaleDetection};
use crate::config::TrackDefaults;
use crate::error::{MidiGenError, Result};
use crate::track::TrackDescriptor;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::Path;
use tracing::info;

/// Per-track section of the analysis export
#[derive(Debug, Clone, Serialize)]
pub struct TrackAnalysis {
    pub name: String,
    pub source: String,
    pub program: u8,
    pub channel: u8,
    pub velocity: u8,
    pub bars: usize,
    pub notes: usize,
    pub rhythm: [f64; 4],
    pub root: String,
    pub scale: String,
    pub detection: ScaleDetection,
}

/// Analysis of a whole multi-track render
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub version: String,
    pub output_file: String,
    pub tempo_bpm: u32,
    pub root: String,
    pub scale: String,
    pub vibe: String,
    pub pitch_classes: Vec<String>,
    pub overall: MelodyAnalysis,
    pub tracks: Vec<TrackAnalysis>,
}

/// Analyze every track and the concatenation of all their notes
pub fn build_analysis_report(
    tracks: &[TrackDescriptor],
    output_file: &str,
    tempo_bpm: u32,
    defaults: &TrackDefaults,
) -> Result<AnalysisReport> {
    let all_pitches: Vec<u8> = tracks.iter().flat_map(|t| t.pitches()).collect();
    let overall = analyze(&all_pitches)?;

    let track_sections = tracks
        .iter()
        .map(|t| {
            let detection = detect_scale(&t.pitches())?;
            Ok(TrackAnalysis {
                name: t.name.clone(),
                source: source_name(t),
                program: t.program,
                channel: t.channel,
                velocity: t.velocity,
                bars: t.bar_count(),
                notes: t.note_count(),
                rhythm: t.effective_rhythm(defaults),
                root: detection.root_name().to_string(),
                scale: detection.scale_name().to_string(),
                detection,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AnalysisReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        output_file: output_file.to_string(),
        tempo_bpm,
        root: overall.detection.root_name().to_string(),
        scale: overall.detection.scale_name().to_string(),
        vibe: overall.vibe.label().to_string(),
        pitch_classes: overall
            .detection
            .pitch_class_names()
            .into_iter()
            .map(String::from)
            .collect(),
        overall,
        tracks: track_sections,
    })
}

fn source_name(track: &TrackDescriptor) -> String {
    track
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Render the human-readable log
pub fn render_report(
    tracks: &[TrackDescriptor],
    output_file: &str,
    tempo_bpm: u32,
    defaults: &TrackDefaults,
) -> Result<String> {
    let report = build_analysis_report(tracks, output_file, tempo_bpm, defaults)?;
    render_analysis(&report, tracks)
}

fn render_analysis(report: &AnalysisReport, tracks: &[TrackDescriptor]) -> Result<String> {
    let mut out = String::new();
    write_analysis(&mut out, report, tracks)
        .map_err(|e| MidiGenError::AnalysisExport(format!("Failed to render log: {}", e)))?;
    Ok(out)
}

fn write_analysis(out: &mut String, report: &AnalysisReport, tracks: &[TrackDescriptor]) -> fmt::Result {
    writeln!(out, "=== Synthwave Multi-Track MIDI Generator - Log ===\n")?;
    writeln!(out, "Output file : {}", report.output_file)?;
    writeln!(out, "Tempo       : {} BPM", report.tempo_bpm)?;
    writeln!(out, "Tracks      : {}", report.tracks.len())?;
    writeln!(out, "Root key    : {}", report.root)?;
    writeln!(out, "Scale       : {} {}", report.root, report.scale)?;
    writeln!(out, "Vibe        : {}", report.vibe)?;
    writeln!(out, "Pitch classes used: {}", report.pitch_classes.join(", "))?;

    for (idx, (section, track)) in report.tracks.iter().zip(tracks).enumerate() {
        writeln!(out, "\n--- Track {}: {} ---", idx + 1, section.name)?;
        writeln!(out, "  Source    : {}", section.source)?;
        writeln!(out, "  Program   : {}", section.program)?;
        writeln!(out, "  Channel   : {}", section.channel)?;
        writeln!(out, "  Velocity  : {}", section.velocity)?;
        writeln!(out, "  Bars      : {}", section.bars)?;
        writeln!(out, "  Notes     : {}", section.notes)?;
        writeln!(out, "  Rhythm    : {:?}", section.rhythm)?;
        writeln!(out, "  Scale     : {} {}", section.root, section.scale)?;
        writeln!(out, "  Notes per bar:")?;
        for (i, bar) in track.bars.iter().enumerate() {
            writeln!(out, "    Bar {}: {}  {:?}", i + 1, bar.tokens.join(" "), bar.pitches)?;
        }
    }

    Ok(())
}

/// Render and write the log file
pub fn write_report(
    path: &Path,
    tracks: &[TrackDescriptor],
    output_file: &str,
    tempo_bpm: u32,
    defaults: &TrackDefaults,
) -> Result<()> {
    let text = render_report(tracks, output_file, tempo_bpm, defaults)?;
    std::fs::write(path, text)?;
    info!("Wrote log to {}", path.display());
    Ok(())
}

/// Write the analysis as pretty JSON
pub fn export_analysis_json(path: &Path, report: &AnalysisReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    info!("Exported analysis results to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::parse_track_str;

    fn lead() -> TrackDescriptor {
        parse_track_str(
            "name: Lead\nC4 E4 G4 B4\nD4 F#4 A4 C5\nE4 G#4 B4 D5\nF4 A4 C5 E5\n",
            "lead",
            Path::new("songs/lead.txt"),
            0,
            &TrackDefaults::default(),
        )
        .unwrap()
    }

    #[test]
    fn log_lists_header_and_bars() {
        let text = render_report(&[lead()], "lead.mid", 110, &TrackDefaults::default()).unwrap();
        assert!(text.starts_with("=== Synthwave Multi-Track MIDI Generator - Log ===\n\n"));
        assert!(text.contains("Output file : lead.mid\n"));
        assert!(text.contains("Tempo       : 110 BPM\n"));
        assert!(text.contains("Tracks      : 1\n"));
        assert!(text.contains("--- Track 1: Lead ---"));
        assert!(text.contains("  Source    : lead.txt\n"));
        assert!(text.contains("  Rhythm    : [1.5, 0.5, 0.5, 1.5]\n"));
        assert!(text.contains("    Bar 2: D4 F#4 A4 C5  [62, 66, 69, 72]\n"));
    }

    #[test]
    fn json_report_carries_overall_and_tracks() {
        let report = build_analysis_report(&[lead()], "lead.mid", 110, &TrackDefaults::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tempo_bpm"], 110);
        assert_eq!(json["tracks"][0]["notes"], 16);
        assert_eq!(json["root"], report.overall.detection.root_name());
        assert_eq!(json["vibe"], report.overall.vibe.label());
    }
}
