//! Key and mood analysis
//!
//! Guesses the root and scale of a melody by brute-force scoring every
//! (root, scale) pair, then derives a mood label from the scale family and
//! a few pitch statistics.

use crate::error::{MidiGenError, Result};
use crate::note::PITCH_CLASS_NAMES;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Score penalty per melody pitch class outside the scale
const OUTSIDE_PENALTY: i32 = 2;
/// Bonus when the root is the melody's first pitch class
const FIRST_NOTE_BONUS: i32 = 3;
/// Bonus when the root is the melody's last pitch class
const LAST_NOTE_BONUS: i32 = 2;
/// Bonus when the root is the most frequent pitch class
const MOST_FREQUENT_BONUS: i32 = 1;
/// Bonus per bar downbeat landing on the root
const DOWNBEAT_BONUS: i32 = 1;
/// Notes per bar when locating downbeats
const BAR_LENGTH: usize = 4;

/// Scale template catalog. Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Major,
    NaturalMinor,
    HarmonicMinor,
    MelodicMinor,
    Dorian,
    Mixolydian,
    PentatonicMajor,
    PentatonicMinor,
}

impl Scale {
    pub const ALL: [Scale; 8] = [
        Scale::Major,
        Scale::NaturalMinor,
        Scale::HarmonicMinor,
        Scale::MelodicMinor,
        Scale::Dorian,
        Scale::Mixolydian,
        Scale::PentatonicMajor,
        Scale::PentatonicMinor,
    ];

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Scale::Major => "major",
            Scale::NaturalMinor => "natural minor",
            Scale::HarmonicMinor => "harmonic minor",
            Scale::MelodicMinor => "melodic minor",
            Scale::Dorian => "dorian",
            Scale::Mixolydian => "mixolydian",
            Scale::PentatonicMajor => "pentatonic major",
            Scale::PentatonicMinor => "pentatonic minor",
        }
    }

    /// Semitone intervals from the root
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Scale::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::PentatonicMajor => &[0, 2, 4, 7, 9],
            Scale::PentatonicMinor => &[0, 3, 5, 7, 10],
        }
    }

    /// Whether the scale counts as minor for mood classification.
    /// Dorian is deliberately absent.
    pub fn is_minor(&self) -> bool {
        matches!(
            self,
            Scale::NaturalMinor
                | Scale::HarmonicMinor
                | Scale::MelodicMinor
                | Scale::PentatonicMinor
        )
    }

    /// Look up a scale by its human-readable name
    pub fn from_name(name: &str) -> Option<Scale> {
        Scale::ALL.iter().copied().find(|s| s.name() == name)
    }

    fn contains(&self, interval: u8) -> bool {
        self.intervals().contains(&interval)
    }
}

impl std::fmt::Display for Scale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mood label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vibe {
    DarkAndMoody,
    DramaticAndIntense,
    MelancholicAndAtmospheric,
    EnergeticAndUplifting,
    ExpansiveAndCinematic,
    BrightAndDreamy,
    WarmAndGroovy,
}

impl Vibe {
    pub fn label(&self) -> &'static str {
        match self {
            Vibe::DarkAndMoody => "Dark and moody",
            Vibe::DramaticAndIntense => "Dramatic and intense",
            Vibe::MelancholicAndAtmospheric => "Melancholic and atmospheric",
            Vibe::EnergeticAndUplifting => "Energetic and uplifting",
            Vibe::ExpansiveAndCinematic => "Expansive and cinematic",
            Vibe::BrightAndDreamy => "Bright and dreamy",
            Vibe::WarmAndGroovy => "Warm and groovy",
        }
    }
}

impl std::fmt::Display for Vibe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of scale detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDetection {
    /// Root pitch class, 0..12
    pub root: u8,
    pub scale: Scale,
    pub score: i32,
    /// Distinct pitch classes present, ascending
    pub pitch_classes: Vec<u8>,
}

impl ScaleDetection {
    pub fn root_name(&self) -> &'static str {
        PITCH_CLASS_NAMES[usize::from(self.root)]
    }

    pub fn scale_name(&self) -> &'static str {
        self.scale.name()
    }

    pub fn pitch_class_names(&self) -> Vec<&'static str> {
        self.pitch_classes
            .iter()
            .map(|pc| PITCH_CLASS_NAMES[usize::from(*pc)])
            .collect()
    }
}

/// Melody-wide statistics feeding the mood classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelodyStats {
    pub range: u8,
    pub mean_pitch: f64,
    pub mean_jump: f64,
}

/// Tonal anchors that earn a candidate root bonus points
struct Anchors {
    first: u8,
    last: u8,
    most_frequent: u8,
    downbeats: Vec<u8>,
}

impl Anchors {
    fn from_pitches(pitches: &[u8]) -> Result<Self> {
        let (first, last) = match (pitches.first(), pitches.last()) {
            (Some(f), Some(l)) => (f % 12, l % 12),
            _ => return Err(MidiGenError::EmptyMelody),
        };

        // Ties go to the pitch class heard first
        let mut counts = [0usize; 12];
        let mut first_seen = Vec::with_capacity(12);
        for p in pitches {
            let pc = usize::from(p % 12);
            if counts[pc] == 0 {
                first_seen.push(pc);
            }
            counts[pc] += 1;
        }
        let mut most_frequent = first_seen[0];
        for &pc in &first_seen[1..] {
            if counts[pc] > counts[most_frequent] {
                most_frequent = pc;
            }
        }

        let downbeats = pitches.iter().step_by(BAR_LENGTH).map(|p| p % 12).collect();

        Ok(Self {
            first,
            last,
            most_frequent: most_frequent as u8,
            downbeats,
        })
    }

    fn bonus(&self, root: u8) -> i32 {
        let mut bonus = 0;
        if root == self.first {
            bonus += FIRST_NOTE_BONUS;
        }
        if root == self.last {
            bonus += LAST_NOTE_BONUS;
        }
        if root == self.most_frequent {
            bonus += MOST_FREQUENT_BONUS;
        }
        let downbeat_hits = self.downbeats.iter().filter(|pc| **pc == root).count() as i32;
        bonus + downbeat_hits * DOWNBEAT_BONUS
    }
}

/// Distinct pitch classes of a melody, ascending
pub fn pitch_class_set(pitches: &[u8]) -> Vec<u8> {
    let mut present = [false; 12];
    for p in pitches {
        present[usize::from(p % 12)] = true;
    }
    (0..12u8).filter(|pc| present[usize::from(*pc)]).collect()
}

/// Score a single (root, scale) candidate against a pitch class set
fn fit_score(pitch_classes: &[u8], root: u8, scale: Scale) -> i32 {
    let (mut matches, mut outside) = (0, 0);
    for pc in pitch_classes {
        if scale.contains((pc + 12 - root) % 12) {
            matches += 1;
        } else {
            outside += 1;
        }
    }
    matches - OUTSIDE_PENALTY * outside
}

/// Detect the most likely root and scale of a melody.
///
/// Every root 0..12 is tried against every scale in catalog order, and the
/// first candidate with a strictly greater score than the running best wins.
/// The running best starts at C major with a score of -1.
pub fn detect_scale(pitches: &[u8]) -> Result<ScaleDetection> {
    let anchors = Anchors::from_pitches(pitches)?;
    let pitch_classes = pitch_class_set(pitches);

    let mut best = ScaleDetection {
        root: 0,
        scale: Scale::Major,
        score: -1,
        pitch_classes: Vec::new(),
    };

    for root in 0..12u8 {
        let root_bonus = anchors.bonus(root);
        for scale in Scale::ALL {
            let score = fit_score(&pitch_classes, root, scale) + root_bonus;
            if score > best.score {
                best.root = root;
                best.scale = scale;
                best.score = score;
            }
        }
    }

    debug!(
        "Detected {} {} (score {})",
        PITCH_CLASS_NAMES[usize::from(best.root)],
        best.scale,
        best.score
    );

    best.pitch_classes = pitch_classes;
    Ok(best)
}

/// Compute range, mean pitch and mean absolute interval of a melody
pub fn melody_stats(pitches: &[u8]) -> Result<MelodyStats> {
    let (min, max) = match (pitches.iter().min(), pitches.iter().max()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => return Err(MidiGenError::EmptyMelody),
    };

    let sum: u64 = pitches.iter().map(|p| u64::from(*p)).sum();
    let mean_pitch = sum as f64 / pitches.len() as f64;

    let mean_jump = if pitches.len() < 2 {
        0.0
    } else {
        let total: u64 = pitches
            .windows(2)
            .map(|w| u64::from(w[0].abs_diff(w[1])))
            .sum();
        total as f64 / (pitches.len() - 1) as f64
    };

    Ok(MelodyStats {
        range: max - min,
        mean_pitch,
        mean_jump,
    })
}

/// Classify precomputed statistics. The first matching rule wins.
pub fn classify_vibe(stats: &MelodyStats, scale: Scale) -> Vibe {
    let minor = scale.is_minor();
    if minor && stats.mean_pitch < 68.0 {
        Vibe::DarkAndMoody
    } else if minor && stats.mean_jump > 5.0 {
        Vibe::DramaticAndIntense
    } else if minor {
        Vibe::MelancholicAndAtmospheric
    } else if stats.mean_jump > 5.0 {
        Vibe::EnergeticAndUplifting
    } else if stats.range > 18 {
        Vibe::ExpansiveAndCinematic
    } else if stats.mean_pitch > 74.0 {
        Vibe::BrightAndDreamy
    } else {
        Vibe::WarmAndGroovy
    }
}

/// Detect the mood of a melody given its detected scale
pub fn detect_vibe(pitches: &[u8], scale: Scale) -> Result<Vibe> {
    let stats = melody_stats(pitches)?;
    Ok(classify_vibe(&stats, scale))
}

/// Full analysis of one melody
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelodyAnalysis {
    pub detection: ScaleDetection,
    pub stats: MelodyStats,
    pub vibe: Vibe,
}

/// Run scale detection, statistics and mood classification together
pub fn analyze(pitches: &[u8]) -> Result<MelodyAnalysis> {
    let detection = detect_scale(pitches)?;
    let stats = melody_stats(pitches)?;
    let vibe = classify_vibe(&stats, detection.scale);
    Ok(MelodyAnalysis {
        detection,
        stats,
        vibe,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_is_fixed() {
        let names: Vec<_> = Scale::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "major",
                "natural minor",
                "harmonic minor",
                "melodic minor",
                "dorian",
                "mixolydian",
                "pentatonic major",
                "pentatonic minor",
            ]
        );
    }

    #[test]
    fn most_frequent_ties_go_to_first_heard() {
        // E and C both appear twice; E is heard first
        let anchors = Anchors::from_pitches(&[64, 60, 64, 60, 67]).unwrap();
        assert_eq!(anchors.most_frequent, 4);
        assert_eq!(anchors.downbeats, vec![4, 7]);
    }

    #[test]
    fn anchor_bonus_weights() {
        // first = C, last = G, most frequent = C, downbeats = [C, C]
        let anchors = Anchors::from_pitches(&[60, 62, 60, 64, 72, 65, 64, 67]).unwrap();
        assert_eq!(anchors.bonus(0), 3 + 1 + 2);
        assert_eq!(anchors.bonus(7), 2);
        assert_eq!(anchors.bonus(2), 0);
    }

    #[test]
    fn fit_score_penalizes_outside_notes() {
        // C E G F# against C major: 3 in, 1 out
        assert_eq!(fit_score(&[0, 4, 6, 7], 0, Scale::Major), 3 - 2);
        assert_eq!(fit_score(&[0, 4, 7], 0, Scale::Major), 3);
    }

    #[test]
    fn single_note_melody() {
        let detection = detect_scale(&[69]).unwrap();
        assert_eq!(detection.root_name(), "A");
        assert_eq!(detection.scale, Scale::Major);
        assert_eq!(detection.pitch_class_names(), vec!["A"]);

        let stats = melody_stats(&[69]).unwrap();
        assert_eq!(stats.mean_jump, 0.0);
        assert_eq!(stats.range, 0);
    }

    #[test]
    fn empty_melody_is_rejected() {
        assert!(matches!(detect_scale(&[]), Err(MidiGenError::EmptyMelody)));
        assert!(matches!(
            detect_vibe(&[], Scale::Major),
            Err(MidiGenError::EmptyMelody)
        ));
    }

    #[test]
    fn vibe_rule_order() {
        let stats = |range, mean_pitch, mean_jump| MelodyStats {
            range,
            mean_pitch,
            mean_jump,
        };
        let minor = Scale::NaturalMinor;
        let major = Scale::Major;

        assert_eq!(classify_vibe(&stats(30, 60.0, 9.0), minor), Vibe::DarkAndMoody);
        assert_eq!(classify_vibe(&stats(30, 70.0, 9.0), minor), Vibe::DramaticAndIntense);
        assert_eq!(
            classify_vibe(&stats(30, 70.0, 2.0), minor),
            Vibe::MelancholicAndAtmospheric
        );
        assert_eq!(classify_vibe(&stats(30, 80.0, 6.0), major), Vibe::EnergeticAndUplifting);
        assert_eq!(classify_vibe(&stats(19, 80.0, 5.0), major), Vibe::ExpansiveAndCinematic);
        assert_eq!(classify_vibe(&stats(18, 75.0, 5.0), major), Vibe::BrightAndDreamy);
        assert_eq!(classify_vibe(&stats(18, 74.0, 5.0), major), Vibe::WarmAndGroovy);
        // dorian is not minor here
        assert_eq!(classify_vibe(&stats(5, 60.0, 1.0), Scale::Dorian), Vibe::WarmAndGroovy);
    }

    #[test]
    fn scale_lookup_by_name() {
        assert_eq!(Scale::from_name("harmonic minor"), Some(Scale::HarmonicMinor));
        assert_eq!(Scale::from_name("lydian"), None);
    }
}
