//! Song analysis input
//!
//! Loads the JSON produced by the offline analysis pipeline and turns it into
//! the note feed and activity gate used by the field.

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::sim::events::SpawnGate;
use crate::sim::note::{NoteEvent, NoteSequence};

/// Normalised energy at or above which the field may spawn
pub const ENERGY_THRESHOLD: f32 = 0.35;
/// Onsets this close (seconds) open the spawn gate
pub const ONSET_WINDOW: f32 = 0.15;
/// Last-note duration when the tempo is unusable
const FALLBACK_NOTE_SECS: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMetadata {
    pub filename: String,
    /// Seconds
    pub duration: f32,
    /// Beats per minute
    #[serde(default)]
    pub tempo: f32,
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    pub time: f32,
    pub energy: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedNote {
    pub time: f32,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Intro,
    Verse,
    Chorus,
    Bridge,
    Outro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub start: f32,
    pub end: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f32>,
}

impl SongSegment {
    pub fn contains(&self, t: f32) -> bool {
        t >= self.start && t < self.end
    }
}

/// Full analysis document for one song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongAnalysis {
    pub metadata: SongMetadata,
    #[serde(default)]
    pub beats: Vec<f32>,
    #[serde(default)]
    pub onsets: Vec<f32>,
    #[serde(default)]
    pub energy_profile: Vec<EnergySample>,
    pub notes: Vec<AnalyzedNote>,
    #[serde(default)]
    pub segments: Vec<SongSegment>,
}

impl SongAnalysis {
    /// Parse an analysis document. A document without notes is rejected.
    /// Time-indexed sections are sorted so lookups can bisect.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let mut analysis: Self = serde_json::from_str(json)?;
        if analysis.notes.is_empty() {
            return Err(AnalysisError::NoNotes);
        }
        analysis
            .energy_profile
            .sort_by(|a, b| a.time.total_cmp(&b.time));
        analysis.onsets.sort_by(f32::total_cmp);
        analysis.beats.sort_by(f32::total_cmp);
        analysis
            .segments
            .sort_by(|a, b| a.start.total_cmp(&b.start));
        Ok(analysis)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let analysis = Self::from_json(&json)?;
        log::info!(
            "Loaded analysis for {} ({:.1}s, {:.0} bpm, {} notes, {} segments)",
            analysis.metadata.filename,
            analysis.metadata.duration,
            analysis.metadata.tempo,
            analysis.notes.len(),
            analysis.segments.len()
        );
        Ok(analysis)
    }

    /// Seconds per beat, if the tempo is usable
    fn beat_secs(&self) -> Option<f32> {
        let tempo = self.metadata.tempo;
        (tempo.is_finite() && tempo > 0.0).then(|| 60.0 / tempo)
    }

    /// Notes ordered by time; each lasts until the next one starts
    pub fn note_sequence(&self) -> NoteSequence {
        let mut sorted: Vec<&AnalyzedNote> = self.notes.iter().collect();
        sorted.sort_by(|a, b| a.time.total_cmp(&b.time));

        let last = self.beat_secs().unwrap_or(FALLBACK_NOTE_SECS);
        let events = sorted
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let duration = sorted
                    .get(i + 1)
                    .map(|next| (next.time - n.time).max(0.0))
                    .unwrap_or(last);
                NoteEvent::new(n.note.clone(), n.time, duration)
            })
            .collect();
        NoteSequence::new(events)
    }

    /// Energy sample at or before `t`, scaled so the loudest sample is 1.0
    pub fn energy_at(&self, t: f32) -> f32 {
        let max = self
            .energy_profile
            .iter()
            .map(|s| s.energy)
            .fold(0.0_f32, f32::max);
        if max <= 0.0 {
            return 0.0;
        }
        let idx = self.energy_profile.partition_point(|s| s.time <= t);
        match idx.checked_sub(1).and_then(|i| self.energy_profile.get(i)) {
            Some(sample) => (sample.energy / max).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    pub fn segment_at(&self, t: f32) -> Option<&SongSegment> {
        self.segments.iter().find(|s| s.contains(t))
    }

    /// Number of onsets within `t ± window`
    pub fn onsets_near(&self, t: f32, window: f32) -> usize {
        self.onsets
            .iter()
            .filter(|&&onset| (onset - t).abs() <= window)
            .count()
    }

    /// Deterministic stand-in used when no analysis file is available
    pub fn placeholder(seed: u64, duration: f32) -> Self {
        const SCALE: [&str; 8] = ["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5"];
        let mut rng = Pcg32::seed_from_u64(seed);
        let tempo: f32 = 120.0;
        let beat = 60.0 / tempo;
        let duration = duration.max(beat);

        let beats: Vec<f32> = (0..)
            .map(|i| i as f32 * beat)
            .take_while(|t| *t < duration)
            .collect();
        let notes = beats
            .iter()
            .map(|&time| AnalyzedNote {
                time,
                note: SCALE[rng.random_range(0..SCALE.len())].to_string(),
            })
            .collect();
        let energy_profile = (0..duration.ceil() as u32)
            .map(|s| EnergySample {
                time: s as f32,
                energy: rng.random_range(0.2..1.0),
            })
            .collect();

        let third = duration / 3.0;
        let segments = vec![
            SongSegment {
                kind: SegmentKind::Intro,
                start: 0.0,
                end: third,
                energy: None,
            },
            SongSegment {
                kind: SegmentKind::Chorus,
                start: third,
                end: 2.0 * third,
                energy: None,
            },
            SongSegment {
                kind: SegmentKind::Outro,
                start: 2.0 * third,
                end: duration,
                energy: None,
            },
        ];

        Self {
            metadata: SongMetadata {
                filename: "placeholder".to_string(),
                duration,
                tempo,
                sample_rate: 44_100,
                generation_method: Some("placeholder".to_string()),
            },
            onsets: beats.clone(),
            beats,
            energy_profile,
            notes,
            segments,
        }
    }
}

impl SpawnGate for SongAnalysis {
    fn is_active(&self, song_time: f32) -> bool {
        self.energy_at(song_time) >= ENERGY_THRESHOLD
            || self
                .segment_at(song_time)
                .is_some_and(|s| s.kind == SegmentKind::Chorus)
            || self.onsets_near(song_time, ONSET_WINDOW) > 0
    }
}
