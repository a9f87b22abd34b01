//! Note sequences and lane mapping
//!
//! Seven lanes, one per natural note letter. Sharps and flats sit halfway
//! between the adjacent lanes. The octave is ignored.

use serde::{Deserialize, Serialize};

use crate::consts::LANE_COUNT;
use crate::settings::PlayArea;

/// A single note from the analysis feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Note name, e.g. "C4", "F#3", "B♭2"
    pub note: String,
    /// Song time in seconds
    pub time: f32,
    /// Duration in seconds
    #[serde(default)]
    pub duration: f32,
}

impl NoteEvent {
    pub fn new(note: impl Into<String>, time: f32, duration: f32) -> Self {
        Self {
            note: note.into(),
            time,
            duration,
        }
    }
}

/// Ordered (by time) list of notes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteSequence {
    notes: Vec<NoteEvent>,
}

impl NoteSequence {
    /// Build a sequence, sorting by time
    pub fn new(mut notes: Vec<NoteEvent>) -> Self {
        notes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { notes }
    }

    /// Convenience for tests and demos: evenly spaced notes
    pub fn from_names(names: &[&str], spacing: f32) -> Self {
        let notes = names
            .iter()
            .enumerate()
            .map(|(i, name)| NoteEvent::new(*name, i as f32 * spacing, spacing))
            .collect();
        Self { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NoteEvent> {
        self.notes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteEvent> {
        self.notes.iter()
    }

    /// Remove and return up to `max` notes starting at the first note with
    /// `time >= from`. Notes before `from` are dropped as stale.
    pub fn take_window(&mut self, from: f32, max: usize) -> NoteSequence {
        let start = self.notes.partition_point(|n| n.time < from);
        self.notes.drain(..start);
        let end = max.min(self.notes.len());
        NoteSequence {
            notes: self.notes.drain(..end).collect(),
        }
    }
}

/// Fractional lane index for a note name: C=0 .. B=6, accidentals at ±0.5.
///
/// The octave is ignored, so there is no lane below C or above B: `Cb` and
/// `B#` clamp onto the C and B lanes instead of wrapping.
pub fn lane_position(note: &str) -> Option<f32> {
    let mut chars = note.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: f32 = match letter {
        'C' => 0.0,
        'D' => 1.0,
        'E' => 2.0,
        'F' => 3.0,
        'G' => 4.0,
        'A' => 5.0,
        'B' => 6.0,
        _ => return None,
    };
    let offset: f32 = match chars.next() {
        Some('#') | Some('♯') => 0.5,
        Some('b') | Some('♭') => -0.5,
        _ => 0.0,
    };
    Some((base + offset).clamp(0.0, (LANE_COUNT - 1) as f32))
}

/// Vertical position for a fractional lane index. Higher notes sit higher.
pub fn lane_y(position: f32, area: &PlayArea) -> f32 {
    let usable = (area.height - 2.0 * area.lane_padding).max(0.0);
    let lane_height = usable / (LANE_COUNT - 1) as f32;
    area.lane_padding + ((LANE_COUNT - 1) as f32 - position) * lane_height
}

/// Vertical position for a note name; unknown names fall back to the middle lane
pub fn lane_y_for(note: &str, area: &PlayArea) -> f32 {
    let position = lane_position(note).unwrap_or_else(|| {
        log::warn!("Unrecognised note {:?}, using middle lane", note);
        (LANE_COUNT / 2) as f32
    });
    lane_y(position, area)
}
