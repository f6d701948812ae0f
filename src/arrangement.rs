//! Chord arrangement for one song version: the chord palette and the chord
//! placements on the lyric timeline.
//!
//! A placement pins a chord (and one of its voicings) to a horizontal
//! position, in percent, on a lyric line. The model only exposes synchronous
//! mutation and reads; persistence is driven by the caller.

use crate::chords::{ChordCatalog, Voicing};
use crate::lyrics::LyricLine;
use crate::tracker::position_percent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placements on the same line closer than this (in percent) collide.
pub const COLLISION_THRESHOLD: f64 = 1.0;

/// Which voicing of a chord is shown, if the user picked one yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<usize>", into = "Option<usize>")]
pub enum VoicingSelection {
    #[default]
    Unset,
    Selected(usize),
}

impl VoicingSelection {
    /// Voicing index to draw; an unset selection shows the default voicing.
    pub fn display_index(self) -> usize {
        match self {
            VoicingSelection::Unset => 0,
            VoicingSelection::Selected(i) => i,
        }
    }
}

impl From<Option<usize>> for VoicingSelection {
    fn from(value: Option<usize>) -> Self {
        value.map_or(VoicingSelection::Unset, VoicingSelection::Selected)
    }
}

impl From<VoicingSelection> for Option<usize> {
    fn from(value: VoicingSelection) -> Self {
        match value {
            VoicingSelection::Unset => None,
            VoicingSelection::Selected(i) => Some(i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordPlacement {
    pub line_index: usize,
    /// Horizontal offset within the line, 0..=100.
    pub position: f64,
    pub chord: String,
    #[serde(default)]
    pub chord_position: VoicingSelection,
}

/// A chord in the version's palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteChord {
    /// Local sequence number, regenerated per load.
    pub id: u32,
    pub chord_name: String,
    /// Insertion order in the palette.
    pub position: usize,
    #[serde(default)]
    pub chord_position: VoicingSelection,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArrangementError {
    #[error("Invalid chord - no diagram available: {0}")]
    InvalidChord(String),
    #[error("{chord} already uses voicing {}", index + 1)]
    PositionConflict { chord: String, index: usize },
    #[error("{0} is already in the palette; pick its voicing first")]
    UnsetDuplicate(String),
    #[error("{chord} has {available} voicings, not {}", index + 1)]
    VoicingOutOfRange {
        chord: String,
        index: usize,
        available: usize,
    },
    #[error("no chord with id {0} in the palette")]
    UnknownChord(u32),
    #[error("no word {word} on line {line}")]
    NoSuchWord { line: usize, word: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arrangement {
    #[serde(default)]
    placements: Vec<ChordPlacement>,
    #[serde(default)]
    chords: Vec<PaletteChord>,
}

fn clamp_percent(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) }
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(placements: Vec<ChordPlacement>, chords: Vec<PaletteChord>) -> Self {
        Self { placements, chords }
    }

    pub fn placements(&self) -> &[ChordPlacement] {
        &self.placements
    }

    pub fn chords(&self) -> &[PaletteChord] {
        &self.chords
    }

    pub fn chord(&self, id: u32) -> Option<&PaletteChord> {
        self.chords.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty() && self.chords.is_empty()
    }

    /// Validate `name` against the catalog and append it to the palette.
    ///
    /// At most one entry per chord name may have no voicing picked, since
    /// entries are told apart by their voicing.
    pub fn add_chord(&mut self, name: &str, catalog: &ChordCatalog) -> Result<u32, ArrangementError> {
        let name = name.trim();
        if !catalog.is_valid(name) {
            return Err(ArrangementError::InvalidChord(name.to_string()));
        }
        if self
            .chords
            .iter()
            .any(|c| c.chord_name == name && c.chord_position == VoicingSelection::Unset)
        {
            return Err(ArrangementError::UnsetDuplicate(name.to_string()));
        }
        let id = self.chords.iter().map(|c| c.id + 1).max().unwrap_or(0);
        let position = self.chords.iter().map(|c| c.position + 1).max().unwrap_or(0);
        self.chords.push(PaletteChord {
            id,
            chord_name: name.to_string(),
            position,
            chord_position: VoicingSelection::Unset,
        });
        Ok(id)
    }

    /// Remove a palette chord and every placement using that exact voicing.
    ///
    /// Returns the number of placements removed.
    pub fn delete_chord(&mut self, id: u32) -> Result<usize, ArrangementError> {
        let idx = self
            .chords
            .iter()
            .position(|c| c.id == id)
            .ok_or(ArrangementError::UnknownChord(id))?;
        let removed = self.chords.remove(idx);
        Ok(self.remove_all_for_chord(&removed.chord_name, removed.chord_position))
    }

    /// Pick the voicing a palette chord shows.
    ///
    /// Rejected without mutation when another palette entry of the same chord
    /// already holds that voicing. Placements that used the entry's previous
    /// voicing follow it to the new one.
    pub fn set_voicing(
        &mut self,
        id: u32,
        index: usize,
        catalog: &ChordCatalog,
    ) -> Result<(), ArrangementError> {
        let entry = self.chord(id).ok_or(ArrangementError::UnknownChord(id))?;
        let name = entry.chord_name.clone();
        let previous = entry.chord_position;
        let available = catalog
            .resolve(&name)
            .map(<[Voicing]>::len)
            .ok_or_else(|| ArrangementError::InvalidChord(name.clone()))?;
        if index >= available {
            return Err(ArrangementError::VoicingOutOfRange {
                chord: name,
                index,
                available,
            });
        }
        let wanted = VoicingSelection::Selected(index);
        if previous == wanted {
            return Ok(());
        }
        if self
            .chords
            .iter()
            .any(|c| c.id != id && c.chord_name == name && c.chord_position == wanted)
        {
            return Err(ArrangementError::PositionConflict { chord: name, index });
        }

        for c in self.chords.iter_mut().filter(|c| c.id == id) {
            c.chord_position = wanted;
        }
        for p in self
            .placements
            .iter_mut()
            .filter(|p| p.chord == name && p.chord_position == previous)
        {
            p.chord_position = wanted;
        }
        Ok(())
    }

    /// Place a chord, replacing any placement on the same line within
    /// [`COLLISION_THRESHOLD`] of `position`. Returns how many were replaced.
    pub fn add_or_replace(
        &mut self,
        line_index: usize,
        position: f64,
        chord: &str,
        voicing: VoicingSelection,
    ) -> usize {
        let position = clamp_percent(position);
        let before = self.placements.len();
        self.placements.retain(|p| {
            !(p.line_index == line_index && (p.position - position).abs() < COLLISION_THRESHOLD)
        });
        let replaced = before - self.placements.len();
        self.placements.push(ChordPlacement {
            line_index,
            position,
            chord: chord.to_string(),
            chord_position: voicing,
        });
        replaced
    }

    /// Re-target the placement matching line, chord and original position.
    pub fn move_placement(
        &mut self,
        line_index: usize,
        chord: &str,
        original_position: f64,
        new_position: f64,
    ) -> bool {
        match self.placements.iter_mut().find(|p| {
            p.line_index == line_index && p.chord == chord && p.position == original_position
        }) {
            Some(p) => {
                p.position = clamp_percent(new_position);
                true
            }
            None => false,
        }
    }

    /// Exact-match removal.
    pub fn remove_placement(&mut self, line_index: usize, position: f64, chord: &str) -> bool {
        let before = self.placements.len();
        self.placements
            .retain(|p| !(p.line_index == line_index && p.position == position && p.chord == chord));
        before != self.placements.len()
    }

    /// Remove every placement of `chord` drawn with exactly `voicing`.
    pub fn remove_all_for_chord(&mut self, chord: &str, voicing: VoicingSelection) -> usize {
        let before = self.placements.len();
        self.placements
            .retain(|p| !(p.chord == chord && p.chord_position == voicing));
        before - self.placements.len()
    }

    /// Placements on one line, left to right.
    pub fn placements_for_line(&self, line_index: usize) -> Vec<&ChordPlacement> {
        let mut on_line: Vec<&ChordPlacement> = self
            .placements
            .iter()
            .filter(|p| p.line_index == line_index)
            .collect();
        on_line.sort_by(|a, b| a.position.total_cmp(&b.position));
        on_line
    }

    /// The placement sounding at `position_ms` while `line_index` is active.
    ///
    /// That is the right-most placement on the line at or before the current
    /// point of the line, otherwise the last placement of an earlier line.
    pub fn active_chord(
        &self,
        lines: &[LyricLine],
        line_index: usize,
        position_ms: i64,
    ) -> Option<&ChordPlacement> {
        if let Some(line) = lines.get(line_index) {
            let pct = position_percent(line, position_ms);
            if let Some(p) = self
                .placements_for_line(line_index)
                .into_iter()
                .rev()
                .find(|p| p.position <= pct)
            {
                return Some(p);
            }
        }
        (0..line_index.min(lines.len()))
            .rev()
            .find_map(|i| self.placements_for_line(i).last().copied())
    }

    /// Voicing to draw for a placement.
    pub fn voicing_for<'c>(
        &self,
        placement: &ChordPlacement,
        catalog: &'c ChordCatalog,
    ) -> Option<&'c Voicing> {
        catalog
            .resolve(&placement.chord)?
            .get(placement.chord_position.display_index())
    }

    /// Palette built from word-level chords of older arrangements.
    pub fn palette_from_words(lines: &[LyricLine]) -> Vec<PaletteChord> {
        let mut names: Vec<&str> = Vec::new();
        for word in lines.iter().filter_map(|l| l.words.as_ref()).flatten() {
            if let Some(chord) = word.chord.as_deref()
                && !names.contains(&chord)
            {
                names.push(chord);
            }
        }
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| PaletteChord {
                id: i as u32,
                chord_name: name.to_string(),
                position: i,
                chord_position: VoicingSelection::Unset,
            })
            .collect()
    }
}

/// Attach (or clear) a chord on a single word, computing word timings first.
pub fn set_word_chord(
    lines: &mut [LyricLine],
    line_index: usize,
    word_index: usize,
    chord: Option<&str>,
    catalog: &ChordCatalog,
) -> Result<(), ArrangementError> {
    if let Some(name) = chord
        && !catalog.is_valid(name)
    {
        return Err(ArrangementError::InvalidChord(name.to_string()));
    }
    let missing = ArrangementError::NoSuchWord {
        line: line_index,
        word: word_index,
    };
    let line = lines.get_mut(line_index).ok_or(missing.clone())?;
    let word = line.ensure_words().get_mut(word_index).ok_or(missing)?;
    word.chord = chord.map(str::to_string);
    Ok(())
}
