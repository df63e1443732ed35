//! # note_table
//!
//! Resolves finger counts to notes of a fixed eight-note scale, and
//! arbitrates between two hands in cooperative mode.
//!
//! | Index | Name | Pitch | Hz |
//! |---|---|---|---|
//! | 1 | Do  | C4 | 261 |
//! | 2 | Re  | D4 | 293 |
//! | 3 | Mi  | E4 | 329 |
//! | 4 | Fa  | F4 | 349 |
//! | 5 | Sol | G4 | 392 |
//! | 6 | La  | A4 | 440 |
//! | 7 | Si  | B4 | 493 |
//! | 8 | Do' | C5 | 523 |
//!
//! A single hand shows at most five fingers, so indices 6–8 are never
//! reached from a finger count; they stay in the table for the game's
//! target draw and for custom tables.
//!
//! ## Cooperative mode
//!
//! | Right hand | Left hand | Result |
//! |---|---|---|
//! | valid note | anything | right note, role `Melody` |
//! | silence | valid note | left note + 20 Hz, role `Chord` |
//! | silence | silence | `Silence` |
//!
//! Only one tone ever sounds per tick.
//!
//! ```rust
//! use finger_count::FingerCount;
//! use note_table::{arbitrate, NoteEvent, NoteTable, Role};
//!
//! let table = NoteTable::standard();
//! let frame = arbitrate(&table, FingerCount::new(4), FingerCount::new(0));
//! assert_eq!(frame.role, Role::Chord);
//! assert_eq!(frame.note, NoteEvent::Sounding { index: 4, frequency: 369 });
//! ```

use std::fmt;
use std::str::FromStr;

use finger_count::{FingerCount, HandCounts};
use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// NoteEntry / NoteTable
// ════════════════════════════════════════════════════════════════════════════

/// Entries in every table.
pub const NOTE_COUNT: usize = 8;

/// Detune applied to the left hand's note when it sounds as the chord voice.
pub const CHORD_OFFSET_HZ: u32 = 20;

/// One note of the scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct NoteEntry {
    /// 1-based position in the table.
    pub index:     u8,
    /// Solfège display name.
    pub name:      &'static str,
    /// Scientific pitch label.
    pub pitch:     &'static str,
    pub frequency: u32,
}

impl NoteEntry {
    pub const fn new(index: u8, name: &'static str, pitch: &'static str, frequency: u32) -> Self {
        NoteEntry { index, name, pitch, frequency }
    }
}

const STANDARD_ENTRIES: [NoteEntry; NOTE_COUNT] = [
    NoteEntry::new(1, "Do",  "C4", 261),
    NoteEntry::new(2, "Re",  "D4", 293),
    NoteEntry::new(3, "Mi",  "E4", 329),
    NoteEntry::new(4, "Fa",  "F4", 349),
    NoteEntry::new(5, "Sol", "G4", 392),
    NoteEntry::new(6, "La",  "A4", 440),
    NoteEntry::new(7, "Si",  "B4", 493),
    NoteEntry::new(8, "Do'", "C5", 523),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteTableError {
    #[error("note table needs exactly {expected} entries, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("entry {position} carries index {found}, expected {expected}")]
    BadIndex { position: usize, expected: u8, found: u8 },

    #[error("index {index}: {frequency} Hz does not rise above {previous} Hz")]
    NotIncreasing { index: u8, frequency: u32, previous: u32 },
}

/// Fixed, validated eight-note table indexed 1..=8.
///
/// Built once at start-up and only read afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteTable {
    entries: [NoteEntry; NOTE_COUNT],
}

impl Default for NoteTable {
    fn default() -> Self { NoteTable::standard() }
}

impl NoteTable {
    /// The C4..C5 major scale.
    pub fn standard() -> Self {
        NoteTable { entries: STANDARD_ENTRIES }
    }

    /// Validate a custom table: indices exactly `1..=8` in order and
    /// strictly increasing frequencies.
    pub fn new(entries: Vec<NoteEntry>) -> Result<Self, NoteTableError> {
        let entries: [NoteEntry; NOTE_COUNT] = entries
            .try_into()
            .map_err(|v: Vec<NoteEntry>| NoteTableError::WrongLength {
                expected: NOTE_COUNT,
                found:    v.len(),
            })?;

        for (position, entry) in entries.iter().enumerate() {
            let expected = position as u8 + 1;
            if entry.index != expected {
                return Err(NoteTableError::BadIndex { position, expected, found: entry.index });
            }
        }
        for pair in entries.windows(2) {
            if pair[1].frequency <= pair[0].frequency {
                return Err(NoteTableError::NotIncreasing {
                    index:     pair[1].index,
                    frequency: pair[1].frequency,
                    previous:  pair[0].frequency,
                });
            }
        }
        Ok(NoteTable { entries })
    }

    pub fn entries(&self) -> &[NoteEntry; NOTE_COUNT] { &self.entries }

    /// Entry for a 1-based index, `None` outside `1..=8`.
    pub fn get(&self, index: u8) -> Option<&NoteEntry> {
        match index {
            1..=8 => self.entries.get(index as usize - 1),
            _     => None,
        }
    }

    /// Resolve any count to a note.  0 and anything above 8 are silence.
    pub fn resolve(&self, count: u8) -> NoteEvent {
        self.get(count)
            .map(|e| NoteEvent::Sounding { index: e.index, frequency: e.frequency })
            .unwrap_or(NoteEvent::Silence)
    }

    pub fn resolve_count(&self, count: FingerCount) -> NoteEvent {
        self.resolve(count.get())
    }

    /// Display name of the note an event refers to.
    pub fn name_of(&self, event: NoteEvent) -> Option<&'static str> {
        event.index().and_then(|i| self.get(i)).map(|e| e.name)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteEvent
// ════════════════════════════════════════════════════════════════════════════

/// What one tick resolved to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum NoteEvent {
    #[default]
    Silence,
    Sounding { index: u8, frequency: u32 },
}

impl NoteEvent {
    pub fn index(self) -> Option<u8> {
        match self {
            NoteEvent::Sounding { index, .. } => Some(index),
            NoteEvent::Silence                => None,
        }
    }

    pub fn frequency(self) -> Option<u32> {
        match self {
            NoteEvent::Sounding { frequency, .. } => Some(frequency),
            NoteEvent::Silence                    => None,
        }
    }

    pub fn is_sounding(self) -> bool {
        matches!(self, NoteEvent::Sounding { .. })
    }

    /// Same note, frequency shifted by `offset_hz`, saturating at `u32::MAX`.
    pub fn detuned(self, offset_hz: u32) -> Self {
        match self {
            NoteEvent::Sounding { index, frequency } => NoteEvent::Sounding {
                index,
                frequency: frequency.saturating_add(offset_hz),
            },
            NoteEvent::Silence => NoteEvent::Silence,
        }
    }
}

impl fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteEvent::Silence => f.write_str("silence"),
            NoteEvent::Sounding { index, frequency } => write!(f, "#{} @ {} Hz", index, frequency),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Two-hand arbitration
// ════════════════════════════════════════════════════════════════════════════

/// Which hand produced the sounding note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Melody,
    Chord,
    #[default]
    None,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Melody => "Melody",
            Role::Chord  => "Chord",
            Role::None   => "-",
        }
    }
}

/// Per-tick result of resolution, recomputed every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CooperativeFrame {
    pub left:  FingerCount,
    pub right: FingerCount,
    pub note:  NoteEvent,
    pub role:  Role,
}

/// Right hand has strict priority; the left hand only sounds, detuned by
/// [`CHORD_OFFSET_HZ`], when the right resolves to silence.
pub fn arbitrate(table: &NoteTable, left: FingerCount, right: FingerCount) -> CooperativeFrame {
    let melody = table.resolve_count(right);
    let (note, role) = if melody.is_sounding() {
        (melody, Role::Melody)
    } else {
        let chord = table.resolve_count(left);
        if chord.is_sounding() {
            (chord.detuned(CHORD_OFFSET_HZ), Role::Chord)
        } else {
            (NoteEvent::Silence, Role::None)
        }
    };
    CooperativeFrame { left, right, note, role }
}

/// How hands are turned into a note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// First detected hand plays the table note directly.
    #[default]
    Single,
    /// Right hand melody, left hand detuned fallback.
    Cooperative,
}

impl PlayMode {
    pub fn name(self) -> &'static str {
        match self {
            PlayMode::Single      => "single",
            PlayMode::Cooperative => "cooperative",
        }
    }

    /// Hands the detector needs to report for this mode.
    pub fn max_hands(self) -> usize {
        match self {
            PlayMode::Single      => 1,
            PlayMode::Cooperative => 2,
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "solo"         => Ok(PlayMode::Single),
            "cooperative" | "coop"    => Ok(PlayMode::Cooperative),
            other => Err(format!("unknown play mode '{}' (single | cooperative)", other)),
        }
    }
}

/// Resolve one tick's counts under `mode`.
pub fn resolve_counts(table: &NoteTable, mode: PlayMode, counts: HandCounts) -> CooperativeFrame {
    match mode {
        PlayMode::Single => CooperativeFrame {
            left:  counts.left,
            right: counts.right,
            note:  table.resolve_count(counts.primary),
            role:  Role::None,
        },
        PlayMode::Cooperative => arbitrate(table, counts.left, counts.right),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
