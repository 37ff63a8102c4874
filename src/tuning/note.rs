// MIDI notes and their textual labels
// MIDI 60 is "C4", so the lowest note (0) is "C-1" and the highest (127) is "G9"

use serde::{Deserialize, Serialize};
use std::fmt;

pub const SHARP_TAG: &str = "♯";
pub const FLAT_TAG: &str = "♭";

const SHARP_CHARS: [char; 2] = ['♯', '#'];
const FLAT_CHARS: [char; 2] = ['♭', 'b'];

/// One octave of note labels using sharps for accidentals
pub const LABELS_WITH_SHARPS: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];

/// One octave of note labels using flats for accidentals
pub const LABELS_WITH_FLATS: [&str; 12] = [
    "C", "D♭", "D", "E♭", "E", "F", "G♭", "G", "A♭", "A", "B♭", "B",
];

/// Solfege labels, one per semitone
pub const SOLFEGE_LABELS: [&str; 12] = [
    "Do", "Do", "Re", "Re", "Mi", "Fa", "Fa", "Sol", "Sol", "La", "La", "Ti",
];

const NATURALS: [(char, i32); 7] = [
    ('C', 0),
    ('D', 2),
    ('E', 4),
    ('F', 5),
    ('G', 7),
    ('A', 9),
    ('B', 11),
];

pub const MIN_OCTAVE: i32 = -1;
pub const MAX_OCTAVE: i32 = 9;
pub const MAX_MIDI_VALUE: u8 = 127;

/// A MIDI v1 note in [0, 127]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Note {
    midi_value: u8,
}

impl Note {
    pub const C4: Note = Note { midi_value: 60 };
    pub const A4: Note = Note { midi_value: 69 };

    /// Create a note, rejecting values above 127
    pub fn new(midi_value: u8) -> Option<Self> {
        (midi_value <= MAX_MIDI_VALUE).then_some(Note { midi_value })
    }

    pub fn midi_value(&self) -> u8 {
        self.midi_value
    }

    /// Position within the octave, C = 0 ... B = 11
    pub fn note_index(&self) -> usize {
        usize::from(self.midi_value % 12)
    }

    pub fn octave(&self) -> i32 {
        i32::from(self.midi_value / 12) - 1
    }

    /// True for the black keys
    pub fn is_accented(&self) -> bool {
        matches!(self.note_index(), 1 | 3 | 6 | 8 | 10)
    }

    pub fn label_with_sharps(&self) -> String {
        format!("{}{}", LABELS_WITH_SHARPS[self.note_index()], self.octave())
    }

    pub fn label_with_flats(&self) -> String {
        format!("{}{}", LABELS_WITH_FLATS[self.note_index()], self.octave())
    }

    pub fn label(&self, prefer_sharps: bool) -> String {
        if prefer_sharps {
            self.label_with_sharps()
        } else {
            self.label_with_flats()
        }
    }

    pub fn solfege(&self) -> &'static str {
        SOLFEGE_LABELS[self.note_index()]
    }

    /// Note a number of semitones away, if still a valid MIDI note
    pub fn offset(&self, semitones: i32) -> Option<Note> {
        let value = i32::from(self.midi_value) + semitones;
        u8::try_from(value).ok().and_then(Note::new)
    }

    /// Parse a label such as "C4", "F#3", "B♭-1" or "G9"
    ///
    /// Accepts one letter in `A-G`, an optional single accidental (`#`, `♯`, `b`, `♭`)
    /// and an octave in [-1, 9]. Returns `None` for anything else, including labels
    /// that would land outside the MIDI range (e.g. "Cb-1" or "G#9").
    pub fn from_label(label: &str) -> Option<Note> {
        let length = label.chars().count();
        if !(2..=4).contains(&length) {
            return None;
        }

        let mut chars = label.chars().peekable();
        let letter = chars.next()?;
        let mut offset = NATURALS
            .iter()
            .find(|(name, _)| *name == letter)
            .map(|(_, offset)| *offset)?;

        if let Some(&accidental) = chars.peek() {
            if SHARP_CHARS.contains(&accidental) {
                offset += 1;
                chars.next();
            } else if FLAT_CHARS.contains(&accidental) {
                offset -= 1;
                chars.next();
            }
        }

        // Only "-1" or a single digit; no sign on the others
        let rest: String = chars.collect();
        let octave = match rest.as_bytes() {
            [b'-', b'1'] => MIN_OCTAVE,
            [digit] if digit.is_ascii_digit() => i32::from(digit - b'0'),
            _ => return None,
        };

        let value = (octave + 1) * 12 + offset;
        u8::try_from(value).ok().and_then(Note::new)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label_with_sharps())
    }
}

impl TryFrom<u8> for Note {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Note::new(value).ok_or_else(|| format!("invalid MIDI note value {}", value))
    }
}

impl From<Note> for u8 {
    fn from(note: Note) -> Self {
        note.midi_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip_all_notes() {
        for value in 0..=MAX_MIDI_VALUE {
            let note = Note::new(value).unwrap();
            let sharp = Note::from_label(&note.label(true)).unwrap();
            let flat = Note::from_label(&note.label(false)).unwrap();
            assert_eq!(sharp.midi_value(), value);
            assert_eq!(flat.midi_value(), value);
        }
    }

    #[test]
    fn test_range_ends() {
        assert_eq!(Note::new(0).unwrap().label(true), "C-1");
        assert_eq!(Note::new(127).unwrap().label(true), "G9");
        assert_eq!(Note::from_label("C-1").unwrap().midi_value(), 0);
        assert_eq!(Note::from_label("G9").unwrap().midi_value(), 127);
        assert!(Note::new(128).is_none());
    }

    #[test]
    fn test_ascii_accidentals() {
        assert_eq!(Note::from_label("C#4").unwrap().midi_value(), 61);
        assert_eq!(Note::from_label("Db4").unwrap().midi_value(), 61);
        assert_eq!(Note::from_label("A4"), Some(Note::A4));
    }

    #[test]
    fn test_rejects_malformed_labels() {
        assert!(Note::from_label("").is_none());
        assert!(Note::from_label("C").is_none());
        assert!(Note::from_label("H4").is_none());
        assert!(Note::from_label("c4").is_none());
        assert!(Note::from_label("C##4").is_none());
        assert!(Note::from_label("Cb#4").is_none());
        assert!(Note::from_label("C10").is_none());
        assert!(Note::from_label("C-2").is_none());
        assert!(Note::from_label("G#9").is_none());
        assert!(Note::from_label("Cb-1").is_none());
        assert!(Note::from_label("C4x").is_none());
        assert!(Note::from_label("C+4").is_none());
        assert!(Note::from_label("C#+4").is_none());
        assert!(Note::from_label("C-0").is_none());
        assert!(Note::from_label("C 4").is_none());
    }

    #[test]
    fn test_offset() {
        assert_eq!(Note::A4.offset(-12).unwrap().label(true), "A3");
        assert_eq!(Note::A4.offset(3).unwrap().label(true), "C5");
        assert!(Note::A4.offset(100).is_none());
        assert!(Note::A4.offset(-70).is_none());
    }

    #[test]
    fn test_accented_and_solfege() {
        assert!(!Note::C4.is_accented());
        assert!(Note::C4.offset(1).unwrap().is_accented());
        assert_eq!(Note::A4.solfege(), "La");
        assert_eq!(Note::C4.octave(), 4);
    }
}
