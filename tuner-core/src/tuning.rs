//! # Musical Tuning Module
//!
//! Maps detected frequencies onto 12-tone equal temperament and carries the
//! catalog of guitar tunings a display can align its fretboard with.
//!
//! ## Features
//! - Nearest equal-tempered note for any frequency, relative to a concert pitch
//! - MIDI-standard octave numbering (C4 = middle C, A4 = MIDI note 69)
//! - Cent deviation calculations
//! - Built-in tunings from standard E down to 8-string standard
//! - Pitch-class and fret lookups for fretboard rows

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::ClosestNote;

/// The chromatic scale starting at A.
pub const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// MIDI note number of A4.
const A4_MIDI_NOTE: i32 = 69;

/// Rounds to one decimal place.
pub fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

/// Number of semitones between `freq` and the concert pitch, rounded to the
/// nearest integer.
pub fn semitone_offset(freq: f32, concert_pitch: f32) -> Option<i32> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    Some((12.0 * (freq / concert_pitch).log2()).round() as i32)
}

/// Name and octave of the note `offset` semitones away from A4, e.g. "C#3".
pub fn note_name(offset: i32) -> String {
    let midi_note = offset + A4_MIDI_NOTE;
    let octave = midi_note.div_euclid(12) - 1;
    format!("{}{}", NOTE_NAMES[offset.rem_euclid(12) as usize], octave)
}

/// Equal-tempered frequency of the note `offset` semitones away from A4.
pub fn note_frequency(offset: i32, concert_pitch: f32) -> f32 {
    concert_pitch * 2.0_f32.powf(offset as f32 / 12.0)
}

/// Finds the closest equal-tempered note to a detected frequency.
///
/// Both the detected and the reference frequency are rounded to 0.1 Hz.
/// Returns `None` for frequencies that are not positive and finite.
pub fn closest_note(freq: f32, concert_pitch: f32) -> Option<ClosestNote> {
    let offset = semitone_offset(freq, concert_pitch)?;
    Some(ClosestNote {
        note: note_name(offset),
        max_frequency: round_tenth(freq),
        closest_pitch: round_tenth(note_frequency(offset, concert_pitch)),
    })
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// Splits the pitch class off a note label, e.g. "C#" from "C#3".
pub fn pitch_class(note: &str) -> Option<&str> {
    let end = note
        .find(|c: char| c.is_ascii_digit() || c == '-')
        .unwrap_or(note.len());
    let class = &note[..end];
    chromatic_index(class).map(|_| class)
}

/// Octave number of a note label, e.g. 3 for "C#3".
pub fn octave(note: &str) -> Option<i32> {
    let class = pitch_class(note)?;
    note[class.len()..].parse().ok()
}

/// Position of a pitch class in [`NOTE_NAMES`].
pub fn chromatic_index(pitch_class: &str) -> Option<usize> {
    NOTE_NAMES.iter().position(|&n| n == pitch_class)
}

/// A guitar tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub name: String,
    /// Open string pitch classes, lowest string first.
    pub notes: Vec<String>,
    /// Open string notes with octave, lowest string first.
    pub pitches: Vec<String>,
}

impl Tuning {
    /// Open string pitch classes in display row order, highest string first.
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.notes.iter().rev().map(String::as_str)
    }

    /// Indices (lowest string = 0) of the strings whose open note has the given pitch class.
    pub fn strings_for(&self, pitch_class: &str) -> Vec<usize> {
        self.notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.as_str() == pitch_class)
            .map(|(i, _)| i)
            .collect()
    }

    /// Fret (0..12) at which `pitch_class` sounds on string `string_index`.
    pub fn fret_for(&self, string_index: usize, pitch_class: &str) -> Option<usize> {
        let open = chromatic_index(self.notes.get(string_index)?)?;
        let target = chromatic_index(pitch_class)?;
        Some((target + 12 - open) % 12)
    }
}

/// Built-in tunings, computed once on first access.
static TUNINGS: Lazy<Vec<Tuning>> = Lazy::new(|| {
    const CATALOG: [(&str, &[&str]); 13] = [
        ("Standard tuning (E)", &["E2", "A2", "D3", "G3", "B3", "E4"]),
        ("Half-step down (E flat)", &["D#2", "G#2", "C#3", "F#3", "A#3", "D#4"]),
        ("Drop D", &["D2", "A2", "D3", "G3", "B3", "E4"]),
        ("Drop C#", &["C#2", "G#2", "C#3", "F#3", "A#3", "D#4"]),
        ("D tuning", &["D2", "G2", "C3", "F3", "A3", "D4"]),
        ("Drop C", &["C2", "G2", "C3", "F3", "A3", "D4"]),
        ("C# tuning", &["C#2", "F#2", "B2", "E3", "G#3", "C#4"]),
        ("Drop B", &["B1", "F#2", "B2", "E3", "G#3", "C#4"]),
        ("C Tuning", &["C2", "F2", "A#2", "D#3", "G3", "C4"]),
        ("B tuning (B standard)", &["B1", "E2", "A2", "D3", "F#3", "B3"]),
        ("Drop A", &["A1", "E2", "A2", "D3", "F#3", "B3"]),
        ("Standard tuning, 7 strings", &["B1", "E2", "A2", "D3", "G3", "B3", "E4"]),
        (
            "Standard tuning, 8 strings",
            &["G1", "B1", "E2", "A2", "D3", "G3", "B3", "E4"],
        ),
    ];

    CATALOG
        .iter()
        .map(|(name, pitches)| Tuning {
            name: name.to_string(),
            notes: pitches
                .iter()
                .filter_map(|p| pitch_class(p))
                .map(str::to_string)
                .collect(),
            pitches: pitches.iter().map(|p| p.to_string()).collect(),
        })
        .collect()
});

/// All built-in tunings.
pub fn tunings() -> &'static [Tuning] {
    &TUNINGS
}

/// Looks up a built-in tuning by name.
pub fn find_tuning(name: &str) -> Option<&'static Tuning> {
    TUNINGS.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn every_semitone_maps_back_to_itself() {
        for i in -48..=48 {
            let freq = 440.0 * 2.0_f32.powf(i as f32 / 12.0);
            let note = closest_note(freq, 440.0).unwrap();

            let midi_note = i + 69;
            let expected = format!(
                "{}{}",
                NOTE_NAMES[((i + 1200) % 12) as usize],
                midi_note / 12 - 1
            );
            assert_eq!(note.note, expected, "offset {i}");
            assert_abs_diff_eq!(note.closest_pitch, round_tenth(freq), epsilon = 0.051);
        }
    }

    #[test]
    fn octave_boundaries_follow_midi_convention() {
        assert_eq!(note_name(0), "A4");
        assert_eq!(note_name(3), "C5");
        assert_eq!(note_name(2), "B4");
        assert_eq!(note_name(-9), "C4");
        assert_eq!(note_name(-10), "B3");
        assert_eq!(note_name(-21), "C3");
        assert_eq!(note_name(-48), "A0");
        assert_eq!(note_name(-69), "C-1");
        assert_eq!(note_name(-70), "B-2");
    }

    #[test]
    fn nearby_frequencies_snap_to_nearest_note() {
        let note = closest_note(445.0, 440.0).unwrap();
        assert_eq!(note.note, "A4");
        assert_eq!(note.max_frequency, 445.0);
        assert_eq!(note.closest_pitch, 440.0);

        let note = closest_note(82.0, 440.0).unwrap();
        assert_eq!(note.note, "E2");
        assert_eq!(note.closest_pitch, 82.4);

        let note = closest_note(261.63, 440.0).unwrap();
        assert_eq!(note.note, "C4");
        assert_eq!(note.max_frequency, 261.6);
    }

    #[test]
    fn concert_pitch_shifts_reference() {
        let note = closest_note(442.0, 442.0).unwrap();
        assert_eq!(note.note, "A4");
        assert_eq!(note.closest_pitch, 442.0);
    }

    #[test]
    fn invalid_frequencies_have_no_note() {
        assert!(closest_note(0.0, 440.0).is_none());
        assert!(closest_note(-5.0, 440.0).is_none());
        assert!(closest_note(f32::NAN, 440.0).is_none());
    }

    #[test]
    fn test_cents_deviation() {
        assert_abs_diff_eq!(calculate_cents_deviation(880.0, 440.0), 1200.0, epsilon = 1e-3);
        assert_abs_diff_eq!(calculate_cents_deviation(440.0, 440.0), 0.0);
        assert!(calculate_cents_deviation(435.0, 440.0) < 0.0);
    }

    #[test]
    fn splits_note_labels() {
        assert_eq!(pitch_class("C#3"), Some("C#"));
        assert_eq!(octave("C#3"), Some(3));
        assert_eq!(pitch_class("A4"), Some("A"));
        assert_eq!(octave("B-2"), Some(-2));
        assert_eq!(pitch_class("H2"), None);
        assert_eq!(octave("E"), None);
    }

    #[test]
    fn catalog_is_consistent() {
        assert_eq!(tunings().len(), 13);
        for tuning in tunings() {
            assert_eq!(tuning.notes.len(), tuning.pitches.len(), "{}", tuning.name);
            for (note, pitch) in tuning.notes.iter().zip(&tuning.pitches) {
                assert_eq!(pitch_class(pitch), Some(note.as_str()));
            }
        }
    }

    #[test]
    fn standard_tuning_fretboard_alignment() {
        let standard = find_tuning("Standard tuning (E)").unwrap();
        assert_eq!(standard.notes, ["E", "A", "D", "G", "B", "E"]);
        assert_eq!(
            standard.rows().collect::<Vec<_>>(),
            ["E", "B", "G", "D", "A", "E"]
        );
        assert_eq!(standard.strings_for("E"), vec![0, 5]);
        assert!(standard.strings_for("C#").is_empty());
        // C on the A string sits at the third fret.
        assert_eq!(standard.fret_for(1, "C"), Some(3));
        assert_eq!(standard.fret_for(0, "E"), Some(0));
        assert_eq!(standard.fret_for(0, "D#"), Some(11));
        assert_eq!(standard.fret_for(9, "E"), None);
        assert!(find_tuning("Open G").is_none());
    }
}
