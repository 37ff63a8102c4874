// Tuning conversions - cents offsets relative to A4 = 440 Hz
// Clamping and note mapping drive the tuning editor

use serde::{Deserialize, Serialize};

use super::note::Note;

pub const A4_FREQUENCY: f64 = 440.0;
pub const SCIENTIFIC_A4_FREQUENCY: f64 = 432.0;
pub const CENTS_PER_OCTAVE: f64 = 1200.0;
pub const CENTS_PER_SEMITONE: f64 = 100.0;
pub const MIN_TUNING_CENTS: f64 = -2400.0;
pub const MAX_TUNING_CENTS: f64 = 2400.0;

/// Label shown when the tuning is not shifted at all
pub const NO_SHIFT_LABEL: &str = "None";
/// Label shown when the tuning does not land on a semitone
pub const NO_NOTE_LABEL: &str = "-";

/// Frequency of A4 after shifting it by `cents`
pub fn cents_to_frequency(cents: f64) -> f64 {
    A4_FREQUENCY * (cents / CENTS_PER_OCTAVE).exp2()
}

/// Offset in cents of `frequency` relative to A4
pub fn frequency_to_cents(frequency: f64) -> f64 {
    CENTS_PER_OCTAVE * (frequency / A4_FREQUENCY).log2()
}

/// A clamped tuning value with its derived frequency and A4 shift label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningSetting {
    pub cents: f64,
    pub frequency: f64,
    pub label: String,
}

impl TuningSetting {
    /// A4 = 440 Hz
    pub fn standard() -> Self {
        clamp_and_quantize_tuning(0.0)
    }

    /// A4 = 432 Hz
    pub fn scientific() -> Self {
        clamp_and_quantize_tuning(frequency_to_cents(SCIENTIFIC_A4_FREQUENCY))
    }

    pub fn from_frequency(frequency: f64) -> Self {
        clamp_and_quantize_tuning(frequency_to_cents(frequency))
    }

    /// True if the shift maps onto a discrete note
    pub fn is_whole_semitone(&self) -> bool {
        self.label != NO_NOTE_LABEL
    }
}

/// Clamp `cents` to [-2400, 2400] and work out the note A4 is shifted to
///
/// Whole semitone shifts map to the label of the note that many semitones from A4,
/// spelled with flats below A4 and sharps otherwise. A zero shift is labelled
/// "None" and fractional shifts "-".
pub fn clamp_and_quantize_tuning(cents: f64) -> TuningSetting {
    let cents = if cents.is_nan() { 0.0 } else { cents };
    let clamped = cents.clamp(MIN_TUNING_CENTS, MAX_TUNING_CENTS);
    let semitones = (clamped / CENTS_PER_SEMITONE).round();

    let label = if semitones * CENTS_PER_SEMITONE != clamped {
        NO_NOTE_LABEL.to_string()
    } else if semitones == 0.0 {
        NO_SHIFT_LABEL.to_string()
    } else {
        // +/-24 semitones from A4 always stays inside the MIDI range
        match Note::A4.offset(semitones as i32) {
            Some(note) if note < Note::A4 => note.label_with_flats(),
            Some(note) => note.label_with_sharps(),
            None => NO_NOTE_LABEL.to_string(),
        }
    };

    TuningSetting {
        cents: clamped,
        frequency: cents_to_frequency(clamped),
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cents_frequency_round_trip() {
        let mut cents = MIN_TUNING_CENTS;
        while cents <= MAX_TUNING_CENTS {
            let back = frequency_to_cents(cents_to_frequency(cents));
            assert_abs_diff_eq!(back, cents, epsilon = 1e-6);
            cents += 12.5;
        }
    }

    #[test]
    fn test_octave_doubles_frequency() {
        assert_abs_diff_eq!(cents_to_frequency(1200.0), 880.0, epsilon = 1e-9);
        assert_abs_diff_eq!(cents_to_frequency(-1200.0), 220.0, epsilon = 1e-9);
        assert_abs_diff_eq!(frequency_to_cents(440.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_is_untouched() {
        let setting = clamp_and_quantize_tuning(0.0);
        assert_eq!(setting.cents, 0.0);
        assert_eq!(setting.frequency, 440.0);
        assert_eq!(setting.label, "None");
    }

    #[test]
    fn test_clamping() {
        assert_eq!(clamp_and_quantize_tuning(-2500.0).cents, -2400.0);
        assert_eq!(clamp_and_quantize_tuning(9999.0).cents, 2400.0);
        assert_eq!(clamp_and_quantize_tuning(-2500.0).label, "A2");
        assert_eq!(clamp_and_quantize_tuning(2400.0).label, "A6");
    }

    #[test]
    fn test_semitone_labels() {
        assert_eq!(clamp_and_quantize_tuning(100.0).label, "A♯4");
        assert_eq!(clamp_and_quantize_tuning(-100.0).label, "A♭4");
        assert_eq!(clamp_and_quantize_tuning(300.0).label, "C5");
        assert_eq!(clamp_and_quantize_tuning(-300.0).label, "G♭4");
    }

    #[test]
    fn test_fractional_has_no_note() {
        let setting = clamp_and_quantize_tuning(150.0);
        assert_eq!(setting.label, "-");
        assert!(!setting.is_whole_semitone());
        assert_abs_diff_eq!(setting.frequency, cents_to_frequency(150.0), epsilon = 1e-12);
    }

    #[test]
    fn test_scientific_tuning() {
        let setting = TuningSetting::scientific();
        assert_abs_diff_eq!(setting.frequency, 432.0, epsilon = 1e-9);
        assert!(setting.cents < 0.0);
        assert_eq!(setting.label, "-");
    }
}
