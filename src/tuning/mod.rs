// Tuning Module
// Note labels, cents/frequency conversion and tuning quantization

pub mod note;
pub mod pitch;

pub use note::Note;
pub use pitch::{
    cents_to_frequency, clamp_and_quantize_tuning, frequency_to_cents, TuningSetting,
};
