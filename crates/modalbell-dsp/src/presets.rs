/// Built-in modal models.
///
/// Partial ratios follow the classic minor-third church bell tuning
/// (hum, prime, tierce, quint, nominal and the upper partials), measured
/// relative to the prime. Higher partials die faster, as in a real bell.

use crate::error::Result;
use crate::model::{ModalModel, Scales};

pub const BELL_MODES: usize = 10;

/// Partial frequency ratios relative to the prime.
pub const BELL_RATIOS: [f32; BELL_MODES] = [
    0.500, // hum
    1.000, // prime
    1.183, // tierce
    1.506, // quint
    2.000, // nominal
    2.514, // deciem
    2.662, // undeciem
    3.011, // duodeciem
    4.166, // upper octave
    5.433,
];

/// Angular decay rates (1/s).
pub const BELL_DECAYS: [f32; BELL_MODES] = [0.9, 1.6, 2.4, 3.1, 3.8, 5.5, 6.2, 7.9, 11.5, 16.0];

/// Strike gains at the sound bow (the single contact point).
pub const BELL_GAINS: [f32; BELL_MODES] = [0.45, 0.60, 0.80, 0.35, 1.00, 0.55, 0.40, 0.30, 0.22, 0.15];

/// A 10-mode, single-point bell tuned so its prime sits at `prime_hz`.
pub fn bell(prime_hz: f32) -> Result<ModalModel> {
    ModalModel::from_parts(
        BELL_MODES,
        BELL_RATIOS.iter().map(|r| r * prime_hz).collect(),
        BELL_DECAYS.to_vec(),
        1,
        BELL_GAINS.to_vec(),
        Scales::default(),
    )
}

/// All-zero model for building a sound entirely from live controls.
pub fn blank(modes: usize, points: usize) -> Result<ModalModel> {
    ModalModel::new(modes, points)
}
