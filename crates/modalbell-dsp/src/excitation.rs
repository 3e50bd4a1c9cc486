/// Forcing signal for the next rendered block.
///
/// Written by strikes and by external input audio, consumed (and zeroed)
/// by every render. The block length is fixed by the const parameter.

use std::f64::consts::PI;

use crate::error::{try_zeroed, ModalError, Result};

pub struct ExcitationBuffer<const N: usize> {
    force: Box<[f32; N]>,
}

impl<const N: usize> ExcitationBuffer<N> {
    pub fn new() -> Result<Self> {
        let force: Box<[f32; N]> = try_zeroed(N)?
            .into_boxed_slice()
            .try_into()
            .map_err(|_| ModalError::InvalidArgument(format!("excitation block of {} samples", N)))?;
        Ok(Self { force })
    }

    pub fn as_block(&self) -> &[f32; N] {
        &self.force
    }

    /// Raw block for external input sources to write into before a render.
    pub fn as_block_mut(&mut self) -> &mut [f32; N] {
        &mut self.force
    }

    pub fn clear(&mut self) {
        self.force.fill(0.0);
    }

    /// Add a raised-cosine pulse of peak `2 * energy` spread over `samples` samples.
    ///
    /// Additive, so overlapping strikes accumulate. `samples` is capped at the
    /// block length; one sample or fewer degenerates to `force[0] = energy`.
    pub fn add_pulse(&mut self, energy: f32, samples: usize) {
        if N == 0 {
            return;
        }
        let n = samples.min(N);
        if n <= 1 {
            self.force[0] = energy;
            return;
        }
        let denom = (n + 1) as f64;
        for (j, f) in self.force[..n].iter_mut().enumerate() {
            let window = 1.0 - (2.0 * PI * (j + 1) as f64 / denom).cos();
            *f += energy * window as f32;
        }
    }
}

/// Number of samples a strike of `duration_secs` occupies, before block capping.
pub fn pulse_samples(sample_rate: f64, duration_secs: f32) -> usize {
    let n = (sample_rate * duration_secs as f64).round();
    // Negative and NaN durations saturate to zero.
    n as usize
}

/// Per-sample pulse energy for a strike of total weight `energy`, shared
/// across `modes` modes.
///
/// The raised-cosine pulse of `samples` samples sums to `samples + 1` times its
/// per-sample energy (a single-sample pulse to exactly one). Dividing that
/// out, and the mode count with it, keeps a unit strike on a model with
/// unit gains inside [-1, 1] before the output clamp.
pub fn strike_energy(energy: f32, samples: usize, modes: usize) -> f32 {
    let area = if samples <= 1 { 1.0 } else { (samples + 1) as f32 };
    energy / (area * modes.max(1) as f32)
}
