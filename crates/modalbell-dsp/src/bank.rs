/// Bank of two-pole reson filters, one per mode.
///
/// Each mode's impulse response is a damped sinusoid e^(-d t) sin(2 pi f t).
/// Its transfer function is H(z) = 1 / (1 - 2R cos(theta) z^-1 + R^2 z^-2),
/// driven through a per-mode input gain taken from the active contact point.
///
/// Coefficients are derived in two independent steps:
/// - reson step: R^2, 2R cos(theta), R sin(theta) from frequency and decay
/// - location step: input gain = gain_scale * R sin(theta) * gain[point][mode]
///
/// so a gain-only change never re-evaluates trig terms.

use std::f64::consts::PI;

use crate::error::{try_zeroed, Result};
use crate::model::{ModalModel, Scales};

/// Reson-step coefficients for one mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResonCoeffs {
    pub r2: f32,
    pub two_r_cos_theta: f32,
    pub c_term: f32,
}

impl ResonCoeffs {
    /// Derive the reson coefficients for a single mode.
    ///
    /// `decay == 0` yields R = 1: a marginally stable, non-decaying oscillator.
    pub fn derive(frequency: f32, decay: f32, scales: &Scales, sample_rate: f64) -> Self {
        let r = (-(scales.decay as f64) * (decay as f64) / sample_rate).exp();
        let theta = 2.0 * PI * (scales.frequency as f64) * (frequency as f64) / sample_rate;
        Self {
            r2: (r * r) as f32,
            two_r_cos_theta: (2.0 * theta.cos() * r) as f32,
            c_term: (theta.sin() * r) as f32,
        }
    }
}

/// Struct-of-arrays filter bank, indices aligned with the model's modes.
#[derive(Debug, Clone)]
pub struct ResonatorBank {
    r2: Vec<f32>,
    two_r_cos_theta: Vec<f32>,
    c_term: Vec<f32>,
    point_gain: Vec<f32>,
    history1: Vec<f32>,
    history2: Vec<f32>,
    active_point: usize,
}

impl ResonatorBank {
    /// Zeroed bank for `mode_count` modes: silent until coefficients are computed.
    pub fn new(mode_count: usize) -> Result<Self> {
        Ok(Self {
            r2: try_zeroed(mode_count)?,
            two_r_cos_theta: try_zeroed(mode_count)?,
            c_term: try_zeroed(mode_count)?,
            point_gain: try_zeroed(mode_count)?,
            history1: try_zeroed(mode_count)?,
            history2: try_zeroed(mode_count)?,
            active_point: 0,
        })
    }

    pub fn mode_count(&self) -> usize {
        self.r2.len()
    }

    pub fn active_point(&self) -> usize {
        self.active_point
    }

    pub fn r2(&self) -> &[f32] {
        &self.r2
    }

    pub fn two_r_cos_theta(&self) -> &[f32] {
        &self.two_r_cos_theta
    }

    pub fn c_term(&self) -> &[f32] {
        &self.c_term
    }

    pub fn point_gain(&self) -> &[f32] {
        &self.point_gain
    }

    pub fn history1(&self) -> &[f32] {
        &self.history1
    }

    pub fn history2(&self) -> &[f32] {
        &self.history2
    }

    /// Reson step for one mode. Out-of-range modes are ignored.
    pub fn compute_reson_coeff(&mut self, model: &ModalModel, sample_rate: f64, mode: usize) {
        if mode >= self.mode_count() || mode >= model.mode_count() {
            return;
        }
        let c = ResonCoeffs::derive(
            model.frequencies()[mode],
            model.decays()[mode],
            &model.scales,
            sample_rate,
        );
        self.r2[mode] = c.r2;
        self.two_r_cos_theta[mode] = c.two_r_cos_theta;
        self.c_term[mode] = c.c_term;
    }

    /// Location step for one mode. A model without contact points couples with gain 0.
    pub fn compute_location(&mut self, model: &ModalModel, mode: usize) {
        if mode >= self.mode_count() {
            return;
        }
        let gain = model.gains().get(self.active_point, mode).unwrap_or(0.0);
        self.point_gain[mode] = model.scales.gain * self.c_term[mode] * gain;
    }

    /// Both steps for every mode: the full rebuild.
    pub fn compute_all(&mut self, model: &ModalModel, sample_rate: f64) {
        for i in 0..self.mode_count() {
            self.compute_reson_coeff(model, sample_rate, i);
            self.compute_location(model, i);
        }
    }

    /// Both steps for a single mode.
    pub fn recompute_one(&mut self, model: &ModalModel, sample_rate: f64, mode: usize) {
        self.compute_reson_coeff(model, sample_rate, mode);
        self.compute_location(model, mode);
    }

    /// Select the contact point that drives the bank and redo every location step.
    /// Ignored when `point` is out of range for the model.
    pub fn set_active_point(&mut self, model: &ModalModel, point: usize) {
        if point >= model.point_count() {
            return;
        }
        self.active_point = point;
        for i in 0..self.mode_count() {
            self.compute_location(model, i);
        }
    }

    /// Zero all filter state.
    pub fn clear_history(&mut self) {
        self.history1.fill(0.0);
        self.history2.fill(0.0);
    }

    /// Scale all filter state, keeping the phase relationships between modes.
    pub fn damp(&mut self, factor: f32) {
        for (h1, h2) in self.history1.iter_mut().zip(self.history2.iter_mut()) {
            *h1 *= factor;
            *h2 *= factor;
        }
    }

    /// Run the first `used` modes over `force`, summing into `output` (additive).
    ///
    /// Returns the sum of |y| over the block for mode 0 only.
    pub fn render(&mut self, used: usize, force: &[f32], output: &mut [f32]) -> f64 {
        let used = used.min(self.mode_count());
        let len = force.len().min(output.len());
        let force = &force[..len];
        let output = &mut output[..len];
        let mut activity = 0.0f64;

        for i in 0..used {
            let two_r_cos_theta = self.two_r_cos_theta[i];
            let r2 = self.r2[i];
            let gain = self.point_gain[i];
            let mut h1 = self.history1[i];
            let mut h2 = self.history2[i];

            for (out, &f) in output.iter_mut().zip(force) {
                let y = two_r_cos_theta * h1 - r2 * h2 + gain * f;
                h2 = h1;
                h1 = y;
                *out += y;
                if i == 0 {
                    activity += y.abs() as f64;
                }
            }

            self.history1[i] = h1;
            self.history2[i] = h2;
        }

        activity
    }
}
