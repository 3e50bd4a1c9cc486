/// Modal description of a vibrating object.
///
/// Per-mode frequency (Hz) and angular decay rate (1/s), a gain table
/// coupling each contact point into each mode, and three global scale
/// factors. The scales are applied when filter coefficients are derived,
/// never baked into the raw arrays, so rescaling is always cheap.

use crate::error::{try_zeroed, ModalError, Result};

/// Point-major gain table: row `p` holds the gain of every mode at contact point `p`.
#[derive(Debug, Clone, PartialEq)]
pub struct GainTable {
    mode_count: usize,
    point_count: usize,
    values: Vec<f32>,
}

impl GainTable {
    fn zeroed(point_count: usize, mode_count: usize) -> Result<Self> {
        let len = table_len(point_count, mode_count)?;
        Ok(Self {
            mode_count,
            point_count,
            values: try_zeroed(len)?,
        })
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn mode_count(&self) -> usize {
        self.mode_count
    }

    /// Gain of `mode` at `point`, or `None` when either index is out of range.
    pub fn get(&self, point: usize, mode: usize) -> Option<f32> {
        self.index(point, mode).map(|i| self.values[i])
    }

    /// Returns false (and changes nothing) when either index is out of range.
    pub fn set(&mut self, point: usize, mode: usize, value: f32) -> bool {
        match self.index(point, mode) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// All mode gains for one contact point.
    pub fn row(&self, point: usize) -> Option<&[f32]> {
        if point >= self.point_count {
            return None;
        }
        let start = point * self.mode_count;
        Some(&self.values[start..start + self.mode_count])
    }

    /// The whole table in point-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    fn index(&self, point: usize, mode: usize) -> Option<usize> {
        if point < self.point_count && mode < self.mode_count {
            Some(point * self.mode_count + mode)
        } else {
            None
        }
    }
}

fn table_len(point_count: usize, mode_count: usize) -> Result<usize> {
    point_count.checked_mul(mode_count).ok_or_else(|| {
        ModalError::InvalidArgument(format!(
            "gain table of {point_count} points x {mode_count} modes overflows"
        ))
    })
}

/// Global multipliers applied at coefficient-derivation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    pub frequency: f32,
    pub decay: f32,
    pub gain: f32,
}

impl Default for Scales {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            decay: 1.0,
            gain: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModalModel {
    used_mode_count: usize,
    frequencies: Vec<f32>,
    decays: Vec<f32>,
    gains: GainTable,
    pub scales: Scales,
}

impl ModalModel {
    /// All-zero model with unit scales; every mode is rendered.
    pub fn new(mode_count: usize, point_count: usize) -> Result<Self> {
        let gains = GainTable::zeroed(point_count, mode_count)?;
        Ok(Self {
            used_mode_count: mode_count,
            frequencies: try_zeroed(mode_count)?,
            decays: try_zeroed(mode_count)?,
            gains,
            scales: Scales::default(),
        })
    }

    /// Build a fully populated model in one shot (the loader contract).
    ///
    /// - `frequencies`, `decays`: one entry per mode
    /// - `gains`: `point_count * mode_count` values, point-major
    /// - `used_mode_count`: clamped to the mode count
    pub fn from_parts(
        used_mode_count: usize,
        frequencies: Vec<f32>,
        decays: Vec<f32>,
        point_count: usize,
        gains: Vec<f32>,
        scales: Scales,
    ) -> Result<Self> {
        let mode_count = frequencies.len();
        if decays.len() != mode_count {
            return Err(ModalError::InvalidArgument(format!(
                "{} decays for {mode_count} modes",
                decays.len()
            )));
        }
        let expected = table_len(point_count, mode_count)?;
        if gains.len() != expected {
            return Err(ModalError::InvalidArgument(format!(
                "{} gains for {point_count} points x {mode_count} modes",
                gains.len()
            )));
        }
        if used_mode_count > mode_count {
            log::warn!(
                "used mode count {used_mode_count} exceeds mode count {mode_count}, clamping"
            );
        }

        Ok(Self {
            used_mode_count: used_mode_count.min(mode_count),
            frequencies,
            decays,
            gains: GainTable {
                mode_count,
                point_count,
                values: gains,
            },
            scales,
        })
    }

    pub fn mode_count(&self) -> usize {
        self.frequencies.len()
    }

    pub fn point_count(&self) -> usize {
        self.gains.point_count
    }

    pub fn used_mode_count(&self) -> usize {
        self.used_mode_count
    }

    /// Clamped to the mode count.
    pub fn set_used_mode_count(&mut self, n: usize) {
        self.used_mode_count = n.min(self.mode_count());
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    pub fn decays(&self) -> &[f32] {
        &self.decays
    }

    pub fn gains(&self) -> &GainTable {
        &self.gains
    }

    /// Ignored when `mode` is out of range.
    pub fn set_frequency(&mut self, mode: usize, hz: f32) {
        if let Some(f) = self.frequencies.get_mut(mode) {
            *f = hz;
        }
    }

    /// Ignored when `mode` is out of range.
    pub fn set_decay(&mut self, mode: usize, rate: f32) {
        if let Some(d) = self.decays.get_mut(mode) {
            *d = rate;
        }
    }

    /// Ignored when `point` or `mode` is out of range.
    pub fn set_gain(&mut self, point: usize, mode: usize, value: f32) {
        self.gains.set(point, mode, value);
    }
}
