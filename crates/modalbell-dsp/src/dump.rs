/// Human-readable diagnostic dump of an engine: model, derived coefficients,
/// filter state, and the pending excitation block.
///
/// Not a machine contract, but every float is printed in its shortest
/// round-trip form, so values read back from a dump are bit-exact.

use std::fmt;
use std::io;

use crate::engine::ModalEngine;

impl<const N: usize> fmt::Display for ModalEngine<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.model();
        let bank = self.bank();

        writeln!(f, "modal engine")?;
        writeln!(f, "  sample_rate: {}", self.sample_rate())?;
        writeln!(f, "  block_size: {}", N)?;
        writeln!(
            f,
            "  modes: {} (used {}), points: {}, active point: {}",
            model.mode_count(),
            model.used_mode_count(),
            model.point_count(),
            bank.active_point()
        )?;
        writeln!(
            f,
            "  f_scale={} d_scale={} a_scale={}",
            model.scales.frequency, model.scales.decay, model.scales.gain
        )?;

        writeln!(f, "modes:")?;
        for i in 0..model.mode_count() {
            let marker = if i < model.used_mode_count() { ' ' } else { '-' };
            writeln!(
                f,
                " {marker}{i:4} freq={} decay={} r2={} two_r_cos_theta={} c_term={} point_gain={} h1={} h2={}",
                model.frequencies()[i],
                model.decays()[i],
                bank.r2()[i],
                bank.two_r_cos_theta()[i],
                bank.c_term()[i],
                bank.point_gain()[i],
                bank.history1()[i],
                bank.history2()[i],
            )?;
        }

        writeln!(f, "gains[point][mode]:")?;
        for p in 0..model.point_count() {
            write!(f, "  {p:4}:")?;
            if let Some(row) = model.gains().row(p) {
                for g in row {
                    write!(f, " {g}")?;
                }
            }
            writeln!(f)?;
        }

        write!(f, "excitation:")?;
        for (k, x) in self.excitation().iter().enumerate() {
            if k % 8 == 0 {
                write!(f, "\n  {k:4}:")?;
            }
            write!(f, " {x}")?;
        }
        writeln!(f)
    }
}

impl<const N: usize> ModalEngine<N> {
    /// Write the diagnostic dump.
    pub fn dump(&self, mut w: impl io::Write) -> io::Result<()> {
        write!(w, "{self}")
    }
}
