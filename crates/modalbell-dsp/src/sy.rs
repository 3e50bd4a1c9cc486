/// Reader and writer for `.sy` modal model files.
///
/// Whitespace-delimited labelled sections in fixed order:
///
/// ```text
/// nactive_freq: <used modes>
/// n_freq: <modes>
/// n_points: <points>
/// f_scale: <x>
/// d_scale: <x>
/// a_scale: <x>
/// frequencies: <modes floats>
/// dampings: <modes floats>
/// amplitudes[point][freq]: <points * modes floats, point-major>
/// END
/// ```
///
/// Label text varies between files in the wild, so any non-numeric token is
/// accepted where a label is expected.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::{ModalError, Result};
use crate::model::{ModalModel, Scales};

struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn label(&mut self, section: &'static str) -> Result<()> {
        match self.inner.next() {
            Some(tok) if tok.parse::<f64>().is_err() => Ok(()),
            Some(tok) => Err(ModalError::Parse {
                section,
                message: format!("expected section label, found number `{tok}`"),
            }),
            None => Err(ModalError::Parse {
                section,
                message: "unexpected end of file".into(),
            }),
        }
    }

    fn value<T: FromStr>(&mut self, section: &'static str) -> Result<T> {
        let tok = self.inner.next().ok_or_else(|| ModalError::Parse {
            section,
            message: "unexpected end of file".into(),
        })?;
        tok.parse().map_err(|_| ModalError::Parse {
            section,
            message: format!("cannot parse `{tok}`"),
        })
    }

    fn values(&mut self, section: &'static str, count: usize) -> Result<Vec<f32>> {
        let mut out = Vec::new();
        out.try_reserve_exact(count)
            .map_err(|_| ModalError::OutOfMemory {
                bytes: count.saturating_mul(std::mem::size_of::<f32>()),
            })?;
        for _ in 0..count {
            out.push(self.value(section)?);
        }
        Ok(out)
    }
}

/// Parse a model from any buffered reader.
pub fn read(mut reader: impl BufRead) -> Result<ModalModel> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse(&text)
}

/// Parse a model from file contents.
pub fn parse(text: &str) -> Result<ModalModel> {
    let mut t = Tokens {
        inner: text.split_whitespace(),
    };

    t.label("nactive_freq")?;
    let used: usize = t.value("nactive_freq")?;
    t.label("n_freq")?;
    let modes: usize = t.value("n_freq")?;
    t.label("n_points")?;
    let points: usize = t.value("n_points")?;

    t.label("f_scale")?;
    let frequency = t.value("f_scale")?;
    t.label("d_scale")?;
    let decay = t.value("d_scale")?;
    t.label("a_scale")?;
    let gain = t.value("a_scale")?;

    t.label("frequencies")?;
    let frequencies = t.values("frequencies", modes)?;
    t.label("dampings")?;
    let decays = t.values("dampings", modes)?;

    let table = points.checked_mul(modes).ok_or_else(|| ModalError::Parse {
        section: "amplitudes",
        message: format!("{points} points x {modes} modes overflows"),
    })?;
    t.label("amplitudes")?;
    let gains = t.values("amplitudes", table)?;
    t.label("END")?;

    ModalModel::from_parts(
        used,
        frequencies,
        decays,
        points,
        gains,
        Scales {
            frequency,
            decay,
            gain,
        },
    )
}

pub fn load(path: impl AsRef<Path>) -> Result<ModalModel> {
    let path = path.as_ref();
    let model = read(BufReader::new(File::open(path)?))?;
    log::info!(
        "loaded {}: {} modes ({} used), {} points",
        path.display(),
        model.mode_count(),
        model.used_mode_count(),
        model.point_count()
    );
    Ok(model)
}

/// Write a model in the canonical layout, one value per line.
///
/// Floats use the shortest representation that parses back to the same bits.
pub fn write(model: &ModalModel, mut w: impl Write) -> Result<()> {
    writeln!(w, "nactive_freq:")?;
    writeln!(w, "{}", model.used_mode_count())?;
    writeln!(w, "n_freq:")?;
    writeln!(w, "{}", model.mode_count())?;
    writeln!(w, "n_points:")?;
    writeln!(w, "{}", model.point_count())?;
    writeln!(w, "f_scale:")?;
    writeln!(w, "{}", model.scales.frequency)?;
    writeln!(w, "d_scale:")?;
    writeln!(w, "{}", model.scales.decay)?;
    writeln!(w, "a_scale:")?;
    writeln!(w, "{}", model.scales.gain)?;
    writeln!(w, "frequencies:")?;
    for f in model.frequencies() {
        writeln!(w, "{f}")?;
    }
    writeln!(w, "dampings:")?;
    for d in model.decays() {
        writeln!(w, "{d}")?;
    }
    writeln!(w, "amplitudes[point][freq]:")?;
    for a in model.gains().as_slice() {
        writeln!(w, "{a}")?;
    }
    writeln!(w, "END")?;
    Ok(())
}

pub fn save(model: &ModalModel, path: impl AsRef<Path>) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write(model, &mut w)?;
    w.flush()?;
    Ok(())
}
