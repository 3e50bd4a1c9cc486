/// Bell Renderer: ModalBell modal synthesis WAV renderer.
///
/// Standalone CLI tool: loads a `.sy` model (or the built-in bell), strikes it
/// once, on a MIDI file's note-ons, or drives it with an input WAV, optionally
/// replays a slider-box capture against it, and writes the result as 24-bit
/// mono WAV.

mod midi;
mod wav;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, debug, info, warn};
use modalbell_dsp::sliders::SliderParser;
use modalbell_dsp::{ModalEngine, ModalModel, SliderMap, presets, sy};

use midi::Strike;

/// Activity level below which `--impulse` considers the object silent.
const SILENCE_THRESHOLD: f64 = 1e-4;

const BLOCK_SIZES: [usize; 8] = [16, 32, 64, 128, 256, 512, 1024, 4096];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputMix {
    /// Add input audio to any strike already in the excitation block.
    Add,
    /// Input audio overwrites the excitation block.
    Replace,
}

#[derive(Debug, Parser)]
#[command(name = "bell-renderer", version, about = "ModalBell modal synthesis WAV renderer")]
struct Args {
    /// Model file (.sy); defaults to the built-in bell
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Prime (second partial) frequency of the built-in bell, in Hz
    #[arg(long, default_value_t = 440.0)]
    prime: f32,

    /// Output WAV file
    #[arg(short, long, default_value = "bell.wav")]
    output: PathBuf,

    /// Duration in seconds
    #[arg(short, long, default_value_t = 2.0)]
    duration: f64,

    /// Strike weight, 1.0 = full strike (scaled by velocity in --midi mode)
    #[arg(short, long, default_value_t = 1.0)]
    energy: f32,

    /// Strike pulse length in milliseconds
    #[arg(long, default_value_t = 1.0)]
    strike_ms: f32,

    /// Engine block size
    #[arg(short, long, default_value_t = 64, value_parser = parse_block_size)]
    block_size: usize,

    #[arg(long, default_value_t = modalbell_dsp::DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Render only the first N modes
    #[arg(long)]
    used_modes: Option<usize>,

    /// Stop as soon as the object falls silent (bounded by --duration)
    #[arg(long)]
    impulse: bool,

    /// Strike on every note-on of a Standard MIDI File
    #[arg(long)]
    midi: Option<PathBuf>,

    /// External excitation audio
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = InputMix::Add)]
    input_mix: InputMix,

    /// Do not strike at t=0 (useful with --input)
    #[arg(long)]
    no_strike: bool,

    /// Raw slider-box byte capture, replayed while rendering
    #[arg(long)]
    sliders: Option<PathBuf>,

    /// Arrival rate of the slider capture in bytes per second (9600 baud)
    #[arg(long, default_value_t = 960.0)]
    slider_rate: f64,

    /// Output gain applied after rendering
    #[arg(long, default_value_t = 1.0)]
    gain: f32,

    /// Write the model used for rendering to a .sy file
    #[arg(long)]
    save_model: Option<PathBuf>,

    /// Print the engine state to stdout after rendering
    #[arg(long)]
    dump: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn parse_block_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if BLOCK_SIZES.contains(&n) {
        Ok(n)
    } else {
        Err(format!("block size must be one of {BLOCK_SIZES:?}"))
    }
}

/// Everything one render needs, independent of block size.
struct Job {
    model: ModalModel,
    strikes: Vec<Strike>,
    /// Input audio and its file's sample rate.
    input: Option<(Vec<f32>, u32)>,
    sliders: Vec<u8>,
}

/// Rendered samples at the rate the engine actually ran.
struct Rendered {
    samples: Vec<f32>,
    sample_rate: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    simple_logger::SimpleLogger::new().with_level(level).init()?;

    if args.duration.is_nan() || args.duration <= 0.0 {
        bail!("duration must be positive, got {}", args.duration);
    }

    let model = match &args.model {
        Some(path) => sy::load(path)?,
        None => presets::bell(args.prime)?,
    };
    if let Some(path) = &args.save_model {
        sy::save(&model, path)?;
        info!("Model written: {}", path.display());
    }

    let strikes = match &args.midi {
        Some(path) => {
            let s = midi::load_strikes(path)?;
            info!("{} strikes from {}", s.len(), path.display());
            s
        }
        None if args.no_strike => Vec::new(),
        None => vec![Strike {
            time_secs: 0.0,
            velocity: 1.0,
        }],
    };

    let input = match &args.input {
        Some(path) => Some(wav::read_mono(path)?),
        None => None,
    };

    if args.slider_rate.is_nan() || args.slider_rate <= 0.0 {
        bail!("slider rate must be positive, got {}", args.slider_rate);
    }
    let sliders = match &args.sliders {
        Some(path) => std::fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => Vec::new(),
    };

    let job = Job {
        model,
        strikes,
        input,
        sliders,
    };

    let rendered = match args.block_size {
        16 => render::<16>(&args, job)?,
        32 => render::<32>(&args, job)?,
        64 => render::<64>(&args, job)?,
        128 => render::<128>(&args, job)?,
        256 => render::<256>(&args, job)?,
        512 => render::<512>(&args, job)?,
        1024 => render::<1024>(&args, job)?,
        4096 => render::<4096>(&args, job)?,
        other => bail!("unsupported block size {other}"),
    };

    let peak = rendered.samples.iter().map(|x| x.abs()).fold(0.0f32, f32::max);
    info!("Peak amplitude: {peak:.6} ({:.1} dBFS)", 20.0 * peak.log10());

    wav::write_wav(&args.output, &rendered.samples, rendered.sample_rate)?;
    info!("Written: {}", args.output.display());
    Ok(())
}

fn render<const N: usize>(args: &Args, job: Job) -> Result<Rendered> {
    let mut engine = ModalEngine::<N>::from_model(job.model, args.sample_rate)
        .context("building engine")?;
    if let Some(n) = args.used_modes {
        engine.set_used_mode_count(n);
    }
    let sr = engine.sample_rate();
    let sample_rate = sr as u32;

    let total = (args.duration * sr).round() as usize;
    let strike_secs = args.strike_ms / 1000.0;
    // (sample index, energy), in time order
    let mut strikes: Vec<(usize, f32)> = job
        .strikes
        .iter()
        .map(|s| ((s.time_secs * sr).round() as usize, args.energy * s.velocity))
        .collect();
    strikes.sort_by_key(|&(at, _)| at);

    let input = match job.input {
        Some((samples, file_rate)) => {
            if file_rate != sample_rate {
                warn!("input is {file_rate} Hz, rendering at {sample_rate} Hz without resampling");
            }
            samples
        }
        None => Vec::new(),
    };

    let slider_map = SliderMap::default();
    let mut slider_parser = SliderParser::new();
    let mut slider_pos = 0;

    info!(
        "Rendering {} modes ({} used), block {}, {:.3}s at {} Hz → {}",
        engine.mode_count(),
        engine.used_mode_count(),
        N,
        args.duration,
        sample_rate,
        args.output.display()
    );

    let mut out = Vec::with_capacity(total);
    let mut block = [0.0f32; N];
    let mut next_strike = 0;
    let mut start = 0;
    while start < total {
        let end = start + N;

        // Strikes land on the block boundary at or before their time
        while let Some(&(at, energy)) = strikes.get(next_strike) {
            if at >= end {
                break;
            }
            engine.strike(energy, strike_secs);
            next_strike += 1;
        }

        // Slider bytes that have arrived by the end of this block
        if slider_pos < job.sliders.len() {
            let arrived = ((end as f64 / sr * args.slider_rate) as usize).min(job.sliders.len());
            slider_parser.feed(&job.sliders[slider_pos..arrived], |ev| {
                if slider_map.dispatch(ev.index, ev.normalized(), &mut engine) {
                    debug!("slider {} -> {:.4}", ev.index, ev.normalized());
                }
            });
            slider_pos = arrived;
        }

        if start < input.len() {
            let chunk = &input[start..input.len().min(end)];
            let force = engine.excitation_mut();
            match args.input_mix {
                InputMix::Add => force.iter_mut().zip(chunk).for_each(|(f, x)| *f += x),
                InputMix::Replace => {
                    force.fill(0.0);
                    force[..chunk.len()].copy_from_slice(chunk);
                }
            }
        }

        let activity = engine.render(&mut block);
        let take = N.min(total - start);
        out.extend(block[..take].iter().map(|&y| y * args.gain));
        start = end;

        let pending =
            next_strike < strikes.len() || start < input.len() || slider_pos < job.sliders.len();
        if args.impulse && !pending && activity < SILENCE_THRESHOLD {
            info!("Silent after {:.3}s", start as f64 / sr);
            break;
        }
    }

    if args.dump {
        engine.dump(io::stdout().lock())?;
    }
    Ok(Rendered {
        samples: out,
        sample_rate,
    })
}
