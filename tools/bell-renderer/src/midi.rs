/// Strike schedule from a Standard MIDI File.
///
/// Every note-on with nonzero velocity becomes one strike; pitch is ignored
/// because the engine plays a single object. Tempo changes on any track
/// apply to all tracks.

use std::path::Path;

use anyhow::{Context, Result};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

/// Default MIDI tempo: 120 BPM.
const DEFAULT_TEMPO_US: u32 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub time_secs: f64,
    /// Velocity scaled to 0..1.
    pub velocity: f32,
}

pub fn load_strikes(path: &Path) -> Result<Vec<Strike>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let smf = Smf::parse(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(strikes_from_smf(&smf))
}

enum Event {
    Tempo(u32),
    NoteOn(u8),
}

pub fn strikes_from_smf(smf: &Smf) -> Vec<Strike> {
    // Absolute tick of every relevant event across all tracks
    let mut events: Vec<(u64, Event)> = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for ev in track {
            tick += ev.delta.as_int() as u64;
            match ev.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(t)) => events.push((tick, Event::Tempo(t.as_int()))),
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { vel, .. },
                    ..
                } if vel.as_int() > 0 => events.push((tick, Event::NoteOn(vel.as_int()))),
                _ => {}
            }
        }
    }
    // Stable sort keeps a tempo change ahead of notes on the same tick
    // only when it came first in the file; put tempos first explicitly.
    events.sort_by_key(|(tick, ev)| (*tick, matches!(ev, Event::NoteOn(_))));

    let mut strikes = Vec::new();
    match smf.header.timing {
        Timing::Metrical(tpb) => {
            let tpb = tpb.as_int().max(1) as f64;
            let mut tempo_us = DEFAULT_TEMPO_US as f64;
            let mut last_tick = 0u64;
            let mut secs = 0.0f64;
            for (tick, ev) in events {
                secs += (tick - last_tick) as f64 * tempo_us / 1e6 / tpb;
                last_tick = tick;
                match ev {
                    Event::Tempo(t) => tempo_us = t as f64,
                    Event::NoteOn(vel) => strikes.push(Strike {
                        time_secs: secs,
                        velocity: vel as f32 / 127.0,
                    }),
                }
            }
        }
        Timing::Timecode(fps, subframe) => {
            let ticks_per_sec = (fps.as_f32() as f64 * subframe as f64).max(1.0);
            for (tick, ev) in events {
                if let Event::NoteOn(vel) = ev {
                    strikes.push(Strike {
                        time_secs: tick as f64 / ticks_per_sec,
                        velocity: vel as f32 / 127.0,
                    });
                }
            }
        }
    }
    strikes
}
