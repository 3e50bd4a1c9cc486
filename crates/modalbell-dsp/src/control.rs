/// Live parameter control: discrete change events and the mapping from
/// normalized controller values to physical units.
///
/// A controller (slider box, MIDI CC, keyboard) produces `ParamChange`s and
/// hands them to a `ParameterSink` between renders. The engine's sink sets
/// the parameter and recomputes that single mode, so one slider move costs
/// O(1) regardless of the model size.

use crate::engine::ModalEngine;

/// One parameter change aimed at a single mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    Frequency { mode: usize, hz: f32 },
    Decay { mode: usize, rate: f32 },
    Gain { point: usize, mode: usize, value: f32 },
}

/// Anything that accepts parameter changes synchronously.
pub trait ParameterSink {
    /// Apply one change. Targets out of range must be ignored, never fail.
    fn apply(&mut self, change: ParamChange);
}

impl<const N: usize> ParameterSink for ModalEngine<N> {
    fn apply(&mut self, change: ParamChange) {
        match change {
            ParamChange::Frequency { mode, hz } => {
                self.set_frequency(mode, hz);
                self.recompute_one(mode);
            }
            ParamChange::Decay { mode, rate } => {
                self.set_decay(mode, rate);
                self.recompute_one(mode);
            }
            ParamChange::Gain { point, mode, value } => {
                self.set_gain(point, mode, value);
                self.compute_location(mode);
            }
        }
    }
}

/// What a controller slot drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Frequency,
    Decay,
    Gain,
}

/// Maps controller slots with normalized values in [0, 1] to parameter changes.
///
/// Slots are grouped `modes_per_kind` at a time: slot `s` drives kind
/// `s / modes_per_kind` (frequency, decay, gain) of mode `s % modes_per_kind`.
/// Frequency rises with the value, decay falls with it (slider up = longer
/// ring), gain rises with it and always targets `gain_point`.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderMap {
    pub modes_per_kind: usize,
    pub max_frequency_hz: f32,
    pub max_decay: f32,
    pub max_gain: f32,
    pub gain_point: usize,
}

impl Default for SliderMap {
    fn default() -> Self {
        Self {
            modes_per_kind: 3,
            max_frequency_hz: 5000.0,
            max_decay: 50.0,
            max_gain: 10.0,
            gain_point: 0,
        }
    }
}

impl SliderMap {
    /// Which kind and mode a slot drives, or `None` for unassigned slots.
    pub fn target(&self, slot: usize) -> Option<(ParamKind, usize)> {
        if self.modes_per_kind == 0 {
            return None;
        }
        let mode = slot % self.modes_per_kind;
        let kind = match slot / self.modes_per_kind {
            0 => ParamKind::Frequency,
            1 => ParamKind::Decay,
            2 => ParamKind::Gain,
            _ => return None,
        };
        Some((kind, mode))
    }

    /// Translate one controller move. Values outside [0, 1] are clamped.
    pub fn change(&self, slot: usize, normalized: f32) -> Option<ParamChange> {
        let v = normalized.clamp(0.0, 1.0);
        let (kind, mode) = self.target(slot)?;
        Some(match kind {
            ParamKind::Frequency => ParamChange::Frequency {
                mode,
                hz: v * self.max_frequency_hz,
            },
            ParamKind::Decay => ParamChange::Decay {
                mode,
                rate: (1.0 - v) * self.max_decay,
            },
            ParamKind::Gain => ParamChange::Gain {
                point: self.gain_point,
                mode,
                value: v * self.max_gain,
            },
        })
    }

    /// Translate and apply in one step. Returns whether the slot was mapped.
    pub fn dispatch(&self, slot: usize, normalized: f32, sink: &mut impl ParameterSink) -> bool {
        match self.change(slot, normalized) {
            Some(change) => {
                sink.apply(change);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<ParamChange>);

    impl ParameterSink for Recorder {
        fn apply(&mut self, change: ParamChange) {
            self.0.push(change);
        }
    }

    #[test]
    fn test_slot_layout() {
        let map = SliderMap::default();
        assert_eq!(map.target(0), Some((ParamKind::Frequency, 0)));
        assert_eq!(map.target(2), Some((ParamKind::Frequency, 2)));
        assert_eq!(map.target(4), Some((ParamKind::Decay, 1)));
        assert_eq!(map.target(8), Some((ParamKind::Gain, 2)));
        assert_eq!(map.target(9), None);
        assert_eq!(map.target(29), None);
    }

    #[test]
    fn test_value_mapping() {
        let map = SliderMap::default();
        assert_eq!(
            map.change(1, 0.5),
            Some(ParamChange::Frequency { mode: 1, hz: 2500.0 })
        );
        assert_eq!(
            map.change(3, 0.0),
            Some(ParamChange::Decay { mode: 0, rate: 50.0 })
        );
        assert_eq!(
            map.change(3, 1.0),
            Some(ParamChange::Decay { mode: 0, rate: 0.0 })
        );
        assert_eq!(
            map.change(7, 2.0),
            Some(ParamChange::Gain { point: 0, mode: 1, value: 10.0 })
        );
    }

    #[test]
    fn test_zero_width_map_is_inert() {
        let map = SliderMap {
            modes_per_kind: 0,
            ..SliderMap::default()
        };
        assert_eq!(map.change(0, 0.5), None);
    }

    #[test]
    fn test_dispatch_reaches_sink() {
        let map = SliderMap::default();
        let mut rec = Recorder::default();
        assert!(map.dispatch(5, 0.2, &mut rec));
        assert!(!map.dispatch(12, 0.2, &mut rec));
        assert_eq!(rec.0.len(), 1);
        assert!(matches!(rec.0[0], ParamChange::Decay { mode: 2, .. }));
    }

    #[test]
    fn test_engine_sink_recomputes_mode() {
        let mut engine = ModalEngine::<16>::new(3, 1, 44100).unwrap();
        engine.apply(ParamChange::Frequency { mode: 1, hz: 660.0 });
        engine.apply(ParamChange::Decay { mode: 1, rate: 7.0 });
        engine.apply(ParamChange::Gain { point: 0, mode: 1, value: 2.0 });

        let incremental = engine.bank().clone();
        engine.compute_filter();
        assert_eq!(incremental.two_r_cos_theta()[1], engine.bank().two_r_cos_theta()[1]);
        assert_eq!(incremental.point_gain()[1], engine.bank().point_gain()[1]);
        assert!(incremental.point_gain()[1] != 0.0);
    }

    #[test]
    fn test_engine_sink_ignores_out_of_range() {
        let mut engine = ModalEngine::<16>::new(2, 1, 44100).unwrap();
        let before = engine.model().clone();
        engine.apply(ParamChange::Frequency { mode: 2, hz: 1.0 });
        engine.apply(ParamChange::Gain { point: 1, mode: 0, value: 1.0 });
        assert_eq!(engine.model(), &before);
    }
}
