use nih_plug::prelude::*;

/// Upper bound for the "Used Modes" knob; the engine clamps to the model.
pub const MAX_USED_MODES: i32 = 256;

#[derive(Params)]
pub struct ModalBellParams {
    /// Master volume: post-engine output level.
    #[id = "volume"]
    pub volume: FloatParam,

    /// Multiplier on every mode's decay rate (higher = shorter ring).
    #[id = "decay"]
    pub decay_scale: FloatParam,

    /// Multiplier on every contact-point gain.
    #[id = "gain"]
    pub gain_scale: FloatParam,

    /// Length of the raised-cosine strike pulse.
    #[id = "strike"]
    pub strike_ms: FloatParam,

    #[id = "modes"]
    pub used_modes: IntParam,

    /// Damp ringing modes on note-off, like a hand on the bell.
    #[id = "damp"]
    pub damp_on_release: BoolParam,
}

impl Default for ModalBellParams {
    fn default() -> Self {
        Self {
            volume: FloatParam::new(
                "Volume",
                0.25,
                FloatRange::Skewed {
                    min: 0.0,
                    max: 1.0,
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_smoother(SmoothingStyle::Logarithmic(5.0))
            .with_unit(" %")
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            decay_scale: FloatParam::new(
                "Decay Scale",
                1.0,
                FloatRange::Skewed {
                    min: 0.1,
                    max: 10.0,
                    factor: FloatRange::skew_factor(-1.5),
                },
            )
            .with_step_size(0.01),

            gain_scale: FloatParam::new(
                "Gain Scale",
                1.0,
                FloatRange::Linear { min: 0.0, max: 4.0 },
            )
            .with_step_size(0.01),

            strike_ms: FloatParam::new(
                "Strike Length",
                1.0,
                FloatRange::Skewed {
                    min: 0.05,
                    max: 1.45,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit(" ms")
            .with_step_size(0.01),

            used_modes: IntParam::new(
                "Used Modes",
                MAX_USED_MODES,
                IntRange::Linear {
                    min: 1,
                    max: MAX_USED_MODES,
                },
            ),

            damp_on_release: BoolParam::new("Damp on Release", false),
        }
    }
}
