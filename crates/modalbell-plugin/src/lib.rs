// ModalBell: struck-object modal synthesizer plugin (CLAP + VST3).

use modalbell_dsp::{ModalEngine, Scales, SliderMap, presets};
use nih_plug::prelude::*;
use std::num::NonZeroU32;
use std::sync::Arc;

mod params;
use params::ModalBellParams;

/// Engine block length. Note and controller events take effect on its boundaries.
const BLOCK: usize = 64;

/// Prime partial of the built-in bell at the reference key.
const PRIME_HZ: f32 = 261.63;
const REFERENCE_NOTE: u8 = 60;

/// First MIDI CC mapped to slider slot 0. CC 20-31 are undefined controllers,
/// so slots 0-8 stay clear of mod wheel, volume and pan.
const CC_SLOT_BASE: u8 = 20;

/// History multiplier applied on note-off when "Damp on Release" is on.
const RELEASE_DAMPING: f32 = 0.2;

/// Frequency scale for `note`, in equal temperament around the reference key.
fn key_tracking(note: u8) -> f32 {
    2.0f32.powf((note as f32 - REFERENCE_NOTE as f32) / 12.0)
}

// ── Plugin ──────────────────────────────────────────────────────────────────

struct ModalBell {
    params: Arc<ModalBellParams>,
    engine: Option<ModalEngine<BLOCK>>,
    sliders: SliderMap,

    /// Scales stored in the model, before key tracking and knob multipliers.
    base_scales: Scales,
    /// Knob values last pushed into the engine.
    applied_decay: f32,
    applied_gain: f32,
    applied_modes: i32,

    block: [f32; BLOCK],
    read_pos: usize,
    sample_rate: f32,
}

impl Default for ModalBell {
    fn default() -> Self {
        Self {
            params: Arc::new(ModalBellParams::default()),
            engine: None,
            sliders: SliderMap::default(),
            base_scales: Scales::default(),
            applied_decay: f32::NAN,
            applied_gain: f32::NAN,
            applied_modes: -1,
            block: [0.0; BLOCK],
            // Forces a render on the first sample
            read_pos: BLOCK,
            sample_rate: 44100.0,
        }
    }
}

impl ModalBell {
    fn note_on(&mut self, note: u8, velocity: f32) {
        let strike_secs = self.params.strike_ms.value() / 1000.0;
        let f_scale = self.base_scales.frequency * key_tracking(note);
        if let Some(engine) = self.engine.as_mut() {
            engine.set_frequency_scale(f_scale);
            engine.strike(velocity, strike_secs);
        }
    }

    fn note_off(&mut self) {
        if !self.params.damp_on_release.value() {
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.damp_all(RELEASE_DAMPING);
        }
    }

    fn controller(&mut self, cc: u8, value: f32) {
        let Some(slot) = cc.checked_sub(CC_SLOT_BASE) else {
            return;
        };
        if let Some(engine) = self.engine.as_mut() {
            self.sliders.dispatch(slot as usize, value, engine);
        }
    }

    /// Push changed knob values into the engine.
    fn sync_params(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        let decay = self.params.decay_scale.value();
        if decay != self.applied_decay {
            engine.set_decay_scale(self.base_scales.decay * decay);
            self.applied_decay = decay;
        }

        let gain = self.params.gain_scale.value();
        if gain != self.applied_gain {
            engine.set_gain_scale(self.base_scales.gain * gain);
            self.applied_gain = gain;
        }

        let modes = self.params.used_modes.value();
        if modes != self.applied_modes {
            engine.set_used_mode_count(modes.max(1) as usize);
            self.applied_modes = modes;
        }
    }

    fn handle_event(&mut self, event: NoteEvent<()>) {
        match event {
            NoteEvent::NoteOn { note, velocity, .. } => self.note_on(note, velocity),
            NoteEvent::NoteOff { .. } => self.note_off(),
            NoteEvent::MidiCC { cc, value, .. } => self.controller(cc, value),
            _ => {}
        }
    }

    fn render_block(&mut self) {
        match self.engine.as_mut() {
            Some(engine) => {
                engine.render(&mut self.block);
            }
            None => self.block.fill(0.0),
        }
        self.read_pos = 0;
    }

    fn forget_applied(&mut self) {
        self.applied_decay = f32::NAN;
        self.applied_gain = f32::NAN;
        self.applied_modes = -1;
    }
}

impl Plugin for ModalBell {
    const NAME: &'static str = "ModalBell";
    const VENDOR: &'static str = "ModalBell";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: None,
        main_output_channels: NonZeroU32::new(2),
        aux_input_ports: &[],
        aux_output_ports: &[],
        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::MidiCCs;
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;

        let built = presets::bell(PRIME_HZ)
            .and_then(|model| ModalEngine::from_model(model, self.sample_rate.round() as u32));
        match built {
            Ok(engine) => {
                self.base_scales = engine.model().scales;
                self.engine = Some(engine);
            }
            Err(err) => {
                nih_log!("failed to build modal engine: {err}");
                return false;
            }
        }

        self.forget_applied();
        self.sync_params();
        self.block.fill(0.0);
        self.read_pos = BLOCK;
        true
    }

    fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.clear_history();
            engine.excitation_mut().fill(0.0);
        }
        self.block.fill(0.0);
        self.read_pos = BLOCK;
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let mut next_event = context.next_event();

        for (i, mut channel_samples) in buffer.iter_samples().enumerate() {
            if self.read_pos == BLOCK {
                // Block boundary: everything due by now lands in this block
                while let Some(event) = next_event {
                    if event.timing() as usize > i {
                        break;
                    }
                    self.handle_event(event);
                    next_event = context.next_event();
                }
                self.sync_params();
                self.render_block();
            }

            let volume = self.params.volume.smoothed.next();
            let sample = self.block[self.read_pos] * volume;
            self.read_pos += 1;
            for s in channel_samples.iter_mut() {
                *s = sample;
            }
        }

        // Events past the last boundary in this buffer take effect at the next one
        while let Some(event) = next_event {
            self.handle_event(event);
            next_event = context.next_event();
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for ModalBell {
    const CLAP_ID: &'static str = "com.modalbell.modal-bell";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Struck-object modal synthesis with a resonator bank");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::Instrument,
        ClapFeature::Synthesizer,
        ClapFeature::Custom("physical-modeling"),
    ];
}

impl Vst3Plugin for ModalBell {
    const VST3_CLASS_ID: [u8; 16] = *b"ModalBellModalVS";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Instrument, Vst3SubCategory::Synth];
}

nih_export_clap!(ModalBell);
nih_export_vst3!(ModalBell);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_tracking_octaves() {
        assert_eq!(key_tracking(REFERENCE_NOTE), 1.0);
        assert!((key_tracking(72) - 2.0).abs() < 1e-6);
        assert!((key_tracking(48) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_events_apply_at_block_boundaries() {
        let mut plugin = ModalBell::default();
        let model = presets::bell(PRIME_HZ).unwrap();
        plugin.base_scales = model.scales;
        plugin.engine = Some(ModalEngine::from_model(model, 44100).unwrap());

        plugin.render_block();
        assert!(plugin.block.iter().all(|&s| s == 0.0), "silent before any strike");

        plugin.handle_event(NoteEvent::NoteOn {
            timing: 0,
            voice_id: None,
            channel: 0,
            note: 72,
            velocity: 0.8,
        });
        // Struck but not yet rendered
        assert!(plugin.block.iter().all(|&s| s == 0.0));
        plugin.render_block();
        assert!(plugin.block.iter().any(|&s| s != 0.0), "strike rings on the next block");
        assert!(
            plugin.block.iter().all(|s| s.abs() < 1.0),
            "velocity 0.8 should not reach the output clamp"
        );

        let engine = plugin.engine.as_ref().unwrap();
        assert!((engine.model().scales.frequency - 2.0).abs() < 1e-6, "key-tracked an octave up");
    }

    #[test]
    fn test_midi_cc_reaches_engine() {
        let mut plugin = ModalBell::default();
        plugin.engine = Some(ModalEngine::from_model(presets::bell(PRIME_HZ).unwrap(), 44100).unwrap());

        let before = plugin.engine.as_ref().unwrap().model().clone();

        // Mod wheel and volume leave the model alone
        for cc in [1, 7] {
            plugin.handle_event(NoteEvent::MidiCC {
                timing: 0,
                channel: 0,
                cc,
                value: 0.5,
            });
        }
        assert_eq!(plugin.engine.as_ref().unwrap().model(), &before);

        // Slot 0: frequency of mode 0
        plugin.handle_event(NoteEvent::MidiCC {
            timing: 0,
            channel: 0,
            cc: CC_SLOT_BASE,
            value: 0.5,
        });
        let engine = plugin.engine.as_ref().unwrap();
        assert_eq!(engine.model().frequencies()[0], 2500.0);
    }
}
