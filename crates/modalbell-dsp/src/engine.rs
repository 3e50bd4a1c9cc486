/// Modal resonator engine: one model, one filter bank, one excitation block.
///
/// Pure computation over owned buffers. Every call is synchronous and
/// bounded; the caller serializes parameter changes and renders on a
/// single thread, so changes land on block boundaries.
///
/// Typical driving loop:
/// 1. `strike` (or raw `add_energy`) and/or write input audio into `excitation_mut`
/// 2. `render` one block and hand it to the audio sink
/// 3. between renders, apply controller changes through `ParameterSink`

use crate::bank::ResonatorBank;
use crate::error::Result;
use crate::excitation::{pulse_samples, strike_energy, ExcitationBuffer};
use crate::model::ModalModel;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

pub struct ModalEngine<const N: usize> {
    model: ModalModel,
    bank: ResonatorBank,
    excitation: ExcitationBuffer<N>,
    sample_rate: f64,
}

impl<const N: usize> ModalEngine<N> {
    const NONEMPTY_BLOCK: () = assert!(N > 0, "block size must be at least one sample");

    /// Blank engine: all modes at 0 Hz with zero gain, so it stays silent
    /// until parameters are set and coefficients computed.
    ///
    /// `sample_rate == 0` selects 44.1 kHz.
    pub fn new(mode_count: usize, point_count: usize, sample_rate: u32) -> Result<Self> {
        let model = ModalModel::new(mode_count, point_count)?;
        Self::build(model, sample_rate)
    }

    /// Engine around a fully loaded model, with every coefficient derived.
    pub fn from_model(model: ModalModel, sample_rate: u32) -> Result<Self> {
        let mut engine = Self::build(model, sample_rate)?;
        engine.compute_filter();
        Ok(engine)
    }

    fn build(model: ModalModel, sample_rate: u32) -> Result<Self> {
        let () = Self::NONEMPTY_BLOCK;

        let sample_rate = if sample_rate == 0 {
            DEFAULT_SAMPLE_RATE
        } else {
            sample_rate
        };
        let bank = ResonatorBank::new(model.mode_count())?;
        let excitation = ExcitationBuffer::new()?;
        log::debug!(
            "modal engine: {} modes ({} used), {} points, block {}, {sample_rate} Hz",
            model.mode_count(),
            model.used_mode_count(),
            model.point_count(),
            N,
        );

        Ok(Self {
            model,
            bank,
            excitation,
            sample_rate: sample_rate as f64,
        })
    }

    pub const fn block_size(&self) -> usize {
        N
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn mode_count(&self) -> usize {
        self.model.mode_count()
    }

    pub fn point_count(&self) -> usize {
        self.model.point_count()
    }

    pub fn used_mode_count(&self) -> usize {
        self.model.used_mode_count()
    }

    /// Change how many modes are rendered (clamped to the mode count).
    /// Coefficients of unused modes stay valid, so nothing is recomputed.
    pub fn set_used_mode_count(&mut self, n: usize) {
        self.model.set_used_mode_count(n);
    }

    pub fn model(&self) -> &ModalModel {
        &self.model
    }

    pub fn bank(&self) -> &ResonatorBank {
        &self.bank
    }

    pub fn excitation(&self) -> &[f32; N] {
        self.excitation.as_block()
    }

    /// Forcing block for the next render. External input audio is written here.
    pub fn excitation_mut(&mut self) -> &mut [f32; N] {
        self.excitation.as_block_mut()
    }

    // ── Live mutation ───────────────────────────────────────────────────────
    //
    // Setters only touch the model; follow them with `recompute_one` (or go
    // through `ParameterSink`, which does both).

    pub fn set_frequency(&mut self, mode: usize, hz: f32) {
        self.model.set_frequency(mode, hz);
    }

    pub fn set_decay(&mut self, mode: usize, rate: f32) {
        self.model.set_decay(mode, rate);
    }

    pub fn set_gain(&mut self, point: usize, mode: usize, value: f32) {
        self.model.set_gain(point, mode, value);
    }

    /// Recompute both coefficient steps for one mode. O(1).
    pub fn recompute_one(&mut self, mode: usize) {
        self.bank.recompute_one(&self.model, self.sample_rate, mode);
    }

    /// Location step only, for gain-only changes.
    pub fn compute_location(&mut self, mode: usize) {
        self.bank.compute_location(&self.model, mode);
    }

    /// Full rebuild of every mode's coefficients. O(modes).
    pub fn compute_filter(&mut self) {
        self.bank.compute_all(&self.model, self.sample_rate);
    }

    pub fn set_frequency_scale(&mut self, scale: f32) {
        self.model.scales.frequency = scale;
        self.compute_filter();
    }

    pub fn set_decay_scale(&mut self, scale: f32) {
        self.model.scales.decay = scale;
        self.compute_filter();
    }

    pub fn set_gain_scale(&mut self, scale: f32) {
        self.model.scales.gain = scale;
        for i in 0..self.mode_count() {
            self.bank.compute_location(&self.model, i);
        }
    }

    /// Strike at another contact point. Ignored when out of range.
    pub fn set_active_point(&mut self, point: usize) {
        self.bank.set_active_point(&self.model, point);
    }

    // ── Excitation and state ────────────────────────────────────────────────

    /// Inject a raised-cosine strike into the next block (additive).
    pub fn add_energy(&mut self, energy: f32, duration_secs: f32) {
        let n = pulse_samples(self.sample_rate, duration_secs);
        self.excitation.add_pulse(energy, n);
    }

    /// Strike with a normalized weight: `energy` is spread over the pulse
    /// and the model's modes, so 1.0 is a full strike that stays below the
    /// output clamp when the contact-point gains sum to at most the mode count.
    pub fn strike(&mut self, energy: f32, duration_secs: f32) {
        let n = pulse_samples(self.sample_rate, duration_secs).min(N);
        let per_sample = strike_energy(energy, n, self.mode_count());
        self.excitation.add_pulse(per_sample, n);
    }

    /// Scale every mode's filter state: a quick mute that keeps phase.
    pub fn damp_all(&mut self, factor: f32) {
        self.bank.damp(factor);
    }

    /// Hard silence.
    pub fn clear_history(&mut self) {
        self.bank.clear_history();
    }

    // ── Rendering ───────────────────────────────────────────────────────────

    /// Render one block and consume the excitation.
    ///
    /// Output is hard-clipped to [-1, 1]. Returns the summed |y| of mode 0
    /// over the block, useful for detecting decay to silence.
    pub fn render(&mut self, output: &mut [f32; N]) -> f64 {
        output.fill(0.0);
        let activity = self.bank.render(
            self.model.used_mode_count(),
            self.excitation.as_block(),
            output,
        );
        self.excitation.clear();
        for s in output.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
        activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_mode(freq: f32, decay: f32, gain: f32) -> ModalEngine<64> {
        let mut engine = ModalEngine::<64>::new(1, 1, 44100).unwrap();
        engine.set_frequency(0, freq);
        engine.set_decay(0, decay);
        engine.set_gain(0, 0, gain);
        engine.compute_filter();
        engine
    }

    fn peak(block: &[f32]) -> f32 {
        block.iter().map(|x| x.abs()).fold(0.0f32, f32::max)
    }

    #[test]
    fn test_full_strike_stays_below_clamp() {
        let mut engine = ModalEngine::<64>::from_model(crate::presets::bell(261.63).unwrap(), 44100).unwrap();
        let mut out = [0.0f32; 64];
        let mut loudest = 0.0f32;

        for velocity in [0.05, 0.3, 0.8, 1.0] {
            engine.clear_history();
            engine.strike(velocity, 0.001);
            let mut clipped = 0;
            for _ in 0..690 {
                engine.render(&mut out);
                clipped += out.iter().filter(|x| x.abs() >= 1.0).count();
                loudest = loudest.max(peak(&out));
            }
            assert_eq!(clipped, 0, "velocity {velocity} clipped {clipped} samples");
        }
        assert!(loudest > 0.01, "strike should still be audible, peak {loudest}");
        assert!(loudest < 0.5, "peak {loudest}");
    }

    #[test]
    fn test_strike_weight_covers_pulse() {
        let mut engine = single_mode(440.0, 3.0, 1.0);
        engine.strike(1.0, 0.001);
        let total: f32 = engine.excitation().iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "pulse area {total}");
    }

    #[test]
    fn test_default_sample_rate() {
        let engine = ModalEngine::<16>::new(2, 1, 0).unwrap();
        assert_eq!(engine.sample_rate(), 44100.0);
        assert_eq!(engine.block_size(), 16);
        assert_eq!(engine.mode_count(), 2);
        assert_eq!(engine.point_count(), 1);
        assert_eq!(engine.used_mode_count(), 2);
    }

    #[test]
    fn test_blank_engine_is_silent() {
        let mut engine = ModalEngine::<32>::new(4, 1, 48000).unwrap();
        engine.add_energy(1.0, 0.001);
        let mut out = [0.0f32; 32];
        let activity = engine.render(&mut out);
        assert_eq!(activity, 0.0);
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_strike_decays_to_silence() {
        let mut engine = single_mode(440.0, 20.0, 1.0);
        engine.add_energy(1.0, 0.002);

        let mut out = [0.0f32; 64];
        let mut peaks = Vec::new();
        for _ in 0..2000 {
            engine.render(&mut out);
            peaks.push(peak(&out));
        }

        assert!(peaks[0] > 0.0, "strike produced no sound");
        assert!(peaks[1999] < 1e-4, "still ringing: {}", peaks[1999]);

        // Envelope over windows spanning several cycles never grows after the strike
        let windows: Vec<f32> = peaks[2..1000]
            .chunks(10)
            .map(|w| w.iter().copied().fold(0.0f32, f32::max))
            .collect();
        for pair in windows.windows(2) {
            assert!(pair[1] <= pair[0], "envelope grew: {} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_activity_reaches_threshold() {
        let mut engine = single_mode(440.0, 20.0, 1.0);
        engine.add_energy(1.0, 0.002);
        let mut out = [0.0f32; 64];
        let first = engine.render(&mut out);
        assert!(first > 0.0);

        let mut blocks = 1;
        while engine.render(&mut out) >= 1e-4 {
            blocks += 1;
            assert!(blocks < 10_000, "activity never fell below threshold");
        }
    }

    #[test]
    fn test_output_clamped() {
        let mut engine = single_mode(100.0, 0.5, 1.0e6);
        engine.excitation_mut().fill(1.0e9);
        let mut out = [0.0f32; 64];
        for _ in 0..10 {
            engine.render(&mut out);
            assert!(out.iter().all(|&x| (-1.0..=1.0).contains(&x)));
        }
        assert!(out.iter().any(|&x| x.abs() == 1.0));
    }

    #[test]
    fn test_excitation_consumed_once() {
        let mut engine = single_mode(440.0, 5.0, 1.0);
        engine.add_energy(0.5, 0.001);
        let mut out = [0.0f32; 64];
        engine.render(&mut out);
        assert!(engine.excitation().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_used_mode_count_matches_zeroed_gains() {
        let build = || {
            let mut e = ModalEngine::<64>::new(3, 1, 44100).unwrap();
            for (i, f) in [330.0, 740.0, 1500.0].into_iter().enumerate() {
                e.set_frequency(i, f);
                e.set_decay(i, 4.0);
                e.set_gain(0, i, 1.0);
            }
            e
        };

        let mut limited = build();
        limited.compute_filter();
        limited.set_used_mode_count(1);

        let mut zeroed = build();
        zeroed.set_gain(0, 1, 0.0);
        zeroed.set_gain(0, 2, 0.0);
        zeroed.compute_filter();

        let mut a = [0.0f32; 64];
        let mut b = [0.0f32; 64];
        for block in 0..20 {
            if block == 0 {
                limited.add_energy(0.3, 0.001);
                zeroed.add_energy(0.3, 0.001);
            }
            limited.render(&mut a);
            zeroed.render(&mut b);
            assert_eq!(a, b, "block {block} differs");
        }
    }

    #[test]
    fn test_state_survives_parameter_change() {
        let mut engine = single_mode(440.0, 1.0, 1.0);
        engine.add_energy(1.0, 0.001);
        let mut out = [0.0f32; 64];
        engine.render(&mut out);

        engine.set_frequency(0, 880.0);
        engine.recompute_one(0);
        engine.render(&mut out);
        assert!(peak(&out) > 0.01, "retune should not silence the ringing mode");
    }

    #[test]
    fn test_recompute_one_matches_compute_filter() {
        let mut engine = ModalEngine::<16>::new(3, 2, 44100).unwrap();
        for i in 0..3 {
            engine.set_frequency(i, 100.0 * (i + 1) as f32);
            engine.set_decay(i, 2.0);
            engine.set_gain(0, i, 1.0);
        }
        engine.compute_filter();

        engine.set_decay(2, 33.0);
        engine.set_gain(0, 2, 0.25);
        engine.recompute_one(2);
        let incremental = engine.bank().clone();

        engine.compute_filter();
        assert_eq!(incremental.r2(), engine.bank().r2());
        assert_eq!(incremental.point_gain(), engine.bank().point_gain());
    }

    #[test]
    fn test_out_of_range_mutation_changes_nothing() {
        let mut engine = single_mode(440.0, 3.0, 1.0);
        let model = engine.model().clone();
        let r2 = engine.bank().r2().to_vec();

        engine.set_frequency(1, 1000.0);
        engine.set_decay(5, 1000.0);
        engine.set_gain(1, 0, 1000.0);
        engine.set_gain(0, 1, 1000.0);
        engine.recompute_one(1);
        engine.set_active_point(3);

        assert_eq!(engine.model(), &model);
        assert_eq!(engine.bank().r2(), &r2[..]);
    }

    #[test]
    fn test_damp_all_and_clear_history() {
        let mut engine = single_mode(440.0, 1.0, 1.0);
        engine.add_energy(1.0, 0.001);
        let mut out = [0.0f32; 64];
        engine.render(&mut out);
        let loud = peak(&out);

        engine.damp_all(0.1);
        engine.render(&mut out);
        assert!(peak(&out) < loud * 0.2);

        engine.clear_history();
        engine.render(&mut out);
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_gain_scale_only_touches_location() {
        let mut engine = single_mode(440.0, 3.0, 1.0);
        let r2 = engine.bank().r2()[0];
        let g = engine.bank().point_gain()[0];
        engine.set_gain_scale(2.0);
        assert_eq!(engine.bank().r2()[0], r2);
        assert_eq!(engine.bank().point_gain()[0], 2.0 * g);

        let point_gain = engine.bank().point_gain().to_vec();
        engine.compute_filter();
        assert_eq!(engine.bank().point_gain(), &point_gain[..], "same as a full rebuild");
    }
}
