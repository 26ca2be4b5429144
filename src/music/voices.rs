// Per-event voice renderers. Each one writes an enveloped waveform into a
// borrowed window of the segment buffer, strictly additively, so the caller
// is free to layer voices in any order without overwrites. Drum slots span
// one step; lead and bass notes span one beat and get clipped at the
// segment edge. Time inside a note runs 0..=duration inclusive across its
// nominal sample count.

use rand::Rng;
use rand_pcg::Pcg64;

use super::params::BassProfile;
use crate::audio::StereoFrame;
use crate::shared::SAMPLE_RATE;

const TAU: f32 = std::f32::consts::TAU;

const KICK_FREQ: f32 = 50.0;
const KICK_DECAY: f32 = 20.0;
const KICK_AMP: f32 = 0.8;

const SNARE_DECAY: f32 = 35.0;
const SNARE_AMP: f32 = 0.4;

const HAT_DECAY: f32 = 120.0;
const HAT_AMP: f32 = 0.15;

const LEAD_FM_RATIO: f32 = 2.0;
const LEAD_FM_INDEX: f32 = 5.0;
const LEAD_FM_DECAY: f32 = 10.0;
const LEAD_FM_AMP: f32 = 0.6;
const LEAD_SAW_DECAY: f32 = 5.0;
const LEAD_SAW_AMP: f32 = 0.25;
const LEAD_SAW_DRIVE: f32 = 1.2;

const PAD_DECAY: f32 = 6.0;
const PAD_AMP: f32 = 0.2;

pub fn kick(slot: &mut [StereoFrame], step_sec: f64) {
    let dt = step_dt(slot.len(), step_sec);
    for (i, frame) in slot.iter_mut().enumerate() {
        let t = i as f32 * dt;
        let env = (-KICK_DECAY * t).exp();
        let tone = (TAU * KICK_FREQ * t).sin();
        frame.add_mono(KICK_AMP * env * tone);
    }
}

pub fn snare(slot: &mut [StereoFrame], step_sec: f64, rng: &mut Pcg64) {
    noise_burst(slot, step_sec, SNARE_DECAY, SNARE_AMP, rng);
}

pub fn hat(slot: &mut [StereoFrame], step_sec: f64, rng: &mut Pcg64) {
    noise_burst(slot, step_sec, HAT_DECAY, HAT_AMP, rng);
}

// one noise draw per sample, shared by both channels
fn noise_burst(slot: &mut [StereoFrame], step_sec: f64, decay: f32, amp: f32, rng: &mut Pcg64) {
    let dt = step_dt(slot.len(), step_sec);
    for (i, frame) in slot.iter_mut().enumerate() {
        let t = i as f32 * dt;
        let env = (-decay * t).exp();
        let noise: f32 = rng.gen_range(-1.0..1.0);
        frame.add_mono(amp * env * noise);
    }
}

// The lead is an FM operator pair with a soft-clipped sawtooth layered on
// top; the saw shaper is a third-order polynomial on a driven ramp, which
// rounds the corners instead of folding them.
pub fn lead(tail: &mut [StereoFrame], freq: f32, beat_sec: f64) {
    let full = (beat_sec * SAMPLE_RATE as f64) as usize;
    let n = full.min(tail.len());
    let dt = beat_sec as f32 / (full - 1) as f32;
    for (i, frame) in tail.iter_mut().take(n).enumerate() {
        let t = i as f32 * dt;

        let mod_phase = TAU * freq * LEAD_FM_RATIO * t;
        let carrier = TAU * freq * t + LEAD_FM_INDEX * mod_phase.sin();
        let fm = LEAD_FM_AMP * (-LEAD_FM_DECAY * t).exp() * carrier.sin();

        let raw = 2.0 * (freq * t).fract() - 1.0;
        let driven = LEAD_SAW_DRIVE * raw;
        let shaped = 1.5 * driven - 0.5 * driven * driven * driven;
        let saw = LEAD_SAW_AMP * (-LEAD_SAW_DECAY * t).exp() * shaped;

        frame.add_mono(fm + saw);
    }
}

// Offbeat pad timbres. Closed set: the seed stream picks an index into
// PAD_WAVES, so the draw order stays pinned to this ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadWave {
    Triangle,
    Sine,
    Square,
    FmBells,
    FmCalm,
    FmQuantum,
    FmPluck,
}

pub const PAD_WAVES: [PadWave; 7] = [
    PadWave::Triangle,
    PadWave::Sine,
    PadWave::Square,
    PadWave::FmBells,
    PadWave::FmCalm,
    PadWave::FmQuantum,
    PadWave::FmPluck,
];

pub fn pad(slot: &mut [StereoFrame], freq: f32, step_sec: f64, wave: PadWave) {
    let dt = step_dt(slot.len(), step_sec);
    for (i, frame) in slot.iter_mut().enumerate() {
        let t = i as f32 * dt;
        let phase = TAU * freq * t;
        let env = (-PAD_DECAY * t).exp();
        let w = match wave {
            PadWave::Triangle => (2.0 / std::f32::consts::PI) * phase.sin().asin(),
            PadWave::Sine => phase.sin(),
            PadWave::Square => sign(phase.sin()),
            PadWave::FmBells => fm_pair(phase, freq, t, 3.5, 4.0),
            PadWave::FmCalm => fm_pair(phase, freq, t, 2.0, 2.5),
            PadWave::FmQuantum => fm_pair(phase, freq, t, 1.5, 3.0),
            // the index rides the envelope, so the spectrum narrows as the
            // note dies away: a plucked-string gesture
            PadWave::FmPluck => fm_pair(phase, freq, t, 1.0, 6.0 * env),
        };
        frame.add_mono(PAD_AMP * env * w);
    }
}

pub fn bass(tail: &mut [StereoFrame], freq: f32, beat_sec: f64, profile: &BassProfile) {
    let full = (beat_sec * SAMPLE_RATE as f64) as usize;
    let n = full.min(tail.len());
    let dt = beat_sec as f32 / (full - 1) as f32;
    for (i, frame) in tail.iter_mut().take(n).enumerate() {
        let t = i as f32 * dt;
        let mod_phase = TAU * freq * profile.ratio * t;
        let carrier = TAU * freq * t + profile.index * mod_phase.sin();
        let env = (-profile.decay * t).exp();
        frame.add_mono(profile.amp * env * carrier.sin());
    }
}

#[inline]
fn fm_pair(carrier_phase: f32, freq: f32, t: f32, ratio: f32, index: f32) -> f32 {
    (carrier_phase + index * (TAU * freq * ratio * t).sin()).sin()
}

// sign with sign(0) == 0, so a square wave starts silent at phase zero
#[inline]
fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[inline]
fn step_dt(n: usize, step_sec: f64) -> f32 {
    step_sec as f32 / (n - 1) as f32
}
