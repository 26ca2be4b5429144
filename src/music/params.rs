// One seed in, the whole piece out. Every musical constant and every later
// random draw traces back to the u64 handed to `derive`, so two runs with
// the same seed play the same piece forever.

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use super::pattern;
use crate::shared::{DELAY_FEEDBACK, SAMPLE_RATE, STEPS_PER_BAR, STEPS_PER_SEGMENT};

const ROOT_FREQS: [f32; 5] = [220.0, 233.08, 246.94, 261.63, 293.66];
const DELAY_BEAT_FRACTIONS: [f64; 4] = [2.0, 1.0, 0.5, 0.25];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    MajorPentatonic,
    MinorPentatonic,
}

impl Scale {
    pub fn intervals(self) -> &'static [i32; 5] {
        match self {
            Scale::MajorPentatonic => &[0, 2, 4, 7, 9],
            Scale::MinorPentatonic => &[0, 3, 5, 7, 10],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scale::MajorPentatonic => "major",
            Scale::MinorPentatonic => "minor",
        }
    }
}

// The bass FM operator settings come in a few fixed flavours rather than
// being free parameters; the seed picks one per piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BassVoicing {
    Classic,
    Quantum,
    Plucky,
}

const BASS_VOICINGS: [BassVoicing; 3] =
    [BassVoicing::Classic, BassVoicing::Quantum, BassVoicing::Plucky];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BassProfile {
    pub ratio: f32,
    pub index: f32,
    pub decay: f32,
    pub amp: f32,
}

impl BassVoicing {
    pub fn profile(self) -> BassProfile {
        match self {
            BassVoicing::Classic => BassProfile { ratio: 2.0, index: 5.0, decay: 10.0, amp: 0.4 },
            BassVoicing::Quantum => BassProfile { ratio: 1.5, index: 8.0, decay: 8.0, amp: 0.45 },
            BassVoicing::Plucky => BassProfile { ratio: 3.0, index: 2.5, decay: 14.0, amp: 0.35 },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BassVoicing::Classic => "classic",
            BassVoicing::Quantum => "quantum",
            BassVoicing::Plucky => "plucky",
        }
    }
}

// Unrelated subsystems get unrelated generators. The salts keep the visual
// streams from ever shifting a musical draw, and vice versa.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Music,
    // the terrain layer lives out of tree; the stream is reserved so its
    // draws can never collide with the others
    #[allow(dead_code)]
    Terrain,
    Degradation,
}

impl StreamKind {
    fn salt(self) -> u64 {
        match self {
            StreamKind::Music => 0,
            StreamKind::Terrain => 0x7E44A1,
            StreamKind::Degradation => 0xDE5A7,
        }
    }
}

pub fn stream(seed: u64, kind: StreamKind) -> Pcg64 {
    Pcg64::seed_from_u64(seed ^ kind.salt())
}

// Accepts "1234" or "0xACE1"; anything else is a startup error.
pub fn parse_seed(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse::<u64>()
    };
    parsed.with_context(|| format!("invalid seed {s:?} (expected decimal or 0x-prefixed hex)"))
}

#[derive(Clone, Debug, PartialEq)]
pub struct MusicParams {
    pub seed: u64,
    pub bpm: u32,
    pub beat_sec: f64,
    pub step_sec: f64,
    pub segment_secs: f64,
    pub root_freq: f32,
    pub scale: Scale,
    pub bass: BassVoicing,
    pub delay_beats: f64,
    pub delay_samples: usize,
    pub feedback: f32,
    pub kick: [bool; STEPS_PER_BAR],
    pub snare: [bool; STEPS_PER_BAR],
    pub hat: [bool; STEPS_PER_BAR],
}

// Expand the seed into the piece's parameters and return the music stream
// positioned just past the setup draws, ready for segment rendering.
//
// The draw order below is load-bearing: every draw shifts all later ones,
// so inserting, removing, or reordering a draw changes every piece.
pub fn derive(seed: u64) -> (MusicParams, Pcg64) {
    let mut rng = stream(seed, StreamKind::Music);

    let bpm = rng.gen_range(50u32..=120);
    let root_freq = ROOT_FREQS[rng.gen_range(0..ROOT_FREQS.len())];
    let scale = match rng.gen_range(0..2) {
        0 => Scale::MajorPentatonic,
        _ => Scale::MinorPentatonic,
    };
    let bass = BASS_VOICINGS[rng.gen_range(0..BASS_VOICINGS.len())];
    let delay_beats = DELAY_BEAT_FRACTIONS[rng.gen_range(0..DELAY_BEAT_FRACTIONS.len())];

    let kick_pulses = rng.gen_range(1..=3);
    let snare_pulses = rng.gen_range(0..=2);
    let hat_pulses = rng.gen_range(2..=4);

    let kick = rotated_bar(kick_pulses, &mut rng);
    let snare = rotated_bar(snare_pulses, &mut rng);
    let hat = rotated_bar(hat_pulses, &mut rng);

    let beat_sec = 60.0 / bpm as f64;
    let step_sec = beat_sec / crate::shared::STEPS_PER_BEAT as f64;
    let segment_secs = step_sec * STEPS_PER_SEGMENT as f64;

    // millisecond quantisation first, matching the reference renderer
    let delay_ms = (beat_sec * delay_beats * 1000.0) as u64;
    let delay_samples = (SAMPLE_RATE as f64 * delay_ms as f64 / 1000.0) as usize;

    let params = MusicParams {
        seed,
        bpm,
        beat_sec,
        step_sec,
        segment_secs,
        root_freq,
        scale,
        bass,
        delay_beats,
        delay_samples,
        feedback: DELAY_FEEDBACK,
        kick,
        snare,
        hat,
    };
    (params, rng)
}

fn rotated_bar(pulses: usize, rng: &mut Pcg64) -> [bool; STEPS_PER_BAR] {
    let base = pattern::euclidean(pulses, STEPS_PER_BAR);
    let rotated = pattern::rotate_left(&base, rng.gen_range(0..STEPS_PER_BAR));
    std::array::from_fn(|i| rotated[i])
}
