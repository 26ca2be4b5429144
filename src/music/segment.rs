// Renders one streamed segment: 128 sixteenth-note steps of voices written
// additively into a stereo buffer, then the feedback delay and the per-frame
// loudness pass. Pure function of (params, rng state); the rng is advanced
// in a fixed order, which is what makes segment N+1 reproducible no matter
// which thread renders it.

use rand::Rng;
use rand_pcg::Pcg64;

use super::params::{MusicParams, Scale};
use super::voices::{self, PAD_WAVES};
use super::{delay, loudness};
use crate::audio::StereoFrame;
use crate::shared::{DENSITY_FACTOR, SAMPLE_RATE, STEPS_PER_BAR, STEPS_PER_SEGMENT};

#[derive(Clone, Debug)]
pub struct Segment {
    pub frames: Vec<StereoFrame>,
    pub rms: Vec<f32>,
}

// Draw order per step is a contract: snare noise, hat noise, lead degree
// (step 8 of the 2-bar cycle only), pad probability (off-offbeats only),
// pad degree, pad wave, bass degree. Reordering any of these changes every
// seed's piece and breaks golden-file compatibility.
pub fn render_segment(params: &MusicParams, rng: &mut Pcg64) -> Segment {
    let n_total = (params.segment_secs * SAMPLE_RATE as f64) as usize;
    let mut buf = vec![StereoFrame::zero(); n_total];

    // written at step 8 of each 32-step cycle, read back at step 24;
    // step 8 always comes first within a cycle
    let mut last_degree = 0i32;

    for step in 0..STEPS_PER_SEGMENT {
        let t0 = (step as f64 * params.step_sec * SAMPLE_RATE as f64) as usize;
        let t1 = (((step + 1) as f64) * params.step_sec * SAMPLE_RATE as f64) as usize;
        let bar_pos = step % STEPS_PER_BAR;

        {
            let slot = &mut buf[t0..t1];
            if params.kick[bar_pos] {
                voices::kick(slot, params.step_sec);
            }
            if params.snare[bar_pos] {
                voices::snare(slot, params.step_sec, rng);
            }
            if params.hat[bar_pos] {
                voices::hat(slot, params.step_sec, rng);
            }
        }

        if let Some(freq) = lead_freq(step % 32, params, &mut last_degree, rng) {
            voices::lead(&mut buf[t0..], freq, params.beat_sec);
        }

        let spawn_pad = match step % 4 {
            2 => true,
            1 | 3 => rng.gen_range(0.0..1.0) < 0.2 * DENSITY_FACTOR,
            _ => false,
        };
        if spawn_pad {
            let intervals = params.scale.intervals();
            let degree = intervals[rng.gen_range(0..intervals.len())];
            let freq = params.root_freq * 2f32.powf(degree as f32 / 12.0 + 1.0);
            let wave = PAD_WAVES[rng.gen_range(0..PAD_WAVES.len())];
            voices::pad(&mut buf[t0..t1], freq, params.step_sec, wave);
        }

        if step % 32 == 0 {
            let intervals = params.scale.intervals();
            let degree = intervals[rng.gen_range(0..intervals.len())];
            let freq = params.root_freq / 4.0 * 2f32.powf(degree as f32 / 12.0);
            voices::bass(&mut buf[t0..], freq, params.beat_sec, &params.bass.profile());
        }
    }

    let frames = delay::apply(&buf, params.delay_samples, params.feedback);
    let rms = loudness::rms_per_frame(&frames, params.segment_secs);
    Segment { frames, rms }
}

// Lead schedule over the 2-bar cycle: high root on 0 and 16, a drawn upper
// degree on 8, and on 24 the same degree an octave down. Step 24 reuses the
// step-8 draw on purpose (call and answer); it must not draw afresh.
fn lead_freq(
    step32: usize,
    params: &MusicParams,
    last_degree: &mut i32,
    rng: &mut Pcg64,
) -> Option<f32> {
    match step32 {
        0 | 16 => Some(params.root_freq * 4.0),
        8 => {
            let degree = upper_degree(params.scale, rng);
            *last_degree = degree;
            Some(params.root_freq * 2f32.powf(degree as f32 / 12.0))
        }
        24 => Some(params.root_freq * 2f32.powf(*last_degree as f32 / 12.0) / 2.0),
        _ => None,
    }
}

// degree choices for the lead exclude the root itself
fn upper_degree(scale: Scale, rng: &mut Pcg64) -> i32 {
    let candidates: Vec<i32> = scale.intervals().iter().copied().filter(|&d| d > 0).collect();
    candidates[rng.gen_range(0..candidates.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::params::derive;
    use crate::shared::VISUAL_FPS;
    use pretty_assertions::assert_eq;

    #[test]
    fn same_seed_renders_bit_identical_segments() {
        let (params, rng) = derive(0xACE1);
        let mut rng_a = rng.clone();
        let mut rng_b = rng;
        let a = render_segment(&params, &mut rng_a);
        let b = render_segment(&params, &mut rng_b);
        assert_eq!(a.frames, b.frames);
        assert_eq!(a.rms, b.rms);
        // and the continuation streams agree too
        assert_eq!(rng_a, rng_b);
    }

    #[test]
    fn consecutive_segments_differ() {
        let (params, mut rng) = derive(0xACE1);
        let first = render_segment(&params, &mut rng);
        let second = render_segment(&params, &mut rng);
        assert_ne!(first.frames, second.frames);
    }

    #[test]
    fn buffer_and_rms_lengths_follow_the_params() {
        let (params, mut rng) = derive(7);
        let seg = render_segment(&params, &mut rng);
        let expected_frames = (params.segment_secs * SAMPLE_RATE as f64) as usize;
        let expected_rms = (params.segment_secs * VISUAL_FPS as f64) as usize;
        assert_eq!(seg.frames.len(), expected_frames);
        assert_eq!(seg.rms.len(), expected_rms);
    }

    #[test]
    fn no_sample_escapes_full_scale() {
        let (params, mut rng) = derive(0xDEADBEEF);
        let seg = render_segment(&params, &mut rng);
        for frame in &seg.frames {
            assert!(frame.left.abs() <= 1.0);
            assert!(frame.right.abs() <= 1.0);
        }
    }

    #[test]
    fn segment_actually_contains_sound() {
        let (params, mut rng) = derive(3);
        let seg = render_segment(&params, &mut rng);
        assert!(seg.rms.iter().any(|&level| level > 0.01));
    }

    #[test]
    fn lead_step_24_reuses_the_step_8_degree_without_drawing() {
        let (params, _) = derive(0xACE1);
        let mut rng = crate::music::params::stream(0xACE1, crate::music::params::StreamKind::Music);
        let mut last_degree = 0;

        let f8 = lead_freq(8, &params, &mut last_degree, &mut rng)
            .expect("step 8 plays");
        let before = rng.clone();
        let f24 = lead_freq(24, &params, &mut last_degree, &mut rng)
            .expect("step 24 plays");

        // octave below the step-8 note, and the stream is untouched
        assert!((f24 - f8 / 2.0).abs() < 1e-4);
        assert_eq!(rng, before);
    }

    #[test]
    fn off_cycle_steps_play_no_lead() {
        let (params, mut rng) = derive(1);
        let mut last_degree = 0;
        for step32 in [1, 7, 9, 15, 23, 25, 31] {
            assert_eq!(lead_freq(step32, &params, &mut last_degree, &mut rng), None);
        }
    }
}
