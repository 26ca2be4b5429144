use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::frame::StereoFrame;
use crate::audio_api::AudioCommand;

// current clip + incoming clip + one fading tail is the worst case
const MAX_CLIPS: usize = 3; // hard cap so we never malloc in the audio callback

#[derive(Clone, Debug)]
struct Clip {
    frames: Arc<Vec<StereoFrame>>,
    pos: usize,
    gain: f32,
    ramp: f32, // per-sample gain delta
    fading_out: bool,
    alive: bool,
}

impl Clip {
    fn new(frames: Arc<Vec<StereoFrame>>, fade_in: usize) -> Self {
        let (gain, ramp) = if fade_in > 0 {
            (0.0, 1.0 / fade_in as f32)
        } else {
            (1.0, 0.0)
        };
        Self { frames, pos: 0, gain, ramp, fading_out: false, alive: true }
    }
}

pub struct Engine {
    clips: [Option<Clip>; MAX_CLIPS],
    active: Arc<AtomicUsize>, // mirrors the live clip count for the UI side
}

impl Engine {
    pub fn new(active: Arc<AtomicUsize>) -> Self {
        Self {
            clips: std::array::from_fn(|_| None),
            active,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Play { frames, fade_in } => {
                let clip = Clip::new(frames, fade_in);
                match self.clips.iter_mut().find(|slot| slot.is_none()) {
                    Some(slot) => *slot = Some(clip),
                    // all slots busy: evict the first, it is the oldest tail
                    None => self.clips[0] = Some(clip),
                }
            }
            AudioCommand::FadeOut { fade } => {
                for clip in self.clips.iter_mut().flatten() {
                    if clip.fading_out {
                        continue;
                    }
                    clip.fading_out = true;
                    clip.ramp = if fade > 0 {
                        -clip.gain / fade as f32
                    } else {
                        -1.0
                    };
                }
            }
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for frame in out.iter_mut() {
            *frame = StereoFrame::zero();
        }

        for slot in self.clips.iter_mut() {
            let mut finished = false;
            if let Some(clip) = slot.as_mut() {
                for frame in out.iter_mut() {
                    if clip.pos >= clip.frames.len() {
                        clip.alive = false;
                    }
                    if !clip.alive {
                        break;
                    }
                    let s = clip.frames[clip.pos];
                    frame.left += s.left * clip.gain;
                    frame.right += s.right * clip.gain;
                    clip.pos += 1;

                    clip.gain += clip.ramp;
                    if clip.fading_out {
                        if clip.gain <= 0.0 {
                            clip.alive = false;
                        }
                    } else if clip.gain >= 1.0 {
                        clip.gain = 1.0;
                        clip.ramp = 0.0;
                    }
                }
                finished = !clip.alive;
            }
            if finished {
                *slot = None;
            }
        }

        // two crossfading segments can transiently sum past full scale
        for frame in out.iter_mut() {
            frame.clamp_full_scale();
        }

        let live = self.clips.iter().flatten().count();
        self.active.store(live, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (Engine, Arc<AtomicUsize>) {
        let active = Arc::new(AtomicUsize::new(0));
        (Engine::new(active.clone()), active)
    }

    fn constant_clip(value: f32, len: usize) -> Arc<Vec<StereoFrame>> {
        Arc::new(vec![StereoFrame { left: value, right: value }; len])
    }

    #[test]
    fn clip_plays_out_and_frees_its_slot() {
        let (mut engine, active) = engine();
        engine.handle_cmd(AudioCommand::Play { frames: constant_clip(0.5, 100), fade_in: 0 });

        let mut out = vec![StereoFrame::zero(); 64];
        engine.render_block(&mut out);
        assert_eq!(active.load(Ordering::Relaxed), 1);
        assert_eq!(out[0].left, 0.5);

        engine.render_block(&mut out);
        assert_eq!(active.load(Ordering::Relaxed), 0);
        // only 36 samples were left
        assert_eq!(out[35].left, 0.5);
        assert_eq!(out[36].left, 0.0);
    }

    #[test]
    fn fade_in_ramps_from_silence() {
        let (mut engine, _) = engine();
        engine.handle_cmd(AudioCommand::Play { frames: constant_clip(1.0, 1000), fade_in: 100 });

        let mut out = vec![StereoFrame::zero(); 200];
        engine.render_block(&mut out);
        assert_eq!(out[0].left, 0.0);
        assert!(out[50].left > 0.4 && out[50].left < 0.6);
        // ramp pins at unity once the fade window has passed
        assert_eq!(out[150].left, 1.0);
    }

    #[test]
    fn fade_out_reaches_silence_and_drops_the_clip() {
        let (mut engine, active) = engine();
        engine.handle_cmd(AudioCommand::Play { frames: constant_clip(1.0, 10_000), fade_in: 0 });
        let mut out = vec![StereoFrame::zero(); 64];
        engine.render_block(&mut out);

        engine.handle_cmd(AudioCommand::FadeOut { fade: 100 });
        let mut out = vec![StereoFrame::zero(); 200];
        engine.render_block(&mut out);
        assert!(out[10].left > 0.0);
        assert_eq!(out[150].left, 0.0);
        assert_eq!(active.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn crossfade_of_matched_material_is_click_free() {
        let (mut engine, _) = engine();
        let fade = 1000;
        engine.handle_cmd(AudioCommand::Play { frames: constant_clip(0.5, 20_000), fade_in: 0 });
        let mut out = vec![StereoFrame::zero(); 256];
        engine.render_block(&mut out);

        // linear out + linear in of equal material sums to the same level
        engine.handle_cmd(AudioCommand::FadeOut { fade });
        engine.handle_cmd(AudioCommand::Play { frames: constant_clip(0.5, 20_000), fade_in: fade });
        let mut out = vec![StereoFrame::zero(); 2048];
        engine.render_block(&mut out);

        for window in out.windows(2) {
            let jump = (window[1].left - window[0].left).abs();
            assert!(jump < 1e-3, "discontinuity of {jump} across the crossfade");
        }
        // midpoint holds the source level
        assert!((out[500].left - 0.5).abs() < 2e-3);
    }

    #[test]
    fn mix_of_hot_clips_is_clamped() {
        let (mut engine, _) = engine();
        engine.handle_cmd(AudioCommand::Play { frames: constant_clip(0.9, 1000), fade_in: 0 });
        engine.handle_cmd(AudioCommand::Play { frames: constant_clip(0.9, 1000), fade_in: 0 });
        let mut out = vec![StereoFrame::zero(); 64];
        engine.render_block(&mut out);
        for frame in &out {
            assert_eq!(frame.left, 1.0);
        }
    }
}
