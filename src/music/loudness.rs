// Per-visual-frame RMS over the finished segment. Computed once up front so
// the display side can index by elapsed time without touching audio state.

use crate::audio::StereoFrame;
use crate::shared::{SAMPLES_PER_VISUAL_FRAME, VISUAL_FPS};

pub fn rms_per_frame(frames: &[StereoFrame], segment_secs: f64) -> Vec<f32> {
    let num_frames = (segment_secs * VISUAL_FPS as f64) as usize;
    let mut levels = Vec::with_capacity(num_frames);

    for f in 0..num_frames {
        let start = f * SAMPLES_PER_VISUAL_FRAME;
        let end = (start + SAMPLES_PER_VISUAL_FRAME).min(frames.len());
        let chunk = &frames[start..end];

        let mut sum = 0.0f64;
        for s in chunk {
            sum += s.left as f64 * s.left as f64 + s.right as f64 * s.right as f64;
        }
        let mean = sum / (chunk.len() * 2) as f64;
        levels.push(mean.sqrt() as f32);
    }
    levels
}
