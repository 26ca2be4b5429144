// Whole-segment feedback delay. The dry mix goes into an extension buffer
// and every sample past the delay length picks up a scaled copy of the
// output one delay earlier, so each echo already contains the echoes before
// it. Hard clip at the end; there is no limiter in this signal path.

use crate::audio::StereoFrame;

pub fn apply(dry: &[StereoFrame], delay_samples: usize, feedback: f32) -> Vec<StereoFrame> {
    let n = dry.len();
    let mut ext = vec![StereoFrame::zero(); n + delay_samples];
    ext[..n].copy_from_slice(dry);

    for i in delay_samples..n {
        let echo = ext[i - delay_samples];
        ext[i].left += echo.left * feedback;
        ext[i].right += echo.right * feedback;
    }

    ext.truncate(n);
    for frame in ext.iter_mut() {
        frame.clamp_full_scale();
    }
    ext
}
