use std::sync::Arc;

use crate::audio::StereoFrame;

// Segments arrive at the device fully rendered; the callback only mixes
// clips and runs their fade ramps. Fade lengths are in samples.
#[derive(Clone, Debug)]
pub enum AudioCommand {
    Play {
        frames: Arc<Vec<StereoFrame>>,
        fade_in: usize,
    },
    // fades every live clip; a clip whose ramp reaches zero is dropped
    FadeOut {
        fade: usize,
    },
}
