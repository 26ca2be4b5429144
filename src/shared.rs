// Engine-wide constants. Everything musical is derived from the seed at
// startup (see music::params); these are the fixed scaffolding around it.

pub const SAMPLE_RATE: u32 = 44_100;

// loudness frames for the visual side
pub const VISUAL_FPS: u32 = 30;
pub const SAMPLES_PER_VISUAL_FRAME: usize = (SAMPLE_RATE / VISUAL_FPS) as usize; // 1470

// step grid: sixteenth notes, 8 bars per streamed segment
pub const STEPS_PER_BEAT: usize = 4;
pub const STEPS_PER_BAR: usize = 16;
pub const BARS_PER_SEGMENT: usize = 8;
pub const STEPS_PER_SEGMENT: usize = BARS_PER_SEGMENT * STEPS_PER_BAR; // 128

// segment handoff overlap
pub const CROSSFADE_MS: u64 = 300;

pub const DELAY_FEEDBACK: f32 = 0.45;

// offbeat pad sparsity; the groove stays roomy on purpose
pub const DENSITY_FACTOR: f64 = 0.5;

// Snapshot handed to the TUI every frame. The renderer just draws this;
// all the real state lives in the scheduler.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub seed: u64,
    pub bpm: u32,
    pub scale_label: &'static str,
    pub root_freq: f32,
    pub bass_label: &'static str,
    pub delay_beats: f64,
    pub state_label: &'static str,
    pub segment_index: u64,
    pub backpressure_events: u64,
    pub level: f32,
    pub playing: bool,
}
